// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Compile terminfo parameterized strings into reusable formatting methods
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use terminfo_compile::{Descriptor, Value, compile};
//!
//! let descriptor = Descriptor {
//!     name: "xterm".to_owned(),
//!     strings: BTreeMap::from([("cup".to_owned(), r"\E[%i%p1%d;%p2%dH".to_owned())]),
//!     ..Descriptor::default()
//! };
//! let terminal = compile(descriptor)?;
//! let cup = terminal.call("cup", &[Value::from(5), Value::from(10)]);
//! assert_eq!(cup.as_deref(), Some("\x1b[6;11H"));
//! # Ok::<(), terminfo_compile::compile::Error>(())
//! ```

pub mod codegen;
pub mod compile;
pub mod lexer;
pub mod sprintf;
pub mod value;
pub mod vm;

pub use compile::{CompileOptions, CompiledMethod, Descriptor, Terminal, compile, compile_with};
pub use sprintf::sprintf;
pub use value::Value;
pub use vm::StaticVariables;
