// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Compiling capability descriptors into method tables

use std::{collections::BTreeMap, env};

use crate::{
    codegen::{Program, generate},
    lexer::{self, tokenize},
    value::Value,
    vm::StaticVariables,
};

/// Capabilities of one terminal type, as produced by a terminfo loader
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Descriptor {
    /// Primary terminal name
    pub name: String,
    /// All names including aliases
    pub names: Vec<String>,
    /// Human readable description
    pub desc: String,
    pub bools: BTreeMap<String, bool>,
    pub numbers: BTreeMap<String, i64>,
    /// Raw capability templates
    pub strings: BTreeMap<String, String>,
}

/// Options affecting compilation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Keep `$<..>` padding specifications in the output
    ///
    /// When not set, padding is removed from compiled capabilities.
    pub keep_padding: bool,
}

impl CompileOptions {
    /// Options following the environment
    ///
    /// Padding is kept unless `NCURSES_NO_PADDING` is set, as in ncurses.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            keep_padding: env::var_os("NCURSES_NO_PADDING").is_none(),
        }
    }
}

/// Errors reported when compiling a descriptor
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A capability template could not be parsed
    #[error("Capability {name} failed to compile")]
    Capability {
        name: String,
        #[source]
        source: lexer::Error,
    },
}

/// Compiled capability
///
/// Calling it is a pure function of the parameters (and of the static
/// variables for [`CompiledMethod::call_with`]), so a method can be shared
/// between threads freely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledMethod {
    source: String,
    program: Program,
}

impl CompiledMethod {
    /// Compile a single template with default options
    pub fn new(source: &str) -> Result<Self, lexer::Error> {
        Self::with_options(source, &CompileOptions::default())
    }

    /// Compile a single template
    pub fn with_options(source: &str, options: &CompileOptions) -> Result<Self, lexer::Error> {
        let tokens = tokenize(source)?;
        Ok(Self {
            source: source.to_owned(),
            program: generate(tokens, options.keep_padding),
        })
    }

    /// Expand the capability
    ///
    /// Static variables start out as 0 and are discarded afterwards.
    #[must_use]
    pub fn call(&self, params: &[Value]) -> String {
        self.program.execute(params, &mut StaticVariables::new())
    }

    /// Expand the capability keeping static variables in `statics`
    pub fn call_with(&self, statics: &mut StaticVariables, params: &[Value]) -> String {
        self.program.execute(params, statics)
    }

    /// Highest parameter number referenced by the template
    #[must_use]
    pub const fn arity(&self) -> u8 {
        self.program.arity
    }

    /// The template the method was compiled from
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Compiled terminal description
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Terminal {
    pub name: String,
    pub names: Vec<String>,
    pub desc: String,
    pub bools: BTreeMap<String, bool>,
    pub numbers: BTreeMap<String, i64>,
    pub methods: BTreeMap<String, CompiledMethod>,
}

impl Terminal {
    /// Check if the terminal has the string capability
    #[must_use]
    pub fn has(&self, cap: &str) -> bool {
        self.methods.contains_key(cap)
    }

    #[must_use]
    pub fn method(&self, cap: &str) -> Option<&CompiledMethod> {
        self.methods.get(cap)
    }

    /// Expand the string capability, `None` if the terminal does not have it
    #[must_use]
    pub fn call(&self, cap: &str, params: &[Value]) -> Option<String> {
        self.methods.get(cap).map(|method| method.call(params))
    }

    /// Boolean capability, absent counts as false
    #[must_use]
    pub fn flag(&self, cap: &str) -> bool {
        self.bools.get(cap).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn number(&self, cap: &str) -> Option<i64> {
        self.numbers.get(cap).copied()
    }
}

/// Compile all string capabilities of the descriptor with default options
pub fn compile(descriptor: Descriptor) -> Result<Terminal, Error> {
    compile_with(descriptor, &CompileOptions::default())
}

/// Compile all string capabilities of the descriptor
///
/// Booleans and numbers are passed through. The first template that fails to
/// compile is reported with its capability name.
pub fn compile_with(descriptor: Descriptor, options: &CompileOptions) -> Result<Terminal, Error> {
    let Descriptor {
        name,
        names,
        desc,
        bools,
        numbers,
        strings,
    } = descriptor;

    let mut methods = BTreeMap::new();
    for (cap, template) in strings {
        match CompiledMethod::with_options(&template, options) {
            Ok(method) => {
                methods.insert(cap, method);
            }
            Err(source) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(terminal = %name, capability = %cap, error = %source, "capability failed to compile");
                return Err(Error::Capability { name: cap, source });
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(terminal = %name, capabilities = methods.len(), "compiled method table");

    Ok(Terminal {
        name,
        names,
        desc,
        bools,
        numbers,
        methods,
    })
}

#[cfg(test)]
mod test {
    use collection_literals::collection;

    use super::*;

    fn descriptor() -> Descriptor {
        Descriptor {
            name: "myterm".to_owned(),
            names: vec!["myterm".to_owned(), "my-terminal".to_owned()],
            desc: "My terminal".to_owned(),
            bools: collection!("am".to_owned() => true, "bce".to_owned() => false),
            numbers: collection!("colors".to_owned() => 256, "cols".to_owned() => 80),
            strings: collection!(
                "cup".to_owned() => r"\E[%i%p1%d;%p2%dH".to_owned(),
                "sgr0".to_owned() => r"\E[0m".to_owned(),
                "empty".to_owned() => String::new(),
                "flash".to_owned() => r"\E[?5h$<100/>\E[?5l".to_owned(),
            ),
        }
    }

    #[test]
    fn passes_descriptor_fields_through() {
        let terminal = compile(descriptor()).unwrap();
        assert_eq!(terminal.name, "myterm");
        assert_eq!(terminal.names, ["myterm", "my-terminal"]);
        assert_eq!(terminal.desc, "My terminal");
        assert!(terminal.flag("am"));
        assert!(!terminal.flag("bce"));
        assert!(!terminal.flag("xenl"));
        assert_eq!(terminal.number("colors"), Some(256));
        assert_eq!(terminal.number("lines"), None);
        assert_eq!(
            terminal.methods.keys().collect::<Vec<_>>(),
            ["cup", "empty", "flash", "sgr0"]
        );
    }

    #[test]
    fn methods() {
        let terminal = compile(descriptor()).unwrap();
        assert_eq!(
            terminal.call("cup", &[Value::from(5), Value::from(10)]),
            Some("\x1b[6;11H".to_owned())
        );
        assert_eq!(terminal.call("sgr0", &[]), Some("\x1b[0m".to_owned()));
        assert_eq!(terminal.call("empty", &[Value::from(1)]), Some(String::new()));
        assert_eq!(terminal.call("civis", &[]), None);
        assert!(terminal.has("cup"));
        assert!(!terminal.has("civis"));
    }

    #[test]
    fn literal_ignores_arguments() {
        let terminal = compile(descriptor()).unwrap();
        assert_eq!(
            terminal.call("sgr0", &[Value::from(1), Value::from("x")]),
            Some("\x1b[0m".to_owned())
        );
    }

    #[test]
    fn padding_options() {
        let terminal = compile(descriptor()).unwrap();
        assert_eq!(
            terminal.call("flash", &[]),
            Some("\x1b[?5h\x1b[?5l".to_owned())
        );
        let options = CompileOptions { keep_padding: true };
        let terminal = compile_with(descriptor(), &options).unwrap();
        assert_eq!(
            terminal.call("flash", &[]),
            Some("\x1b[?5h$<100/>\x1b[?5l".to_owned())
        );
    }

    #[test]
    fn options_from_env() {
        temp_env::with_var("NCURSES_NO_PADDING", Some("1"), || {
            assert_eq!(CompileOptions::from_env(), CompileOptions { keep_padding: false });
        });
        temp_env::with_var("NCURSES_NO_PADDING", None::<&str>, || {
            assert_eq!(CompileOptions::from_env(), CompileOptions { keep_padding: true });
        });
    }

    #[test]
    fn compile_error_names_capability() {
        let mut descriptor = descriptor();
        descriptor
            .strings
            .insert("bad".to_owned(), "%p1%Y".to_owned());
        assert_eq!(
            compile(descriptor),
            Err(Error::Capability {
                name: "bad".to_owned(),
                source: lexer::Error::UnrecognizedFormatOption(3, 'Y'),
            })
        );
    }

    #[test]
    fn method_metadata() {
        let method = CompiledMethod::new("%p1%d;%p3%d").unwrap();
        assert_eq!(method.arity(), 3);
        assert_eq!(method.source(), "%p1%d;%p3%d");
    }

    #[test]
    fn static_variables_shared_between_methods() {
        let set = CompiledMethod::new("%p1%PC").unwrap();
        let get = CompiledMethod::new("%gC%d").unwrap();
        let mut statics = StaticVariables::new();
        assert_eq!(set.call_with(&mut statics, &[Value::from(7)]), "");
        assert_eq!(get.call_with(&mut statics, &[]), "7");
        assert_eq!(get.call(&[]), "0");
    }
}
