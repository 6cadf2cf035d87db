// Copyright 2019 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Executing compiled capabilities
//!
//! Execution never fails. Missing parameters read as 0, an empty stack pops
//! as 0, division by zero yields 0 and a format directive with nothing to
//! format produces no output.

use std::array::from_fn;

use crate::{
    codegen::{Instruction, Program},
    lexer::{BinaryOp, UnaryOp, Variable},
    sprintf::format_value,
    value::Value,
};

/// Static variables `A`-`Z`
///
/// These keep their values between calls. To be compatible with ncurses, use
/// the same instance for all capabilities of the same terminal. The instance is
/// owned by the caller, concurrent use needs external synchronization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticVariables {
    values: [Value; 26],
}

impl StaticVariables {
    /// Return a newly initialized set, all variables 0
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: from_fn(|_| Value::default()),
        }
    }

    /// Value of variable `name` (`A`-`Z`)
    #[must_use]
    pub fn get(&self, name: char) -> Option<&Value> {
        let index = u8::try_from(name).ok()?.checked_sub(b'A')?;
        self.values.get(usize::from(index))
    }
}

impl Default for StaticVariables {
    fn default() -> Self {
        Self::new()
    }
}

struct Frame<'a> {
    params: &'a [Value],
    increment: bool,
    stack: Vec<Value>,
    dynamic_variables: [Value; 26],
}

impl Frame<'_> {
    fn param(&self, index: usize) -> Value {
        let value = self.params.get(index).cloned().unwrap_or_default();
        match value {
            // `%i` only affects the first two numeric parameters
            Value::Integer(number) if self.increment && index < 2 => {
                Value::Integer(number.wrapping_add(1))
            }
            value => value,
        }
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or_default()
    }
}

impl Program {
    /// Run the program
    ///
    /// # Arguments
    /// * `params`  - values for `%p1` etc
    /// * `statics` - static variables, see [`StaticVariables`]
    pub fn execute(&self, params: &[Value], statics: &mut StaticVariables) -> String {
        let mut output = String::new();
        let mut frame = Frame {
            params,
            increment: self.increment,
            stack: Vec::new(),
            dynamic_variables: from_fn(|_| Value::default()),
        };

        let mut pc = 0;
        while let Some(instruction) = self.instructions.get(pc) {
            pc += 1;
            match instruction {
                Instruction::Emit(text) => output.push_str(text),
                Instruction::PushParam(index) => {
                    let value = frame.param(*index);
                    frame.stack.push(value);
                }
                Instruction::PushInteger(value) => frame.stack.push(Value::Integer(*value)),
                Instruction::SetVariable(variable) => {
                    let value = frame.pop();
                    match *variable {
                        Variable::Dynamic(index) => {
                            frame.dynamic_variables[usize::from(index)] = value;
                        }
                        Variable::Static(index) => statics.values[usize::from(index)] = value,
                    }
                }
                Instruction::GetVariable(variable) => {
                    let value = match *variable {
                        Variable::Dynamic(index) => &frame.dynamic_variables[usize::from(index)],
                        Variable::Static(index) => &statics.values[usize::from(index)],
                    };
                    frame.stack.push(value.clone());
                }
                Instruction::StringLength => {
                    let value = frame.pop();
                    frame.stack.push(Value::Integer(value.length()));
                }
                Instruction::Binary(op) => {
                    let y = frame.pop();
                    let x = frame.pop();
                    frame.stack.push(binary(*op, &x, &y));
                }
                Instruction::Unary(op) => {
                    let x = frame.pop().to_integer();
                    let result = match op {
                        UnaryOp::LogicalNot => i64::from(x == 0),
                        UnaryOp::Complement => !x,
                    };
                    frame.stack.push(Value::Integer(result));
                }
                Instruction::Format(spec) => {
                    if let Some(value) = frame.stack.pop() {
                        output.push_str(&format_value(Some(&value), *spec));
                    }
                }
                Instruction::BranchIfFalse(target) => {
                    if !frame.pop().is_truthy() {
                        pc = *target;
                    }
                }
                Instruction::Jump(target) => pc = *target,
            }
        }
        output
    }
}

fn binary(op: BinaryOp, x: &Value, y: &Value) -> Value {
    if let (BinaryOp::Equal, Value::Text(x), Value::Text(y)) = (op, x, y) {
        return Value::from(x == y);
    }
    let (x, y) = (x.to_integer(), y.to_integer());
    let result = match op {
        BinaryOp::Add => x.wrapping_add(y),
        BinaryOp::Subtract => x.wrapping_sub(y),
        BinaryOp::Multiply => x.wrapping_mul(y),
        BinaryOp::Divide => x.checked_div(y).unwrap_or(0),
        BinaryOp::Modulo => x.checked_rem(y).unwrap_or(0),
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        BinaryOp::BitXor => x ^ y,
        BinaryOp::Equal => i64::from(x == y),
        BinaryOp::Less => i64::from(x < y),
        BinaryOp::Greater => i64::from(x > y),
        BinaryOp::LogicalAnd => i64::from(x != 0 && y != 0),
        BinaryOp::LogicalOr => i64::from(x != 0 || y != 0),
    };
    Value::Integer(result)
}
