// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Turning tokens into an instruction list
//!
//! Conditionals are resolved here. `%?` only opens a frame, `%t` becomes a
//! conditional branch and `%e` an unconditional jump to the end of the frame,
//! so `%?c1%tA%ec2%tB%eC%;` works as an else-if chain without nesting.
//! Control tokens that do not close anything are dropped.

use crate::{
    lexer::{BinaryOp, Token, UnaryOp, Variable},
    sprintf::FormatSpec,
};

/// Branch target not resolved yet
const UNRESOLVED: usize = usize::MAX;

/// Single step of a compiled capability
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Append text to the output
    Emit(String),
    /// Push a parameter, 0-based
    PushParam(usize),
    PushInteger(i64),
    SetVariable(Variable),
    GetVariable(Variable),
    StringLength,
    Binary(BinaryOp),
    Unary(UnaryOp),
    Format(FormatSpec),
    /// Pop a value, continue at the target if it is false
    BranchIfFalse(usize),
    /// Continue at the target
    Jump(usize),
}

/// Instruction list of one capability
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    /// `%i` was seen somewhere, applied before the first instruction
    pub(crate) increment: bool,
    pub(crate) instructions: Vec<Instruction>,
    /// Highest parameter referenced by `%pN`
    pub(crate) arity: u8,
}

/// Open `%?` frame
#[derive(Default)]
struct Frame {
    /// `%t` branches waiting for the next `%e` or `%;`
    branches: Vec<usize>,
    /// `%e` jumps waiting for `%;`
    jumps: Vec<usize>,
}

struct Generator {
    program: Program,
    frames: Vec<Frame>,
    /// Text may only be merged into instructions at or after this index
    label: usize,
    keep_padding: bool,
}

/// Generate the instruction list for the tokens
///
/// Padding specifications are dropped unless `keep_padding` is set, in which
/// case they are emitted as text for the output layer to interpret.
pub fn generate(tokens: Vec<Token>, keep_padding: bool) -> Program {
    let mut generator = Generator {
        program: Program::default(),
        frames: Vec::new(),
        label: 0,
        keep_padding,
    };
    for token in tokens {
        generator.token(token);
    }
    while let Some(frame) = generator.frames.pop() {
        #[cfg(feature = "tracing")]
        tracing::trace!("closing unterminated conditional at end of capability");
        generator.close(frame);
    }
    generator.program
}

impl Generator {
    fn push(&mut self, instruction: Instruction) {
        self.program.instructions.push(instruction);
    }

    fn emit(&mut self, text: String) {
        let mergeable = self.program.instructions.len() > self.label;
        if mergeable
            && let Some(Instruction::Emit(previous)) = self.program.instructions.last_mut()
        {
            previous.push_str(&text);
            return;
        }
        self.push(Instruction::Emit(text));
    }

    /// Point `sites` at the next instruction to be generated
    fn resolve(&mut self, sites: Vec<usize>) {
        let target = self.program.instructions.len();
        for site in sites {
            match &mut self.program.instructions[site] {
                Instruction::BranchIfFalse(to) | Instruction::Jump(to) => *to = target,
                _ => unreachable!("branch site is not a branch"),
            }
        }
        self.label = target;
    }

    fn close(&mut self, frame: Frame) {
        let mut sites = frame.branches;
        sites.extend(frame.jumps);
        self.resolve(sites);
    }

    fn token(&mut self, token: Token) {
        match token {
            Token::Literal(text) => self.emit(text),
            Token::Padding(spec) => {
                if self.keep_padding {
                    self.emit(spec);
                }
            }
            Token::PushParam(index) => {
                self.program.arity = self.program.arity.max(index);
                self.push(Instruction::PushParam(usize::from(index - 1)));
            }
            Token::PushInteger(value) => self.push(Instruction::PushInteger(value)),
            Token::SetVariable(variable) => self.push(Instruction::SetVariable(variable)),
            Token::GetVariable(variable) => self.push(Instruction::GetVariable(variable)),
            Token::StringLength => self.push(Instruction::StringLength),
            Token::Binary(op) => self.push(Instruction::Binary(op)),
            Token::Unary(op) => self.push(Instruction::Unary(op)),
            Token::Format(spec) => self.push(Instruction::Format(spec)),
            Token::Increment => self.program.increment = true,
            Token::If => self.frames.push(Frame::default()),
            Token::Then => {
                if self.frames.is_empty() {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("%t without %?, opening a conditional");
                    self.frames.push(Frame::default());
                }
                let site = self.program.instructions.len();
                self.push(Instruction::BranchIfFalse(UNRESOLVED));
                if let Some(frame) = self.frames.last_mut() {
                    frame.branches.push(site);
                }
            }
            Token::Else => {
                let Some(frame) = self.frames.last_mut() else {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("dropping %e without open conditional");
                    return;
                };
                let site = self.program.instructions.len();
                frame.jumps.push(site);
                let branches = std::mem::take(&mut frame.branches);
                self.push(Instruction::Jump(UNRESOLVED));
                self.resolve(branches);
            }
            Token::EndIf => {
                let Some(frame) = self.frames.pop() else {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("dropping %; without open conditional");
                    return;
                };
                self.close(frame);
            }
        }
    }
}
