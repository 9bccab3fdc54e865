//! Syntax tree handed over by the front end.
//!
//! The tree is assumed to be well formed; the assembler only checks what the
//! grammar cannot (operand kinds, registers, symbols).

use std::fmt::Display;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pos {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub fn new(file: &str, line: usize, column: usize) -> Self {
        Pos {
            file: file.to_string(),
            line,
            column,
        }
    }
}

impl Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub label: Option<Label>,
    pub stmt: Option<Stmt>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Inst(Instruction),
    Vliw(VliwInstruction),
    Directive(Directive),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: String,
    pub operands: Vec<Operand>,
    pub pos: Pos,
}

/// `[ADD T0, T1, T2] [LD T3, buf]`, one to three slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VliwInstruction {
    pub slots: Vec<Instruction>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub params: Vec<Operand>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(String),
    /// Literal text as written: `42`, `0x2A`, `0b101010`, `"text"`, `0t+-0`.
    Immediate(String),
    /// `[base + index + offset]`
    Memory {
        base: String,
        index: Option<String>,
        offset: Option<String>,
    },
    Ident(String),
    BinaryOp(Box<Operand>, BinOp, Box<Operand>),
}

// ----------------------------------------------------------------------------
// Builders

impl Operand {
    pub fn reg(name: &str) -> Self {
        Operand::Register(name.to_string())
    }

    pub fn imm(literal: &str) -> Self {
        Operand::Immediate(literal.to_string())
    }

    pub fn ident(name: &str) -> Self {
        Operand::Ident(name.to_string())
    }

    pub fn mem(base: &str, index: Option<&str>, offset: Option<&str>) -> Self {
        Operand::Memory {
            base: base.to_string(),
            index: index.map(str::to_string),
            offset: offset.map(str::to_string),
        }
    }

    pub fn add(left: Operand, right: Operand) -> Self {
        Operand::BinaryOp(Box::new(left), BinOp::Add, Box::new(right))
    }

    pub fn sub(left: Operand, right: Operand) -> Self {
        Operand::BinaryOp(Box::new(left), BinOp::Sub, Box::new(right))
    }

    /// Visit every symbol name this operand mentions.
    pub fn for_each_symbol(&self, f: &mut impl FnMut(&str)) {
        match self {
            Operand::Register(_) | Operand::Immediate(_) => {}
            Operand::Ident(name) => f(name),
            Operand::Memory { base, .. } => {
                if !vtx_arch::Reg::is_name(base) {
                    f(base)
                }
            }
            Operand::BinaryOp(left, _, right) => {
                left.for_each_symbol(f);
                right.for_each_symbol(f);
            }
        }
    }
}

impl Instruction {
    pub fn new(mnemonic: &str, operands: Vec<Operand>) -> Self {
        Instruction {
            mnemonic: mnemonic.to_string(),
            operands,
            pos: Pos::default(),
        }
    }
}

impl Line {
    pub fn label(name: &str) -> Self {
        Line {
            label: Some(Label {
                name: name.to_string(),
                pos: Pos::default(),
            }),
            ..Default::default()
        }
    }

    pub fn inst(mnemonic: &str, operands: Vec<Operand>) -> Self {
        Line {
            stmt: Some(Stmt::Inst(Instruction::new(mnemonic, operands))),
            ..Default::default()
        }
    }

    pub fn vliw(slots: Vec<Instruction>) -> Self {
        Line {
            stmt: Some(Stmt::Vliw(VliwInstruction {
                slots,
                pos: Pos::default(),
            })),
            ..Default::default()
        }
    }

    pub fn directive(name: &str, params: Vec<Operand>) -> Self {
        Line {
            stmt: Some(Stmt::Directive(Directive {
                name: name.to_string(),
                params,
                pos: Pos::default(),
            })),
            ..Default::default()
        }
    }

    /// Attach a label to a statement line (`loop: ADD T0, T0, T1`).
    pub fn labeled(mut self, name: &str) -> Self {
        self.label = Some(Label {
            name: name.to_string(),
            pos: self.pos.clone(),
        });
        self
    }

    /// Move the line and everything on it to `pos`.
    pub fn at(mut self, pos: Pos) -> Self {
        if let Some(label) = &mut self.label {
            label.pos = pos.clone();
        }
        match &mut self.stmt {
            Some(Stmt::Inst(inst)) => inst.pos = pos.clone(),
            Some(Stmt::Vliw(vliw)) => {
                vliw.pos = pos.clone();
                for slot in &mut vliw.slots {
                    slot.pos = pos.clone();
                }
            }
            Some(Stmt::Directive(dir)) => dir.pos = pos.clone(),
            None => {}
        }
        self.pos = pos;
        self
    }
}

impl Program {
    /// Build a program, numbering lines from 1 in `file`.
    pub fn numbered(file: &str, lines: Vec<Line>) -> Self {
        Program {
            lines: lines
                .into_iter()
                .enumerate()
                .map(|(idx, line)| line.at(Pos::new(file, idx + 1, 1)))
                .collect(),
        }
    }
}
