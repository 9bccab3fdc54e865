use vtx_arch::{Bank, OpClass, Opcode, Reg};

use crate::ast::{BinOp, Instruction, Operand};
use crate::config::Config;
use crate::error::{Diagnostics, Error, Warning};
use crate::number::parse_immediate;
use crate::symbol::SymbolTable;

/// Every instruction occupies one 4-byte word.
pub const INST_WIDTH: u32 = 4;

/// How a symbol that exists but is still undefined evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolve {
    /// It is an error (address-setting directives, `.EQU`).
    Strict,
    /// It reads as 0. The undefined symbol has been reported already.
    Placeholder,
}

/// Evaluate a value operand. `ctx` and `index` (1-based) only label errors.
pub fn eval(
    symbols: &SymbolTable,
    op: &Operand,
    resolve: Resolve,
    ctx: &str,
    index: usize,
) -> Result<i64, Error> {
    let symbol = |name: &str| match symbols.lookup(name) {
        Some(sym) if sym.defined => Ok(i64::from(sym.value)),
        Some(_) if resolve == Resolve::Placeholder => Ok(0),
        _ => Err(Error::UndefinedSymbol(name.to_string())),
    };

    match op {
        Operand::Immediate(literal) => parse_immediate(literal),
        Operand::Ident(name) => symbol(name.as_str()),
        Operand::Memory { base, offset, .. } => {
            // A register base has no assembly-time value
            let base = if Reg::is_name(base) { 0 } else { symbol(base.as_str())? };
            let offset = match offset {
                Some(offset) => parse_immediate(offset)?,
                None => 0,
            };
            Ok(base.wrapping_add(offset))
        }
        Operand::BinaryOp(left, op, right) => {
            let left = eval(symbols, left, resolve, ctx, index)?;
            let right = eval(symbols, right, resolve, ctx, index)?;
            Ok(match op {
                BinOp::Add => left.wrapping_add(right),
                BinOp::Sub => left.wrapping_sub(right),
            })
        }
        Operand::Register(_) => Err(Error::OperandKindMismatch {
            mnemonic: ctx.to_string(),
            index,
            expected: "a value",
        }),
    }
}

/// One encoded word plus the register it writes, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoded {
    pub bytes: [u8; 4],
    pub dest: Option<Reg>,
}

pub struct Encoder<'a> {
    symbols: &'a SymbolTable,
    config: &'a Config,
}

impl<'a> Encoder<'a> {
    pub fn new(symbols: &'a SymbolTable, config: &'a Config) -> Self {
        Encoder { symbols, config }
    }

    pub fn symbols(&self) -> &'a SymbolTable {
        self.symbols
    }

    pub fn encode(&self, inst: &Instruction, diags: &mut Diagnostics) -> Result<[u8; 4], Error> {
        self.encode_slot(inst, diags).map(|enc| enc.bytes)
    }

    /// Layout: `opcode | byte1 | byte2 | byte3`, operand bytes by class.
    pub fn encode_slot(&self, inst: &Instruction, diags: &mut Diagnostics) -> Result<Encoded, Error> {
        if self.config.is_deprecated_mnemonic(&inst.mnemonic) {
            diags.warn(Warning::DeprecatedMnemonic(inst.mnemonic.clone()), &inst.pos);
        }

        let op = Opcode::parse(&inst.mnemonic)
            .ok_or_else(|| Error::UnknownMnemonic(inst.mnemonic.clone()))?;
        let class = op.class();
        if inst.operands.len() != class.arity() {
            return Err(Error::OperandCountMismatch {
                mnemonic: inst.mnemonic.clone(),
                expected: class.arity(),
                found: inst.operands.len(),
            });
        }

        let bank = op.bank();
        let mut bytes = [op.byte(), 0, 0, 0];
        let mut first = None;
        match class {
            OpClass::Alu3 | OpClass::Vec3 | OpClass::Fp3 | OpClass::ComplexBinary => {
                for idx in 0..3 {
                    let reg = self.reg(inst, idx, bank)?;
                    first.get_or_insert(reg);
                    bytes[idx + 1] = reg.num;
                }
            }
            OpClass::Alu1 | OpClass::ComplexUnary => {
                for idx in 0..2 {
                    let reg = self.reg(inst, idx, bank)?;
                    first.get_or_insert(reg);
                    bytes[idx + 1] = reg.num;
                }
            }
            OpClass::Mem => {
                let reg = self.reg(inst, 0, bank)?;
                first = Some(reg);
                bytes[1] = reg.num;
                bytes[2..].copy_from_slice(&self.address(inst, 1)?);
            }
            OpClass::CtrlJump => {
                bytes[2..].copy_from_slice(&self.address(inst, 0)?);
            }
            OpClass::CtrlBranch => {
                let rs1 = self.reg(inst, 0, bank)?;
                let rs2 = self.reg(inst, 1, bank)?;
                bytes[1] = (rs1.num << 4) | rs2.num;
                bytes[2..].copy_from_slice(&self.address(inst, 2)?);
            }
            OpClass::NoArg => {}
        }

        Ok(Encoded {
            bytes,
            dest: first.filter(|_| op.writes_dest()),
        })
    }

    fn reg(&self, inst: &Instruction, idx: usize, bank: Bank) -> Result<Reg, Error> {
        match &inst.operands[idx] {
            Operand::Register(name) => Ok(Reg::parse_in(name, bank)?),
            _ => Err(Error::OperandKindMismatch {
                mnemonic: inst.mnemonic.clone(),
                index: idx + 1,
                expected: "a register",
            }),
        }
    }

    /// 16-bit big-endian address or value field.
    fn address(&self, inst: &Instruction, idx: usize) -> Result<[u8; 2], Error> {
        let op = &inst.operands[idx];
        if let Operand::Register(_) = op {
            return Err(Error::OperandKindMismatch {
                mnemonic: inst.mnemonic.clone(),
                index: idx + 1,
                expected: "an address",
            });
        }
        let value = eval(self.symbols, op, Resolve::Placeholder, &inst.mnemonic, idx + 1)?;
        Ok((value as u16).to_be_bytes())
    }
}
