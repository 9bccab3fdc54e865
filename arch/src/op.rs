use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::reg::Bank;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
    EnumString,
    EnumIter,
    Display,
)]
#[strum(ascii_case_insensitive)]
#[repr(u8)]
pub enum Opcode {
    // ALU
    NOP = 0x00,
    ADD = 0x01,
    SUB = 0x02,
    MUL = 0x03,
    AND = 0x04,
    OR = 0x05,
    NOT = 0x06,
    XOR = 0x07,
    SHL = 0x08,
    SHR = 0x09,
    ROL = 0x0A,
    ROR = 0x0B,
    CMP = 0x0C,
    TEST = 0x0D,
    INC = 0x0E,
    DEC = 0x0F,
    NEG = 0x10,

    // MEM
    LD = 0x20,
    ST = 0x21,
    VLD = 0x22,
    VST = 0x23,
    FLD = 0x24,
    FST = 0x25,
    LEA = 0x26,
    PUSH = 0x27,
    POP = 0x28,

    // CTRL
    JMP = 0x30,
    JAL = 0x31,
    JR = 0x32,
    JALR = 0x33,
    BEQ = 0x34,
    BNE = 0x35,
    BLT = 0x36,
    BGE = 0x37,
    BLTU = 0x38,
    BGEU = 0x39,
    BGT = 0x3A,
    BLE = 0x3B,
    CALL = 0x3C,
    RET = 0x3D,

    // VEC
    VADD = 0x40,
    VSUB = 0x41,
    VMUL = 0x42,
    VAND = 0x43,
    VOR = 0x44,
    VNOT = 0x45,
    VSHL = 0x46,
    VSHR = 0x47,

    // FP
    FADD = 0x50,
    FSUB = 0x51,
    FMUL = 0x52,
    FCMP = 0x53,
    FMOV = 0x54,
    FNEG = 0x55,

    // SYS
    WFI = 0x60,

    // COMPLEX
    DIV = 0x70,
    MOD = 0x71,
    UDIV = 0x72,
    UMOD = 0x73,
    SQRT = 0x74,
    ABS = 0x75,
    SIN = 0x76,
    COS = 0x77,
    TAN = 0x78,
    ASIN = 0x79,
    ACOS = 0x7A,
    ATAN = 0x7B,
    EXP = 0x7C,
    LOG = 0x7D,

    // COMPLEX_VEC
    VDOT = 0x80,
    VREDUCE = 0x81,
    VMAX = 0x82,
    VMIN = 0x83,
    VSUM = 0x84,
    VPERM = 0x85,

    // COMPLEX_MEM
    CACHE = 0x90,
    FLUSH = 0x91,
    MEMBAR = 0x92,

    // COMPLEX_SYS
    SYSCALL = 0xA0,
    BREAK = 0xA1,
    HALT = 0xA2,
}

/// Operand signature of an opcode. The class decides arity, operand kinds
/// and the byte layout of the encoded word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum OpClass {
    Alu3,
    Alu1,
    Mem,
    CtrlJump,
    CtrlBranch,
    Vec3,
    Fp3,
    ComplexUnary,
    ComplexBinary,
    NoArg,
}

impl OpClass {
    pub fn arity(&self) -> usize {
        use OpClass::*;
        match self {
            Alu3 | CtrlBranch | Vec3 | Fp3 | ComplexBinary => 3,
            Alu1 | Mem | ComplexUnary => 2,
            CtrlJump => 1,
            NoArg => 0,
        }
    }
}

impl Opcode {
    pub fn parse(s: &str) -> Option<Self> {
        s.parse::<Self>().ok()
    }

    pub fn byte(self) -> u8 {
        self.into()
    }

    pub fn class(&self) -> OpClass {
        use Opcode::*;
        match self {
            ADD | SUB | MUL | AND | OR | XOR | SHL | SHR | ROL | ROR => OpClass::Alu3,
            NOT | CMP | TEST | INC | DEC | NEG => OpClass::Alu1,
            LD | ST | VLD | VST | FLD | FST | LEA | PUSH | POP => OpClass::Mem,
            JMP | JAL | JR | JALR | CALL => OpClass::CtrlJump,
            BEQ | BNE | BLT | BGE | BLTU | BGEU | BGT | BLE => OpClass::CtrlBranch,
            VADD | VSUB | VMUL | VAND | VOR | VNOT | VSHL | VSHR => OpClass::Vec3,
            VDOT | VREDUCE | VMAX | VMIN | VSUM | VPERM => OpClass::Vec3,
            FADD | FSUB | FMUL | FCMP | FMOV | FNEG => OpClass::Fp3,
            SQRT | ABS | SIN | COS | TAN | ASIN | ACOS | ATAN | EXP | LOG => OpClass::ComplexUnary,
            DIV | MOD | UDIV | UMOD => OpClass::ComplexBinary,
            NOP | RET | WFI | CACHE | FLUSH | MEMBAR | SYSCALL | BREAK | HALT => OpClass::NoArg,
        }
    }

    /// Register bank of the register operands.
    pub fn bank(&self) -> Bank {
        use Opcode::*;
        match self {
            VLD | VST => Bank::Vector,
            FLD | FST => Bank::Float,
            _ => match self.class() {
                OpClass::Vec3 => Bank::Vector,
                OpClass::Fp3 => Bank::Float,
                _ => Bank::General,
            },
        }
    }

    /// Memory instructions that move a value into their register operand.
    pub fn is_load(&self) -> bool {
        use Opcode::*;
        matches!(self, LD | VLD | FLD | LEA | POP)
    }

    /// Whether the first register operand is written back.
    pub fn writes_dest(&self) -> bool {
        use Opcode::*;
        match self.class() {
            OpClass::Alu3 => true,
            OpClass::Alu1 => !matches!(self, CMP | TEST),
            OpClass::Mem => self.is_load(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Opcode::parse("add"), Some(Opcode::ADD));
        assert_eq!(Opcode::parse("Vreduce"), Some(Opcode::VREDUCE));
        assert_eq!(Opcode::parse("hoge"), None);
    }

    #[test]
    fn byte_table_is_authoritative() {
        assert_eq!(Opcode::LD.byte(), 0x20);
        assert_eq!(Opcode::JMP.byte(), 0x30);
        assert_eq!(Opcode::BEQ.byte(), 0x34);
        assert_eq!(Opcode::HALT.byte(), 0xA2);
        for op in Opcode::iter() {
            assert_eq!(Opcode::try_from(op.byte()).ok(), Some(op));
        }
    }

    #[test]
    fn destinations() {
        assert!(Opcode::ADD.writes_dest());
        assert!(Opcode::NOT.writes_dest());
        assert!(!Opcode::CMP.writes_dest());
        assert!(Opcode::LD.writes_dest());
        assert!(!Opcode::ST.writes_dest());
        assert!(!Opcode::JMP.writes_dest());
        assert!(!Opcode::VADD.writes_dest());
    }

    #[test]
    fn banks() {
        assert_eq!(Opcode::VLD.bank(), Bank::Vector);
        assert_eq!(Opcode::FST.bank(), Bank::Float);
        assert_eq!(Opcode::VDOT.bank(), Bank::Vector);
        assert_eq!(Opcode::FNEG.bank(), Bank::Float);
        assert_eq!(Opcode::SQRT.bank(), Bank::General);
    }
}
