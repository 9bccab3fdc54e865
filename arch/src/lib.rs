pub mod op;
pub mod reg;
pub mod trit;

pub use op::{OpClass, Opcode};
pub use reg::{Bank, Reg, RegError};
