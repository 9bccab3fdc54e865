//! Two-pass assembler core for the VTX1 ternary VLIW architecture.
//!
//! Input is an already parsed [`ast::Program`]. Output is an [`Assembly`]
//! carrying the byte image, the symbol table and every diagnostic.

pub mod assemble;
pub mod ast;
pub mod config;
pub mod encode;
pub mod error;
pub mod number;
pub mod pack;
pub mod symbol;
pub mod vliw;

pub use assemble::{assemble, Assembler, Assembly, Span};
pub use config::Config;
pub use error::{Diag, Diagnostics, Error, Warning};
pub use pack::WordSize;
