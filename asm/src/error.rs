use color_print::{cformat, cprintln};
use std::fmt::Display;
use thiserror::Error;
use vtx_arch::{Bank, RegError};

use crate::ast::Pos;
use crate::number::Radix;

#[derive(Error, Debug)]
pub enum Error {
    // Symbol errors
    #[error("Duplicate symbol: `{name}` (originally defined at {original})")]
    DuplicateSymbol { name: String, original: Pos },

    #[error("Undefined symbol: `{0}`")]
    UndefinedSymbol(String),

    // Encoding errors
    #[error("Unknown mnemonic: `{0}`")]
    UnknownMnemonic(String),

    #[error("`{mnemonic}` takes {expected} operand(s), got {found}")]
    OperandCountMismatch {
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("`{mnemonic}` operand {index} must be {expected}")]
    OperandKindMismatch {
        mnemonic: String,
        index: usize,
        expected: &'static str,
    },

    #[error("Unknown register: `{0}`")]
    UnknownRegister(String),

    #[error("`{name}` is not a {bank} register")]
    InvalidRegisterClass { name: String, bank: Bank },

    #[error("VLIW register conflict: `{register}` written by slots {slots:?}")]
    VliwRegisterConflict { register: String, slots: Vec<usize> },

    #[error("Unsupported directive: `{0}`")]
    UnsupportedDirective(String),

    // Numeric errors
    #[error("Cannot parse `{literal}` as {radix} number")]
    NumericParse { literal: String, radix: Radix },

    #[error("Value {value} is out of range for {what}")]
    ValueOutOfRange { value: i64, what: &'static str },

    // Fatal errors, never accumulated
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl From<RegError> for Error {
    fn from(err: RegError) -> Self {
        match err {
            RegError::Unknown(name) => Error::UnknownRegister(name),
            RegError::InvalidClass { name, bank } => Error::InvalidRegisterClass { name, bank },
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    #[error("Deprecated instruction: `{0}`")]
    DeprecatedMnemonic(String),

    #[error("Deprecated directive: `{0}`")]
    DeprecatedDirective(String),

    #[error("Re-defined label: `{name}` (original at {original})")]
    Redefined { name: String, original: Pos },

    #[error("Unused label: `{0}`")]
    UnusedLabel(String),

    #[error("Character `{ch}` does not fit in {bits} bits and was truncated")]
    Truncated { ch: char, bits: u32 },
}

// ----------------------------------------------------------------------------
// Diagnostics

#[derive(Debug)]
pub struct Diag<T> {
    pub kind: T,
    pub pos: Pos,
}

impl<T: Display> Diag<T> {
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn line(&self) -> usize {
        self.pos.line
    }

    pub fn column(&self) -> usize {
        self.pos.column
    }

    fn cformat(&self, head: &str) -> String {
        cformat!(
            "{}: {}\n     <blue>--></> <underline>{}</>",
            head,
            self.kind,
            self.pos
        )
    }
}

/// Errors and warnings of one assembly run, in order of discovery.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Diag<Error>>,
    warnings: Vec<Diag<Warning>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, kind: Error, pos: &Pos) {
        log::debug!("error at {}: {}", pos, kind);
        self.errors.push(Diag {
            kind,
            pos: pos.clone(),
        });
    }

    pub fn warn(&mut self, kind: Warning, pos: &Pos) {
        log::debug!("warning at {}: {}", pos, kind);
        self.warnings.push(Diag {
            kind,
            pos: pos.clone(),
        });
    }

    pub fn errors(&self) -> &[Diag<Error>] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Diag<Warning>] {
        &self.warnings
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} error(s), {} warning(s)",
            self.errors.len(),
            self.warnings.len()
        )
    }

    pub fn cformat(&self) -> Vec<String> {
        let errors = self
            .errors
            .iter()
            .map(|diag| diag.cformat(&cformat!("<red,bold>error</>")));
        let warnings = self
            .warnings
            .iter()
            .map(|diag| diag.cformat(&cformat!("<yellow,bold>warn</>")));
        errors.chain(warnings).collect()
    }

    pub fn dump(&self) {
        for msg in self.cformat() {
            cprintln!("{}", msg);
            cprintln!("      <blue>|</>");
        }
        cprintln!("<bold>{}</>", self.summary());
    }
}
