use bimap::BiMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Bank {
    #[strum(serialize = "general")]
    General,
    #[strum(serialize = "vector")]
    Vector,
    #[strum(serialize = "floating point")]
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg {
    pub bank: Bank,
    pub num: u8,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegError {
    #[error("Unknown register: `{0}`")]
    Unknown(String),

    #[error("`{name}` is not a {bank} register")]
    InvalidClass { name: String, bank: Bank },
}

static REG_MAP: Lazy<BiMap<&'static str, Reg>> = Lazy::new(|| {
    let mut map: BiMap<&'static str, Reg> = BiMap::new();
    map.insert("T0", Reg::new(Bank::General, 0));
    map.insert("T1", Reg::new(Bank::General, 1));
    map.insert("T2", Reg::new(Bank::General, 2));
    map.insert("T3", Reg::new(Bank::General, 3));
    map.insert("T4", Reg::new(Bank::General, 4));
    map.insert("T5", Reg::new(Bank::General, 5));
    map.insert("T6", Reg::new(Bank::General, 6));
    map.insert("TB", Reg::new(Bank::General, 7));
    map.insert("TA", Reg::new(Bank::General, 8));
    map.insert("TC", Reg::new(Bank::General, 9));
    map.insert("TS", Reg::new(Bank::General, 10));
    map.insert("TI", Reg::new(Bank::General, 11));
    map.insert("VA", Reg::new(Bank::Vector, 0));
    map.insert("VT", Reg::new(Bank::Vector, 1));
    map.insert("VB", Reg::new(Bank::Vector, 2));
    map.insert("FA", Reg::new(Bank::Float, 0));
    map.insert("FT", Reg::new(Bank::Float, 1));
    map.insert("FB", Reg::new(Bank::Float, 2));
    map
});

impl Reg {
    pub const fn new(bank: Bank, num: u8) -> Self {
        Reg { bank, num }
    }

    pub fn parse(s: &str) -> Result<Reg, RegError> {
        match REG_MAP.get_by_left(s.to_ascii_uppercase().as_str()) {
            Some(reg) => Ok(*reg),
            None => Err(RegError::Unknown(s.to_string())),
        }
    }

    /// Parse a register that must live in `bank`.
    /// Outside the general bank every foreign name is a class error,
    /// since those banks only hold three registers.
    pub fn parse_in(s: &str, bank: Bank) -> Result<Reg, RegError> {
        match Reg::parse(s) {
            Ok(reg) if reg.bank == bank => Ok(reg),
            Err(err) if bank == Bank::General => Err(err),
            _ => Err(RegError::InvalidClass {
                name: s.to_string(),
                bank,
            }),
        }
    }

    pub fn is_name(s: &str) -> bool {
        REG_MAP.contains_left(s.to_ascii_uppercase().as_str())
    }

    pub fn name(&self) -> &'static str {
        REG_MAP.get_by_right(self).copied().unwrap_or("??")
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
