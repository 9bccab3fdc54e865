use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Error;
use crate::pack::WordSize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output packing of the assembled byte stream.
    pub word_size: WordSize,
    /// Address both passes start from.
    pub origin: u32,
    pub deprecated_mnemonics: Vec<String>,
    pub deprecated_directives: Vec<String>,
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn is_deprecated_mnemonic(&self, mnemonic: &str) -> bool {
        self.deprecated_mnemonics
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mnemonic))
    }

    pub fn is_deprecated_directive(&self, name: &str) -> bool {
        let name = name.trim_start_matches('.');
        self.deprecated_directives
            .iter()
            .any(|d| d.trim_start_matches('.').eq_ignore_ascii_case(name))
    }
}
