//! Re-packing of the flat byte stream for non-8-bit targets.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use vtx_arch::trit::{to_balanced_trits, trit_code, WORD_TRITS};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    Display,
)]
#[serde(try_from = "RawWordSize", into = "String")]
pub enum WordSize {
    #[default]
    #[strum(serialize = "8")]
    W8,
    #[strum(serialize = "36")]
    W36,
    #[strum(serialize = "108")]
    W108,
    #[strum(serialize = "ternary", ascii_case_insensitive)]
    Ternary,
}

/// YAML writes `36` as a number and `ternary` as a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawWordSize {
    Num(u64),
    Text(String),
}

impl TryFrom<RawWordSize> for WordSize {
    type Error = String;

    fn try_from(raw: RawWordSize) -> Result<Self, Self::Error> {
        let text = match raw {
            RawWordSize::Num(n) => n.to_string(),
            RawWordSize::Text(s) => s,
        };
        text.parse()
            .map_err(|_| format!("Unknown word size `{text}` (expected 8, 36, 108 or ternary)"))
    }
}

impl From<WordSize> for String {
    fn from(size: WordSize) -> Self {
        size.to_string()
    }
}

impl WordSize {
    pub fn pack(self, bytes: &[u8]) -> Vec<u8> {
        match self {
            WordSize::W8 => bytes.to_vec(),
            WordSize::W36 => pack36(bytes),
            WordSize::W108 => pack108(bytes),
            WordSize::Ternary => pack_ternary(bytes),
        }
    }
}

/// Every 4 bytes become a 5-byte container. The low nibble of the last byte
/// carries the low nibble of the following input byte, which is not
/// consumed. A short tail is zero-filled into one more container.
pub fn pack36(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len().div_ceil(4) * 5);
    for (idx, chunk) in bytes.chunks(4).enumerate() {
        let mut word = [0u8; 5];
        word[..chunk.len()].copy_from_slice(chunk);
        word[4] = bytes.get((idx + 1) * 4).map_or(0, |b| b & 0x0F);
        out.extend_from_slice(&word);
    }
    out
}

/// Every 12 bytes become a 14-byte container: byte 12 carries the next input
/// byte and the low nibble of byte 13 the low nibble of the one after it.
pub fn pack108(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len().div_ceil(12) * 14);
    for (idx, chunk) in bytes.chunks(12).enumerate() {
        let next = (idx + 1) * 12;
        let mut word = [0u8; 14];
        word[..chunk.len()].copy_from_slice(chunk);
        word[12] = bytes.get(next).copied().unwrap_or(0);
        word[13] = bytes.get(next + 1).map_or(0, |b| b & 0x0F);
        out.extend_from_slice(&word);
    }
    out
}

/// Every full 4-byte chunk becomes 18 trits at 2 bits each, a 36-bit field
/// stored in 5 big-endian bytes. A tail shorter than 4 bytes is dropped.
pub fn pack_ternary(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() / 4 * 5);
    for chunk in bytes.chunks_exact(4) {
        let value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let field = to_balanced_trits::<WORD_TRITS>(value)
            .iter()
            .fold(0u64, |acc, &trit| (acc << 2) | u64::from(trit_code(trit)));
        out.extend_from_slice(&field.to_be_bytes()[3..]);
    }
    out
}
