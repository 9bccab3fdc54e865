//! Balanced ternary helpers.
//!
//! A trit is one of `-1`, `0`, `1`. Trit sequences are most-significant first.

/// Trits in one 32-bit machine word.
pub const WORD_TRITS: usize = 18;

/// Reserved 2-bit pattern, never produced by [`trit_code`].
pub const TRIT_RESERVED: u8 = 0b11;

/// Convert `value` to `N` balanced trits. Digits above `N` are dropped,
/// so the result represents `value` modulo `3^N`.
pub fn to_balanced_trits<const N: usize>(value: u32) -> [i8; N] {
    let mut trits = [0i8; N];
    let mut v = value;
    for trit in trits.iter_mut().rev() {
        match v % 3 {
            2 => {
                *trit = -1;
                v = v / 3 + 1;
            }
            rem => {
                *trit = rem as i8;
                v /= 3;
            }
        }
    }
    trits
}

pub fn from_balanced_trits(trits: &[i8]) -> i64 {
    trits
        .iter()
        .fold(0i64, |acc, &trit| acc * 3 + i64::from(trit))
}

/// 2-bit code of a trit: `-1 -> 00`, `0 -> 01`, `1 -> 10`.
pub fn trit_code(trit: i8) -> u8 {
    match trit {
        t if t < 0 => 0b00,
        0 => 0b01,
        _ => 0b10,
    }
}

/// Parse a balanced-ternary digit string made of `+`, `0` and `-`
/// (also accepts `1`, `T`/`t` for the positive and negative digit).
pub fn parse_trits(digits: &str) -> Option<i64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0i64, |acc, c| {
        let trit = match c {
            '+' | '1' => 1,
            '0' => 0,
            '-' | 'T' | 't' => -1,
            _ => return None,
        };
        acc.checked_mul(3)?.checked_add(trit)
    })
}
