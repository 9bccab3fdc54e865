use strum::Display;
use vtx_arch::trit::parse_trits;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Radix {
    #[strum(serialize = "binary")]
    Bin,
    #[strum(serialize = "decimal")]
    Dec,
    #[strum(serialize = "hexadecimal")]
    Hex,
    #[strum(serialize = "balanced ternary")]
    Tern,
}

impl Radix {
    pub fn of(literal: &str) -> Radix {
        let digits = literal.strip_prefix('-').unwrap_or(literal);
        match digits.get(0..2) {
            Some("0x" | "0X") => Radix::Hex,
            Some("0b" | "0B") => Radix::Bin,
            Some("0t" | "0T") => Radix::Tern,
            _ => Radix::Dec,
        }
    }
}

/// Parse an immediate operand: `0x` hex, `0b` binary, otherwise decimal.
/// A leading `-` is allowed in every radix. `0t` trits are only valid in `.DT`.
pub fn parse_immediate(literal: &str) -> Result<i64, Error> {
    let radix = Radix::of(literal);
    let err = || Error::NumericParse {
        literal: literal.to_string(),
        radix,
    };

    let (negative, digits) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let (base, digits) = match radix {
        Radix::Dec => (10, digits),
        Radix::Hex => (16, digits.get(2..).ok_or_else(err)?),
        Radix::Bin => (2, digits.get(2..).ok_or_else(err)?),
        Radix::Tern => return Err(err()),
    };
    // from_str_radix would accept a second sign here
    if digits.starts_with(['+', '-']) {
        return Err(err());
    }
    let value = i64::from_str_radix(digits, base).map_err(|_| err())?;
    Ok(if negative { -value } else { value })
}

/// Parse a `.DT` value: `0t` followed by balanced trits, else an immediate.
pub fn parse_tryte(literal: &str) -> Result<i64, Error> {
    match literal.strip_prefix("0t").or_else(|| literal.strip_prefix("0T")) {
        Some(trits) => parse_trits(trits).ok_or_else(|| Error::NumericParse {
            literal: literal.to_string(),
            radix: Radix::Tern,
        }),
        None => parse_immediate(literal),
    }
}

pub fn is_string_literal(literal: &str) -> bool {
    literal.len() >= 2 && literal.starts_with('"') && literal.ends_with('"')
}

/// Strip the quotes of a string literal and resolve the usual escapes.
pub fn unquote(literal: &str) -> String {
    let body = if is_string_literal(literal) {
        &literal[1..literal.len() - 1]
    } else {
        literal
    };

    let mut text = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => text.push('\n'),
            Some('t') => text.push('\t'),
            Some('r') => text.push('\r'),
            Some('0') => text.push('\0'),
            Some(other) => text.push(other),
            None => text.push('\\'),
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_imm {
        ($($name:ident: $literal:expr => $value:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(parse_immediate($literal).unwrap(), $value);
                }
            )*
        }
    }

    test_imm! {
        dec: "42" => 42,
        dec_negative: "-7" => -7,
        hex: "0x2A" => 42,
        hex_upper: "0XFF" => 255,
        hex_negative: "-0x10" => -16,
        bin: "0b101010" => 42,
        zero: "0" => 0,
    }

    #[test]
    fn rejects_bad_digits() {
        assert!(matches!(
            parse_immediate("0x1G"),
            Err(Error::NumericParse { radix: Radix::Hex, .. })
        ));
        assert!(matches!(
            parse_immediate("0b102"),
            Err(Error::NumericParse { radix: Radix::Bin, .. })
        ));
        assert!(matches!(
            parse_immediate("12a"),
            Err(Error::NumericParse { radix: Radix::Dec, .. })
        ));
        assert!(parse_immediate("0x").is_err());
        assert!(parse_immediate("--1").is_err());
    }

    #[test]
    fn ternary_is_not_an_immediate() {
        assert_eq!(Radix::of("0t+-0"), Radix::Tern);
        assert!(matches!(
            parse_immediate("0t+-0"),
            Err(Error::NumericParse { radix: Radix::Tern, .. })
        ));
    }

    #[test]
    fn trytes() {
        assert_eq!(parse_tryte("0t+-0").unwrap(), 6);
        assert_eq!(parse_tryte("0T-").unwrap(), -1);
        assert_eq!(parse_tryte("12").unwrap(), 12);
        assert!(matches!(
            parse_tryte("0t+2"),
            Err(Error::NumericParse { radix: Radix::Tern, .. })
        ));
        assert!(parse_tryte("0t").is_err());
    }

    #[test]
    fn strings() {
        assert!(is_string_literal("\"Hi\""));
        assert!(!is_string_literal("\""));
        assert_eq!(unquote("\"Hi\""), "Hi");
        assert_eq!(unquote("\"a\\nb\\\"\""), "a\nb\"");
    }
}
