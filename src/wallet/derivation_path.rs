//! Derivation path parsing
//!
//! Accepts two forms:
//! - absolute: `m/44'/60'/0'/0/0`
//! - relative: `0/5`, appended to the default root `m/44'/60'/0'/0`
//!
//! Numerals follow integer-literal rules: decimal, `0x` hex, `0o`/leading-zero
//! octal, `0b` binary, with an optional sign and `_` separators.

use std::fmt;
use std::str::FromStr;

use bitcoin::bip32::{ChildNumber, DerivationPath as Bip32Path};
use thiserror::Error;

/// Hardened offset for BIP-32 derivation
pub const HARDENED: u32 = 0x8000_0000;

/// Root prepended to relative paths: `m/44'/60'/0'/0`
pub const DEFAULT_ROOT: [u32; 4] = [HARDENED + 44, HARDENED + 60, HARDENED, 0];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty derivation path")]
    EmptyDerivationPath,
    #[error("ambiguous path: use 'm/' prefix for absolute paths, or no leading '/' for relative ones")]
    AmbiguousPath,
    #[error("invalid component in derivation path: {0}")]
    InvalidComponent(String),
    #[error("component out of allowed range [0, {max}]: {value}")]
    ComponentOutOfRange { max: u32, value: String },
    #[error("component out of allowed hardened range [0, {max}]: {value}")]
    ComponentOutOfHardenedRange { max: u32, value: String },
}

/// Parsed derivation path: the raw 32-bit child indices, hardened bit included
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let mut tokens: Vec<&str> = path.split('/').collect();
        let mut result = Vec::with_capacity(8);

        match tokens[0].trim() {
            "" => return Err(PathError::AmbiguousPath),
            "m" => {
                tokens.remove(0);
            }
            _ => result.extend_from_slice(&DEFAULT_ROOT),
        }

        if tokens.is_empty() {
            return Err(PathError::EmptyDerivationPath);
        }

        for token in tokens {
            result.push(parse_component(token)?);
        }

        Ok(Self(result))
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert into the BIP32 library's path type
    pub fn to_bip32(&self) -> Bip32Path {
        let children: Vec<ChildNumber> = self.0.iter().map(|&index| ChildNumber::from(index)).collect();
        Bip32Path::from(children)
    }
}

impl FromStr for DerivationPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for &index in &self.0 {
            if index >= HARDENED {
                write!(f, "/{}'", index - HARDENED)?;
            } else {
                write!(f, "/{}", index)?;
            }
        }
        Ok(())
    }
}

fn parse_component(token: &str) -> Result<u32, PathError> {
    let mut component = token.trim();
    let mut offset = 0u32;

    if let Some(stripped) = component.strip_suffix('\'') {
        offset = HARDENED;
        component = stripped.trim();
    }

    let max = u32::MAX - offset;
    let out_of_range = || {
        if offset == 0 {
            PathError::ComponentOutOfRange { max, value: component.to_string() }
        } else {
            PathError::ComponentOutOfHardenedRange { max, value: component.to_string() }
        }
    };

    match parse_numeral(component) {
        None => Err(PathError::InvalidComponent(component.to_string())),
        Some(Numeral::Negative) | Some(Numeral::Overflow) => Err(out_of_range()),
        Some(Numeral::Value(value)) if value > u64::from(max) => Err(out_of_range()),
        Some(Numeral::Value(value)) => Ok(offset + value as u32),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Numeral {
    Value(u64),
    Negative,
    Overflow,
}

/// Parse an integer literal with base prefixes, or `None` if it is not one.
fn parse_numeral(text: &str) -> Option<Numeral> {
    let (negative, unsigned) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let lower = unsigned.to_ascii_lowercase();
    let (radix, digits, prefixed) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest, true)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest, true)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest, true)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..], true)
    } else {
        (10, lower.as_str(), false)
    };

    let digits = if prefixed { digits.strip_prefix('_').unwrap_or(digits) } else { digits };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return None;
    }

    let mut value: Option<u64> = Some(0);
    for ch in digits.chars().filter(|&c| c != '_') {
        let digit = ch.to_digit(radix)?;
        value = value
            .and_then(|v| v.checked_mul(u64::from(radix)))
            .and_then(|v| v.checked_add(u64::from(digit)));
    }

    Some(match value {
        Some(0) => Numeral::Value(0),
        Some(_) if negative => Numeral::Negative,
        Some(v) => Numeral::Value(v),
        None if negative => Numeral::Negative,
        None => Numeral::Overflow,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str) -> Result<Vec<u32>, PathError> {
        DerivationPath::parse(path).map(|p| p.components().to_vec())
    }

    #[test]
    fn test_absolute_paths() {
        assert_eq!(
            parse("m/44'/60'/0'/0/0").unwrap(),
            vec![HARDENED + 44, HARDENED + 60, HARDENED, 0, 0]
        );
        assert_eq!(parse(" m / 44' / 60 '/0").unwrap(), vec![HARDENED + 44, HARDENED + 60, 0]);
        assert_eq!(parse("m/2147483647'").unwrap(), vec![u32::MAX]);
        assert_eq!(parse("m/4294967295").unwrap(), vec![u32::MAX]);
    }

    #[test]
    fn test_relative_paths_get_default_root() {
        assert_eq!(
            parse("0").unwrap(),
            vec![HARDENED + 44, HARDENED + 60, HARDENED, 0, 0]
        );
        assert_eq!(
            parse("5'/7").unwrap(),
            vec![HARDENED + 44, HARDENED + 60, HARDENED, 0, HARDENED + 5, 7]
        );
    }

    #[test]
    fn test_numeral_bases() {
        assert_eq!(parse("m/0x10").unwrap(), vec![16]);
        assert_eq!(parse("m/0b101'").unwrap(), vec![HARDENED + 5]);
        assert_eq!(parse("m/010").unwrap(), vec![8]);
        assert_eq!(parse("m/0o10").unwrap(), vec![8]);
        assert_eq!(parse("m/1_000").unwrap(), vec![1000]);
        assert_eq!(parse("m/+3").unwrap(), vec![3]);
        assert_eq!(parse("m/-0").unwrap(), vec![0]);
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(parse(""), Err(PathError::AmbiguousPath));
        assert_eq!(parse("/44'/60'"), Err(PathError::AmbiguousPath));
        assert_eq!(parse("m"), Err(PathError::EmptyDerivationPath));
        assert!(matches!(parse("m/"), Err(PathError::InvalidComponent(_))));
        assert!(matches!(parse("m/44'/abc"), Err(PathError::InvalidComponent(_))));
        assert!(matches!(parse("m/1__0"), Err(PathError::InvalidComponent(_))));
        assert!(matches!(parse("m/09"), Err(PathError::InvalidComponent(_))));
    }

    #[test]
    fn test_range_errors() {
        assert_eq!(
            parse("m/2147483648'"),
            Err(PathError::ComponentOutOfHardenedRange {
                max: 2147483647,
                value: "2147483648".to_string()
            })
        );
        assert!(matches!(
            parse("m/4294967296"),
            Err(PathError::ComponentOutOfRange { max: u32::MAX, .. })
        ));
        assert!(matches!(
            parse("m/-1"),
            Err(PathError::ComponentOutOfRange { .. })
        ));
        assert!(matches!(
            parse("m/99999999999999999999999'"),
            Err(PathError::ComponentOutOfHardenedRange { .. })
        ));
    }

    #[test]
    fn test_display_round_trips() {
        let path = DerivationPath::parse("m/44'/195'/0'/0/7").unwrap();
        assert_eq!(path.to_string(), "m/44'/195'/0'/0/7");
        assert_eq!(DerivationPath::parse(&path.to_string()).unwrap(), path);
        assert_eq!(
            path.to_bip32(),
            Bip32Path::from_str("m/44'/195'/0'/0/7").unwrap()
        );
    }
}
