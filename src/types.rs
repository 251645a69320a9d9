//! Transaction payload types
//!
//! Every chain adapter receives its unsigned transaction as a JSON (or, for
//! Tron, hex protobuf) document. The structures here are the typed form of
//! those documents.

use std::fmt;

use ethers_core::types::U256;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

// =============================================================================
// Arbitrary-precision integers
// =============================================================================

/// Signed integer of up to 256 bits of magnitude.
///
/// Accepts a JSON integer of any size or a string holding a decimal or
/// `0x`-prefixed hex number with an optional `-` sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BigInt {
    pub negative: bool,
    pub magnitude: U256,
}

impl BigInt {
    pub fn from_u64(value: u64) -> Self {
        Self {
            negative: false,
            magnitude: U256::from(value),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative && !self.magnitude.is_zero()
    }

    /// The value as `u64`, or `None` when negative or too large.
    pub fn to_u64(&self) -> Option<u64> {
        if self.is_negative() || self.magnitude > U256::from(u64::MAX) {
            return None;
        }
        Some(self.magnitude.low_u64())
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-")?;
        }
        write!(f, "{}", self.magnitude)
    }
}

impl Serialize for BigInt {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// JSON numbers keep their literal text (serde_json `arbitrary_precision`),
// so integers wider than 64 bits reach the parser intact.
impl<'de> Deserialize<'de> for BigInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(number) => parse_big_int(&number.to_string()),
            Value::String(text) => parse_big_int(&text),
            other => Err(format!("expected an integer, got {}", other)),
        }
        .map_err(de::Error::custom)
    }
}

fn parse_big_int(text: &str) -> Result<BigInt, String> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex_digits) if !hex_digits.is_empty() => U256::from_str_radix(hex_digits, 16)
            .map_err(|e| format!("invalid hex integer {:?}: {}", text, e))?,
        Some(_) => return Err(format!("invalid hex integer {:?}", text)),
        None if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            U256::from_dec_str(digits)
                .map_err(|e| format!("invalid decimal integer {:?}: {:?}", text, e))?
        }
        None => return Err(format!("invalid integer {:?}", text)),
    };

    Ok(BigInt { negative, magnitude })
}

// =============================================================================
// EVM
// =============================================================================

/// Unsigned legacy EVM transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthereumRawTx {
    pub nonce: u64,
    #[serde(default)]
    pub value: BigInt,
    pub gas_limit: u64,
    pub gas_price: BigInt,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub data: String,
    pub chain_id: BigInt,
}

// =============================================================================
// Bitcoin
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinTxInput {
    /// Previous transaction id, 64 hex characters in display order
    #[serde(rename = "txHash", alias = "txhash")]
    pub tx_hash: String,
    pub vout: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinTxOutput {
    pub address: String,
    #[serde(rename = "amountSatoshis", alias = "amount")]
    pub amount_satoshis: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinRawTx {
    pub inputs: Vec<BitcoinTxInput>,
    pub outputs: Vec<BitcoinTxOutput>,
}

// =============================================================================
// Bitshares
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitsharesRawTx {
    #[serde(rename = "transactionDigest")]
    pub transaction_digest: String,
}
