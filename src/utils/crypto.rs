//! Hashing and encoding helpers shared by the chain adapters.

use bitcoin::hashes::{hash160, sha256, sha256d, Hash};
use ripemd::{Digest, Ripemd160};
use tiny_keccak::{Hasher, Keccak};

use crate::error::{VaultError, VaultResult};

/// Keccak256 hash (used for Ethereum and Tron addresses)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Convert raw address bytes to an EIP-55 checksummed Ethereum address
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut result = String::from("0x");
    for (i, ch) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

        if !ch.is_ascii_digit() && nibble >= 8 {
            result.push(ch.to_ascii_uppercase());
        } else {
            result.push(ch);
        }
    }

    result
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(data).to_byte_array()
}

pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Base58Check with a double-SHA256 checksum
pub fn base58check_encode(payload: &[u8]) -> String {
    let checksum = sha256d::Hash::hash(payload);
    let mut data = payload.to_vec();
    data.extend_from_slice(&checksum[..4]);
    bs58::encode(data).into_string()
}

/// Decode a Base58Check string.
///
/// A string that is not base58 (or too short to hold a checksum) is an
/// `InvalidAddressEncoding`; a well-formed string whose checksum does not
/// match is an `AddressChecksumMismatch`.
pub fn base58check_decode(encoded: &str) -> VaultResult<Vec<u8>> {
    let data = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| VaultError::invalid_address_encoding(format!("invalid base58: {}", e)))?;

    if data.len() < 5 {
        return Err(VaultError::invalid_address_encoding(format!(
            "base58check payload too short: {} bytes",
            data.len()
        )));
    }

    let (payload, checksum) = data.split_at(data.len() - 4);
    let expected = sha256d::Hash::hash(payload);
    if checksum != &expected[..4] {
        return Err(VaultError::checksum_mismatch(format!(
            "checksum mismatch for {}",
            encoded
        )));
    }

    Ok(payload.to_vec())
}
