//! Unified error types for the HD vault core
//!
//! Every fallible operation returns a [`VaultError`] carrying an
//! [`ErrorCode`] the caller can branch on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::wallet::derivation_path::PathError;

/// Main error type for all vault operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl VaultError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidDerivationPath, msg)
    }

    pub fn no_adapter(coin_type: u32) -> Self {
        Self::new(
            ErrorCode::NoAdapterForCoinType,
            format!("no adapter found for coin type {}", coin_type),
        )
    }

    pub fn malformed_payload(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedPayload, msg)
    }

    pub fn invalid_fields(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransactionFields, msg)
    }

    pub fn checksum_mismatch(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AddressChecksumMismatch, msg)
    }

    pub fn invalid_address_encoding(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddressEncoding, msg)
    }

    pub fn unsupported_contract(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedContractType, msg)
    }

    pub fn script_verification(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ScriptVerificationFailed, msg)
    }

    pub fn key_derivation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::KeyDerivationFailure, msg)
    }

    pub fn recovery_exhausted(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SignatureRecoveryExhausted, msg)
    }

    pub fn signing_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SigningFailed, msg)
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// True for the "no adapter for coin type" outcome.
    pub fn is_no_adapter(&self) -> bool {
        self.code == ErrorCode::NoAdapterForCoinType
    }

    /// True for invalid transaction fields, including the two address refinements.
    pub fn is_invalid_transaction_fields(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidTransactionFields
                | ErrorCode::AddressChecksumMismatch
                | ErrorCode::InvalidAddressEncoding
        )
    }
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for VaultError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors
    InvalidDerivationPath,
    NoAdapterForCoinType,
    MalformedPayload,
    InvalidTransactionFields,
    /// Base58Check checksum did not match the payload
    AddressChecksumMismatch,
    /// Address string is not decodable at all
    InvalidAddressEncoding,
    UnsupportedContractType,
    InvalidMnemonic,

    // Crypto errors
    ScriptVerificationFailed,
    KeyDerivationFailure,
    SignatureRecoveryExhausted,
    SigningFailed,

    // Internal
    InvalidConfig,
    Internal,
}

/// Result type alias for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

// Conversions from common error types

impl From<PathError> for VaultError {
    fn from(e: PathError) -> Self {
        VaultError::invalid_path(e.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::new(ErrorCode::MalformedPayload, format!("invalid JSON: {}", e))
    }
}

impl From<hex::FromHexError> for VaultError {
    fn from(e: hex::FromHexError) -> Self {
        VaultError::new(ErrorCode::MalformedPayload, format!("invalid hex: {}", e))
    }
}

impl From<prost::DecodeError> for VaultError {
    fn from(e: prost::DecodeError) -> Self {
        VaultError::new(ErrorCode::MalformedPayload, format!("invalid protobuf: {}", e))
    }
}

impl From<bitcoin::bip32::Error> for VaultError {
    fn from(e: bitcoin::bip32::Error) -> Self {
        VaultError::new(ErrorCode::KeyDerivationFailure, format!("BIP32 error: {}", e))
    }
}

impl From<bitcoin::secp256k1::Error> for VaultError {
    fn from(e: bitcoin::secp256k1::Error) -> Self {
        VaultError::new(ErrorCode::KeyDerivationFailure, format!("Secp256k1 error: {}", e))
    }
}

impl From<bip39::Error> for VaultError {
    fn from(e: bip39::Error) -> Self {
        VaultError::new(ErrorCode::InvalidMnemonic, format!("BIP39 error: {}", e))
    }
}
