//! HD Vault Core Library
//!
//! Hierarchical-deterministic key derivation and transaction signing for
//! several chain families.
//!
//! # Architecture
//!
//! This crate provides:
//! - **wallet**: Derivation path parsing, BIP32 derivation, SLIP-44 registry
//! - **crypto**: Deterministic (RFC 6979) recoverable signatures
//! - **adapter**: The per-chain capability interface
//! - **inventory**: Coin type to adapter registry, built once and shared
//! - **tx**: Bitcoin script verification and the Tron protobuf schema
//! - **abi**: TRC20 call-data decoding
//!
//! Chain adapters live in `bitcoin_wallet`, `ethereum_wallet`,
//! `tron_wallet` and `bitshares_wallet`.
//!
//! # Security
//!
//! Seeds are borrowed per call and never stored. Exported private keys are
//! returned in `zeroize::Zeroizing` buffers, and the logger masks any field
//! that names a key, seed or mnemonic.
//!
//! # Example
//!
//! ```rust,ignore
//! use hdvault_core::Inventory;
//!
//! let inventory = Inventory::new()?;
//! let address = inventory.derive_address(&seed, 60, "m/44'/60'/0'/0/0", false)?;
//! ```

pub mod abi;
pub mod adapter;
pub mod crypto;
pub mod error;
pub mod inventory;
pub mod tx;
pub mod types;
pub mod utils;
pub mod wallet;

pub mod bitcoin_wallet;
pub mod bitshares_wallet;
pub mod ethereum_wallet;
pub mod tron_wallet;

pub use adapter::ChainAdapter;
pub use error::{ErrorCode, VaultError, VaultResult};
pub use inventory::Inventory;
pub use utils::config::VaultSettings;
pub use wallet::{DerivationPath, PathError};
