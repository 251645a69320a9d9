//! Wallet Module
//!
//! Path parsing, HD key derivation and the SLIP-44 coin type registry.

pub mod derivation;
pub mod derivation_path;
pub mod slip44;

pub use derivation::*;
pub use derivation_path::{DerivationPath, PathError, DEFAULT_ROOT, HARDENED};
