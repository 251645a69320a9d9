//! Cryptographic primitives
//!
//! - RFC 6979 deterministic ECDSA with public-key recovery

pub mod rfc6979;

pub use rfc6979::{sign_deterministic, sign_recoverable, CompactSignature};
