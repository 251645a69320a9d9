//! HD key derivation
//!
//! SECURITY: seeds are caller-owned and never retained; callers should keep
//! them in `Zeroizing` buffers.

use bitcoin::bip32::Xpriv;
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use bitcoin::Network;
use bip39::Mnemonic;
use zeroize::Zeroizing;

use crate::error::VaultResult;
use crate::wallet::derivation_path::DerivationPath;

/// Derive the private key at `path` from `seed`.
///
/// The master node is HMAC-SHA512 keyed with "Bitcoin seed"; each path
/// component is applied as one BIP32 child step.
pub fn derive_private_key(seed: &[u8], path: &DerivationPath) -> VaultResult<SecretKey> {
    let secp = Secp256k1::signing_only();
    let master = Xpriv::new_master(Network::Bitcoin, seed)?;
    let child = master.derive_priv(&secp, &path.to_bip32())?;
    Ok(child.private_key)
}

/// Parse `path` and derive the private key it names.
pub fn derive_private_key_str(seed: &[u8], path: &str) -> VaultResult<SecretKey> {
    let parsed = DerivationPath::parse(path)?;
    derive_private_key(seed, &parsed)
}

pub fn public_key_of(secret_key: &SecretKey) -> PublicKey {
    let secp = Secp256k1::signing_only();
    PublicKey::from_secret_key(&secp, secret_key)
}

/// Standard BIP-39 mnemonic to seed conversion.
pub fn seed_from_mnemonic(mnemonic: &str, passphrase: &str) -> VaultResult<Zeroizing<[u8; 64]>> {
    let mnemonic = Mnemonic::parse(mnemonic)?;
    Ok(Zeroizing::new(mnemonic.to_seed(passphrase)))
}
