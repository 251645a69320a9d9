//! Bitshares Wallet Implementation
//!
//! Graphene-style keys on a fixed derivation path. Public keys and
//! addresses use the `BTS` prefix with a RIPEMD-160 checksum; signatures
//! are 65-byte compact recoverable signatures from the deterministic signer.

use bitcoin::{Network, PrivateKey};
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use crate::adapter::ChainAdapter;
use crate::crypto::rfc6979;
use crate::error::{VaultError, VaultResult};
use crate::types::BitsharesRawTx;
use crate::utils::config::DEFAULT_MAX_SIGNATURE_ATTEMPTS;
use crate::utils::crypto::{ripemd160, sha256};
use crate::wallet::{self, slip44};
use crate::{log_debug, log_info};

/// Every Bitshares key lives here; caller-supplied paths are ignored.
pub const BITSHARES_PATH: &str = "m/44'/69'/69'/69/69";

pub const KEY_PREFIX: &str = "BTS";

const COIN_TYPES: [u32; 1] = [slip44::BITSHARES];

#[derive(Debug, Clone, Copy)]
pub struct BitsharesAdapter {
    max_signature_attempts: u32,
}

impl BitsharesAdapter {
    pub fn new(max_signature_attempts: u32) -> Self {
        Self { max_signature_attempts }
    }
}

impl Default for BitsharesAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIGNATURE_ATTEMPTS)
    }
}

fn derive_secret(seed: &[u8], requested_path: &str) -> VaultResult<bitcoin::secp256k1::SecretKey> {
    if requested_path != BITSHARES_PATH {
        log_debug!("bitshares", "ignoring requested path", path = requested_path);
    }
    wallet::derive_private_key_str(seed, BITSHARES_PATH)
}

/// `BTS` + base58(data || ripemd160(data)[..4])
fn encode_with_checksum(data: &[u8]) -> String {
    let checksum = ripemd160(data);
    let mut bytes = data.to_vec();
    bytes.extend_from_slice(&checksum[..4]);
    format!("{}{}", KEY_PREFIX, bs58::encode(bytes).into_string())
}

pub fn encode_public_key(compressed: &[u8; 33]) -> String {
    encode_with_checksum(compressed)
}

pub fn encode_address(compressed: &[u8; 33]) -> String {
    let raw_address = ripemd160(&Sha512::digest(compressed));
    encode_with_checksum(&raw_address)
}

/// Payload content checks are not implemented yet; only the presence of
/// `transactionDigest` is enforced.
fn validate_payload(payload: &BitsharesRawTx) -> VaultResult<()> {
    if payload.transaction_digest.is_empty() {
        return Err(VaultError::malformed_payload("transactionDigest is empty"));
    }
    Ok(())
}

impl ChainAdapter for BitsharesAdapter {
    fn name(&self) -> &'static str {
        "bitshares"
    }

    fn coin_types(&self) -> &[u32] {
        &COIN_TYPES
    }

    /// Uncompressed mainnet WIF
    fn derive_private_key(&self, seed: &[u8], path: &str, _is_dev: bool) -> VaultResult<Zeroizing<String>> {
        let secret = derive_secret(seed, path)?;
        Ok(Zeroizing::new(PrivateKey::new_uncompressed(secret, Network::Bitcoin).to_wif()))
    }

    fn derive_public_key(&self, seed: &[u8], path: &str, _is_dev: bool) -> VaultResult<String> {
        let secret = derive_secret(seed, path)?;
        Ok(encode_public_key(&wallet::public_key_of(&secret).serialize()))
    }

    fn derive_address(&self, seed: &[u8], path: &str, _is_dev: bool) -> VaultResult<String> {
        let secret = derive_secret(seed, path)?;
        Ok(encode_address(&wallet::public_key_of(&secret).serialize()))
    }

    fn create_signed_transaction(
        &self,
        seed: &[u8],
        path: &str,
        payload: &str,
        _is_dev: bool,
    ) -> VaultResult<String> {
        let raw: BitsharesRawTx = serde_json::from_str(payload)?;
        validate_payload(&raw)?;
        log_info!("bitshares", "signing digest", digest = raw.transaction_digest);

        let digest = hex::decode(&raw.transaction_digest)?;
        let secret = derive_secret(seed, path)?;
        let signature = rfc6979::sign_recoverable(&secret, &sha256(&digest), self.max_signature_attempts)?;
        Ok(hex::encode(signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use bitcoin::secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
    use bitcoin::secp256k1::{Message, Secp256k1};

    const SEED_HEX: &str = "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc19a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4";
    const DIGEST: &str = "4018d784b7e0d4eb6bdc13b6ba0a7b4b33e7b5ae5b1b6e74d6bf5e2c06a7e4e2";

    fn seed() -> Vec<u8> {
        hex::decode(SEED_HEX).unwrap()
    }

    #[test]
    fn test_fixed_path() {
        let adapter = BitsharesAdapter::default();
        let from_fixed = adapter.derive_public_key(&seed(), BITSHARES_PATH, false).unwrap();
        let from_other = adapter.derive_public_key(&seed(), "m/44'/60'/0'/0/0", false).unwrap();
        assert_eq!(from_fixed, from_other);
        assert!(adapter.can_handle(69));
        assert!(!adapter.can_handle(60));
    }

    #[test]
    fn test_key_formats() {
        let adapter = BitsharesAdapter::default();
        let public = adapter.derive_public_key(&seed(), "", false).unwrap();
        assert!(public.starts_with("BTS"));
        let decoded = bs58::decode(&public[3..]).into_vec().unwrap();
        assert_eq!(decoded.len(), 37);
        assert_eq!(&decoded[33..], &ripemd160(&decoded[..33])[..4]);

        let address = adapter.derive_address(&seed(), "", false).unwrap();
        assert!(address.starts_with("BTS"));
        let decoded = bs58::decode(&address[3..]).into_vec().unwrap();
        assert_eq!(decoded.len(), 24);

        let wif = adapter.derive_private_key(&seed(), "", false).unwrap();
        assert!(wif.starts_with('5'));
        let parsed = PrivateKey::from_wif(&wif).unwrap();
        assert!(!parsed.compressed);
        let secret = wallet::derive_private_key_str(&seed(), BITSHARES_PATH).unwrap();
        assert_eq!(parsed.inner, secret);
    }

    #[test]
    fn test_signature_recovers_signer() {
        let adapter = BitsharesAdapter::default();
        let payload = format!(r#"{{"transactionDigest":"{}"}}"#, DIGEST);
        let signed = adapter.create_signed_transaction(&seed(), "", &payload, false).unwrap();
        let signature = hex::decode(&signed).unwrap();
        assert_eq!(signature.len(), 65);
        assert!((31..=34).contains(&signature[0]));

        let secp = Secp256k1::new();
        let recovery_id = RecoveryId::from_i32(i32::from(signature[0] - 31)).unwrap();
        let recoverable = RecoverableSignature::from_compact(&signature[1..], recovery_id).unwrap();
        let hash = sha256(&hex::decode(DIGEST).unwrap());
        let recovered = secp.recover_ecdsa(&Message::from_digest(hash), &recoverable).unwrap();

        let secret = wallet::derive_private_key_str(&seed(), BITSHARES_PATH).unwrap();
        assert_eq!(recovered, wallet::public_key_of(&secret));
        assert_eq!(signed, adapter.create_signed_transaction(&seed(), "", &payload, false).unwrap());
    }

    #[test]
    fn test_payload_errors() {
        let adapter = BitsharesAdapter::default();
        for payload in ["{}", r#"{"transactionDigest":""}"#, r#"{"transactionDigest":"xyz"}"#, "nope"] {
            let err = adapter.create_signed_transaction(&seed(), "", payload, false).unwrap_err();
            assert_eq!(err.code, ErrorCode::MalformedPayload, "{}", payload);
        }
    }

    #[test]
    fn test_attempt_cap_applies() {
        let adapter = BitsharesAdapter::new(0);
        let payload = format!(r#"{{"transactionDigest":"{}"}}"#, DIGEST);
        let err = adapter.create_signed_transaction(&seed(), "", &payload, false).unwrap_err();
        assert_eq!(err.code, ErrorCode::SignatureRecoveryExhausted);
    }
}
