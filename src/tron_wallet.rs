// Tron (TRX) Wallet Implementation
// Uses secp256k1 curve, similar to Ethereum but with different address encoding
// Derivation path: m/44'/195'/account'/change/index

use bitcoin::bip32::DerivationPath as Bip32Path;
use bitcoin::secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use prost::Message as _;
use std::str::FromStr;
use zeroize::Zeroizing;

use crate::abi::trc20;
use crate::adapter::ChainAdapter;
use crate::error::{VaultError, VaultResult};
use crate::tx::tron_proto::{
    unpack_any, Contract, ContractType, TransactionRaw, TransferContract, TriggerSmartContract,
    TRANSFER_CONTRACT_NAME, TRIGGER_SMART_CONTRACT_NAME,
};
use crate::utils::crypto::{base58check_encode, keccak256, sha256};
use crate::wallet::slip44;
use crate::{log_debug, log_info};

const COIN_TYPES: [u32; 1] = [slip44::TRON];

/// Purpose and coin type prefix of every Tron path
pub const TRON_BASE_PATH: &str = "44'/195'/";

/// Mainnet address prefix byte
pub const ADDRESS_PREFIX: u8 = 0x41;

#[derive(Debug, Default, Clone, Copy)]
pub struct TronAdapter;

/// Resolve a caller path into a full Tron path without the leading `m/`.
///
/// `m/a/b/c` is taken relative to `44'/195'/`; longer paths must already
/// contain that prefix.
pub fn resolve_tron_path(path: &str) -> VaultResult<String> {
    let mut parts = path.split('/');
    match parts.next().map(str::trim) {
        Some("m") => {}
        Some("") | None => return Err(VaultError::invalid_path("empty Tron derivation path")),
        Some(_) => {
            return Err(VaultError::invalid_path(format!(
                "Tron derivation path must start with m/: {}",
                path
            )))
        }
    }

    let rest: Vec<&str> = parts.collect();
    let joined = rest.join("/");
    if rest.len() == 3 {
        return Ok(format!("{}{}", TRON_BASE_PATH, joined));
    }
    if !joined.contains(TRON_BASE_PATH) {
        return Err(VaultError::invalid_path(format!(
            "not a Tron derivation path: {}",
            path
        )));
    }
    Ok(joined)
}

fn derive_secret(seed: &[u8], path: &str) -> VaultResult<SecretKey> {
    let resolved = resolve_tron_path(path)?;
    let bip32_path = Bip32Path::from_str(&format!("m/{}", resolved))
        .map_err(|e| VaultError::invalid_path(format!("{}: {}", resolved, e)))?;

    let master = bitcoin::bip32::Xpriv::new_master(bitcoin::Network::Bitcoin, seed)?;
    let child = master.derive_priv(&Secp256k1::signing_only(), &bip32_path)?;
    Ok(child.private_key)
}

/// Tron address for a public key: base58check(0x41 || keccak256(X || Y)[12..])
pub fn encode_tron_address(public_key: &PublicKey) -> String {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    encode_raw_address(&hash[12..])
}

/// Prefix a 20-byte EVM-style address with 0x41 and base58check it.
pub fn encode_raw_address(address: &[u8]) -> String {
    let mut full = Vec::with_capacity(21);
    full.push(ADDRESS_PREFIX);
    full.extend_from_slice(address);
    base58check_encode(&full)
}

/// Logical destination of the first contract, if one can be determined.
fn resolve_destination(contract: &Contract) -> VaultResult<Option<String>> {
    let kind = ContractType::try_from(contract.r#type).map_err(|_| {
        VaultError::unsupported_contract(format!("contract type {}", contract.r#type))
    })?;
    let parameter = || {
        contract
            .parameter
            .as_ref()
            .ok_or_else(|| VaultError::malformed_payload("contract has no parameter"))
    };

    match kind {
        ContractType::TransferContract => {
            let transfer: TransferContract = unpack_any(parameter()?, TRANSFER_CONTRACT_NAME)?;
            Ok(Some(base58check_encode(&transfer.to_address)))
        }
        ContractType::TriggerSmartContract => {
            let trigger: TriggerSmartContract = unpack_any(parameter()?, TRIGGER_SMART_CONTRACT_NAME)?;
            let call = trc20::decode_call(&trigger.data)?;
            let recipient = call.recipient().map(|address| encode_raw_address(&address));
            if recipient.is_none() {
                log_debug!("tron", "contract call has no resolvable recipient", function = call.function);
            }
            Ok(recipient)
        }
        other => Err(VaultError::unsupported_contract(format!("{:?}", other))),
    }
}

impl ChainAdapter for TronAdapter {
    fn name(&self) -> &'static str {
        "tron"
    }

    fn coin_types(&self) -> &[u32] {
        &COIN_TYPES
    }

    fn derive_private_key(&self, seed: &[u8], path: &str, _is_dev: bool) -> VaultResult<Zeroizing<String>> {
        let secret = derive_secret(seed, path)?;
        Ok(Zeroizing::new(hex::encode(secret.secret_bytes())))
    }

    /// Uncompressed (65-byte) public key hex
    fn derive_public_key(&self, seed: &[u8], path: &str, _is_dev: bool) -> VaultResult<String> {
        let secret = derive_secret(seed, path)?;
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        Ok(hex::encode(public.serialize_uncompressed()))
    }

    fn derive_address(&self, seed: &[u8], path: &str, _is_dev: bool) -> VaultResult<String> {
        let secret = derive_secret(seed, path)?;
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        Ok(encode_tron_address(&public))
    }

    /// Sign a hex-encoded `Transaction.raw`; returns `r || s || v` as hex.
    fn create_signed_transaction(
        &self,
        seed: &[u8],
        path: &str,
        payload: &str,
        _is_dev: bool,
    ) -> VaultResult<String> {
        let trimmed = payload.trim();
        let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))?;
        let raw = TransactionRaw::decode(bytes.as_slice())?;
        // The txid is taken over our re-encoding, so it must match the caller's bytes.
        let encoded = raw.encode_to_vec();
        if encoded != bytes {
            return Err(VaultError::malformed_payload(
                "transaction contains unknown or non-canonical fields",
            ));
        }

        let contract = raw
            .contract
            .first()
            .ok_or_else(|| VaultError::malformed_payload("transaction has no contracts"))?;
        let destination = resolve_destination(contract)?;

        let secret = derive_secret(seed, path)?;
        let txid = sha256(&encoded);
        let signature = Secp256k1::signing_only()
            .sign_ecdsa_recoverable(&Message::from_digest(txid), &secret);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&compact);
        out.push(recovery_id.to_i32() as u8);

        log_info!(
            "tron",
            "signed transaction",
            txid = hex::encode(txid),
            contract_type = contract.r#type,
            recipient = destination.unwrap_or_else(|| "unresolved".to_string())
        );
        Ok(hex::encode(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::tx::tron_proto::pack_any;
    use bitcoin::secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
    use ethers_core::abi::{Address, Token};
    use ethers_core::types::U256;

    const SEED_HEX: &str = "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc19a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4";
    const PATH: &str = "m/44'/195'/0'/0/0";

    fn seed() -> Vec<u8> {
        hex::decode(SEED_HEX).unwrap()
    }

    fn raw_with(contract: Contract) -> TransactionRaw {
        TransactionRaw {
            ref_block_bytes: vec![0x12, 0x34],
            ref_block_hash: vec![0xab; 8],
            expiration: 1_700_000_060_000,
            contract: vec![contract],
            timestamp: 1_700_000_000_000,
            fee_limit: 10_000_000,
            ..Default::default()
        }
    }

    fn transfer_raw() -> TransactionRaw {
        let mut to_address = vec![ADDRESS_PREFIX];
        to_address.extend_from_slice(&[0x22; 20]);
        let transfer = TransferContract {
            owner_address: vec![ADDRESS_PREFIX; 21],
            to_address,
            amount: 1_000_000,
        };
        raw_with(Contract {
            r#type: ContractType::TransferContract as i32,
            parameter: Some(pack_any(&transfer, TRANSFER_CONTRACT_NAME)),
            ..Default::default()
        })
    }

    fn trigger_raw(data: Vec<u8>) -> TransactionRaw {
        let trigger = TriggerSmartContract {
            owner_address: vec![ADDRESS_PREFIX; 21],
            contract_address: vec![ADDRESS_PREFIX; 21],
            data,
            ..Default::default()
        };
        raw_with(Contract {
            r#type: ContractType::TriggerSmartContract as i32,
            parameter: Some(pack_any(&trigger, TRIGGER_SMART_CONTRACT_NAME)),
            ..Default::default()
        })
    }

    fn sign(raw: &TransactionRaw) -> VaultResult<String> {
        TronAdapter.create_signed_transaction(&seed(), PATH, &hex::encode(raw.encode_to_vec()), false)
    }

    #[test]
    fn test_path_resolution() {
        assert_eq!(resolve_tron_path("m/0'/0/0").unwrap(), "44'/195'/0'/0/0");
        assert_eq!(resolve_tron_path(PATH).unwrap(), "44'/195'/0'/0/0");

        assert_eq!(resolve_tron_path(" m/0'/0/0").unwrap(), "44'/195'/0'/0/0");
        assert_eq!(resolve_tron_path("m /44'/195'/1'/0/0").unwrap(), "44'/195'/1'/0/0");

        for bad in ["", " ", " /0'/0/0", "invalid/path", "44'/195'/0'/0/0", "/44'/195'/0'/0/0", "m/44'/60'/0'/0/0", "m/0/0"] {
            let err = resolve_tron_path(bad).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidDerivationPath, "{:?}", bad);
        }
    }

    #[test]
    fn test_relative_and_absolute_agree() {
        let adapter = TronAdapter;
        assert_eq!(
            adapter.derive_address(&seed(), "m/0'/0/0", false).unwrap(),
            adapter.derive_address(&seed(), PATH, false).unwrap()
        );
        assert_eq!(
            adapter.derive_address(&seed(), "m/44'/60'/0'/0/0", false).unwrap_err().code,
            ErrorCode::InvalidDerivationPath
        );
    }

    #[test]
    fn test_key_formats() {
        let adapter = TronAdapter;
        let address = adapter.derive_address(&seed(), PATH, false).unwrap();
        assert!(address.starts_with('T'));
        assert_eq!(address.len(), 34);

        let public = adapter.derive_public_key(&seed(), PATH, false).unwrap();
        assert_eq!(public.len(), 130);
        assert!(public.starts_with("04"));

        let private = adapter.derive_private_key(&seed(), PATH, false).unwrap();
        assert_eq!(private.len(), 64);

        // Same key tree as the generic derivation
        let generic = crate::wallet::derive_private_key_str(&seed(), PATH).unwrap();
        assert_eq!(*private, hex::encode(generic.secret_bytes()));
        assert!(adapter.can_handle(195));
        assert!(!adapter.can_handle(60));
    }

    #[test]
    fn test_address_shares_evm_hash() {
        let address = TronAdapter.derive_address(&seed(), PATH, false).unwrap();
        let decoded = crate::utils::crypto::base58check_decode(&address).unwrap();
        assert_eq!(decoded[0], ADDRESS_PREFIX);

        let evm = crate::ethereum_wallet::EvmAdapter.derive_address(&seed(), PATH, false).unwrap();
        assert_eq!(hex::encode(&decoded[1..]), evm.trim_start_matches("0x").to_lowercase());
    }

    #[test]
    fn test_signs_transfer_and_recovers() {
        let raw = transfer_raw();
        let signature = hex::decode(sign(&raw).unwrap()).unwrap();
        assert_eq!(signature.len(), 65);
        assert!(signature[64] <= 3);

        let secp = Secp256k1::new();
        let recovery_id = RecoveryId::from_i32(i32::from(signature[64])).unwrap();
        let recoverable = RecoverableSignature::from_compact(&signature[..64], recovery_id).unwrap();
        let message = Message::from_digest(sha256(&raw.encode_to_vec()));
        let recovered = secp.recover_ecdsa(&message, &recoverable).unwrap();

        let expected = TronAdapter.derive_public_key(&seed(), PATH, false).unwrap();
        assert_eq!(hex::encode(recovered.serialize_uncompressed()), expected);
    }

    #[test]
    fn test_transfer_destination() {
        let raw = transfer_raw();
        let destination = resolve_destination(&raw.contract[0]).unwrap().unwrap();
        assert!(destination.starts_with('T'));
        assert_eq!(destination, encode_raw_address(&[0x22; 20]));
    }

    #[test]
    fn test_trc20_transfer() {
        let abi = trc20::trc20_abi().unwrap();
        let data = abi
            .function("transfer")
            .unwrap()
            .encode_input(&[Token::Address(Address::repeat_byte(0x33)), Token::Uint(U256::from(10u64))])
            .unwrap();
        let raw = trigger_raw(data);

        assert_eq!(
            resolve_destination(&raw.contract[0]).unwrap(),
            Some(encode_raw_address(&[0x33; 20]))
        );
        assert_eq!(hex::decode(sign(&raw).unwrap()).unwrap().len(), 65);
    }

    #[test]
    fn test_rejections() {
        let unknown_selector = trigger_raw(vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        assert_eq!(sign(&unknown_selector).unwrap_err().code, ErrorCode::MalformedPayload);

        let mut unsupported = transfer_raw();
        unsupported.contract[0].r#type = ContractType::FreezeBalanceContract as i32;
        assert_eq!(sign(&unsupported).unwrap_err().code, ErrorCode::UnsupportedContractType);

        let mut unknown_type = transfer_raw();
        unknown_type.contract[0].r#type = 999;
        assert_eq!(sign(&unknown_type).unwrap_err().code, ErrorCode::UnsupportedContractType);

        let mut no_contracts = transfer_raw();
        no_contracts.contract.clear();
        assert_eq!(sign(&no_contracts).unwrap_err().code, ErrorCode::MalformedPayload);

        let mut no_parameter = transfer_raw();
        no_parameter.contract[0].parameter = None;
        assert_eq!(sign(&no_parameter).unwrap_err().code, ErrorCode::MalformedPayload);

        let bad_hex = TronAdapter.create_signed_transaction(&seed(), PATH, "zz", false);
        assert_eq!(bad_hex.unwrap_err().code, ErrorCode::MalformedPayload);

        let bad_proto = TronAdapter.create_signed_transaction(&seed(), PATH, "ffff", false);
        assert_eq!(bad_proto.unwrap_err().code, ErrorCode::MalformedPayload);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let canonical = transfer_raw().encode_to_vec();
        assert!(TronAdapter
            .create_signed_transaction(&seed(), PATH, &hex::encode(&canonical), false)
            .is_ok());

        // field 100, varint 1
        let mut extended = canonical.clone();
        extended.extend_from_slice(&[0xa0, 0x06, 0x01]);
        assert_eq!(TransactionRaw::decode(extended.as_slice()).unwrap(), transfer_raw());
        let err = TronAdapter
            .create_signed_transaction(&seed(), PATH, &hex::encode(&extended), false)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedPayload);

        // fields out of order decode fine but re-encode differently
        let mut reordered = transfer_raw();
        reordered.timestamp = 0;
        let mut bytes = Vec::new();
        prost::encoding::int64::encode(14, &1_700_000_000_000, &mut bytes);
        bytes.extend_from_slice(&reordered.encode_to_vec());
        assert_eq!(TransactionRaw::decode(bytes.as_slice()).unwrap(), transfer_raw());
        let err = TronAdapter
            .create_signed_transaction(&seed(), PATH, &hex::encode(&bytes), false)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedPayload);
    }
}
