// EVM Wallet Implementation
// One adapter for Ethereum and the EVM-compatible chains sharing its key
// and address scheme. Transactions are legacy, EIP-155 signed.

use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, TransactionRequest};
use ethers_signers::{LocalWallet, Signer};
use zeroize::Zeroizing;

use crate::adapter::ChainAdapter;
use crate::error::{VaultError, VaultResult};
use crate::types::{BigInt, EthereumRawTx};
use crate::utils::crypto::{keccak256, to_checksum_address};
use crate::utils::logging::mask_secret;
use crate::wallet::{self, slip44};
use crate::{log_debug, log_info};

const COIN_TYPES: [u32; 6] = [
    slip44::ETHEREUM,
    slip44::BINANCE,
    slip44::POLYGON,
    slip44::AVALANCHE,
    slip44::FANTOM,
    slip44::HARMONY,
];

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Ethereum, Binance, Polygon, Avalanche, Fantom and Harmony
#[derive(Debug, Default, Clone, Copy)]
pub struct EvmAdapter;

/// How a validated transaction will be interpreted on chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    ContractCreation,
    EtherTransfer,
    ContractCall,
}

impl TxKind {
    pub fn label(self) -> &'static str {
        match self {
            TxKind::ContractCreation => "Contract Creation",
            TxKind::EtherTransfer => "Ether Transfer",
            TxKind::ContractCall => "Contract Function Call",
        }
    }
}

/// Checked fields ready for signing
#[derive(Debug)]
struct ValidatedTx {
    kind: TxKind,
    to: Option<Address>,
    data: Vec<u8>,
    chain_id: u64,
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

/// Recipient address: `0x` (lowercase) followed by 40 hex digits, not the zero address.
fn parse_address(to: &str) -> VaultResult<Address> {
    let body = match to.strip_prefix("0x") {
        Some(body) if to.len() == 42 => body,
        _ => return Err(VaultError::invalid_fields(format!("invalid recipient address {:?}", to))),
    };
    if !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(VaultError::invalid_fields(format!("invalid recipient address {:?}", to)));
    }

    let mut bytes = [0u8; 20];
    hex::decode_to_slice(body, &mut bytes)
        .map_err(|e| VaultError::invalid_fields(format!("invalid recipient address {:?}: {}", to, e)))?;
    if bytes == [0u8; 20] {
        return Err(VaultError::invalid_fields("recipient is the zero address"));
    }
    Ok(Address::from(bytes))
}

fn require_non_negative(name: &str, value: &BigInt) -> VaultResult<()> {
    if value.is_negative() {
        return Err(VaultError::invalid_fields(format!("{} must not be negative: {}", name, value)));
    }
    Ok(())
}

fn validate(raw: &EthereumRawTx) -> VaultResult<ValidatedTx> {
    require_non_negative("value", &raw.value)?;
    require_non_negative("gasPrice", &raw.gas_price)?;
    require_non_negative("chainId", &raw.chain_id)?;
    let chain_id = raw
        .chain_id
        .to_u64()
        .ok_or_else(|| VaultError::invalid_fields(format!("chainId out of range: {}", raw.chain_id)))?;

    let data = hex::decode(strip_hex_prefix(raw.data.trim()))
        .map_err(|e| VaultError::invalid_fields(format!("data is not hex: {}", e)))?;

    // Classification looks at the fields as written: `"data":"0x"` counts as present.
    let (kind, to) = match (raw.to.is_empty(), raw.data.is_empty()) {
        (true, false) => (TxKind::ContractCreation, None),
        (true, true) => {
            return Err(VaultError::invalid_fields(
                "transaction has neither a recipient nor contract code",
            ))
        }
        (false, true) => (TxKind::EtherTransfer, Some(parse_address(&raw.to)?)),
        (false, false) => (TxKind::ContractCall, Some(parse_address(&raw.to)?)),
    };

    Ok(ValidatedTx { kind, to, data, chain_id })
}

fn build_request(raw: &EthereumRawTx, checked: &ValidatedTx) -> TransactionRequest {
    let request = TransactionRequest::new()
        .nonce(raw.nonce)
        .value(raw.value.magnitude)
        .gas(raw.gas_limit)
        .gas_price(raw.gas_price.magnitude)
        .chain_id(checked.chain_id)
        .data(checked.data.clone());
    match checked.to {
        Some(to) => request.to(to),
        None => request,
    }
}

fn uncompressed_address(secret: &bitcoin::secp256k1::SecretKey) -> String {
    let uncompressed = wallet::public_key_of(secret).serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    to_checksum_address(&hash[12..])
}

impl ChainAdapter for EvmAdapter {
    fn name(&self) -> &'static str {
        "evm"
    }

    fn coin_types(&self) -> &[u32] {
        &COIN_TYPES
    }

    fn derive_private_key(&self, seed: &[u8], path: &str, _is_dev: bool) -> VaultResult<Zeroizing<String>> {
        let secret = wallet::derive_private_key_str(seed, path)?;
        let key_hex = Zeroizing::new(hex::encode(secret.secret_bytes()));
        log_debug!("evm", "derived private key", private_key = mask_secret(&key_hex));
        Ok(key_hex)
    }

    fn derive_public_key(&self, seed: &[u8], path: &str, _is_dev: bool) -> VaultResult<String> {
        let secret = wallet::derive_private_key_str(seed, path)?;
        Ok(hex::encode(wallet::public_key_of(&secret).serialize()))
    }

    fn derive_address(&self, seed: &[u8], path: &str, _is_dev: bool) -> VaultResult<String> {
        let secret = wallet::derive_private_key_str(seed, path)?;
        Ok(uncompressed_address(&secret))
    }

    fn create_signed_transaction(
        &self,
        seed: &[u8],
        path: &str,
        payload: &str,
        _is_dev: bool,
    ) -> VaultResult<String> {
        let raw: EthereumRawTx = serde_json::from_str(payload)?;
        let checked = validate(&raw)?;
        log_debug!("evm", "validated transaction", kind = checked.kind.label(), chain_id = checked.chain_id);

        let secret = wallet::derive_private_key_str(seed, path)?;
        let wallet = LocalWallet::from_bytes(&secret.secret_bytes())
            .map_err(|e| VaultError::key_derivation(format!("invalid signing key: {}", e)))?
            .with_chain_id(checked.chain_id);

        let typed: TypedTransaction = build_request(&raw, &checked).into();
        let signature = wallet
            .sign_transaction_sync(&typed)
            .map_err(|e| VaultError::signing_failed(format!("EIP-155 signing failed: {}", e)))?;
        let signed = typed.rlp_signed(&signature);

        log_info!(
            "evm",
            "signed transaction",
            kind = checked.kind.label(),
            to = checked.to.map(|a| to_checksum_address(a.as_bytes())).unwrap_or_default(),
            nonce = raw.nonce
        );
        Ok(format!("0x{}", hex::encode(signed)))
    }
}
