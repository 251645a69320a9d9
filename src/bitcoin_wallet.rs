// Bitcoin Wallet Implementation
// Legacy P2PKH keys and transactions, signed with SIGHASH_ALL and
// re-verified through the script engine before they are returned.

use bitcoin::consensus::encode;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{
    absolute::LockTime, transaction::Version, Address, Amount, CompressedPublicKey, Network,
    OutPoint, PrivateKey, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use std::str::FromStr;
use zeroize::Zeroizing;

use crate::adapter::ChainAdapter;
use crate::error::{VaultError, VaultResult};
use crate::tx::script::verify_input;
use crate::types::{BitcoinRawTx, BitcoinTxOutput};
use crate::utils::crypto::base58check_decode;
use crate::wallet::{self, slip44, DerivationPath, HARDENED};
use crate::{log_debug, log_info};

const COIN_TYPES: [u32; 2] = [slip44::BITCOIN, slip44::TESTNET];

/// Bitcoin mainnet (coin type 0) and testnet (coin type 1)
#[derive(Debug, Default, Clone, Copy)]
pub struct BitcoinAdapter;

struct BitcoinKeys {
    secret: SecretKey,
    public: CompressedPublicKey,
    network: Network,
}

impl BitcoinKeys {
    fn address(&self) -> Address {
        Address::p2pkh(self.public.pubkey_hash(), self.network)
    }
}

/// Testnet when running in dev mode or when the path names coin type 1.
fn select_network(path: &DerivationPath, is_dev: bool) -> Network {
    let testnet_path = path.components().get(1) == Some(&(HARDENED + slip44::TESTNET));
    if is_dev || testnet_path {
        Network::Testnet
    } else {
        Network::Bitcoin
    }
}

fn derive_keys(seed: &[u8], path: &str, is_dev: bool) -> VaultResult<BitcoinKeys> {
    let path = DerivationPath::parse(path)?;
    let secret = wallet::derive_private_key(seed, &path)?;
    let public = CompressedPublicKey(wallet::public_key_of(&secret));
    Ok(BitcoinKeys {
        secret,
        public,
        network: select_network(&path, is_dev),
    })
}

fn push_bytes(bytes: Vec<u8>) -> VaultResult<PushBytesBuf> {
    PushBytesBuf::try_from(bytes)
        .map_err(|e| VaultError::internal(format!("script push too large: {}", e)))
}

fn parse_outpoint(tx_hash: &str, vout: u32) -> VaultResult<OutPoint> {
    if tx_hash.len() != 64 {
        return Err(VaultError::invalid_fields(format!(
            "input txHash must be 64 hex characters, got {}",
            tx_hash.len()
        )));
    }
    let txid = Txid::from_str(tx_hash)
        .map_err(|e| VaultError::invalid_fields(format!("invalid input txHash: {}", e)))?;
    Ok(OutPoint::new(txid, vout))
}

/// Script paying `output`; the signer's own address pays back to `own_script`.
fn output_script(
    output: &BitcoinTxOutput,
    keys: &BitcoinKeys,
    own_address: &str,
    own_script: &ScriptBuf,
) -> VaultResult<ScriptBuf> {
    if output.address == own_address {
        return Ok(own_script.clone());
    }

    base58check_decode(&output.address)?;
    let address = Address::from_str(&output.address)
        .map_err(|e| VaultError::invalid_address_encoding(format!("{}: {}", output.address, e)))?
        .require_network(keys.network)
        .map_err(|e| VaultError::invalid_fields(format!("{}: {}", output.address, e)))?;
    Ok(address.script_pubkey())
}

fn build_unsigned(raw: &BitcoinRawTx, keys: &BitcoinKeys, own_script: &ScriptBuf) -> VaultResult<(Transaction, i64)> {
    let own_address = keys.address().to_string();

    let mut inputs = Vec::with_capacity(raw.inputs.len());
    for input in &raw.inputs {
        inputs.push(TxIn {
            previous_output: parse_outpoint(&input.tx_hash, input.vout)?,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::default(),
        });
    }

    let mut outputs = Vec::with_capacity(raw.outputs.len());
    let mut total: i64 = 0;
    for output in &raw.outputs {
        if output.amount_satoshis < 0 {
            return Err(VaultError::invalid_fields(format!(
                "negative output amount {} for {}",
                output.amount_satoshis, output.address
            )));
        }
        total = total
            .checked_add(output.amount_satoshis)
            .ok_or_else(|| VaultError::invalid_fields("output amounts overflow"))?;

        outputs.push(TxOut {
            value: Amount::from_sat(output.amount_satoshis.unsigned_abs()),
            script_pubkey: output_script(output, keys, &own_address, own_script)?,
        });
    }

    let tx = Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: inputs,
        output: outputs,
    };
    Ok((tx, total))
}

fn sign_inputs(tx: &mut Transaction, keys: &BitcoinKeys, own_script: &ScriptBuf) -> VaultResult<()> {
    let secp = Secp256k1::signing_only();

    let mut script_sigs = Vec::with_capacity(tx.input.len());
    {
        let cache = SighashCache::new(&*tx);
        for index in 0..tx.input.len() {
            let sighash = cache
                .legacy_signature_hash(index, own_script, EcdsaSighashType::All.to_u32())
                .map_err(|e| VaultError::signing_failed(format!("sighash for input {}: {}", index, e)))?;
            let signature = secp.sign_ecdsa(&Message::from_digest(sighash.to_byte_array()), &keys.secret);

            let mut sig_bytes = signature.serialize_der().to_vec();
            sig_bytes.push(EcdsaSighashType::All as u8);

            let script_sig = Builder::new()
                .push_slice(push_bytes(sig_bytes)?)
                .push_slice(push_bytes(keys.public.to_bytes().to_vec())?)
                .into_script();
            script_sigs.push(script_sig);
        }
    }

    for (input, script_sig) in tx.input.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }
    Ok(())
}

impl ChainAdapter for BitcoinAdapter {
    fn name(&self) -> &'static str {
        "bitcoin"
    }

    fn coin_types(&self) -> &[u32] {
        &COIN_TYPES
    }

    fn derive_private_key(&self, seed: &[u8], path: &str, is_dev: bool) -> VaultResult<Zeroizing<String>> {
        let keys = derive_keys(seed, path, is_dev)?;
        Ok(Zeroizing::new(PrivateKey::new(keys.secret, keys.network).to_wif()))
    }

    fn derive_public_key(&self, seed: &[u8], path: &str, is_dev: bool) -> VaultResult<String> {
        let keys = derive_keys(seed, path, is_dev)?;
        Ok(hex::encode(keys.public.to_bytes()))
    }

    fn derive_address(&self, seed: &[u8], path: &str, is_dev: bool) -> VaultResult<String> {
        Ok(derive_keys(seed, path, is_dev)?.address().to_string())
    }

    fn create_signed_transaction(
        &self,
        seed: &[u8],
        path: &str,
        payload: &str,
        is_dev: bool,
    ) -> VaultResult<String> {
        let raw: BitcoinRawTx = serde_json::from_str(payload)?;
        if raw.inputs.is_empty() {
            return Err(VaultError::malformed_payload("transaction has no inputs"));
        }
        if raw.outputs.is_empty() {
            return Err(VaultError::malformed_payload("transaction has no outputs"));
        }

        let keys = derive_keys(seed, path, is_dev)?;
        let own_script = ScriptBuf::new_p2pkh(&keys.public.pubkey_hash());

        let (mut tx, total) = build_unsigned(&raw, &keys, &own_script)?;
        log_debug!(
            "bitcoin",
            "built unsigned transaction",
            inputs = tx.input.len(),
            outputs = tx.output.len(),
            value_sats = total
        );

        sign_inputs(&mut tx, &keys, &own_script)?;

        for index in 0..tx.input.len() {
            verify_input(&tx, index, &own_script)?;
        }

        log_info!(
            "bitcoin",
            "signed transaction",
            txid = tx.compute_txid(),
            value_sats = total,
            network = keys.network
        );
        Ok(hex::encode(encode::serialize(&tx)))
    }
}
