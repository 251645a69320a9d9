//! P2PKH script verification
//!
//! Re-executes `scriptSig` + `scriptPubKey` for pay-to-pubkey-hash spends so
//! signed transactions can be checked before they leave the vault. Only the
//! opcodes of that template are evaluated; signatures must be strict DER.

use bitcoin::hashes::{hash160, Hash};
use bitcoin::opcodes::all::{OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_HASH160};
use bitcoin::opcodes::Opcode;
use bitcoin::script::{Instruction, Script};
use bitcoin::secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, VerifyOnly};
use bitcoin::sighash::SighashCache;
use bitcoin::Transaction;
use thiserror::Error;

use crate::error::VaultError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("input index {0} out of range")]
    InputIndex(usize),
    #[error("output script is not pay-to-pubkey-hash")]
    NotP2pkh,
    #[error("scriptSig must be push-only")]
    SigPushOnly,
    #[error("malformed script: {0}")]
    Malformed(String),
    #[error("unsupported opcode {0}")]
    UnsupportedOpcode(String),
    #[error("stack underflow")]
    StackUnderflow,
    #[error("OP_EQUALVERIFY failed")]
    EqualVerify,
    #[error("signature is not strict DER")]
    SignatureEncoding,
    #[error("script evaluated to false")]
    EvalFalse,
}

impl From<ScriptError> for VaultError {
    fn from(e: ScriptError) -> Self {
        VaultError::script_verification(e.to_string())
    }
}

type Stack = Vec<Vec<u8>>;

/// Verify input `input_index` of `tx` spending the P2PKH `script_pubkey`.
pub fn verify_input(tx: &Transaction, input_index: usize, script_pubkey: &Script) -> Result<(), ScriptError> {
    let input = tx.input.get(input_index).ok_or(ScriptError::InputIndex(input_index))?;
    if !script_pubkey.is_p2pkh() {
        return Err(ScriptError::NotP2pkh);
    }
    let script_sig = input.script_sig.as_script();
    if !script_sig.is_push_only() {
        return Err(ScriptError::SigPushOnly);
    }

    let checker = SignatureChecker {
        tx,
        input_index,
        secp: Secp256k1::verification_only(),
    };

    let mut stack = Stack::new();
    checker.execute(script_sig, &mut stack)?;
    checker.execute(script_pubkey, &mut stack)?;
    if !stack.last().map_or(false, |top| as_bool(top)) {
        return Err(ScriptError::EvalFalse);
    }
    Ok(())
}

struct SignatureChecker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    secp: Secp256k1<VerifyOnly>,
}

impl SignatureChecker<'_> {
    fn execute(&self, script: &Script, stack: &mut Stack) -> Result<(), ScriptError> {
        for instruction in script.instructions() {
            let instruction = instruction.map_err(|e| ScriptError::Malformed(e.to_string()))?;
            match instruction {
                Instruction::PushBytes(bytes) => stack.push(bytes.as_bytes().to_vec()),
                Instruction::Op(op) => self.step(op, script, stack)?,
            }
        }
        Ok(())
    }

    fn step(&self, op: Opcode, script: &Script, stack: &mut Stack) -> Result<(), ScriptError> {
        match op {
            OP_DUP => {
                let top = stack.last().ok_or(ScriptError::StackUnderflow)?.clone();
                stack.push(top);
            }
            OP_HASH160 => {
                let top = pop(stack)?;
                stack.push(hash160::Hash::hash(&top).to_byte_array().to_vec());
            }
            OP_EQUALVERIFY => {
                let a = pop(stack)?;
                let b = pop(stack)?;
                if a != b {
                    return Err(ScriptError::EqualVerify);
                }
            }
            OP_CHECKSIG => {
                let pubkey = pop(stack)?;
                let sig = pop(stack)?;
                let valid = self.check_sig(&sig, &pubkey, script)?;
                stack.push(if valid { vec![1] } else { Vec::new() });
            }
            _ => return Err(ScriptError::UnsupportedOpcode(op.to_string())),
        }
        Ok(())
    }

    /// Check one `DER || hashtype` signature against `pubkey` over `script_code`.
    fn check_sig(&self, sig: &[u8], pubkey: &[u8], script_code: &Script) -> Result<bool, ScriptError> {
        let Some((&hash_type, der)) = sig.split_last() else {
            return Ok(false);
        };
        let mut signature = Signature::from_der(der).map_err(|_| ScriptError::SignatureEncoding)?;
        signature.normalize_s();

        let Ok(pubkey) = PublicKey::from_slice(pubkey) else {
            return Ok(false);
        };

        let sighash = SighashCache::new(self.tx)
            .legacy_signature_hash(self.input_index, script_code, u32::from(hash_type))
            .map_err(|_| ScriptError::InputIndex(self.input_index))?;
        let message = Message::from_digest(sighash.to_byte_array());

        Ok(self.secp.verify_ecdsa(&message, &signature, &pubkey).is_ok())
    }
}

fn pop(stack: &mut Stack) -> Result<Vec<u8>, ScriptError> {
    stack.pop().ok_or(ScriptError::StackUnderflow)
}

fn as_bool(value: &[u8]) -> bool {
    match value.split_last() {
        None => false,
        Some((&last, rest)) => rest.iter().any(|&b| b != 0) || (last != 0 && last != 0x80),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::opcodes::all::OP_PUSHNUM_1;
    use bitcoin::script::{Builder, PushBytesBuf};
    use bitcoin::secp256k1::SecretKey;
    use bitcoin::sighash::EcdsaSighashType;
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, CompressedPublicKey, OutPoint, ScriptBuf, Sequence, TxIn, TxOut, Witness};

    fn unsigned_tx() -> Transaction {
        Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::default(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(1_000),
                script_pubkey: ScriptBuf::new(),
            }],
        }
    }

    fn sign(tx: &Transaction, script_code: &Script, secret: &SecretKey) -> Vec<u8> {
        let secp = Secp256k1::signing_only();
        let sighash = SighashCache::new(tx)
            .legacy_signature_hash(0, script_code, EcdsaSighashType::All.to_u32())
            .unwrap();
        let sig = secp.sign_ecdsa(&Message::from_digest(sighash.to_byte_array()), secret);
        let mut bytes = sig.serialize_der().to_vec();
        bytes.push(EcdsaSighashType::All as u8);
        bytes
    }

    fn key(byte: u8) -> (SecretKey, CompressedPublicKey) {
        let secp = Secp256k1::signing_only();
        let secret = SecretKey::from_slice(&[byte; 32]).unwrap();
        let public = CompressedPublicKey(PublicKey::from_secret_key(&secp, &secret));
        (secret, public)
    }

    fn push(bytes: Vec<u8>) -> PushBytesBuf {
        PushBytesBuf::try_from(bytes).unwrap()
    }

    fn spend(sig: Vec<u8>, public: &CompressedPublicKey) -> ScriptBuf {
        Builder::new()
            .push_slice(push(sig))
            .push_slice(push(public.to_bytes().to_vec()))
            .into_script()
    }

    #[test]
    fn p2pkh_round_trip() {
        let (secret, public) = key(7);
        let script_pubkey = ScriptBuf::new_p2pkh(&public.pubkey_hash());
        let mut tx = unsigned_tx();
        let sig = sign(&tx, &script_pubkey, &secret);
        tx.input[0].script_sig = spend(sig, &public);

        assert_eq!(verify_input(&tx, 0, &script_pubkey), Ok(()));
    }

    #[test]
    fn wrong_key_fails() {
        let (secret, _) = key(7);
        let (_, other) = key(8);
        let script_pubkey = ScriptBuf::new_p2pkh(&other.pubkey_hash());
        let mut tx = unsigned_tx();
        let sig = sign(&tx, &script_pubkey, &secret);
        tx.input[0].script_sig = spend(sig, &other);

        assert_eq!(verify_input(&tx, 0, &script_pubkey), Err(ScriptError::EvalFalse));
    }

    #[test]
    fn pubkey_hash_mismatch_fails() {
        let (secret, public) = key(7);
        let (_, other) = key(8);
        let script_pubkey = ScriptBuf::new_p2pkh(&other.pubkey_hash());
        let mut tx = unsigned_tx();
        let sig = sign(&tx, &script_pubkey, &secret);
        tx.input[0].script_sig = spend(sig, &public);

        assert_eq!(verify_input(&tx, 0, &script_pubkey), Err(ScriptError::EqualVerify));
    }

    #[test]
    fn tampered_output_invalidates_signature() {
        let (secret, public) = key(9);
        let script_pubkey = ScriptBuf::new_p2pkh(&public.pubkey_hash());
        let mut tx = unsigned_tx();
        let sig = sign(&tx, &script_pubkey, &secret);
        tx.input[0].script_sig = spend(sig, &public);
        tx.output[0].value = Amount::from_sat(999);

        assert_eq!(verify_input(&tx, 0, &script_pubkey), Err(ScriptError::EvalFalse));
    }

    #[test]
    fn non_der_signature_is_rejected() {
        let (_, public) = key(3);
        let script_pubkey = ScriptBuf::new_p2pkh(&public.pubkey_hash());
        let mut tx = unsigned_tx();
        tx.input[0].script_sig = spend(vec![0x30, 0x01, 0x01, 0x01], &public);

        assert_eq!(verify_input(&tx, 0, &script_pubkey), Err(ScriptError::SignatureEncoding));
    }

    #[test]
    fn only_p2pkh_outputs_are_accepted() {
        let tx = unsigned_tx();
        let script_pubkey = Builder::new().push_opcode(OP_PUSHNUM_1).into_script();
        assert_eq!(verify_input(&tx, 0, &script_pubkey), Err(ScriptError::NotP2pkh));

        let (_, public) = key(4);
        let p2pkh = ScriptBuf::new_p2pkh(&public.pubkey_hash());
        let mut tx = unsigned_tx();
        tx.input[0].script_sig = Builder::new().push_opcode(OP_DUP).into_script();
        assert_eq!(verify_input(&tx, 0, &p2pkh), Err(ScriptError::SigPushOnly));
        assert_eq!(verify_input(&tx, 1, &p2pkh), Err(ScriptError::InputIndex(1)));
    }

    #[test]
    fn negative_zero_is_false() {
        assert!(!as_bool(&[0x00, 0x80]));
        assert!(!as_bool(&[]));
        assert!(as_bool(&[0x00, 0x01]));
        assert!(as_bool(&[0x81]));
    }
}
