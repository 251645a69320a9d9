//! Deterministic ECDSA with an embedded recovery id
//!
//! Nonces follow the HMAC-DRBG construction of RFC 6979 section 3.2 over
//! HMAC-SHA256. The outer search produces Graphene-style compact signatures:
//! `[27 + recid + 4] || R || S`, where both R and S must serialize to exactly
//! 32 DER bytes. Candidates that fail are retried with a perturbed message
//! hash (`sha256(hash || attempt_be32)`).
//!
//! Reference: https://tools.ietf.org/html/rfc6979#section-3.2

use bitcoin::secp256k1::{ecdsa::Signature as DerSignature, SecretKey};
use hmac::{Hmac, Mac};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::point::AffineCoordinates;
use k256::elliptic_curve::scalar::IsHigh;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, ProjectivePoint, Scalar, U256};
use sha2::{Digest, Sha256};

use crate::error::{VaultError, VaultResult};

type HmacSha256 = Hmac<Sha256>;

/// Header offset for a recovery id over a compressed public key
const COMPACT_HEADER_BASE: u8 = 27 + 4;

/// Compact recoverable signature: header byte, R, S
pub type CompactSignature = [u8; 65];

fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> VaultResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| VaultError::internal(format!("HMAC key rejected: {}", e)))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

fn scalar_from_hash(hash: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*hash))
}

/// One ECDSA signing attempt with candidate nonce `t`, or `None` if the
/// candidate is outside `[1, n-1]` or yields a zero `r` or `s`.
fn try_sign(d: &Scalar, e: &Scalar, t: &[u8; 32]) -> Option<(Scalar, Scalar)> {
    let k: Option<Scalar> = Scalar::from_repr(FieldBytes::from(*t)).into();
    let k = k.filter(|k| !bool::from(k.is_zero()))?;

    let point = (ProjectivePoint::GENERATOR * k).to_affine();
    let r = <Scalar as Reduce<U256>>::reduce_bytes(&point.x());
    if bool::from(r.is_zero()) {
        return None;
    }

    let k_inv: Option<Scalar> = k.invert().into();
    let s = k_inv? * (*e + r * d);
    if bool::from(s.is_zero()) {
        return None;
    }
    Some((r, s))
}

/// Deterministically sign `hash` with the nonce stream selected by `attempt`.
///
/// Returns low-S `(r, s)` as 64 big-endian bytes. For `attempt == 0` the
/// result matches plain RFC 6979 signing of `hash`.
pub fn sign_deterministic(secret: &SecretKey, hash: &[u8; 32], attempt: u32) -> VaultResult<[u8; 64]> {
    let signing_key = SigningKey::from_slice(&secret.secret_bytes())
        .map_err(|e| VaultError::key_derivation(format!("invalid signing key: {}", e)))?;
    let d: Scalar = *signing_key.as_nonzero_scalar().as_ref();

    // The private scalar enters the DRBG as its minimal big-endian encoding.
    let secret_bytes = secret.secret_bytes();
    let first_nonzero = secret_bytes.iter().position(|&b| b != 0).unwrap_or(secret_bytes.len());
    let x = &secret_bytes[first_nonzero..];

    let h1: [u8; 32] = if attempt > 0 {
        let mut hasher = Sha256::new();
        hasher.update(hash);
        hasher.update(attempt.to_be_bytes());
        hasher.finalize().into()
    } else {
        *hash
    };
    let e = scalar_from_hash(hash);

    // Steps B through H2b
    let mut v = [0x01u8; 32];
    let mut k = [0x00u8; 32];
    k = hmac_sha256(&k, &[&v, &[0x00], x, &h1])?;
    v = hmac_sha256(&k, &[&v])?;
    k = hmac_sha256(&k, &[&v, &[0x01], x, &h1])?;
    v = hmac_sha256(&k, &[&v])?;
    v = hmac_sha256(&k, &[&v])?;

    // Step H3
    let (r, mut s) = loop {
        if let Some(signature) = try_sign(&d, &e, &v) {
            break signature;
        }
        k = hmac_sha256(&k, &[&v, &[0x00]])?;
        v = hmac_sha256(&k, &[&v])?;
        v = hmac_sha256(&k, &[&v])?;
    };

    if bool::from(s.is_high()) {
        s = -s;
    }

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(&r.to_bytes());
    compact[32..].copy_from_slice(&s.to_bytes());
    Ok(compact)
}

/// True when R and S each take exactly 32 bytes in DER form.
fn has_full_width_der(compact: &[u8; 64]) -> VaultResult<bool> {
    let der = DerSignature::from_compact(compact)?.serialize_der();
    let len_r = der[3] as usize;
    let len_s = der[5 + len_r] as usize;
    Ok(len_r == 32 && len_s == 32)
}

fn find_recovery_id(
    hash: &[u8; 32],
    compact: &[u8; 64],
    signer: &VerifyingKey,
) -> Option<u8> {
    let signature = Signature::from_slice(compact).ok()?;
    (0u8..4).find(|&id| {
        RecoveryId::from_byte(id)
            .and_then(|recovery_id| VerifyingKey::recover_from_prehash(hash, &signature, recovery_id).ok())
            .map_or(false, |recovered| recovered == *signer)
    })
}

/// Produce a 65-byte recoverable signature over `hash`.
///
/// Gives up with `SignatureRecoveryExhausted` after `max_attempts` nonce streams.
pub fn sign_recoverable(
    secret: &SecretKey,
    hash: &[u8; 32],
    max_attempts: u32,
) -> VaultResult<CompactSignature> {
    let signing_key = SigningKey::from_slice(&secret.secret_bytes())
        .map_err(|e| VaultError::key_derivation(format!("invalid signing key: {}", e)))?;
    let signer = signing_key.verifying_key();

    for attempt in 0..max_attempts {
        let compact = sign_deterministic(secret, hash, attempt)?;
        if !has_full_width_der(&compact)? {
            continue;
        }

        if let Some(id) = find_recovery_id(hash, &compact, signer) {
            let mut out = [0u8; 65];
            out[0] = COMPACT_HEADER_BASE + id;
            out[1..].copy_from_slice(&compact);
            return Ok(out);
        }
    }

    Err(VaultError::recovery_exhausted(format!(
        "no recoverable signature after {} attempts",
        max_attempts
    )))
}
