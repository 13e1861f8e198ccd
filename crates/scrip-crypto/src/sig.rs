//! Detached signing and verification: SHA3-256 digests, ECDSA over P-256
//! (the FIPS 186-3 scheme; signing uses RFC 6979 deterministic nonces,
//! which verifies identically).

use p256::ecdsa::signature::{DigestSigner, DigestVerifier};
use p256::ecdsa::SigningKey;
use sha3::{Digest, Sha3_256};

use crate::keys::{PublicKey, Signature};

pub(crate) fn sign_with(message: &[u8], key: &SigningKey) -> Signature {
    let digest = Sha3_256::new_with_prefix(message);
    let signature: p256::ecdsa::Signature = key.sign_digest(digest);
    Signature::from_bytes(signature.to_bytes().to_vec())
}

/// Verify a detached signature over `message`.
///
/// Total: malformed or empty signature bytes are simply not authentic.
pub fn verify(message: &[u8], signature: &Signature, key: &PublicKey) -> bool {
    let Ok(parsed) = p256::ecdsa::Signature::from_slice(signature.as_bytes()) else {
        return false;
    };
    let digest = Sha3_256::new_with_prefix(message);
    key.verifying_key().verify_digest(digest, &parsed).is_ok()
}
