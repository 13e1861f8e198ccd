use std::fmt;
use std::hash::{Hash, Hasher};

use p256::ecdsa::SigningKey;
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("malformed PEM-encoded public key")]
    InvalidPublicKeyPem,
    #[error("malformed PEM-encoded private key")]
    InvalidPrivateKeyPem,
}

// ── PublicKey ─────────────────────────────────────────────────────────────────

/// A P-256 public key.
///
/// The canonical interchange form is the PKCS#8 PEM export: it is what gets
/// hashed into maps, written into signed payloads, and carried on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(p256::PublicKey);

impl PublicKey {
    /// Canonical PEM (PKCS#8 `SubjectPublicKeyInfo`) form of this key.
    pub fn to_pem(&self) -> String {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .expect("PEM export of a valid P-256 key is infallible")
    }

    /// Parse a key from its canonical PEM form.
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        p256::PublicKey::from_public_key_pem(pem)
            .map(Self)
            .map_err(|_| KeyError::InvalidPublicKeyPem)
    }

    pub(crate) fn verifying_key(&self) -> p256::ecdsa::VerifyingKey {
        p256::ecdsa::VerifyingKey::from(&self.0)
    }
}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.0.to_sec1_bytes());
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sec1 = self.0.to_sec1_bytes();
        write!(f, "PublicKey({}…)", &hex::encode(&sec1[..6]))
    }
}

// ── Signature ─────────────────────────────────────────────────────────────────

/// An opaque detached signature (64 bytes for fixed-length P-256 DSS).
///
/// The empty signature marks a slot that has not been signed yet; it never
/// verifies.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "Signature(unsigned)")
        } else {
            write!(f, "Signature({}b)", self.0.len())
        }
    }
}

// ── KeyPair ───────────────────────────────────────────────────────────────────

/// A P-256 keypair held by a device or a bank.
///
/// The secret half never leaves this struct except as PKCS#8 PEM, which is
/// returned in a `Zeroizing` wrapper so callers do not leak it on drop.
pub struct KeyPair {
    secret: SigningKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let secret = SigningKey::random(&mut OsRng);
        let public = PublicKey(p256::PublicKey::from(secret.verifying_key()));
        Self { secret, public }
    }

    /// Restore a keypair from a PKCS#8 PEM private-key export.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, KeyError> {
        let secret =
            SigningKey::from_pkcs8_pem(pem).map_err(|_| KeyError::InvalidPrivateKeyPem)?;
        let public = PublicKey(p256::PublicKey::from(secret.verifying_key()));
        Ok(Self { secret, public })
    }

    /// Export the secret key as PKCS#8 PEM. Zeroized on drop.
    pub fn to_pkcs8_pem(&self) -> Zeroizing<String> {
        self.secret
            .to_pkcs8_pem(LineEnding::LF)
            .expect("PEM export of a valid P-256 secret key is infallible")
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Sign `message` with this keypair's secret key (SHA3-256 + ECDSA).
    pub fn sign(&self, message: &[u8]) -> Signature {
        crate::sig::sign_with(message, &self.secret)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair {{ public: {:?} }}", self.public)
    }
}
