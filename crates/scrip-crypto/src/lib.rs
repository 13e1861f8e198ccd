//! scrip-crypto
//!
//! Key material and signing primitives for the scrip payment protocol:
//! ECDSA over NIST P-256 with SHA3-256 message digests, and PKCS#8 PEM
//! as the canonical public-key interchange form. Everything above this
//! crate treats signatures as opaque byte strings.

pub mod keys;
pub mod sig;

pub use keys::{KeyError, KeyPair, PublicKey, Signature};
pub use sig::verify;
