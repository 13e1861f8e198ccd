use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use scrip_crypto::{verify, KeyPair, PublicKey, Signature};

use crate::codec::{self, Decode, Encode};
use crate::constants::DAYS_VALID;
use crate::error::ScripError;
use crate::types::{BankId, Money, Serial};

/// A bank-signed bearer token: an authorization for `owner_public_key` to
/// spend up to `value` minor units, expiring on `expiration_date`.
///
/// Checks are immutable value types compared and hashed by content: one
/// logical original lives at the issuing bank, a bit-identical copy on the
/// owning device, and further copies inside the notes it gets attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Check {
    pub bank_id: BankId,
    pub owner_public_key: PublicKey,
    pub value: Money,
    pub identifier: Serial,
    pub expiration_date: NaiveDate,
    pub signature: Signature,
}

impl Check {
    /// Create an unsigned check. Banks call [`Check::sign`] before handing
    /// it out.
    pub fn new(
        bank_id: BankId,
        owner_public_key: PublicKey,
        value: Money,
        identifier: Serial,
        expiration_date: NaiveDate,
    ) -> Self {
        Self {
            bank_id,
            owner_public_key,
            value,
            identifier,
            expiration_date,
            signature: Signature::default(),
        }
    }

    /// The signing domain: every field except the signature itself.
    fn unsigned_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        codec::put_u32(&mut buf, self.bank_id);
        codec::put_str(&mut buf, &self.owner_public_key.to_pem());
        codec::put_u32(&mut buf, self.value);
        codec::put_u64(&mut buf, self.identifier);
        codec::put_date(&mut buf, self.expiration_date);
        buf
    }

    /// Sign this check with the issuing bank's key.
    pub fn sign(&mut self, bank_key: &KeyPair) {
        self.signature = bank_key.sign(&self.unsigned_bytes());
    }

    /// Does the signature verify under the issuing bank's public key?
    pub fn is_signature_authentic(&self, bank_public_key: &PublicKey) -> bool {
        verify(&self.unsigned_bytes(), &self.signature, bank_public_key)
    }

    /// Expired checks can no longer be attached to promissory notes.
    pub fn expired(&self, today: NaiveDate) -> bool {
        today > self.expiration_date
    }

    /// Unredeemable checks can no longer be redeemed by sellers either.
    pub fn unredeemable(&self, today: NaiveDate) -> bool {
        today > self.expiration_date + Days::new(DAYS_VALID as u64)
    }
}

impl Encode for Check {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.unsigned_bytes());
        codec::put_bytes(buf, self.signature.as_bytes());
    }
}

impl Decode for Check {
    fn decode(input: &[u8]) -> Result<(Self, &[u8]), ScripError> {
        let (bank_id, rest) = codec::take_u32(input)?;
        let (pem, rest) = codec::take_str(rest)?;
        let owner_public_key = PublicKey::from_pem(&pem)
            .map_err(|_| ScripError::MalformedEncoding("owner public key PEM"))?;
        let (value, rest) = codec::take_u32(rest)?;
        let (identifier, rest) = codec::take_u64(rest)?;
        let (expiration_date, rest) = codec::take_date(rest)?;
        let (signature, rest) = codec::take_bytes(rest)?;
        let check = Self {
            bank_id,
            owner_public_key,
            value,
            identifier,
            expiration_date,
            signature: Signature::from_bytes(signature.to_vec()),
        };
        Ok((check, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn signed_check(bank_key: &KeyPair, owner: PublicKey) -> Check {
        let mut check = Check::new(42, owner, 100, 0, date(2026, 11, 9));
        check.sign(bank_key);
        check
    }

    #[test]
    fn bank_signature_is_authentic() {
        let bank_key = KeyPair::generate();
        let owner = KeyPair::generate().public_key();
        let check = signed_check(&bank_key, owner);
        assert!(check.is_signature_authentic(&bank_key.public_key()));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let bank_key = KeyPair::generate();
        let owner = KeyPair::generate().public_key();
        let check = signed_check(&bank_key, owner);
        assert!(!check.is_signature_authentic(&KeyPair::generate().public_key()));
    }

    #[test]
    fn tampering_breaks_the_signature() {
        let bank_key = KeyPair::generate();
        let owner = KeyPair::generate().public_key();
        let mut check = signed_check(&bank_key, owner);
        check.value += 1;
        assert!(!check.is_signature_authentic(&bank_key.public_key()));
    }

    #[test]
    fn expiry_windows() {
        let bank_key = KeyPair::generate();
        let owner = KeyPair::generate().public_key();
        let check = signed_check(&bank_key, owner); // expires 2026-11-09

        assert!(!check.expired(date(2026, 11, 9)));
        assert!(check.expired(date(2026, 11, 10)));

        // Redeemable for DAYS_VALID days past expiration.
        assert!(!check.unredeemable(date(2026, 11, 19)));
        assert!(check.unredeemable(date(2026, 11, 20)));
    }

    #[test]
    fn wire_round_trip_is_stable() {
        let bank_key = KeyPair::generate();
        let owner = KeyPair::generate().public_key();
        let check = signed_check(&bank_key, owner);

        let encoded = check.to_bytes();
        let decoded = Check::from_bytes(&encoded).unwrap();
        assert_eq!(decoded, check);
        assert_eq!(decoded.to_bytes(), encoded);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let bank_key = KeyPair::generate();
        let owner = KeyPair::generate().public_key();
        let mut encoded = signed_check(&bank_key, owner).to_bytes();
        encoded.push(0);
        assert!(matches!(
            Check::from_bytes(&encoded),
            Err(ScripError::MalformedEncoding(_))
        ));
    }
}
