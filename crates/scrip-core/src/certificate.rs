use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use scrip_crypto::{verify, KeyPair, PublicKey, Signature};

use crate::codec;
use crate::error::ScripError;
use crate::types::BankId;

/// A certificate a bank issues when a device registers, attesting that the
/// device's public key is known to the bank until `valid_until`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCertificate {
    device_public_key: PublicKey,
    bank_id: BankId,
    message: String,
    valid_until: NaiveDate,
    signature: Signature,
}

impl DeviceCertificate {
    /// Issue a certificate signed by the bank's key.
    ///
    /// The message is free text restricted to letters and whitespace.
    pub fn issue(
        device_public_key: PublicKey,
        bank_id: BankId,
        message: &str,
        valid_until: NaiveDate,
        bank_key: &KeyPair,
    ) -> Result<Self, ScripError> {
        if !message
            .chars()
            .all(|c| c.is_alphabetic() || c.is_whitespace())
        {
            return Err(ScripError::InvalidCertificate(
                "message must consist of letters and whitespace",
            ));
        }
        let mut cert = Self {
            device_public_key,
            bank_id,
            message: message.to_owned(),
            valid_until,
            signature: Signature::default(),
        };
        cert.signature = bank_key.sign(&cert.unsigned_bytes());
        Ok(cert)
    }

    fn unsigned_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        codec::put_str(&mut buf, &self.device_public_key.to_pem());
        codec::put_str(&mut buf, &self.message);
        codec::put_date(&mut buf, self.valid_until);
        buf
    }

    pub fn bank_id(&self) -> BankId {
        self.bank_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn valid_until(&self) -> NaiveDate {
        self.valid_until
    }

    /// Validate this certificate for a given device under the issuing
    /// bank's public key.
    pub fn validate(
        &self,
        device_public_key: &PublicKey,
        bank_public_key: &PublicKey,
        today: NaiveDate,
    ) -> Result<(), ScripError> {
        if self.valid_until < today {
            return Err(ScripError::InvalidCertificate("certificate has expired"));
        }
        if device_public_key != &self.device_public_key {
            return Err(ScripError::InvalidCertificate(
                "device public key does not match",
            ));
        }
        if !verify(&self.unsigned_bytes(), &self.signature, bank_public_key) {
            return Err(ScripError::InvalidCertificate(
                "bank signature is not authentic",
            ));
        }
        Ok(())
    }
}
