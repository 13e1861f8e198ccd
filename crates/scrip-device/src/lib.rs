//! scrip-device
//!
//! The account holder device: a user-controlled store of unspent checks
//! and known-bank keys that drafts promissory notes as a seller and funds
//! them with checks as a buyer.

mod selection;

use std::collections::{HashMap, VecDeque};

use chrono::NaiveDate;
use tracing::debug;

use scrip_core::{
    BankId, Check, DeviceCertificate, Money, PromissoryNoteDraft, ScripError, Serial,
    DEFAULT_CHECK_PUNISHMENT, DEFAULT_MAX_OVERCHARGE,
};
use scrip_crypto::{KeyPair, PublicKey};

use crate::selection::CheckBuckets;

/// An account holder device (AHD).
///
/// Holds the device keypair, unspent checks in FIFO buckets keyed by face
/// value, and the registry of banks this device trusts. The note counter
/// increases strictly, so `(seller key, identifier)` is unique per device.
pub struct AccountHolderDevice {
    keypair: KeyPair,
    online: bool,
    promissory_note_counter: Serial,
    unspent_checks: CheckBuckets,
    bank_keys: HashMap<BankId, PublicKey>,
    certificate: Option<DeviceCertificate>,
    max_overcharge: f64,
    check_punishment: f64,
}

impl AccountHolderDevice {
    /// Create a device with a freshly generated keypair.
    pub fn new() -> Self {
        Self::with_keypair(KeyPair::generate())
    }

    /// Create a device around an existing keypair.
    pub fn with_keypair(keypair: KeyPair) -> Self {
        Self {
            keypair,
            online: true,
            promissory_note_counter: 0,
            unspent_checks: CheckBuckets::new(),
            bank_keys: HashMap::new(),
            certificate: None,
            max_overcharge: DEFAULT_MAX_OVERCHARGE,
            check_punishment: DEFAULT_CHECK_PUNISHMENT,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    pub fn promissory_note_counter(&self) -> Serial {
        self.promissory_note_counter
    }

    /// Tune how check selection trades overpayment against the number of
    /// checks consumed.
    pub fn set_selection_parameters(&mut self, max_overcharge: f64, check_punishment: f64) {
        self.max_overcharge = max_overcharge;
        self.check_punishment = check_punishment;
    }

    // ── Connectivity ─────────────────────────────────────────────────────────

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    // ── Bank keyring ─────────────────────────────────────────────────────────

    /// Register a bank by mapping its identifier to its public key.
    pub fn register_bank(&mut self, bank_id: BankId, bank_public_key: PublicKey) {
        self.bank_keys.insert(bank_id, bank_public_key);
    }

    pub fn is_known_bank(&self, bank_id: BankId) -> bool {
        self.bank_keys.contains_key(&bank_id)
    }

    pub fn bank_public_key(&self, bank_id: BankId) -> Option<&PublicKey> {
        self.bank_keys.get(&bank_id)
    }

    /// Is this public key one of the device's registered banks?
    pub fn knows_bank_key(&self, key: &PublicKey) -> bool {
        self.bank_keys.values().any(|known| known == key)
    }

    // ── Device certificate ───────────────────────────────────────────────────

    pub fn set_certificate(&mut self, certificate: DeviceCertificate) {
        self.certificate = Some(certificate);
    }

    pub fn certificate(&self) -> Option<&DeviceCertificate> {
        self.certificate.as_ref()
    }

    // ── Unspent checks ───────────────────────────────────────────────────────

    /// Total face value of all unspent checks on the device.
    pub fn total_check_value(&self) -> u64 {
        self.unspent_checks
            .values()
            .flatten()
            .map(|check| check.value as u64)
            .sum()
    }

    pub fn unspent_check_count(&self) -> usize {
        self.unspent_checks.values().map(VecDeque::len).sum()
    }

    pub fn unspent_checks(&self) -> impl Iterator<Item = &Check> {
        self.unspent_checks.values().flatten()
    }

    /// Add an unspent check issued to this device.
    pub fn add_unspent_check(&mut self, check: Check) {
        assert!(
            check.owner_public_key == self.public_key(),
            "check is not issued to this device"
        );
        self.unspent_checks
            .entry(check.value)
            .or_default()
            .push_back(check);
    }

    /// Drop every check that can no longer be attached to a note.
    pub fn remove_expired_checks(&mut self, today: NaiveDate) {
        for queue in self.unspent_checks.values_mut() {
            queue.retain(|check| !check.expired(today));
        }
        self.unspent_checks.retain(|_, queue| !queue.is_empty());
    }

    // ── Payments ─────────────────────────────────────────────────────────────

    /// Draft a promissory note for `amount`, with this device as the
    /// seller (the recipient of the money).
    pub fn draft_promissory_note(&mut self, amount: Money, today: NaiveDate) -> PromissoryNoteDraft {
        let draft =
            PromissoryNoteDraft::new(self.public_key(), self.promissory_note_counter, amount, today);
        self.promissory_note_counter += 1;
        draft
    }

    /// Fund a draft: select unspent checks and attach them until the
    /// annotated amounts sum to the draft value.
    ///
    /// Expired checks are discarded first. Fails with `InsufficientFunds`
    /// when the device cannot cover the draft; a zero-value draft is a
    /// no-op.
    pub fn add_payment(
        &mut self,
        draft: &mut PromissoryNoteDraft,
        today: NaiveDate,
    ) -> Result<(), ScripError> {
        assert!(
            draft.total_check_value() == 0,
            "draft already carries a payment"
        );

        self.remove_expired_checks(today);

        let have = self.total_check_value();
        if draft.value as u64 > have {
            return Err(ScripError::InsufficientFunds {
                need: draft.value,
                have: have as u32,
            });
        }
        if draft.value == 0 {
            return Ok(());
        }

        let entries = selection::plan_payment(
            &mut self.unspent_checks,
            draft.value,
            self.max_overcharge,
            self.check_punishment,
        );
        debug!(
            value = draft.value,
            checks = entries.len(),
            "selected checks for payment"
        );
        for (check, amount) in entries {
            draft.append_check(check, amount);
        }
        debug_assert_eq!(draft.total_check_value(), draft.value);
        Ok(())
    }
}

impl Default for AccountHolderDevice {
    fn default() -> Self {
        Self::new()
    }
}
