use std::collections::{HashMap, HashSet};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use scrip_core::{
    BankId, Check, Money, PromissoryNoteDraft, ScripError, Serial, CHECK_EXPIRATION_DAYS,
};
use scrip_crypto::{KeyPair, PublicKey};

// ── AccountDeviceData ─────────────────────────────────────────────────────────

/// The bank's view of one device belonging to an account.
///
/// Tracks the checks issued to the device that the bank has not yet seen
/// spent, the notes tentatively recorded at hand-in, and two counters: the
/// value issued this month, and the running cap that hand-ins debit. The
/// running cap is signed; reconciliation of expired tentative notes can
/// push it below zero before the monthly restore.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountDeviceData {
    public_key: PublicKey,
    check_counter: Serial,
    cap: i64,
    monthly_cap: Money,
    issued_check_value: Money,
    unspent_checks: HashSet<Check>,
    awaiting_claim: HashSet<PromissoryNoteDraft>,
}

impl AccountDeviceData {
    pub fn new(public_key: PublicKey, cap: i64, monthly_cap: Money) -> Self {
        Self {
            public_key,
            check_counter: 0,
            cap,
            monthly_cap,
            issued_check_value: 0,
            unspent_checks: HashSet::new(),
            awaiting_claim: HashSet::new(),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn cap(&self) -> i64 {
        self.cap
    }

    pub fn monthly_cap(&self) -> Money {
        self.monthly_cap
    }

    pub fn issued_check_value(&self) -> Money {
        self.issued_check_value
    }

    /// Total face value of the checks the bank still considers unspent.
    pub fn total_unspent_check_value(&self) -> u64 {
        self.unspent_checks
            .iter()
            .map(|check| check.value as u64)
            .sum()
    }

    /// Total value promised by notes recorded at hand-in but not yet
    /// claimed by a seller.
    pub fn total_unclaimed_note_value(&self) -> u64 {
        self.awaiting_claim
            .iter()
            .map(|draft| draft.value as u64)
            .sum()
    }

    pub fn is_unspent(&self, check: &Check) -> bool {
        self.unspent_checks.contains(check)
    }

    /// Remove a check from the unspent set. Returns whether it was there.
    pub(crate) fn spend_check(&mut self, check: &Check) -> bool {
        self.unspent_checks.remove(check)
    }

    pub(crate) fn debit_cap(&mut self, amount: Money) {
        self.cap -= amount as i64;
    }

    pub(crate) fn credit_cap(&mut self, amount: Money) {
        self.cap += amount as i64;
    }

    pub fn has_awaiting_claim(&self, draft: &PromissoryNoteDraft) -> bool {
        self.awaiting_claim.contains(draft)
    }

    pub(crate) fn insert_awaiting_claim(&mut self, draft: PromissoryNoteDraft) {
        self.awaiting_claim.insert(draft);
    }

    pub(crate) fn remove_awaiting_claim(&mut self, draft: &PromissoryNoteDraft) {
        self.awaiting_claim.remove(draft);
    }

    pub fn awaiting_claim(&self) -> impl Iterator<Item = &PromissoryNoteDraft> {
        self.awaiting_claim.iter()
    }

    /// Generate and sign a check of `value` for this device.
    ///
    /// Fails with `CapExceeded` when the value would push the month's
    /// issuance past the device cap.
    pub(crate) fn generate_check(
        &mut self,
        value: Money,
        bank_id: BankId,
        bank_key: &KeyPair,
        today: NaiveDate,
    ) -> Result<Check, ScripError> {
        if self.issued_check_value as i64 + value as i64 > self.cap {
            return Err(ScripError::CapExceeded { value });
        }

        let expiration = today + Days::new(CHECK_EXPIRATION_DAYS as u64);
        let mut check = Check::new(bank_id, self.public_key, value, self.check_counter, expiration);
        check.sign(bank_key);

        self.check_counter += 1;
        self.issued_check_value += value;
        self.unspent_checks.insert(check.clone());
        Ok(check)
    }

    /// Reset the issued-value counter back to what is actually outstanding.
    pub(crate) fn reset_issued_check_value_counter(&mut self) {
        self.issued_check_value = self
            .total_unspent_check_value()
            .try_into()
            .unwrap_or(Money::MAX);
    }

    /// Restore the running cap to the configured monthly cap.
    pub(crate) fn reset_spending_cap(&mut self) {
        self.cap = self.monthly_cap as i64;
    }
}

// ── Account ───────────────────────────────────────────────────────────────────

/// An account at a bank: an owner, a credit line, a balance, and the
/// devices allowed to spend against it.
///
/// The balance is signed: settlement withdraws without a floor check, since
/// issuance already guarantees outstanding checks never exceed
/// `balance + max_credit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Account {
    owner: String,
    max_credit: Money,
    balance: i64,
    devices: HashMap<String, AccountDeviceData>,
}

impl Account {
    pub fn new(owner: impl Into<String>, max_credit: Money) -> Self {
        Self {
            owner: owner.into(),
            max_credit,
            balance: 0,
            devices: HashMap::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn max_credit(&self) -> Money {
        self.max_credit
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn deposit(&mut self, amount: Money) {
        self.balance += amount as i64;
    }

    pub fn withdraw(&mut self, amount: Money) {
        self.balance -= amount as i64;
    }

    pub(crate) fn add_device(&mut self, data: AccountDeviceData) {
        self.devices.insert(data.public_key().to_pem(), data);
    }

    pub fn device(&self, public_key: &PublicKey) -> Option<&AccountDeviceData> {
        self.devices.get(&public_key.to_pem())
    }

    pub(crate) fn device_mut(&mut self, public_key: &PublicKey) -> Option<&mut AccountDeviceData> {
        self.devices.get_mut(&public_key.to_pem())
    }

    pub fn devices(&self) -> impl Iterator<Item = &AccountDeviceData> {
        self.devices.values()
    }

    pub(crate) fn devices_mut(&mut self) -> impl Iterator<Item = &mut AccountDeviceData> {
        self.devices.values_mut()
    }

    /// Total face value of unspent checks across all devices.
    pub fn total_unspent_check_value(&self) -> u64 {
        self.devices
            .values()
            .map(AccountDeviceData::total_unspent_check_value)
            .sum()
    }

    /// Total value of handed-in notes awaiting a seller's claim, across
    /// all devices.
    pub fn total_unclaimed_note_value(&self) -> u64 {
        self.devices
            .values()
            .map(AccountDeviceData::total_unclaimed_note_value)
            .sum()
    }
}
