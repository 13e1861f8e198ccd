use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use scrip_core::{
    BankId, Check, DeviceCertificate, Money, PromissoryNote, ScripError, Signer,
    CERTIFICATE_VALIDITY_DAYS, DEFAULT_DEVICE_CAP, DEFAULT_MONTHLY_CAP,
};
use scrip_crypto::{KeyPair, PublicKey};

use crate::account::{Account, AccountDeviceData};

/// Handle to an account opened at a [`Bank`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountId(usize);

/// A deposit owed to a seller's account as the result of redeeming a
/// promissory note. The redeeming bank produces these; the registry routes
/// them to whichever bank holds the seller's account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settlement {
    pub seller_public_key: PublicKey,
    pub amount: Money,
}

/// A bank: the issuer of checks and the ledger of record for its accounts.
pub struct Bank {
    identifier: BankId,
    keypair: KeyPair,
    default_cap: i64,
    default_monthly_cap: Money,
    accounts: Vec<Account>,
    device_index: HashMap<String, usize>,
}

impl Bank {
    /// Create a bank with a freshly generated keypair.
    pub fn new(identifier: BankId) -> Self {
        Self::with_keypair(identifier, KeyPair::generate())
    }

    /// Create a bank around an existing keypair.
    pub fn with_keypair(identifier: BankId, keypair: KeyPair) -> Self {
        Self {
            identifier,
            keypair,
            default_cap: DEFAULT_DEVICE_CAP,
            default_monthly_cap: DEFAULT_MONTHLY_CAP,
            accounts: Vec::new(),
            device_index: HashMap::new(),
        }
    }

    pub fn identifier(&self) -> BankId {
        self.identifier
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// Caps applied to devices registered without explicit ones.
    pub fn set_default_caps(&mut self, cap: i64, monthly_cap: Money) {
        self.default_cap = cap;
        self.default_monthly_cap = monthly_cap;
    }

    // ── Accounts and devices ─────────────────────────────────────────────────

    pub fn open_account(&mut self, owner: impl Into<String>, max_credit: Money) -> AccountId {
        self.accounts.push(Account::new(owner, max_credit));
        AccountId(self.accounts.len() - 1)
    }

    pub fn account(&self, id: AccountId) -> &Account {
        &self.accounts[id.0]
    }

    pub fn account_mut(&mut self, id: AccountId) -> &mut Account {
        &mut self.accounts[id.0]
    }

    /// Register a device under an account and certify it.
    ///
    /// Caps fall back to the bank-wide defaults when not given.
    pub fn add_device(
        &mut self,
        account: AccountId,
        device_public_key: PublicKey,
        cap: Option<i64>,
        monthly_cap: Option<Money>,
        today: NaiveDate,
    ) -> Result<DeviceCertificate, ScripError> {
        let cap = cap.unwrap_or(self.default_cap);
        let monthly_cap = monthly_cap.unwrap_or(self.default_monthly_cap);
        self.accounts[account.0].add_device(AccountDeviceData::new(
            device_public_key,
            cap,
            monthly_cap,
        ));
        self.device_index
            .insert(device_public_key.to_pem(), account.0);

        DeviceCertificate::issue(
            device_public_key,
            self.identifier,
            "account holder device",
            today + Days::new(CERTIFICATE_VALIDITY_DAYS),
            &self.keypair,
        )
    }

    /// Is a device with this public key registered at this bank?
    pub fn has_account(&self, device_public_key: &PublicKey) -> bool {
        self.device_index.contains_key(&device_public_key.to_pem())
    }

    fn account_index(&self, device_public_key: &PublicKey) -> Option<usize> {
        self.device_index.get(&device_public_key.to_pem()).copied()
    }

    /// The account a device spends against.
    pub fn account_for(&self, device_public_key: &PublicKey) -> Option<&Account> {
        self.account_index(device_public_key)
            .map(|idx| &self.accounts[idx])
    }

    pub(crate) fn account_for_mut(&mut self, device_public_key: &PublicKey) -> Option<&mut Account> {
        self.account_index(device_public_key)
            .map(|idx| &mut self.accounts[idx])
    }

    /// The bank-side data for a device.
    pub fn device_data(&self, device_public_key: &PublicKey) -> Option<&AccountDeviceData> {
        self.account_for(device_public_key)
            .and_then(|account| account.device(device_public_key))
    }

    fn device_data_mut(
        &mut self,
        device_public_key: &PublicKey,
    ) -> Option<&mut AccountDeviceData> {
        self.account_for_mut(device_public_key)
            .and_then(|account| account.device_mut(device_public_key))
    }

    // ── Check issuance ───────────────────────────────────────────────────────

    /// Issue a check of `value` for the device with the given public key.
    ///
    /// Fails with `CreditExceeded` when the account's outstanding
    /// liabilities (unspent checks plus unclaimed notes) would outgrow its
    /// balance and credit line, and with `CapExceeded` when the device's
    /// monthly issuance cap would be breached.
    pub fn issue_check(
        &mut self,
        device_public_key: &PublicKey,
        value: Money,
        today: NaiveDate,
    ) -> Result<Check, ScripError> {
        let idx = self
            .account_index(device_public_key)
            .ok_or(ScripError::UnknownDevice)?;

        let account = &self.accounts[idx];
        let headroom = account.balance() - account.total_unclaimed_note_value() as i64
            + account.max_credit() as i64;
        if headroom < account.total_unspent_check_value() as i64 + value as i64 {
            return Err(ScripError::CreditExceeded);
        }

        let device = self.accounts[idx]
            .device_mut(device_public_key)
            .ok_or(ScripError::UnknownDevice)?;
        let check = device.generate_check(value, self.identifier, &self.keypair, today)?;
        info!(
            bank_id = self.identifier,
            value,
            identifier = check.identifier,
            "issued check"
        );
        Ok(check)
    }

    // ── Hand-in ──────────────────────────────────────────────────────────────

    /// Buyer-side submission of a note: tentatively spend its checks.
    ///
    /// Every check issued by this bank is removed from the owning device's
    /// unspent set; checks the bank has already seen spent are skipped, so
    /// repeated hand-ins are harmless. A claimable note whose checks were
    /// consumed by this very hand-in is parked in the device's
    /// awaiting-claim set until the seller's bank claims it.
    pub fn hand_in_promissory_note(
        &mut self,
        note: &PromissoryNote,
        today: NaiveDate,
    ) -> Result<(), ScripError> {
        if !note.is_seller_signature_authentic()? {
            return Err(ScripError::InvalidSignature(Signer::Seller));
        }
        if !note.is_buyer_signature_authentic()? {
            return Err(ScripError::InvalidSignature(Signer::Buyer));
        }

        let draft = note.draft()?;
        let claimable = draft.is_claimable(today);
        let affects_cap = draft.affects_monthly_cap(today);
        let identifier = self.identifier;

        let mut relevant = 0usize;
        let mut fresh_spends = 0usize;
        let mut buyer_key = None;
        for (check, amount) in draft
            .checks()
            .iter()
            .filter(|(check, _)| check.bank_id == identifier)
        {
            relevant += 1;
            buyer_key.get_or_insert(check.owner_public_key);
            let device = self
                .device_data_mut(&check.owner_public_key)
                .ok_or(ScripError::UnknownDevice)?;
            if device.spend_check(check) {
                fresh_spends += 1;
                if affects_cap && claimable {
                    device.debit_cap(*amount);
                }
            }
        }
        if relevant == 0 {
            return Ok(());
        }

        // Park the note only when this hand-in consumed its backing. A note
        // built from already-spent checks gets no tentative record; it must
        // still look like a double spend at redemption.
        if claimable && fresh_spends == relevant {
            let buyer_key = buyer_key.expect("a relevant check names the buyer");
            let device = self
                .device_data_mut(&buyer_key)
                .ok_or(ScripError::UnknownDevice)?;
            device.insert_awaiting_claim(draft.clone());
        }

        info!(
            bank_id = self.identifier,
            note = draft.identifier,
            checks = relevant,
            fresh = fresh_spends,
            "handed in promissory note"
        );
        Ok(())
    }

    // ── Redemption ───────────────────────────────────────────────────────────

    /// Seller-side submission of a note: finalize the transfer.
    ///
    /// Per relevant check, either the check is still unspent (direct
    /// redemption without a prior hand-in), or the note was tentatively
    /// recorded at hand-in, or the note has expired and was cleaned up.
    /// In any other combination someone is spending twice, which is fraud.
    ///
    /// Returns the deposits owed to the seller's bank; the caller routes
    /// them through the registry.
    pub fn redeem_promissory_note(
        &mut self,
        note: &PromissoryNote,
        today: NaiveDate,
    ) -> Result<Vec<Settlement>, ScripError> {
        if !note.is_seller_signature_authentic()? {
            return Err(ScripError::InvalidSignature(Signer::Seller));
        }
        if !note.is_buyer_signature_authentic()? {
            return Err(ScripError::InvalidSignature(Signer::Buyer));
        }

        let draft = note.draft()?;
        let claimable = draft.is_claimable(today);
        let affects_cap = draft.affects_monthly_cap(today);
        let relevant: Vec<_> = draft
            .checks()
            .iter()
            .filter(|(check, _)| check.bank_id == self.identifier)
            .cloned()
            .collect();
        if relevant.is_empty() {
            return Ok(Vec::new());
        }

        for (check, amount) in &relevant {
            let idx = self
                .account_index(&check.owner_public_key)
                .ok_or(ScripError::UnknownDevice)?;
            let owner = self.accounts[idx].owner().to_owned();
            let device = self.accounts[idx]
                .device_mut(&check.owner_public_key)
                .ok_or(ScripError::UnknownDevice)?;

            if device.spend_check(check) {
                if affects_cap && claimable {
                    device.debit_cap(*amount);
                }
            } else if device.has_awaiting_claim(&draft) {
                // Already tentatively recorded at hand-in. If the tentative
                // record has expired in the meantime, give back the cap it
                // consumed.
                if !claimable && affects_cap {
                    device.credit_cap(*amount);
                }
            } else if !claimable {
                // Expired and already dropped by a monthly cleanup.
            } else {
                warn!(
                    bank_id = self.identifier,
                    note = draft.identifier,
                    check = check.identifier,
                    owner = %owner,
                    "double spend detected"
                );
                return Err(ScripError::Fraud { owner });
            }
        }

        let mut settlements = Vec::new();
        if claimable {
            for (check, amount) in &relevant {
                let idx = self
                    .account_index(&check.owner_public_key)
                    .ok_or(ScripError::UnknownDevice)?;
                self.accounts[idx].withdraw(*amount);
                settlements.push(Settlement {
                    seller_public_key: draft.seller_public_key,
                    amount: *amount,
                });
            }
            info!(
                bank_id = self.identifier,
                note = draft.identifier,
                amount = draft.value,
                "redeemed promissory note"
            );
        }

        // The note is no longer pending, whichever path it took.
        for (check, _) in &relevant {
            if let Some(device) = self.device_data_mut(&check.owner_public_key) {
                device.remove_awaiting_claim(&draft);
            }
        }
        Ok(settlements)
    }

    // ── Monthly procedures ───────────────────────────────────────────────────

    /// Rebase every device's issued-value counter on what is actually
    /// outstanding.
    pub fn reset_issued_check_value_counters(&mut self) {
        for account in &mut self.accounts {
            for device in account.devices_mut() {
                device.reset_issued_check_value_counter();
            }
        }
    }

    /// Restore every device's running cap to its configured monthly cap.
    pub fn reset_monthly_spending_caps(&mut self) {
        for account in &mut self.accounts {
            for device in account.devices_mut() {
                device.reset_spending_cap();
            }
        }
    }

    /// Drop tentative notes that are no longer claimable, restoring the
    /// cap they consumed where they still count against this month.
    pub fn remove_expired_notes(&mut self, today: NaiveDate) {
        for account in &mut self.accounts {
            for device in account.devices_mut() {
                let expired: Vec<_> = device
                    .awaiting_claim()
                    .filter(|draft| !draft.is_claimable(today))
                    .cloned()
                    .collect();
                for draft in expired {
                    if draft.affects_monthly_cap(today) {
                        device.credit_cap(draft.value);
                    }
                    device.remove_awaiting_claim(&draft);
                    warn!(note = draft.identifier, "dropped expired unclaimed note");
                }
            }
        }
    }
}
