use tracing::info;

use scrip_core::{BankId, ScripError};
use scrip_crypto::PublicKey;

use crate::bank::{Bank, Settlement};

/// The registry of banks participating in the protocol, in registration
/// order.
///
/// Redemption needs it twice: to find the banks a device trusts, and to
/// locate the bank holding a seller's account when routing settlement
/// deposits. It is an explicit dependency of the signing protocol, not
/// process-global state.
#[derive(Default)]
pub struct BankRegistry {
    banks: Vec<Bank>,
}

impl BankRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, bank: Bank) {
        info!(bank_id = bank.identifier(), "registered bank");
        self.banks.push(bank);
    }

    pub fn banks(&self) -> impl Iterator<Item = &Bank> {
        self.banks.iter()
    }

    pub fn banks_mut(&mut self) -> impl Iterator<Item = &mut Bank> {
        self.banks.iter_mut()
    }

    pub fn bank(&self, identifier: BankId) -> Option<&Bank> {
        self.banks.iter().find(|bank| bank.identifier() == identifier)
    }

    pub fn bank_mut(&mut self, identifier: BankId) -> Option<&mut Bank> {
        self.banks
            .iter_mut()
            .find(|bank| bank.identifier() == identifier)
    }

    /// The bank holding an account for this device key, if any.
    pub fn bank_holding_account(&self, device_public_key: &PublicKey) -> Option<&Bank> {
        self.banks
            .iter()
            .find(|bank| bank.has_account(device_public_key))
    }

    /// Deposit redeemed amounts into the sellers' accounts, wherever they
    /// are held.
    pub fn route_settlements(&mut self, settlements: Vec<Settlement>) -> Result<(), ScripError> {
        for settlement in settlements {
            let account = self
                .banks
                .iter_mut()
                .find_map(|bank| bank.account_for_mut(&settlement.seller_public_key))
                .ok_or(ScripError::UnknownAccount)?;
            account.deposit(settlement.amount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use scrip_crypto::KeyPair;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    #[test]
    fn banks_are_found_by_identifier_and_account() {
        let mut registry = BankRegistry::new();
        let mut bank = Bank::new(42);
        let device = KeyPair::generate().public_key();
        let account = bank.open_account("owner", 0);
        bank.add_device(account, device, None, None, today()).unwrap();
        registry.register(bank);
        registry.register(Bank::new(43));

        assert_eq!(registry.banks().count(), 2);
        assert!(registry.bank(42).is_some());
        assert!(registry.bank(44).is_none());
        assert_eq!(
            registry.bank_holding_account(&device).unwrap().identifier(),
            42
        );
    }

    #[test]
    fn settlements_reach_the_sellers_bank() {
        let mut registry = BankRegistry::new();
        registry.register(Bank::new(42));

        let mut seller_bank = Bank::new(43);
        let seller = KeyPair::generate().public_key();
        let account = seller_bank.open_account("seller", 0);
        seller_bank
            .add_device(account, seller, None, None, today())
            .unwrap();
        registry.register(seller_bank);

        registry
            .route_settlements(vec![Settlement {
                seller_public_key: seller,
                amount: 10,
            }])
            .unwrap();
        let bank = registry.bank(43).unwrap();
        assert_eq!(bank.account_for(&seller).unwrap().balance(), 10);
    }

    #[test]
    fn unroutable_settlements_are_an_error() {
        let mut registry = BankRegistry::new();
        registry.register(Bank::new(42));

        let err = registry
            .route_settlements(vec![Settlement {
                seller_public_key: KeyPair::generate().public_key(),
                amount: 10,
            }])
            .unwrap_err();
        assert!(matches!(err, ScripError::UnknownAccount));
    }
}
