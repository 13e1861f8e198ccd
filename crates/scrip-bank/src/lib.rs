//! scrip-bank
//!
//! The bank side of the protocol: accounts, per-device issuance data, the
//! check-issuance caps, the hand-in / redemption state machine with its
//! double-spend detection, and the registry through which a settling bank
//! locates the seller's bank.

pub mod account;
pub mod bank;
pub mod registry;

pub use account::{Account, AccountDeviceData};
pub use bank::{AccountId, Bank, Settlement};
pub use registry::BankRegistry;
