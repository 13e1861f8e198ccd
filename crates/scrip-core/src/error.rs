use std::fmt;

use thiserror::Error;

/// Which party's signature failed verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signer {
    Seller,
    Buyer,
    Bank,
}

impl fmt::Display for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signer::Seller => write!(f, "seller"),
            Signer::Buyer => write!(f, "buyer"),
            Signer::Bank => write!(f, "bank"),
        }
    }
}

/// Which predicate a promissory note failed during verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteDefect {
    /// Σ annotated amounts does not equal the note value.
    TotalValue,
    /// Some check is annotated with more than its face value.
    CheckValue,
    /// The transaction date is not the current date.
    TransactionDate,
    /// The embedded checks were issued by more than one bank.
    MixedBanks,
}

impl fmt::Display for NoteDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteDefect::TotalValue => {
                write!(f, "total check value does not match the note value")
            }
            NoteDefect::CheckValue => {
                write!(f, "a check is annotated with more than its face value")
            }
            NoteDefect::TransactionDate => {
                write!(f, "transaction date is not the current date")
            }
            NoteDefect::MixedBanks => {
                write!(f, "embedded checks span more than one bank")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ScripError {
    // ── Decoding ─────────────────────────────────────────────────────────────
    #[error("malformed encoding: {0}")]
    MalformedEncoding(&'static str),

    // ── Verification ─────────────────────────────────────────────────────────
    #[error("the {0} signature is not authentic")]
    InvalidSignature(Signer),

    #[error("invalid note: {0}")]
    InvalidNote(NoteDefect),

    #[error("device certificate failed validation: {0}")]
    InvalidCertificate(&'static str),

    // ── Device ───────────────────────────────────────────────────────────────
    #[error("cannot cover a draft of {need}: only {have} in unspent checks")]
    InsufficientFunds { need: u32, have: u32 },

    #[error("device has no internet connection")]
    Offline,

    // ── Bank ─────────────────────────────────────────────────────────────────
    #[error("issuing this check would exceed the account's credit")]
    CreditExceeded,

    #[error("issuing a check worth {value} would exceed the cap for the device")]
    CapExceeded { value: u32 },

    #[error("double-spend or double-redeem detected on the account of {owner}")]
    Fraud { owner: String },

    #[error("no device with this public key is registered")]
    UnknownDevice,

    #[error("no registered bank holds an account for this public key")]
    UnknownAccount,
}
