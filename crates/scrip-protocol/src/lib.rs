//! scrip-protocol
//!
//! The three-party signing protocol, end to end: a seller drafts, a buyer
//! funds the draft with checks, both sign in order, anyone verifies, and
//! the banks settle (tentatively at hand-in, finally at redemption).
//!
//! The orchestration itself is stateless; all shared state lives in the
//! [`BankRegistry`] passed to each operation.

use chrono::NaiveDate;
use tracing::info;

use scrip_bank::BankRegistry;
use scrip_core::{Decode, Encode, Money, NoteDefect, PromissoryNote, ScripError, Signer};
use scrip_device::AccountHolderDevice;

/// Create a fully signed promissory note transferring `amount` from the
/// buyer to the seller.
///
/// The seller drafts and signs first; the buyer attaches checks and signs
/// over the draft chained with the seller's signature.
pub fn create_promissory_note(
    buyer: &mut AccountHolderDevice,
    seller: &mut AccountHolderDevice,
    amount: Money,
    today: NaiveDate,
) -> Result<PromissoryNote, ScripError> {
    let mut draft = seller.draft_promissory_note(amount, today);
    buyer.add_payment(&mut draft, today)?;

    let bytes = PromissoryNote::new(draft.to_bytes()).to_bytes();
    let bytes = PromissoryNote::sign_seller(&bytes, seller.keypair())?;
    let bytes = PromissoryNote::sign_buyer(&bytes, buyer.keypair())?;
    PromissoryNote::from_bytes(&bytes)
}

/// Check every predicate a well-formed note must satisfy; each failure is
/// its own error variant.
///
/// Notes mixing checks from several banks are rejected here: redemption
/// locates the buyer through the first embedded check and cannot settle a
/// mixed note coherently.
pub fn verify_promissory_note(
    note: &PromissoryNote,
    today: NaiveDate,
) -> Result<(), ScripError> {
    if !note.is_seller_signature_authentic()? {
        return Err(ScripError::InvalidSignature(Signer::Seller));
    }
    if !note.is_buyer_signature_authentic()? {
        return Err(ScripError::InvalidSignature(Signer::Buyer));
    }
    if !note.has_correct_total_check_value()? {
        return Err(ScripError::InvalidNote(NoteDefect::TotalValue));
    }
    if !note.has_correct_check_values()? {
        return Err(ScripError::InvalidNote(NoteDefect::CheckValue));
    }
    if !note.has_correct_transaction_date(today)? {
        return Err(ScripError::InvalidNote(NoteDefect::TransactionDate));
    }

    let draft = note.draft()?;
    let mut banks = draft.checks().iter().map(|(check, _)| check.bank_id);
    if let Some(first) = banks.next() {
        if banks.any(|bank_id| bank_id != first) {
            return Err(ScripError::InvalidNote(NoteDefect::MixedBanks));
        }
    }
    Ok(())
}

/// Buyer-side submission: hand the note in at every registered bank the
/// buyer trusts. Requires the buyer to be online.
pub fn hand_in(
    note: &PromissoryNote,
    buyer_device: &AccountHolderDevice,
    registry: &mut BankRegistry,
    today: NaiveDate,
) -> Result<(), ScripError> {
    if !buyer_device.is_online() {
        return Err(ScripError::Offline);
    }
    for bank in registry
        .banks_mut()
        .filter(|bank| buyer_device.knows_bank_key(&bank.public_key()))
    {
        bank.hand_in_promissory_note(note, today)?;
    }
    Ok(())
}

/// Move the money: hand the note in at the buyer's banks, then redeem it
/// at the seller's banks and route the resulting deposits to the bank
/// holding the seller's account.
pub fn transfer(
    note: &PromissoryNote,
    seller_device: &AccountHolderDevice,
    buyer_device: &AccountHolderDevice,
    registry: &mut BankRegistry,
    today: NaiveDate,
) -> Result<(), ScripError> {
    hand_in(note, buyer_device, registry, today)?;

    let mut settlements = Vec::new();
    for bank in registry
        .banks_mut()
        .filter(|bank| seller_device.knows_bank_key(&bank.public_key()))
    {
        settlements.extend(bank.redeem_promissory_note(note, today)?);
    }
    registry.route_settlements(settlements)?;

    info!("transferred promissory note");
    Ok(())
}

/// Create, verify and transfer in one go: the whole protocol for a single
/// payment of `amount` from buyer to seller.
pub fn perform_transaction(
    buyer: &mut AccountHolderDevice,
    seller: &mut AccountHolderDevice,
    amount: Money,
    registry: &mut BankRegistry,
    today: NaiveDate,
) -> Result<PromissoryNote, ScripError> {
    let note = create_promissory_note(buyer, seller, amount, today)?;
    verify_promissory_note(&note, today)?;
    transfer(&note, seller, buyer, registry, today)?;
    Ok(note)
}
