//! Promissory notes: the agreement a seller drafts, a buyer funds with
//! checks, and both parties sign.
//!
//! A [`PromissoryNoteDraft`] is the unsigned agreement. A [`PromissoryNote`]
//! wraps the draft's exact encoded bytes together with the two signatures;
//! keeping the bytes rather than the decoded draft means signatures stay
//! valid no matter how the note is shuttled around.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use scrip_crypto::{verify, KeyPair, PublicKey, Signature};

use crate::check::Check;
use crate::codec::{self, Decode, Encode};
use crate::constants::DAYS_VALID;
use crate::error::ScripError;
use crate::types::{Money, Serial};

// ── PromissoryNoteDraft ───────────────────────────────────────────────────────

/// The unsigned part of a promissory note: the seller's terms plus the
/// checks the buyer attaches, each annotated with the amount drawn from it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromissoryNoteDraft {
    pub seller_public_key: PublicKey,
    pub identifier: Serial,
    pub value: Money,
    pub transaction_date: NaiveDate,
    checks: Vec<(Check, Money)>,
}

impl PromissoryNoteDraft {
    pub fn new(
        seller_public_key: PublicKey,
        identifier: Serial,
        value: Money,
        transaction_date: NaiveDate,
    ) -> Self {
        Self {
            seller_public_key,
            identifier,
            value,
            transaction_date,
            checks: Vec::new(),
        }
    }

    /// The attached `(check, amount)` entries in attachment order.
    pub fn checks(&self) -> &[(Check, Money)] {
        &self.checks
    }

    /// Sum of the amounts the attached checks are annotated with.
    pub fn total_check_value(&self) -> Money {
        self.checks.iter().map(|(_, amount)| amount).sum()
    }

    /// Attach a check, annotated with the amount of currency drawn from it.
    pub fn append_check(&mut self, check: Check, amount: Money) {
        assert!(
            check.value >= amount,
            "cannot draw {amount} from a check worth {}",
            check.value
        );
        self.checks.push((check, amount));
    }

    /// A note stays claimable for `DAYS_VALID` days after its transaction
    /// date.
    pub fn is_claimable(&self, today: NaiveDate) -> bool {
        (today - self.transaction_date).num_days() <= DAYS_VALID
    }

    /// Does the transaction date fall in the current calendar month, and
    /// thus count against this month's running spending cap?
    pub fn affects_monthly_cap(&self, today: NaiveDate) -> bool {
        self.transaction_date.year() == today.year()
            && self.transaction_date.month() == today.month()
    }
}

impl Encode for PromissoryNoteDraft {
    fn encode(&self, buf: &mut Vec<u8>) {
        codec::put_str(buf, &self.seller_public_key.to_pem());
        codec::put_u64(buf, self.identifier);
        codec::put_u32(buf, self.value);
        codec::put_date(buf, self.transaction_date);
        for (check, amount) in &self.checks {
            codec::put_bytes(buf, &check.to_bytes());
            codec::put_u32(buf, *amount);
        }
    }
}

impl Decode for PromissoryNoteDraft {
    fn decode(input: &[u8]) -> Result<(Self, &[u8]), ScripError> {
        let (pem, rest) = codec::take_str(input)?;
        let seller_public_key = PublicKey::from_pem(&pem)
            .map_err(|_| ScripError::MalformedEncoding("seller public key PEM"))?;
        let (identifier, rest) = codec::take_u64(rest)?;
        let (value, rest) = codec::take_u32(rest)?;
        let (transaction_date, mut rest) = codec::take_date(rest)?;

        // Check entries run to the end of the input.
        let mut checks = Vec::new();
        while !rest.is_empty() {
            let (check_bytes, after) = codec::take_bytes(rest)?;
            let check = Check::from_bytes(check_bytes)?;
            let (amount, after) = codec::take_u32(after)?;
            checks.push((check, amount));
            rest = after;
        }

        let draft = Self {
            seller_public_key,
            identifier,
            value,
            transaction_date,
            checks,
        };
        Ok((draft, &[]))
    }
}

// ── PromissoryNote ────────────────────────────────────────────────────────────

/// A promissory note: the draft's encoded bytes plus the seller's and
/// buyer's signatures.
///
/// The seller signs the draft bytes; the buyer signs the draft bytes
/// chained with the seller's signature, so a buyer can never be induced to
/// sign a draft no seller committed to. The buyer's identity is recovered
/// from the owner key of the first embedded check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromissoryNote {
    draft_bytes: Vec<u8>,
    seller_signature: Signature,
    buyer_signature: Signature,
}

impl PromissoryNote {
    /// Wrap an encoded draft into an unsigned note.
    pub fn new(draft_bytes: Vec<u8>) -> Self {
        Self {
            draft_bytes,
            seller_signature: Signature::default(),
            buyer_signature: Signature::default(),
        }
    }

    pub fn draft_bytes(&self) -> &[u8] {
        &self.draft_bytes
    }

    /// Decode the draft at the heart of this note.
    pub fn draft(&self) -> Result<PromissoryNoteDraft, ScripError> {
        PromissoryNoteDraft::from_bytes(&self.draft_bytes)
    }

    pub fn seller_signature(&self) -> &Signature {
        &self.seller_signature
    }

    pub fn buyer_signature(&self) -> &Signature {
        &self.buyer_signature
    }

    /// The domain the buyer signs: draft bytes chained with the seller's
    /// signature.
    fn buyer_domain(&self) -> Vec<u8> {
        let mut domain = self.draft_bytes.clone();
        domain.extend_from_slice(self.seller_signature.as_bytes());
        domain
    }

    /// Decode `note_bytes`, attach the seller's signature over the draft
    /// bytes, and re-encode.
    pub fn sign_seller(note_bytes: &[u8], seller_key: &KeyPair) -> Result<Vec<u8>, ScripError> {
        let mut note = Self::from_bytes(note_bytes)?;
        note.seller_signature = seller_key.sign(&note.draft_bytes);
        Ok(note.to_bytes())
    }

    /// Decode `note_bytes`, attach the buyer's signature over the chained
    /// domain, and re-encode.
    pub fn sign_buyer(note_bytes: &[u8], buyer_key: &KeyPair) -> Result<Vec<u8>, ScripError> {
        let mut note = Self::from_bytes(note_bytes)?;
        note.buyer_signature = buyer_key.sign(&note.buyer_domain());
        Ok(note.to_bytes())
    }

    // ── Predicates ───────────────────────────────────────────────────────────

    pub fn is_seller_signature_authentic(&self) -> Result<bool, ScripError> {
        let draft = self.draft()?;
        Ok(verify(
            &self.draft_bytes,
            &self.seller_signature,
            &draft.seller_public_key,
        ))
    }

    /// Verifies the buyer's signature under the owner key of the first
    /// embedded check. A note without checks has no buyer to speak of.
    pub fn is_buyer_signature_authentic(&self) -> Result<bool, ScripError> {
        let draft = self.draft()?;
        let Some((first_check, _)) = draft.checks().first() else {
            return Ok(false);
        };
        Ok(verify(
            &self.buyer_domain(),
            &self.buyer_signature,
            &first_check.owner_public_key,
        ))
    }

    /// Σ annotated amounts equals the value the note promises.
    pub fn has_correct_total_check_value(&self) -> Result<bool, ScripError> {
        let draft = self.draft()?;
        Ok(draft.total_check_value() == draft.value)
    }

    /// No check is annotated with more than its face value.
    pub fn has_correct_check_values(&self) -> Result<bool, ScripError> {
        let draft = self.draft()?;
        Ok(draft
            .checks()
            .iter()
            .all(|(check, amount)| check.value >= *amount))
    }

    /// The transaction date is the current date.
    pub fn has_correct_transaction_date(&self, today: NaiveDate) -> Result<bool, ScripError> {
        let draft = self.draft()?;
        Ok(draft.transaction_date == today)
    }
}

impl Encode for PromissoryNote {
    fn encode(&self, buf: &mut Vec<u8>) {
        codec::put_bytes(buf, &self.draft_bytes);
        codec::put_bytes(buf, self.seller_signature.as_bytes());
        codec::put_bytes(buf, self.buyer_signature.as_bytes());
    }
}

impl Decode for PromissoryNote {
    fn decode(input: &[u8]) -> Result<(Self, &[u8]), ScripError> {
        let (draft_bytes, rest) = codec::take_bytes(input)?;
        let (seller_signature, rest) = codec::take_bytes(rest)?;
        let (buyer_signature, rest) = codec::take_bytes(rest)?;
        let note = Self {
            draft_bytes: draft_bytes.to_vec(),
            seller_signature: Signature::from_bytes(seller_signature.to_vec()),
            buyer_signature: Signature::from_bytes(buyer_signature.to_vec()),
        };
        Ok((note, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn signed_check(bank_key: &KeyPair, owner: PublicKey, value: Money) -> Check {
        let mut check = Check::new(42, owner, value, 0, date(2026, 11, 9));
        check.sign(bank_key);
        check
    }

    /// A draft for `value`, funded with a single check and signed by both
    /// parties.
    fn signed_note(
        bank_key: &KeyPair,
        seller_key: &KeyPair,
        buyer_key: &KeyPair,
        value: Money,
    ) -> PromissoryNote {
        let mut draft =
            PromissoryNoteDraft::new(seller_key.public_key(), 0, value, date(2026, 8, 1));
        draft.append_check(signed_check(bank_key, buyer_key.public_key(), value), value);

        let bytes = PromissoryNote::new(draft.to_bytes()).to_bytes();
        let bytes = PromissoryNote::sign_seller(&bytes, seller_key).unwrap();
        let bytes = PromissoryNote::sign_buyer(&bytes, buyer_key).unwrap();
        PromissoryNote::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn draft_tracks_total_check_value() {
        let bank_key = KeyPair::generate();
        let buyer = KeyPair::generate().public_key();
        let seller = KeyPair::generate().public_key();

        let mut draft = PromissoryNoteDraft::new(seller, 3, 25, date(2026, 8, 1));
        assert_eq!(draft.total_check_value(), 0);

        draft.append_check(signed_check(&bank_key, buyer, 20), 20);
        draft.append_check(signed_check(&bank_key, buyer, 10), 5);
        assert_eq!(draft.total_check_value(), 25);
    }

    #[test]
    #[should_panic(expected = "cannot draw")]
    fn overdrawing_a_check_panics() {
        let bank_key = KeyPair::generate();
        let buyer = KeyPair::generate().public_key();
        let seller = KeyPair::generate().public_key();

        let mut draft = PromissoryNoteDraft::new(seller, 0, 30, date(2026, 8, 1));
        draft.append_check(signed_check(&bank_key, buyer, 20), 30);
    }

    #[test]
    fn claimability_window() {
        let seller = KeyPair::generate().public_key();
        let draft = PromissoryNoteDraft::new(seller, 0, 10, date(2026, 8, 1));

        assert!(draft.is_claimable(date(2026, 8, 1)));
        assert!(draft.is_claimable(date(2026, 8, 11)));
        assert!(!draft.is_claimable(date(2026, 8, 12)));
    }

    #[test]
    fn monthly_cap_window() {
        let seller = KeyPair::generate().public_key();
        let draft = PromissoryNoteDraft::new(seller, 0, 10, date(2026, 8, 1));

        assert!(draft.affects_monthly_cap(date(2026, 8, 31)));
        assert!(!draft.affects_monthly_cap(date(2026, 9, 1)));
        assert!(!draft.affects_monthly_cap(date(2027, 8, 1)));
    }

    #[test]
    fn draft_wire_round_trip_is_stable() {
        let bank_key = KeyPair::generate();
        let buyer = KeyPair::generate().public_key();
        let seller = KeyPair::generate().public_key();

        let mut draft = PromissoryNoteDraft::new(seller, 7, 30, date(2026, 8, 1));
        draft.append_check(signed_check(&bank_key, buyer, 20), 20);
        draft.append_check(signed_check(&bank_key, buyer, 10), 10);

        let encoded = draft.to_bytes();
        let decoded = PromissoryNoteDraft::from_bytes(&encoded).unwrap();
        assert_eq!(decoded, draft);
        assert_eq!(decoded.to_bytes(), encoded);
    }

    #[test]
    fn both_signatures_verify_on_a_fully_signed_note() {
        let bank_key = KeyPair::generate();
        let seller_key = KeyPair::generate();
        let buyer_key = KeyPair::generate();
        let note = signed_note(&bank_key, &seller_key, &buyer_key, 10);

        assert!(note.is_seller_signature_authentic().unwrap());
        assert!(note.is_buyer_signature_authentic().unwrap());
        assert!(note.has_correct_total_check_value().unwrap());
        assert!(note.has_correct_check_values().unwrap());
        assert!(note
            .has_correct_transaction_date(date(2026, 8, 1))
            .unwrap());
        assert!(!note
            .has_correct_transaction_date(date(2026, 8, 2))
            .unwrap());
    }

    #[test]
    fn buyer_signature_depends_on_the_seller_signature() {
        let bank_key = KeyPair::generate();
        let seller_key = KeyPair::generate();
        let buyer_key = KeyPair::generate();

        let mut draft =
            PromissoryNoteDraft::new(seller_key.public_key(), 0, 10, date(2026, 8, 1));
        draft.append_check(signed_check(&bank_key, buyer_key.public_key(), 10), 10);

        // Buyer signs before any seller signature exists.
        let bytes = PromissoryNote::new(draft.to_bytes()).to_bytes();
        let bytes = PromissoryNote::sign_buyer(&bytes, &buyer_key).unwrap();
        let bytes = PromissoryNote::sign_seller(&bytes, &seller_key).unwrap();
        let note = PromissoryNote::from_bytes(&bytes).unwrap();

        assert!(note.is_seller_signature_authentic().unwrap());
        assert!(!note.is_buyer_signature_authentic().unwrap());
    }

    #[test]
    fn checkless_note_has_no_authentic_buyer() {
        let seller_key = KeyPair::generate();
        let buyer_key = KeyPair::generate();

        let draft = PromissoryNoteDraft::new(seller_key.public_key(), 0, 0, date(2026, 8, 1));
        let bytes = PromissoryNote::new(draft.to_bytes()).to_bytes();
        let bytes = PromissoryNote::sign_seller(&bytes, &seller_key).unwrap();
        let bytes = PromissoryNote::sign_buyer(&bytes, &buyer_key).unwrap();
        let note = PromissoryNote::from_bytes(&bytes).unwrap();

        assert!(!note.is_buyer_signature_authentic().unwrap());
    }

    #[test]
    fn note_wire_round_trip_is_stable() {
        let bank_key = KeyPair::generate();
        let seller_key = KeyPair::generate();
        let buyer_key = KeyPair::generate();
        let note = signed_note(&bank_key, &seller_key, &buyer_key, 10);

        let encoded = note.to_bytes();
        let decoded = PromissoryNote::from_bytes(&encoded).unwrap();
        assert_eq!(decoded, note);
        assert_eq!(decoded.to_bytes(), encoded);
    }
}
