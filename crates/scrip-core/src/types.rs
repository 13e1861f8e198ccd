/// Monetary amount in unsigned minor units. All face values, annotated
/// amounts and note values fit in 32 bits; running totals use wider types.
pub type Money = u32;

/// Unique identifier for a bank.
pub type BankId = u32;

/// Per-device serial number: check identifiers and promissory-note
/// identifiers both count up monotonically from zero.
pub type Serial = u64;
