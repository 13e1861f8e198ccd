//! Protocol constants.

/// Days from issuance until a check expires and may no longer be attached
/// to a promissory note.
pub const CHECK_EXPIRATION_DAYS: i64 = 100;

/// Grace period in days: how long past its expiration date a check can
/// still be redeemed, and how long past its transaction date a note stays
/// claimable.
pub const DAYS_VALID: i64 = 10;

/// Default ceiling on overpayment tolerated by check selection, as a
/// fraction of the draft value.
pub const DEFAULT_MAX_OVERCHARGE: f64 = 0.1;

/// Default score penalty per check used in a payment. Trades overpayment
/// against the number of checks consumed.
pub const DEFAULT_CHECK_PUNISHMENT: f64 = 0.5;

/// Bank-scoped default for a device's running spending/issuance cap.
pub const DEFAULT_DEVICE_CAP: i64 = 0;

/// Bank-scoped default for the value the running cap is restored to each
/// month.
pub const DEFAULT_MONTHLY_CAP: u32 = 0;

/// How long a device certificate issued at registration remains valid.
pub const CERTIFICATE_VALIDITY_DAYS: u64 = 365;
