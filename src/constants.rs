pub const PRODUCTION_VERIFY_RECEIPT_URL: &str = "https://buy.itunes.apple.com/verifyReceipt";
pub const SANDBOX_VERIFY_RECEIPT_URL: &str = "https://sandbox.itunes.apple.com/verifyReceipt";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Status returned by production for a receipt signed in the sandbox.
pub(crate) const STATUS_SANDBOX_RECEIPT_SENT_TO_PRODUCTION: i64 = 21007;
/// Status returned by the sandbox for a receipt signed in production.
pub(crate) const STATUS_PRODUCTION_RECEIPT_SENT_TO_SANDBOX: i64 = 21008;

/// Calls made to the other environment after the primary one redirects.
pub(crate) const MAX_ENVIRONMENT_FALLBACKS: u8 = 1;
