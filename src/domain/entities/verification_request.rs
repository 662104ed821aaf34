use chrono::{DateTime, Utc};

/// What the caller wants to learn from a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationRequest {
    /// Confirm that the receipt contains a live purchase of `product_id`.
    Purchase {
        product_id: String,
        shared_secret: Option<String>,
    },

    /// Collect the subscription transactions still valid at `now`.
    ///
    /// `now` is supplied by the caller so that the same response always
    /// produces the same verdict.
    Subscription {
        shared_secret: Option<String>,
        exclude_old_transactions: bool,
        now: DateTime<Utc>,
    },
}
