use chrono::{DateTime, Utc};

use super::environment::Environment;

/// Decoded result of one verification call.
///
/// Entry lists are kept exactly as the service returned them; validation only
/// filters and selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptResponse {
    /// Raw status code reported by the service; `0` means valid.
    pub status: i64,
    /// The environment that produced this response. Falls back to the
    /// environment that was queried when the service omits the field, which
    /// it does on most error statuses.
    pub environment: Environment,
    pub bundle_id: Option<String>,
    /// In-app purchase transactions from the decoded receipt.
    pub in_app: Vec<ReceiptEntry>,
    /// Latest transactions for auto-renewable subscriptions. Only present
    /// when a shared secret was supplied.
    pub latest_receipt_info: Vec<ReceiptEntry>,
    pub pending_renewal_info: Vec<PendingRenewalInfo>,
    /// Base64-encoded latest receipt. Only present for receipts containing
    /// auto-renewable subscriptions.
    pub latest_receipt: Option<String>,
    /// Sent by the service alongside `21100..=21199` statuses.
    pub is_retryable: Option<bool>,
}

/// A single transaction.
///
/// https://developer.apple.com/documentation/appstorereceipts/responsebody/receipt/in_app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptEntry {
    pub product_id: String,
    pub transaction_id: String,
    pub original_transaction_id: String,
    pub purchase_date: DateTime<Utc>,
    pub original_purchase_date: Option<DateTime<Utc>>,
    /// Expiry or renewal time. Only set for subscriptions.
    pub expires_date: Option<DateTime<Utc>>,
    /// Set when the App Store refunded the transaction or it was revoked from
    /// Family Sharing.
    pub cancellation_date: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<CancellationReason>,
    pub quantity: u32,
    pub is_trial_period: bool,
    pub is_in_intro_offer_period: bool,
    pub web_order_line_item_id: Option<String>,
    pub subscription_group_identifier: Option<String>,
}

impl ReceiptEntry {
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_date.is_some()
    }

    /// Valid at `now`: has an expiry strictly after `now` and was never
    /// cancelled.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_cancelled() && self.expires_date.is_some_and(|expires| expires > now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationReason {
    /// The customer cancelled due to an actual or perceived issue within the
    /// app.
    AppIssue,
    /// The transaction was cancelled for another reason, for example an
    /// accidental purchase.
    Other,
    Unknown(String),
}

/// Auto-renew state of one subscription, independent of whether it is
/// currently active.
///
/// https://developer.apple.com/documentation/appstorereceipts/responsebody/pending_renewal_info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRenewalInfo {
    pub product_id: String,
    pub auto_renew_product_id: String,
    pub auto_renew_status: Option<AutoRenewStatus>,
    pub original_transaction_id: Option<String>,
    pub expiration_intent: Option<String>,
    pub is_in_billing_retry_period: Option<bool>,
    pub grace_period_expires_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoRenewStatus {
    /// The customer turned off automatic renewal.
    Off,
    /// The subscription will renew at the end of the current period.
    On,
    Unknown(String),
}
