use super::receipt_response::{PendingRenewalInfo, ReceiptEntry, ReceiptResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPurchase {
    /// The most recent transaction for the requested product.
    pub entry: ReceiptEntry,
    pub response: ReceiptResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubscription {
    /// Transactions still valid at the requested time. Empty when there is no
    /// active subscription, which is not an error.
    pub valid_entries: Vec<ReceiptEntry>,
    /// Passed through unfiltered, in the order the service returned it.
    pub pending_renewal_info: Vec<PendingRenewalInfo>,
    pub response: ReceiptResponse,
}

impl ValidatedSubscription {
    pub fn has_active_subscription(&self) -> bool {
        !self.valid_entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Purchase(ValidatedPurchase),
    Subscription(ValidatedSubscription),
}
