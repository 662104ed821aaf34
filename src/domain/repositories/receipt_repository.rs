use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::entities::{
        receipt_payload::ReceiptPayload,
        receipt_response::ReceiptResponse,
        validation_result::{ValidatedPurchase, ValidatedSubscription, ValidationOutcome},
        verification_request::VerificationRequest,
    },
    errors::ReceiptValidationError,
};

#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    /// Verifies the receipt and returns the decoded response as-is, without
    /// checking its status or applying any business rules.
    async fn fetch(
        &self,
        payload: &ReceiptPayload,
        shared_secret: Option<&str>,
        exclude_old_transactions: Option<bool>,
    ) -> Result<ReceiptResponse, ReceiptValidationError>;

    async fn validate_purchase(
        &self,
        payload: &ReceiptPayload,
        product_id: &str,
        shared_secret: Option<&str>,
    ) -> Result<ValidatedPurchase, ReceiptValidationError>;

    async fn validate_subscription(
        &self,
        payload: &ReceiptPayload,
        shared_secret: Option<&str>,
        exclude_old_transactions: bool,
        now: DateTime<Utc>,
    ) -> Result<ValidatedSubscription, ReceiptValidationError>;

    async fn validate(
        &self,
        payload: &ReceiptPayload,
        request: &VerificationRequest,
    ) -> Result<ValidationOutcome, ReceiptValidationError> {
        match request {
            VerificationRequest::Purchase {
                product_id,
                shared_secret,
            } => self
                .validate_purchase(payload, product_id, shared_secret.as_deref())
                .await
                .map(ValidationOutcome::Purchase),
            VerificationRequest::Subscription {
                shared_secret,
                exclude_old_transactions,
                now,
            } => self
                .validate_subscription(
                    payload,
                    shared_secret.as_deref(),
                    *exclude_old_transactions,
                    *now,
                )
                .await
                .map(ValidationOutcome::Subscription),
        }
    }
}
