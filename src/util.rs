use chrono::{DateTime, Utc};

use crate::{
    config::ValidatorConfig,
    data::{
        datasources::verify_receipt_datasource::VerifyReceiptDatasourceImpl,
        repositories::receipt_repository_impl::ReceiptRepositoryImpl,
    },
    domain::{
        entities::{
            receipt_payload::ReceiptPayload,
            receipt_response::ReceiptResponse,
            validation_result::{ValidatedPurchase, ValidatedSubscription, ValidationOutcome},
            verification_request::VerificationRequest,
        },
        repositories::{receipt_fetcher::ReceiptFetcher, receipt_repository::ReceiptRepository},
    },
    errors::ReceiptValidationError,
};

/// Entry point for validating receipts.
///
/// Holds no state between calls beyond the HTTP client, so one instance can
/// serve concurrent validations.
pub struct ReceiptValidatorUtil<R: ReceiptRepository> {
    receipt_repository: R,
}

impl<R: ReceiptRepository> ReceiptValidatorUtil<R> {
    pub fn with_repository(receipt_repository: R) -> Self {
        Self { receipt_repository }
    }

    pub async fn validate(
        &self,
        payload: &ReceiptPayload,
        request: &VerificationRequest,
    ) -> Result<ValidationOutcome, ReceiptValidationError> {
        self.receipt_repository.validate(payload, request).await
    }

    pub async fn validate_purchase(
        &self,
        payload: &ReceiptPayload,
        product_id: &str,
        shared_secret: Option<&str>,
    ) -> Result<ValidatedPurchase, ReceiptValidationError> {
        self.receipt_repository
            .validate_purchase(payload, product_id, shared_secret)
            .await
    }

    pub async fn validate_subscription(
        &self,
        payload: &ReceiptPayload,
        shared_secret: Option<&str>,
        exclude_old_transactions: bool,
        now: DateTime<Utc>,
    ) -> Result<ValidatedSubscription, ReceiptValidationError> {
        self.receipt_repository
            .validate_subscription(payload, shared_secret, exclude_old_transactions, now)
            .await
    }

    /// The verified response with no status check or business rules applied.
    pub async fn fetch(
        &self,
        payload: &ReceiptPayload,
        shared_secret: Option<&str>,
        exclude_old_transactions: bool,
    ) -> Result<ReceiptResponse, ReceiptValidationError> {
        self.receipt_repository
            .fetch(payload, shared_secret, Some(exclude_old_transactions))
            .await
    }

    /// Obtains the receipt from `fetcher`, then validates it.
    pub async fn validate_local<F: ReceiptFetcher>(
        &self,
        fetcher: &F,
        request: &VerificationRequest,
        refresh_if_needed: bool,
    ) -> Result<ValidationOutcome, ReceiptValidationError> {
        let payload = fetcher.fetch_receipt(refresh_if_needed).await?;
        self.validate(&payload, request).await
    }
}

impl ReceiptValidatorUtil<ReceiptRepositoryImpl<VerifyReceiptDatasourceImpl>> {
    pub fn new(config: &ValidatorConfig) -> Result<Self, ReceiptValidationError> {
        Ok(Self {
            receipt_repository: ReceiptRepositoryImpl::new(config)?,
        })
    }

    pub fn from_env() -> Result<Self, ReceiptValidationError> {
        Self::new(&ValidatorConfig::from_env()?)
    }
}
