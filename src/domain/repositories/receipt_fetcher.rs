use async_trait::async_trait;

use crate::{domain::entities::receipt_payload::ReceiptPayload, errors::ReceiptValidationError};

/// Source of the local receipt blob, e.g. the host platform's purchase-record
/// store.
#[async_trait]
pub trait ReceiptFetcher: Send + Sync {
    /// Returns the current receipt. When `refresh_if_needed` is set and no
    /// receipt is available locally, the implementation may ask the platform
    /// for a fresh one before giving up with
    /// [`ReceiptValidationError::NoReceiptFound`].
    async fn fetch_receipt(
        &self,
        refresh_if_needed: bool,
    ) -> Result<ReceiptPayload, ReceiptValidationError>;
}

/// Fetcher over a receipt already held in memory, for callers that receive
/// the blob from a client app.
#[derive(Debug, Clone, Default)]
pub struct StaticReceiptFetcher {
    receipt: Option<ReceiptPayload>,
}

impl StaticReceiptFetcher {
    pub fn new(receipt: Option<ReceiptPayload>) -> Self {
        Self { receipt }
    }
}

#[async_trait]
impl ReceiptFetcher for StaticReceiptFetcher {
    async fn fetch_receipt(
        &self,
        _refresh_if_needed: bool,
    ) -> Result<ReceiptPayload, ReceiptValidationError> {
        match &self.receipt {
            Some(receipt) if !receipt.is_empty() => Ok(receipt.clone()),
            _ => Err(ReceiptValidationError::NoReceiptFound),
        }
    }
}
