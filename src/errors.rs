use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::entities::environment::Environment;

/// Failure to complete a round trip with the verification service. These are
/// never attributable to the service's verdict on the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid verification URL '{url}': {details}")]
    InvalidUrl { url: String, details: String },

    #[error("HTTP client could not be built: {0}")]
    ClientBuild(String),

    #[error("request body could not be encoded: {0}")]
    Encode(String),

    #[error("callout to {environment} failed to send: {details}")]
    Send {
        environment: Environment,
        details: String,
    },

    #[error("callout to {environment} timed out")]
    Timeout { environment: Environment },

    #[error("callout to {environment} returned with {status} status code: {body}")]
    HttpStatus {
        environment: Environment,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {environment}: {details}")]
    Decode {
        environment: Environment,
        details: String,
    },
}

/// A non-success status reported by the verification service.
///
/// https://developer.apple.com/documentation/appstorereceipts/status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// 21000: The request to the App Store was not made using the HTTP POST
    /// request method, or the JSON could not be read.
    #[error("the App Store could not read the JSON object you provided")]
    JsonNotReadable,
    /// 21002: The data in the receipt-data property was malformed or the
    /// service experienced a temporary issue.
    #[error("the data in the receipt-data property was malformed or missing")]
    MalformedOrMissingData,
    /// 21003: The receipt could not be authenticated.
    #[error("the receipt could not be authenticated")]
    ReceiptCouldNotBeAuthenticated,
    /// 21004: The shared secret you provided does not match the shared secret
    /// on file for your account.
    #[error("the shared secret does not match the shared secret on file")]
    SharedSecretNotMatching,
    /// 21005: The receipt server was temporarily unable to provide the
    /// receipt.
    #[error("the receipt server is currently not available")]
    ReceiptServerUnavailable,
    /// 21006: This receipt is valid but the subscription has expired. Only
    /// returned for iOS 6-style transaction receipts.
    #[error("the receipt is valid but the subscription has expired")]
    SubscriptionExpired,
    /// 21007: This receipt is from the test environment, but it was sent to
    /// the production environment for verification.
    #[error("the receipt is from the sandbox but was sent to the production service")]
    SandboxReceiptSentToProduction,
    /// 21008: This receipt is from the production environment, but it was sent
    /// to the test environment for verification.
    #[error("the receipt is from production but was sent to the sandbox service")]
    ProductionReceiptSentToSandbox,
    /// 21009: Internal data access error.
    #[error("internal data access error")]
    InternalDataAccessError,
    /// 21010: The user account cannot be found or has been deleted.
    #[error("the receipt could not be authorized")]
    ReceiptCouldNotBeAuthorized,
    /// 21100-21199: Internal data access error.
    #[error("internal data access error (status {0})")]
    InternalDataAccessRange(i64),
    /// Any status code not documented by the service.
    #[error("unknown verification status {0}")]
    Unknown(i64),
}

impl VerificationError {
    /// Maps a service status code to its error. Returns `None` only for `0`
    /// (the receipt is valid); every other integer maps to a variant.
    pub fn from_status_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => return None,
            21000 => Self::JsonNotReadable,
            21002 => Self::MalformedOrMissingData,
            21003 => Self::ReceiptCouldNotBeAuthenticated,
            21004 => Self::SharedSecretNotMatching,
            21005 => Self::ReceiptServerUnavailable,
            21006 => Self::SubscriptionExpired,
            21007 => Self::SandboxReceiptSentToProduction,
            21008 => Self::ProductionReceiptSentToSandbox,
            21009 => Self::InternalDataAccessError,
            21010 => Self::ReceiptCouldNotBeAuthorized,
            21100..=21199 => Self::InternalDataAccessRange(code),
            other => Self::Unknown(other),
        })
    }

    pub fn status_code(&self) -> i64 {
        match self {
            Self::JsonNotReadable => 21000,
            Self::MalformedOrMissingData => 21002,
            Self::ReceiptCouldNotBeAuthenticated => 21003,
            Self::SharedSecretNotMatching => 21004,
            Self::ReceiptServerUnavailable => 21005,
            Self::SubscriptionExpired => 21006,
            Self::SandboxReceiptSentToProduction => 21007,
            Self::ProductionReceiptSentToSandbox => 21008,
            Self::InternalDataAccessError => 21009,
            Self::ReceiptCouldNotBeAuthorized => 21010,
            Self::InternalDataAccessRange(code) | Self::Unknown(code) => *code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiptValidationError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service explicitly rejected the receipt. `is_retryable` carries the
    /// service's own hint, when it sent one.
    #[error("receipt verification failed: {error}")]
    Verification {
        error: VerificationError,
        is_retryable: Option<bool>,
    },

    #[error("no transaction for the requested product id was found in the {environment} receipt")]
    ProductIdNotMatching { environment: Environment },

    #[error("purchase of '{product_id}' was cancelled at {cancellation_date}")]
    PurchaseCancelled {
        product_id: String,
        cancellation_date: DateTime<Utc>,
    },

    #[error("receipt bundle id '{actual}' does not match expected '{expected}'")]
    BundleIdNotMatching { expected: String, actual: String },

    #[error("no receipt found")]
    NoReceiptFound,

    #[error("receipt could not be fetched: {0}")]
    ReceiptFetchFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<VerificationError> for ReceiptValidationError {
    fn from(error: VerificationError) -> Self {
        Self::Verification {
            error,
            is_retryable: None,
        }
    }
}

impl ReceiptValidationError {
    /// Whether repeating the same call later may succeed. Business-rule
    /// rejections never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(TransportError::Send { .. })
            | Self::Transport(TransportError::Timeout { .. }) => true,
            Self::Transport(TransportError::HttpStatus { status, .. }) => *status >= 500,
            Self::Verification {
                error: VerificationError::ReceiptServerUnavailable,
                ..
            } => true,
            Self::Verification {
                error: VerificationError::InternalDataAccessRange(_),
                is_retryable,
            } => is_retryable.unwrap_or(true),
            Self::Verification { is_retryable, .. } => is_retryable.unwrap_or(false),
            _ => false,
        }
    }
}
