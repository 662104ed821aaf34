use std::{env, time::Duration};

use serde::Deserialize;

use crate::{
    constants::{DEFAULT_TIMEOUT_SECS, PRODUCTION_VERIFY_RECEIPT_URL, SANDBOX_VERIFY_RECEIPT_URL},
    domain::entities::environment::Environment,
    errors::ReceiptValidationError,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub production_url: String,
    pub sandbox_url: String,
    /// Environment queried first. The other one is only called when the
    /// primary reports the receipt belongs there.
    pub primary_environment: Environment,
    pub timeout_secs: u64,
    /// When set, receipts issued for any other bundle are rejected.
    pub expected_bundle_id: Option<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            production_url: PRODUCTION_VERIFY_RECEIPT_URL.to_owned(),
            sandbox_url: SANDBOX_VERIFY_RECEIPT_URL.to_owned(),
            primary_environment: Environment::Production,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            expected_bundle_id: None,
        }
    }
}

impl ValidatorConfig {
    /// Loads `.env` if present, then overrides the defaults with any
    /// `RECEIPT_VALIDATOR_*` variables that are set.
    pub fn from_env() -> Result<Self, ReceiptValidationError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ReceiptValidationError> {
        let defaults = Self::default();

        let primary_environment = match lookup("RECEIPT_VALIDATOR_PRIMARY_ENVIRONMENT") {
            None => defaults.primary_environment,
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "production" => Environment::Production,
                "sandbox" => Environment::Sandbox,
                _ => {
                    return Err(ReceiptValidationError::InvalidConfig(format!(
                        "RECEIPT_VALIDATOR_PRIMARY_ENVIRONMENT must be 'production' or 'sandbox', got '{v}'"
                    )))
                }
            },
        };

        let timeout_secs = match lookup("RECEIPT_VALIDATOR_TIMEOUT_SECS") {
            None => defaults.timeout_secs,
            Some(v) => v.parse().map_err(|_| {
                ReceiptValidationError::InvalidConfig(format!(
                    "RECEIPT_VALIDATOR_TIMEOUT_SECS must be a whole number of seconds, got '{v}'"
                ))
            })?,
        };

        Ok(Self {
            production_url: lookup("RECEIPT_VALIDATOR_PRODUCTION_URL")
                .unwrap_or(defaults.production_url),
            sandbox_url: lookup("RECEIPT_VALIDATOR_SANDBOX_URL").unwrap_or(defaults.sandbox_url),
            primary_environment,
            timeout_secs,
            expected_bundle_id: lookup("RECEIPT_VALIDATOR_BUNDLE_ID").filter(|v| !v.is_empty()),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
