//! Turns a decoded verification response into a verdict.
//!
//! Every function here is pure: the same response and the same `now` always
//! produce the same result.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    domain::entities::{
        receipt_response::{ReceiptEntry, ReceiptResponse},
        validation_result::{ValidatedPurchase, ValidatedSubscription},
    },
    errors::{ReceiptValidationError, VerificationError},
};

/// Rejects any response whose status is not `0`, and, when an expected
/// bundle id is given, any receipt issued for another app.
pub(crate) fn check_status(
    response: &ReceiptResponse,
    expected_bundle_id: Option<&str>,
) -> Result<(), ReceiptValidationError> {
    if let Some(error) = VerificationError::from_status_code(response.status) {
        return Err(ReceiptValidationError::Verification {
            error,
            is_retryable: response.is_retryable,
        });
    }
    if let Some(expected) = expected_bundle_id {
        let actual = response.bundle_id.as_deref().unwrap_or_default();
        if actual != expected {
            return Err(ReceiptValidationError::BundleIdNotMatching {
                expected: expected.to_owned(),
                actual: actual.to_owned(),
            });
        }
    }
    Ok(())
}

pub(crate) fn validate_purchase(
    response: ReceiptResponse,
    product_id: &str,
    expected_bundle_id: Option<&str>,
) -> Result<ValidatedPurchase, ReceiptValidationError> {
    check_status(&response, expected_bundle_id)?;

    let entry = latest_purchase_of(&response, product_id)
        .cloned()
        .ok_or(ReceiptValidationError::ProductIdNotMatching {
            environment: response.environment,
        })?;

    // A refunded or revoked transaction is never reported as a purchase.
    if let Some(cancellation_date) = entry.cancellation_date {
        return Err(ReceiptValidationError::PurchaseCancelled {
            product_id: entry.product_id,
            cancellation_date,
        });
    }

    tracing::debug!(
        product_id,
        transaction_id = %entry.transaction_id,
        environment = %response.environment,
        "purchase validated"
    );
    Ok(ValidatedPurchase { entry, response })
}

pub(crate) fn validate_subscription(
    response: ReceiptResponse,
    exclude_old_transactions: bool,
    now: DateTime<Utc>,
    expected_bundle_id: Option<&str>,
) -> Result<ValidatedSubscription, ReceiptValidationError> {
    check_status(&response, expected_bundle_id)?;

    let valid_entries = valid_subscription_entries(&response, exclude_old_transactions, now);
    tracing::debug!(
        valid = valid_entries.len(),
        environment = %response.environment,
        %now,
        "subscription validated"
    );
    Ok(ValidatedSubscription {
        valid_entries,
        pending_renewal_info: response.pending_renewal_info.clone(),
        response,
    })
}

/// The most recent transaction for `product_id`, looking at both the receipt
/// and the latest receipt info.
///
/// The same transaction may be listed in both. The receipt copy reflects the
/// blob the client sent and can predate a refund, so on equal purchase dates
/// a cancelled copy wins, then the latest receipt info copy.
fn latest_purchase_of<'a>(
    response: &'a ReceiptResponse,
    product_id: &str,
) -> Option<&'a ReceiptEntry> {
    response
        .latest_receipt_info
        .iter()
        .chain(response.in_app.iter())
        .filter(|entry| entry.product_id == product_id)
        .fold(None::<&ReceiptEntry>, |latest, entry| match latest {
            Some(current)
                if (current.purchase_date, current.is_cancelled())
                    >= (entry.purchase_date, entry.is_cancelled()) =>
            {
                Some(current)
            }
            _ => Some(entry),
        })
}

/// Subscription transactions valid at `now`, in their original order.
pub(crate) fn valid_subscription_entries(
    response: &ReceiptResponse,
    exclude_old_transactions: bool,
    now: DateTime<Utc>,
) -> Vec<ReceiptEntry> {
    let source = if response.latest_receipt_info.is_empty() {
        &response.in_app
    } else {
        &response.latest_receipt_info
    };

    let candidates: Vec<&ReceiptEntry> = if exclude_old_transactions {
        latest_per_original_transaction(source)
    } else {
        source.iter().collect()
    };

    candidates
        .into_iter()
        .filter(|entry| entry.is_active_at(now))
        .cloned()
        .collect()
}

/// Keeps only the latest-expiring entry of each original transaction. This is
/// what the service itself returns when asked to exclude old transactions, so
/// applying it to an already limited list changes nothing.
fn latest_per_original_transaction(entries: &[ReceiptEntry]) -> Vec<&ReceiptEntry> {
    let mut latest: HashMap<&str, usize> = HashMap::new();
    for (i, entry) in entries.iter().enumerate() {
        latest
            .entry(entry.original_transaction_id.as_str())
            .and_modify(|best| {
                if entries[*best].expires_date < entry.expires_date {
                    *best = i;
                }
            })
            .or_insert(i);
    }
    entries
        .iter()
        .enumerate()
        .filter(|(i, entry)| latest.get(entry.original_transaction_id.as_str()) == Some(i))
        .map(|(_, entry)| entry)
        .collect()
}
