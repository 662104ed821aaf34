#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};

use super::common::{EnvironmentModel, ReceiptDate};

/// Data structure returned by the verifyReceipt endpoint.
///
/// https://developer.apple.com/documentation/appstorereceipts/responsebody
///
/// Error responses carry little more than `status`, so everything else is
/// optional or defaulted.
#[derive(Debug, Deserialize)]
pub struct ResponseBodyModel {
    /// Either 0 if the receipt is valid, or a status code if there is an
    /// error.
    pub(crate) status: i64,
    /// The environment for which the receipt was generated.
    pub(crate) environment: Option<EnvironmentModel>,
    /// An indicator that an error occurred during the request. Only present
    /// for status codes 21100-21199.
    #[serde(rename = "is-retryable")]
    pub(crate) is_retryable: Option<bool>,
    /// The latest Base64 encoded app receipt. Only returned for receipts that
    /// contain auto-renewable subscriptions.
    pub(crate) latest_receipt: Option<String>,
    /// An array that contains all in-app purchase transactions. Only returned
    /// for receipts that contain auto-renewable subscriptions.
    #[serde(default)]
    pub(crate) latest_receipt_info: Vec<InAppModel>,
    /// An array where each element contains the pending renewal information
    /// for each auto-renewable subscription identified by the product_id.
    #[serde(default)]
    pub(crate) pending_renewal_info: Vec<PendingRenewalInfoModel>,
    /// A JSON representation of the receipt that was sent for verification.
    pub(crate) receipt: Option<ReceiptModel>,
}

/// https://developer.apple.com/documentation/appstorereceipts/responsebody/receipt
#[derive(Debug, Deserialize)]
pub struct ReceiptModel {
    /// The bundle identifier for the app to which the receipt belongs.
    pub(crate) bundle_id: String,
    /// The app's version number.
    pub(crate) application_version: Option<String>,
    /// The type of receipt generated, e.g. "Production" or
    /// "ProductionSandbox".
    pub(crate) receipt_type: Option<String>,
    /// An array that contains the in-app purchase receipt fields for all
    /// in-app purchase transactions.
    #[serde(default)]
    pub(crate) in_app: Vec<InAppModel>,
}

/// https://developer.apple.com/documentation/appstorereceipts/responsebody/receipt/in_app
///
/// The service sends numbers and booleans as strings.
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct InAppModel {
    /// The unique identifier of the product purchased.
    pub(crate) product_id: String,
    /// A unique identifier for a transaction such as a purchase, restore, or
    /// renewal.
    pub(crate) transaction_id: String,
    /// The transaction identifier of the original purchase.
    pub(crate) original_transaction_id: String,
    /// The time the App Store charged the user's account for a purchased or
    /// restored product, or for a subscription renewal after a lapse.
    #[serde_as(as = "ReceiptDate")]
    pub(crate) purchase_date: DateTime<Utc>,
    /// The time of the original in-app purchase.
    #[serde_as(as = "Option<ReceiptDate>")]
    pub(crate) original_purchase_date: Option<DateTime<Utc>>,
    /// The time a subscription expires or when it will renew.
    #[serde_as(as = "Option<ReceiptDate>")]
    pub(crate) expires_date: Option<DateTime<Utc>>,
    /// The time the App Store refunded a transaction or revoked it from
    /// Family Sharing.
    #[serde_as(as = "Option<ReceiptDate>")]
    pub(crate) cancellation_date: Option<DateTime<Utc>>,
    /// The reason for a refunded or revoked transaction. "1" indicates an
    /// actual or perceived issue within the app; "0" indicates any other
    /// reason.
    pub(crate) cancellation_reason: Option<String>,
    /// The number of consumable products purchased.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub(crate) quantity: Option<u32>,
    /// An indicator of whether a subscription is in the free trial period.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub(crate) is_trial_period: Option<bool>,
    /// An indicator of whether an auto-renewable subscription is in the
    /// introductory price period.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub(crate) is_in_intro_offer_period: Option<bool>,
    /// A unique identifier for purchase events across devices, including
    /// subscription-renewal events.
    pub(crate) web_order_line_item_id: Option<String>,
    /// The identifier of the subscription group to which the subscription
    /// belongs.
    pub(crate) subscription_group_identifier: Option<String>,
}

/// https://developer.apple.com/documentation/appstorereceipts/responsebody/pending_renewal_info
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct PendingRenewalInfoModel {
    /// The unique identifier of the product purchased.
    pub(crate) product_id: String,
    /// The current renewal preference for the auto-renewable subscription.
    pub(crate) auto_renew_product_id: String,
    /// The current renewal status for the auto-renewable subscription.
    pub(crate) auto_renew_status: Option<String>,
    /// The transaction identifier of the original purchase.
    pub(crate) original_transaction_id: Option<String>,
    /// The reason a subscription expired.
    pub(crate) expiration_intent: Option<String>,
    /// A flag that indicates Apple is attempting to renew an expired
    /// subscription automatically. "1" while in the retry period.
    pub(crate) is_in_billing_retry_period: Option<String>,
    /// The time at which the grace period for subscription renewals expires.
    #[serde_as(as = "Option<ReceiptDate>")]
    pub(crate) grace_period_expires_date: Option<DateTime<Utc>>,
}
