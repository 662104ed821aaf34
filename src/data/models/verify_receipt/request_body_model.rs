use serde::Serialize;

/// Request body of a verifyReceipt call.
///
/// https://developer.apple.com/documentation/appstorereceipts/requestbody
#[derive(Debug, Serialize)]
pub struct RequestBodyModel {
    /// The Base64-encoded receipt data.
    #[serde(rename = "receipt-data")]
    pub(crate) receipt_data: String,
    /// Your app's shared secret, which is a hexadecimal string.
    #[serde(rename = "password", skip_serializing_if = "Option::is_none")]
    pub(crate) password: Option<String>,
    /// Set to true for the response to include only the latest renewal
    /// transaction for any subscriptions. Only sent for subscription
    /// requests.
    #[serde(
        rename = "exclude-old-transactions",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) exclude_old_transactions: Option<bool>,
}
