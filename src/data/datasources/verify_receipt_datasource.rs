use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Url};

use crate::{
    config::ValidatorConfig,
    data::models::verify_receipt::{
        request_body_model::RequestBodyModel, response_body_model::ResponseBodyModel,
    },
    domain::entities::environment::Environment,
    errors::TransportError,
};

#[async_trait]
pub trait VerifyReceiptDatasource: Send + Sync {
    /// verifyReceipt:
    /// https://developer.apple.com/documentation/appstorereceipts/verifyreceipt
    ///
    /// environment:
    ///   Which of the two configured endpoints to call. Exactly one request is
    ///   sent; this layer never retries.
    /// body:
    ///   The receipt, optional shared secret, and for subscriptions the
    ///   exclude-old-transactions flag.
    async fn verify_receipt(
        &self,
        environment: Environment,
        body: &RequestBodyModel,
    ) -> Result<ResponseBodyModel, TransportError>;
}

pub struct VerifyReceiptDatasourceImpl {
    client: reqwest::Client,
    production_url: Url,
    sandbox_url: Url,
}

#[async_trait]
impl VerifyReceiptDatasource for VerifyReceiptDatasourceImpl {
    async fn verify_receipt(
        &self,
        environment: Environment,
        body: &RequestBodyModel,
    ) -> Result<ResponseBodyModel, TransportError> {
        let url = self.url_for(environment);
        tracing::debug!(%environment, %url, "sending verifyReceipt callout");
        self.callout(environment, url.clone(), body).await
    }
}

impl VerifyReceiptDatasourceImpl {
    pub(crate) fn new(config: &ValidatorConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TransportError::ClientBuild(format!("{:?}", e)))?;
        Ok(Self {
            client,
            production_url: parse_url(&config.production_url)?,
            sandbox_url: parse_url(&config.sandbox_url)?,
        })
    }

    fn url_for(&self, environment: Environment) -> &Url {
        match environment {
            Environment::Production => &self.production_url,
            Environment::Sandbox => &self.sandbox_url,
        }
    }

    async fn callout(
        &self,
        environment: Environment,
        url: Url,
        body: &RequestBodyModel,
    ) -> Result<ResponseBodyModel, TransportError> {
        let payload =
            serde_json::to_vec(body).map_err(|e| TransportError::Encode(format!("{:?}", e)))?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(%environment, error = ?e, "verifyReceipt callout failed to send");
                if e.is_timeout() {
                    TransportError::Timeout { environment }
                } else {
                    TransportError::Send {
                        environment,
                        details: format!("{:?}", e),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%environment, status, "verifyReceipt callout returned non-200 status");
            return Err(TransportError::HttpStatus {
                environment,
                status,
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout { environment }
            } else {
                TransportError::Send {
                    environment,
                    details: format!("{:?}", e),
                }
            }
        })?;
        decode_response(environment, &bytes)
    }
}

fn parse_url(raw: &str) -> Result<Url, TransportError> {
    Url::parse(raw).map_err(|e| TransportError::InvalidUrl {
        url: raw.to_owned(),
        details: e.to_string(),
    })
}

pub(crate) fn decode_response(
    environment: Environment,
    bytes: &[u8],
) -> Result<ResponseBodyModel, TransportError> {
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::warn!(%environment, error = %e, "failed to decode verifyReceipt response");
        TransportError::Decode {
            environment,
            details: e.to_string(),
        }
    })
}
