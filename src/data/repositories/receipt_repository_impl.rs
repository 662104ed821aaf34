use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    config::ValidatorConfig,
    constants::{
        MAX_ENVIRONMENT_FALLBACKS, STATUS_PRODUCTION_RECEIPT_SENT_TO_SANDBOX,
        STATUS_SANDBOX_RECEIPT_SENT_TO_PRODUCTION,
    },
    data::{
        datasources::verify_receipt_datasource::{
            VerifyReceiptDatasource, VerifyReceiptDatasourceImpl,
        },
        models::verify_receipt::{
            common::EnvironmentModel,
            request_body_model::RequestBodyModel,
            response_body_model::{InAppModel, PendingRenewalInfoModel, ResponseBodyModel},
        },
    },
    domain::{
        entities::{
            environment::Environment,
            receipt_payload::ReceiptPayload,
            receipt_response::{
                AutoRenewStatus, CancellationReason, PendingRenewalInfo, ReceiptEntry,
                ReceiptResponse,
            },
            validation_result::{ValidatedPurchase, ValidatedSubscription},
        },
        repositories::receipt_repository::ReceiptRepository,
        validation::response_validator,
    },
    errors::ReceiptValidationError,
};

pub struct ReceiptRepositoryImpl<A: VerifyReceiptDatasource> {
    verify_receipt_datasource: A,
    primary_environment: Environment,
    expected_bundle_id: Option<String>,
}

#[async_trait]
impl<A: VerifyReceiptDatasource> ReceiptRepository for ReceiptRepositoryImpl<A> {
    async fn fetch(
        &self,
        payload: &ReceiptPayload,
        shared_secret: Option<&str>,
        exclude_old_transactions: Option<bool>,
    ) -> Result<ReceiptResponse, ReceiptValidationError> {
        let body = RequestBodyModel {
            receipt_data: payload.to_base64(),
            password: shared_secret.map(str::to_owned),
            exclude_old_transactions,
        };
        self.verify_with_environment_fallback(&body).await
    }

    async fn validate_purchase(
        &self,
        payload: &ReceiptPayload,
        product_id: &str,
        shared_secret: Option<&str>,
    ) -> Result<ValidatedPurchase, ReceiptValidationError> {
        let response = self.fetch(payload, shared_secret, None).await?;
        response_validator::validate_purchase(
            response,
            product_id,
            self.expected_bundle_id.as_deref(),
        )
    }

    async fn validate_subscription(
        &self,
        payload: &ReceiptPayload,
        shared_secret: Option<&str>,
        exclude_old_transactions: bool,
        now: DateTime<Utc>,
    ) -> Result<ValidatedSubscription, ReceiptValidationError> {
        let response = self
            .fetch(payload, shared_secret, Some(exclude_old_transactions))
            .await?;
        response_validator::validate_subscription(
            response,
            exclude_old_transactions,
            now,
            self.expected_bundle_id.as_deref(),
        )
    }
}

impl ReceiptRepositoryImpl<VerifyReceiptDatasourceImpl> {
    pub(crate) fn new(config: &ValidatorConfig) -> Result<Self, ReceiptValidationError> {
        Ok(Self::with_datasource(
            VerifyReceiptDatasourceImpl::new(config)?,
            config,
        ))
    }
}

impl<A: VerifyReceiptDatasource> ReceiptRepositoryImpl<A> {
    pub(crate) fn with_datasource(verify_receipt_datasource: A, config: &ValidatorConfig) -> Self {
        Self {
            verify_receipt_datasource,
            primary_environment: config.primary_environment,
            expected_bundle_id: config.expected_bundle_id.clone(),
        }
    }

    /// Calls the primary environment, and if it reports that the receipt
    /// belongs to the other one, calls that one. Fallbacks are capped at
    /// `MAX_ENVIRONMENT_FALLBACKS`, after which a response is final whatever
    /// its status. Transport errors are returned immediately.
    async fn verify_with_environment_fallback(
        &self,
        body: &RequestBodyModel,
    ) -> Result<ReceiptResponse, ReceiptValidationError> {
        let mut environment = self.primary_environment;
        let mut fallbacks_left = MAX_ENVIRONMENT_FALLBACKS;
        loop {
            let m = self
                .verify_receipt_datasource
                .verify_receipt(environment, body)
                .await?;

            match redirect_target(m.status) {
                Some(target) if fallbacks_left > 0 && target == environment.other() => {
                    tracing::info!(
                        status = m.status,
                        from = %environment,
                        to = %target,
                        "receipt belongs to the other environment, retrying"
                    );
                    fallbacks_left -= 1;
                    environment = target;
                }
                _ => return Ok(ReceiptResponse::from_model(m, environment)),
            }
        }
    }
}

fn redirect_target(status: i64) -> Option<Environment> {
    match status {
        STATUS_SANDBOX_RECEIPT_SENT_TO_PRODUCTION => Some(Environment::Sandbox),
        STATUS_PRODUCTION_RECEIPT_SENT_TO_SANDBOX => Some(Environment::Production),
        _ => None,
    }
}

impl ReceiptResponse {
    fn from_model(m: ResponseBodyModel, queried: Environment) -> Self {
        let (bundle_id, in_app) = match m.receipt {
            Some(receipt) => (Some(receipt.bundle_id), receipt.in_app),
            None => (None, Vec::new()),
        };
        ReceiptResponse {
            status: m.status,
            environment: match m.environment {
                Some(EnvironmentModel::Production) => Environment::Production,
                Some(EnvironmentModel::Sandbox) => Environment::Sandbox,
                None => queried,
            },
            bundle_id,
            in_app: in_app.into_iter().map(ReceiptEntry::from_model).collect(),
            latest_receipt_info: m
                .latest_receipt_info
                .into_iter()
                .map(ReceiptEntry::from_model)
                .collect(),
            pending_renewal_info: m
                .pending_renewal_info
                .into_iter()
                .map(PendingRenewalInfo::from_model)
                .collect(),
            latest_receipt: m.latest_receipt,
            is_retryable: m.is_retryable,
        }
    }
}

impl ReceiptEntry {
    fn from_model(m: InAppModel) -> Self {
        ReceiptEntry {
            product_id: m.product_id,
            transaction_id: m.transaction_id,
            original_transaction_id: m.original_transaction_id,
            purchase_date: m.purchase_date,
            original_purchase_date: m.original_purchase_date,
            expires_date: m.expires_date,
            cancellation_date: m.cancellation_date,
            cancellation_reason: m.cancellation_reason.map(|reason| match reason.as_str() {
                "1" => CancellationReason::AppIssue,
                "0" => CancellationReason::Other,
                _ => CancellationReason::Unknown(reason),
            }),
            quantity: m.quantity.unwrap_or(1),
            is_trial_period: m.is_trial_period.unwrap_or(false),
            is_in_intro_offer_period: m.is_in_intro_offer_period.unwrap_or(false),
            web_order_line_item_id: m.web_order_line_item_id,
            subscription_group_identifier: m.subscription_group_identifier,
        }
    }
}

impl PendingRenewalInfo {
    fn from_model(m: PendingRenewalInfoModel) -> Self {
        PendingRenewalInfo {
            product_id: m.product_id,
            auto_renew_product_id: m.auto_renew_product_id,
            auto_renew_status: m.auto_renew_status.map(|status| match status.as_str() {
                "1" => AutoRenewStatus::On,
                "0" => AutoRenewStatus::Off,
                _ => AutoRenewStatus::Unknown(status),
            }),
            original_transaction_id: m.original_transaction_id,
            expiration_intent: m.expiration_intent,
            is_in_billing_retry_period: m
                .is_in_billing_retry_period
                .and_then(|flag| match flag.as_str() {
                    "1" => Some(true),
                    "0" => Some(false),
                    _ => None,
                }),
            grace_period_expires_date: m.grace_period_expires_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use chrono::TimeZone;

    use super::*;
    use crate::{
        data::datasources::verify_receipt_datasource::decode_response,
        domain::entities::{
            validation_result::ValidationOutcome, verification_request::VerificationRequest,
        },
        errors::{TransportError, VerificationError},
    };

    /// Replays queued results in order and records every call.
    #[derive(Default, Clone)]
    struct MockVerifyReceiptDatasource {
        inner: Arc<Mutex<MockState>>,
    }

    #[derive(Default)]
    struct MockState {
        results: VecDeque<Result<String, TransportError>>,
        calls: Vec<(Environment, serde_json::Value)>,
    }

    impl MockVerifyReceiptDatasource {
        fn respond(&self, json: &str) -> &Self {
            self.inner
                .lock()
                .unwrap()
                .results
                .push_back(Ok(json.to_owned()));
            self
        }

        fn fail(&self, error: TransportError) -> &Self {
            self.inner.lock().unwrap().results.push_back(Err(error));
            self
        }

        fn calls(&self) -> Vec<(Environment, serde_json::Value)> {
            self.inner.lock().unwrap().calls.clone()
        }

        fn environments_called(&self) -> Vec<Environment> {
            self.calls().into_iter().map(|(env, _)| env).collect()
        }
    }

    #[async_trait]
    impl VerifyReceiptDatasource for MockVerifyReceiptDatasource {
        async fn verify_receipt(
            &self,
            environment: Environment,
            body: &RequestBodyModel,
        ) -> Result<ResponseBodyModel, TransportError> {
            let next = {
                let mut state = self.inner.lock().unwrap();
                state
                    .calls
                    .push((environment, serde_json::to_value(body).unwrap()));
                state
                    .results
                    .pop_front()
                    .expect("unexpected verifyReceipt call")
            };
            decode_response(environment, next?.as_bytes())
        }
    }

    fn repository(
        mock: &MockVerifyReceiptDatasource,
        config: &ValidatorConfig,
    ) -> ReceiptRepositoryImpl<MockVerifyReceiptDatasource> {
        ReceiptRepositoryImpl::with_datasource(mock.clone(), config)
    }

    fn payload() -> ReceiptPayload {
        ReceiptPayload::new(b"receipt".to_vec())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 2, 15, 0, 0, 0).unwrap()
    }

    const PURCHASE_123: &str = r#"{
        "status": 0,
        "environment": "Production",
        "receipt": {
            "bundle_id": "com.example.app",
            "in_app": [{
                "quantity": "1",
                "product_id": "123",
                "transaction_id": "1000000001",
                "original_transaction_id": "1000000001",
                "purchase_date": "2020-01-01 10:00:00 Etc/GMT"
            }]
        }
    }"#;

    const SANDBOX_PURCHASE_123: &str = r#"{
        "status": 0,
        "environment": "Sandbox",
        "receipt": {
            "bundle_id": "com.example.app",
            "in_app": [{
                "product_id": "123",
                "transaction_id": "2000000001",
                "original_transaction_id": "2000000001",
                "purchase_date": "2020-01-01 10:00:00 Etc/GMT"
            }]
        }
    }"#;

    const SUBSCRIPTION: &str = r#"{
        "status": 0,
        "environment": "Production",
        "receipt": { "bundle_id": "com.example.app", "in_app": [] },
        "latest_receipt_info": [
            {
                "product_id": "monthly",
                "transaction_id": "1",
                "original_transaction_id": "1",
                "purchase_date": "2020-01-01 00:00:00 Etc/GMT",
                "expires_date": "2020-02-01 00:00:00 Etc/GMT"
            },
            {
                "product_id": "monthly",
                "transaction_id": "2",
                "original_transaction_id": "1",
                "purchase_date": "2020-02-01 00:00:00 Etc/GMT",
                "expires_date": "2020-03-01 00:00:00 Etc/GMT"
            }
        ],
        "pending_renewal_info": [{
            "product_id": "monthly",
            "auto_renew_product_id": "yearly",
            "auto_renew_status": "0",
            "original_transaction_id": "1",
            "is_in_billing_retry_period": "1"
        }]
    }"#;

    #[tokio::test]
    async fn purchase_on_primary_makes_one_call() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(PURCHASE_123);
        let repo = repository(&mock, &ValidatorConfig::default());

        let validated = repo
            .validate_purchase(&payload(), "123", Some("secret"))
            .await
            .unwrap();

        assert_eq!(validated.entry.product_id, "123");
        assert_eq!(validated.entry.transaction_id, "1000000001");
        assert_eq!(validated.response.environment, Environment::Production);
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Environment::Production);
        assert_eq!(
            calls[0].1,
            serde_json::json!({ "receipt-data": "cmVjZWlwdA==", "password": "secret" })
        );
    }

    #[tokio::test]
    async fn purchase_for_other_product_is_not_matching() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(&PURCHASE_123.replace("\"123\"", "\"456\""));
        let repo = repository(&mock, &ValidatorConfig::default());

        assert_eq!(
            repo.validate_purchase(&payload(), "123", None)
                .await
                .unwrap_err(),
            ReceiptValidationError::ProductIdNotMatching {
                environment: Environment::Production
            }
        );
    }

    #[tokio::test]
    async fn sandbox_receipt_falls_back_to_sandbox_once() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(r#"{"status":21007}"#)
            .respond(SANDBOX_PURCHASE_123);
        let repo = repository(&mock, &ValidatorConfig::default());

        let validated = repo.validate_purchase(&payload(), "123", None).await.unwrap();

        assert_eq!(
            mock.environments_called(),
            vec![Environment::Production, Environment::Sandbox]
        );
        assert_eq!(validated.entry.transaction_id, "2000000001");
        assert_eq!(validated.response.environment, Environment::Sandbox);
        let calls = mock.calls();
        assert_eq!(calls[0].1, calls[1].1);
    }

    #[tokio::test]
    async fn production_receipt_falls_back_to_production() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(r#"{"status":21008}"#).respond(PURCHASE_123);
        let config = ValidatorConfig {
            primary_environment: Environment::Sandbox,
            ..ValidatorConfig::default()
        };
        let repo = repository(&mock, &config);

        repo.validate_purchase(&payload(), "123", None).await.unwrap();

        assert_eq!(
            mock.environments_called(),
            vec![Environment::Sandbox, Environment::Production]
        );
    }

    #[tokio::test]
    async fn second_redirect_is_final() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(r#"{"status":21007}"#)
            .respond(r#"{"status":21008}"#);
        let repo = repository(&mock, &ValidatorConfig::default());

        let err = repo
            .validate_purchase(&payload(), "123", None)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ReceiptValidationError::Verification {
                error: VerificationError::ProductionReceiptSentToSandbox,
                is_retryable: None,
            }
        );
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn redirect_back_from_production_fallback_is_final() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(r#"{"status":21008}"#)
            .respond(r#"{"status":21007}"#);
        let config = ValidatorConfig {
            primary_environment: Environment::Sandbox,
            ..ValidatorConfig::default()
        };
        let repo = repository(&mock, &config);

        let response = repo.fetch(&payload(), None, None).await.unwrap();

        assert_eq!(response.status, 21007);
        assert_eq!(response.environment, Environment::Production);
        assert_eq!(
            mock.environments_called(),
            vec![Environment::Sandbox, Environment::Production]
        );
    }

    #[tokio::test]
    async fn redirect_to_same_environment_is_not_followed() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(r#"{"status":21008}"#);
        let repo = repository(&mock, &ValidatorConfig::default());

        let response = repo.fetch(&payload(), None, None).await.unwrap();

        assert_eq!(response.status, 21008);
        assert_eq!(mock.environments_called(), vec![Environment::Production]);
    }

    #[tokio::test]
    async fn transport_error_on_primary_aborts() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.fail(TransportError::Timeout {
            environment: Environment::Production,
        });
        let repo = repository(&mock, &ValidatorConfig::default());

        assert_eq!(
            repo.validate_purchase(&payload(), "123", None)
                .await
                .unwrap_err(),
            ReceiptValidationError::Transport(TransportError::Timeout {
                environment: Environment::Production
            })
        );
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn transport_error_on_fallback_is_final() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(r#"{"status":21007}"#)
            .fail(TransportError::Send {
                environment: Environment::Sandbox,
                details: "connection reset".to_owned(),
            });
        let repo = repository(&mock, &ValidatorConfig::default());

        assert!(matches!(
            repo.validate_purchase(&payload(), "123", None).await,
            Err(ReceiptValidationError::Transport(TransportError::Send {
                environment: Environment::Sandbox,
                ..
            }))
        ));
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn undecodable_body_is_transport_error() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond("<html>gateway timeout</html>");
        let repo = repository(&mock, &ValidatorConfig::default());

        assert!(matches!(
            repo.fetch(&payload(), None, None).await,
            Err(ReceiptValidationError::Transport(TransportError::Decode { .. }))
        ));
    }

    #[tokio::test]
    async fn unauthenticated_receipt_is_verification_error() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(r#"{"status":21003}"#);
        let repo = repository(&mock, &ValidatorConfig::default());

        assert_eq!(
            repo.validate_subscription(&payload(), None, false, now())
                .await
                .unwrap_err(),
            ReceiptValidationError::Verification {
                error: VerificationError::ReceiptCouldNotBeAuthenticated,
                is_retryable: None,
            }
        );
    }

    #[tokio::test]
    async fn subscription_sends_flag_and_filters_entries() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(SUBSCRIPTION);
        let repo = repository(&mock, &ValidatorConfig::default());

        let validated = repo
            .validate_subscription(&payload(), Some("secret"), true, now())
            .await
            .unwrap();

        assert_eq!(validated.valid_entries.len(), 1);
        assert_eq!(validated.valid_entries[0].transaction_id, "2");
        assert_eq!(
            validated.valid_entries[0].expires_date,
            Some(Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap())
        );
        let renewal = &validated.pending_renewal_info[0];
        assert_eq!(renewal.auto_renew_status, Some(AutoRenewStatus::Off));
        assert_eq!(renewal.is_in_billing_retry_period, Some(true));
        assert_eq!(
            mock.calls()[0].1,
            serde_json::json!({
                "receipt-data": "cmVjZWlwdA==",
                "password": "secret",
                "exclude-old-transactions": true,
            })
        );
    }

    #[tokio::test]
    async fn validate_dispatches_on_request_kind() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(SUBSCRIPTION);
        let repo = repository(&mock, &ValidatorConfig::default());
        let later = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();

        let outcome = repo
            .validate(
                &payload(),
                &VerificationRequest::Subscription {
                    shared_secret: None,
                    exclude_old_transactions: false,
                    now: later,
                },
            )
            .await
            .unwrap();

        match outcome {
            ValidationOutcome::Subscription(validated) => {
                assert!(!validated.has_active_subscription());
                assert_eq!(validated.pending_renewal_info.len(), 1);
            }
            other => panic!("expected subscription outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn bundle_mismatch_is_rejected() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(PURCHASE_123);
        let config = ValidatorConfig {
            expected_bundle_id: Some("com.example.other".to_owned()),
            ..ValidatorConfig::default()
        };
        let repo = repository(&mock, &config);

        assert!(matches!(
            repo.validate_purchase(&payload(), "123", None).await,
            Err(ReceiptValidationError::BundleIdNotMatching { .. })
        ));
    }

    #[tokio::test]
    async fn fetch_returns_raw_response_without_status_gate() {
        let mock = MockVerifyReceiptDatasource::default();
        mock.respond(r#"{"status":21150,"is-retryable":true}"#);
        let repo = repository(&mock, &ValidatorConfig::default());

        let response = repo.fetch(&payload(), None, Some(false)).await.unwrap();

        assert_eq!(response.status, 21150);
        assert_eq!(response.is_retryable, Some(true));
        assert_eq!(response.environment, Environment::Production);
        assert!(response.bundle_id.is_none());
    }
}
