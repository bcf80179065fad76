use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use std::time::Duration;

use super::{is_intent_id, CreateIntent, GatewayError, PaymentGateway, PaymentIntent};

/// Talks to the Stripe REST API (`/v1/payment_intents`).
#[derive(Clone, Debug)]
pub struct StripeGateway {
    client: Client,
    api_base: Url,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(api_base: &str, secret_key: &str) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let api_base = Url::parse(api_base)
            .map_err(|err| GatewayError::Transport(format!("Invalid API base `{api_base}`: {err}")))?;
        if api_base.cannot_be_a_base() {
            return Err(GatewayError::Transport(format!(
                "Invalid API base `{api_base}`"
            )));
        }

        Ok(Self {
            client,
            api_base,
            secret_key: secret_key.to_owned(),
        })
    }

    /// Appends path segments to the API base. Each segment is percent-encoded,
    /// so a `/` inside one can never climb out of the resource path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport("API base cannot carry a path".to_owned()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_intent(response: Response) -> Result<PaymentIntent, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<PaymentIntent>()
                .await
                .map_err(|err| GatewayError::Decode(err.to_string()));
        }

        let message = response
            .json::<StripeErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| status.to_string());
        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        request: CreateIntent,
    ) -> Result<PaymentIntent, GatewayError> {
        let mut form = vec![
            ("amount".to_owned(), request.amount_minor.to_string()),
            ("currency".to_owned(), request.currency),
        ];
        form.extend(
            request
                .metadata
                .into_iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value)),
        );

        let response = self
            .client
            .post(self.endpoint(&["v1", "payment_intents"])?)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        Self::read_intent(response).await
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        if !is_intent_id(id) {
            return Err(GatewayError::UnknownIntent(id.to_owned()));
        }

        let response = self
            .client
            .get(self.endpoint(&["v1", "payment_intents", id])?)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::UnknownIntent(id.to_owned()));
        }
        Self::read_intent(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::IntentStatus;
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn creates_intent_with_form_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_string_contains("amount=49999"))
            .and(body_string_contains("currency=inr"))
            .and(body_string_contains("metadata%5BorderId%5D=order-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_1",
                "client_secret": "pi_1_secret_abc",
                "status": "requires_payment_method",
                "amount": 49999,
                "metadata": { "orderId": "order-1" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(&server.uri(), "sk_test_123").unwrap();
        let mut metadata = BTreeMap::new();
        metadata.insert("orderId".to_owned(), "order-1".to_owned());
        let intent = gateway
            .create_payment_intent(CreateIntent {
                amount_minor: 49999,
                currency: "inr".to_owned(),
                metadata,
            })
            .await
            .unwrap();

        assert_eq!(intent.client_secret.as_deref(), Some("pi_1_secret_abc"));
        assert_eq!(intent.status, IntentStatus::RequiresPaymentMethod);
    }

    #[tokio::test]
    async fn surfaces_gateway_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": { "message": "Your card was declined." }
            })))
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(&server.uri(), "sk_test_123").unwrap();
        let err = gateway
            .create_payment_intent(CreateIntent {
                amount_minor: 100,
                currency: "inr".to_owned(),
                metadata: BTreeMap::new(),
            })
            .await
            .unwrap_err();

        match err {
            GatewayError::Api { status, message } => {
                assert_eq!(status, 402);
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn retrieves_intent_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_9",
                "status": "succeeded",
                "amount": 2500
            })))
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(&server.uri(), "sk_test_123").unwrap();
        let intent = gateway.retrieve_payment_intent("pi_9").await.unwrap();
        assert_eq!(intent.status, IntentStatus::Succeeded);
        assert!(intent.metadata.is_empty());
    }

    #[tokio::test]
    async fn missing_intent_maps_to_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(&server.uri(), "sk_test_123").unwrap();
        let err = gateway.retrieve_payment_intent("pi_missing").await.unwrap_err();
        assert!(matches!(err, GatewayError::UnknownIntent(_)));
    }

    #[tokio::test]
    async fn intent_id_cannot_leave_the_intents_resource() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/charges/ch_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ch_1",
                "status": "succeeded",
                "amount": 100
            })))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = StripeGateway::new(&server.uri(), "sk_test_123").unwrap();
        for id in ["../charges/ch_1", "pi_1/../../charges/ch_1", "ch_1"] {
            let err = gateway.retrieve_payment_intent(id).await.unwrap_err();
            assert!(matches!(err, GatewayError::UnknownIntent(_)), "{id}");
        }
    }

    #[test]
    fn endpoint_encodes_each_segment() {
        let gateway = StripeGateway::new("https://api.stripe.test/", "sk_test_123").unwrap();
        let url = gateway
            .endpoint(&["v1", "payment_intents", "../charges/ch_1"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.stripe.test/v1/payment_intents/..%2Fcharges%2Fch_1"
        );
    }
}
