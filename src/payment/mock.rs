use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::{CreateIntent, GatewayError, IntentStatus, PaymentGateway, PaymentIntent};

/// In-process gateway for local development and tests.
///
/// Intents start in `requires_payment_method`; [`MockGateway::confirm_card_payment`]
/// plays the part of the client-side SDK.
#[derive(Debug, Default)]
pub struct MockGateway {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    created: Mutex<Vec<CreateIntent>>,
    unavailable: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails as if the gateway were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Client-side confirmation: the card is charged or declined.
    pub async fn confirm_card_payment(
        &self,
        client_secret: &str,
        approve: bool,
    ) -> Result<PaymentIntent, GatewayError> {
        let mut intents = self.intents.lock().await;
        let intent = intents
            .values_mut()
            .find(|intent| intent.client_secret.as_deref() == Some(client_secret))
            .ok_or_else(|| GatewayError::UnknownIntent(client_secret.to_owned()))?;

        intent.status = if approve {
            IntentStatus::Succeeded
        } else {
            IntentStatus::RequiresPaymentMethod
        };
        Ok(intent.clone())
    }

    pub async fn set_status(&self, id: &str, status: IntentStatus) -> Result<(), GatewayError> {
        let mut intents = self.intents.lock().await;
        let intent = intents
            .get_mut(id)
            .ok_or_else(|| GatewayError::UnknownIntent(id.to_owned()))?;
        intent.status = status;
        Ok(())
    }

    /// Every creation request received, oldest first.
    pub async fn created_requests(&self) -> Vec<CreateIntent> {
        self.created.lock().await.clone()
    }

    fn check_available(&self) -> Result<(), GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("mock gateway unavailable".to_owned()));
        }
        Ok(())
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment_intent(
        &self,
        request: CreateIntent,
    ) -> Result<PaymentIntent, GatewayError> {
        self.check_available()?;
        if request.amount_minor <= 0 {
            return Err(GatewayError::Api {
                status: 400,
                message: "Amount must be at least 1".to_owned(),
            });
        }

        let id = format!("pi_mock_{}", random_token(16));
        let intent = PaymentIntent {
            client_secret: Some(format!("{}_secret_{}", id, random_token(24))),
            id: id.clone(),
            status: IntentStatus::RequiresPaymentMethod,
            amount: request.amount_minor,
            metadata: request.metadata.clone(),
        };

        self.created.lock().await.push(request);
        self.intents.lock().await.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        self.check_available()?;
        self.intents
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownIntent(id.to_owned()))
    }
}
