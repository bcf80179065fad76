//! Card payment gateway seam.
//!
//! The server only ever creates intents and re-reads their status. Card
//! details are collected and confirmed by the gateway's client-side SDK.

pub mod mock;
pub mod stripe;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub use mock::MockGateway;
pub use stripe::StripeGateway;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: CreateIntent,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateIntent {
    pub amount_minor: i64,
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub status: IntentStatus,
    pub amount: i64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Gateway unreachable: {0}")]
    Transport(String),
    #[error("Gateway rejected request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Unexpected gateway response: {0}")]
    Decode(String),
    #[error("No such payment intent: {0}")]
    UnknownIntent(String),
    #[error("Amount cannot be expressed in minor units: {0}")]
    InvalidAmount(Decimal),
}

/// Major currency units to the gateway's minor units (x100), half away from zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_i64())
        .ok_or(GatewayError::InvalidAmount(amount))
}

static INTENT_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^pi_[A-Za-z0-9_]{1,128}$").unwrap());

/// Intent ids are `pi_` followed by letters, digits and underscores. Anything
/// else never reaches a gateway URL.
pub fn is_intent_id(id: &str) -> bool {
    INTENT_ID_REGEX.is_match(id)
}
