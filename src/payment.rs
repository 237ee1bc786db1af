use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::directory::UserProfile;
use crate::core::app_error::AppError;

const GATEWAY: &str = "PaymentGateway";

/// Client for the external payment provider. Customer records live on the
/// provider's side, tagged with our user id; we persist nothing but the
/// identifiers needed to reference them.
#[derive(Debug, Clone)]
pub struct PaymentGateway {
    http: Client,
    base_url: String,
    secret_key: String,
    currency: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GatewayCustomer {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct GatewayPaymentMethod {
    pub id: String,
    /// Provider-computed stable hash of the physical card; the dedup key.
    pub fingerprint: String,
    pub brand: Option<String>,
    pub last4: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CollectionRes<T> {
    data: Vec<T>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct SetupIntent {
    pub client_secret: String,
}

#[derive(Deserialize, Debug)]
pub struct IntentRes {
    pub id: String,
    pub status: String,
    pub last_payment_error: Option<IntentError>,
}

#[derive(Deserialize, Debug)]
pub struct IntentError {
    pub message: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CardDetails {
    pub number: String,
    pub exp_month: u32,
    pub exp_year: i32,
    pub cvc: String,
}

impl CardDetails {
    pub fn validate(&self) -> Result<(), AppError> {
        let digits = self.number.chars().all(|c| c.is_ascii_digit());
        if !digits || !(12..=19).contains(&self.number.len()) {
            return Err(AppError::BadRequest("Invalid card number".into()));
        }
        if !(1..=12).contains(&self.exp_month) {
            return Err(AppError::BadRequest("Invalid expiry month".into()));
        }
        let now = Utc::now();
        let expired = self.exp_year < now.year()
            || (self.exp_year == now.year() && self.exp_month < now.month());
        if expired {
            return Err(AppError::BadRequest("Card is expired".into()));
        }
        if !(3..=4).contains(&self.cvc.len()) || !self.cvc.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::BadRequest("Invalid CVC".into()));
        }
        Ok(())
    }
}

#[derive(Serialize, Debug, PartialEq, Eq, Clone, Copy, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    Ok,
    Error,
}

/// Uniform charge result. Gateway-side failures of any shape (transport,
/// decline, authentication) end up here rather than as errors.
#[derive(Serialize, Debug, ToSchema)]
pub struct ChargeOutcome {
    pub status: ChargeStatus,
    pub reference: Option<String>,
    pub message: Option<String>,
}

impl ChargeOutcome {
    fn ok(reference: String) -> Self {
        Self {
            status: ChargeStatus::Ok,
            reference: Some(reference),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: ChargeStatus::Error,
            reference: None,
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ChargeStatus::Ok
    }

    fn from_intent(intent: IntentRes) -> Self {
        match intent.status.as_str() {
            "succeeded" | "processing" => ChargeOutcome::ok(intent.id),
            status => {
                let message = intent
                    .last_payment_error
                    .and_then(|err| err.message)
                    .unwrap_or_else(|| format!("Charge was declined ({status})"));
                ChargeOutcome::error(message)
            }
        }
    }
}

impl PaymentGateway {
    pub fn from_env() -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build payment gateway HTTP client")?;

        Ok(Self {
            http,
            base_url: std::env::var("PAYMENT_GATEWAY_URL")
                .unwrap_or_else(|_| "http://localhost:4242/v1".to_string()),
            secret_key: std::env::var("PAYMENT_GATEWAY_SECRET")
                .unwrap_or_else(|_| "sk_test_dev".to_string()),
            currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
    }

    /// Look up the provider customer tagged with our user id. Absence and
    /// lookup failure are the same thing to callers: `None`.
    pub async fn resolve_customer(&self, user_id: i32) -> Option<GatewayCustomer> {
        let response = self
            .request(Method::GET, "customers/search")
            .query(&[("tag", user_id.to_string())])
            .send()
            .await
            .ok()?;
        let found: CollectionRes<GatewayCustomer> = response.json().await.ok()?;
        found.data.into_iter().next()
    }

    pub async fn provision_customer(
        &self,
        user_id: i32,
        profile: &UserProfile,
    ) -> Result<GatewayCustomer, AppError> {
        let response = self
            .request(Method::POST, "customers")
            .json(&serde_json::json!({
                "name": profile.display_name,
                "phone": profile.phone,
                "email": profile.email,
                "tag": user_id.to_string(),
            }))
            .send()
            .await
            .map_err(|_| AppError::ServiceUnreachable(GATEWAY.into()))?;

        if !response.status().is_success() {
            return Err(AppError::Other(anyhow::anyhow!(
                "Payment gateway returned {} creating a customer",
                response.status()
            )));
        }
        let customer = response
            .json()
            .await
            .context("Failed to parse customer JSON")?;
        Ok(customer)
    }

    /// One-time token the client uses to register a card directly with the
    /// gateway.
    pub async fn create_setup_intent(&self, customer_id: &str) -> Result<SetupIntent, AppError> {
        let response = self
            .request(Method::POST, "setup_intents")
            .json(&serde_json::json!({ "customer": customer_id }))
            .send()
            .await
            .map_err(|_| AppError::ServiceUnreachable(GATEWAY.into()))?;

        if !response.status().is_success() {
            return Err(AppError::Other(anyhow::anyhow!(
                "Payment gateway returned {} creating a setup intent",
                response.status()
            )));
        }
        let intent = response
            .json()
            .await
            .context("Failed to parse setup intent JSON")?;
        Ok(intent)
    }

    pub async fn register_card(
        &self,
        card: &CardDetails,
    ) -> Result<GatewayPaymentMethod, AppError> {
        let response = self
            .request(Method::POST, "payment_methods")
            .json(&serde_json::json!({
                "type": "card",
                "number": card.number,
                "exp_month": card.exp_month,
                "exp_year": card.exp_year,
                "cvc": card.cvc,
            }))
            .send()
            .await
            .map_err(|_| AppError::ServiceUnreachable(GATEWAY.into()))?;

        if !response.status().is_success() {
            return Err(AppError::BadRequest(
                "Card was rejected by the payment gateway".into(),
            ));
        }
        let method = response
            .json()
            .await
            .context("Failed to parse payment method JSON")?;
        Ok(method)
    }

    pub async fn list_cards(
        &self,
        customer_id: &str,
    ) -> Result<Vec<GatewayPaymentMethod>, AppError> {
        let response = self
            .request(Method::GET, &format!("customers/{customer_id}/payment_methods"))
            .send()
            .await
            .map_err(|_| AppError::ServiceUnreachable(GATEWAY.into()))?;
        let found: CollectionRes<GatewayPaymentMethod> = response
            .json()
            .await
            .context("Failed to parse payment methods JSON")?;
        Ok(found.data)
    }

    /// Attach a tokenized card to a customer. Two tokens for the same
    /// physical card share a fingerprint; a match against an already-attached
    /// instrument is a conflict, not a second attach.
    pub async fn attach_card(
        &self,
        customer_id: &str,
        method: &GatewayPaymentMethod,
    ) -> Result<(), AppError> {
        let attached = self.list_cards(customer_id).await?;
        if attached
            .iter()
            .any(|existing| existing.fingerprint == method.fingerprint)
        {
            return Err(AppError::Conflict(
                "Card is already attached to this customer".into(),
            ));
        }

        let response = self
            .request(Method::POST, &format!("payment_methods/{}/attach", method.id))
            .json(&serde_json::json!({ "customer": customer_id }))
            .send()
            .await
            .map_err(|_| AppError::ServiceUnreachable(GATEWAY.into()))?;

        if !response.status().is_success() {
            return Err(AppError::Other(anyhow::anyhow!(
                "Payment gateway returned {} attaching a card",
                response.status()
            )));
        }
        Ok(())
    }

    /// Off-session confirmed charge. Never returns an error: every failure
    /// shape collapses into an error outcome so the caller makes one uniform
    /// pass/fail decision.
    pub async fn charge(
        &self,
        customer_id: &str,
        payment_method: &str,
        amount: f32,
    ) -> ChargeOutcome {
        let minor_units = (amount * 100.0).round() as i64;
        let response = self
            .request(Method::POST, "payment_intents")
            .json(&serde_json::json!({
                "amount": minor_units,
                "currency": self.currency,
                "customer": customer_id,
                "payment_method": payment_method,
                "off_session": true,
                "confirm": true,
            }))
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(_) => return ChargeOutcome::error("Payment gateway is unreachable"),
        };

        match response.json::<IntentRes>().await {
            Ok(intent) => ChargeOutcome::from_intent(intent),
            Err(_) => ChargeOutcome::error("Payment gateway returned an unreadable response"),
        }
    }

    /// Best-effort: a failure is reported to the caller but no local state
    /// depends on it.
    pub async fn detach_card(&self, method_id: &str) -> Result<(), AppError> {
        let response = self
            .request(Method::POST, &format!("payment_methods/{method_id}/detach"))
            .send()
            .await
            .map_err(|_| AppError::ServiceUnreachable(GATEWAY.into()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound);
        }
        if !response.status().is_success() {
            return Err(AppError::Other(anyhow::anyhow!(
                "Payment gateway returned {} detaching a card",
                response.status()
            )));
        }
        Ok(())
    }

    pub async fn delete_customer(&self, customer_id: &str) -> Result<(), AppError> {
        let response = self
            .request(Method::DELETE, &format!("customers/{customer_id}"))
            .send()
            .await
            .map_err(|_| AppError::ServiceUnreachable(GATEWAY.into()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound);
        }
        if !response.status().is_success() {
            return Err(AppError::Other(anyhow::anyhow!(
                "Payment gateway returned {} deleting a customer",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> CardDetails {
        CardDetails {
            number: "4242424242424242".into(),
            exp_month: 12,
            exp_year: 2099,
            cvc: "314".into(),
        }
    }

    #[test]
    fn valid_card_passes_validation() {
        assert!(card().validate().is_ok());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut short = card();
        short.number = "42424242".into();
        assert!(short.validate().is_err());

        let mut alpha = card();
        alpha.number = "4242abcd42424242".into();
        assert!(alpha.validate().is_err());
    }

    #[test]
    fn expired_cards_are_rejected() {
        let mut expired = card();
        expired.exp_year = 2020;
        assert!(expired.validate().is_err());

        let mut bad_month = card();
        bad_month.exp_month = 13;
        assert!(bad_month.validate().is_err());
    }

    #[test]
    fn bad_cvc_is_rejected() {
        let mut bad = card();
        bad.cvc = "12".into();
        assert!(bad.validate().is_err());

        bad.cvc = "12a".into();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn succeeded_intent_maps_to_ok_outcome() {
        let outcome = ChargeOutcome::from_intent(IntentRes {
            id: "pi_123".into(),
            status: "succeeded".into(),
            last_payment_error: None,
        });
        assert!(outcome.is_ok());
        assert_eq!(outcome.reference.as_deref(), Some("pi_123"));
    }

    #[test]
    fn declined_intent_carries_the_gateway_message() {
        let outcome = ChargeOutcome::from_intent(IntentRes {
            id: "pi_456".into(),
            status: "requires_payment_method".into(),
            last_payment_error: Some(IntentError {
                message: Some("Your card has insufficient funds.".into()),
            }),
        });
        assert!(!outcome.is_ok());
        assert_eq!(
            outcome.message.as_deref(),
            Some("Your card has insufficient funds.")
        );
    }

    #[test]
    fn declined_intent_without_detail_gets_a_generic_message() {
        let outcome = ChargeOutcome::from_intent(IntentRes {
            id: "pi_789".into(),
            status: "canceled".into(),
            last_payment_error: None,
        });
        assert_eq!(
            outcome.message.as_deref(),
            Some("Charge was declined (canceled)")
        );
    }
}
