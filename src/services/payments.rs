// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stripe payment-intent client and the server-side price catalog.
//!
//! Handles:
//! - Payment-intent creation for card charges
//! - Trusted price resolution by treatment name
//! - Processor outage detection (429/5xx vs. request errors)

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    /// Create a new Stripe client with an API secret key.
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: STRIPE_API_BASE.to_string(),
            secret_key,
        }
    }

    /// Create a client against a different API base URL.
    ///
    /// This is intended for tests against a local stub.
    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            secret_key,
        }
    }

    /// Create a payment intent for a card charge.
    ///
    /// The amount is in minor units (cents) and must come from a trusted
    /// source; callers resolve it through the price catalog, never from
    /// client input.
    pub async fn create_payment_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
    ) -> Result<PaymentIntent, AppError> {
        if amount_minor_units <= 0 {
            return Err(AppError::InvalidAmount(format!(
                "Amount must be positive, got {}",
                amount_minor_units
            )));
        }

        let url = format!("{}/payment_intents", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount_minor_units.to_string()),
                ("currency", currency.to_string()),
                ("payment_method_types[]", "card".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ProcessorUnavailable(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and parse the payment intent.
    async fn check_response_json(
        &self,
        response: reqwest::Response,
    ) -> Result<PaymentIntent, AppError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            // Rate limits and server faults are outages, not caller mistakes
            if status.as_u16() == 429 || status.is_server_error() {
                tracing::warn!(status = %status, "Stripe request failed upstream");
                return Err(AppError::ProcessorUnavailable(format!(
                    "HTTP {}: {}",
                    status, body
                )));
            }

            // Other 4xx: the charge request itself was unacceptable.
            // Relay Stripe's own message where one is present.
            let message =
                parse_stripe_error(&body).unwrap_or_else(|| format!("HTTP {}", status));
            return Err(AppError::InvalidAmount(message));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ProcessorUnavailable(format!("JSON parse error: {}", e)))
    }
}

/// Extract the human-readable message from a Stripe error body.
fn parse_stripe_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct StripeErrorBody {
        error: StripeErrorDetail,
    }

    #[derive(Deserialize)]
    struct StripeErrorDetail {
        message: Option<String>,
    }

    serde_json::from_str::<StripeErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
}

/// Payment intent relayed to the client for confirmation.
///
/// Stripe returns many more fields; these are the ones the frontend needs
/// (client_secret drives the card-confirmation flow).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

/// Server-side source of truth for treatment prices (minor units).
///
/// The client may echo a price for display reconciliation, but the billed
/// amount always comes from here, keyed by the appointment's service name.
#[derive(Debug, Clone)]
pub struct PriceCatalog {
    prices: HashMap<String, i64>,
}

impl Default for PriceCatalog {
    fn default() -> Self {
        Self::with_prices([
            ("Teeth Orthodontics", 12_000),
            ("Cosmetic Dentistry", 9_500),
            ("Teeth Cleaning", 6_000),
            ("Cavity Protection", 4_500),
            ("Pediatric Dental", 5_500),
            ("Oral Surgery", 15_000),
        ])
    }
}

impl PriceCatalog {
    /// Build a catalog from (service, minor-units) pairs.
    pub fn with_prices<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            prices: prices
                .into_iter()
                .map(|(name, amount)| (name.into(), amount))
                .collect(),
        }
    }

    /// Price in minor units for a service, if the catalog knows it.
    ///
    /// Lookup is by exact service name; an unknown service has no trusted
    /// price and therefore cannot be billed.
    pub fn price_for(&self, service: &str) -> Option<i64> {
        self.prices.get(service).copied()
    }

    /// Number of priced services.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
