// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment intent endpoint bridging appointments to the processor.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::services::PaymentIntent;
use crate::AppState;

const CURRENCY: &str = "usd";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/create-payment-intent", post(create_payment_intent))
}

#[derive(Debug, Deserialize)]
struct CreatePaymentIntentRequest {
    appointment_id: Option<String>,
    /// Client-side display price in minor units. Compared against the
    /// catalog for reconciliation, never billed.
    price: Option<i64>,
}

/// Intent wrapper under the key the checkout frontend expects.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PaymentIntentResponse {
    #[serde(rename = "paymentIntent")]
    pub payment_intent: PaymentIntent,
}

/// Create a payment intent for an appointment.
///
/// The billed amount always comes from the server-side price catalog,
/// keyed by the appointment's service. Client-submitted prices are
/// logged when they disagree and otherwise ignored.
async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>> {
    let appointment_id = req
        .appointment_id
        .ok_or(AppError::MissingField("appointment_id"))?;

    let appointment = state
        .db
        .get_appointment(&appointment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", appointment_id)))?;

    let amount = state
        .price_catalog
        .price_for(&appointment.service)
        .ok_or_else(|| {
            AppError::InvalidAmount(format!(
                "No price on record for service '{}'",
                appointment.service
            ))
        })?;

    if let Some(client_price) = req.price {
        if client_price != amount {
            tracing::warn!(
                appointment_id = %appointment.id,
                service = %appointment.service,
                client_price,
                catalog_price = amount,
                "Client price disagrees with catalog, billing catalog price"
            );
        }
    }

    let intent = state.stripe.create_payment_intent(amount, CURRENCY).await?;

    tracing::info!(
        appointment_id = %appointment.id,
        intent_id = %intent.id,
        amount,
        "Payment intent created"
    );

    Ok(Json(PaymentIntentResponse {
        payment_intent: intent,
    }))
}
