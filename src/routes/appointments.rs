// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Appointment endpoints: listing, lookup, booking, and payment attach.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::RequestIdentity;
use crate::models::{Appointment, AppointmentCandidate, PaymentRecord};
use crate::routes::WriteAck;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/appointments",
            get(list_appointments).post(book_appointment),
        )
        .route(
            "/appointments/{id}",
            get(get_appointment).put(attach_payment),
        )
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListAppointmentsQuery {
    email: Option<String>,
    date: Option<String>,
}

/// List a patient's appointments for one calendar date.
///
/// Identity is optional, but when a verified identity is present it must
/// match the queried email; anonymous requests are served as-is.
async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<RequestIdentity>,
    Query(params): Query<ListAppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>> {
    let email = params.email.ok_or(AppError::MissingField("email"))?;
    let date = params.date.ok_or(AppError::MissingField("date"))?;

    if let Some(verified) = identity.email() {
        if !verified.eq_ignore_ascii_case(&email) {
            tracing::warn!(
                queried_email = %email,
                "Verified identity does not match queried email"
            );
            return Err(AppError::Forbidden);
        }
    }

    let appointments = state.db.list_appointments(&email, &date).await?;
    Ok(Json(appointments))
}

/// Fetch one appointment by id, or `null` when it does not exist.
async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Appointment>>> {
    let appointment = state.db.get_appointment(&id).await?;
    Ok(Json(appointment))
}

// ─── Booking ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
struct BookAppointmentRequest {
    #[validate(email)]
    patient_email: Option<String>,
    patient_name: Option<String>,
    service: Option<String>,
    date: Option<String>,
    time_slot: Option<String>,
    doctor_id: Option<String>,
}

/// Book an appointment, claiming its slot atomically.
async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookAppointmentRequest>,
) -> Result<Json<WriteAck>> {
    req.validate()
        .map_err(|_| AppError::BadRequest("Invalid email address".to_string()))?;

    let candidate = AppointmentCandidate {
        patient_email: req
            .patient_email
            .ok_or(AppError::MissingField("patient_email"))?,
        patient_name: req.patient_name,
        service: req.service.ok_or(AppError::MissingField("service"))?,
        date: req.date.ok_or(AppError::MissingField("date"))?,
        time_slot: req.time_slot.ok_or(AppError::MissingField("time_slot"))?,
        doctor_id: req.doctor_id.filter(|d| !d.trim().is_empty()),
    };

    let appointment = state.db.book_appointment(candidate).await?;

    Ok(Json(WriteAck {
        acknowledged: true,
        id: appointment.id,
    }))
}

// ─── Payment Attach ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AttachPaymentRequest {
    transaction_id: Option<String>,
    amount_minor_units: Option<i64>,
    method: Option<String>,
}

/// Attach a confirmed payment to an appointment.
///
/// Replays of the same transaction id succeed without rewriting; a
/// different transaction id against an already-paid appointment is
/// rejected.
async fn attach_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AttachPaymentRequest>,
) -> Result<Json<WriteAck>> {
    let transaction_id = req
        .transaction_id
        .ok_or(AppError::MissingField("transaction_id"))?;

    let record = PaymentRecord {
        transaction_id,
        amount_minor_units: req.amount_minor_units,
        method: req.method,
        recorded_at: chrono::Utc::now().to_rfc3339(),
    };

    let appointment = state.db.attach_payment(&id, record).await?;

    Ok(Json(WriteAck {
        acknowledged: true,
        id: appointment.id,
    }))
}
