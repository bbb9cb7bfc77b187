// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment intent endpoint tests.
//!
//! The Stripe client in the test app points at an unroutable address,
//! so flows that get as far as the processor surface its unavailability
//! instead of calling out.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use careslot::models::AppointmentCandidate;
use serde_json::json;
use tower::ServiceExt;

mod common;

fn unique_suffix() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

fn intent_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/create-payment-intent")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn error_kind(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    json["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_intent_requires_appointment_id() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(intent_request(json!({ "price": 6000 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(response).await, "missing_field");
}

#[tokio::test]
async fn test_intent_looks_up_appointment() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(intent_request(json!({ "appointment_id": "whatever" })))
        .await
        .unwrap();

    // Offline DB: the appointment lookup fails before any Stripe call
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ═══════════════════════════════════════════════════════════════════════════
// EMULATOR-BACKED INTENT FLOWS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_unknown_appointment_is_not_found() {
    require_emulator!();

    let db = common::test_db().await;
    let (app, _) = common::create_test_app_with_db(db);

    let response = app
        .oneshot(intent_request(
            json!({ "appointment_id": format!("missing-{}", unique_suffix()) }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_kind(response).await, "not_found");
}

#[tokio::test]
async fn test_unpriced_service_cannot_be_billed() {
    require_emulator!();

    let db = common::test_db().await;
    let suffix = unique_suffix();

    let appointment = db
        .book_appointment(AppointmentCandidate {
            patient_email: format!("payer-{}@test.example", suffix),
            patient_name: None,
            service: "Experimental Procedure".to_string(),
            date: "2024-06-01".to_string(),
            time_slot: "09:00-09:30".to_string(),
            doctor_id: Some(format!("doc-{}", suffix)),
        })
        .await
        .unwrap();

    let (app, _) = common::create_test_app_with_db(db);

    let response = app
        .oneshot(intent_request(json!({ "appointment_id": appointment.id })))
        .await
        .unwrap();

    // No catalog price for the service: nothing trustworthy to bill
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(response).await, "invalid_amount");
}

#[tokio::test]
async fn test_processor_outage_surfaces_as_bad_gateway() {
    require_emulator!();

    let db = common::test_db().await;
    let suffix = unique_suffix();

    let appointment = db
        .book_appointment(AppointmentCandidate {
            patient_email: format!("payer-{}@test.example", suffix),
            patient_name: None,
            service: "Teeth Cleaning".to_string(),
            date: "2024-06-01".to_string(),
            time_slot: "11:00-11:30".to_string(),
            doctor_id: Some(format!("doc-{}", suffix)),
        })
        .await
        .unwrap();

    let (app, _) = common::create_test_app_with_db(db);

    // Catalog resolves the price, then the unroutable Stripe endpoint fails
    let response = app
        .oneshot(intent_request(json!({ "appointment_id": appointment.id })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(error_kind(response).await, "processor_unavailable");
}
