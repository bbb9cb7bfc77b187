// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Doctor upload and listing tests.
//!
//! Uploads are multipart/form-data; the image field is raw bytes and
//! must survive storage byte-for-byte, with base64 only on the wire.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tower::ServiceExt;

mod common;

const BOUNDARY: &str = "careslot-test-boundary";

fn push_text_part(body: &mut Vec<u8>, name: &str, value: &str) {
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        )
        .as_bytes(),
    );
}

fn push_file_part(body: &mut Vec<u8>, name: &str, bytes: &[u8]) {
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"photo.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, name
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
}

fn doctor_upload_request(
    name: Option<&str>,
    email: Option<&str>,
    image: Option<&[u8]>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    if let Some(name) = name {
        push_text_part(&mut body, "name", name);
    }
    if let Some(email) = email {
        push_text_part(&mut body, "email", email);
    }
    if let Some(image) = image {
        push_file_part(&mut body, "image", image);
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/doctors")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
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
async fn test_upload_missing_image() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(doctor_upload_request(
            Some("Dr. Strange"),
            Some("strange@test.example"),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(response).await, "missing_field");
}

#[tokio::test]
async fn test_upload_missing_name() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(doctor_upload_request(
            None,
            Some("anon@test.example"),
            Some(b"fake image bytes"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(response).await, "missing_field");
}

#[tokio::test]
async fn test_complete_upload_reaches_db() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(doctor_upload_request(
            Some("Dr. Offline"),
            Some("offline@test.example"),
            Some(b"fake image bytes"),
        ))
        .await
        .unwrap();

    // Multipart parsing succeeded; the offline DB write fails
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ═══════════════════════════════════════════════════════════════════════════
// EMULATOR-BACKED ROUND-TRIP
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_image_bytes_survive_round_trip() {
    require_emulator!();

    let db = common::test_db().await;
    let (app, _) = common::create_test_app_with_db(db);

    // PNG signature plus bytes that are not valid UTF-8
    let image: Vec<u8> = vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0xFF, 0xFE, 0x80, 0x7F, 0x00,
    ];

    let response = app
        .clone()
        .oneshot(doctor_upload_request(
            Some("Dr. Roundtrip"),
            Some("roundtrip@test.example"),
            Some(&image),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .unwrap();
    let ack: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let doctor_id = ack["id"].as_str().unwrap().to_string();

    // Fetch the listing and find the uploaded profile
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/doctors")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let doctors: serde_json::Value = serde_json::from_slice(&body).unwrap();

    let entry = doctors
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"] == doctor_id.as_str())
        .expect("uploaded doctor should appear in the listing");

    let decoded = STANDARD
        .decode(entry["image"].as_str().unwrap())
        .expect("image field should be valid base64");
    assert_eq!(decoded, image, "stored bytes must match the upload exactly");

    println!("✓ Doctor image round-tripped byte-for-byte: {}", doctor_id);
}
