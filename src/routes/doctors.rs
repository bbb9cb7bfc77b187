// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Doctor directory endpoints: multipart profile upload and listing.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::routes::WriteAck;
use crate::AppState;

/// Profile images routinely exceed axum's 2 MB default body cap.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/doctors", get(list_doctors).post(add_doctor))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Doctor profile on the wire, image delivered as base64 text.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DoctorResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Base64 of the stored image bytes.
    pub image: String,
    pub created_at: String,
}

/// Add a doctor profile from a multipart form (`name`, `email`, `image`).
async fn add_doctor(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<WriteAck>> {
    let mut name: Option<String> = None;
    let mut email: Option<String> = None;
    let mut image: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => {
                name = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Invalid name field: {}", e))
                })?);
            }
            "email" => {
                email = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Invalid email field: {}", e))
                })?);
            }
            "image" => {
                image = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| {
                            AppError::BadRequest(format!("Invalid image field: {}", e))
                        })?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    let name = name.ok_or(AppError::MissingField("name"))?;
    let email = email.ok_or(AppError::MissingField("email"))?;
    let image = image.ok_or(AppError::MissingField("image"))?;

    let doctor = state.db.add_doctor(name, email, image).await?;

    Ok(Json(WriteAck {
        acknowledged: true,
        id: doctor.id,
    }))
}

/// List all doctor profiles.
async fn list_doctors(State(state): State<Arc<AppState>>) -> Result<Json<Vec<DoctorResponse>>> {
    let doctors = state.db.list_doctors().await?;

    let response = doctors
        .into_iter()
        .map(|doctor| DoctorResponse {
            id: doctor.id,
            name: doctor.name,
            email: doctor.email,
            image: STANDARD.encode(&doctor.image),
            created_at: doctor.created_at,
        })
        .collect();

    Ok(Json(response))
}
