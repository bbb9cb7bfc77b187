// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User endpoints: profile upsert, promotion, and role lookup.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::RequestIdentity;
use crate::routes::WriteAck;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(upsert_user).put(upsert_user))
        .route("/users/admin", put(promote_admin))
        .route("/users/{email}", get(get_admin_status))
}

// ─── Profile Upsert ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
struct UpsertUserRequest {
    #[validate(email)]
    email: Option<String>,
    display_name: Option<String>,
}

/// Create or refresh a user profile on sign-in.
///
/// The stored role is never touched here; promotion is the only path
/// that changes it.
async fn upsert_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpsertUserRequest>,
) -> Result<Json<WriteAck>> {
    req.validate()
        .map_err(|_| AppError::BadRequest("Invalid email address".to_string()))?;
    let email = req.email.ok_or(AppError::MissingField("email"))?;

    let user = state.db.upsert_user(&email, req.display_name).await?;

    Ok(Json(WriteAck {
        acknowledged: true,
        id: user.email,
    }))
}

// ─── Promotion ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PromoteRequest {
    email: Option<String>,
}

/// Promote a user to admin.
///
/// An unverified requester is turned away before the body is examined,
/// so a missing token never reads as a validation problem.
async fn promote_admin(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<RequestIdentity>,
    Json(req): Json<PromoteRequest>,
) -> Result<Json<WriteAck>> {
    if identity.0.is_none() {
        return Err(AppError::RequesterUnknown);
    }

    let target = req.email.ok_or(AppError::MissingField("email"))?;

    let promoted = state.db.promote_user(&target, identity.email()).await?;

    Ok(Json(WriteAck {
        acknowledged: true,
        id: promoted.email,
    }))
}

// ─── Role Lookup ─────────────────────────────────────────────

/// Admin flag for an email.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdminStatusResponse {
    pub admin: bool,
}

/// Report whether an email belongs to an admin. Unknown emails are
/// plain patients.
async fn get_admin_status(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<AdminStatusResponse>> {
    let role = state.db.get_role(&email).await?;

    Ok(Json(AdminStatusResponse {
        admin: role.is_admin(),
    }))
}
