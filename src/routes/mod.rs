// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP routing: route tables, CORS policy, and the middleware stack.

pub mod appointments;
pub mod doctors;
pub mod payments;
pub mod users;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::{middleware, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::middleware::{attach_identity, security};
use crate::AppState;

/// Acknowledgement body for write endpoints, carrying the id of the
/// record that was written.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WriteAck {
    pub acknowledged: bool,
    pub id: String,
}

/// Plain-text liveness probe for load balancers and uptime checks.
async fn liveness() -> &'static str {
    "CareSlot API is running"
}

/// Build the application router with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    let frontend_url = state.config.frontend_url.clone();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request_parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    Router::new()
        .route("/", get(liveness))
        .merge(appointments::routes())
        .merge(doctors::routes())
        .merge(users::routes())
        .merge(payments::routes())
        .layer(middleware::from_fn_with_state(state.clone(), attach_identity))
        .layer(middleware::from_fn(security::add_security_headers))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
