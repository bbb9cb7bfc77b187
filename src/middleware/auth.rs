// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request-identity middleware.

use crate::services::VerifiedIdentity;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authentication outcome attached to every request.
///
/// `None` means the request carried no usable token. Anonymous is not an
/// error at this layer; handlers that need an identity must treat the
/// absent case and the present-but-unauthorized case as distinct outcomes.
#[derive(Debug, Clone)]
pub struct RequestIdentity(pub Option<VerifiedIdentity>);

impl RequestIdentity {
    /// The verified email, if any identity is present.
    pub fn email(&self) -> Option<&str> {
        self.0.as_ref().map(|identity| identity.email.as_str())
    }
}

/// Middleware that resolves the bearer token to a verified identity.
///
/// Never rejects a request: verification failure attaches an empty
/// identity and the route-level authorization check decides the outcome.
pub async fn attach_identity(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request.headers().get(header::AUTHORIZATION);
    let identity = state.identity_verifier.verify_bearer(auth_header).await;

    request.extensions_mut().insert(RequestIdentity(identity));
    next.run(request).await
}
