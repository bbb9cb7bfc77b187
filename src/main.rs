// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! CareSlot API Server
//!
//! Backend for a clinic appointment portal: slot booking, doctor
//! profiles, user roles, and Stripe payment intents.

use careslot::{
    config::Config,
    db::FirestoreDb,
    services::{PriceCatalog, StripeClient, TokenVerifier},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting CareSlot API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Initialize Firebase ID token verifier
    let identity_verifier =
        Arc::new(TokenVerifier::new(&config).expect("Failed to initialize token verifier"));

    // Initialize Stripe client
    let stripe = StripeClient::new(config.stripe_secret_key.clone());

    // Treatment prices billed server-side
    let price_catalog = PriceCatalog::default();
    tracing::info!(services = price_catalog.len(), "Price catalog loaded");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        identity_verifier,
        stripe,
        price_catalog,
    });

    // Build router
    let app = careslot::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("careslot=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
