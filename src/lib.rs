// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! CareSlot: appointment booking backend for a clinic portal
//!
//! This crate provides the API for booking treatment slots, managing
//! patient/admin roles, publishing doctor profiles, and collecting
//! payments through Stripe payment intents.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use config::Config;
use db::FirestoreDb;
use services::{PriceCatalog, StripeClient, TokenVerifier};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity_verifier: Arc<TokenVerifier>,
    pub stripe: StripeClient,
    pub price_catalog: PriceCatalog,
}
