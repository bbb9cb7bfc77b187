// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - external collaborators behind typed clients.

pub mod identity;
pub mod payments;

pub use identity::{IdentityError, TokenVerifier, VerifiedIdentity};
pub use payments::{PaymentIntent, PriceCatalog, StripeClient};
