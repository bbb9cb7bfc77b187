// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Doctor profile model.

use serde::{Deserialize, Serialize};

/// Doctor profile stored in Firestore.
///
/// The image is held as raw bytes in storage; base64 applies only on the
/// JSON wire (see `routes::doctors`). Duplicate emails are permitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    /// System-generated UUID (also used as document ID)
    pub id: String,
    /// Doctor display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Profile image bytes, stored verbatim
    #[serde(with = "serde_bytes")]
    pub image: Vec<u8>,
    /// When the profile was uploaded (ISO 8601)
    pub created_at: String,
}
