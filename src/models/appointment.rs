// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Appointment and slot-claim models.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Appointment lifecycle status.
///
/// Only two states are ever persisted: booking is atomic, so a request
/// either becomes `Confirmed` or nothing is stored at all. There is no
/// transition out of `Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
    Paid,
}

/// Payment confirmation attached to an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PaymentRecord {
    /// Processor transaction ID (idempotency key for re-attach)
    pub transaction_id: String,
    /// Amount in minor units, if reported by the client
    pub amount_minor_units: Option<i64>,
    /// Payment method label (e.g. "card")
    pub method: Option<String>,
    /// When the payment was attached (ISO 8601)
    pub recorded_at: String,
}

/// Stored appointment record in Firestore.
///
/// Serialized as-is on the wire: the API's appointment resource is the
/// stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Appointment {
    /// System-generated UUID (also used as document ID)
    pub id: String,
    /// Patient email
    pub patient_email: String,
    /// Patient display name
    pub patient_name: Option<String>,
    /// Treatment name; the billed price is resolved from this server-side
    pub service: String,
    /// Appointment date (YYYY-MM-DD)
    pub date: String,
    /// Time slot label (e.g. "10:00-10:30")
    pub time_slot: String,
    /// Doctor, if the booking targets a specific one
    pub doctor_id: Option<String>,
    /// Lifecycle status
    pub status: AppointmentStatus,
    /// Attached payment, present once paid
    pub payment: Option<PaymentRecord>,
    /// When the booking was made (ISO 8601)
    pub created_at: String,
}

/// A booking request that has not yet claimed a slot.
#[derive(Debug, Clone)]
pub struct AppointmentCandidate {
    pub patient_email: String,
    pub patient_name: Option<String>,
    pub service: String,
    pub date: String,
    pub time_slot: String,
    pub doctor_id: Option<String>,
}

/// Slot reservation marker stored in `slot_claims`.
///
/// The document ID is the slot key; the conditional create of this
/// document is what makes booking atomic. The claim points back at the
/// appointment that owns the slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotClaim {
    pub appointment_id: String,
    pub date: String,
    pub time_slot: String,
    pub doctor_id: Option<String>,
    pub claimed_at: String,
}

/// Build the slot-claim document ID for a (date, time_slot, doctor) tuple.
///
/// Components are percent-encoded and joined with `|`, which the encoding
/// escapes inside components, so field content can never collide with a
/// different tuple. An absent doctor is the empty final component.
pub fn slot_key(date: &str, time_slot: &str, doctor_id: Option<&str>) -> String {
    format!(
        "{}|{}|{}",
        urlencoding::encode(date),
        urlencoding::encode(time_slot),
        doctor_id
            .map(|d| urlencoding::encode(d).into_owned())
            .unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_key_deterministic() {
        let a = slot_key("2024-05-01", "10:00-10:30", Some("d1"));
        let b = slot_key("2024-05-01", "10:00-10:30", Some("d1"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_slot_key_distinguishes_doctor() {
        let unassigned = slot_key("2024-05-01", "10:00-10:30", None);
        let d1 = slot_key("2024-05-01", "10:00-10:30", Some("d1"));
        let d2 = slot_key("2024-05-01", "10:00-10:30", Some("d2"));
        assert_ne!(unassigned, d1);
        assert_ne!(d1, d2);
    }

    #[test]
    fn test_slot_key_resists_separator_injection() {
        // A "|" inside a field must not collide with a shifted tuple
        let a = slot_key("2024-05-01", "10:00|d1", None);
        let b = slot_key("2024-05-01|10:00", "d1", None);
        assert_ne!(a, b);
        // Exactly the two joining separators survive encoding
        assert_eq!(slot_key("a", "b|c", None).matches('|').count(), 2);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&AppointmentStatus::Confirmed).unwrap();
        assert_eq!(json, "\"confirmed\"");
    }
}
