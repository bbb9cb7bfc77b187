// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with: FIRESTORE_EMULATOR_HOST=localhost:8080 cargo test
//!
//! Slot tuples embed a per-run unique doctor id so reruns against a
//! shared emulator never collide with earlier claims.

use careslot::error::AppError;
use careslot::models::{AppointmentCandidate, AppointmentStatus, PaymentRecord, Role, User};

mod common;
use common::test_db;

fn unique_suffix() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

fn candidate(email: &str, date: &str, slot: &str, doctor: &str) -> AppointmentCandidate {
    AppointmentCandidate {
        patient_email: email.to_string(),
        patient_name: Some("Test Patient".to_string()),
        service: "Teeth Cleaning".to_string(),
        date: date.to_string(),
        time_slot: slot.to_string(),
        doctor_id: Some(doctor.to_string()),
    }
}

fn payment(transaction_id: &str) -> PaymentRecord {
    PaymentRecord {
        transaction_id: transaction_id.to_string(),
        amount_minor_units: Some(6_000),
        method: Some("card".to_string()),
        recorded_at: chrono::Utc::now().to_rfc3339(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BOOKING
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_booking_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let doctor = format!("d1-{}", unique_suffix());

    let booked = db
        .book_appointment(candidate("a@x.com", "2024-05-01", "10:00-10:30", &doctor))
        .await
        .unwrap();

    assert_eq!(booked.status, AppointmentStatus::Confirmed);
    assert!(booked.payment.is_none());
    assert!(!booked.id.is_empty());

    let fetched = db.get_appointment(&booked.id).await.unwrap().unwrap();
    assert_eq!(fetched.patient_email, "a@x.com");
    assert_eq!(fetched.date, "2024-05-01");
    assert_eq!(fetched.time_slot, "10:00-10:30");
    assert_eq!(fetched.doctor_id.as_deref(), Some(doctor.as_str()));
    assert_eq!(fetched.status, AppointmentStatus::Confirmed);

    println!("✓ Booking stored and fetched: {}", booked.id);
}

#[tokio::test]
async fn test_double_booking_conflicts() {
    require_emulator!();

    let db = test_db().await;
    let doctor = format!("d1-{}", unique_suffix());

    db.book_appointment(candidate("a@x.com", "2024-05-01", "10:00-10:30", &doctor))
        .await
        .unwrap();

    let err = db
        .book_appointment(candidate("b@x.com", "2024-05-01", "10:00-10:30", &doctor))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::SlotTaken), "got {:?}", err);
}

#[tokio::test]
async fn test_same_slot_different_doctor_is_free() {
    require_emulator!();

    let db = test_db().await;
    let suffix = unique_suffix();
    let doctor_a = format!("da-{}", suffix);
    let doctor_b = format!("db-{}", suffix);

    db.book_appointment(candidate("a@x.com", "2024-05-01", "10:00-10:30", &doctor_a))
        .await
        .unwrap();

    // Same tuple except the doctor: a distinct slot
    db.book_appointment(candidate("b@x.com", "2024-05-01", "10:00-10:30", &doctor_b))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_bookings_single_winner() {
    require_emulator!();

    const CONTENDERS: usize = 8;

    let db = test_db().await;
    let doctor = format!("contested-{}", unique_suffix());

    let mut handles = Vec::new();
    for i in 0..CONTENDERS {
        let db = db.clone();
        let doctor = doctor.clone();
        handles.push(tokio::spawn(async move {
            db.book_appointment(candidate(
                &format!("patient{}@x.com", i),
                "2024-05-01",
                "10:00-10:30",
                &doctor,
            ))
            .await
        }));
    }

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(AppError::SlotTaken) => conflicts += 1,
            Err(other) => panic!("unexpected booking error: {:?}", other),
        }
    }

    assert_eq!(winners, 1, "exactly one contender may win the slot");
    assert_eq!(conflicts, CONTENDERS - 1);

    println!("✓ {} contenders, one winner", CONTENDERS);
}

#[tokio::test]
async fn test_listing_filters_by_email_and_date() {
    require_emulator!();

    let db = test_db().await;
    let suffix = unique_suffix();
    let email = format!("lister-{}@x.com", suffix);
    let doctor = format!("d1-{}", suffix);

    db.book_appointment(candidate(&email, "2024-05-01", "10:00-10:30", &doctor))
        .await
        .unwrap();
    db.book_appointment(candidate(&email, "2024-05-01", "11:00-11:30", &doctor))
        .await
        .unwrap();
    // Different date, must not appear
    db.book_appointment(candidate(&email, "2024-05-02", "10:00-10:30", &doctor))
        .await
        .unwrap();
    // Different patient, must not appear
    db.book_appointment(candidate(
        &format!("other-{}@x.com", suffix),
        "2024-05-01",
        "12:00-12:30",
        &doctor,
    ))
    .await
    .unwrap();

    let listed = db.list_appointments(&email, "2024-05-01").await.unwrap();

    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|a| a.patient_email == email));
    assert!(listed.iter().all(|a| a.date == "2024-05-01"));
}

// ═══════════════════════════════════════════════════════════════════════════
// PAYMENT ATTACH
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_attach_payment_then_replay_is_idempotent() {
    require_emulator!();

    let db = test_db().await;
    let doctor = format!("d1-{}", unique_suffix());

    let booked = db
        .book_appointment(candidate("payer@x.com", "2024-05-01", "10:00-10:30", &doctor))
        .await
        .unwrap();

    let first = db.attach_payment(&booked.id, payment("txn-1")).await.unwrap();
    assert_eq!(first.status, AppointmentStatus::Paid);
    assert_eq!(
        first.payment.as_ref().map(|p| p.transaction_id.as_str()),
        Some("txn-1")
    );

    // Same transaction id again: succeeds without rewriting
    let replay = db.attach_payment(&booked.id, payment("txn-1")).await.unwrap();
    assert_eq!(replay.status, AppointmentStatus::Paid);

    let stored = db.get_appointment(&booked.id).await.unwrap().unwrap();
    assert_eq!(
        stored.payment.as_ref().map(|p| p.transaction_id.as_str()),
        Some("txn-1")
    );
    assert_eq!(stored.status, AppointmentStatus::Paid);

    println!("✓ Payment attach is idempotent for {}", booked.id);
}

#[tokio::test]
async fn test_attach_different_transaction_conflicts() {
    require_emulator!();

    let db = test_db().await;
    let doctor = format!("d1-{}", unique_suffix());

    let booked = db
        .book_appointment(candidate("payer@x.com", "2024-05-01", "10:00-10:30", &doctor))
        .await
        .unwrap();

    db.attach_payment(&booked.id, payment("txn-first"))
        .await
        .unwrap();

    let err = db
        .attach_payment(&booked.id, payment("txn-second"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyPaid), "got {:?}", err);

    // The original payment record must be untouched
    let stored = db.get_appointment(&booked.id).await.unwrap().unwrap();
    assert_eq!(
        stored.payment.as_ref().map(|p| p.transaction_id.as_str()),
        Some("txn-first")
    );
}

#[tokio::test]
async fn test_attach_to_unknown_appointment_is_not_found() {
    require_emulator!();

    let db = test_db().await;

    let err = db
        .attach_payment(&format!("missing-{}", unique_suffix()), payment("txn-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {:?}", err);
}

// ═══════════════════════════════════════════════════════════════════════════
// USERS AND ROLES
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_role_defaults_to_patient() {
    require_emulator!();

    let db = test_db().await;
    let email = format!("unseen-{}@x.com", unique_suffix());

    let role = db.get_role(&email).await.unwrap();
    assert_eq!(role, Role::Patient);
}

#[tokio::test]
async fn test_upsert_preserves_role_and_created_at() {
    require_emulator!();

    let db = test_db().await;
    let email = format!("keeper-{}@x.com", unique_suffix());

    db.put_user(&User {
        email: email.clone(),
        display_name: None,
        role: Role::Admin,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    })
    .await
    .unwrap();

    // A later sign-in upsert must not demote or reset the account
    let updated = db
        .upsert_user(&email, Some("Display Name".to_string()))
        .await
        .unwrap();

    assert_eq!(updated.role, Role::Admin);
    assert_eq!(updated.created_at, "2024-01-01T00:00:00Z");
    assert_eq!(updated.display_name.as_deref(), Some("Display Name"));

    let fetched = db.get_user(&email).await.unwrap().unwrap();
    assert_eq!(fetched.role, Role::Admin);
}

#[tokio::test]
async fn test_upsert_keeps_existing_display_name_when_absent() {
    require_emulator!();

    let db = test_db().await;
    let email = format!("named-{}@x.com", unique_suffix());

    db.upsert_user(&email, Some("First Name".to_string()))
        .await
        .unwrap();

    let updated = db.upsert_user(&email, None).await.unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("First Name"));
}
