// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (role store: profile upsert, role lookup, admin promotion)
//! - Appointments (slot ledger: list, fetch, atomic booking, payment attach)
//! - Doctors (directory: profile upload, listing)
//!
//! Each operation group writes exactly one collection; the slot ledger
//! additionally owns `slot_claims`, whose document IDs carry the
//! one-booking-per-slot invariant.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    slot_key, Appointment, AppointmentCandidate, AppointmentStatus, Doctor, PaymentRecord, Role,
    SlotClaim, User,
};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User / Role Operations ──────────────────────────────────

    /// Get a user by email (document ID).
    pub async fn get_user(&self, email: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(email)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Write a user record verbatim (document ID = email).
    pub async fn put_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.email)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create or update a user profile, keyed by email.
    ///
    /// Last-write-wins on profile fields, but a stored role and the original
    /// created_at always survive: sign-in upserts must never touch roles.
    pub async fn upsert_user(
        &self,
        email: &str,
        display_name: Option<String>,
    ) -> Result<User, AppError> {
        let existing = self.get_user(email).await?;

        let user = match existing {
            Some(current) => User {
                email: current.email,
                display_name: display_name.or(current.display_name),
                role: current.role,
                created_at: current.created_at,
            },
            None => User {
                email: email.to_string(),
                display_name,
                role: Role::default(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        };

        self.put_user(&user).await?;
        Ok(user)
    }

    /// Resolve the role for an email; absent records are plain patients.
    pub async fn get_role(&self, email: &str) -> Result<Role, AppError> {
        Ok(self
            .get_user(email)
            .await?
            .map(|u| u.role)
            .unwrap_or_default())
    }

    /// Promote the target user to admin.
    ///
    /// `requester` is the verified identity of the caller, or None when the
    /// request carried no usable token. The two rejection cases stay
    /// distinct: no identity at all is `RequesterUnknown`, an identified
    /// non-admin is `Forbidden`.
    pub async fn promote_user(
        &self,
        target_email: &str,
        requester: Option<&str>,
    ) -> Result<User, AppError> {
        let requester_email = requester.ok_or(AppError::RequesterUnknown)?;

        let requester_role = self.get_role(requester_email).await?;
        if !requester_role.is_admin() {
            tracing::warn!(
                requester = requester_email,
                target = target_email,
                "Rejected admin promotion by non-admin"
            );
            return Err(AppError::Forbidden);
        }

        let mut target = self
            .get_user(target_email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", target_email)))?;

        target.role = Role::Admin;
        self.put_user(&target).await?;

        tracing::info!(
            requester = requester_email,
            target = target_email,
            "User promoted to admin"
        );

        Ok(target)
    }

    // ─── Appointment / Slot Ledger Operations ────────────────────

    /// Get an appointment by ID.
    pub async fn get_appointment(&self, id: &str) -> Result<Option<Appointment>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::APPOINTMENTS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List appointments for a patient on a given date.
    pub async fn list_appointments(
        &self,
        email: &str,
        date: &str,
    ) -> Result<Vec<Appointment>, AppError> {
        let email = email.to_string();
        let date = date.to_string();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::APPOINTMENTS)
            .filter(move |q| {
                q.for_all([
                    q.field("patient_email").eq(email.clone()),
                    q.field("date").eq(date.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Book an appointment, atomically claiming its slot.
    ///
    /// The slot claim is a conditional document create: the claim's document
    /// ID is derived from (date, time_slot, doctor_id), and Firestore
    /// rejects a create for an existing ID. Under concurrent requests for
    /// one slot exactly one create wins; every loser observes `SlotTaken`.
    /// There is no read-then-write window.
    pub async fn book_appointment(
        &self,
        candidate: AppointmentCandidate,
    ) -> Result<Appointment, AppError> {
        validate_slot(&candidate.date, &candidate.time_slot)?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let key = slot_key(
            &candidate.date,
            &candidate.time_slot,
            candidate.doctor_id.as_deref(),
        );

        let claim = SlotClaim {
            appointment_id: id.clone(),
            date: candidate.date.clone(),
            time_slot: candidate.time_slot.clone(),
            doctor_id: candidate.doctor_id.clone(),
            claimed_at: now.clone(),
        };

        // Conditional create: fails with a data conflict if the slot key
        // already exists, which maps to SlotTaken.
        let insert_result: Result<(), firestore::errors::FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::SLOT_CLAIMS)
            .document_id(&key)
            .object(&claim)
            .execute()
            .await;

        if let Err(e) = insert_result {
            return Err(match e {
                firestore::errors::FirestoreError::DataConflictError(_) => {
                    tracing::debug!(slot_key = %key, "Slot already claimed");
                    AppError::SlotTaken
                }
                other => AppError::Database(other.to_string()),
            });
        }

        let appointment = Appointment {
            id: id.clone(),
            patient_email: candidate.patient_email,
            patient_name: candidate.patient_name,
            service: candidate.service,
            date: candidate.date,
            time_slot: candidate.time_slot,
            doctor_id: candidate.doctor_id,
            status: AppointmentStatus::Confirmed,
            payment: None,
            created_at: now,
        };

        let write_result: Result<(), AppError> = async {
            let _: () = self
                .get_client()?
                .fluent()
                .update()
                .in_col(collections::APPOINTMENTS)
                .document_id(&id)
                .object(&appointment)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Ok(())
        }
        .await;

        if let Err(e) = write_result {
            // Release the claim so a failed booking does not orphan the slot.
            // If this also fails the slot stays blocked but never double-books.
            if let Err(release_err) = self.release_slot_claim(&key).await {
                tracing::error!(
                    slot_key = %key,
                    error = %release_err,
                    "Failed to release slot claim after appointment write failure"
                );
            }
            return Err(e);
        }

        tracing::info!(
            appointment_id = %appointment.id,
            slot_key = %key,
            "Appointment booked"
        );

        Ok(appointment)
    }

    /// Delete a slot claim (only used to undo a failed booking).
    async fn release_slot_claim(&self, key: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SLOT_CLAIMS)
            .document_id(key)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Attach a payment record to an appointment, transitioning it to Paid.
    ///
    /// Runs in a Firestore transaction so concurrent attaches cannot
    /// interleave. Re-attaching the same transaction_id is idempotent and
    /// returns the stored record; a different transaction_id on an already
    /// paid appointment is `AlreadyPaid`.
    pub async fn attach_payment(
        &self,
        appointment_id: &str,
        record: PaymentRecord,
    ) -> Result<Appointment, AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let current: Option<Appointment> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::APPOINTMENTS)
            .obj()
            .one(appointment_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read appointment in transaction: {}", e))
            })?;

        let Some(mut appointment) = current else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!(
                "Appointment {} not found",
                appointment_id
            )));
        };

        match &appointment.payment {
            Some(existing) if existing.transaction_id == record.transaction_id => {
                // Idempotent re-attach: nothing to write.
                tracing::debug!(
                    appointment_id,
                    transaction_id = %record.transaction_id,
                    "Payment already attached (idempotent skip)"
                );
                let _ = transaction.rollback().await;
                return Ok(appointment);
            }
            Some(existing) => {
                tracing::warn!(
                    appointment_id,
                    attached = %existing.transaction_id,
                    attempted = %record.transaction_id,
                    "Rejected conflicting payment attach"
                );
                let _ = transaction.rollback().await;
                return Err(AppError::AlreadyPaid);
            }
            None => {}
        }

        appointment.payment = Some(record);
        appointment.status = AppointmentStatus::Paid;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::APPOINTMENTS)
            .document_id(appointment_id)
            .object(&appointment)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add payment to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(appointment_id, "Payment attached");

        Ok(appointment)
    }

    // ─── Doctor Operations ───────────────────────────────────────

    /// Store a doctor profile with its image bytes verbatim.
    pub async fn add_doctor(
        &self,
        name: String,
        email: String,
        image: Vec<u8>,
    ) -> Result<Doctor, AppError> {
        let doctor = Doctor {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            image,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::DOCTORS)
            .document_id(&doctor.id)
            .object(&doctor)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(doctor_id = %doctor.id, image_bytes = doctor.image.len(), "Doctor added");

        Ok(doctor)
    }

    /// List all doctor profiles.
    pub async fn list_doctors(&self) -> Result<Vec<Doctor>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::DOCTORS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Validate the slot fields of a booking candidate.
///
/// The date must be a plain calendar day and the slot label non-empty;
/// everything else about the label is an opaque client convention.
fn validate_slot(date: &str, time_slot: &str) -> Result<(), AppError> {
    if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(AppError::InvalidSlot(format!(
            "Invalid date '{}': expected YYYY-MM-DD",
            date
        )));
    }
    if time_slot.trim().is_empty() {
        return Err(AppError::InvalidSlot("Empty time slot".to_string()));
    }
    Ok(())
}
