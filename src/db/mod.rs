//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const APPOINTMENTS: &str = "appointments";
    /// Slot reservation markers (doc ID = slot key); see `models::slot_key`
    pub const SLOT_CLAIMS: &str = "slot_claims";
    pub const DOCTORS: &str = "doctors";
}
