// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod appointment;
pub mod doctor;
pub mod user;

pub use appointment::{
    slot_key, Appointment, AppointmentCandidate, AppointmentStatus, PaymentRecord, SlotClaim,
};
pub use doctor::Doctor;
pub use user::{Role, User};
