//! Record identifiers.
//!
//! Every stored entity (patient, practitioner, user identity, consultation) is keyed by a
//! [`RecordId`]. Identifiers use a single *canonical* textual form: **32 lowercase hexadecimal
//! characters** with no hyphens, the same value produced by `Uuid::new_v4().simple()`.
//!
//! Canonical form is required for externally supplied identifiers (CLI arguments, JSON payloads).
//! Hyphenated, uppercase, short or non-hex input is rejected rather than normalised, so a given
//! record has exactly one spelling in the database and in logs.
//!
//! Example: `550e8400e29b41d4a716446655440000`

mod record_id;

pub use record_id::RecordId;

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Input was not a canonical identifier
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
