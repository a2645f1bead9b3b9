//! Constants used throughout the consultation core crate.

/// Zone used when no clinic time zone is configured.
pub const DEFAULT_CLINIC_TIMEZONE: &str = "Africa/Douala";

/// Database file used when no explicit path is configured.
pub const DEFAULT_DATABASE_PATH: &str = "consultations.db";

/// Environment variable naming the clinic time zone.
pub const TIMEZONE_ENV_VAR: &str = "CONSULT_TIMEZONE";

/// Environment variable naming the SQLite database file.
pub const DATABASE_PATH_ENV_VAR: &str = "CONSULT_DATABASE_PATH";

/// Message returned after a consultation has been deleted.
pub const CONSULTATION_DELETED_MESSAGE: &str = "Consultation deleted";
