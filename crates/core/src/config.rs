//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. Nothing
//! in this crate reads process-wide environment variables while handling an operation; binaries
//! read the environment and hand the raw values to [`CoreConfig::from_env_values`].

use crate::clock::ClinicClock;
use crate::constants::{DEFAULT_CLINIC_TIMEZONE, DEFAULT_DATABASE_PATH};
use crate::CoreResult;
use consult_types::NonEmptyText;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    clinic_timezone: NonEmptyText,
    database_path: PathBuf,
    clock: ClinicClock,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTimeZone` if `clinic_timezone` is not a zone known to the
    /// bundled rule database.
    pub fn new(clinic_timezone: NonEmptyText, database_path: PathBuf) -> CoreResult<Self> {
        let clock = ClinicClock::from_zone_name(clinic_timezone.as_str())?;

        Ok(Self {
            clinic_timezone,
            database_path,
            clock,
        })
    }

    /// Builds a configuration from optional raw values, falling back to the defaults for
    /// missing or blank entries.
    pub fn from_env_values(
        clinic_timezone: Option<String>,
        database_path: Option<String>,
    ) -> CoreResult<Self> {
        let clinic_timezone = non_blank(clinic_timezone)
            .unwrap_or_else(|| DEFAULT_CLINIC_TIMEZONE.to_string());
        let database_path =
            non_blank(database_path).unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());

        Self::new(
            NonEmptyText::new(clinic_timezone)?,
            PathBuf::from(database_path),
        )
    }

    pub fn clinic_timezone(&self) -> &str {
        self.clinic_timezone.as_str()
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// The normalizer for the configured clinic zone.
    pub fn clock(&self) -> ClinicClock {
        self.clock
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
