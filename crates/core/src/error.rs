use std::fmt;

/// The kind of record a lookup failed to find.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Person,
    Doctor,
    Consultation,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::Doctor => "doctor",
            EntityKind::Consultation => "consultation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by a [`ConsultationStore`](crate::store::ConsultationStore).
///
/// These are passed through the service untouched.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },
    #[error("store connection lock was poisoned")]
    LockPoisoned,
    #[error("corrupt {column} value in stored row: {value}")]
    CorruptRow { column: &'static str, value: String },
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),
    #[error("no {kind} row with id {id}")]
    MissingRow { kind: EntityKind, id: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(EntityKind),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown time zone: {0}")]
    InvalidTimeZone(String),
    #[error("local time {local} does not exist in zone {zone}")]
    InvalidLocalTime {
        local: chrono::NaiveDateTime,
        zone: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid identifier: {0}")]
    Uuid(#[from] consult_uuid::UuidError),
    #[error("invalid text: {0}")]
    Text(#[from] consult_types::TextError),
}

impl CoreError {
    /// Returns the missing entity kind when this is a not-found failure.
    pub fn not_found_kind(&self) -> Option<EntityKind> {
        match self {
            CoreError::NotFound(kind) => Some(*kind),
            _ => None,
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
