//! # Consult Core
//!
//! Core business logic for clinic consultation records.
//!
//! This crate holds the data operations only:
//! - Booking, listing, changing and deleting consultations ([`ConsultationService`])
//! - Registering the patients and practitioners consultations refer to ([`RegistryService`])
//! - Converting clinic wall-clock times to UTC ([`ClinicClock`])
//! - Persistence behind the [`ConsultationStore`] trait, with SQLite and in-memory stores
//!
//! **No transport concerns**: argument parsing, output formatting and process setup belong in
//! the `consult` binary.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod models;
pub mod repositories;
pub mod store;

pub use clock::{parse_instant, parse_local_date_time, ClinicClock};
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult, EntityKind, StoreError, StoreResult};
pub use filter::{ConsultationFilter, ConsultationPredicate, Include, TimeClause};
pub use models::{
    Consultation, ConsultationChanges, ConsultationDetails, ConsultationDraft, ConsultationStatus,
    ConsultationUpdate, Deleted, Doctor, DoctorWithUser, NewConsultation, NewDoctor, NewPerson,
    NewUser, Person, User,
};
pub use repositories::consultations::ConsultationService;
pub use repositories::registry::RegistryService;
pub use store::{ConsultationStore, MemoryStore, SqliteStore};

pub use consult_types::NonEmptyText;
pub use consult_uuid::RecordId;
