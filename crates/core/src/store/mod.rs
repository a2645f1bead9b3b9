//! Persistence collaborator.
//!
//! The consultation service never talks to a database directly. It is handed a long-lived
//! [`ConsultationStore`] at construction and issues one call per step. Each call is expected to
//! be atomic on its own; nothing here spans calls with a transaction.
//!
//! Two stores are provided:
//! - [`SqliteStore`] keeps records in a SQLite file and is opened and closed explicitly by the
//!   process that owns it.
//! - [`MemoryStore`] keeps records in process memory, for tests and dry runs.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreResult;
use crate::filter::{ConsultationPredicate, Include};
use crate::models::{
    ConsultationChanges, ConsultationDetails, ConsultationDraft, DoctorWithUser, NewDoctor,
    NewPerson, NewUser, Person, User,
};
use async_trait::async_trait;
use consult_uuid::RecordId;

#[async_trait]
pub trait ConsultationStore: Send + Sync {
    async fn find_person(&self, id: RecordId) -> StoreResult<Option<Person>>;

    /// Looks up a practitioner together with its user identity.
    async fn find_doctor(&self, id: RecordId) -> StoreResult<Option<DoctorWithUser>>;

    async fn insert_person(&self, person: NewPerson) -> StoreResult<Person>;

    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    /// Fails if `doctor.user_id` does not name a stored user.
    async fn insert_doctor(&self, doctor: NewDoctor) -> StoreResult<DoctorWithUser>;

    async fn find_consultation(
        &self,
        id: RecordId,
        include: Include,
    ) -> StoreResult<Option<ConsultationDetails>>;

    /// Returns every consultation matching `predicate`, most recent `date_time_utc` first.
    async fn find_consultations(
        &self,
        predicate: &ConsultationPredicate,
        include: Include,
    ) -> StoreResult<Vec<ConsultationDetails>>;

    async fn create_consultation(
        &self,
        draft: ConsultationDraft,
        include: Include,
    ) -> StoreResult<ConsultationDetails>;

    /// Fails with `StoreError::MissingRow` if `id` is not stored.
    async fn update_consultation(
        &self,
        id: RecordId,
        changes: ConsultationChanges,
        include: Include,
    ) -> StoreResult<ConsultationDetails>;

    /// Fails with `StoreError::MissingRow` if `id` is not stored.
    async fn delete_consultation(&self, id: RecordId) -> StoreResult<()>;
}
