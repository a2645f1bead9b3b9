//! Consultation record management.
//!
//! [`ConsultationService`] is the only place consultation rows are written. It:
//!
//! - checks that the referenced patient and practitioner exist before booking, reporting a
//!   missing patient ahead of a missing practitioner;
//! - converts every clinic wall-clock time it receives to UTC before it reaches the store;
//! - returns records joined with the related patient, practitioner and user identity.
//!
//! ## Known gaps
//!
//! - `update` does not re-check a changed `person_id` or `doctor_id`; any foreign-key failure
//!   comes back from the store as-is.
//! - `update` and `remove` read the row and then write it in two separate store calls. A
//!   concurrent change between the two is not detected.

use crate::clock::ClinicClock;
use crate::config::CoreConfig;
use crate::constants::CONSULTATION_DELETED_MESSAGE;
use crate::error::{CoreError, CoreResult, EntityKind};
use crate::filter::{ConsultationFilter, ConsultationPredicate, Include};
use crate::models::{
    ConsultationChanges, ConsultationDetails, ConsultationDraft, ConsultationUpdate, Deleted,
    NewConsultation,
};
use crate::store::ConsultationStore;
use consult_uuid::RecordId;
use std::sync::Arc;

/// Service for creating, reading, changing and deleting consultations.
///
/// Holds no mutable state; cloning is cheap and clones share the same store handle.
#[derive(Clone)]
pub struct ConsultationService {
    clock: ClinicClock,
    store: Arc<dyn ConsultationStore>,
}

impl ConsultationService {
    /// Creates a service bound to the clinic zone in `cfg` and to an already-open store.
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn ConsultationStore>) -> Self {
        Self {
            clock: cfg.clock(),
            store,
        }
    }

    /// Books a consultation.
    ///
    /// The patient and practitioner lookups are issued together and both awaited before either
    /// result is inspected. A failed lookup wins over an absent record.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] with [`EntityKind::Person`] if the patient is unknown, whether or
    ///   not the practitioner exists
    /// - [`CoreError::NotFound`] with [`EntityKind::Doctor`] if only the practitioner is unknown
    /// - [`CoreError::InvalidLocalTime`] if `date_time` cannot be placed in the clinic zone
    /// - [`CoreError::Store`] for any store failure, including a failed lookup of either reference
    pub async fn create(&self, data: NewConsultation) -> CoreResult<ConsultationDetails> {
        let (person, doctor) = tokio::join!(
            self.store.find_person(data.person_id),
            self.store.find_doctor(data.doctor_id),
        );

        let (person, doctor) = (person?, doctor?);

        if person.is_none() {
            tracing::warn!("create consultation: person {} not found", data.person_id);
            return Err(CoreError::NotFound(EntityKind::Person));
        }
        if doctor.is_none() {
            tracing::warn!("create consultation: doctor {} not found", data.doctor_id);
            return Err(CoreError::NotFound(EntityKind::Doctor));
        }

        let draft = ConsultationDraft {
            person_id: data.person_id,
            doctor_id: data.doctor_id,
            date_time_utc: self.clock.to_utc(data.date_time)?,
            status: data.status,
            reason: data.reason,
            notes: data.notes,
        };

        let created = self
            .store
            .create_consultation(draft, Include::PersonAndDoctor)
            .await?;
        tracing::info!(
            "consultation {} created for person {} at {}",
            created.consultation.id,
            created.consultation.person_id,
            created.consultation.date_time_utc
        );

        Ok(created)
    }

    /// Lists consultations matching `filter`, most recent first.
    ///
    /// A `from` later than `to` is not an error; it matches nothing.
    pub async fn find_all(&self, filter: &ConsultationFilter) -> CoreResult<Vec<ConsultationDetails>> {
        let predicate = filter.resolve();
        tracing::debug!("listing consultations: {:?}", predicate);

        Ok(self
            .store
            .find_consultations(&predicate, Include::PersonAndDoctor)
            .await?)
    }

    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] with [`EntityKind::Consultation`] if `id` is unknown.
    pub async fn find_one(&self, id: RecordId) -> CoreResult<ConsultationDetails> {
        self.store
            .find_consultation(id, Include::PersonAndDoctor)
            .await?
            .ok_or_else(|| {
                tracing::warn!("consultation {} not found", id);
                CoreError::NotFound(EntityKind::Consultation)
            })
    }

    /// Changes the supplied fields of a consultation.
    ///
    /// A supplied `date_time` is converted to UTC and replaces the stored instant. Without one,
    /// the stored instant is written back exactly as read.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] with [`EntityKind::Consultation`] if `id` is unknown
    /// - [`CoreError::InvalidLocalTime`] if `date_time` cannot be placed in the clinic zone
    /// - [`CoreError::Store`] for any store failure, including rejected references
    pub async fn update(
        &self,
        id: RecordId,
        data: ConsultationUpdate,
    ) -> CoreResult<ConsultationDetails> {
        let existing = self.find_one(id).await?;

        let date_time_utc = match data.date_time {
            Some(local) => self.clock.to_utc(local)?,
            None => existing.consultation.date_time_utc,
        };

        let changes = ConsultationChanges {
            person_id: data.person_id,
            doctor_id: data.doctor_id,
            date_time_utc,
            status: data.status,
            reason: data.reason,
            notes: data.notes,
        };

        let updated = self
            .store
            .update_consultation(id, changes, Include::PersonAndDoctor)
            .await?;
        tracing::info!("consultation {} updated", id);

        Ok(updated)
    }

    /// Deletes a consultation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] with [`EntityKind::Consultation`] if `id` is unknown; no
    /// delete is issued to the store in that case.
    pub async fn remove(&self, id: RecordId) -> CoreResult<Deleted> {
        self.find_one(id).await?;

        self.store.delete_consultation(id).await?;
        tracing::info!("consultation {} deleted", id);

        Ok(Deleted {
            id,
            message: CONSULTATION_DELETED_MESSAGE.to_string(),
        })
    }

    /// Returns a patient's consultations, most recent first, joined with practitioner details.
    ///
    /// An unknown `person_id` is not checked and simply yields an empty list.
    pub async fn patient_history(
        &self,
        person_id: RecordId,
        doctor_id: Option<RecordId>,
    ) -> CoreResult<Vec<ConsultationDetails>> {
        let predicate = ConsultationPredicate::for_person(person_id, doctor_id);

        Ok(self
            .store
            .find_consultations(&predicate, Include::Doctor)
            .await?)
    }
}
