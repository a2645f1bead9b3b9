use super::ConsultationStore;
use crate::error::{EntityKind, StoreError, StoreResult};
use crate::filter::{ConsultationPredicate, Include};
use crate::models::{
    Consultation, ConsultationChanges, ConsultationDetails, ConsultationDraft, Doctor,
    DoctorWithUser, NewDoctor, NewPerson, NewUser, Person, User,
};
use async_trait::async_trait;
use consult_uuid::RecordId;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    persons: HashMap<RecordId, Person>,
    users: HashMap<RecordId, User>,
    doctors: HashMap<RecordId, Doctor>,
    consultations: HashMap<RecordId, Consultation>,
}

impl Tables {
    fn doctor_with_user(&self, id: RecordId) -> Option<DoctorWithUser> {
        let doctor = self.doctors.get(&id)?;
        let user = self.users.get(&doctor.user_id)?;
        Some(DoctorWithUser {
            doctor: doctor.clone(),
            user: user.clone(),
        })
    }

    fn details(&self, consultation: &Consultation, include: Include) -> ConsultationDetails {
        let person = if include.person() {
            self.persons.get(&consultation.person_id).cloned()
        } else {
            None
        };

        ConsultationDetails {
            consultation: consultation.clone(),
            person,
            doctor: self.doctor_with_user(consultation.doctor_id),
        }
    }

    /// Mirrors the foreign keys a relational schema would enforce.
    fn check_references(&self, person_id: RecordId, doctor_id: RecordId) -> StoreResult<()> {
        if !self.persons.contains_key(&person_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "consultation.person_id references missing person {}",
                person_id
            )));
        }
        if !self.doctors.contains_key(&doctor_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "consultation.doctor_id references missing doctor {}",
                doctor_id
            )));
        }
        Ok(())
    }
}

/// Process-memory store. Data is lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsultationStore for MemoryStore {
    async fn find_person(&self, id: RecordId) -> StoreResult<Option<Person>> {
        Ok(self.tables.read().await.persons.get(&id).cloned())
    }

    async fn find_doctor(&self, id: RecordId) -> StoreResult<Option<DoctorWithUser>> {
        Ok(self.tables.read().await.doctor_with_user(id))
    }

    async fn insert_person(&self, person: NewPerson) -> StoreResult<Person> {
        let person = Person {
            id: RecordId::new(),
            first_name: person.first_name,
            last_name: person.last_name,
            birth_date: person.birth_date,
            phone: person.phone,
        };
        self.tables
            .write()
            .await
            .persons
            .insert(person.id, person.clone());
        Ok(person)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::ConstraintViolation(format!(
                "user.email {} is already registered",
                user.email
            )));
        }

        let user = User {
            id: RecordId::new(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn insert_doctor(&self, doctor: NewDoctor) -> StoreResult<DoctorWithUser> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get(&doctor.user_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::ConstraintViolation(format!(
                    "doctor.user_id references missing user {}",
                    doctor.user_id
                ))
            })?;

        let doctor = Doctor {
            id: RecordId::new(),
            user_id: doctor.user_id,
            specialty: doctor.specialty,
        };
        tables.doctors.insert(doctor.id, doctor.clone());
        Ok(DoctorWithUser { doctor, user })
    }

    async fn find_consultation(
        &self,
        id: RecordId,
        include: Include,
    ) -> StoreResult<Option<ConsultationDetails>> {
        let tables = self.tables.read().await;
        Ok(tables
            .consultations
            .get(&id)
            .map(|c| tables.details(c, include)))
    }

    async fn find_consultations(
        &self,
        predicate: &ConsultationPredicate,
        include: Include,
    ) -> StoreResult<Vec<ConsultationDetails>> {
        let tables = self.tables.read().await;

        let mut matching: Vec<&Consultation> = tables
            .consultations
            .values()
            .filter(|c| predicate.matches(c))
            .collect();
        matching.sort_by(|a, b| {
            b.date_time_utc
                .cmp(&a.date_time_utc)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(matching
            .into_iter()
            .map(|c| tables.details(c, include))
            .collect())
    }

    async fn create_consultation(
        &self,
        draft: ConsultationDraft,
        include: Include,
    ) -> StoreResult<ConsultationDetails> {
        let mut tables = self.tables.write().await;
        tables.check_references(draft.person_id, draft.doctor_id)?;

        let consultation = Consultation {
            id: RecordId::new(),
            person_id: draft.person_id,
            doctor_id: draft.doctor_id,
            date_time_utc: draft.date_time_utc,
            status: draft.status,
            reason: draft.reason,
            notes: draft.notes,
        };
        tables
            .consultations
            .insert(consultation.id, consultation.clone());

        Ok(tables.details(&consultation, include))
    }

    async fn update_consultation(
        &self,
        id: RecordId,
        changes: ConsultationChanges,
        include: Include,
    ) -> StoreResult<ConsultationDetails> {
        let mut tables = self.tables.write().await;

        let mut updated = tables
            .consultations
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::MissingRow {
                kind: EntityKind::Consultation,
                id: id.to_string(),
            })?;
        changes.apply_to(&mut updated);
        tables.check_references(updated.person_id, updated.doctor_id)?;

        tables.consultations.insert(id, updated.clone());
        Ok(tables.details(&updated, include))
    }

    async fn delete_consultation(&self, id: RecordId) -> StoreResult<()> {
        match self.tables.write().await.consultations.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::MissingRow {
                kind: EntityKind::Consultation,
                id: id.to_string(),
            }),
        }
    }
}
