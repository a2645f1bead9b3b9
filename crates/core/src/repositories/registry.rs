//! Registration of patients and practitioners.
//!
//! Consultations can only reference records that already exist, so these are written first.
//! A practitioner is registered as a user identity followed by the practitioner row that points
//! at it.

use crate::error::CoreResult;
use crate::models::{DoctorWithUser, NewDoctor, NewPerson, NewUser, Person};
use crate::store::ConsultationStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct RegistryService {
    store: Arc<dyn ConsultationStore>,
}

impl RegistryService {
    pub fn new(store: Arc<dyn ConsultationStore>) -> Self {
        Self { store }
    }

    pub async fn register_person(&self, person: NewPerson) -> CoreResult<Person> {
        let person = self.store.insert_person(person).await?;
        tracing::info!("person {} registered", person.id);
        Ok(person)
    }

    /// Registers a practitioner and the user identity it acts under.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Store` if the email is already registered. The user row is not
    /// rolled back if the practitioner insert fails afterwards.
    pub async fn register_doctor(
        &self,
        user: NewUser,
        specialty: Option<String>,
    ) -> CoreResult<DoctorWithUser> {
        let user = self.store.insert_user(user).await?;
        let doctor = self
            .store
            .insert_doctor(NewDoctor {
                user_id: user.id,
                specialty,
            })
            .await?;
        tracing::info!("doctor {} registered for user {}", doctor.doctor.id, user.id);
        Ok(doctor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, StoreError};
    use crate::store::MemoryStore;
    use consult_types::NonEmptyText;
    use consult_uuid::RecordId;

    fn text(s: &str) -> NonEmptyText {
        NonEmptyText::new(s).unwrap()
    }

    fn user(email: &str) -> NewUser {
        NewUser {
            email: text(email),
            first_name: text("Paul"),
            last_name: text("Essomba"),
        }
    }

    #[tokio::test]
    async fn test_register_doctor_links_user() {
        let store = Arc::new(MemoryStore::new());
        let registry = RegistryService::new(store.clone());

        let doctor = registry
            .register_doctor(user("p.essomba@clinic.cm"), Some("Paediatrics".into()))
            .await
            .expect("registration should succeed");

        assert_eq!(doctor.doctor.user_id, doctor.user.id);
        assert_eq!(doctor.doctor.specialty.as_deref(), Some("Paediatrics"));
        assert_eq!(
            store.find_doctor(doctor.doctor.id).await.unwrap(),
            Some(doctor)
        );
    }

    #[tokio::test]
    async fn test_register_doctor_rejects_duplicate_email() {
        let registry = RegistryService::new(Arc::new(MemoryStore::new()));
        registry
            .register_doctor(user("p.essomba@clinic.cm"), None)
            .await
            .unwrap();

        let err = registry
            .register_doctor(user("p.essomba@clinic.cm"), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::Store(StoreError::ConstraintViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_register_person_allocates_id() {
        let store = Arc::new(MemoryStore::new());
        let registry = RegistryService::new(store.clone());

        let person = registry
            .register_person(NewPerson {
                first_name: text("Amina"),
                last_name: text("Ngono"),
                birth_date: Some(chrono::NaiveDate::from_ymd_opt(1990, 4, 2).unwrap()),
                phone: Some("+237 6 99 00 11 22".into()),
            })
            .await
            .unwrap();

        assert!(RecordId::is_canonical(&person.id.to_string()));
        assert_eq!(store.find_person(person.id).await.unwrap(), Some(person));
    }
}
