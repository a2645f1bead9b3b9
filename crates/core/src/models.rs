//! Records held by the consultation store and the payloads used to create and change them.

use crate::{CoreError, CoreResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use consult_types::NonEmptyText;
use consult_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// REFERENCED ENTITIES
// ============================================================================

/// A patient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: RecordId,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
}

/// Fields for registering a patient. The store allocates the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPerson {
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
}

/// The login identity a practitioner acts under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub email: NonEmptyText,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub email: NonEmptyText,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
}

/// A practitioner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: RecordId,
    pub user_id: RecordId,
    pub specialty: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewDoctor {
    pub user_id: RecordId,
    pub specialty: Option<String>,
}

/// A practitioner joined with its user identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorWithUser {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub user: User,
}

// ============================================================================
// CONSULTATIONS
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Scheduled => "SCHEDULED",
            ConsultationStatus::Completed => "COMPLETED",
            ConsultationStatus::Cancelled => "CANCELLED",
            ConsultationStatus::NoShow => "NO_SHOW",
        }
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsultationStatus {
    type Err = CoreError;

    /// Accepts the stored spelling in any letter case (`no_show`, `NO_SHOW`).
    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" => Ok(ConsultationStatus::Scheduled),
            "COMPLETED" => Ok(ConsultationStatus::Completed),
            "CANCELLED" => Ok(ConsultationStatus::Cancelled),
            "NO_SHOW" => Ok(ConsultationStatus::NoShow),
            other => Err(CoreError::InvalidInput(format!(
                "unknown consultation status: '{}'",
                other
            ))),
        }
    }
}

/// A stored consultation. `date_time_utc` is always an absolute UTC instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: RecordId,
    pub person_id: RecordId,
    pub doctor_id: RecordId,
    pub date_time_utc: DateTime<Utc>,
    pub status: ConsultationStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// A consultation with whichever related records were requested.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationDetails {
    #[serde(flatten)]
    pub consultation: Consultation,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub person: Option<Person>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doctor: Option<DoctorWithUser>,
}

/// Caller payload for booking a consultation.
///
/// `date_time` is the clinic wall-clock reading; the service converts it to UTC.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewConsultation {
    pub person_id: RecordId,
    pub doctor_id: RecordId,
    pub date_time: NaiveDateTime,
    pub status: ConsultationStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Caller payload for changing a consultation.
///
/// Every field is optional; `None` means "leave the stored value as it is". A supplied
/// `date_time` is a clinic wall-clock reading and is converted to UTC before storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsultationUpdate {
    pub person_id: Option<RecordId>,
    pub doctor_id: Option<RecordId>,
    pub date_time: Option<NaiveDateTime>,
    pub status: Option<ConsultationStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl ConsultationUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Store-level insert payload: references already checked, instant already in UTC.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsultationDraft {
    pub person_id: RecordId,
    pub doctor_id: RecordId,
    pub date_time_utc: DateTime<Utc>,
    pub status: ConsultationStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Store-level update payload.
///
/// `date_time_utc` is always present: either a freshly normalized instant or the value read from
/// the existing row, so the store never has to derive it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsultationChanges {
    pub person_id: Option<RecordId>,
    pub doctor_id: Option<RecordId>,
    pub date_time_utc: DateTime<Utc>,
    pub status: Option<ConsultationStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl ConsultationChanges {
    /// Applies these changes to `current`, leaving unsupplied fields untouched.
    pub fn apply_to(&self, current: &mut Consultation) {
        if let Some(person_id) = self.person_id {
            current.person_id = person_id;
        }
        if let Some(doctor_id) = self.doctor_id {
            current.doctor_id = doctor_id;
        }
        current.date_time_utc = self.date_time_utc;
        if let Some(status) = self.status {
            current.status = status;
        }
        if let Some(reason) = &self.reason {
            current.reason = Some(reason.clone());
        }
        if let Some(notes) = &self.notes {
            current.notes = Some(notes.clone());
        }
    }
}

/// Confirmation returned once a consultation has been deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    pub id: RecordId,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Consultation {
        Consultation {
            id: RecordId::new(),
            person_id: RecordId::new(),
            doctor_id: RecordId::new(),
            date_time_utc: "2024-06-15T09:00:00Z".parse().unwrap(),
            status: ConsultationStatus::Scheduled,
            reason: Some("Fever".into()),
            notes: None,
        }
    }

    #[test]
    fn test_status_parses_any_case() {
        assert_eq!(
            "no_show".parse::<ConsultationStatus>().unwrap(),
            ConsultationStatus::NoShow
        );
        assert_eq!(
            " Completed ".parse::<ConsultationStatus>().unwrap(),
            ConsultationStatus::Completed
        );
        assert!("postponed".parse::<ConsultationStatus>().is_err());
    }

    #[test]
    fn test_status_display_matches_serde() {
        for status in [
            ConsultationStatus::Scheduled,
            ConsultationStatus::Completed,
            ConsultationStatus::Cancelled,
            ConsultationStatus::NoShow,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_changes_leave_unsupplied_fields_untouched() {
        let original = sample();
        let mut changed = original.clone();

        let changes = ConsultationChanges {
            person_id: None,
            doctor_id: None,
            date_time_utc: original.date_time_utc,
            status: Some(ConsultationStatus::Completed),
            reason: None,
            notes: Some("Paracetamol prescribed".into()),
        };
        changes.apply_to(&mut changed);

        assert_eq!(changed.id, original.id);
        assert_eq!(changed.person_id, original.person_id);
        assert_eq!(changed.date_time_utc, original.date_time_utc);
        assert_eq!(changed.reason, original.reason);
        assert_eq!(changed.status, ConsultationStatus::Completed);
        assert_eq!(changed.notes.as_deref(), Some("Paracetamol prescribed"));
    }

    #[test]
    fn test_empty_update_is_detected() {
        assert!(ConsultationUpdate::default().is_empty());

        let update = ConsultationUpdate {
            status: Some(ConsultationStatus::Cancelled),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_details_omit_missing_joins_in_json() {
        let details = ConsultationDetails {
            consultation: sample(),
            person: None,
            doctor: None,
        };
        let value = serde_json::to_value(&details).unwrap();

        assert!(value.get("person").is_none());
        assert!(value.get("doctor").is_none());
        assert_eq!(value["status"], "SCHEDULED");
        assert_eq!(value["date_time_utc"], "2024-06-15T09:00:00Z");
    }
}
