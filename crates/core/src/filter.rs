//! Filter resolution.
//!
//! Turns the optional query parameters of a consultation search into a storage predicate. The
//! translation is pure: every present field contributes exactly one clause and no field affects
//! another.
//!
//! The timestamp clause has three shapes only: absent, half-open ([`TimeClause::From`] or
//! [`TimeClause::To`]) or closed ([`TimeClause::Between`]). There is no "open range" value; a
//! filter with neither bound simply produces no timestamp clause. Bounds are inclusive and are
//! not reordered, so a `from` later than `to` yields a clause nothing can satisfy.

use crate::models::{Consultation, ConsultationStatus};
use chrono::{DateTime, Utc};
use consult_uuid::RecordId;

/// Optional query parameters for listing consultations.
///
/// `from` and `to` are absolute instants compared against the stored UTC timestamp.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsultationFilter {
    pub person_id: Option<RecordId>,
    pub doctor_id: Option<RecordId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub status: Option<ConsultationStatus>,
}

/// Inclusive constraint on `date_time_utc`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeClause {
    /// `date_time_utc >= from`
    From(DateTime<Utc>),
    /// `date_time_utc <= to`
    To(DateTime<Utc>),
    /// `from <= date_time_utc <= to`
    Between {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

impl TimeClause {
    pub fn lower(&self) -> Option<DateTime<Utc>> {
        match *self {
            TimeClause::From(from) | TimeClause::Between { from, .. } => Some(from),
            TimeClause::To(_) => None,
        }
    }

    pub fn upper(&self) -> Option<DateTime<Utc>> {
        match *self {
            TimeClause::To(to) | TimeClause::Between { to, .. } => Some(to),
            TimeClause::From(_) => None,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.lower().map_or(true, |from| from <= at) && self.upper().map_or(true, |to| at <= to)
    }
}

/// Storage predicate: a conjunction of the clauses that are present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsultationPredicate {
    pub person_id: Option<RecordId>,
    pub doctor_id: Option<RecordId>,
    pub status: Option<ConsultationStatus>,
    pub date_time_utc: Option<TimeClause>,
}

impl ConsultationPredicate {
    /// Predicate for a patient's history, optionally narrowed to one practitioner.
    pub fn for_person(person_id: RecordId, doctor_id: Option<RecordId>) -> Self {
        Self {
            person_id: Some(person_id),
            doctor_id,
            ..Self::default()
        }
    }

    pub fn matches(&self, consultation: &Consultation) -> bool {
        self.person_id.map_or(true, |id| consultation.person_id == id)
            && self.doctor_id.map_or(true, |id| consultation.doctor_id == id)
            && self.status.map_or(true, |s| consultation.status == s)
            && self
                .date_time_utc
                .map_or(true, |clause| clause.contains(consultation.date_time_utc))
    }
}

/// Related records to join onto each returned consultation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Include {
    /// Patient, practitioner and the practitioner's user identity.
    PersonAndDoctor,
    /// Practitioner and user identity only.
    Doctor,
}

impl Include {
    pub fn person(&self) -> bool {
        matches!(self, Include::PersonAndDoctor)
    }
}

impl ConsultationFilter {
    /// Builds the storage predicate for this filter.
    pub fn resolve(&self) -> ConsultationPredicate {
        let date_time_utc = match (self.from, self.to) {
            (None, None) => None,
            (Some(from), None) => Some(TimeClause::From(from)),
            (None, Some(to)) => Some(TimeClause::To(to)),
            (Some(from), Some(to)) => Some(TimeClause::Between { from, to }),
        };

        ConsultationPredicate {
            person_id: self.person_id,
            doctor_id: self.doctor_id,
            status: self.status,
            date_time_utc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn consultation_at(when: &str) -> Consultation {
        Consultation {
            id: RecordId::new(),
            person_id: RecordId::new(),
            doctor_id: RecordId::new(),
            date_time_utc: at(when),
            status: ConsultationStatus::Scheduled,
            reason: None,
            notes: None,
        }
    }

    #[test]
    fn test_empty_filter_resolves_to_no_clauses() {
        let predicate = ConsultationFilter::default().resolve();
        assert_eq!(predicate, ConsultationPredicate::default());
        assert!(predicate.matches(&consultation_at("1999-01-01T00:00:00Z")));
    }

    #[test]
    fn test_scalars_become_equality_clauses() {
        let person = RecordId::new();
        let doctor = RecordId::new();
        let filter = ConsultationFilter {
            person_id: Some(person),
            doctor_id: Some(doctor),
            status: Some(ConsultationStatus::Completed),
            ..Default::default()
        };

        let predicate = filter.resolve();

        assert_eq!(predicate.person_id, Some(person));
        assert_eq!(predicate.doctor_id, Some(doctor));
        assert_eq!(predicate.status, Some(ConsultationStatus::Completed));
        assert_eq!(predicate.date_time_utc, None);
    }

    #[test]
    fn test_single_bounds_become_half_open_clauses() {
        let from = at("2024-06-01T00:00:00Z");
        let to = at("2024-06-30T23:59:59Z");

        let lower_only = ConsultationFilter {
            from: Some(from),
            ..Default::default()
        };
        assert_eq!(
            lower_only.resolve().date_time_utc,
            Some(TimeClause::From(from))
        );

        let upper_only = ConsultationFilter {
            to: Some(to),
            ..Default::default()
        };
        assert_eq!(upper_only.resolve().date_time_utc, Some(TimeClause::To(to)));
    }

    #[test]
    fn test_both_bounds_become_closed_clause() {
        let from = at("2024-06-01T00:00:00Z");
        let to = at("2024-06-30T23:59:59Z");
        let filter = ConsultationFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        };

        assert_eq!(
            filter.resolve().date_time_utc,
            Some(TimeClause::Between { from, to })
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let clause = TimeClause::Between {
            from: at("2024-06-01T00:00:00Z"),
            to: at("2024-06-30T00:00:00Z"),
        };

        assert!(clause.contains(at("2024-06-01T00:00:00Z")));
        assert!(clause.contains(at("2024-06-30T00:00:00Z")));
        assert!(!clause.contains(at("2024-05-31T23:59:59Z")));
        assert!(!clause.contains(at("2024-06-30T00:00:01Z")));
    }

    #[test]
    fn test_inverted_range_matches_nothing() {
        let filter = ConsultationFilter {
            from: Some(at("2024-06-30T00:00:00Z")),
            to: Some(at("2024-06-01T00:00:00Z")),
            ..Default::default()
        };
        let predicate = filter.resolve();

        for when in [
            "2024-05-15T00:00:00Z",
            "2024-06-01T00:00:00Z",
            "2024-06-15T00:00:00Z",
            "2024-06-30T00:00:00Z",
            "2024-07-15T00:00:00Z",
        ] {
            assert!(!predicate.matches(&consultation_at(when)), "{when}");
        }
    }

    #[test]
    fn test_history_predicate_narrows_on_person_and_optional_doctor() {
        let person = RecordId::new();
        let doctor = RecordId::new();

        let any_doctor = ConsultationPredicate::for_person(person, None);
        assert_eq!(any_doctor.person_id, Some(person));
        assert_eq!(any_doctor.doctor_id, None);

        let one_doctor = ConsultationPredicate::for_person(person, Some(doctor));
        assert_eq!(one_doctor.doctor_id, Some(doctor));
        assert_eq!(one_doctor.date_time_utc, None);
    }
}
