//! JSON rendering for command results.
//!
//! Consultations are printed with their stored UTC instant and, alongside it, the same instant
//! read on the clinic wall clock.

use chrono::NaiveDateTime;
use consult_core::{ClinicClock, ConsultationDetails};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ConsultationView<'a> {
    #[serde(flatten)]
    details: &'a ConsultationDetails,
    clinic_time: NaiveDateTime,
}

impl<'a> ConsultationView<'a> {
    pub fn new(clock: ClinicClock, details: &'a ConsultationDetails) -> Self {
        Self {
            details,
            clinic_time: clock.to_local(details.consultation.date_time_utc),
        }
    }
}

pub fn consultation(clock: ClinicClock, details: &ConsultationDetails) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&ConsultationView::new(
        clock, details,
    ))?)
}

pub fn consultations(
    clock: ClinicClock,
    records: &[ConsultationDetails],
) -> anyhow::Result<String> {
    let views: Vec<ConsultationView<'_>> = records
        .iter()
        .map(|d| ConsultationView::new(clock, d))
        .collect();
    Ok(serde_json::to_string_pretty(&views)?)
}

pub fn record<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
