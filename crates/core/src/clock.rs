//! Clinic wall-clock to UTC normalization.
//!
//! Clients submit consultation times as they read them off the clinic wall clock, with no offset
//! attached. Storage only ever holds absolute UTC instants. [`ClinicClock`] performs the forward
//! conversion for one configured IANA zone using the rule database bundled by `chrono-tz`, so
//! historical and seasonal offset changes are honoured rather than assuming a fixed offset.
//!
//! The forward conversion only accepts [`NaiveDateTime`]; an instant that already carries an
//! offset cannot be pushed through it a second time.

use crate::{CoreError, CoreResult};
use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;

/// How far before a skipped local time to look for the offset that applied before the jump.
/// No zone has ever skipped a full day's worth of wall-clock time in one transition.
const GAP_PROBE_HOURS: i64 = 24;

const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Converts wall-clock times in one fixed zone to and from UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClinicClock {
    zone: Tz,
}

impl ClinicClock {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    /// Looks up an IANA zone name such as `Africa/Douala`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTimeZone`] if the name is unknown to the rule database.
    pub fn from_zone_name(name: &str) -> CoreResult<Self> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| CoreError::InvalidTimeZone(name.to_string()))
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Returns the UTC instant at which the clinic wall clock shows `local`.
    ///
    /// When clocks go back and `local` occurs twice, the earlier instant is used. When clocks go
    /// forward and `local` never occurs, it is read with the offset in effect before the jump,
    /// which places it the same distance past the transition (02:30 in a skipped 02:00-03:00
    /// hour becomes 03:30 local).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidLocalTime`] if no offset can be determined for `local`.
    pub fn to_utc(&self, local: NaiveDateTime) -> CoreResult<DateTime<Utc>> {
        match self.zone.from_local_datetime(&local) {
            LocalResult::Single(at) => Ok(at.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
            LocalResult::None => self.across_gap(local),
        }
    }

    /// Returns the clinic wall-clock reading for a stored UTC instant.
    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.zone).naive_local()
    }

    fn across_gap(&self, local: NaiveDateTime) -> CoreResult<DateTime<Utc>> {
        let invalid = || CoreError::InvalidLocalTime {
            local,
            zone: self.zone.name().to_string(),
        };

        let before = local
            .checked_sub_signed(Duration::hours(GAP_PROBE_HOURS))
            .ok_or_else(invalid)?;
        let offset = self
            .zone
            .offset_from_local_datetime(&before)
            .earliest()
            .ok_or_else(invalid)?;
        let offset_secs = i64::from(offset.fix().local_minus_utc());

        let utc = local
            .checked_sub_signed(Duration::seconds(offset_secs))
            .ok_or_else(invalid)?;
        Ok(Utc.from_utc_datetime(&utc))
    }
}

/// Parses a clinic wall-clock reading such as `2024-06-15T10:00` or `2024-06-15 10:00:30`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidInput`] if the text carries a UTC offset (including `Z`) or is
/// not a date-time at all.
pub fn parse_local_date_time(input: &str) -> CoreResult<NaiveDateTime> {
    let input = input.trim();

    if DateTime::parse_from_rfc3339(input).is_ok() {
        return Err(CoreError::InvalidInput(format!(
            "'{}' carries a UTC offset; consultation times must be local wall-clock times",
            input
        )));
    }

    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "'{}' is not a local date-time (expected YYYY-MM-DDTHH:MM[:SS])",
                input
            ))
        })
}

/// Parses an absolute instant used as a filter bound.
///
/// Accepts RFC 3339 (`2024-06-15T09:00:00Z`, `2024-06-15T10:00:00+01:00`) or a bare date, which
/// means midnight UTC at the start of that day.
///
/// # Errors
///
/// Returns [`CoreError::InvalidInput`] for anything else.
pub fn parse_instant(input: &str) -> CoreResult<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "'{}' is not an RFC 3339 instant or YYYY-MM-DD date",
                input
            ))
        })
}
