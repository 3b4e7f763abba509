use jiff::civil::{Date, Time};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

/// Birth details a report is generated from.
///
/// Dates and times are kept exactly as the user entered them so the stored
/// snapshot never drifts from what was submitted; [`BirthInput::validate`]
/// checks that they parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BirthInput {
    pub name: String,
    /// Date of birth, `YYYY-MM-DD`.
    pub dob: String,
    /// Time of birth, `HH:MM` or `HH:MM:SS`, local to the birth place.
    pub tob: String,
    pub place: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// IANA time zone name, e.g. `Asia/Kolkata`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl BirthInput {
    pub fn new(
        name: impl Into<String>,
        dob: impl Into<String>,
        tob: impl Into<String>,
        place: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dob: dob.into(),
            tob: tob.into(),
            place: place.into(),
            latitude: None,
            longitude: None,
            timezone: None,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn birth_date(&self) -> Result<Date, CoreError> {
        self.dob
            .trim()
            .parse::<Date>()
            .map_err(|e| CoreError::InvalidInput(format!("dob {:?}: {e}", self.dob)))
    }

    pub fn birth_time(&self) -> Result<Time, CoreError> {
        let tob = self.tob.trim();
        Time::strptime("%H:%M", tob)
            .or_else(|_| Time::strptime("%H:%M:%S", tob))
            .map_err(|e| CoreError::InvalidInput(format!("tob {:?}: {e}", self.tob)))
    }

    /// Reject input that cannot produce a chart.
    ///
    /// `today` is passed in so callers decide which calendar day "now" is.
    pub fn validate(&self, today: Date) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidInput("name is required".to_string()));
        }
        if self.place.trim().is_empty() {
            return Err(CoreError::InvalidInput("place is required".to_string()));
        }

        let dob = self.birth_date()?;
        if dob > today {
            return Err(CoreError::InvalidInput(format!(
                "dob {dob} is in the future"
            )));
        }
        self.birth_time()?;

        match (self.latitude, self.longitude) {
            (Some(lat), _) if !(-90.0..=90.0).contains(&lat) => Err(CoreError::InvalidInput(
                format!("latitude {lat} out of range"),
            )),
            (_, Some(lon)) if !(-180.0..=180.0).contains(&lon) => Err(CoreError::InvalidInput(
                format!("longitude {lon} out of range"),
            )),
            (Some(_), None) | (None, Some(_)) => Err(CoreError::InvalidInput(
                "latitude and longitude must be given together".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// First name for addressing the reader, falling back to the full name.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(self.name.as_str())
    }
}
