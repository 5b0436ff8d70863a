use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};
use time::Time;
use time::macros::format_description;

/// Event category for "schedule opening".
pub const OPENING_EVENT_CATEGORY: i64 = 2;
/// Status new openings start in (not confirmed).
pub const OPENING_INITIAL_STATUS: &str = "^";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RepetitionUnit {
    Day,
    Week,
    Month,
    Year,
}

impl From<RepetitionUnit> for u8 {
    fn from(unit: RepetitionUnit) -> Self {
        match unit {
            RepetitionUnit::Day => 0,
            RepetitionUnit::Week => 1,
            RepetitionUnit::Month => 2,
            RepetitionUnit::Year => 3,
        }
    }
}

impl TryFrom<u8> for RepetitionUnit {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Day),
            1 => Ok(Self::Week),
            2 => Ok(Self::Month),
            3 => Ok(Self::Year),
            other => Err(format!("unknown repetition unit {other}")),
        }
    }
}

/// How an opening repeats until `end_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Repetition {
    /// Specific weekdays, 1 = Sunday through 7 = Saturday.
    #[serde(rename_all = "camelCase")]
    DaysOfWeek { end_date: String, days_of_week: Vec<u8> },
    /// Every `frequency` units.
    #[serde(rename_all = "camelCase")]
    Standard { end_date: String, frequency: u32, unit: RepetitionUnit },
}

impl Repetition {
    fn normalize(self) -> Result<Self> {
        match self {
            Self::DaysOfWeek { end_date, mut days_of_week } => {
                require_end_date(&end_date)?;
                if days_of_week.is_empty() {
                    return Err(ApiError::BadRequest("Select at least one weekday for the repetition".into()));
                }
                if let Some(day) = days_of_week.iter().find(|d| !(1..=7).contains(*d)) {
                    return Err(ApiError::BadRequest(format!("Invalid weekday {day}; expected 1 (Sunday) to 7")));
                }
                days_of_week.sort_unstable();
                days_of_week.dedup();
                Ok(Self::DaysOfWeek { end_date, days_of_week })
            }
            Self::Standard { end_date, frequency, unit } => {
                require_end_date(&end_date)?;
                if frequency == 0 {
                    return Err(ApiError::BadRequest("Repetition frequency must be at least 1".into()));
                }
                Ok(Self::Standard { end_date, frequency, unit })
            }
        }
    }
}

fn require_end_date(end_date: &str) -> Result<()> {
    if end_date.trim().is_empty() {
        return Err(ApiError::BadRequest("Repetition requires an end date".into()));
    }
    Ok(())
}

/// Parses `H:MM` or `H:MM:SS`, with or without a leading zero on the hour.
fn clock_time(value: &str) -> Result<Time> {
    let value = value.trim();
    Time::parse(value, format_description!("[hour padding:none]:[minute]:[second]"))
        .or_else(|_| Time::parse(value, format_description!("[hour padding:none]:[minute]")))
        .map_err(|_| ApiError::BadRequest(format!("Invalid time {value:?}; expected HH:MM")))
}

const fn opening_category() -> i64 {
    OPENING_EVENT_CATEGORY
}

fn opening_status() -> String {
    OPENING_INITIAL_STATUS.to_string()
}

/// Body of `POST /capacity`: opens a provider's agenda at a facility box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityRequest {
    pub centro_id: i64,
    pub proveedor_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub especialidad_id: Option<i64>,
    #[serde(default = "opening_category")]
    pub evento_cat_id: i64,
    pub fecha_inicio: String,
    pub hora_inicio: String,
    pub hora_fin: String,
    pub numero_box_id: i64,
    #[serde(default = "opening_status")]
    pub estado: String,
    #[serde(default)]
    pub informacion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categoria_pref_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition: Option<Repetition>,
}

impl CapacityRequest {
    /// Checks the request and canonicalizes its repetition.
    ///
    /// # Errors
    /// Returns `BadRequest` when the time range or the repetition is incomplete.
    pub fn validated(mut self) -> Result<Self> {
        if self.fecha_inicio.trim().is_empty() {
            return Err(ApiError::BadRequest("Start date is required".into()));
        }
        if clock_time(&self.hora_fin)? <= clock_time(&self.hora_inicio)? {
            return Err(ApiError::BadRequest("End time must be after start time".into()));
        }
        self.especialidad_id = self.especialidad_id.filter(|id| *id != 0);
        self.categoria_pref_id = self.categoria_pref_id.filter(|id| *id != 0);
        self.repetition = self.repetition.map(Repetition::normalize).transpose()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> CapacityRequest {
        serde_json::from_value(json!({
            "centroId": 3,
            "proveedorId": 17,
            "fechaInicio": "2025-04-01",
            "horaInicio": "08:00:00",
            "horaFin": "09:00:00",
            "numeroBoxId": 2
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_and_optional_fields() {
        let req = request().validated().unwrap();
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["eventoCatId"], json!(2));
        assert_eq!(body["estado"], json!("^"));
        assert!(body.get("especialidadId").is_none());
        assert!(body.get("repetition").is_none());

        let req = CapacityRequest { especialidad_id: Some(0), ..request() }.validated().unwrap();
        assert!(req.especialidad_id.is_none());
    }

    #[test]
    fn test_days_of_week_repetition() {
        let req = CapacityRequest {
            repetition: Some(Repetition::DaysOfWeek { end_date: "2025-06-30".into(), days_of_week: vec![6, 2, 4, 2] }),
            ..request()
        }
        .validated()
        .unwrap();

        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["repetition"], json!({ "type": "DAYS_OF_WEEK", "endDate": "2025-06-30", "daysOfWeek": [2, 4, 6] }));
    }

    #[test]
    fn test_standard_repetition() {
        let req = CapacityRequest {
            repetition: Some(Repetition::Standard { end_date: "2025-06-30".into(), frequency: 2, unit: RepetitionUnit::Week }),
            ..request()
        }
        .validated()
        .unwrap();

        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body["repetition"],
            json!({ "type": "STANDARD", "endDate": "2025-06-30", "frequency": 2, "unit": 1 })
        );
    }

    #[test]
    fn test_invalid_repetitions() {
        let missing_end = CapacityRequest {
            repetition: Some(Repetition::DaysOfWeek { end_date: String::new(), days_of_week: vec![2] }),
            ..request()
        };
        assert!(matches!(missing_end.validated(), Err(ApiError::BadRequest(_))));

        let no_days = CapacityRequest {
            repetition: Some(Repetition::DaysOfWeek { end_date: "2025-06-30".into(), days_of_week: vec![] }),
            ..request()
        };
        assert!(matches!(no_days.validated(), Err(ApiError::BadRequest(_))));

        let bad_day = CapacityRequest {
            repetition: Some(Repetition::DaysOfWeek { end_date: "2025-06-30".into(), days_of_week: vec![8] }),
            ..request()
        };
        assert!(bad_day.validated().is_err());

        let inverted = CapacityRequest { hora_fin: "07:00:00".into(), ..request() };
        assert!(inverted.validated().is_err());

        let garbled = CapacityRequest { hora_inicio: "8h".into(), ..request() };
        assert!(matches!(garbled.validated(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_unpadded_and_mixed_time_formats() {
        let req = CapacityRequest { hora_inicio: "9:00".into(), hora_fin: "10:00".into(), ..request() };
        assert!(req.validated().is_ok());

        let req = CapacityRequest { hora_inicio: "9:30".into(), hora_fin: "10:00:00".into(), ..request() };
        assert!(req.validated().is_ok());

        // 9:00 is before 10:00 even though "9" sorts after "1"
        let req = CapacityRequest { hora_inicio: "10:00".into(), hora_fin: "9:00".into(), ..request() };
        assert!(req.validated().is_err());
    }

    #[test]
    fn test_repetition_from_json() {
        let rep: Repetition =
            serde_json::from_value(json!({ "type": "STANDARD", "endDate": "2025-12-31", "frequency": 1, "unit": 2 }))
                .unwrap();
        assert_eq!(rep, Repetition::Standard { end_date: "2025-12-31".into(), frequency: 1, unit: RepetitionUnit::Month });

        assert!(serde_json::from_value::<Repetition>(json!({ "type": "STANDARD", "endDate": "x", "frequency": 1, "unit": 9 })).is_err());
    }
}
