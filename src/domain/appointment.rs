use crate::domain::rut::validate_rut;
use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};

/// Channel code marking actions taken by the chatbot.
const CHATBOT_CHANNEL: &str = "CB";

/// Human-readable label for an appointment status code.
///
/// Unknown codes are echoed back unchanged; a missing code reads as "Desconocido".
#[must_use]
pub fn status_label(code: Option<&str>, channel: Option<&str>) -> String {
    match code {
        Some("A") => "Atendido".to_string(),
        Some("^") => "No Confirmado".to_string(),
        Some("*") => "Confirmado".to_string(),
        Some("P") => "Pagado".to_string(),
        Some("t") => "No Contactado".to_string(),
        Some("x") if channel == Some(CHATBOT_CHANNEL) => "Anulado CB".to_string(),
        Some("x") => "Anulado".to_string(),
        Some("c") => "Confirmado CB".to_string(),
        Some(other) if !other.is_empty() => other.to_string(),
        _ => "Desconocido".to_string(),
    }
}

/// A slot picked from the availability listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedSlot {
    pub professional_id: i64,
    pub date: String,
    pub hour: String,
    pub facility_id: i64,
    pub categorie_id: i64,
}

/// Body of `POST /appointments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentRequest {
    pub rut: String,
    pub professional_id: i64,
    pub date: String,
    pub hour: String,
    pub facility_id: i64,
    pub categorie_id: i64,
    pub platform_id: u32,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl AppointmentRequest {
    /// Assembles a booking. Blank comments are dropped; others are trimmed.
    #[must_use]
    pub fn new(rut: String, slot: SelectedSlot, platform_id: u32, user_id: i64, comment: Option<&str>) -> Self {
        let comment = comment.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string);
        Self {
            rut,
            professional_id: slot.professional_id,
            date: slot.date,
            hour: slot.hour,
            facility_id: slot.facility_id,
            categorie_id: slot.categorie_id,
            platform_id,
            user_id,
            comment,
        }
    }
}

/// Who the searched document number belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientDocument {
    /// Chilean RUT; must carry a valid check digit.
    National(String),
    /// Foreign document; the backend keys it by number followed by the ISO country code.
    Foreign { number: String, country_code: Option<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentSearch {
    pub start: String,
    pub end: String,
    pub document: Option<PatientDocument>,
    pub facility_id: Option<i64>,
    pub professional_id: Option<i64>,
}

impl AppointmentSearch {
    /// Validates the filters and renders them as query parameters.
    ///
    /// # Errors
    /// Returns `BadRequest` for an invalid RUT or a foreign document without a country.
    pub fn to_query(&self) -> Result<Vec<(&'static str, String)>> {
        let mut query = vec![("start", self.start.clone()), ("end", self.end.clone())];

        match &self.document {
            Some(PatientDocument::National(rut)) if !rut.trim().is_empty() => {
                if !validate_rut(rut) {
                    return Err(ApiError::BadRequest("El RUT ingresado no es válido.".into()));
                }
                query.push(("rut", rut.trim().to_string()));
            }
            Some(PatientDocument::Foreign { number, country_code }) if !number.trim().is_empty() => {
                let country = country_code
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| ApiError::BadRequest("Si es extranjero, debe seleccionar un país.".into()))?;
                query.push(("rut", format!("{}{country}", number.trim())));
            }
            _ => {}
        }

        if let Some(facility) = self.facility_id {
            query.push(("facility_id", facility.to_string()));
        }
        if let Some(professional) = self.professional_id {
            query.push(("professional_id", professional.to_string()));
        }

        Ok(query)
    }
}

/// Query for `GET /availability`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityQuery {
    pub categorie_id: i64,
    pub age: u32,
    pub facility_id: i64,
}

impl AvailabilityQuery {
    /// # Errors
    /// Returns `BadRequest` when any parameter is missing (zero).
    pub fn to_query(self) -> Result<Vec<(&'static str, String)>> {
        if self.categorie_id == 0 || self.age == 0 || self.facility_id == 0 {
            return Err(ApiError::BadRequest(
                "Missing required parameters (categorie, age, facility) for availability".into(),
            ));
        }
        Ok(vec![
            ("categorie", self.categorie_id.to_string()),
            ("age", self.age.to_string()),
            ("facility", self.facility_id.to_string()),
        ])
    }
}
