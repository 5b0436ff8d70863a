use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Codes substituted when the patient record leaves a catalog field empty.
///
/// These mirror what the registration desk has always submitted; they are
/// business defaults, not something the backend requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientDefaults {
    pub financer: i64,
    pub nationality: i64,
    pub region: i64,
    pub commune: i64,
    pub occupation: i64,
}

impl Default for PatientDefaults {
    fn default() -> Self {
        Self { financer: 1, nationality: 1, region: 13, commune: 101, occupation: 1 }
    }
}

/// Patient data as the forms and the lookup endpoint name it. Several fields
/// exist under two spellings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PatientDetails {
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub paterno: Option<String>,
    #[serde(default)]
    pub materno: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub correo: Option<String>,
    #[serde(default)]
    pub celular: Option<String>,
    #[serde(default)]
    pub telefono_casa: Option<String>,
    #[serde(default)]
    pub fecha_de_nacimiento: Option<String>,
    #[serde(default)]
    pub fecha_nacimiento: Option<String>,
    #[serde(default)]
    pub sexo: Option<String>,
    #[serde(default, deserialize_with = "code")]
    pub prevision: Option<i64>,
    #[serde(default, deserialize_with = "code")]
    pub country_code: Option<i64>,
    #[serde(default, deserialize_with = "code")]
    pub state: Option<i64>,
    #[serde(default, deserialize_with = "code")]
    pub city: Option<i64>,
    #[serde(default, deserialize_with = "code")]
    pub occupation: Option<i64>,
}

/// Body of `PUT /patients/{rut}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientUpdate {
    pub nombre: Option<String>,
    pub paterno: Option<String>,
    pub materno: Option<String>,
    pub direccion: Option<String>,
    pub correo: String,
    pub celular: Option<String>,
    pub telefono_casa: Option<String>,
    pub fecha_nacimiento: String,
    pub sexo: Option<String>,
    pub prevision: i64,
    pub nacionalidad: i64,
    pub region: i64,
    pub comuna: i64,
    pub ocupacion: i64,
}

impl PatientUpdate {
    #[must_use]
    pub fn from_details(details: PatientDetails, defaults: PatientDefaults) -> Self {
        Self {
            nombre: details.nombre,
            paterno: details.paterno,
            materno: details.materno,
            direccion: details.direccion,
            correo: details.email.or(details.correo).unwrap_or_default(),
            celular: details.celular,
            telefono_casa: details.telefono_casa,
            fecha_nacimiento: details.fecha_de_nacimiento.or(details.fecha_nacimiento).unwrap_or_default(),
            sexo: details.sexo,
            prevision: details.prevision.unwrap_or(defaults.financer),
            nacionalidad: details.country_code.unwrap_or(defaults.nationality),
            region: details.state.unwrap_or(defaults.region),
            comuna: details.city.unwrap_or(defaults.commune),
            ocupacion: details.occupation.unwrap_or(defaults.occupation),
        }
    }
}

/// Catalog codes arrive as numbers or as numeric strings depending on which
/// screen produced them. Blank strings and nulls read as absent.
fn code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            n.as_i64().map(Some).ok_or_else(|| serde::de::Error::custom(format!("invalid catalog code {n}")))
        }
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => {
            s.trim().parse().map(Some).map_err(|_| serde::de::Error::custom(format!("invalid catalog code {s:?}")))
        }
        Some(other) => Err(serde::de::Error::custom(format!("invalid catalog code {other}"))),
    }
}
