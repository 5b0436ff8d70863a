use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub isonum: Value,
    pub nombre: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A branch of the clinic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Consulting room inside a facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentBox {
    pub id: i64,
    pub nombre: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialty {
    pub title: String,
    #[serde(deserialize_with = "option_id")]
    pub option_id: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Specialty ids are sent as strings.
fn option_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().ok_or_else(|| serde::de::Error::custom("option_id out of range")),
        Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!("invalid option_id {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_specialty_option_id_as_string() {
        let specialty: Specialty =
            serde_json::from_value(json!({ "title": "Cardiología", "option_id": "14", "active": 1 })).unwrap();
        assert_eq!(specialty.option_id, 14);
        assert_eq!(specialty.extra["active"], json!(1));

        let specialty: Specialty = serde_json::from_value(json!({ "title": "Dermatología", "option_id": 9 })).unwrap();
        assert_eq!(specialty.option_id, 9);
    }
}
