use crate::api::ApiClient;
use crate::domain::patient::{PatientDefaults, PatientDetails, PatientUpdate};
use crate::error::Result;
use crate::services::path_segment;
use serde_json::Value;

#[derive(Clone, Debug)]
pub struct PatientService {
    client: ApiClient,
    defaults: PatientDefaults,
}

impl PatientService {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client, defaults: PatientDefaults::default() }
    }

    #[must_use]
    pub const fn with_defaults(mut self, defaults: PatientDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Looks a patient up by document number (RUT, or foreign number plus country code).
    ///
    /// # Errors
    /// Returns `Http` 404 when the patient is not registered.
    #[tracing::instrument(err(level = "debug"), skip(self))]
    pub async fn find_by_rut(&self, rut: &str) -> Result<Value> {
        self.client.get(format!("/patients/{}", path_segment(rut)?)).await
    }

    /// # Errors
    /// Returns `Http` 404 when no patient has this id.
    #[tracing::instrument(err(level = "debug"), skip(self))]
    pub async fn find_by_id(&self, id: i64) -> Result<Value> {
        self.client.get(format!("/patients/id/{id}")).await
    }

    /// Registers a new patient. The record is forwarded as entered.
    ///
    /// # Errors
    /// Returns `Http` when the backend rejects the record.
    #[tracing::instrument(err, skip(self, patient))]
    pub async fn create(&self, patient: &Value) -> Result<Value> {
        self.client.post("/patients", patient).await
    }

    /// Updates contact and catalog data, filling empty catalog codes with the
    /// configured defaults.
    ///
    /// # Errors
    /// Returns `Http` when the backend rejects the update.
    #[tracing::instrument(err, skip(self, details))]
    pub async fn update(&self, rut: &str, details: PatientDetails) -> Result<Value> {
        let payload = PatientUpdate::from_details(details, self.defaults);
        tracing::debug!(?payload, "Updating patient");
        self.client.put(format!("/patients/{}", path_segment(rut)?), &payload).await
    }
}
