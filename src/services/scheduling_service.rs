use crate::api::schemas::Envelope;
use crate::api::{ApiClient, ApiRequest};
use crate::domain::appointment::{AppointmentRequest, AppointmentSearch, AvailabilityQuery, SelectedSlot};
use crate::error::{ApiError, Result};
use crate::services::path_segment;
use serde_json::Value;

/// Slot availability, booking, and the appointment finder.
#[derive(Clone, Debug)]
pub struct SchedulingService {
    client: ApiClient,
}

impl SchedulingService {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Free slots for a service, patient age and facility.
    ///
    /// # Errors
    /// Returns `BadRequest` without calling the backend when a parameter is missing.
    #[tracing::instrument(err(level = "debug"), skip(self))]
    pub async fn availability(&self, query: AvailabilityQuery) -> Result<Envelope<Vec<Value>>> {
        let request = ApiRequest::get("/availability").with_query(query.to_query()?);
        self.client.request(request).await
    }

    /// Books `slot` for the patient on behalf of the logged-in user.
    ///
    /// The backend answers 2xx with `status != "success"` when the slot can no
    /// longer be taken; callers should check [`Envelope::is_success`].
    ///
    /// # Errors
    /// Returns `SessionMissing` if the session does not identify a user.
    #[tracing::instrument(err, skip(self, slot, comment), fields(rut = %rut))]
    pub async fn book(&self, rut: &str, slot: SelectedSlot, comment: Option<&str>) -> Result<Envelope<Value>> {
        let user_id = self
            .client
            .session()
            .await?
            .and_then(|s| s.user_id())
            .ok_or_else(|| {
                tracing::error!("Session does not carry a user id");
                ApiError::SessionMissing
            })?;

        let booking = AppointmentRequest::new(rut.to_string(), slot, self.client.config().platform_id, user_id, comment);
        let outcome: Envelope<Value> = self.client.post("/appointments", &booking).await?;

        if outcome.is_success() {
            tracing::info!("Appointment booked");
        } else {
            tracing::warn!(message = ?outcome.message, "Booking was not accepted");
        }
        Ok(outcome)
    }

    /// Appointments in a date range, optionally narrowed by patient, facility
    /// and professional.
    ///
    /// # Errors
    /// Returns `BadRequest` without calling the backend when the patient document is invalid.
    #[tracing::instrument(err(level = "debug"), skip(self))]
    pub async fn search(&self, search: &AppointmentSearch) -> Result<Envelope<Vec<Value>>> {
        let request = ApiRequest::get("/appointments/search").with_query(search.to_query()?);
        self.client.request(request).await
    }

    /// # Errors
    /// Returns `Http` 404 for an unknown event.
    #[tracing::instrument(err(level = "debug"), skip(self))]
    pub async fn details(&self, event_id: &str) -> Result<Envelope<Value>> {
        self.client.get(format!("/appointments/{}", path_segment(event_id)?)).await
    }
}
