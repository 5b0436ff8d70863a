use crate::api::ApiClient;
use crate::domain::capacity::CapacityRequest;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of opening capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityCreated {
    /// Identifier of the generated opening event.
    #[serde(default)]
    pub apertura_event_id: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug)]
pub struct CapacityService {
    client: ApiClient,
}

impl CapacityService {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Opens a provider's schedule, optionally repeating it.
    ///
    /// # Errors
    /// Returns `BadRequest` without calling the backend when the request is incomplete.
    #[tracing::instrument(
        err,
        skip(self, request),
        fields(facility = request.centro_id, provider = request.proveedor_id)
    )]
    pub async fn create(&self, request: CapacityRequest) -> Result<CapacityCreated> {
        let request = request.validated()?;
        let created: CapacityCreated = self.client.post("/capacity", &request).await?;
        tracing::info!(opening = ?created.apertura_event_id, "Capacity created");
        Ok(created)
    }
}
