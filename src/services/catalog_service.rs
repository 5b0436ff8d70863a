use crate::api::ApiClient;
use crate::api::schemas::Envelope;
use crate::api::schemas::catalog::{Country, Facility, Provider, Specialty, TreatmentBox};
use crate::error::Result;
use serde_json::Value;

/// Reference lists used to fill selectors: geography, insurers, specialties,
/// facilities and their staff and rooms.
#[derive(Clone, Debug)]
pub struct CatalogService {
    client: ApiClient,
}

impl CatalogService {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Propagates request errors.
    pub async fn countries(&self) -> Result<Envelope<Vec<Country>>> {
        self.client.get("/countries").await
    }

    /// # Errors
    /// Propagates request errors.
    pub async fn regions(&self) -> Result<Envelope<Vec<Value>>> {
        self.client.get("/regions").await
    }

    /// Communes of a region. Without a region there is nothing to list and no
    /// request is made.
    ///
    /// # Errors
    /// Propagates request errors.
    pub async fn communes(&self, region: Option<i64>) -> Result<Envelope<Vec<Value>>> {
        match region.filter(|id| *id != 0) {
            Some(id) => self.client.get(format!("/communes/{id}")).await,
            None => Ok(Envelope::new(Vec::new())),
        }
    }

    /// Health insurers.
    ///
    /// # Errors
    /// Propagates request errors.
    pub async fn financers(&self) -> Result<Envelope<Vec<Value>>> {
        self.client.get("/financers").await
    }

    /// # Errors
    /// Propagates request errors.
    pub async fn occupations(&self) -> Result<Envelope<Vec<Value>>> {
        self.client.get("/occupations").await
    }

    /// Specialties offered for medical consultations.
    ///
    /// # Errors
    /// Propagates request errors.
    pub async fn consultation_specialties(&self) -> Result<Envelope<Vec<Value>>> {
        self.client.get("/specialties/consultations").await
    }

    /// Every specialty, as used when opening capacity.
    ///
    /// # Errors
    /// Propagates request errors.
    pub async fn specialties(&self) -> Result<Envelope<Vec<Specialty>>> {
        self.client.get("/specialties").await
    }

    /// Billable services ("prestaciones") of a specialty.
    ///
    /// # Errors
    /// Propagates request errors.
    pub async fn prestations(&self, specialty: i64) -> Result<Envelope<Vec<Value>>> {
        self.client.get(format!("/specialties/{specialty}")).await
    }

    /// # Errors
    /// Propagates request errors.
    pub async fn facilities(&self) -> Result<Envelope<Vec<Facility>>> {
        self.client.get("/facilities").await
    }

    /// Facilities where a given service is performed.
    ///
    /// # Errors
    /// Propagates request errors.
    pub async fn facilities_for_prestation(&self, prestation: i64) -> Result<Envelope<Vec<Value>>> {
        self.client.get(format!("/facilities/by-prestation/{prestation}")).await
    }

    /// # Errors
    /// Propagates request errors.
    pub async fn providers(&self, facility: i64) -> Result<Envelope<Vec<Provider>>> {
        self.client.get(format!("/providers/by-facility/{facility}")).await
    }

    /// # Errors
    /// Propagates request errors.
    pub async fn boxes(&self, facility: i64) -> Result<Envelope<Vec<TreatmentBox>>> {
        self.client.get(format!("/boxes/by-facility/{facility}")).await
    }
}
