use crate::error::{ApiError, Result};

pub mod capacity_service;
pub mod catalog_service;
pub mod email_verification_service;
pub mod patient_service;
pub mod scheduling_service;

pub use capacity_service::{CapacityCreated, CapacityService};
pub use catalog_service::CatalogService;
pub use email_verification_service::{EmailVerdict, EmailVerificationService};
pub use patient_service::PatientService;
pub use scheduling_service::SchedulingService;

/// Accepts a caller-supplied identifier as a single URL path segment.
///
/// Dot segments and percent escapes are refused as well, since URL parsing
/// would resolve them against the parent path.
pub(crate) fn path_segment(value: &str) -> Result<&str> {
    let value = value.trim();
    if value.is_empty() || value.contains(['/', '\\', '?', '#', '%']) || value.chars().all(|c| c == '.') {
        return Err(ApiError::BadRequest(format!("invalid identifier: {value:?}")));
    }
    Ok(value)
}
