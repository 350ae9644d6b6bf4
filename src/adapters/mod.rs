// Adapters layer: concrete implementations of the domain ports against the
// cloud services' REST surfaces and the local SQL database.

pub mod blob;
pub mod cosmos;
pub mod service_bus;
pub mod signing;
pub mod sql;

use crate::utils::error::{Result, ShowcaseError};

/// Turns a non-success response into a `ServiceError` carrying the body text.
pub(crate) async fn check_response(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!("{} error response ({}): {}", service, status, body);
    Err(ShowcaseError::service(service, status.as_u16(), body))
}

/// 409 Conflict means the resource we tried to create is already there.
pub(crate) fn is_conflict(err: &ShowcaseError) -> bool {
    matches!(err, ShowcaseError::ServiceError { status: 409, .. })
}
