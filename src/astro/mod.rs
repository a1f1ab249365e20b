//! Astronomy layer
//!
//! Coordinate frames and angle formats, the catalog and ephemeris
//! resolvers, lunar geometry, trajectory sampling and visibility
//! classification. Remote services are reached through blocking HTTP.

pub mod altitude;
pub mod angles;
pub mod frames;
pub mod horizons;
pub mod moon;
pub mod simbad;
pub mod visibility;

use std::time::Duration;

use crate::config::ServiceConfig;
use crate::error::{PlannerResult, ServiceError};

/// Build the HTTP client shared by the service clients
pub fn http_client(config: &ServiceConfig) -> PlannerResult<reqwest::blocking::Client> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(ServiceError::Http)?;
    Ok(client)
}

/// Send a GET request and return the body, treating non-2xx as an error
pub(crate) fn fetch_text(
    client: &reqwest::blocking::Client,
    service: &'static str,
    url: reqwest::Url,
) -> Result<String, ServiceError> {
    log::debug!("{} request: {}", service, url);
    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(ServiceError::Status {
            service,
            status: status.as_u16(),
        });
    }
    Ok(response.text()?)
}
