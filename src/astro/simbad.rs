//! SIMBAD lookup
//!
//! Resolves star, galaxy and nebula names. Coordinates come from the CDS
//! Sesame name resolver; the canonical designation comes from a SIMBAD TAP
//! query against the `basic`/`ident` tables.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::frames::{EquatorialCoordinate, Frame};
use super::fetch_text;
use crate::error::{PlannerError, PlannerResult, ServiceError};

pub const SERVICE: &str = "SIMBAD";
const SESAME: &str = "Sesame";
const TAP: &str = "SIMBAD TAP";

static SESAME_POSITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^%J\s+([0-9.]+)\s+([+\-]?[0-9.]+)").unwrap());

/// Turns an object name into a catalog-frame position
pub trait NameResolver {
    fn resolve(&self, name: &str) -> Result<EquatorialCoordinate, ServiceError>;
}

/// Looks up the canonical identifier for an object name
pub trait CatalogService {
    fn main_identifier(&self, name: &str) -> Result<Option<String>, ServiceError>;
}

/// Result from a SIMBAD object lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimbadObject {
    /// Canonical identifier, or the requested name when none was found
    pub name: String,
    /// Position in the equinox-of-date frame
    pub coordinate: EquatorialCoordinate,
}

/// Look up an astronomical object and express it in the frame of `now`.
///
/// A missing canonical identifier is not an error; the input name is used.
pub fn lookup_object(
    name: &str,
    now: &DateTime<Utc>,
    resolver: &dyn NameResolver,
    catalog: &dyn CatalogService,
) -> PlannerResult<SimbadObject> {
    let query = name.trim();
    if query.is_empty() {
        return Err(PlannerError::resolution(
            SERVICE,
            name,
            ServiceError::NotFound {
                service: SESAME,
                query: String::new(),
            }
            .into(),
        ));
    }

    let catalog_position = resolver
        .resolve(query)
        .map_err(|e| PlannerError::resolution(SERVICE, query, e.into()))?;

    let coordinate = catalog_position
        .to_frame(Frame::equinox_of(now))
        .at_epoch(*now);

    let display_name = match catalog.main_identifier(query) {
        Ok(Some(main_id)) => main_id,
        Ok(None) => {
            log::warn!("No SIMBAD main identifier for '{}', keeping input name", query);
            query.to_string()
        }
        Err(e) => {
            log::warn!("SIMBAD identifier query for '{}' failed: {}", query, e);
            query.to_string()
        }
    };

    log::info!(
        "Resolved '{}' as {} (RA {:.4}, Dec {:.4})",
        query,
        display_name,
        coordinate.ra_deg,
        coordinate.dec_deg
    );

    Ok(SimbadObject {
        name: display_name,
        coordinate,
    })
}

/// CDS Sesame client
pub struct SesameClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl SesameClient {
    pub fn new(client: reqwest::blocking::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl NameResolver for SesameClient {
    fn resolve(&self, name: &str) -> Result<EquatorialCoordinate, ServiceError> {
        let mut url =
            reqwest::Url::parse(&self.base_url).map_err(|e| ServiceError::parse(SESAME, e.to_string()))?;
        url.set_query(Some(name));

        let body = fetch_text(&self.client, SESAME, url)?;
        parse_sesame(&body, name)
    }
}

/// Pull the J2000 position out of a Sesame `-oI` text response
pub fn parse_sesame(body: &str, name: &str) -> Result<EquatorialCoordinate, ServiceError> {
    let caps = SESAME_POSITION
        .captures(body)
        .ok_or_else(|| ServiceError::NotFound {
            service: SESAME,
            query: name.to_string(),
        })?;

    let ra: f64 = caps[1]
        .parse()
        .map_err(|_| ServiceError::parse(SESAME, format!("bad RA '{}'", &caps[1])))?;
    let dec: f64 = caps[2]
        .parse()
        .map_err(|_| ServiceError::parse(SESAME, format!("bad Dec '{}'", &caps[2])))?;

    Ok(EquatorialCoordinate::icrs(ra, dec))
}

/// SIMBAD TAP client for canonical identifiers
pub struct SimbadTapClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TapResponse {
    #[serde(default)]
    data: Vec<Vec<serde_json::Value>>,
}

impl SimbadTapClient {
    pub fn new(client: reqwest::blocking::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl CatalogService for SimbadTapClient {
    fn main_identifier(&self, name: &str) -> Result<Option<String>, ServiceError> {
        let url = reqwest::Url::parse_with_params(
            &self.base_url,
            &[
                ("request", "doQuery"),
                ("lang", "adql"),
                ("format", "json"),
                ("query", main_id_query(name).as_str()),
            ],
        )
        .map_err(|e| ServiceError::parse(TAP, e.to_string()))?;

        let body = fetch_text(&self.client, TAP, url)?;
        parse_main_identifier(&body)
    }
}

/// ADQL selecting the main identifier of any object known by `name`
pub fn main_id_query(name: &str) -> String {
    format!(
        "SELECT basic.main_id FROM basic JOIN ident ON ident.oidref = basic.oid WHERE ident.id = '{}'",
        name.replace('\'', "''")
    )
}

/// First `main_id` of a TAP JSON result, if any
pub fn parse_main_identifier(body: &str) -> Result<Option<String>, ServiceError> {
    let response: TapResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::parse(TAP, e.to_string()))?;

    Ok(response
        .data
        .first()
        .and_then(|row| row.first())
        .and_then(|value| value.as_str())
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty()))
}
