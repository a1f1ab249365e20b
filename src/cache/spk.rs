//! SPK-ID validation and cache population
//!
//! The small-body database hands out SPK-IDs in class-specific numeric
//! bands. It also has an internal band (20 000 000 to 29 999 999) that
//! looks like an asteroid number plus 20 million; those IDs do not work as
//! ephemeris identifiers and must never be cached.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::astro::fetch_text;
use crate::error::{PlannerError, ServiceError};

const SBDB: &str = "SBDB";

const COMET_BAND: Range<u64> = 1_000_000..2_000_000;
const ASTEROID_BAND: Range<u64> = 2_000_000..20_000_000;
const INTERNAL_BAND: Range<u64> = 20_000_000..30_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    Comet,
    Asteroid,
}

impl ObjectClass {
    fn band(self) -> Range<u64> {
        match self {
            ObjectClass::Comet => COMET_BAND,
            ObjectClass::Asteroid => ASTEROID_BAND,
        }
    }

    /// Whether `spk_id` is a usable identifier for this class
    pub fn accepts(self, spk_id: &str) -> bool {
        parse_spk_id(spk_id).is_some_and(|id| self.band().contains(&id))
    }

    /// Class whose band contains `spk_id`, if any
    pub fn of(spk_id: &str) -> Option<Self> {
        [ObjectClass::Comet, ObjectClass::Asteroid]
            .into_iter()
            .find(|class| class.accepts(spk_id))
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectClass::Comet => f.write_str("comets"),
            ObjectClass::Asteroid => f.write_str("asteroids"),
        }
    }
}

impl FromStr for ObjectClass {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comet" | "comets" => Ok(ObjectClass::Comet),
            "asteroid" | "asteroids" => Ok(ObjectClass::Asteroid),
            other => Err(PlannerError::Config(format!("unknown object class '{}'", other))),
        }
    }
}

fn parse_spk_id(spk_id: &str) -> Option<u64> {
    spk_id.trim().parse().ok()
}

/// True for IDs in the database-internal band
pub fn is_internal_id(spk_id: &str) -> bool {
    parse_spk_id(spk_id).is_some_and(|id| INTERNAL_BAND.contains(&id))
}

/// Looks up the SPK-ID for a designation
pub trait SpkLookup {
    fn spk_id(&self, query: &str) -> Result<Option<String>, ServiceError>;
}

/// Names resolved to SPK-IDs plus the names that could not be
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopulateOutcome {
    pub resolved: HashMap<String, String>,
    pub failed: Vec<String>,
}

/// Resolve a batch of names to SPK-IDs.
///
/// `to_query` turns a display name into the string sent to the lookup.
/// Names already in `existing` with a valid ID are carried over without a
/// lookup. IDs outside the class band, lookup errors and misses all land the
/// name in `failed`.
pub fn populate<F>(
    names: &[String],
    class: ObjectClass,
    to_query: F,
    existing: &HashMap<String, String>,
    lookup: &dyn SpkLookup,
) -> PopulateOutcome
where
    F: Fn(&str) -> String,
{
    let mut outcome = PopulateOutcome::default();

    for name in names {
        if let Some(cached) = existing.get(name).filter(|id| class.accepts(id)) {
            outcome.resolved.insert(name.clone(), cached.clone());
            continue;
        }

        let query = to_query(name);
        match lookup.spk_id(&query) {
            Ok(Some(spk_id)) if class.accepts(&spk_id) => {
                log::info!("{} -> {}", name, spk_id);
                outcome.resolved.insert(name.clone(), spk_id.trim().to_string());
            }
            Ok(Some(spk_id)) => {
                if is_internal_id(&spk_id) {
                    log::warn!("Dropping internal SPK-ID {} for {}", spk_id, name);
                } else {
                    log::warn!("SPK-ID {} for {} is outside the {} band", spk_id, name, class);
                }
                outcome.failed.push(name.clone());
            }
            Ok(None) => {
                log::warn!("No SPK-ID for {} (queried '{}')", name, query);
                outcome.failed.push(name.clone());
            }
            Err(e) => {
                log::warn!("SPK-ID lookup for {} failed: {}", name, e);
                outcome.failed.push(name.clone());
            }
        }
    }

    outcome
}

/// Default query form: the designation without a trailing parenthesised name
pub fn strip_common_name(name: &str) -> String {
    name.split('(').next().unwrap_or(name).trim().to_string()
}

/// JPL small-body database client
pub struct SbdbClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SbdbResponse {
    object: Option<SbdbObject>,
}

#[derive(Debug, Deserialize)]
struct SbdbObject {
    spkid: Option<serde_json::Value>,
}

impl SbdbClient {
    pub fn new(client: reqwest::blocking::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl SpkLookup for SbdbClient {
    fn spk_id(&self, query: &str) -> Result<Option<String>, ServiceError> {
        let url = reqwest::Url::parse_with_params(&self.base_url, &[("sstr", query)])
            .map_err(|e| ServiceError::parse(SBDB, e.to_string()))?;
        let body = fetch_text(&self.client, SBDB, url)?;
        parse_sbdb(&body)
    }
}

/// `object.spkid` of an SBDB response. Not-found and multiple-match replies carry no object.
pub fn parse_sbdb(body: &str) -> Result<Option<String>, ServiceError> {
    let response: SbdbResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::parse(SBDB, e.to_string()))?;

    Ok(response
        .object
        .and_then(|object| object.spkid)
        .and_then(|value| match value {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }))
}
