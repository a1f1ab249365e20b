//! Planner configuration
//!
//! Service endpoints and planning defaults, read from a JSON file. Every
//! field has a default so a partial file (or none at all) is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PlannerError, PlannerResult};

/// Environment variable naming a config file to use instead of the default
pub const CONFIG_ENV_VAR: &str = "ASTRA_PLANNER_CONFIG";

const APP_DIR: &str = "astra-planner";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlannerConfig {
    pub services: ServiceConfig,
    pub defaults: PlanningDefaults,
}

/// Remote astronomy services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    /// CDS Sesame name resolver
    pub sesame_url: String,
    /// SIMBAD TAP synchronous query endpoint
    pub simbad_tap_url: String,
    /// JPL Horizons API
    pub horizons_url: String,
    /// JPL small-body database API
    pub sbdb_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Ephemeris observer location code, "500" being geocentric
    pub location_code: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sesame_url: "https://cds.unistra.fr/cgi-bin/nph-sesame/-oI/A".to_string(),
            simbad_tap_url: "https://simbad.cds.unistra.fr/simbad/sim-tap/sync".to_string(),
            horizons_url: "https://ssd.jpl.nasa.gov/api/horizons.api".to_string(),
            sbdb_url: "https://ssd-api.jpl.nasa.gov/sbdb.api".to_string(),
            timeout_secs: 10,
            user_agent: format!("astra-planner/{}", env!("CARGO_PKG_VERSION")),
            location_code: "500".to_string(),
        }
    }
}

/// Values used when a request leaves them out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanningDefaults {
    pub duration_minutes: i64,
    pub step_minutes: i64,
    pub min_altitude: f64,
    pub max_altitude: f64,
}

impl Default for PlanningDefaults {
    fn default() -> Self {
        Self {
            duration_minutes: 240,
            step_minutes: 10,
            min_altitude: 0.0,
            max_altitude: 90.0,
        }
    }
}

impl PlannerConfig {
    /// Load configuration.
    ///
    /// Looks at `explicit`, then the `ASTRA_PLANNER_CONFIG` environment
    /// variable, then the per-user config directory. Only the last may be
    /// missing.
    pub fn load(explicit: Option<&Path>) -> PlannerResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> PlannerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PlannerError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&text)
            .map_err(|e| PlannerError::Config(format!("{}: {}", path.display(), e)))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// `<config dir>/astra-planner/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }
}
