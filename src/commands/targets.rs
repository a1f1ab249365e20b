//! Target commands: turning user input into sky positions

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::astro::altitude::{ObservationWindow, TargetPath};
use crate::astro::angles::{format_dms, format_hms, parse_coordinates, OUTPUT_PRECISION};
use crate::astro::frames::EquatorialCoordinate;
use crate::astro::horizons::{Epochs, MovingObjectResolver};
use crate::astro::simbad;
use crate::cache::spk::{self, ObjectClass, PopulateOutcome};
use crate::cache::MemoryCache;
use crate::error::{PlannerError, PlannerResult};
use crate::state::AppState;

pub const DEFAULT_MANUAL_NAME: &str = "Custom Target";

/// What the user asked to observe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TargetInput {
    /// Star, galaxy, nebula or anything else SIMBAD knows
    Catalog { name: String },
    /// Comet or asteroid designation
    #[serde(rename_all = "camelCase")]
    SmallBody { designation: String },
    /// Planet, Sun or Moon
    Planet { name: String },
    /// Hand-entered coordinates
    Manual {
        #[serde(default)]
        name: Option<String>,
        ra: String,
        dec: String,
    },
}

impl TargetInput {
    /// Name as typed, before resolution
    pub fn label(&self) -> &str {
        match self {
            TargetInput::Catalog { name } | TargetInput::Planet { name } => name,
            TargetInput::SmallBody { designation } => designation,
            TargetInput::Manual { name, .. } => name.as_deref().unwrap_or(DEFAULT_MANUAL_NAME),
        }
    }
}

/// A target resolved to a position at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTarget {
    pub name: String,
    pub coordinate: EquatorialCoordinate,
    /// RA as HH:MM:SS.ss
    pub ra: String,
    /// Dec as DD:MM:SS.ss
    pub dec: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spk_id: Option<String>,
}

impl ResolvedTarget {
    fn new(name: String, coordinate: EquatorialCoordinate, spk_id: Option<String>) -> Self {
        Self {
            name,
            ra: format_hms(coordinate.ra_deg, OUTPUT_PRECISION),
            dec: format_dms(coordinate.dec_deg, OUTPUT_PRECISION),
            coordinate,
            spk_id,
        }
    }
}

/// Resolve a target to its position at `at`
pub fn resolve_target(
    state: &AppState,
    target: TargetInput,
    at: DateTime<Utc>,
) -> Result<ResolvedTarget, String> {
    resolve_at(state, &target, at).map_err(|e| e.to_string())
}

pub(crate) fn resolve_at(
    state: &AppState,
    target: &TargetInput,
    at: DateTime<Utc>,
) -> PlannerResult<ResolvedTarget> {
    let moving = moving_resolver(state);

    match target {
        TargetInput::Catalog { name } => {
            let object = simbad::lookup_object(
                name,
                &at,
                state.services.resolver.as_ref(),
                state.services.catalog.as_ref(),
            )?;
            Ok(ResolvedTarget::new(object.name, object.coordinate, None))
        }
        TargetInput::SmallBody { designation } => {
            let spk_id = state.cache.lookup(designation);
            let coordinate = match &spk_id {
                Some(id) => {
                    let coords = moving.resolve_cached(designation, id, &Epochs::Single(at))?;
                    first(coords, designation)?
                }
                None => moving.resolve(designation, at)?,
            };
            Ok(ResolvedTarget::new(designation.clone(), coordinate, spk_id))
        }
        TargetInput::Planet { name } => {
            let coordinate = moving.resolve_planet(name, at)?;
            Ok(ResolvedTarget::new(name.clone(), coordinate, None))
        }
        TargetInput::Manual { ra, dec, .. } => {
            let coordinate = parse_coordinates(ra, dec)?;
            Ok(ResolvedTarget::new(target.label().to_string(), coordinate, None))
        }
    }
}

/// Display name and sky path of a target over a window.
///
/// Catalog positions are taken in the frame of the window start; moving
/// bodies get one ephemeris row per sample.
pub(crate) fn target_path(
    state: &AppState,
    target: &TargetInput,
    window: &ObservationWindow,
) -> PlannerResult<(String, TargetPath)> {
    let moving = moving_resolver(state);

    match target {
        TargetInput::Catalog { .. } | TargetInput::Manual { .. } => {
            let resolved = resolve_at(state, target, window.start_utc())?;
            Ok((resolved.name, TargetPath::Fixed(resolved.coordinate)))
        }
        TargetInput::SmallBody { designation } => {
            let coords = match state.cache.lookup(designation) {
                Some(id) => moving.resolve_cached(designation, &id, &Epochs::for_window(window)?)?,
                None => moving.ephemeris(designation, window)?,
            };
            Ok((designation.clone(), TargetPath::Moving(coords)))
        }
        TargetInput::Planet { name } => {
            let coords = moving.planet_ephemeris(name, window)?;
            Ok((name.clone(), TargetPath::Moving(coords)))
        }
    }
}

fn moving_resolver(state: &AppState) -> MovingObjectResolver<'_> {
    MovingObjectResolver::new(
        state.services.ephemeris.as_ref(),
        state.config.services.location_code.clone(),
    )
}

fn first(coords: Vec<EquatorialCoordinate>, query: &str) -> PlannerResult<EquatorialCoordinate> {
    coords
        .into_iter()
        .next()
        .ok_or_else(|| PlannerError::EmptyEphemerisResult {
            query: query.to_string(),
        })
}

/// Resolve a batch of comet or asteroid names to SPK-IDs for the cache
pub fn populate_cache(
    state: &AppState,
    names: Vec<String>,
    class: String,
    existing: HashMap<String, String>,
) -> Result<PopulateOutcome, String> {
    let class: ObjectClass = class.parse().map_err(|e: PlannerError| e.to_string())?;
    log::info!("Resolving {} {} against SBDB", names.len(), class);

    let outcome = spk::populate(
        &names,
        class,
        spk::strip_common_name,
        &existing,
        state.services.spk_lookup.as_ref(),
    );

    log::info!(
        "Resolved {}, failed {}",
        outcome.resolved.len(),
        outcome.failed.len()
    );
    Ok(outcome)
}

/// Result of refreshing a cache file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheFileUpdate {
    pub path: PathBuf,
    /// Entries in the file after writing
    pub total: usize,
    #[serde(flatten)]
    pub outcome: PopulateOutcome,
}

/// Resolve names and merge them into a cache file, keeping its other valid entries
pub fn update_cache_file(
    state: &AppState,
    names: Vec<String>,
    class: String,
    path: &Path,
) -> Result<CacheFileUpdate, String> {
    let mut cache = if path.is_file() {
        MemoryCache::load(path).map_err(|e| e.to_string())?
    } else {
        MemoryCache::new()
    };

    let outcome = populate_cache(state, names, class, cache.entries())?;
    cache.merge(outcome.resolved.clone());

    std::fs::write(path, cache.to_json())
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    log::info!("Wrote {} identifiers to {}", cache.len(), path.display());

    Ok(CacheFileUpdate {
        path: path.to_path_buf(),
        total: cache.len(),
        outcome,
    })
}
