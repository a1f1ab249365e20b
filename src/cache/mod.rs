//! Resolved-identifier cache
//!
//! Maps free-text small-body designations to SPK-IDs so repeat lookups can
//! skip the ephemeris cascade. The planner only reads it; writing the file
//! back is up to the caller.

pub mod spk;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{PlannerError, PlannerResult};
use spk::ObjectClass;

pub trait IdentifierCache {
    /// SPK-ID cached for `designation`, if one is present and valid
    fn lookup(&self, designation: &str) -> Option<String>;
}

/// In-memory cache backed by a JSON object of designation → SPK-ID
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryCache {
    entries: BTreeMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a map, dropping IDs that fall outside every valid band
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut cache = Self::new();
        cache.merge(entries);
        cache
    }

    /// Insert every valid entry, replacing older IDs; returns how many were kept
    pub fn merge<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut kept = 0;
        for (designation, spk_id) in entries {
            if self.insert(designation.clone(), spk_id.clone()) {
                kept += 1;
            } else {
                log::warn!("Ignoring invalid cached SPK-ID {} for {}", spk_id, designation);
            }
        }
        kept
    }

    pub fn from_json(text: &str) -> PlannerResult<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(text)
            .map_err(|e| PlannerError::Config(format!("Invalid identifier cache: {}", e)))?;
        Ok(Self::from_entries(entries))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.entries).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn load(path: &Path) -> PlannerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PlannerError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let cache = Self::from_json(&text)?;
        log::info!("Loaded {} cached identifiers from {}", cache.len(), path.display());
        Ok(cache)
    }

    /// Insert a valid entry; returns false (and stores nothing) otherwise
    pub fn insert(&mut self, designation: String, spk_id: String) -> bool {
        if ObjectClass::of(&spk_id).is_none() {
            return false;
        }
        self.entries.insert(designation, spk_id.trim().to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl IdentifierCache for MemoryCache {
    fn lookup(&self, designation: &str) -> Option<String> {
        self.entries.get(designation.trim()).cloned()
    }
}
