//! Application state management

use crate::astro::horizons::{EphemerisService, HorizonsClient};
use crate::astro::http_client;
use crate::astro::simbad::{CatalogService, NameResolver, SesameClient, SimbadTapClient};
use crate::cache::spk::{SbdbClient, SpkLookup};
use crate::cache::{IdentifierCache, MemoryCache};
use crate::config::PlannerConfig;
use crate::error::PlannerResult;

/// Remote services the commands talk to
pub struct Services {
    pub resolver: Box<dyn NameResolver>,
    pub catalog: Box<dyn CatalogService>,
    pub ephemeris: Box<dyn EphemerisService>,
    pub spk_lookup: Box<dyn SpkLookup>,
}

/// Application state shared across commands
pub struct AppState {
    pub config: PlannerConfig,
    pub services: Services,
    /// Designation → SPK-ID mappings, consulted read-only
    pub cache: Box<dyn IdentifierCache>,
}

impl AppState {
    /// State backed by the real HTTP services named in `config`
    pub fn new(config: PlannerConfig) -> PlannerResult<Self> {
        let client = http_client(&config.services)?;
        let urls = &config.services;
        let services = Services {
            resolver: Box::new(SesameClient::new(client.clone(), urls.sesame_url.clone())),
            catalog: Box::new(SimbadTapClient::new(client.clone(), urls.simbad_tap_url.clone())),
            ephemeris: Box::new(HorizonsClient::new(client.clone(), urls.horizons_url.clone())),
            spk_lookup: Box::new(SbdbClient::new(client, urls.sbdb_url.clone())),
        };
        Ok(Self::with_services(config, services))
    }

    pub fn with_services(config: PlannerConfig, services: Services) -> Self {
        Self {
            config,
            services,
            cache: Box::new(MemoryCache::new()),
        }
    }

    pub fn with_cache(mut self, cache: impl IdentifierCache + 'static) -> Self {
        self.cache = Box::new(cache);
        self
    }
}
