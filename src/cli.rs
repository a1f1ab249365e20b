//! CLI argument definitions for astra-planner

use chrono::{DateTime, FixedOffset};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{ConstraintsInput, LocationInput, TargetInput, WindowInput};

#[derive(Parser)]
#[command(name = "astra-planner")]
#[command(about = "Resolve sky targets and plan when they are observable")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to $ASTRA_PLANNER_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON file of designation → SPK-ID mappings to consult before Horizons
    #[arg(long, global = true)]
    pub cache: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a target to RA/Dec
    Lookup(LookupArgs),

    /// Altitude/azimuth table over an observation window
    Trajectory(PlanArgs),

    /// Decide whether a target is observable in a window
    Visibility(VisibilityArgs),

    /// Resolve comet or asteroid names to SPK-IDs and write a cache file
    PopulateCache(PopulateCacheArgs),
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    /// Star, galaxy or nebula name (SIMBAD)
    #[arg(long)]
    pub object: Option<String>,

    /// Comet or asteroid designation (JPL Horizons)
    #[arg(long)]
    pub small_body: Option<String>,

    /// Planet, Sun or Moon
    #[arg(long)]
    pub planet: Option<String>,

    /// Manual coordinates as "RA,Dec", e.g. "15h59m30s,25d55m13s"
    #[arg(long)]
    pub coords: Option<String>,
}

impl TargetArgs {
    pub fn to_input(&self, name: Option<String>) -> Result<TargetInput, String> {
        if let Some(name) = &self.object {
            return Ok(TargetInput::Catalog { name: name.clone() });
        }
        if let Some(designation) = &self.small_body {
            return Ok(TargetInput::SmallBody {
                designation: designation.clone(),
            });
        }
        if let Some(name) = &self.planet {
            return Ok(TargetInput::Planet { name: name.clone() });
        }
        if let Some(coords) = &self.coords {
            let (ra, dec) = coords
                .split_once(',')
                .ok_or_else(|| format!("expected \"RA,Dec\", got '{}'", coords))?;
            return Ok(TargetInput::Manual {
                name,
                ra: ra.trim().to_string(),
                dec: dec.trim().to_string(),
            });
        }
        Err("no target given".to_string())
    }
}

#[derive(Parser)]
pub struct LookupArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Display name for manual coordinates
    #[arg(long)]
    pub name: Option<String>,

    /// Instant to resolve at (RFC 3339); defaults to now
    #[arg(long)]
    pub at: Option<DateTime<FixedOffset>>,
}

#[derive(Parser)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Display name for manual coordinates
    #[arg(long)]
    pub name: Option<String>,

    /// Observer latitude in degrees, north positive
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Observer longitude in degrees, east positive
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Observer elevation in metres
    #[arg(long, default_value = "0")]
    pub elevation: f64,

    /// Window start with its UTC offset, e.g. 2026-02-13T19:00:00-05:00
    #[arg(long)]
    pub start: DateTime<FixedOffset>,

    /// Window length in minutes
    #[arg(long)]
    pub duration: Option<i64>,

    /// Sampling step in minutes
    #[arg(long)]
    pub step: Option<i64>,
}

impl PlanArgs {
    pub fn location(&self) -> LocationInput {
        LocationInput {
            latitude: self.lat,
            longitude: self.lon,
            elevation: self.elevation,
            name: None,
        }
    }

    pub fn window(&self) -> WindowInput {
        WindowInput {
            start: self.start,
            duration_minutes: self.duration,
            step_minutes: self.step,
        }
    }
}

#[derive(Parser)]
pub struct VisibilityArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Lowest usable altitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub min_alt: Option<f64>,

    /// Highest usable altitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub max_alt: Option<f64>,

    /// Allowed directions, comma separated (N, NE, E, SE, S, SW, W, NW)
    #[arg(long, value_delimiter = ',')]
    pub directions: Vec<String>,

    /// Minimum distance from the Moon in degrees
    #[arg(long)]
    pub min_moon_sep: Option<f64>,
}

impl VisibilityArgs {
    pub fn constraints(&self) -> ConstraintsInput {
        ConstraintsInput {
            min_altitude: self.min_alt,
            max_altitude: self.max_alt,
            directions: self.directions.clone(),
            min_moon_separation: self.min_moon_sep,
        }
    }
}

#[derive(Parser)]
pub struct PopulateCacheArgs {
    /// Text file with one comet or asteroid name per line
    #[arg(long)]
    pub names: PathBuf,

    /// Object class: comets or asteroids
    #[arg(long)]
    pub class: String,

    /// Cache file to update; existing valid entries are kept
    #[arg(long)]
    pub output: PathBuf,
}
