//! Astra Planner - astrophotography session planning
//!
//! Resolves sky targets (catalog objects, comets and asteroids, planets or
//! hand-entered coordinates), samples their altitude and azimuth over an
//! observing window and decides whether they are observable given altitude,
//! direction and Moon constraints.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde::{Deserialize, Serialize};

pub mod astro;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod state;

use cache::MemoryCache;
use cli::{Cli, Commands};
use commands::{TrajectoryReport, VisibilityReport};
use config::PlannerConfig;
use state::AppState;

/// Get application info
pub fn get_app_info() -> AppInfo {
    AppInfo {
        name: "Astra Planner".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "Astrophotography session planner".to_string(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let info = get_app_info();
    log::debug!("{} {} - {}", info.name, info.version, info.description);

    let config = PlannerConfig::load(cli.config.as_deref())?;
    let cache = match &cli.cache {
        Some(path) => MemoryCache::load(path)?,
        None => MemoryCache::new(),
    };
    let state = AppState::new(config)?.with_cache(cache);

    match &cli.command {
        Commands::Lookup(args) => {
            let target = args.target.to_input(args.name.clone()).map_err(anyhow::Error::msg)?;
            let at = args
                .at
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);
            let resolved = commands::resolve_target(&state, target, at).map_err(anyhow::Error::msg)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                println!("{}", resolved.name);
                println!("  RA  {}", resolved.ra);
                println!("  Dec {}", resolved.dec);
                if let Some(spk_id) = &resolved.spk_id {
                    println!("  SPK-ID {}", spk_id);
                }
            }
        }
        Commands::Trajectory(args) => {
            let target = args.target.to_input(args.name.clone()).map_err(anyhow::Error::msg)?;
            let report = commands::calculate_trajectory(&state, target, args.location(), args.window())
                .map_err(anyhow::Error::msg)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_trajectory(&report);
            }
        }
        Commands::Visibility(args) => {
            let plan = &args.plan;
            let target = plan.target.to_input(plan.name.clone()).map_err(anyhow::Error::msg)?;
            let report = commands::check_visibility(
                &state,
                target,
                plan.location(),
                plan.window(),
                args.constraints(),
            )
            .map_err(anyhow::Error::msg)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_visibility(&report);
            }
        }
        Commands::PopulateCache(args) => {
            let names = read_names(&args.names)?;
            let update = commands::update_cache_file(&state, names, args.class.clone(), &args.output)
                .map_err(anyhow::Error::msg)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&update)?);
            } else {
                println!(
                    "Resolved {} of this run's names, {} identifiers now in {}",
                    update.outcome.resolved.len(),
                    update.total,
                    update.path.display()
                );
                for name in &update.outcome.failed {
                    println!("  failed: {}", name);
                }
            }
        }
    }

    Ok(())
}

fn read_names(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

fn print_trajectory(report: &TrajectoryReport) {
    println!("{} ({:?})", report.name, report.day_status);
    println!(
        "{:<19}  {:<19}  {:<11}  {:<11}  {:<12}  {:>7}  {:>7}  {:<3}",
        "Local", "UTC", "LST", "RA", "Dec", "Az", "Alt", "Dir"
    );
    for row in &report.rows {
        println!(
            "{:<19}  {:<19}  {:<11}  {:<11}  {:<12}  {:>7.2}  {:>7.2}  {:<3}",
            row.local_time, row.utc_time, row.lst, row.ra, row.dec, row.azimuth, row.altitude, row.direction
        );
    }
    if let Some(peak) = &report.peak {
        println!(
            "Highest: {:.2}° at {} toward {}",
            peak.altitude, peak.local_time, peak.direction
        );
    }
}

fn print_visibility(report: &VisibilityReport) {
    let verdict = &report.verdict;
    if verdict.observable {
        println!("{}: observable", report.name);
    } else {
        println!(
            "{}: not observable ({})",
            report.name,
            verdict.reason.as_deref().unwrap_or("unknown")
        );
    }
    if let (Some(min), Some(max)) = (verdict.min_moon_separation, verdict.max_moon_separation) {
        println!("  Moon separation {:.1}°..{:.1}°", min, max);
    }
    if let (Some(illumination), Some(status)) = (verdict.moon_illumination, verdict.moon_status) {
        println!("  Moon {:.0}% illuminated, {}", illumination, status);
    }
}
