//! End-to-end command tests against in-process fake services

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use astra_planner::astro::altitude::DayStatus;
use astra_planner::astro::frames::{EquatorialCoordinate, Frame};
use astra_planner::astro::horizons::{EphemerisQuery, EphemerisRow, EphemerisService, Epochs};
use astra_planner::astro::simbad::{CatalogService, NameResolver};
use astra_planner::cache::spk::SpkLookup;
use astra_planner::cache::{IdentifierCache, MemoryCache};
use astra_planner::commands::{
    self, ConstraintsInput, LocationInput, TargetInput, WindowInput,
};
use astra_planner::config::PlannerConfig;
use astra_planner::error::ServiceError;
use astra_planner::state::{AppState, Services};

struct Sesame;

impl NameResolver for Sesame {
    fn resolve(&self, name: &str) -> Result<EquatorialCoordinate, ServiceError> {
        match name {
            "M42" | "Orion Nebula" => Ok(EquatorialCoordinate::icrs(83.822, -5.391)),
            _ => Err(ServiceError::NotFound {
                service: "Sesame",
                query: name.to_string(),
            }),
        }
    }
}

struct Tap;

impl CatalogService for Tap {
    fn main_identifier(&self, name: &str) -> Result<Option<String>, ServiceError> {
        Ok((name == "Orion Nebula").then(|| "M  42".to_string()))
    }
}

/// Answers every small-body query except strict ones; rows step through RA
struct Horizons {
    commands: Rc<RefCell<Vec<String>>>,
}

impl EphemerisService for Horizons {
    fn ephemerides(&self, query: &EphemerisQuery) -> Result<Vec<EphemerisRow>, ServiceError> {
        self.commands.borrow_mut().push(query.command());
        if query.command().ends_with("CAP;") {
            return Err(ServiceError::rejected("Horizons", "No matches found."));
        }

        let count = match &query.epochs {
            Epochs::Single(_) => 1,
            Epochs::Range {
                start,
                stop,
                step_minutes,
            } => ((*stop - *start).num_minutes() / step_minutes + 1) as usize,
        };
        Ok((0..count)
            .map(|i| EphemerisRow {
                ra_deg: 60.0 + i as f64 * 0.01,
                dec_deg: 20.0,
            })
            .collect())
    }
}

struct Sbdb;

impl SpkLookup for Sbdb {
    fn spk_id(&self, query: &str) -> Result<Option<String>, ServiceError> {
        Ok(match query {
            "433 Eros" => Some("20000433".to_string()),
            "C/2024 G3" => Some("1003993".to_string()),
            _ => None,
        })
    }
}

fn state() -> (AppState, Rc<RefCell<Vec<String>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let services = Services {
        resolver: Box::new(Sesame),
        catalog: Box::new(Tap),
        ephemeris: Box::new(Horizons {
            commands: Rc::clone(&seen),
        }),
        spk_lookup: Box::new(Sbdb),
    };
    (AppState::with_services(PlannerConfig::default(), services), seen)
}

fn new_york() -> LocationInput {
    LocationInput {
        latitude: 40.7,
        longitude: -74.0,
        elevation: 10.0,
        name: Some("New York".to_string()),
    }
}

fn evening() -> WindowInput {
    WindowInput {
        start: DateTime::parse_from_rfc3339("2026-02-13T19:00:00-05:00").unwrap(),
        duration_minutes: None,
        step_minutes: None,
    }
}

fn orion() -> TargetInput {
    TargetInput::Catalog {
        name: "Orion Nebula".to_string(),
    }
}

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-02-13T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn catalog_target_uses_canonical_name_and_date_frame() {
    let (state, _) = state();
    let resolved = commands::resolve_target(&state, orion(), now()).unwrap();

    assert_eq!(resolved.name, "M  42");
    assert_eq!(resolved.coordinate.frame, Frame::equinox_of(&now()));
    assert!(resolved.ra.starts_with("05:"));
    assert!(resolved.dec.starts_with("-05:"));
}

#[test]
fn unknown_catalog_target_reports_one_failure() {
    let (state, _) = state();
    let err = commands::resolve_target(
        &state,
        TargetInput::Catalog {
            name: "Nonexistent Nebula".to_string(),
        },
        now(),
    )
    .unwrap_err();

    assert!(err.starts_with("SIMBAD lookup failed for Nonexistent Nebula"), "{}", err);
}

#[test]
fn manual_target_round_trips_and_gets_default_name() {
    let (state, _) = state();
    let resolved = commands::resolve_target(
        &state,
        TargetInput::Manual {
            name: None,
            ra: "15h59m30s".to_string(),
            dec: "25d55m13s".to_string(),
        },
        now(),
    )
    .unwrap();

    assert_eq!(resolved.name, "Custom Target");
    assert_eq!(resolved.ra, "15:59:30.00");
    assert_eq!(resolved.dec, "25:55:13.00");
    assert_eq!(resolved.coordinate.frame, Frame::Icrs);
}

#[test]
fn malformed_manual_coordinates_are_rejected() {
    let (state, _) = state();
    let err = commands::resolve_target(
        &state,
        TargetInput::Manual {
            name: None,
            ra: "fifteen".to_string(),
            dec: "25d55m13s".to_string(),
        },
        now(),
    )
    .unwrap_err();

    assert!(err.contains("Invalid coordinates format"), "{}", err);
}

#[test]
fn small_body_falls_back_to_free_text() {
    let (state, seen) = state();
    let resolved = commands::resolve_target(
        &state,
        TargetInput::SmallBody {
            designation: "12P/Pons-Brooks".to_string(),
        },
        now(),
    )
    .unwrap();

    assert_eq!(resolved.name, "12P/Pons-Brooks");
    assert_eq!(resolved.coordinate.ra_deg, 60.0);
    assert_eq!(
        *seen.borrow(),
        vec!["12P/Pons-Brooks; CAP;".to_string(), "12P/Pons-Brooks".to_string()]
    );
}

#[test]
fn cached_identifier_skips_cascade() {
    let (state, seen) = state();
    let cache = MemoryCache::from_json(r#"{"12P/Pons-Brooks": "1000110"}"#).unwrap();
    let state = state.with_cache(cache);

    let resolved = commands::resolve_target(
        &state,
        TargetInput::SmallBody {
            designation: "12P/Pons-Brooks".to_string(),
        },
        now(),
    )
    .unwrap();

    assert_eq!(resolved.spk_id.as_deref(), Some("1000110"));
    assert_eq!(*seen.borrow(), vec!["1000110".to_string()]);
}

#[test]
fn trajectory_of_catalog_target() {
    let (state, _) = state();
    let report = commands::calculate_trajectory(&state, orion(), new_york(), evening()).unwrap();

    assert_eq!(report.name, "M  42");
    assert_eq!(report.day_status, DayStatus::RisesAndSets);
    assert_eq!(report.rows.len(), 25);
    assert_eq!(report.rows[0].local_time, "2026-02-13 19:00:00");
    assert_eq!(report.rows[0].utc_time, "2026-02-14 00:00:00");
    assert_eq!(report.rows[24].local_time, "2026-02-13 23:00:00");

    let peak = report.peak.unwrap();
    assert!(peak.altitude > 40.0, "peak {}", peak.altitude);
    assert!(["SSE", "S", "SSW"].contains(&peak.direction.as_str()));
}

#[test]
fn trajectory_of_moving_target_uses_each_ephemeris_row() {
    let (state, seen) = state();
    let report = commands::calculate_trajectory(
        &state,
        TargetInput::SmallBody {
            designation: "C/2023 A3 (Tsuchinshan-ATLAS)".to_string(),
        },
        new_york(),
        WindowInput {
            duration_minutes: Some(60),
            step_minutes: Some(15),
            ..evening()
        },
    )
    .unwrap();

    assert_eq!(report.rows.len(), 5);
    assert_ne!(report.rows[0].ra, report.rows[4].ra);
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn planet_trajectory_uses_major_body_id() {
    let (state, seen) = state();
    let report = commands::calculate_trajectory(
        &state,
        TargetInput::Planet {
            name: "Jupiter".to_string(),
        },
        new_york(),
        evening(),
    )
    .unwrap();

    assert_eq!(report.name, "Jupiter");
    assert_eq!(report.rows.len(), 25);
    assert_eq!(*seen.borrow(), vec!["599".to_string()]);
}

#[test]
fn visibility_with_and_without_direction_filter() {
    let (state, _) = state();

    let open = commands::check_visibility(&state, orion(), new_york(), evening(), ConstraintsInput::default())
        .unwrap();
    assert!(open.verdict.observable);
    assert!(open.verdict.reason.is_none());
    assert!(open.verdict.moon_status.is_some());

    let north_only = ConstraintsInput {
        directions: vec!["N".to_string()],
        ..Default::default()
    };
    let blocked = commands::check_visibility(&state, orion(), new_york(), evening(), north_only).unwrap();
    assert!(!blocked.verdict.observable);
    assert_eq!(blocked.verdict.reason.as_deref(), Some("Not visible during window"));
}

#[test]
fn southern_target_never_rises_from_new_york() {
    let (state, _) = state();
    let report = commands::check_visibility(
        &state,
        TargetInput::Manual {
            name: Some("47 Tuc".to_string()),
            ra: "00:24:05.36".to_string(),
            dec: "-72:04:52.6".to_string(),
        },
        new_york(),
        evening(),
        ConstraintsInput::default(),
    )
    .unwrap();

    assert_eq!(report.name, "47 Tuc");
    assert_eq!(report.day_status, DayStatus::NeverRises);
    assert_eq!(report.verdict.reason.as_deref(), Some("Never Rises"));
}

#[test]
fn circumpolar_target_above_the_band_never_enters_it() {
    let (state, _) = state();
    let polaris = TargetInput::Manual {
        name: Some("Polaris".to_string()),
        ra: "02:31:49.09".to_string(),
        dec: "+89:15:50.8".to_string(),
    };
    let low_band = ConstraintsInput {
        max_altitude: Some(30.0),
        ..Default::default()
    };
    let report = commands::check_visibility(&state, polaris.clone(), new_york(), evening(), low_band).unwrap();
    assert_eq!(report.day_status, DayStatus::NeverRises);
    assert_eq!(report.verdict.reason.as_deref(), Some("Never Rises"));

    let open = commands::check_visibility(&state, polaris, new_york(), evening(), ConstraintsInput::default())
        .unwrap();
    assert_eq!(open.day_status, DayStatus::AlwaysAbove);
    assert!(open.verdict.observable);
}

#[test]
fn bad_inputs_are_reported() {
    let (state, _) = state();

    let off_planet = LocationInput {
        latitude: 95.0,
        ..new_york()
    };
    let err = commands::calculate_trajectory(&state, orion(), off_planet, evening()).unwrap_err();
    assert!(err.contains("Invalid location"), "{}", err);

    let zero_step = WindowInput {
        step_minutes: Some(0),
        ..evening()
    };
    let err = commands::calculate_trajectory(&state, orion(), new_york(), zero_step).unwrap_err();
    assert!(err.contains("Invalid observation window"), "{}", err);

    let endless = WindowInput {
        duration_minutes: Some(9_223_372_036_854_775),
        ..evening()
    };
    let err = commands::calculate_trajectory(&state, orion(), new_york(), endless).unwrap_err();
    assert!(err.contains("Invalid observation window"), "{}", err);

    let huge = WindowInput {
        duration_minutes: Some(9_223_372_036_854),
        ..evening()
    };
    let err = commands::check_visibility(&state, orion(), new_york(), huge, ConstraintsInput::default())
        .unwrap_err();
    assert!(err.contains("Invalid observation window"), "{}", err);

    let off_minute = WindowInput {
        start: DateTime::parse_from_rfc3339("2026-02-13T19:00:30-05:00").unwrap(),
        ..evening()
    };
    let jupiter = TargetInput::Planet {
        name: "Jupiter".to_string(),
    };
    let err = commands::calculate_trajectory(&state, jupiter, new_york(), off_minute).unwrap_err();
    assert!(err.contains("whole minute"), "{}", err);

    let bad_direction = ConstraintsInput {
        directions: vec!["Up".to_string()],
        ..Default::default()
    };
    assert!(commands::check_visibility(&state, orion(), new_york(), evening(), bad_direction).is_err());
}

#[test]
fn populate_cache_keeps_only_valid_identifiers() {
    let (state, _) = state();
    let outcome = commands::populate_cache(
        &state,
        vec!["433 Eros".to_string(), "C/2024 G3 (ATLAS)".to_string()],
        "comets".to_string(),
        HashMap::new(),
    )
    .unwrap();

    assert_eq!(
        outcome.resolved.get("C/2024 G3 (ATLAS)").map(String::as_str),
        Some("1003993")
    );
    assert_eq!(outcome.failed, vec!["433 Eros".to_string()]);

    assert!(commands::populate_cache(&state, vec![], "moons".to_string(), HashMap::new()).is_err());
}

#[test]
fn cache_file_update_keeps_unrelated_entries() {
    let (state, _) = state();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, r#"{"1P/Halley": "1000036", "1 Ceres": "2000001"}"#).unwrap();

    let update = commands::update_cache_file(&state, vec![], "comets".to_string(), &path).unwrap();
    assert_eq!(update.total, 2);
    assert!(update.outcome.resolved.is_empty());

    let update = commands::update_cache_file(
        &state,
        vec!["1P/Halley".to_string(), "C/2024 G3 (ATLAS)".to_string()],
        "comets".to_string(),
        &path,
    )
    .unwrap();
    assert_eq!(update.total, 3);

    let written = MemoryCache::load(&path).unwrap();
    assert_eq!(written.lookup("1P/Halley").as_deref(), Some("1000036"));
    assert_eq!(written.lookup("1 Ceres").as_deref(), Some("2000001"));
    assert_eq!(written.lookup("C/2024 G3 (ATLAS)").as_deref(), Some("1003993"));
}
