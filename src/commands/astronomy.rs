//! Astronomy commands for trajectories and visibility checks

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::targets::{target_path, TargetInput};
use crate::astro::altitude::{
    self, DayStatus, ObservationWindow, ObserverLocation, Trajectory, TrajectoryRow,
};
use crate::astro::visibility::{self, AltitudeBand, CompassOctant, ObservabilityVerdict, VisibilityConstraints};
use crate::error::PlannerResult;
use crate::state::AppState;

/// Observer location input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationInput {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
    pub name: Option<String>,
}

impl From<LocationInput> for ObserverLocation {
    fn from(input: LocationInput) -> Self {
        ObserverLocation {
            latitude: input.latitude,
            longitude: input.longitude,
            elevation: input.elevation,
            name: input.name,
        }
    }
}

/// Observation window input; missing fields come from the config defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInput {
    pub start: DateTime<FixedOffset>,
    pub duration_minutes: Option<i64>,
    pub step_minutes: Option<i64>,
}

/// Visibility filters; missing fields come from the config defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintsInput {
    pub min_altitude: Option<f64>,
    pub max_altitude: Option<f64>,
    /// Octant labels such as "N" or "SW"
    #[serde(default)]
    pub directions: Vec<String>,
    pub min_moon_separation: Option<f64>,
}

/// Altitude/azimuth table for one target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryReport {
    pub name: String,
    pub day_status: DayStatus,
    pub rows: Vec<TrajectoryRow>,
    /// Row with the highest altitude
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak: Option<TrajectoryRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityReport {
    pub name: String,
    pub day_status: DayStatus,
    pub verdict: ObservabilityVerdict,
}

/// Calculate altitude and azimuth over a window for plotting or tables
pub fn calculate_trajectory(
    state: &AppState,
    target: TargetInput,
    location: LocationInput,
    window: WindowInput,
) -> Result<TrajectoryReport, String> {
    let defaults = &state.config.defaults;
    let band = AltitudeBand::new(defaults.min_altitude, defaults.max_altitude).map_err(|e| e.to_string())?;
    let (name, window, trajectory) =
        plan(state, &target, location, window, &band).map_err(|e| e.to_string())?;

    let rows = altitude::trajectory_rows(&name, &trajectory, window.start.offset());
    let peak = trajectory
        .peak()
        .and_then(|p| trajectory.samples.iter().position(|s| s.instant == p.instant))
        .and_then(|i| rows.get(i).cloned());

    Ok(TrajectoryReport {
        name,
        day_status: trajectory.day_status,
        rows,
        peak,
    })
}

/// Decide whether a target can be observed in a window under the given filters
pub fn check_visibility(
    state: &AppState,
    target: TargetInput,
    location: LocationInput,
    window: WindowInput,
    constraints: ConstraintsInput,
) -> Result<VisibilityReport, String> {
    let constraints = build_constraints(state, constraints).map_err(|e| e.to_string())?;
    let (name, _, trajectory) = plan(state, &target, location, window, &constraints.altitude)
        .map_err(|e| e.to_string())?;

    let verdict = visibility::classify(&trajectory, &constraints);
    log::info!(
        "{}: {}",
        name,
        if verdict.observable { "observable" } else { "not observable" }
    );

    Ok(VisibilityReport {
        name,
        day_status: trajectory.day_status,
        verdict,
    })
}

fn plan(
    state: &AppState,
    target: &TargetInput,
    location: LocationInput,
    window: WindowInput,
    band: &AltitudeBand,
) -> PlannerResult<(String, ObservationWindow, Trajectory)> {
    let location: ObserverLocation = location.into();
    location.validate()?;

    let defaults = &state.config.defaults;
    let window = ObservationWindow::from_minutes(
        window.start,
        window.duration_minutes.unwrap_or(defaults.duration_minutes),
        window.step_minutes.unwrap_or(defaults.step_minutes),
    )?;

    let (name, path) = target_path(state, target, &window)?;
    let trajectory = altitude::sample_trajectory(&path, &location, &window, band)?;
    Ok((name, window, trajectory))
}

fn build_constraints(state: &AppState, input: ConstraintsInput) -> PlannerResult<VisibilityConstraints> {
    let defaults = &state.config.defaults;
    let altitude = AltitudeBand::new(
        input.min_altitude.unwrap_or(defaults.min_altitude),
        input.max_altitude.unwrap_or(defaults.max_altitude),
    )?;
    let directions = input
        .directions
        .iter()
        .map(|d| d.parse::<CompassOctant>())
        .collect::<PlannerResult<Vec<_>>>()?;

    Ok(VisibilityConstraints {
        altitude,
        directions,
        min_moon_separation: input.min_moon_separation,
    })
}
