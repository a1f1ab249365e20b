//! Visibility classification
//!
//! Checks a trajectory against an altitude band, a set of allowed compass
//! octants and an optional minimum lunar separation, and reports how much
//! the Moon is likely to interfere.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::altitude::{DayStatus, Trajectory, TrajectorySample};
use super::moon::{lunar_state, separation_from};
use crate::error::{PlannerError, PlannerResult};

pub const REASON_NEVER_RISES: &str = "Never Rises";
pub const REASON_NOT_VISIBLE: &str = "Not visible during window";

const DARK_SKY_ILLUMINATION: f64 = 15.0;
const AVOID_SEPARATION: f64 = 30.0;
const CAUTION_SEPARATION: f64 = 60.0;

/// One of the eight 45° compass sectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompassOctant {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

struct OctantSpan {
    label: &'static str,
    caption: &'static str,
    /// Half-open [lo, hi) intervals in degrees
    intervals: &'static [(f64, f64)],
}

static OCTANT_SPANS: [OctantSpan; 8] = [
    OctantSpan { label: "N", caption: "337.5–22.5°", intervals: &[(337.5, 360.0), (0.0, 22.5)] },
    OctantSpan { label: "NE", caption: "22.5–67.5°", intervals: &[(22.5, 67.5)] },
    OctantSpan { label: "E", caption: "67.5–112.5°", intervals: &[(67.5, 112.5)] },
    OctantSpan { label: "SE", caption: "112.5–157.5°", intervals: &[(112.5, 157.5)] },
    OctantSpan { label: "S", caption: "157.5–202.5°", intervals: &[(157.5, 202.5)] },
    OctantSpan { label: "SW", caption: "202.5–247.5°", intervals: &[(202.5, 247.5)] },
    OctantSpan { label: "W", caption: "247.5–292.5°", intervals: &[(247.5, 292.5)] },
    OctantSpan { label: "NW", caption: "292.5–337.5°", intervals: &[(292.5, 337.5)] },
];

impl CompassOctant {
    pub const ALL: [CompassOctant; 8] = [
        CompassOctant::N,
        CompassOctant::NE,
        CompassOctant::E,
        CompassOctant::SE,
        CompassOctant::S,
        CompassOctant::SW,
        CompassOctant::W,
        CompassOctant::NW,
    ];

    fn span(self) -> &'static OctantSpan {
        &OCTANT_SPANS[self as usize]
    }

    pub fn label(self) -> &'static str {
        self.span().label
    }

    /// Azimuth range for display, e.g. "22.5–67.5°"
    pub fn caption(self) -> &'static str {
        self.span().caption
    }

    pub fn contains(self, azimuth: f64) -> bool {
        self.span()
            .intervals
            .iter()
            .any(|&(lo, hi)| lo <= azimuth && azimuth < hi)
    }
}

impl fmt::Display for CompassOctant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CompassOctant {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        CompassOctant::ALL
            .into_iter()
            .find(|o| o.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PlannerError::InvalidConstraint(format!("unknown compass direction '{}'", s)))
    }
}

/// Whether an azimuth lies in at least one of the selected octants.
/// An empty selection contains nothing; callers treat it as "no filter".
pub fn az_in_selected(azimuth: f64, selected: &[CompassOctant]) -> bool {
    selected.iter().any(|octant| octant.contains(azimuth))
}

/// Inclusive altitude limits in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudeBand {
    pub min: f64,
    pub max: f64,
}

impl AltitudeBand {
    pub fn new(min: f64, max: f64) -> PlannerResult<Self> {
        if !(-90.0..=90.0).contains(&min) || !(-90.0..=90.0).contains(&max) || min > max {
            return Err(PlannerError::InvalidConstraint(format!(
                "altitude band {}..{} is not within -90..90 in ascending order",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, altitude: f64) -> bool {
        self.min <= altitude && altitude <= self.max
    }
}

impl Default for AltitudeBand {
    fn default() -> Self {
        Self { min: 0.0, max: 90.0 }
    }
}

/// What a sample must satisfy to count as observable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityConstraints {
    pub altitude: AltitudeBand,
    /// Allowed directions; empty means any
    #[serde(default)]
    pub directions: Vec<CompassOctant>,
    /// Minimum Moon distance in degrees, if the Moon should gate visibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_moon_separation: Option<f64>,
}

/// How much the Moon is expected to interfere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoonStatus {
    #[serde(rename = "Dark Sky")]
    DarkSky,
    Avoid,
    Caution,
    Safe,
}

impl MoonStatus {
    pub fn label(self) -> &'static str {
        match self {
            MoonStatus::DarkSky => "Dark Sky",
            MoonStatus::Avoid => "Avoid",
            MoonStatus::Caution => "Caution",
            MoonStatus::Safe => "Safe",
        }
    }
}

impl fmt::Display for MoonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Moon status from illumination (percent) and closest approach (degrees).
/// Values exactly on a threshold fall into the less restrictive status.
pub fn moon_status(illumination_pct: f64, min_separation_deg: f64) -> MoonStatus {
    if illumination_pct < DARK_SKY_ILLUMINATION {
        MoonStatus::DarkSky
    } else if min_separation_deg < AVOID_SEPARATION {
        MoonStatus::Avoid
    } else if min_separation_deg < CAUTION_SEPARATION {
        MoonStatus::Caution
    } else {
        MoonStatus::Safe
    }
}

/// Outcome of classifying one trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilityVerdict {
    pub observable: bool,
    /// Why the target is not observable; absent when it is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_moon_separation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_moon_separation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moon_illumination: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moon_status: Option<MoonStatus>,
}

impl ObservabilityVerdict {
    fn rejected(reason: &str) -> Self {
        Self {
            observable: false,
            reason: Some(reason.to_string()),
            min_moon_separation: None,
            max_moon_separation: None,
            moon_illumination: None,
            moon_status: None,
        }
    }
}

/// Start, middle and end of the sample sequence, without repeats
pub fn representative_samples(samples: &[TrajectorySample]) -> Vec<&TrajectorySample> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mut indices = vec![0, samples.len() / 2, samples.len() - 1];
    indices.dedup();
    indices.into_iter().map(|i| &samples[i]).collect()
}

/// Classify a trajectory against the constraints.
///
/// A target that never rises is rejected without looking at samples.
/// Otherwise the start, middle and end samples are checked in order and the
/// first one that passes makes the target observable. Lunar separation is
/// reported over all of them regardless.
pub fn classify(trajectory: &Trajectory, constraints: &VisibilityConstraints) -> ObservabilityVerdict {
    if trajectory.day_status == DayStatus::NeverRises {
        return ObservabilityVerdict::rejected(REASON_NEVER_RISES);
    }

    let checked = representative_samples(&trajectory.samples);
    if checked.is_empty() {
        return ObservabilityVerdict::rejected(REASON_NOT_VISIBLE);
    }

    let mut observable = false;
    let mut min_separation = f64::INFINITY;
    let mut max_separation = f64::NEG_INFINITY;
    let mut illumination = 0.0_f64;

    for sample in checked {
        let moon = lunar_state(&sample.instant);
        let separation = separation_from(&sample.target, &moon);
        min_separation = min_separation.min(separation);
        max_separation = max_separation.max(separation);
        illumination = illumination.max(moon.illumination_pct);

        if !observable && passes(sample, separation, constraints) {
            log::debug!(
                "Observable at {} (alt {:.1}, az {:.1})",
                sample.instant,
                sample.altitude,
                sample.azimuth
            );
            observable = true;
        }
    }

    ObservabilityVerdict {
        observable,
        reason: (!observable).then(|| REASON_NOT_VISIBLE.to_string()),
        min_moon_separation: Some(min_separation),
        max_moon_separation: Some(max_separation),
        moon_illumination: Some(illumination),
        moon_status: Some(moon_status(illumination, min_separation)),
    }
}

fn passes(sample: &TrajectorySample, moon_separation: f64, constraints: &VisibilityConstraints) -> bool {
    let in_band = constraints.altitude.contains(sample.altitude);
    let in_direction =
        constraints.directions.is_empty() || az_in_selected(sample.azimuth, &constraints.directions);
    let clear_of_moon = constraints
        .min_moon_separation
        .map_or(true, |min| moon_separation >= min);

    in_band && in_direction && clear_of_moon
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro::frames::EquatorialCoordinate;
    use chrono::{DateTime, Duration, Utc};

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-14T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn sample(minutes: i64, altitude: f64, azimuth: f64) -> TrajectorySample {
        TrajectorySample {
            instant: start() + Duration::minutes(minutes),
            altitude,
            azimuth,
            lst_deg: 0.0,
            target: EquatorialCoordinate::icrs(83.82, -5.39),
        }
    }

    fn trajectory(day_status: DayStatus, points: &[(f64, f64)]) -> Trajectory {
        Trajectory {
            samples: points
                .iter()
                .enumerate()
                .map(|(i, &(alt, az))| sample(i as i64 * 10, alt, az))
                .collect(),
            day_status,
        }
    }

    fn octants(labels: &[&str]) -> Vec<CompassOctant> {
        labels.iter().map(|l| l.parse().unwrap()).collect()
    }

    #[test]
    fn test_octant_boundaries() {
        assert!(az_in_selected(22.5, &octants(&["NE"])));
        assert!(!az_in_selected(67.5, &octants(&["NE"])));
        assert!(az_in_selected(67.5, &octants(&["E"])));
        assert!(!az_in_selected(22.5, &octants(&["N"])));
    }

    #[test]
    fn test_north_wraps() {
        let north = octants(&["N"]);
        assert!(az_in_selected(350.0, &north));
        assert!(az_in_selected(10.0, &north));
        assert!(az_in_selected(0.0, &north));
        assert!(az_in_selected(337.5, &north));
        assert!(!az_in_selected(180.0, &north));
    }

    #[test]
    fn test_every_azimuth_in_exactly_one_octant() {
        let mut az = 0.0;
        while az < 360.0 {
            let hits = CompassOctant::ALL.iter().filter(|o| o.contains(az)).count();
            assert_eq!(hits, 1, "azimuth {}", az);
            az += 0.5;
        }
    }

    #[test]
    fn test_multiple_octants_and_empty_selection() {
        let selected = octants(&["S", "W"]);
        assert!(az_in_selected(180.0, &selected));
        assert!(az_in_selected(270.0, &selected));
        assert!(!az_in_selected(90.0, &selected));
        assert!(!az_in_selected(90.0, &[]));
    }

    #[test]
    fn test_octant_parsing_and_captions() {
        assert_eq!("nw".parse::<CompassOctant>().unwrap(), CompassOctant::NW);
        assert!("NNE".parse::<CompassOctant>().is_err());
        assert_eq!(CompassOctant::N.caption(), "337.5–22.5°");
        assert_eq!(CompassOctant::SW.to_string(), "SW");
    }

    #[test]
    fn test_moon_status_boundaries() {
        assert_eq!(moon_status(15.0, 90.0), MoonStatus::Safe);
        assert_eq!(moon_status(50.0, 30.0), MoonStatus::Caution);
        assert_eq!(moon_status(50.0, 29.99), MoonStatus::Avoid);
        assert_eq!(moon_status(50.0, 60.0), MoonStatus::Safe);
        assert_eq!(moon_status(50.0, 59.99), MoonStatus::Caution);
        assert_eq!(moon_status(5.0, 90.0), MoonStatus::DarkSky);
        assert_eq!(moon_status(5.0, 1.0), MoonStatus::DarkSky);
        assert_eq!(MoonStatus::DarkSky.label(), "Dark Sky");
    }

    #[test]
    fn test_never_rises_short_circuits() {
        let high = trajectory(DayStatus::NeverRises, &[(60.0, 180.0), (65.0, 185.0)]);
        let verdict = classify(&high, &VisibilityConstraints::default());
        assert!(!verdict.observable);
        assert_eq!(verdict.reason.as_deref(), Some(REASON_NEVER_RISES));
        assert_eq!(verdict.moon_status, None);

        let loose = VisibilityConstraints {
            altitude: AltitudeBand::new(-90.0, 90.0).unwrap(),
            directions: vec![],
            min_moon_separation: Some(0.0),
        };
        assert_eq!(classify(&high, &loose).reason.as_deref(), Some(REASON_NEVER_RISES));
    }

    #[test]
    fn test_unrestricted_azimuth_observable() {
        let t = trajectory(DayStatus::RisesAndSets, &[(-5.0, 100.0), (10.0, 120.0), (25.0, 140.0)]);
        let verdict = classify(&t, &VisibilityConstraints::default());
        assert!(verdict.observable);
        assert_eq!(verdict.reason, None);
        assert!(verdict.moon_status.is_some());
    }

    #[test]
    fn test_not_visible_during_window() {
        let t = trajectory(DayStatus::RisesAndSets, &[(-20.0, 80.0), (-10.0, 90.0), (-5.0, 95.0)]);
        let verdict = classify(&t, &VisibilityConstraints::default());
        assert!(!verdict.observable);
        assert_eq!(verdict.reason.as_deref(), Some(REASON_NOT_VISIBLE));
    }

    #[test]
    fn test_direction_filter_applies() {
        let t = trajectory(DayStatus::RisesAndSets, &[(30.0, 90.0), (35.0, 100.0), (40.0, 110.0)]);
        let west = VisibilityConstraints {
            directions: octants(&["W"]),
            ..Default::default()
        };
        assert!(!classify(&t, &west).observable);

        let east = VisibilityConstraints {
            directions: octants(&["E"]),
            ..Default::default()
        };
        assert!(classify(&t, &east).observable);
    }

    #[test]
    fn test_only_representative_samples_are_checked() {
        // Only the second sample is above the horizon; it is neither start, middle nor end
        let t = trajectory(
            DayStatus::RisesAndSets,
            &[(-10.0, 0.0), (30.0, 0.0), (-10.0, 0.0), (-10.0, 0.0), (-10.0, 0.0)],
        );
        assert!(!classify(&t, &VisibilityConstraints::default()).observable);
    }

    #[test]
    fn test_moon_separation_range_and_gate() {
        let t = trajectory(DayStatus::AlwaysAbove, &[(50.0, 0.0), (50.0, 10.0), (50.0, 20.0)]);
        let verdict = classify(&t, &VisibilityConstraints::default());
        let min = verdict.min_moon_separation.unwrap();
        let max = verdict.max_moon_separation.unwrap();
        assert!((0.0..=180.0).contains(&min));
        assert!(min <= max);
        let illumination = verdict.moon_illumination.unwrap();
        assert_eq!(verdict.moon_status, Some(moon_status(illumination, min)));

        let impossible = VisibilityConstraints {
            min_moon_separation: Some(180.5),
            ..Default::default()
        };
        let gated = classify(&t, &impossible);
        assert!(!gated.observable);
        assert_eq!(gated.min_moon_separation, Some(min));
    }

    #[test]
    fn test_altitude_band_validation() {
        assert!(AltitudeBand::new(30.0, 80.0).is_ok());
        assert!(AltitudeBand::new(80.0, 30.0).is_err());
        assert!(AltitudeBand::new(-91.0, 30.0).is_err());
        let band = AltitudeBand::new(30.0, 80.0).unwrap();
        assert!(band.contains(30.0) && band.contains(80.0));
        assert!(!band.contains(80.01));
    }

    #[test]
    fn test_representative_samples() {
        let t = trajectory(DayStatus::RisesAndSets, &[(1.0, 0.0)]);
        assert_eq!(representative_samples(&t.samples).len(), 1);

        let t = trajectory(DayStatus::RisesAndSets, &[(1.0, 0.0), (2.0, 0.0)]);
        let picked: Vec<f64> = representative_samples(&t.samples).iter().map(|s| s.altitude).collect();
        assert_eq!(picked, vec![1.0, 2.0]);

        let t = trajectory(DayStatus::RisesAndSets, &[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0), (5.0, 0.0)]);
        let picked: Vec<f64> = representative_samples(&t.samples).iter().map(|s| s.altitude).collect();
        assert_eq!(picked, vec![1.0, 3.0, 5.0]);
    }
}
