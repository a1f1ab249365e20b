//! Altitude/azimuth trajectories
//!
//! Samples a target's horizontal coordinates over an observation window,
//! labels them with compass directions and works out whether the target
//! clears the horizon at all on the day in question.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::angles::{format_dms, format_hms, OUTPUT_PRECISION};
use super::frames::{apparent_place, equatorial_to_horizontal, julian_date_tt, EquatorialCoordinate};
use super::visibility::AltitudeBand;
use crate::error::{PlannerError, PlannerResult};

/// Longest window a single plan may cover
pub const MAX_WINDOW_DAYS: i64 = 7;

/// Most samples a single window may produce
pub const MAX_SAMPLES: i64 = 20_000;

/// Observer location for altitude calculations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
    pub name: Option<String>,
}

impl ObserverLocation {
    pub fn new(latitude: f64, longitude: f64) -> PlannerResult<Self> {
        let location = Self {
            latitude,
            longitude,
            elevation: 0.0,
            name: None,
        };
        location.validate()?;
        Ok(location)
    }

    pub fn validate(&self) -> PlannerResult<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(PlannerError::InvalidLocation(format!(
                "latitude {} is outside -90..90",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(PlannerError::InvalidLocation(format!(
                "longitude {} is outside -180..180",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Start instant, duration and sampling cadence of an observing session
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationWindow {
    pub start: DateTime<FixedOffset>,
    pub duration: Duration,
    pub step: Duration,
}

impl ObservationWindow {
    pub fn new(start: DateTime<FixedOffset>, duration: Duration, step: Duration) -> PlannerResult<Self> {
        if duration <= Duration::zero() {
            return Err(PlannerError::InvalidWindow("duration must be positive".to_string()));
        }
        if step <= Duration::zero() {
            return Err(PlannerError::InvalidWindow("step must be positive".to_string()));
        }
        if step > duration {
            return Err(PlannerError::InvalidWindow(
                "step must not exceed the duration".to_string(),
            ));
        }
        if duration > Duration::days(MAX_WINDOW_DAYS) {
            return Err(PlannerError::InvalidWindow(format!(
                "duration must not exceed {} days",
                MAX_WINDOW_DAYS
            )));
        }
        if step < Duration::seconds(1) {
            return Err(PlannerError::InvalidWindow("step must be at least one second".to_string()));
        }
        if duration.num_seconds() / step.num_seconds() > MAX_SAMPLES {
            return Err(PlannerError::InvalidWindow(format!(
                "window would produce more than {} samples",
                MAX_SAMPLES
            )));
        }
        if start.checked_add_signed(duration).is_none() {
            return Err(PlannerError::InvalidWindow("window end is out of range".to_string()));
        }
        Ok(Self {
            start,
            duration,
            step,
        })
    }

    pub fn from_minutes(
        start: DateTime<FixedOffset>,
        duration_minutes: i64,
        step_minutes: i64,
    ) -> PlannerResult<Self> {
        let minutes = |value: i64, what: &str| {
            Duration::try_minutes(value)
                .ok_or_else(|| PlannerError::InvalidWindow(format!("{} of {} minutes is out of range", what, value)))
        };
        Self::new(
            start,
            minutes(duration_minutes, "duration")?,
            minutes(step_minutes, "step")?,
        )
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.start + self.duration
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    /// Number of whole steps; samples run from step 0 through this one
    pub fn step_count(&self) -> i64 {
        self.duration.num_seconds() / self.step.num_seconds().max(1)
    }

    /// start, start+step, ... through start+duration when it divides evenly
    pub fn instants(&self) -> Vec<DateTime<Utc>> {
        let start = self.start_utc();
        (0..=self.step_count())
            .map_while(|k| {
                let offset = self.step.checked_mul(i32::try_from(k).ok()?)?;
                start.checked_add_signed(offset)
            })
            .collect()
    }

    /// Start on a whole UTC minute and step a whole number of minutes
    pub fn is_minute_aligned(&self) -> bool {
        let start = self.start_utc();
        start.timestamp() % 60 == 0
            && start.timestamp_subsec_nanos() == 0
            && self.step == Duration::minutes(self.step.num_minutes())
    }

    /// Local midnight opening the calendar day the window starts on
    pub fn local_day_start(&self) -> DateTime<Utc> {
        let midnight = self.start.date_naive().and_time(NaiveTime::MIN);
        self.start
            .timezone()
            .from_local_datetime(&midnight)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| self.start_utc())
    }
}

/// Where a target sits on the sky over the window
#[derive(Debug, Clone, PartialEq)]
pub enum TargetPath {
    /// One coordinate for the whole window
    Fixed(EquatorialCoordinate),
    /// One coordinate per sample, in chronological order
    Moving(Vec<EquatorialCoordinate>),
}

impl TargetPath {
    /// Coordinate for the sample at `index`. A short ephemeris holds its last row.
    pub fn at(&self, index: usize) -> Option<&EquatorialCoordinate> {
        match self {
            TargetPath::Fixed(coord) => Some(coord),
            TargetPath::Moving(coords) => coords.get(index).or_else(|| coords.last()),
        }
    }

    pub fn first(&self) -> Option<&EquatorialCoordinate> {
        self.at(0)
    }
}

/// Whether a target enters an altitude band during one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DayStatus {
    /// Never inside the band: upper culmination below the floor, or lower
    /// culmination above the ceiling
    NeverRises,
    /// Lower culmination stays at or above the altitude floor
    AlwaysAbove,
    RisesAndSets,
}

/// Rise status of a coordinate for one day, from its culmination altitudes
pub fn day_status(
    coord: &EquatorialCoordinate,
    location: &ObserverLocation,
    band: &AltitudeBand,
    day: &DateTime<Utc>,
) -> DayStatus {
    let (_, dec) = apparent_place(coord, julian_date_tt(day));
    let upper_culmination = 90.0 - (location.latitude - dec).abs();
    let lower_culmination = (location.latitude + dec).abs() - 90.0;

    if upper_culmination < band.min || lower_culmination > band.max {
        DayStatus::NeverRises
    } else if lower_culmination >= band.min {
        DayStatus::AlwaysAbove
    } else {
        DayStatus::RisesAndSets
    }
}

/// A single altitude/azimuth data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectorySample {
    pub instant: DateTime<Utc>,
    pub altitude: f64,
    pub azimuth: f64,
    /// Local apparent sidereal time in degrees
    pub lst_deg: f64,
    /// Target position used for this sample
    pub target: EquatorialCoordinate,
}

/// Samples over a window plus the day status they were computed under
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub samples: Vec<TrajectorySample>,
    pub day_status: DayStatus,
}

impl Trajectory {
    /// Sample with the highest altitude
    pub fn peak(&self) -> Option<&TrajectorySample> {
        self.samples
            .iter()
            .max_by(|a, b| a.altitude.total_cmp(&b.altitude))
    }
}

/// Compute the trajectory of a target over a window.
///
/// `band` is the usable altitude range; it decides the day status.
pub fn sample_trajectory(
    path: &TargetPath,
    location: &ObserverLocation,
    window: &ObservationWindow,
    band: &AltitudeBand,
) -> PlannerResult<Trajectory> {
    location.validate()?;

    let first = path.first().ok_or_else(|| PlannerError::EmptyEphemerisResult {
        query: "trajectory".to_string(),
    })?;

    let instants = window.instants();
    if let TargetPath::Moving(coords) = path {
        if coords.len() != instants.len() {
            log::warn!(
                "Ephemeris has {} rows for {} samples, pairing by position",
                coords.len(),
                instants.len()
            );
        }
    }

    let day_status = day_status(first, location, band, &window.local_day_start());

    let mut samples = Vec::with_capacity(instants.len());
    for (index, instant) in instants.into_iter().enumerate() {
        let target = *path.at(index).unwrap_or(first);
        let horizontal = equatorial_to_horizontal(&target, location.latitude, location.longitude, &instant);
        samples.push(TrajectorySample {
            instant,
            altitude: horizontal.altitude_deg,
            azimuth: horizontal.azimuth_deg,
            lst_deg: horizontal.lst_deg,
            target,
        });
    }

    log::debug!(
        "Sampled {} points, day status {:?}",
        samples.len(),
        day_status
    );

    Ok(Trajectory {
        samples,
        day_status,
    })
}

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass label for an azimuth in degrees
pub fn compass_direction(azimuth: f64) -> &'static str {
    let index = ((azimuth.rem_euclid(360.0) + 11.25) / 22.5) as usize % 16;
    COMPASS_POINTS[index]
}

/// One row of trajectory output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryRow {
    pub local_time: String,
    pub utc_time: String,
    pub lst: String,
    pub name: String,
    pub ra: String,
    pub dec: String,
    pub azimuth: f64,
    pub altitude: f64,
    pub direction: String,
}

const ROW_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render samples as output rows, local times in the window's offset
pub fn trajectory_rows(name: &str, trajectory: &Trajectory, offset: &FixedOffset) -> Vec<TrajectoryRow> {
    trajectory
        .samples
        .iter()
        .map(|sample| TrajectoryRow {
            local_time: sample
                .instant
                .with_timezone(offset)
                .format(ROW_TIME_FORMAT)
                .to_string(),
            utc_time: sample.instant.format(ROW_TIME_FORMAT).to_string(),
            lst: format_hms(sample.lst_deg, OUTPUT_PRECISION),
            name: name.to_string(),
            ra: format_hms(sample.target.ra_deg, OUTPUT_PRECISION),
            dec: format_dms(sample.target.dec_deg, OUTPUT_PRECISION),
            azimuth: round2(sample.azimuth),
            altitude: round2(sample.altitude),
            direction: compass_direction(sample.azimuth).to_string(),
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
