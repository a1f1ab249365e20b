//! JPL Horizons ephemerides
//!
//! Comets, asteroids and planets move, so their positions come from an
//! observer ephemeris rather than a catalog. Small-body naming is messy
//! ("12P/Pons-Brooks", "C/2023 A3 (Tsuchinshan-ATLAS)", "433 Eros"), so
//! small bodies go through an ordered list of lookup strategies and the
//! first one that yields rows wins.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::altitude::ObservationWindow;
use super::fetch_text;
use super::frames::{julian_date, EquatorialCoordinate};
use crate::error::{PlannerError, PlannerResult, ServiceError};

pub const SERVICE: &str = "Horizons";

const RANGE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

static SHORT_DESIGNATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+[PDCX]|P/\d{4} [A-Z0-9]+|C/\d{4} [A-Z0-9]+|\d+)").unwrap()
});

/// How the ephemeris service should interpret an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdType {
    SmallBody,
    MajorBody,
    /// A literal designation, matched exactly rather than searched
    Designation,
    /// Let the service decide; allows free-text search strings
    Unset,
}

impl IdType {
    fn is_small_body(self) -> bool {
        matches!(self, IdType::SmallBody | IdType::Designation)
    }
}

/// Instants an ephemeris is requested for
#[derive(Debug, Clone, PartialEq)]
pub enum Epochs {
    Single(DateTime<Utc>),
    /// Inclusive start/stop at minute resolution
    Range {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        step_minutes: i64,
    },
}

impl Epochs {
    /// Range covering every sample instant of a window.
    ///
    /// Ranges are requested at minute resolution, so the window must start on
    /// a whole minute and step whole minutes for rows to line up with samples.
    pub fn for_window(window: &ObservationWindow) -> PlannerResult<Self> {
        if !window.is_minute_aligned() {
            return Err(PlannerError::InvalidWindow(
                "ephemeris windows must start on a whole minute and step whole minutes".to_string(),
            ));
        }
        let start = window.start_utc();
        let step_minutes = window.step.num_minutes();
        Ok(Epochs::Range {
            start,
            stop: start + Duration::minutes(step_minutes * window.step_count()),
            step_minutes,
        })
    }

    fn first(&self) -> DateTime<Utc> {
        match self {
            Epochs::Single(instant) => *instant,
            Epochs::Range { start, .. } => *start,
        }
    }

    /// Instant of the n-th returned row
    fn instant(&self, index: usize) -> DateTime<Utc> {
        match self {
            Epochs::Single(instant) => *instant,
            Epochs::Range {
                start, step_minutes, ..
            } => *start + Duration::minutes(step_minutes * index as i64),
        }
    }
}

/// One observer-ephemeris request
#[derive(Debug, Clone, PartialEq)]
pub struct EphemerisQuery {
    pub id: String,
    pub id_type: IdType,
    /// Ask for the apparition closest to the epoch (small bodies only)
    pub closest_apparition: bool,
    /// Observer location code
    pub location: String,
    pub epochs: Epochs,
}

impl EphemerisQuery {
    /// The COMMAND parameter for this identifier and type
    pub fn command(&self) -> String {
        let mut command = match self.id_type {
            IdType::SmallBody => format!("{};", self.id),
            IdType::Designation => format!("DES={};", self.id),
            IdType::MajorBody | IdType::Unset => self.id.clone(),
        };
        if self.closest_apparition && self.id_type.is_small_body() {
            command.push_str(" CAP;");
        }
        command
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("format", "json".to_string()),
            ("COMMAND", quoted(&self.command())),
            ("OBJ_DATA", quoted("NO")),
            ("MAKE_EPHEM", quoted("YES")),
            ("EPHEM_TYPE", quoted("OBSERVER")),
            ("CENTER", quoted(&self.location)),
            ("QUANTITIES", quoted("1")),
            ("ANG_FORMAT", quoted("DEG")),
            ("CSV_FORMAT", quoted("YES")),
        ];

        match &self.epochs {
            Epochs::Single(instant) => {
                params.push(("TLIST", quoted(&format!("{:.6}", julian_date(instant)))));
            }
            Epochs::Range {
                start,
                stop,
                step_minutes,
            } => {
                params.push(("START_TIME", quoted(&start.format(RANGE_TIME_FORMAT).to_string())));
                params.push(("STOP_TIME", quoted(&stop.format(RANGE_TIME_FORMAT).to_string())));
                params.push(("STEP_SIZE", quoted(&format!("{}m", step_minutes))));
            }
        }

        params
    }
}

fn quoted(value: &str) -> String {
    format!("'{}'", value)
}

/// Astrometric position from one ephemeris row, in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EphemerisRow {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

/// Something that answers observer-ephemeris queries
pub trait EphemerisService {
    fn ephemerides(&self, query: &EphemerisQuery) -> Result<Vec<EphemerisRow>, ServiceError>;
}

/// Horizons REST API client
pub struct HorizonsClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct HorizonsResponse {
    result: Option<String>,
    error: Option<String>,
}

impl HorizonsClient {
    pub fn new(client: reqwest::blocking::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl EphemerisService for HorizonsClient {
    fn ephemerides(&self, query: &EphemerisQuery) -> Result<Vec<EphemerisRow>, ServiceError> {
        let url = reqwest::Url::parse_with_params(&self.base_url, query.parameters())
            .map_err(|e| ServiceError::parse(SERVICE, e.to_string()))?;

        log::debug!("Horizons COMMAND {}", query.command());
        let body = fetch_text(&self.client, SERVICE, url)?;
        parse_response(&body)
    }
}

/// Decode the JSON envelope and the ephemeris table inside it
pub fn parse_response(body: &str) -> Result<Vec<EphemerisRow>, ServiceError> {
    let response: HorizonsResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::parse(SERVICE, e.to_string()))?;

    if let Some(error) = response.error {
        return Err(ServiceError::rejected(SERVICE, error.trim()));
    }

    let result = response
        .result
        .ok_or_else(|| ServiceError::parse(SERVICE, "response has no result field"))?;
    parse_ephemeris_table(&result)
}

/// Parse the CSV rows between `$$SOE` and `$$EOE`.
///
/// Text without a table is what Horizons sends for unknown or ambiguous
/// identifiers; its message becomes the error.
pub fn parse_ephemeris_table(text: &str) -> Result<Vec<EphemerisRow>, ServiceError> {
    let Some(soe) = text.find("$$SOE") else {
        return Err(ServiceError::rejected(SERVICE, service_message(text)));
    };
    let body_start = soe + "$$SOE".len();
    let body_end = text[body_start..]
        .find("$$EOE")
        .map(|i| body_start + i)
        .ok_or_else(|| ServiceError::parse(SERVICE, "ephemeris table is not terminated"))?;

    let header = text[..soe]
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.chars().all(|c| c == '*'))
        .ok_or_else(|| ServiceError::parse(SERVICE, "ephemeris table has no header"))?;

    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let ra_column = column_index(&columns, "R.A.")?;
    let dec_column = column_index(&columns, "DEC")?;

    text[body_start..body_end]
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            Ok(EphemerisRow {
                ra_deg: numeric_field(&fields, ra_column, line)?,
                dec_deg: numeric_field(&fields, dec_column, line)?,
            })
        })
        .collect()
}

fn column_index(columns: &[&str], prefix: &str) -> Result<usize, ServiceError> {
    columns
        .iter()
        .position(|c| c.starts_with(prefix))
        .ok_or_else(|| ServiceError::parse(SERVICE, format!("no {} column in ephemeris header", prefix)))
}

fn numeric_field(fields: &[&str], index: usize, line: &str) -> Result<f64, ServiceError> {
    fields
        .get(index)
        .and_then(|f| f.parse::<f64>().ok())
        .ok_or_else(|| ServiceError::parse(SERVICE, format!("unreadable ephemeris row '{}'", line)))
}

fn service_message(text: &str) -> String {
    let message = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("API "))
        .take(5)
        .collect::<Vec<_>>()
        .join(" ");
    if message.is_empty() {
        "no ephemeris returned".to_string()
    } else {
        message
    }
}

/// Minimal identifier at the front of a composite designation:
/// `"12P/Pons-Brooks"` → `"12P"`, `"C/2023 A3 (Tsuchinshan-ATLAS)"` → `"C/2023 A3"`.
pub fn shorten_designation(designation: &str) -> Option<String> {
    SHORT_DESIGNATION
        .captures(designation.trim())
        .map(|caps| caps[1].to_string())
}

/// One way of asking the ephemeris service about a small body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Strict small-body identifier, closest apparition
    SmallBody,
    /// Identifier type left unset, so free-text search applies
    FreeText,
    ShortSmallBody,
    ShortFreeText,
    /// Shortened identifier as a literal designation
    ShortDesignation,
}

impl LookupStrategy {
    /// Order in which strategies are tried
    pub const CASCADE: [LookupStrategy; 5] = [
        LookupStrategy::SmallBody,
        LookupStrategy::FreeText,
        LookupStrategy::ShortSmallBody,
        LookupStrategy::ShortFreeText,
        LookupStrategy::ShortDesignation,
    ];

    fn id_type(self) -> IdType {
        match self {
            LookupStrategy::SmallBody | LookupStrategy::ShortSmallBody => IdType::SmallBody,
            LookupStrategy::FreeText | LookupStrategy::ShortFreeText => IdType::Unset,
            LookupStrategy::ShortDesignation => IdType::Designation,
        }
    }

    fn uses_short_form(self) -> bool {
        !matches!(self, LookupStrategy::SmallBody | LookupStrategy::FreeText)
    }

    /// Query for this strategy, or None when the designation has no short form
    pub fn query(self, designation: &str, location: &str, epochs: &Epochs) -> Option<EphemerisQuery> {
        let id = if self.uses_short_form() {
            shorten_designation(designation)?
        } else {
            designation.trim().to_string()
        };
        let id_type = self.id_type();

        Some(EphemerisQuery {
            id,
            id_type,
            closest_apparition: id_type.is_small_body(),
            location: location.to_string(),
            epochs: epochs.clone(),
        })
    }
}

/// Major-body ID for a planet name; anything else is passed through
pub fn major_body_id(name: &str) -> String {
    let id = match name.trim().to_ascii_lowercase().as_str() {
        "sun" => "10",
        "moon" => "301",
        "mercury" => "199",
        "venus" => "299",
        "mars" => "499",
        "jupiter" => "599",
        "saturn" => "699",
        "uranus" => "799",
        "neptune" => "899",
        "pluto" => "999",
        _ => return name.trim().to_string(),
    };
    id.to_string()
}

/// Resolves moving bodies against an ephemeris service
pub struct MovingObjectResolver<'a> {
    service: &'a dyn EphemerisService,
    location: String,
}

impl<'a> MovingObjectResolver<'a> {
    pub fn new(service: &'a dyn EphemerisService, location: impl Into<String>) -> Self {
        Self {
            service,
            location: location.into(),
        }
    }

    /// Position of a comet or asteroid at one instant
    pub fn resolve(&self, designation: &str, instant: DateTime<Utc>) -> PlannerResult<EquatorialCoordinate> {
        let epochs = Epochs::Single(instant);
        let rows = self.cascade(designation, &epochs)?;
        first_coordinate(&rows, &epochs)
    }

    /// Positions of a comet or asteroid at every sample of a window
    pub fn ephemeris(&self, designation: &str, window: &ObservationWindow) -> PlannerResult<Vec<EquatorialCoordinate>> {
        let epochs = Epochs::for_window(window)?;
        let rows = self.cascade(designation, &epochs)?;
        Ok(coordinates(&rows, &epochs))
    }

    /// Query with an identifier the cache already vouches for, skipping the cascade
    pub fn resolve_cached(&self, designation: &str, spk_id: &str, epochs: &Epochs) -> PlannerResult<Vec<EquatorialCoordinate>> {
        log::debug!("Using cached id {} for '{}'", spk_id, designation);
        let query = EphemerisQuery {
            id: spk_id.to_string(),
            id_type: IdType::Unset,
            closest_apparition: false,
            location: self.location.clone(),
            epochs: epochs.clone(),
        };
        let rows = self
            .run(&query)
            .map_err(|e| PlannerError::resolution(SERVICE, designation, e))?;
        Ok(coordinates(&rows, epochs))
    }

    /// Position of a planet (or the Sun/Moon) at one instant
    pub fn resolve_planet(&self, name: &str, instant: DateTime<Utc>) -> PlannerResult<EquatorialCoordinate> {
        let epochs = Epochs::Single(instant);
        let rows = self.planet_rows(name, &epochs)?;
        first_coordinate(&rows, &epochs)
    }

    pub fn planet_ephemeris(&self, name: &str, window: &ObservationWindow) -> PlannerResult<Vec<EquatorialCoordinate>> {
        let epochs = Epochs::for_window(window)?;
        let rows = self.planet_rows(name, &epochs)?;
        Ok(coordinates(&rows, &epochs))
    }

    fn planet_rows(&self, name: &str, epochs: &Epochs) -> PlannerResult<Vec<EphemerisRow>> {
        let query = EphemerisQuery {
            id: major_body_id(name),
            id_type: IdType::MajorBody,
            closest_apparition: false,
            location: self.location.clone(),
            epochs: epochs.clone(),
        };
        self.run(&query)
            .map_err(|e| PlannerError::resolution(SERVICE, name, e))
    }

    /// Try each strategy in order until one returns rows
    fn cascade(&self, designation: &str, epochs: &Epochs) -> PlannerResult<Vec<EphemerisRow>> {
        let mut tried: Vec<EphemerisQuery> = Vec::new();
        let mut last_error: Option<PlannerError> = None;

        for strategy in LookupStrategy::CASCADE {
            let Some(query) = strategy.query(designation, &self.location, epochs) else {
                log::debug!("'{}' has no short form, stopping", designation);
                break;
            };
            if tried.contains(&query) {
                continue;
            }

            match self.run(&query) {
                Ok(rows) => {
                    log::info!(
                        "Resolved '{}' via {:?} ({}), {} rows",
                        designation,
                        strategy,
                        query.command(),
                        rows.len()
                    );
                    return Ok(rows);
                }
                Err(e) => {
                    log::debug!("{:?} lookup for '{}' failed: {}", strategy, designation, e);
                    last_error = Some(e);
                }
            }
            tried.push(query);
        }

        let cause = last_error.unwrap_or_else(|| {
            ServiceError::NotFound {
                service: SERVICE,
                query: designation.to_string(),
            }
            .into()
        });
        Err(PlannerError::resolution(SERVICE, designation, cause))
    }

    fn run(&self, query: &EphemerisQuery) -> PlannerResult<Vec<EphemerisRow>> {
        let rows = self.service.ephemerides(query)?;
        if rows.is_empty() {
            return Err(PlannerError::EmptyEphemerisResult {
                query: query.command(),
            });
        }
        Ok(rows)
    }
}

fn coordinates(rows: &[EphemerisRow], epochs: &Epochs) -> Vec<EquatorialCoordinate> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| EquatorialCoordinate::icrs(row.ra_deg, row.dec_deg).at_epoch(epochs.instant(i)))
        .collect()
}

fn first_coordinate(rows: &[EphemerisRow], epochs: &Epochs) -> PlannerResult<EquatorialCoordinate> {
    rows.first()
        .map(|row| EquatorialCoordinate::icrs(row.ra_deg, row.dec_deg).at_epoch(epochs.first()))
        .ok_or_else(|| PlannerError::EmptyEphemerisResult {
            query: "single epoch".to_string(),
        })
}
