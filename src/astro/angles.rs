//! Sexagesimal angle parsing and formatting
//!
//! Right ascension is read and written in hours (`15h59m30s`, `15:59:30`,
//! `15 59 30` or decimal hours), declination in degrees (`25d55m13s`,
//! `+25:55:13`, `-0 30 00` or decimal degrees).

use once_cell::sync::Lazy;
use regex::Regex;

use super::frames::{EquatorialCoordinate, Frame};
use crate::error::{PlannerError, PlannerResult};

/// Decimal places used for RA/Dec/LST strings in trajectory output
pub const OUTPUT_PRECISION: usize = 2;

static HMS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^\s*([+-])?\s*(\d{1,3})\s*(?:h|:|\s)\s*(\d{1,2})\s*(?:m|'|:|\s)\s*(\d{1,2}(?:\.\d*)?)\s*(?:s|")?\s*$"#,
    )
    .unwrap()
});

static DMS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^\s*([+-])?\s*(\d{1,3})\s*(?:d|°|:|\s)\s*(\d{1,2})\s*(?:m|'|:|\s)\s*(\d{1,2}(?:\.\d*)?)\s*(?:s|"|'')?\s*$"#,
    )
    .unwrap()
});

/// Parse a right ascension, returning degrees in [0, 360)
pub fn parse_ra(input: &str) -> PlannerResult<f64> {
    let hours = match HMS_REGEX.captures(input) {
        Some(caps) => sexagesimal_value(&caps, input)?,
        None => parse_decimal(input)?,
    };

    if !(0.0..24.0).contains(&hours) {
        return Err(PlannerError::coordinate_format(
            input,
            "right ascension must be within 0h..24h",
        ));
    }

    Ok(hours * 15.0)
}

/// Parse a declination, returning degrees in [-90, 90]
pub fn parse_dec(input: &str) -> PlannerResult<f64> {
    let degrees = match DMS_REGEX.captures(input) {
        Some(caps) => sexagesimal_value(&caps, input)?,
        None => parse_decimal(input)?,
    };

    if !(-90.0..=90.0).contains(&degrees) {
        return Err(PlannerError::coordinate_format(
            input,
            "declination must be within -90°..+90°",
        ));
    }

    Ok(degrees)
}

/// Parse manually entered RA/Dec into a catalog-frame coordinate
pub fn parse_coordinates(ra: &str, dec: &str) -> PlannerResult<EquatorialCoordinate> {
    let ra_deg = parse_ra(ra)?;
    let dec_deg = parse_dec(dec)?;
    Ok(EquatorialCoordinate::new(ra_deg, dec_deg, Frame::Icrs))
}

fn parse_decimal(input: &str) -> PlannerResult<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PlannerError::coordinate_format(input, "not a sexagesimal or decimal value"))
}

fn sexagesimal_value(caps: &regex::Captures<'_>, input: &str) -> PlannerResult<f64> {
    let field = |i: usize| -> PlannerResult<f64> {
        caps[i]
            .parse::<f64>()
            .map_err(|e| PlannerError::coordinate_format(input, e.to_string()))
    };

    let sign = match caps.get(1).map(|m| m.as_str()) {
        Some("-") => -1.0,
        _ => 1.0,
    };
    let whole = field(2)?;
    let minutes = field(3)?;
    let seconds = field(4)?;

    if minutes >= 60.0 || seconds >= 60.0 {
        return Err(PlannerError::coordinate_format(
            input,
            "minutes and seconds must be below 60",
        ));
    }

    Ok(sign * (whole + minutes / 60.0 + seconds / 3600.0))
}

/// Format degrees as `HH:MM:SS.ss` hours, wrapped into [0h, 24h)
pub fn format_hms(degrees: f64, precision: usize) -> String {
    let hours = degrees.rem_euclid(360.0) / 15.0;
    let (_, whole, minutes, seconds) = split_sexagesimal(hours, precision);
    let whole = if whole >= 24 { whole - 24 } else { whole };
    format!("{:02}:{:02}:{}", whole, minutes, seconds)
}

/// Format degrees as `[-]DD:MM:SS.ss`
pub fn format_dms(degrees: f64, precision: usize) -> String {
    let (negative, whole, minutes, seconds) = split_sexagesimal(degrees, precision);
    let sign = if negative { "-" } else { "" };
    format!("{}{:02}:{:02}:{}", sign, whole, minutes, seconds)
}

/// Split into sign, whole units, minutes and a formatted seconds field.
/// Rounding happens once on the total so that 59.999s carries upward.
fn split_sexagesimal(value: f64, precision: usize) -> (bool, u64, u64, String) {
    let scale = 10u64.pow(precision as u32);
    let total = (value.abs() * 3600.0 * scale as f64).round() as u64;

    let whole = total / (3600 * scale);
    let rem = total % (3600 * scale);
    let minutes = rem / (60 * scale);
    let second_units = rem % (60 * scale);

    let seconds = if precision == 0 {
        format!("{:02}", second_units)
    } else {
        format!(
            "{:02}.{:0width$}",
            second_units / scale,
            second_units % scale,
            width = precision
        )
    };

    (value < 0.0 && total > 0, whole, minutes, seconds)
}
