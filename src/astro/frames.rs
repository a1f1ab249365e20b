//! Coordinate frame adapter
//!
//! Julian dates, IAU 1976 precession, a short nutation series and sidereal
//! time: enough to carry a catalog position to altitude/azimuth for an
//! observer at a given instant. Arc-second accuracy is not a goal here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const J2000_JD: f64 = 2_451_545.0;
pub const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;

const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const SECONDS_PER_DAY: f64 = 86_400.0;
/// TAI-UTC (37 s, unchanged since 2017) plus TT-TAI (32.184 s)
const TT_MINUS_UTC_SECONDS: f64 = 69.184;
const ARCSEC_TO_DEG: f64 = 1.0 / 3600.0;

type Vec3 = [f64; 3];

/// Julian date of a UTC instant (UT1 is taken equal to UTC)
pub fn julian_date(instant: &DateTime<Utc>) -> f64 {
    let seconds =
        instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) * 1e-9;
    UNIX_EPOCH_JD + seconds / SECONDS_PER_DAY
}

/// Julian date on the Terrestrial Time scale
pub fn julian_date_tt(instant: &DateTime<Utc>) -> f64 {
    julian_date(instant) + TT_MINUS_UTC_SECONDS / SECONDS_PER_DAY
}

pub fn julian_centuries(jd: f64) -> f64 {
    (jd - J2000_JD) / DAYS_PER_JULIAN_CENTURY
}

/// Wrap an angle into [0, 360)
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid of a tiny negative value rounds up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Equatorial reference frame of a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Frame {
    /// Catalog frame. Mean equator and equinox of J2000 at this precision.
    Icrs,
    /// Mean equator and equinox of the given date (TT Julian date)
    #[serde(rename_all = "camelCase")]
    EquinoxOfDate { jd_tt: f64 },
}

impl Frame {
    pub fn equinox_of(instant: &DateTime<Utc>) -> Self {
        Frame::EquinoxOfDate {
            jd_tt: julian_date_tt(instant),
        }
    }
}

/// Right ascension / declination in a named frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquatorialCoordinate {
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub frame: Frame,
    /// Instant the position applies to, for bodies that move
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<DateTime<Utc>>,
}

impl EquatorialCoordinate {
    pub fn new(ra_deg: f64, dec_deg: f64, frame: Frame) -> Self {
        Self {
            ra_deg: normalize_degrees(ra_deg),
            dec_deg: dec_deg.clamp(-90.0, 90.0),
            frame,
            epoch: None,
        }
    }

    pub fn icrs(ra_deg: f64, dec_deg: f64) -> Self {
        Self::new(ra_deg, dec_deg, Frame::Icrs)
    }

    pub fn at_epoch(mut self, epoch: DateTime<Utc>) -> Self {
        self.epoch = Some(epoch);
        self
    }

    /// Re-express this position in another frame, pivoting through J2000
    pub fn to_frame(&self, frame: Frame) -> Self {
        if self.frame == frame {
            return *self;
        }

        let mut v = unit_vector(self.ra_deg, self.dec_deg);
        if let Frame::EquinoxOfDate { jd_tt } = self.frame {
            v = unprecess(v, jd_tt);
        }
        if let Frame::EquinoxOfDate { jd_tt } = frame {
            v = precess(v, jd_tt);
        }

        let (ra_deg, dec_deg) = spherical(v);
        Self {
            ra_deg,
            dec_deg,
            frame,
            epoch: self.epoch,
        }
    }

    /// Angular distance to another coordinate, in degrees
    pub fn separation(&self, other: &EquatorialCoordinate) -> f64 {
        let other = other.to_frame(self.frame);
        angular_separation(self.ra_deg, self.dec_deg, other.ra_deg, other.dec_deg)
    }
}

/// Altitude/azimuth of a target plus the sidereal time it was computed at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalCoordinate {
    pub altitude_deg: f64,
    /// Measured from north through east, in [0, 360)
    pub azimuth_deg: f64,
    /// Local apparent sidereal time, in degrees
    pub lst_deg: f64,
}

/// Transform an equatorial coordinate into the local horizontal frame
pub fn equatorial_to_horizontal(
    coord: &EquatorialCoordinate,
    latitude_deg: f64,
    longitude_deg: f64,
    instant: &DateTime<Utc>,
) -> HorizontalCoordinate {
    let jd_tt = julian_date_tt(instant);
    let (ra_deg, dec_deg) = apparent_place(coord, jd_tt);
    let lst_deg = local_apparent_sidereal_time(instant, longitude_deg);
    let (altitude_deg, azimuth_deg) =
        hour_angle_to_horizontal(lst_deg - ra_deg, dec_deg, latitude_deg);

    HorizontalCoordinate {
        altitude_deg,
        azimuth_deg,
        lst_deg,
    }
}

/// Apparent right ascension and declination (true equator and equinox of date)
pub fn apparent_place(coord: &EquatorialCoordinate, jd_tt: f64) -> (f64, f64) {
    let mean = coord.to_frame(Frame::EquinoxOfDate { jd_tt });
    let nutation = Nutation::at(jd_tt);
    let eps_mean = mean_obliquity(jd_tt);
    let eps_true = eps_mean + nutation.obliquity_deg;

    let v = unit_vector(mean.ra_deg, mean.dec_deg);
    let v = rotate_x(v, eps_mean);
    let v = rotate_z(v, nutation.longitude_deg);
    let v = rotate_x(v, -eps_true);
    spherical(v)
}

/// Altitude and azimuth (north through east) from hour angle and declination
pub fn hour_angle_to_horizontal(hour_angle_deg: f64, dec_deg: f64, latitude_deg: f64) -> (f64, f64) {
    let h = hour_angle_deg.to_radians();
    let dec = dec_deg.to_radians();
    let lat = latitude_deg.to_radians();

    let sin_alt = lat.sin() * dec.sin() + lat.cos() * dec.cos() * h.cos();
    let altitude = sin_alt.clamp(-1.0, 1.0).asin().to_degrees();

    let y = -dec.cos() * h.sin();
    let x = dec.sin() * lat.cos() - dec.cos() * lat.sin() * h.cos();
    let azimuth = normalize_degrees(y.atan2(x).to_degrees());

    (altitude, azimuth)
}

/// Greenwich mean sidereal time in degrees (IAU 1982 expression)
pub fn greenwich_mean_sidereal_time(jd_ut: f64) -> f64 {
    let t = julian_centuries(jd_ut);
    normalize_degrees(
        280.460_618_37 + 360.985_647_366_29 * (jd_ut - J2000_JD) + 0.000_387_933 * t * t
            - t * t * t / 38_710_000.0,
    )
}

/// Greenwich apparent sidereal time in degrees
pub fn greenwich_apparent_sidereal_time(instant: &DateTime<Utc>) -> f64 {
    let jd_tt = julian_date_tt(instant);
    let nutation = Nutation::at(jd_tt);
    let eps = (mean_obliquity(jd_tt) + nutation.obliquity_deg).to_radians();
    let equation_of_equinoxes = nutation.longitude_deg * eps.cos();
    normalize_degrees(greenwich_mean_sidereal_time(julian_date(instant)) + equation_of_equinoxes)
}

/// Local apparent sidereal time in degrees for an east-positive longitude
pub fn local_apparent_sidereal_time(instant: &DateTime<Utc>, longitude_deg: f64) -> f64 {
    normalize_degrees(greenwich_apparent_sidereal_time(instant) + longitude_deg)
}

/// Mean obliquity of the ecliptic in degrees
pub fn mean_obliquity(jd_tt: f64) -> f64 {
    let t = julian_centuries(jd_tt);
    23.0 + 26.0 / 60.0 + 21.448 * ARCSEC_TO_DEG
        - (46.8150 * t + 0.000_59 * t * t - 0.001_813 * t * t * t) * ARCSEC_TO_DEG
}

/// Nutation in longitude and obliquity, in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nutation {
    pub longitude_deg: f64,
    pub obliquity_deg: f64,
}

impl Nutation {
    /// Four-term series, good to about half an arc-second
    pub fn at(jd_tt: f64) -> Self {
        let t = julian_centuries(jd_tt);
        let omega = (125.044_52 - 1934.136_261 * t).to_radians();
        let sun = (280.4665 + 36_000.7698 * t).to_radians();
        let moon = (218.3165 + 481_267.8813 * t).to_radians();

        let dpsi = -17.20 * omega.sin() - 1.32 * (2.0 * sun).sin() - 0.23 * (2.0 * moon).sin()
            + 0.21 * (2.0 * omega).sin();
        let deps = 9.20 * omega.cos() + 0.57 * (2.0 * sun).cos() + 0.10 * (2.0 * moon).cos()
            - 0.09 * (2.0 * omega).cos();

        Self {
            longitude_deg: dpsi * ARCSEC_TO_DEG,
            obliquity_deg: deps * ARCSEC_TO_DEG,
        }
    }
}

/// Ecliptic longitude/latitude to right ascension/declination for the given
/// obliquity, all in degrees
pub fn ecliptic_to_equatorial(longitude_deg: f64, latitude_deg: f64, obliquity_deg: f64) -> (f64, f64) {
    spherical(rotate_x(unit_vector(longitude_deg, latitude_deg), -obliquity_deg))
}

/// Great-circle separation in degrees (Vincenty form, stable at all distances)
pub fn angular_separation(ra1_deg: f64, dec1_deg: f64, ra2_deg: f64, dec2_deg: f64) -> f64 {
    let d_ra = (ra2_deg - ra1_deg).to_radians();
    let (d1, d2) = (dec1_deg.to_radians(), dec2_deg.to_radians());

    let a = d2.cos() * d_ra.sin();
    let b = d1.cos() * d2.sin() - d1.sin() * d2.cos() * d_ra.cos();
    let numerator = (a * a + b * b).sqrt();
    let denominator = d1.sin() * d2.sin() + d1.cos() * d2.cos() * d_ra.cos();

    numerator.atan2(denominator).to_degrees()
}

/// Precession angles (zeta, z, theta) from J2000 to the given date, in degrees
fn precession_angles(jd_tt: f64) -> (f64, f64, f64) {
    let t = julian_centuries(jd_tt);
    let zeta = (2306.2181 + (0.301_88 + 0.017_998 * t) * t) * t;
    let z = (2306.2181 + (1.094_68 + 0.018_203 * t) * t) * t;
    let theta = (2004.3109 - (0.426_65 + 0.041_833 * t) * t) * t;
    (zeta * ARCSEC_TO_DEG, z * ARCSEC_TO_DEG, theta * ARCSEC_TO_DEG)
}

fn precess(v: Vec3, jd_tt: f64) -> Vec3 {
    let (zeta, z, theta) = precession_angles(jd_tt);
    let v = rotate_z(v, zeta);
    let v = rotate_y(v, theta);
    rotate_z(v, z)
}

fn unprecess(v: Vec3, jd_tt: f64) -> Vec3 {
    let (zeta, z, theta) = precession_angles(jd_tt);
    let v = rotate_z(v, -z);
    let v = rotate_y(v, -theta);
    rotate_z(v, -zeta)
}

fn unit_vector(ra_deg: f64, dec_deg: f64) -> Vec3 {
    let (ra, dec) = (ra_deg.to_radians(), dec_deg.to_radians());
    [dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin()]
}

fn spherical(v: Vec3) -> (f64, f64) {
    let ra = normalize_degrees(v[1].atan2(v[0]).to_degrees());
    let dec = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt()).to_degrees();
    (ra, dec)
}

/// Rotation about the polar axis that increases longitude by `angle_deg`
fn rotate_z(v: Vec3, angle_deg: f64) -> Vec3 {
    let (s, c) = angle_deg.to_radians().sin_cos();
    [c * v[0] - s * v[1], s * v[0] + c * v[1], v[2]]
}

/// Tilts the pole toward +x by `angle_deg`
fn rotate_y(v: Vec3, angle_deg: f64) -> Vec3 {
    let (s, c) = angle_deg.to_radians().sin_cos();
    [c * v[0] - s * v[2], v[1], s * v[0] + c * v[2]]
}

/// Equatorial to ecliptic for a positive obliquity
fn rotate_x(v: Vec3, angle_deg: f64) -> Vec3 {
    let (s, c) = angle_deg.to_radians().sin_cos();
    [v[0], c * v[1] + s * v[2], -s * v[1] + c * v[2]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_julian_date_of_j2000() {
        let instant = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert!((julian_date(&instant) - J2000_JD).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(370.0), 10.0);
        assert_eq!(normalize_degrees(-10.0), 350.0);
        assert_eq!(normalize_degrees(-1e-15), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
    }

    #[test]
    fn test_gmst_meeus_example_12b() {
        // 1987 April 10, 19h21m00s UT
        let gmst = greenwich_mean_sidereal_time(2_446_896.306_25);
        assert!((gmst - 128.737_873_4).abs() < 1e-5, "gmst = {}", gmst);
    }

    #[test]
    fn test_nutation_meeus_example_22a() {
        // 1987 April 10, 0h TD
        let nutation = Nutation::at(2_446_895.5);
        assert!((nutation.longitude_deg * 3600.0 - (-3.788)).abs() < 0.5);
        assert!((nutation.obliquity_deg * 3600.0 - 9.443).abs() < 0.5);

        let eps0 = mean_obliquity(2_446_895.5);
        let expected = 23.0 + 26.0 / 60.0 + 27.407 / 3600.0;
        assert!((eps0 - expected).abs() < 1e-5);
    }

    #[test]
    fn test_precession_meeus_example_21b() {
        // theta Persei, J2000 position with proper motion applied, to 2028 Nov 13.19 TD
        let j2000 = EquatorialCoordinate::icrs(41.054_063, 49.227_750);
        let of_date = j2000.to_frame(Frame::EquinoxOfDate { jd_tt: 2_462_088.69 });
        assert!((of_date.ra_deg - 41.547_214).abs() < 1e-4, "ra = {}", of_date.ra_deg);
        assert!((of_date.dec_deg - 49.348_483).abs() < 1e-4, "dec = {}", of_date.dec_deg);
    }

    #[test]
    fn test_precession_round_trip() {
        let original = EquatorialCoordinate::icrs(279.2347, 38.7837);
        let date = Frame::EquinoxOfDate { jd_tt: 2_461_000.5 };
        let back = original.to_frame(date).to_frame(Frame::Icrs);
        assert!((back.ra_deg - original.ra_deg).abs() < 1e-9);
        assert!((back.dec_deg - original.dec_deg).abs() < 1e-9);
    }

    #[test]
    fn test_horizontal_meeus_example_13b() {
        // Venus from the US Naval Observatory, 1987 April 10, 19h21m UT
        let (alt, az) = hour_angle_to_horizontal(64.352_133, -6.719_892, 38.921_389);
        assert!((alt - 15.1249).abs() < 1e-3, "alt = {}", alt);
        // Meeus measures azimuth from the south
        assert!((az - (68.0337 + 180.0)).abs() < 1e-3, "az = {}", az);
    }

    #[test]
    fn test_object_on_meridian_faces_south() {
        let (alt, az) = hour_angle_to_horizontal(0.0, 0.0, 45.0);
        assert!((alt - 45.0).abs() < 1e-9);
        assert!((az - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_equatorial_to_horizontal_ranges() {
        let instant = Utc.with_ymd_and_hms(2026, 2, 13, 3, 0, 0).unwrap();
        let vega = EquatorialCoordinate::icrs(279.2347, 38.7837);
        let horizontal = equatorial_to_horizontal(&vega, 51.5, -0.12, &instant);
        assert!((-90.0..=90.0).contains(&horizontal.altitude_deg));
        assert!((0.0..360.0).contains(&horizontal.azimuth_deg));
        assert!((0.0..360.0).contains(&horizontal.lst_deg));
    }

    #[test]
    fn test_zenith_object_has_altitude_ninety() {
        // A star whose apparent RA equals the LST and whose dec equals the latitude
        let instant = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let lst = local_apparent_sidereal_time(&instant, 10.0);
        let jd_tt = julian_date_tt(&instant);
        let apparent = EquatorialCoordinate::new(lst, 47.0, Frame::EquinoxOfDate { jd_tt });
        let horizontal = equatorial_to_horizontal(&apparent, 47.0, 10.0, &instant);
        assert!(horizontal.altitude_deg > 89.9, "alt = {}", horizontal.altitude_deg);
    }

    #[test]
    fn test_ecliptic_to_equatorial_meeus_example_13a() {
        // Pollux
        let (ra, dec) = ecliptic_to_equatorial(113.215_630, 6.684_170, 23.439_291_1);
        assert!((ra - 116.328_942).abs() < 1e-5, "ra = {}", ra);
        assert!((dec - 28.026_183).abs() < 1e-5, "dec = {}", dec);
    }

    #[test]
    fn test_angular_separation() {
        assert!((angular_separation(0.0, 0.0, 90.0, 0.0) - 90.0).abs() < 1e-9);
        assert!((angular_separation(10.0, 89.0, 190.0, 89.0) - 2.0).abs() < 1e-9);
        assert!(angular_separation(45.0, 30.0, 45.0, 30.0).abs() < 1e-12);
        assert!((angular_separation(0.0, -90.0, 123.0, 90.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_separation_across_frames() {
        let a = EquatorialCoordinate::icrs(83.8221, -5.3911);
        let b = a.to_frame(Frame::EquinoxOfDate { jd_tt: 2_461_084.5 });
        assert!(a.separation(&b) < 1e-9);
    }
}
