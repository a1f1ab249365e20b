//! Lunar geometry
//!
//! Position from the leading periodic terms of Meeus, "Astronomical
//! Algorithms" ch. 47 (a few arc-minutes), illuminated fraction from the
//! phase angle of ch. 48. Both are plenty for judging lunar interference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::frames::{
    ecliptic_to_equatorial, julian_centuries, julian_date_tt, mean_obliquity, normalize_degrees,
    EquatorialCoordinate, Frame,
};

/// Moon position and phase at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LunarState {
    pub coordinate: EquatorialCoordinate,
    /// Illuminated fraction of the disc, 0..=100
    pub illumination_pct: f64,
    pub distance_km: f64,
}

/// Compute the Moon's geocentric position and illumination at an instant
pub fn lunar_state(instant: &DateTime<Utc>) -> LunarState {
    let jd_tt = julian_date_tt(instant);
    let args = Arguments::at(julian_centuries(jd_tt));
    let (longitude, latitude, distance_km) = ecliptic_position(&args);
    let (ra, dec) = ecliptic_to_equatorial(longitude, latitude, mean_obliquity(jd_tt));

    LunarState {
        coordinate: EquatorialCoordinate::new(ra, dec, Frame::EquinoxOfDate { jd_tt })
            .at_epoch(*instant),
        illumination_pct: illuminated_fraction(&args) * 100.0,
        distance_km,
    }
}

/// Angular distance between a target and the Moon, in degrees
pub fn separation_from(target: &EquatorialCoordinate, moon: &LunarState) -> f64 {
    target.separation(&moon.coordinate)
}

/// Fundamental arguments in degrees
struct Arguments {
    t: f64,
    /// Mean longitude of the Moon (L')
    mean_longitude: f64,
    /// Mean elongation (D)
    elongation: f64,
    /// Sun's mean anomaly (M)
    sun_anomaly: f64,
    /// Moon's mean anomaly (M')
    moon_anomaly: f64,
    /// Argument of latitude (F)
    latitude_argument: f64,
}

impl Arguments {
    fn at(t: f64) -> Self {
        let t2 = t * t;
        let t3 = t2 * t;
        let t4 = t3 * t;
        Self {
            t,
            mean_longitude: normalize_degrees(
                218.316_447_7 + 481_267.881_234_21 * t - 0.001_578_6 * t2 + t3 / 538_841.0
                    - t4 / 65_194_000.0,
            ),
            elongation: normalize_degrees(
                297.850_192_1 + 445_267.111_403_4 * t - 0.001_881_9 * t2 + t3 / 545_868.0
                    - t4 / 113_065_000.0,
            ),
            sun_anomaly: normalize_degrees(
                357.529_109_2 + 35_999.050_290_9 * t - 0.000_153_6 * t2 + t3 / 24_490_000.0,
            ),
            moon_anomaly: normalize_degrees(
                134.963_396_4 + 477_198.867_505_5 * t + 0.008_741_4 * t2 + t3 / 69_699.0
                    - t4 / 14_712_000.0,
            ),
            latitude_argument: normalize_degrees(
                93.272_095_0 + 483_202.017_523_3 * t - 0.003_653_9 * t2 - t3 / 3_526_000.0
                    + t4 / 863_310_000.0,
            ),
        }
    }

    fn argument(&self, d: f64, m: f64, mp: f64, f: f64) -> f64 {
        (d * self.elongation + m * self.sun_anomaly + mp * self.moon_anomaly + f * self.latitude_argument)
            .to_radians()
    }

    /// Correction for the decreasing eccentricity of Earth's orbit
    fn eccentricity_factor(&self, m: f64) -> f64 {
        let e = 1.0 - 0.002_516 * self.t - 0.000_007_4 * self.t * self.t;
        match m.abs() as u8 {
            1 => e,
            2 => e * e,
            _ => 1.0,
        }
    }
}

// (D, M, M', F, longitude in 1e-6 deg, distance in 1e-3 km)
const LONGITUDE_DISTANCE_TERMS: [(f64, f64, f64, f64, f64, f64); 30] = [
    (0.0, 0.0, 1.0, 0.0, 6_288_774.0, -20_905_355.0),
    (2.0, 0.0, -1.0, 0.0, 1_274_027.0, -3_699_111.0),
    (2.0, 0.0, 0.0, 0.0, 658_314.0, -2_955_968.0),
    (0.0, 0.0, 2.0, 0.0, 213_618.0, -569_925.0),
    (0.0, 1.0, 0.0, 0.0, -185_116.0, 48_888.0),
    (0.0, 0.0, 0.0, 2.0, -114_332.0, -3_149.0),
    (2.0, 0.0, -2.0, 0.0, 58_793.0, 246_158.0),
    (2.0, -1.0, -1.0, 0.0, 57_066.0, -152_138.0),
    (2.0, 0.0, 1.0, 0.0, 53_322.0, -170_733.0),
    (2.0, -1.0, 0.0, 0.0, 45_758.0, -204_586.0),
    (0.0, 1.0, -1.0, 0.0, -40_923.0, -129_620.0),
    (1.0, 0.0, 0.0, 0.0, -34_720.0, 108_743.0),
    (0.0, 1.0, 1.0, 0.0, -30_383.0, 104_755.0),
    (2.0, 0.0, 0.0, -2.0, 15_327.0, 10_321.0),
    (0.0, 0.0, 1.0, 2.0, -12_528.0, 0.0),
    (0.0, 0.0, 1.0, -2.0, 10_980.0, 79_661.0),
    (4.0, 0.0, -1.0, 0.0, 10_675.0, -34_782.0),
    (0.0, 0.0, 3.0, 0.0, 10_034.0, -23_210.0),
    (4.0, 0.0, -2.0, 0.0, 8_548.0, -21_636.0),
    (2.0, 1.0, -1.0, 0.0, -7_888.0, 24_208.0),
    (2.0, 1.0, 0.0, 0.0, -6_766.0, 30_824.0),
    (1.0, 0.0, -1.0, 0.0, -5_163.0, -8_379.0),
    (1.0, 1.0, 0.0, 0.0, 4_987.0, -16_675.0),
    (2.0, -1.0, 1.0, 0.0, 4_036.0, -12_831.0),
    (2.0, 0.0, 2.0, 0.0, 3_994.0, -10_445.0),
    (4.0, 0.0, 0.0, 0.0, 3_861.0, -11_650.0),
    (2.0, 0.0, -3.0, 0.0, 3_665.0, 14_403.0),
    (0.0, 1.0, -2.0, 0.0, -2_689.0, -7_003.0),
    (2.0, 0.0, -1.0, 2.0, -2_602.0, 0.0),
    (2.0, -1.0, -2.0, 0.0, 2_390.0, 10_056.0),
];

// (D, M, M', F, latitude in 1e-6 deg)
const LATITUDE_TERMS: [(f64, f64, f64, f64, f64); 20] = [
    (0.0, 0.0, 0.0, 1.0, 5_128_122.0),
    (0.0, 0.0, 1.0, 1.0, 280_602.0),
    (0.0, 0.0, 1.0, -1.0, 277_693.0),
    (2.0, 0.0, 0.0, -1.0, 173_237.0),
    (2.0, 0.0, -1.0, 1.0, 55_413.0),
    (2.0, 0.0, -1.0, -1.0, 46_271.0),
    (2.0, 0.0, 0.0, 1.0, 32_573.0),
    (0.0, 0.0, 2.0, 1.0, 17_198.0),
    (2.0, 0.0, 1.0, -1.0, 9_266.0),
    (0.0, 0.0, 2.0, -1.0, 8_822.0),
    (2.0, -1.0, 0.0, -1.0, 8_216.0),
    (2.0, 0.0, -2.0, -1.0, 4_324.0),
    (2.0, 0.0, 1.0, 1.0, 4_200.0),
    (2.0, 1.0, 0.0, -1.0, -3_359.0),
    (2.0, -1.0, -1.0, 1.0, 2_463.0),
    (2.0, -1.0, 0.0, 1.0, 2_211.0),
    (2.0, -1.0, -1.0, -1.0, 2_065.0),
    (0.0, 1.0, -1.0, -1.0, -1_870.0),
    (4.0, 0.0, -1.0, -1.0, 1_828.0),
    (0.0, 1.0, 0.0, 1.0, -1_794.0),
];

/// Geocentric ecliptic longitude, latitude (mean equinox of date, degrees)
/// and distance in km
fn ecliptic_position(args: &Arguments) -> (f64, f64, f64) {
    let mut sum_l = 0.0;
    let mut sum_r = 0.0;
    for &(d, m, mp, f, l, r) in LONGITUDE_DISTANCE_TERMS.iter() {
        let arg = args.argument(d, m, mp, f);
        let e = args.eccentricity_factor(m);
        sum_l += l * e * arg.sin();
        sum_r += r * e * arg.cos();
    }

    let mut sum_b = 0.0;
    for &(d, m, mp, f, b) in LATITUDE_TERMS.iter() {
        sum_b += b * args.eccentricity_factor(m) * args.argument(d, m, mp, f).sin();
    }

    // Venus, Jupiter and flattening terms
    let t = args.t;
    let a1 = (119.75 + 131.849 * t).to_radians();
    let a2 = (53.09 + 479_264.290 * t).to_radians();
    let a3 = (313.45 + 481_266.484 * t).to_radians();
    let lp = args.mean_longitude.to_radians();
    let mp = args.moon_anomaly.to_radians();
    let f = args.latitude_argument.to_radians();

    sum_l += 3958.0 * a1.sin() + 1962.0 * (lp - f).sin() + 318.0 * a2.sin();
    sum_b += -2235.0 * lp.sin() + 382.0 * a3.sin() + 175.0 * (a1 - f).sin() + 175.0 * (a1 + f).sin()
        + 127.0 * (lp - mp).sin()
        - 115.0 * (lp + mp).sin();

    (
        normalize_degrees(args.mean_longitude + sum_l / 1_000_000.0),
        sum_b / 1_000_000.0,
        385_000.56 + sum_r / 1000.0,
    )
}

/// Illuminated fraction (0..=1) from the approximate phase angle
fn illuminated_fraction(args: &Arguments) -> f64 {
    let d = args.elongation.to_radians();
    let m = args.sun_anomaly.to_radians();
    let mp = args.moon_anomaly.to_radians();

    let phase_angle = 180.0 - args.elongation - 6.289 * mp.sin() + 2.100 * m.sin()
        - 1.274 * (2.0 * d - mp).sin()
        - 0.658 * (2.0 * d).sin()
        - 0.214 * (2.0 * mp).sin()
        - 0.110 * d.sin();

    ((1.0 + phase_angle.to_radians().cos()) / 2.0).clamp(0.0, 1.0)
}
