//! Conversions from the catalog's APEX encodings to photographic units
//!
//! The catalog stores aperture as `Av = 2 * log2(N)` and shutter speed as
//! `Tv = log2(1 / t)`. Both functions are total over finite floats; callers
//! filter out NULL values in SQL before converting. Values beyond
//! [`MAX_STOPS`] stops saturate there.

/// Largest magnitude, in stops, a converted value can reach (2^60 fits u64)
pub const MAX_STOPS: f64 = 60.0;

/// Exposure times at or above this many seconds render as whole seconds.
const SECONDS_THRESHOLD: f64 = 1.0;

/// Slack for exposure times that decode to a hair under one second.
const SECONDS_EPSILON: f64 = 1e-9;

/// Convert an APEX aperture value to an f-number
///
/// `N = 2^(Av / 2)`, so an APEX value of 0 is f/1.0.
pub fn aperture_to_f_number(apex_value: f64) -> f64 {
    2f64.powf((apex_value / 2.0).clamp(-MAX_STOPS, MAX_STOPS))
}

/// Format an f-number the way distribution labels carry it (one decimal place)
pub fn format_f_number(f_number: f64) -> String {
    format!("{:.1}", f_number)
}

/// Convert an APEX shutter-speed value to a human exposure time
///
/// Exposures of one second or longer render as seconds (`"2s"`, `"1s"`,
/// `"2.5s"`). Shorter exposures render as a reciprocal fraction (`"1/250"`),
/// with the denominator rounded by [`reciprocal_denominator`]. Exposures that
/// are shorter than a second but too long to round to a denominator above 1
/// (e.g. 0.8s) fall back to the seconds form.
pub fn shutter_speed_to_exposure_time(apex_value: f64) -> String {
    let seconds = 2f64.powf(-apex_value.clamp(-MAX_STOPS, MAX_STOPS));

    if seconds >= SECONDS_THRESHOLD - SECONDS_EPSILON {
        return format_seconds(seconds);
    }

    let denominator = reciprocal_denominator(1.0 / seconds);
    if denominator <= 1 {
        return format_seconds(seconds);
    }

    format!("1/{}", denominator)
}

/// Round a reciprocal exposure to its display denominator
///
/// Rounds to the nearest integer, with exact halves rounded away from zero
/// (2.5 -> 3). Labels built from this value are merge keys, so the policy
/// must not change silently.
pub fn reciprocal_denominator(reciprocal: f64) -> u64 {
    reciprocal.round().max(0.0) as u64
}

fn format_seconds(seconds: f64) -> String {
    let tenths = (seconds * 10.0).round() / 10.0;
    if tenths.fract() == 0.0 {
        format!("{}s", tenths as u64)
    } else {
        format!("{:.1}s", tenths)
    }
}
