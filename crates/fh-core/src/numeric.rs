use crate::CoreError;

/// Floating point type used for readings and setpoints.
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Clamp without panicking on inverted bounds: `low` wins.
pub fn clamp(value: Real, low: Real, high: Real) -> Real {
    low.max(high.min(value))
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: Real, places: u32) -> Real {
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}

/// Parse a loosely typed reading into a finite number.
///
/// Returns `None` for empty, non-numeric, or non-finite text; callers treat
/// that the same as a missing reading.
pub fn parse_reading(raw: &str) -> Option<Real> {
    raw.trim().parse::<Real>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn clamp_prefers_low_bound_when_inverted() {
        assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.5, 2.0, 1.0), 2.0);
    }

    #[test]
    fn round_to_places() {
        assert_eq!(round_to(20.456, 2), 20.46);
        assert_eq!(round_to(-0.12345, 3), -0.123);
        assert_eq!(round_to(1.0, 3), 1.0);
    }

    #[test]
    fn parse_reading_rejects_garbage() {
        assert_eq!(parse_reading(" 21.5 "), Some(21.5));
        assert_eq!(parse_reading("unavailable"), None);
        assert_eq!(parse_reading(""), None);
        assert_eq!(parse_reading("NaN"), None);
        assert_eq!(parse_reading("inf"), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn clamp_stays_in_bounds(v in -1e6f64..1e6, low in -100.0f64..0.0, high in 0.0f64..100.0) {
            let c = clamp(v, low, high);
            prop_assert!(c >= low && c <= high);
        }

        #[test]
        fn round_to_is_idempotent(v in -1e4f64..1e4, places in 0u32..4) {
            let once = round_to(v, places);
            prop_assert_eq!(round_to(once, places), once);
        }
    }
}
