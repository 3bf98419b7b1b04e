//! Numeric conversion helpers centralizing safe numeric casts and money rounding.

use num_traits::cast::cast;

/// Round a f64 to two decimal places, returning 0.0 for non-finite values.
#[must_use]
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert a quantity to f64.
#[must_use]
pub fn u32_to_f64(value: u32) -> f64 {
    f64::from(value)
}

/// Floor a f64 and clamp it to the usize range, returning 0 for non-finite or negative values.
#[must_use]
pub fn floor_f64_to_usize(value: f64) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    cast::<f64, usize>(value.floor()).unwrap_or(usize::MAX)
}

/// Monetary product `price * quantity`, rounded to cents.
#[must_use]
pub fn notional(price: f64, quantity: u32) -> f64 {
    round2(price * u32_to_f64(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_handles_non_finite() {
        assert!((round2(f64::NAN) - 0.0).abs() < f64::EPSILON);
        assert!((round2(f64::INFINITY) - 0.0).abs() < f64::EPSILON);
        assert!((round2(1.005_1) - 1.01).abs() < 1e-9);
        assert!((round2(-2.344) + 2.34).abs() < 1e-9);
    }

    #[test]
    fn floor_clamps_negative_and_nan() {
        assert_eq!(floor_f64_to_usize(2.9), 2);
        assert_eq!(floor_f64_to_usize(-1.0), 0);
        assert_eq!(floor_f64_to_usize(f64::NAN), 0);
    }

    #[test]
    fn notional_rounds_to_cents() {
        assert!((notional(10.333, 3) - 31.0).abs() < 1e-9);
        assert!((usize_to_f64(7) - 7.0).abs() < f64::EPSILON);
    }
}
