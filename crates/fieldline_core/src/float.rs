//! Approximate floating-point comparison measured in units in the last place (ULP).

/// Default number of ULPs two values may differ by and still compare equal.
pub const DEFAULT_ULP: u64 = 10;

/// Compares two values using [`DEFAULT_ULP`].
pub fn approx_eq(a: f64, b: f64) -> bool {
    approx_eq_ulps(a, b, DEFAULT_ULP)
}

/// Returns true when `a` and `b` are at most `ulps` representable values apart.
/// Values of opposite sign are compared by their distance through zero.
pub fn approx_eq_ulps(a: f64, b: f64, ulps: u64) -> bool {
    if a == b {
        return true;
    }
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_sign_negative() != b.is_sign_negative() {
        return a.abs().to_bits().saturating_add(b.abs().to_bits()) <= ulps;
    }
    a.to_bits().abs_diff(b.to_bits()) <= ulps
}

/// Relative error between two values; zero when both are (approximately) zero.
pub fn relative_error(a: f64, b: f64) -> f64 {
    if approx_eq(a, 0.0) && approx_eq(b, 0.0) {
        return 0.0;
    }
    (a - b).abs() / a.abs().max(b.abs())
}
