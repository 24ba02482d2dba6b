// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Numeric Guards
// ─────────────────────────────────────────────────────────────────────
//! Floor-preserving arithmetic shared by every kernel.
//!
//! No value leaving a kernel is allowed to be NaN, ±Inf, or smaller in
//! magnitude than [`FLOOR`].

/// Minimum magnitude of any reported quantity.
pub const FLOOR: f64 = 1e-30;

/// Exponent bound applied by [`safe_exp`].
pub const EXP_LIMIT: f64 = 100.0;

/// `±FLOOR` carrying the sign of `x` (NaN and zero map to `+FLOOR`).
#[inline]
fn signed_floor(x: f64) -> f64 {
    if x < 0.0 {
        -FLOOR
    } else {
        FLOOR
    }
}

/// `a / b`, or `±FLOOR` (sign of `a`) when the divisor is below the floor,
/// the quotient is non-finite, or the quotient is smaller than the floor.
#[inline]
pub fn safe_div(a: f64, b: f64) -> f64 {
    if b.is_finite() && b.abs() >= FLOOR {
        let q = a / b;
        if q.is_finite() && q.abs() >= FLOOR {
            return q;
        }
    }
    signed_floor(a)
}

/// `exp(x)` with `x` clamped to `[-100, 100]`; non-finite input gives 1.
#[inline]
pub fn safe_exp(x: f64) -> f64 {
    if !x.is_finite() {
        return 1.0;
    }
    x.clamp(-EXP_LIMIT, EXP_LIMIT).exp()
}

/// Replace NaN/Inf with `FLOOR` and sub-floor values with `±FLOOR`.
#[inline]
pub fn scrub(x: f64) -> f64 {
    if !x.is_finite() {
        return FLOOR;
    }
    if x.abs() < FLOOR {
        return signed_floor(x);
    }
    x
}

/// `max(x, FLOOR)`, with non-finite input mapped to `FLOOR`.
#[inline]
pub fn floor_clamp(x: f64) -> f64 {
    if x.is_finite() && x >= FLOOR {
        x
    } else {
        FLOOR
    }
}

/// True for values [`scrub`] would have to replace because they are not finite.
#[inline]
pub fn is_anomalous(x: f64) -> bool {
    !x.is_finite()
}

/// Clamp a parameter into `[lo, hi]`, mapping NaN to `lo` and ±Inf to the
/// nearest bound.
#[inline]
pub fn clamp_param(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        return lo;
    }
    if value.is_infinite() {
        return if value > 0.0 { hi } else { lo };
    }
    value.clamp(lo, hi)
}
