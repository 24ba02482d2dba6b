// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — NURBS Evaluator
// ─────────────────────────────────────────────────────────────────────
//! Scalar Non-Uniform Rational B-Spline evaluation:
//!
//!   C(u) = Σ_i N_{i,p}(u) w_i P_i / Σ_i N_{i,p}(u) w_i
//!
//! Knot-span bisection, triangular Cox-de Boor recurrence, rational sum.
//! Scratch arrays live on the stack so evaluation never allocates.

use serde::{Deserialize, Serialize};

use hyperlattice_types::numeric::{safe_div, scrub};
use hyperlattice_types::{LatticeError, LatticeResult};

/// Highest supported spline degree (sizes the stack scratch).
pub const MAX_DEGREE: usize = 7;

/// Curve parameters are clamped into `[0, 1 - U_EPSILON]`.
pub const U_EPSILON: f64 = 1e-10;

/// Clamp a curve parameter into `[0, 1 - U_EPSILON]`; NaN maps to 0.
#[inline]
pub fn clamp_u(u: f64) -> f64 {
    if u.is_nan() {
        return 0.0;
    }
    u.clamp(0.0, 1.0 - U_EPSILON)
}

/// Index `k` with `knots[k] <= u < knots[k + 1]`, searched in `[p, n - 1]`.
///
/// `u` is clamped into `[knots[p], knots[n]]` first; at the right end the
/// last non-degenerate span `n - 1` is returned.
pub fn find_span(u: f64, degree: usize, knots: &[f64], n_ctrl: usize) -> usize {
    let p = degree;
    let n = n_ctrl;
    let u = u.clamp(knots[p], knots[n]);

    if u >= knots[n] {
        return n - 1;
    }
    if u < knots[p + 1] {
        return p;
    }

    let mut low = p;
    let mut high = n;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Non-vanishing basis functions `N[0..=p]` on `span` (Cox-de Boor).
///
/// Only `out[..=degree]` is written.
pub fn basis_functions(span: usize, u: f64, degree: usize, knots: &[f64], out: &mut [f64]) {
    let mut left = [0.0f64; MAX_DEGREE + 1];
    let mut right = [0.0f64; MAX_DEGREE + 1];

    out[0] = 1.0;
    for j in 1..=degree {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = safe_div(out[r], right[r + 1] + left[j - r]);
            out[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        out[j] = saved;
    }
}

/// A validated scalar NURBS curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsCurve {
    control_points: Vec<f64>,
    weights: Vec<f64>,
    knots: Vec<f64>,
    degree: usize,
}

impl NurbsCurve {
    /// Build a curve, checking `|P| = |W|`, `|P| + p + 1 = |K|`,
    /// non-decreasing knots, and `1 <= p <= MAX_DEGREE`.
    pub fn new(
        control_points: Vec<f64>,
        weights: Vec<f64>,
        knots: Vec<f64>,
        degree: usize,
    ) -> LatticeResult<Self> {
        validate_shape(&control_points, &weights, &knots, degree)?;
        Ok(Self {
            control_points,
            weights,
            knots,
            degree,
        })
    }

    /// Skip validation for compile-time tables covered by the shape tests.
    pub(crate) fn from_trusted_parts(
        control_points: Vec<f64>,
        weights: Vec<f64>,
        knots: Vec<f64>,
        degree: usize,
    ) -> Self {
        Self {
            control_points,
            weights,
            knots,
            degree,
        }
    }

    pub fn control_points(&self) -> &[f64] {
        &self.control_points
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Evaluate the curve at `u` (clamped into `[0, 1 - ε]`).
    pub fn evaluate(&self, u: f64) -> f64 {
        evaluate_unchecked(
            clamp_u(u),
            &self.control_points,
            &self.weights,
            &self.knots,
            self.degree,
        )
    }
}

fn validate_shape(
    control_points: &[f64],
    weights: &[f64],
    knots: &[f64],
    degree: usize,
) -> LatticeResult<()> {
    if degree == 0 || degree > MAX_DEGREE {
        return Err(LatticeError::Config(format!(
            "NURBS degree must be in [1, {MAX_DEGREE}], got {degree}"
        )));
    }
    if control_points.len() <= degree {
        return Err(LatticeError::Config(format!(
            "NURBS needs more than {degree} control points, got {}",
            control_points.len()
        )));
    }
    if control_points.len() != weights.len() {
        return Err(LatticeError::Config(format!(
            "NURBS control points ({}) and weights ({}) differ in length",
            control_points.len(),
            weights.len()
        )));
    }
    if control_points.len() + degree + 1 != knots.len() {
        return Err(LatticeError::Config(format!(
            "NURBS knot vector must have {} entries, got {}",
            control_points.len() + degree + 1,
            knots.len()
        )));
    }
    if knots.windows(2).any(|w| w[0] > w[1]) || knots.iter().any(|k| !k.is_finite()) {
        return Err(LatticeError::Config(
            "NURBS knot vector must be finite and non-decreasing".to_string(),
        ));
    }
    if knots[degree] >= knots[control_points.len()] {
        return Err(LatticeError::Config(
            "NURBS knot vector has an empty parameter domain".to_string(),
        ));
    }
    Ok(())
}

fn evaluate_unchecked(
    u: f64,
    control_points: &[f64],
    weights: &[f64],
    knots: &[f64],
    degree: usize,
) -> f64 {
    let n = control_points.len();
    let u = u.clamp(knots[degree], knots[n]);
    let span = find_span(u, degree, knots, n);

    let mut basis = [0.0f64; MAX_DEGREE + 1];
    basis_functions(span, u, degree, knots, &mut basis);

    let mut sum = 0.0;
    let mut weight_sum = 0.0;
    for (i, &b) in basis.iter().enumerate().take(degree + 1) {
        let idx = span - degree + i;
        sum += b * control_points[idx] * weights[idx];
        weight_sum += b * weights[idx];
    }
    scrub(safe_div(sum, weight_sum))
}

/// One-shot evaluation with shape checking.
pub fn evaluate(
    u: f64,
    control_points: &[f64],
    weights: &[f64],
    knots: &[f64],
    degree: usize,
) -> LatticeResult<f64> {
    validate_shape(control_points, weights, knots, degree)?;
    Ok(evaluate_unchecked(
        clamp_u(u),
        control_points,
        weights,
        knots,
        degree,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOTS: [f64; 9] = [0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0];
    const ONES: [f64; 5] = [1.0; 5];

    #[test]
    fn test_span_search() {
        assert_eq!(find_span(0.0, 3, &KNOTS, 5), 3);
        assert_eq!(find_span(0.25, 3, &KNOTS, 5), 3);
        assert_eq!(find_span(0.5, 3, &KNOTS, 5), 4);
        assert_eq!(find_span(0.99, 3, &KNOTS, 5), 4);
        assert_eq!(find_span(1.0, 3, &KNOTS, 5), 4);
    }

    #[test]
    fn test_span_search_many_knots() {
        let knots = [0.0, 0.0, 0.0, 0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 1.0, 1.0, 1.0];
        let n = knots.len() - 4;
        for (u, expected) in [(0.1, 3), (0.3, 4), (0.5, 5), (0.7, 6), (0.9, 7)] {
            let span = find_span(u, 3, &knots, n);
            assert_eq!(span, expected, "u={u}");
            assert!(knots[span] <= u && u < knots[span + 1]);
        }
    }

    #[test]
    fn test_basis_partition_of_unity() {
        let mut basis = [0.0; MAX_DEGREE + 1];
        for step in 0..=100 {
            let u = clamp_u(step as f64 / 100.0);
            let span = find_span(u, 3, &KNOTS, 5);
            basis_functions(span, u, 3, &KNOTS, &mut basis);
            let sum: f64 = basis[..4].iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "u={u}: Σ N = {sum}");
            assert!(basis[..4].iter().all(|&b| b >= -1e-12));
        }
    }

    #[test]
    fn test_constant_curve_is_constant() {
        let c = 3.25;
        let cp = [c; 5];
        for step in 0..=20 {
            let u = step as f64 / 20.0;
            let v = evaluate(u, &cp, &ONES, &KNOTS, 3).unwrap();
            assert!((v - c).abs() < 1e-12, "u={u}: {v}");
        }
    }

    #[test]
    fn test_unit_curve_at_037() {
        let v = evaluate(0.37, &ONES, &ONES, &KNOTS, 3).unwrap();
        assert!((v - 1.0).abs() < 1e-12, "got {v}");
    }

    #[test]
    fn test_endpoints_interpolate() {
        let cp = [2.0, 5.0, -1.0, 4.0, 7.0];
        let start = evaluate(0.0, &cp, &ONES, &KNOTS, 3).unwrap();
        assert!((start - 2.0).abs() < 1e-9, "start={start}");
        let end = evaluate(1.0, &cp, &ONES, &KNOTS, 3).unwrap();
        assert!(end.is_finite());
        assert!((end - 7.0).abs() < 1e-6, "end={end}");
    }

    #[test]
    fn test_u_out_of_domain_is_clamped() {
        let cp = [1.0, 2.0, 3.0, 4.0, 5.0];
        let below = evaluate(-3.0, &cp, &ONES, &KNOTS, 3).unwrap();
        let at_zero = evaluate(0.0, &cp, &ONES, &KNOTS, 3).unwrap();
        assert_eq!(below, at_zero);
        assert!(evaluate(f64::NAN, &cp, &ONES, &KNOTS, 3).unwrap().is_finite());
        assert!(evaluate(f64::INFINITY, &cp, &ONES, &KNOTS, 3).unwrap().is_finite());
    }

    #[test]
    fn test_weights_pull_curve() {
        let cp = [0.0, 0.0, 1.0, 0.0, 0.0];
        let heavy = [1.0, 1.0, 10.0, 1.0, 1.0];
        let plain = evaluate(0.5, &cp, &ONES, &KNOTS, 3).unwrap();
        let pulled = evaluate(0.5, &cp, &heavy, &KNOTS, 3).unwrap();
        assert!(pulled > plain, "{pulled} <= {plain}");
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        assert!(evaluate(0.5, &[1.0; 4], &ONES, &KNOTS, 3).is_err());
        assert!(evaluate(0.5, &ONES, &[1.0; 4], &KNOTS, 3).is_err());
        assert!(evaluate(0.5, &ONES, &ONES, &KNOTS[..8], 3).is_err());
        assert!(NurbsCurve::new(ONES.to_vec(), ONES.to_vec(), KNOTS.to_vec(), 0).is_err());
        assert!(NurbsCurve::new(vec![1.0; 12], vec![1.0; 12], vec![0.0; 21], 8).is_err());
    }

    #[test]
    fn test_decreasing_knots_rejected() {
        let knots = [0.0, 0.0, 0.0, 0.0, 0.7, 0.5, 1.0, 1.0, 1.0];
        assert!(NurbsCurve::new(ONES.to_vec(), ONES.to_vec(), knots.to_vec(), 3).is_err());
    }

    #[test]
    fn test_curve_matches_free_function() {
        let cp = vec![0.3, 0.9, 0.1, 0.6, 0.8];
        let curve = NurbsCurve::new(cp.clone(), ONES.to_vec(), KNOTS.to_vec(), 3).unwrap();
        for step in 0..10 {
            let u = step as f64 / 10.0;
            assert_eq!(curve.evaluate(u), evaluate(u, &cp, &ONES, &KNOTS, 3).unwrap());
        }
    }
}
