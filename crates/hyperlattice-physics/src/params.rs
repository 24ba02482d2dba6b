// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Canonical Tables
// ─────────────────────────────────────────────────────────────────────
//! Fixed NURBS control tables, the shared knot vector, lattice
//! initialisation constants, and the cosmological split.

use serde::{Deserialize, Serialize};

use hyperlattice_types::LatticeResult;

use crate::nurbs::NurbsCurve;

pub const NURBS_DEGREE: usize = 3;
pub const N_CONTROL: usize = 5;

/// Clamped cubic knot vector shared by every table.
pub const KNOTS: [f64; N_CONTROL + NURBS_DEGREE + 1] = [0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0];
pub const WEIGHTS: [f64; N_CONTROL] = [1.0; N_CONTROL];

pub const MATTER_CP: [f64; N_CONTROL] = [1.0, 0.8, 0.6, 0.4, 0.2];
pub const ENERGY_CP: [f64; N_CONTROL] = [0.5, 1.0, 1.5, 2.0, 2.5];
pub const REGULAR_MATTER_CP: [f64; N_CONTROL] = [0.2, 0.3, 0.4, 0.3, 0.2];
pub const KINETIC_CP: [f64; N_CONTROL] = [0.1, 0.4, 0.9, 0.4, 0.1];
pub const EM_CP: [f64; N_CONTROL] = [0.1, 0.5, 1.0, 0.5, 0.1];
pub const POTENTIAL_CP: [f64; N_CONTROL] = [1.0, 0.9, 0.7, 0.4, 0.2];

/// Vertex spacing per unit of `i / V` and dimension (one inch in metres).
pub const VERTEX_SPACING: f64 = 0.0254;
/// Momentum magnitude per dimension.
pub const MOMENTUM_SCALE: f64 = 0.01;
/// Spin magnitude per dimension.
pub const SPIN_SCALE: f64 = 0.032774;
/// Spin kernel prefactor.
pub const SPIN_KERNEL_SCALE: f64 = 0.2;

/// Cosmological split applied after reduction: matter, energy, regular matter.
pub const MATTER_RATIO: f64 = 0.27;
pub const ENERGY_RATIO: f64 = 0.68;
pub const REGULAR_MATTER_RATIO: f64 = 0.05;
/// Per-channel share of the five other channels when the remainder is non-positive.
pub const FALLBACK_CHANNEL_RATIO: f64 = 0.02;
/// Number of channels sharing the remainder.
pub const OTHER_CHANNELS: usize = 5;

/// The six control tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    Matter,
    Energy,
    RegularMatter,
    Kinetic,
    Em,
    Potential,
}

impl Curve {
    pub const ALL: [Curve; 6] = [
        Curve::Matter,
        Curve::Energy,
        Curve::RegularMatter,
        Curve::Kinetic,
        Curve::Em,
        Curve::Potential,
    ];
}

/// Immutable NURBS tables owned by the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsTables {
    pub matter: NurbsCurve,
    pub energy: NurbsCurve,
    pub regular_matter: NurbsCurve,
    pub kinetic: NurbsCurve,
    pub em: NurbsCurve,
    pub potential: NurbsCurve,
}

impl NurbsTables {
    /// Build tables from six control-point arrays sharing one knot and
    /// weight vector.
    pub fn new(
        control_points: [Vec<f64>; 6],
        weights: Vec<f64>,
        knots: Vec<f64>,
        degree: usize,
    ) -> LatticeResult<Self> {
        let [matter, energy, regular_matter, kinetic, em, potential] = control_points;
        let curve = |cp: Vec<f64>| NurbsCurve::new(cp, weights.clone(), knots.clone(), degree);
        Ok(Self {
            matter: curve(matter)?,
            energy: curve(energy)?,
            regular_matter: curve(regular_matter)?,
            kinetic: curve(kinetic)?,
            em: curve(em)?,
            potential: curve(potential)?,
        })
    }

    pub fn curve(&self, which: Curve) -> &NurbsCurve {
        match which {
            Curve::Matter => &self.matter,
            Curve::Energy => &self.energy,
            Curve::RegularMatter => &self.regular_matter,
            Curve::Kinetic => &self.kinetic,
            Curve::Em => &self.em,
            Curve::Potential => &self.potential,
        }
    }

    #[inline]
    pub fn evaluate(&self, which: Curve, u: f64) -> f64 {
        self.curve(which).evaluate(u)
    }
}

impl Default for NurbsTables {
    fn default() -> Self {
        let curve = |cp: [f64; N_CONTROL]| {
            NurbsCurve::from_trusted_parts(cp.to_vec(), WEIGHTS.to_vec(), KNOTS.to_vec(), NURBS_DEGREE)
        };
        Self {
            matter: curve(MATTER_CP),
            energy: curve(ENERGY_CP),
            regular_matter: curve(REGULAR_MATTER_CP),
            kinetic: curve(KINETIC_CP),
            em: curve(EM_CP),
            potential: curve(POTENTIAL_CP),
        }
    }
}

/// `cos(ω k)` for `k ∈ [0, d_max]`, `ω = 2π / (2 d_max - 1)`.
pub fn cached_cosines(max_dimensions: usize) -> Vec<f64> {
    let denom = (2 * max_dimensions).saturating_sub(1).max(1) as f64;
    let omega = std::f64::consts::TAU / denom;
    (0..=max_dimensions).map(|k| (omega * k as f64).cos()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_invariant() {
        assert_eq!(N_CONTROL + NURBS_DEGREE + 1, KNOTS.len());
        assert_eq!(N_CONTROL, WEIGHTS.len());
    }

    #[test]
    fn test_ratios_sum_to_one() {
        let total = MATTER_RATIO + ENERGY_RATIO + REGULAR_MATTER_RATIO;
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_default_tables_positive() {
        let tables = NurbsTables::default();
        for which in Curve::ALL {
            for step in 0..=50 {
                let v = tables.evaluate(which, step as f64 / 50.0);
                assert!(v > 0.0 && v.is_finite(), "{which:?} at step {step}: {v}");
            }
        }
    }

    #[test]
    fn test_tables_new_rejects_mismatch() {
        let cps = [
            MATTER_CP.to_vec(),
            ENERGY_CP.to_vec(),
            REGULAR_MATTER_CP.to_vec(),
            KINETIC_CP.to_vec(),
            EM_CP.to_vec(),
            vec![1.0; 4],
        ];
        assert!(NurbsTables::new(cps, WEIGHTS.to_vec(), KNOTS.to_vec(), NURBS_DEGREE).is_err());
    }

    #[test]
    fn test_tables_new_matches_default() {
        let cps = [
            MATTER_CP.to_vec(),
            ENERGY_CP.to_vec(),
            REGULAR_MATTER_CP.to_vec(),
            KINETIC_CP.to_vec(),
            EM_CP.to_vec(),
            POTENTIAL_CP.to_vec(),
        ];
        let tables = NurbsTables::new(cps, WEIGHTS.to_vec(), KNOTS.to_vec(), NURBS_DEGREE).unwrap();
        assert_eq!(tables, NurbsTables::default());
    }

    #[test]
    fn test_cached_cosines() {
        let c = cached_cosines(26);
        assert_eq!(c.len(), 27);
        assert_eq!(c[0], 1.0);
        let omega = std::f64::consts::TAU / 51.0;
        assert!((c[5] - (5.0 * omega).cos()).abs() < 1e-15);
    }

    #[test]
    fn test_cached_cosines_single_dimension() {
        let c = cached_cosines(1);
        assert_eq!(c.len(), 2);
        assert!((c[1] - std::f64::consts::TAU.cos()).abs() < 1e-12);
    }
}
