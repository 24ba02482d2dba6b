// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Result Records
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::numeric::{floor_clamp, FLOOR};

/// Reduced energies for one dimension.
///
/// After a successful `compute` every field is finite and `>= FLOOR`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyResult {
    /// Sum of the eight channels below.
    pub observable: f64,
    /// Sampled pairwise gravitational potential.
    pub potential: f64,
    pub nurb_matter: f64,
    pub nurb_energy: f64,
    pub nurb_regular_matter: f64,
    pub spin_energy: f64,
    /// Fed by the kinetic kernel.
    pub momentum_energy: f64,
    pub field_energy: f64,
    pub god_wave_energy: f64,
}

impl Default for EnergyResult {
    /// Every channel at the floor; `observable` is their sum.
    fn default() -> Self {
        Self {
            observable: 8.0 * FLOOR,
            potential: FLOOR,
            nurb_matter: FLOOR,
            nurb_energy: FLOOR,
            nurb_regular_matter: FLOOR,
            spin_energy: FLOOR,
            momentum_energy: FLOOR,
            field_energy: FLOOR,
            god_wave_energy: FLOOR,
        }
    }
}

impl EnergyResult {
    /// All nine fields, `observable` first.
    pub fn fields(&self) -> [f64; 9] {
        [
            self.observable,
            self.potential,
            self.nurb_matter,
            self.nurb_energy,
            self.nurb_regular_matter,
            self.spin_energy,
            self.momentum_energy,
            self.field_energy,
            self.god_wave_energy,
        ]
    }

    /// The eight channels that make up `observable`.
    pub fn channels(&self) -> [f64; 8] {
        let [_, rest @ ..] = self.fields();
        rest
    }

    pub fn is_finite(&self) -> bool {
        self.fields().iter().all(|v| v.is_finite())
    }

    /// True when every field is finite and at or above the floor.
    pub fn is_floored(&self) -> bool {
        self.fields().iter().all(|&v| v.is_finite() && v >= FLOOR)
    }

    /// Copy with every field raised to the floor.
    pub fn floored(&self) -> Self {
        Self {
            observable: floor_clamp(self.observable),
            potential: floor_clamp(self.potential),
            nurb_matter: floor_clamp(self.nurb_matter),
            nurb_energy: floor_clamp(self.nurb_energy),
            nurb_regular_matter: floor_clamp(self.nurb_regular_matter),
            spin_energy: floor_clamp(self.spin_energy),
            momentum_energy: floor_clamp(self.momentum_energy),
            field_energy: floor_clamp(self.field_energy),
            god_wave_energy: floor_clamp(self.god_wave_energy),
        }
    }
}

/// One row of a dimension sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionData {
    pub dimension: usize,
    /// Average perspective projection scale of the lattice.
    pub scale: f64,
    pub observable: f64,
    pub potential: f64,
    pub nurb_matter: f64,
    pub nurb_energy: f64,
    pub nurb_regular_matter: f64,
    pub spin_energy: f64,
    pub momentum_energy: f64,
    pub field_energy: f64,
    pub god_wave_energy: f64,
}

impl DimensionData {
    pub fn new(dimension: usize, scale: f64, result: &EnergyResult) -> Self {
        Self {
            dimension,
            scale,
            observable: result.observable,
            potential: result.potential,
            nurb_matter: result.nurb_matter,
            nurb_energy: result.nurb_energy,
            nurb_regular_matter: result.nurb_regular_matter,
            spin_energy: result.spin_energy,
            momentum_energy: result.momentum_energy,
            field_energy: result.field_energy,
            god_wave_energy: result.god_wave_energy,
        }
    }

    /// Placeholder row for a dimension whose compute failed.
    pub fn floor(dimension: usize) -> Self {
        Self::new(dimension, 1.0, &EnergyResult::default())
    }

    pub fn energies(&self) -> EnergyResult {
        EnergyResult {
            observable: self.observable,
            potential: self.potential,
            nurb_matter: self.nurb_matter,
            nurb_energy: self.nurb_energy,
            nurb_regular_matter: self.nurb_regular_matter,
            spin_energy: self.spin_energy,
            momentum_energy: self.momentum_energy,
            field_energy: self.field_energy,
            god_wave_energy: self.god_wave_energy,
        }
    }
}
