// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Calculator Configuration
// ─────────────────────────────────────────────────────────────────────

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LatticeError, LatticeResult};
use crate::numeric::clamp_param;

/// Hard upper bound on the lattice dimension.
pub const DIMENSION_LIMIT: usize = 26;

/// Hard upper bound on the vertex count.
pub const VERTEX_LIMIT: usize = 1_000_000;

/// Every real-valued tunable of [`LatticeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    Influence,
    Weak,
    Collapse,
    TwoD,
    ThreeDInfluence,
    OneDPermeation,
    NurbMatterStrength,
    NurbEnergyStrength,
    NurbRegularMatterStrength,
    Alpha,
    Beta,
    CarrollFactor,
    MeanFieldApprox,
    AsymCollapse,
    PerspectiveTrans,
    PerspectiveFocal,
    SpinInteraction,
    EmFieldStrength,
    RenormFactor,
    VacuumEnergy,
    GodWaveFreq,
    MaterialDensity,
    TimeStep,
}

impl ParamKey {
    pub const ALL: [ParamKey; 23] = [
        ParamKey::Influence,
        ParamKey::Weak,
        ParamKey::Collapse,
        ParamKey::TwoD,
        ParamKey::ThreeDInfluence,
        ParamKey::OneDPermeation,
        ParamKey::NurbMatterStrength,
        ParamKey::NurbEnergyStrength,
        ParamKey::NurbRegularMatterStrength,
        ParamKey::Alpha,
        ParamKey::Beta,
        ParamKey::CarrollFactor,
        ParamKey::MeanFieldApprox,
        ParamKey::AsymCollapse,
        ParamKey::PerspectiveTrans,
        ParamKey::PerspectiveFocal,
        ParamKey::SpinInteraction,
        ParamKey::EmFieldStrength,
        ParamKey::RenormFactor,
        ParamKey::VacuumEnergy,
        ParamKey::GodWaveFreq,
        ParamKey::MaterialDensity,
        ParamKey::TimeStep,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamKey::Influence => "influence",
            ParamKey::Weak => "weak",
            ParamKey::Collapse => "collapse",
            ParamKey::TwoD => "two_d",
            ParamKey::ThreeDInfluence => "three_d_influence",
            ParamKey::OneDPermeation => "one_d_permeation",
            ParamKey::NurbMatterStrength => "nurb_matter_strength",
            ParamKey::NurbEnergyStrength => "nurb_energy_strength",
            ParamKey::NurbRegularMatterStrength => "nurb_regular_matter_strength",
            ParamKey::Alpha => "alpha",
            ParamKey::Beta => "beta",
            ParamKey::CarrollFactor => "carroll_factor",
            ParamKey::MeanFieldApprox => "mean_field_approx",
            ParamKey::AsymCollapse => "asym_collapse",
            ParamKey::PerspectiveTrans => "perspective_trans",
            ParamKey::PerspectiveFocal => "perspective_focal",
            ParamKey::SpinInteraction => "spin_interaction",
            ParamKey::EmFieldStrength => "em_field_strength",
            ParamKey::RenormFactor => "renorm_factor",
            ParamKey::VacuumEnergy => "vacuum_energy",
            ParamKey::GodWaveFreq => "god_wave_freq",
            ParamKey::MaterialDensity => "material_density",
            ParamKey::TimeStep => "time_step",
        }
    }

    /// Closed interval the parameter is clamped into.
    pub fn range(self) -> (f64, f64) {
        match self {
            ParamKey::Influence => (0.0, 10.0),
            ParamKey::Weak => (0.0, 1.0),
            ParamKey::Collapse => (0.0, 5.0),
            ParamKey::TwoD => (0.0, 5.0),
            ParamKey::ThreeDInfluence => (0.0, 5.0),
            ParamKey::OneDPermeation => (0.0, 5.0),
            ParamKey::NurbMatterStrength => (0.0, 1.0),
            ParamKey::NurbEnergyStrength => (0.0, 2.0),
            ParamKey::NurbRegularMatterStrength => (0.0, 1.0),
            ParamKey::Alpha => (0.1, 10.0),
            ParamKey::Beta => (0.0, 1.0),
            ParamKey::CarrollFactor => (0.0, 1.0),
            ParamKey::MeanFieldApprox => (0.0, 1.0),
            ParamKey::AsymCollapse => (0.0, 1.0),
            ParamKey::PerspectiveTrans => (0.0, 10.0),
            ParamKey::PerspectiveFocal => (1.0, 20.0),
            ParamKey::SpinInteraction => (0.0, 1.0),
            ParamKey::EmFieldStrength => (0.0, 1e7),
            ParamKey::RenormFactor => (0.1, 10.0),
            ParamKey::VacuumEnergy => (0.0, 1.0),
            ParamKey::GodWaveFreq => (0.1, 10.0),
            ParamKey::MaterialDensity => (0.0, 1e4),
            ParamKey::TimeStep => (1e-6, 1.0),
        }
    }

    pub fn contains(self, value: f64) -> bool {
        let (lo, hi) = self.range();
        value.is_finite() && (lo..=hi).contains(&value)
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamKey {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamKey::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| LatticeError::Config(format!("unknown parameter '{s}'")))
    }
}

/// Full parameter block of the energy calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Scale on pairwise interaction and gravitational potential.
    pub influence: f64,
    /// Scale on the vector potential.
    pub weak: f64,
    pub collapse: f64,
    pub two_d: f64,
    pub three_d_influence: f64,
    /// Base of the per-vertex wave amplitude.
    pub one_d_permeation: f64,
    pub nurb_matter_strength: f64,
    pub nurb_energy_strength: f64,
    pub nurb_regular_matter_strength: f64,
    pub alpha: f64,
    pub beta: f64,
    pub carroll_factor: f64,
    pub mean_field_approx: f64,
    pub asym_collapse: f64,
    /// Perspective translation; feeds only the projection scale.
    pub perspective_trans: f64,
    /// Perspective focal length; feeds only the projection scale.
    pub perspective_focal: f64,
    pub spin_interaction: f64,
    pub em_field_strength: f64,
    pub renorm_factor: f64,
    pub vacuum_energy: f64,
    /// Scale and oscillation frequency of the god-wave kernel.
    pub god_wave_freq: f64,
    pub material_density: f64,
    /// Integration step of `advance_cycle` (also the simulation-time increment).
    pub time_step: f64,

    /// Upper bound on the lattice dimension (1..=26).
    pub max_dimensions: usize,
    /// Initial lattice dimension (1..=max_dimensions).
    pub mode: usize,
    /// Lattice size (1..=1e6).
    pub num_vertices: usize,
    /// Worker threads; 0 uses every core.
    pub threads: usize,
    /// Reject out-of-range values instead of clamping them.
    pub strict: bool,
    /// Optional cap on lattice storage, in bytes.
    pub memory_budget_bytes: Option<u64>,
    /// Verbose trace gate.
    pub debug: bool,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            influence: 2.0,
            weak: 0.1,
            collapse: 5.0,
            two_d: 1.5,
            three_d_influence: 5.0,
            one_d_permeation: 1.0,
            nurb_matter_strength: 0.27,
            nurb_energy_strength: 0.68,
            nurb_regular_matter_strength: 0.05,
            alpha: 2.0,
            beta: 0.2,
            carroll_factor: 0.1,
            mean_field_approx: 0.5,
            asym_collapse: 0.5,
            perspective_trans: 2.0,
            perspective_focal: 4.0,
            spin_interaction: 0.1,
            em_field_strength: 1000.0,
            renorm_factor: 1.0,
            vacuum_energy: 0.1,
            god_wave_freq: 1.5,
            material_density: 1.0,
            time_step: 0.01,
            max_dimensions: DIMENSION_LIMIT,
            mode: 3,
            num_vertices: 1000,
            threads: 0,
            strict: false,
            memory_budget_bytes: None,
            debug: false,
        }
    }
}

impl LatticeConfig {
    /// Current value of a real-valued parameter.
    pub fn get(&self, key: ParamKey) -> f64 {
        match key {
            ParamKey::Influence => self.influence,
            ParamKey::Weak => self.weak,
            ParamKey::Collapse => self.collapse,
            ParamKey::TwoD => self.two_d,
            ParamKey::ThreeDInfluence => self.three_d_influence,
            ParamKey::OneDPermeation => self.one_d_permeation,
            ParamKey::NurbMatterStrength => self.nurb_matter_strength,
            ParamKey::NurbEnergyStrength => self.nurb_energy_strength,
            ParamKey::NurbRegularMatterStrength => self.nurb_regular_matter_strength,
            ParamKey::Alpha => self.alpha,
            ParamKey::Beta => self.beta,
            ParamKey::CarrollFactor => self.carroll_factor,
            ParamKey::MeanFieldApprox => self.mean_field_approx,
            ParamKey::AsymCollapse => self.asym_collapse,
            ParamKey::PerspectiveTrans => self.perspective_trans,
            ParamKey::PerspectiveFocal => self.perspective_focal,
            ParamKey::SpinInteraction => self.spin_interaction,
            ParamKey::EmFieldStrength => self.em_field_strength,
            ParamKey::RenormFactor => self.renorm_factor,
            ParamKey::VacuumEnergy => self.vacuum_energy,
            ParamKey::GodWaveFreq => self.god_wave_freq,
            ParamKey::MaterialDensity => self.material_density,
            ParamKey::TimeStep => self.time_step,
        }
    }

    fn slot_mut(&mut self, key: ParamKey) -> &mut f64 {
        match key {
            ParamKey::Influence => &mut self.influence,
            ParamKey::Weak => &mut self.weak,
            ParamKey::Collapse => &mut self.collapse,
            ParamKey::TwoD => &mut self.two_d,
            ParamKey::ThreeDInfluence => &mut self.three_d_influence,
            ParamKey::OneDPermeation => &mut self.one_d_permeation,
            ParamKey::NurbMatterStrength => &mut self.nurb_matter_strength,
            ParamKey::NurbEnergyStrength => &mut self.nurb_energy_strength,
            ParamKey::NurbRegularMatterStrength => &mut self.nurb_regular_matter_strength,
            ParamKey::Alpha => &mut self.alpha,
            ParamKey::Beta => &mut self.beta,
            ParamKey::CarrollFactor => &mut self.carroll_factor,
            ParamKey::MeanFieldApprox => &mut self.mean_field_approx,
            ParamKey::AsymCollapse => &mut self.asym_collapse,
            ParamKey::PerspectiveTrans => &mut self.perspective_trans,
            ParamKey::PerspectiveFocal => &mut self.perspective_focal,
            ParamKey::SpinInteraction => &mut self.spin_interaction,
            ParamKey::EmFieldStrength => &mut self.em_field_strength,
            ParamKey::RenormFactor => &mut self.renorm_factor,
            ParamKey::VacuumEnergy => &mut self.vacuum_energy,
            ParamKey::GodWaveFreq => &mut self.god_wave_freq,
            ParamKey::MaterialDensity => &mut self.material_density,
            ParamKey::TimeStep => &mut self.time_step,
        }
    }

    /// Store `value` clamped into the parameter's range; returns what was stored.
    pub fn set(&mut self, key: ParamKey, value: f64) -> f64 {
        let (lo, hi) = key.range();
        let clamped = clamp_param(value, lo, hi);
        *self.slot_mut(key) = clamped;
        clamped
    }

    /// Store `value` only if it lies inside the parameter's range.
    pub fn set_strict(&mut self, key: ParamKey, value: f64) -> LatticeResult<f64> {
        if !key.contains(value) {
            let (lo, hi) = key.range();
            return Err(LatticeError::Config(format!(
                "{key} must be in [{lo}, {hi}], got {value}"
            )));
        }
        *self.slot_mut(key) = value;
        Ok(value)
    }

    /// Validate every parameter without clamping.
    pub fn validate(&self) -> LatticeResult<()> {
        for key in ParamKey::ALL {
            let value = self.get(key);
            if !key.contains(value) {
                let (lo, hi) = key.range();
                return Err(LatticeError::Config(format!(
                    "{key} must be in [{lo}, {hi}], got {value}"
                )));
            }
        }
        if !(1..=DIMENSION_LIMIT).contains(&self.max_dimensions) {
            return Err(LatticeError::Config(format!(
                "max_dimensions must be in [1, {DIMENSION_LIMIT}], got {}",
                self.max_dimensions
            )));
        }
        if self.num_vertices > VERTEX_LIMIT {
            return Err(LatticeError::Config(format!(
                "num_vertices must be in [1, {VERTEX_LIMIT}], got {}",
                self.num_vertices
            )));
        }
        self.check_shape()
    }

    /// Copy with every real parameter and upper bound clamped.
    ///
    /// Zero vertices, a zero dimension bound, and a mode outside
    /// `[1, max_dimensions]` are still rejected: there is nothing
    /// sensible to clamp them to.
    pub fn clamped(&self) -> LatticeResult<Self> {
        let mut out = self.clone();
        for key in ParamKey::ALL {
            out.set(key, self.get(key));
        }
        if out.max_dimensions > DIMENSION_LIMIT {
            out.max_dimensions = DIMENSION_LIMIT;
        }
        if out.num_vertices > VERTEX_LIMIT {
            out.num_vertices = VERTEX_LIMIT;
        }
        out.check_shape()?;
        Ok(out)
    }

    /// Strict configs must validate as-is; lenient ones are clamped.
    pub fn resolve(&self) -> LatticeResult<Self> {
        if self.strict {
            self.validate()?;
            Ok(self.clone())
        } else {
            self.clamped()
        }
    }

    fn check_shape(&self) -> LatticeResult<()> {
        if self.max_dimensions == 0 {
            return Err(LatticeError::Config(
                "max_dimensions must be >= 1".to_string(),
            ));
        }
        if self.mode == 0 || self.mode > self.max_dimensions {
            return Err(LatticeError::Config(format!(
                "dimension {} outside [1, {}]",
                self.mode, self.max_dimensions
            )));
        }
        if self.num_vertices == 0 {
            return Err(LatticeError::Config(
                "num_vertices must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> LatticeResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| LatticeError::Config(format!("JSON parse error: {e}")))
    }

    pub fn to_json(&self) -> LatticeResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LatticeError::Config(format!("JSON encode error: {e}")))
    }
}
