// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Per-Vertex Energy Kernels
// ─────────────────────────────────────────────────────────────────────
//! Scalar kernels evaluated against a read-only lattice snapshot.
//!
//! With `u_i = i / max(1, V - 1)` and `d` the lattice dimension:
//!
//!   matter(i)   = s_m · C_matter(u_i) · a_i · ρ · d
//!   energy(i)   = s_e · C_energy(u_i) · a_i · ρ · d
//!   regular(i)  = s_r · C_regular(u_i) · a_i · ρ · d
//!   spin(i)     = s_spin · |σ_i| · C_kin(u_i) · 0.2 · d
//!   em(i)       = s_em · C_em(u_i) · a_i · d
//!   godwave(i)  = f_gw · C_kin(u_i) · a_i · d
//!   kinetic(i)  = C_kin(u_i) · 0.5 · ρ · Σ_k p_ik² · d
//!   Φ(i, j)     = λ · C_pot(u_i) / ‖v_i − v_j‖ · d
//!
//! Every kernel result passes through `scrub`, so nothing non-finite
//! escapes. The context is `Sync` and is shared by the worker threads.

use hyperlattice_types::numeric::{floor_clamp, is_anomalous, safe_div, scrub, FLOOR};
use hyperlattice_types::LatticeConfig;

use crate::lattice::{vector_potential_len, Interaction, Lattice};
use crate::nurbs::clamp_u;
use crate::params::{Curve, NurbsTables, SPIN_KERNEL_SCALE};

/// Guard added to the centroid distance in the interaction strength.
pub const INTERACTION_EPSILON: f64 = 1e-15;

/// Target number of samples in the strided pairwise potential.
pub const POTENTIAL_SAMPLES: usize = 100;

/// The seven per-vertex scalar kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    Matter,
    Energy,
    RegularMatter,
    Spin,
    EmField,
    GodWave,
    Kinetic,
}

impl Kernel {
    pub const ALL: [Kernel; 7] = [
        Kernel::Matter,
        Kernel::Energy,
        Kernel::RegularMatter,
        Kernel::Spin,
        Kernel::EmField,
        Kernel::GodWave,
        Kernel::Kinetic,
    ];
}

/// Floored contributions of one vertex to the eight reduced channels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VertexEnergies {
    pub potential: f64,
    pub matter: f64,
    pub energy: f64,
    pub regular_matter: f64,
    pub spin: f64,
    pub kinetic: f64,
    pub em_field: f64,
    pub god_wave: f64,
    /// Non-finite intermediates replaced by the floor.
    pub anomalies: u32,
}

/// Stride of the sampled pairwise potential: `max(1, V / 100)`.
#[inline]
pub fn sample_stride(n: usize) -> usize {
    (n / POTENTIAL_SAMPLES).max(1)
}

/// Read-only view binding a lattice, its tables, and the parameters.
#[derive(Debug, Clone, Copy)]
pub struct KernelContext<'a> {
    lattice: &'a Lattice,
    tables: &'a NurbsTables,
    config: &'a LatticeConfig,
    d: f64,
}

impl<'a> KernelContext<'a> {
    pub fn new(lattice: &'a Lattice, tables: &'a NurbsTables, config: &'a LatticeConfig) -> Self {
        Self {
            lattice,
            tables,
            config,
            d: lattice.dimension() as f64,
        }
    }

    pub fn lattice(&self) -> &'a Lattice {
        self.lattice
    }

    pub fn len(&self) -> usize {
        self.lattice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lattice.is_empty()
    }

    /// Curve parameter of vertex `i`.
    #[inline]
    pub fn u(&self, i: usize) -> f64 {
        let denom = self.lattice.len().saturating_sub(1).max(1) as f64;
        clamp_u(i as f64 / denom)
    }

    #[inline]
    fn curve(&self, which: Curve, i: usize) -> f64 {
        self.tables.evaluate(which, self.u(i))
    }

    fn raw(&self, kernel: Kernel, i: usize) -> f64 {
        let cfg = self.config;
        let d = self.d;
        let amp = self.lattice.amplitude_at(i);
        let rho = cfg.material_density;
        match kernel {
            Kernel::Matter => cfg.nurb_matter_strength * self.curve(Curve::Matter, i) * amp * rho * d,
            Kernel::Energy => cfg.nurb_energy_strength * self.curve(Curve::Energy, i) * amp * rho * d,
            Kernel::RegularMatter => {
                cfg.nurb_regular_matter_strength
                    * self.curve(Curve::RegularMatter, i)
                    * amp
                    * rho
                    * d
            }
            Kernel::Spin => {
                cfg.spin_interaction
                    * self.lattice.spin_at(i).abs()
                    * self.curve(Curve::Kinetic, i)
                    * SPIN_KERNEL_SCALE
                    * d
            }
            Kernel::EmField => cfg.em_field_strength * self.curve(Curve::Em, i) * amp * d,
            Kernel::GodWave => cfg.god_wave_freq * self.curve(Curve::Kinetic, i) * amp * d,
            Kernel::Kinetic => {
                let p2: f64 = self.lattice.momentum_row(i).iter().map(|p| p * p).sum();
                self.curve(Curve::Kinetic, i) * 0.5 * rho * p2 * d
            }
        }
    }

    /// Scrubbed value of one kernel at vertex `i`.
    pub fn evaluate(&self, kernel: Kernel, i: usize) -> f64 {
        scrub(self.raw(kernel, i))
    }

    pub fn nurb_matter(&self, i: usize) -> f64 {
        self.evaluate(Kernel::Matter, i)
    }

    pub fn nurb_energy(&self, i: usize) -> f64 {
        self.evaluate(Kernel::Energy, i)
    }

    pub fn nurb_regular_matter(&self, i: usize) -> f64 {
        self.evaluate(Kernel::RegularMatter, i)
    }

    pub fn spin_energy(&self, i: usize) -> f64 {
        self.evaluate(Kernel::Spin, i)
    }

    pub fn em_field(&self, i: usize) -> f64 {
        self.evaluate(Kernel::EmField, i)
    }

    pub fn god_wave(&self, i: usize) -> f64 {
        self.evaluate(Kernel::GodWave, i)
    }

    pub fn kinetic_energy(&self, i: usize) -> f64 {
        self.evaluate(Kernel::Kinetic, i)
    }

    /// `f_gw · a_i · cos(f_gw · t) · C_kin(u_i) · d`.
    pub fn god_wave_amplitude(&self, i: usize, t: f64) -> f64 {
        let f = self.config.god_wave_freq;
        scrub(
            f * self.lattice.amplitude_at(i)
                * (f * t).cos()
                * self.curve(Curve::Kinetic, i)
                * self.d,
        )
    }

    /// `λ / (r + 1e-15) · d`.
    pub fn interaction_strength(&self, r: f64) -> f64 {
        scrub(self.config.influence / (r + INTERACTION_EPSILON) * self.d)
    }

    /// First `min(3, d)` momentum components scaled by `weak · d`.
    pub fn vector_potential(&self, i: usize) -> Vec<f64> {
        let scale = self.config.weak * self.d;
        self.lattice.momentum_row(i)[..vector_potential_len(self.lattice.dimension())]
            .iter()
            .map(|&p| scrub(p * scale))
            .collect()
    }

    /// Euclidean distance between two points with the radicand floored.
    #[inline]
    pub fn distance_between(a: &[f64], b: &[f64]) -> f64 {
        let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
        sq.max(FLOOR).sqrt()
    }

    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        Self::distance_between(self.lattice.vertex_row(i), self.lattice.vertex_row(j))
    }

    /// Per-vertex prefactor `λ · C_pot(u_i) · d` of the pair potential.
    #[inline]
    fn potential_coefficient(&self, i: usize) -> f64 {
        self.config.influence * self.curve(Curve::Potential, i) * self.d
    }

    #[inline]
    fn pair_potential(&self, coefficient: f64, i: usize, j: usize) -> f64 {
        scrub(coefficient * (1.0 / self.distance(i, j)))
    }

    /// `Φ(i, j)`; zero on the diagonal.
    pub fn gravitational_potential(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        self.pair_potential(self.potential_coefficient(i), i, j)
    }

    /// Strided estimate of `Σ_{j≠i} Φ(i, j)`, scaled by the stride.
    ///
    /// Returned before flooring: a single-vertex lattice yields `0`.
    pub fn sampled_potential(&self, i: usize) -> f64 {
        let n = self.lattice.len();
        let stride = sample_stride(n);
        let coefficient = self.potential_coefficient(i);
        let mut sum = 0.0;
        for k in (0..n).step_by(stride) {
            if k != i {
                sum += self.pair_potential(coefficient, i, k);
            }
        }
        sum * stride as f64
    }

    /// Write `Σ_{j≠i} λ · C_pot(u_i) · (v_j − v_i) / ‖v_j − v_i‖³ · d` into `out`.
    pub fn gravitational_acceleration_into(&self, i: usize, out: &mut [f64]) {
        out.fill(0.0);
        let coefficient = self.potential_coefficient(i);
        let vi = self.lattice.vertex_row(i);
        for j in 0..self.lattice.len() {
            if j == i {
                continue;
            }
            let vj = self.lattice.vertex_row(j);
            let dist = Self::distance_between(vi, vj);
            let inv_cube = 1.0 / (dist * dist * dist);
            for ((acc, &a), &b) in out.iter_mut().zip(vi).zip(vj) {
                *acc += coefficient * (b - a) * inv_cube;
            }
        }
        out.iter_mut().for_each(|x| *x = scrub(*x));
    }

    pub fn gravitational_acceleration(&self, i: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.lattice.dimension()];
        self.gravitational_acceleration_into(i, &mut out);
        out
    }

    /// Fresh interaction record for vertex `i` at simulation time `t`.
    pub fn interaction_record(&self, i: usize, centroid: &[f64], t: f64) -> Interaction {
        let distance = Self::distance_between(self.lattice.vertex_row(i), centroid);
        Interaction {
            vertex_index: i,
            distance,
            strength: self.interaction_strength(distance),
            vector_potential: self.vector_potential(i),
            god_wave_amplitude: self.god_wave_amplitude(i, t),
        }
    }

    /// Perspective scale `f / (f + t + depth_i)`, depth = last coordinate.
    pub fn projection_scale(&self, i: usize) -> f64 {
        let focal = self.config.perspective_focal;
        let trans = self.config.perspective_trans;
        let depth = self.lattice.vertex_row(i).last().copied().unwrap_or(0.0);
        scrub(safe_div(focal, focal + trans + depth))
    }

    /// Sampled potential plus the seven kernels, each floored.
    pub fn vertex_energies(&self, i: usize) -> VertexEnergies {
        let mut anomalies = 0u32;
        let mut take = |raw: f64| {
            if is_anomalous(raw) {
                anomalies += 1;
            }
            floor_clamp(raw)
        };

        let potential = take(self.sampled_potential(i));
        let matter = take(self.raw(Kernel::Matter, i));
        let energy = take(self.raw(Kernel::Energy, i));
        let regular_matter = take(self.raw(Kernel::RegularMatter, i));
        let spin = take(self.raw(Kernel::Spin, i));
        let kinetic = take(self.raw(Kernel::Kinetic, i));
        let em_field = take(self.raw(Kernel::EmField, i));
        let god_wave = take(self.raw(Kernel::GodWave, i));

        VertexEnergies {
            potential,
            matter,
            energy,
            regular_matter,
            spin,
            kinetic,
            em_field,
            god_wave,
            anomalies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(d: usize, n: usize) -> (Lattice, NurbsTables, LatticeConfig) {
        let cfg = LatticeConfig::default();
        let lattice = Lattice::try_new(d, n, cfg.one_d_permeation, None).unwrap();
        (lattice, NurbsTables::default(), cfg)
    }

    #[test]
    fn test_u_clamped() {
        let (l, t, c) = setup(3, 10);
        let ctx = KernelContext::new(&l, &t, &c);
        assert_eq!(ctx.u(0), 0.0);
        assert!(ctx.u(9) < 1.0);
        assert!((ctx.u(9) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_u_single_vertex() {
        let (l, t, c) = setup(3, 1);
        let ctx = KernelContext::new(&l, &t, &c);
        assert_eq!(ctx.u(0), 0.0);
    }

    #[test]
    fn test_matter_formula() {
        let (l, t, c) = setup(3, 10);
        let ctx = KernelContext::new(&l, &t, &c);
        let i = 4;
        let expected = c.nurb_matter_strength
            * t.evaluate(Curve::Matter, ctx.u(i))
            * l.wave_amplitude(i).unwrap()
            * c.material_density
            * 3.0;
        assert!((ctx.nurb_matter(i) - expected).abs() < 1e-15);
    }

    #[test]
    fn test_kinetic_formula() {
        let (l, t, c) = setup(2, 5);
        let ctx = KernelContext::new(&l, &t, &c);
        let p2: f64 = l.momentum(1).unwrap().iter().map(|p| p * p).sum();
        let expected = t.evaluate(Curve::Kinetic, ctx.u(1)) * 0.5 * c.material_density * p2 * 2.0;
        assert!((ctx.kinetic_energy(1) - expected).abs() < 1e-15);
    }

    #[test]
    fn test_spin_uses_magnitude() {
        let (l, t, c) = setup(3, 4);
        let ctx = KernelContext::new(&l, &t, &c);
        assert!(ctx.spin_energy(1) > 0.0, "odd vertices carry negative spin");
    }

    #[test]
    fn test_all_kernels_finite_across_dimensions() {
        for d in [1, 2, 3, 13, 26] {
            let (l, t, c) = setup(d, 50);
            let ctx = KernelContext::new(&l, &t, &c);
            for i in 0..50 {
                for k in Kernel::ALL {
                    let v = ctx.evaluate(k, i);
                    assert!(v.is_finite(), "{k:?} d={d} i={i}");
                    assert!(v.abs() >= FLOOR, "{k:?} d={d} i={i}");
                }
                assert!(ctx.god_wave_amplitude(i, 0.3).is_finite());
                assert!(ctx.sampled_potential(i).is_finite());
            }
        }
    }

    #[test]
    fn test_zero_strength_scrubs_to_floor() {
        let (l, t, mut c) = setup(3, 8);
        c.em_field_strength = 0.0;
        let ctx = KernelContext::new(&l, &t, &c);
        assert_eq!(ctx.em_field(3), FLOOR);
    }

    #[test]
    fn test_potential_diagonal_zero() {
        let (l, t, c) = setup(3, 8);
        let ctx = KernelContext::new(&l, &t, &c);
        assert_eq!(ctx.gravitational_potential(2, 2), 0.0);
        assert!(ctx.gravitational_potential(2, 3) > 0.0);
    }

    #[test]
    fn test_potential_formula() {
        let (l, t, c) = setup(2, 4);
        let ctx = KernelContext::new(&l, &t, &c);
        let dist = ctx.distance(0, 3);
        let expected = c.influence * t.evaluate(Curve::Potential, 0.0) / dist * 2.0;
        assert!((ctx.gravitational_potential(0, 3) - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn test_sampled_potential_single_vertex_is_zero() {
        let (l, t, c) = setup(1, 1);
        let ctx = KernelContext::new(&l, &t, &c);
        assert_eq!(ctx.sampled_potential(0), 0.0);
        assert_eq!(ctx.vertex_energies(0).potential, FLOOR);
    }

    #[test]
    fn test_sampled_potential_exact_below_hundred() {
        let (l, t, c) = setup(3, 60);
        let ctx = KernelContext::new(&l, &t, &c);
        assert_eq!(sample_stride(60), 1);
        let full: f64 = (0..60).map(|j| ctx.gravitational_potential(7, j)).sum();
        assert!((ctx.sampled_potential(7) - full).abs() / full < 1e-12);
    }

    #[test]
    fn test_sample_stride() {
        assert_eq!(sample_stride(1), 1);
        assert_eq!(sample_stride(99), 1);
        assert_eq!(sample_stride(1000), 10);
        assert_eq!(sample_stride(1_000_000), 10_000);
    }

    #[test]
    fn test_acceleration_points_inward_at_ends() {
        let (l, t, c) = setup(2, 10);
        let ctx = KernelContext::new(&l, &t, &c);
        let first = ctx.gravitational_acceleration(0);
        let last = ctx.gravitational_acceleration(9);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|&a| a > 0.0));
        assert!(last.iter().all(|&a| a < 0.0));
    }

    #[test]
    fn test_acceleration_single_vertex_floored() {
        let (l, t, c) = setup(3, 1);
        let ctx = KernelContext::new(&l, &t, &c);
        assert!(ctx.gravitational_acceleration(0).iter().all(|&a| a == FLOOR));
    }

    #[test]
    fn test_vector_potential() {
        let (l, t, c) = setup(1, 4);
        let ctx = KernelContext::new(&l, &t, &c);
        let vp = ctx.vector_potential(1);
        assert_eq!(vp.len(), 1);
        let expected = l.momentum(1).unwrap()[0] * c.weak * 1.0;
        assert!((vp[0] - expected).abs() < 1e-15);

        let (l, t, c) = setup(5, 4);
        let ctx = KernelContext::new(&l, &t, &c);
        assert_eq!(ctx.vector_potential(0).len(), 3);
    }

    #[test]
    fn test_interaction_record() {
        let (l, t, c) = setup(3, 5);
        let ctx = KernelContext::new(&l, &t, &c);
        let centroid = l.centroid();
        let rec = ctx.interaction_record(0, &centroid, 0.0);
        assert_eq!(rec.vertex_index, 0);
        assert!(rec.distance > 0.0);
        assert!((rec.strength - c.influence / (rec.distance + INTERACTION_EPSILON) * 3.0).abs() < 1e-9);
        assert_eq!(rec.vector_potential.len(), 3);
    }

    #[test]
    fn test_interaction_strength_at_zero_distance_finite() {
        let (l, t, c) = setup(26, 1);
        let ctx = KernelContext::new(&l, &t, &c);
        assert!(ctx.interaction_strength(0.0).is_finite());
    }

    #[test]
    fn test_projection_scale_in_unit_interval() {
        let (l, t, c) = setup(3, 10);
        let ctx = KernelContext::new(&l, &t, &c);
        for i in 0..10 {
            let s = ctx.projection_scale(i);
            assert!(s > 0.0 && s <= 1.0, "i={i}: {s}");
        }
        assert!((ctx.projection_scale(0) - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_vertex_energies_floored() {
        let (l, t, mut c) = setup(3, 20);
        c.spin_interaction = 0.0;
        let ctx = KernelContext::new(&l, &t, &c);
        let e = ctx.vertex_energies(5);
        assert_eq!(e.spin, FLOOR);
        assert_eq!(e.anomalies, 0);
        assert!(e.matter > FLOOR && e.energy > FLOOR && e.potential > FLOOR);
    }
}
