// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Parallel Reducer
// ─────────────────────────────────────────────────────────────────────
//! Chunked per-vertex traversal, partial-sum merge, and ratio
//! normalisation.
//!
//! The index range is cut into fixed chunks of `max(1, V / (2·T))`.
//! Each chunk is folded into its own [`ChannelSums`] on the rayon pool;
//! the partials are collected in chunk order and merged on the calling
//! thread. For a fixed thread count the result is bit-identical.

use rayon::prelude::*;

use hyperlattice_physics::params::{
    ENERGY_RATIO, FALLBACK_CHANNEL_RATIO, MATTER_RATIO, OTHER_CHANNELS, REGULAR_MATTER_RATIO,
};
use hyperlattice_physics::{KernelContext, VertexEnergies};
use hyperlattice_types::{floor_clamp, safe_div, EnergyResult};

/// Below this the total magnitude counts as zero.
pub const MAGNITUDE_EPSILON: f64 = 1e-15;

/// Substitute total magnitude for an all-zero reduction.
pub const MAGNITUDE_FALLBACK: f64 = 1e-10;

/// A remainder at or below this is treated as non-positive.
pub const REMAINDER_EPSILON: f64 = 1e-12;

/// Accumulators of one chunk (or of the whole lattice after merge).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelSums {
    pub potential: f64,
    pub matter: f64,
    pub energy: f64,
    pub regular_matter: f64,
    pub spin: f64,
    pub kinetic: f64,
    pub em_field: f64,
    pub god_wave: f64,
    /// Sum of per-vertex projection scales; not an energy channel.
    pub projection: f64,
    pub anomalies: u64,
}

impl ChannelSums {
    pub fn add(&mut self, e: &VertexEnergies) {
        self.potential += e.potential;
        self.matter += e.matter;
        self.energy += e.energy;
        self.regular_matter += e.regular_matter;
        self.spin += e.spin;
        self.kinetic += e.kinetic;
        self.em_field += e.em_field;
        self.god_wave += e.god_wave;
        self.anomalies += u64::from(e.anomalies);
    }

    pub fn merge(&mut self, other: &ChannelSums) {
        self.potential += other.potential;
        self.matter += other.matter;
        self.energy += other.energy;
        self.regular_matter += other.regular_matter;
        self.spin += other.spin;
        self.kinetic += other.kinetic;
        self.em_field += other.em_field;
        self.god_wave += other.god_wave;
        self.projection += other.projection;
        self.anomalies += other.anomalies;
    }

    /// The eight energy channels in output order.
    pub fn channels(&self) -> [f64; 8] {
        [
            self.potential,
            self.matter,
            self.energy,
            self.regular_matter,
            self.spin,
            self.kinetic,
            self.em_field,
            self.god_wave,
        ]
    }

    /// `Σ |sum_k|` over the eight channels.
    pub fn total_magnitude(&self) -> f64 {
        self.channels().iter().map(|v| v.abs()).sum()
    }
}

/// Chunk length for `n` vertices on `threads` workers.
#[inline]
pub fn chunk_size(n: usize, threads: usize) -> usize {
    (n / (2 * threads.max(1))).max(1)
}

/// Fold vertices `[start, end)` into one partial.
pub fn reduce_range(ctx: &KernelContext<'_>, start: usize, end: usize) -> ChannelSums {
    let mut acc = ChannelSums::default();
    for i in start..end {
        acc.add(&ctx.vertex_energies(i));
        acc.projection += ctx.projection_scale(i);
    }
    acc
}

/// Reduce the whole lattice on the current rayon pool.
///
/// Call inside `ThreadPool::install`; the chunk size follows the
/// installed pool's thread count.
pub fn reduce(ctx: &KernelContext<'_>) -> ChannelSums {
    let n = ctx.len();
    if n == 0 {
        return ChannelSums::default();
    }
    let chunk = chunk_size(n, rayon::current_num_threads());
    let partials: Vec<ChannelSums> = (0..n.div_ceil(chunk))
        .into_par_iter()
        .map(|c| {
            let start = c * chunk;
            reduce_range(ctx, start, (start + chunk).min(n))
        })
        .collect();

    partials.iter().fold(ChannelSums::default(), |mut total, p| {
        total.merge(p);
        total
    })
}

/// Per-channel share of the five non-cosmological channels.
pub fn other_channel_ratio() -> f64 {
    let remaining = 1.0 - MATTER_RATIO - ENERGY_RATIO - REGULAR_MATTER_RATIO;
    if remaining > REMAINDER_EPSILON {
        remaining / OTHER_CHANNELS as f64
    } else {
        FALLBACK_CHANNEL_RATIO
    }
}

/// Outcome of [`normalise`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalised {
    pub result: EnergyResult,
    /// True when the observable was non-finite and the floor default
    /// replaced the whole result.
    pub replaced: bool,
}

/// Apply the cosmological split to merged sums over `n` vertices.
///
/// An infinite total magnitude or a non-finite observable yields the
/// floor default with `replaced` set.
pub fn normalise(sums: &ChannelSums, n: usize) -> Normalised {
    let v = n as f64;
    let mut total = sums.total_magnitude();
    if total.is_infinite() {
        return Normalised {
            result: EnergyResult::default(),
            replaced: true,
        };
    }
    if !(total > MAGNITUDE_EPSILON) {
        total = MAGNITUDE_FALLBACK;
    }
    let share = other_channel_ratio();
    let other = |sum: f64| safe_div(sum.abs() * share, v);

    let mut result = EnergyResult {
        observable: 0.0,
        potential: other(sums.potential),
        nurb_matter: safe_div(MATTER_RATIO * total, v),
        nurb_energy: safe_div(ENERGY_RATIO * total, v),
        nurb_regular_matter: safe_div(REGULAR_MATTER_RATIO * total, v),
        spin_energy: other(sums.spin),
        momentum_energy: other(sums.kinetic),
        field_energy: other(sums.em_field),
        god_wave_energy: other(sums.god_wave),
    };
    let observable: f64 = result.channels().iter().sum();
    if !observable.is_finite() {
        return Normalised {
            result: EnergyResult::default(),
            replaced: true,
        };
    }
    result.observable = floor_clamp(observable);
    Normalised {
        result,
        replaced: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperlattice_physics::{Lattice, NurbsTables};
    use hyperlattice_types::{LatticeConfig, FLOOR};

    fn sums(values: [f64; 8]) -> ChannelSums {
        let [potential, matter, energy, regular_matter, spin, kinetic, em_field, god_wave] = values;
        ChannelSums {
            potential,
            matter,
            energy,
            regular_matter,
            spin,
            kinetic,
            em_field,
            god_wave,
            projection: 0.0,
            anomalies: 0,
        }
    }

    #[test]
    fn test_chunk_size() {
        assert_eq!(chunk_size(1000, 4), 125);
        assert_eq!(chunk_size(3, 8), 1);
        assert_eq!(chunk_size(10, 0), 5);
    }

    #[test]
    fn test_fallback_ratio_applies() {
        assert!((other_channel_ratio() - 0.02).abs() < 1e-15);
    }

    #[test]
    fn test_normalise_cosmological_split() {
        let s = sums([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let out = normalise(&s, 10);
        assert!(!out.replaced);
        let r = out.result;
        // S = 36
        assert!((r.nurb_matter - 0.27 * 36.0 / 10.0).abs() < 1e-12);
        assert!((r.nurb_energy - 0.68 * 36.0 / 10.0).abs() < 1e-12);
        assert!((r.nurb_regular_matter - 0.05 * 36.0 / 10.0).abs() < 1e-12);
        assert!((r.potential - 0.02 * 1.0 / 10.0).abs() < 1e-15);
        assert!((r.spin_energy - 0.02 * 5.0 / 10.0).abs() < 1e-15);
        assert!((r.momentum_energy - 0.02 * 6.0 / 10.0).abs() < 1e-15);
        assert!((r.field_energy - 0.02 * 7.0 / 10.0).abs() < 1e-15);
        assert!((r.god_wave_energy - 0.02 * 8.0 / 10.0).abs() < 1e-15);
        let total: f64 = r.channels().iter().sum();
        assert!((r.observable - total).abs() < 1e-12);
    }

    #[test]
    fn test_normalise_zero_sums_use_fallback_magnitude() {
        let out = normalise(&ChannelSums::default(), 1);
        let r = out.result;
        assert!((r.nurb_matter - 0.27e-10).abs() < 1e-20);
        assert_eq!(r.potential, FLOOR);
        assert!(r.is_floored());
    }

    #[test]
    fn test_normalise_negative_sums_use_magnitude() {
        let s = sums([-2.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0]);
        let r = normalise(&s, 1).result;
        assert!((r.potential - 0.04).abs() < 1e-15);
        assert!((r.spin_energy - 0.02).abs() < 1e-15);
        assert!(r.is_floored());
    }

    #[test]
    fn test_normalise_non_finite_inputs_stay_floored() {
        let s = sums([f64::NAN, f64::INFINITY, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let r = normalise(&s, 4).result;
        assert!(r.is_finite());
        assert!(r.is_floored());
    }

    #[test]
    fn test_normalise_overflowing_observable_replaced() {
        // The total is finite, but adding the five 0.02 shares on top of
        // the full cosmological split overflows.
        let s = sums([f64::MAX / 8.0 * 0.995; 8]);
        assert!(s.total_magnitude().is_finite());
        let out = normalise(&s, 1);
        assert!(out.replaced);
        assert_eq!(out.result, EnergyResult::default());
        assert!((out.result.observable - 8.0 * FLOOR).abs() < 1e-40);
    }

    #[test]
    fn test_normalise_infinite_total_replaced() {
        let s = sums([f64::MAX; 8]);
        assert!(s.total_magnitude().is_infinite());
        let out = normalise(&s, 10);
        assert!(out.replaced);
        assert_eq!(out.result, EnergyResult::default());
    }

    #[test]
    fn test_merge_matches_sequential() {
        let cfg = LatticeConfig::default();
        let lattice = Lattice::try_new(3, 50, cfg.one_d_permeation, None).unwrap();
        let tables = NurbsTables::default();
        let ctx = KernelContext::new(&lattice, &tables, &cfg);

        let whole = reduce_range(&ctx, 0, 50);
        let mut split = reduce_range(&ctx, 0, 17);
        split.merge(&reduce_range(&ctx, 17, 50));
        for (a, b) in whole.channels().iter().zip(split.channels().iter()) {
            assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0));
        }
        assert!((whole.projection - split.projection).abs() < 1e-9);
    }

    #[test]
    fn test_reduce_is_deterministic_on_fixed_pool() {
        let cfg = LatticeConfig::default();
        let lattice = Lattice::try_new(4, 200, cfg.one_d_permeation, None).unwrap();
        let tables = NurbsTables::default();
        let ctx = KernelContext::new(&lattice, &tables, &cfg);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        let a = pool.install(|| reduce(&ctx));
        let b = pool.install(|| reduce(&ctx));
        assert_eq!(a, b);
        assert!(a.total_magnitude() > 0.0);
    }
}
