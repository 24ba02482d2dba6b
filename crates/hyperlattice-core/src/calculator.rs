// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Energy Calculator
// ─────────────────────────────────────────────────────────────────────
//! The calculator facade: owns the parameter block, the lattice, the
//! NURBS tables, the cached cosines, and the worker pool.
//!
//! A single instance is driven sequentially from the outside. Parallel
//! regions (`compute`, interaction refresh, `advance_cycle`) run on the
//! calculator's own rayon pool and read an immutable lattice snapshot.

use std::sync::Arc;

use rayon::prelude::*;

use hyperlattice_physics::{cached_cosines, Interaction, KernelContext, Lattice, NurbsTables};
use hyperlattice_types::numeric::is_anomalous;
use hyperlattice_types::{
    scrub, DimensionData, EnergyResult, LatticeConfig, LatticeError, LatticeResult, ParamKey,
    DIMENSION_LIMIT, VERTEX_LIMIT,
};

use crate::diagnostics::{DiagnosticSink, Level, LogSink};
use crate::reducer::{normalise, reduce};

/// Halvings attempted after the first failed lattice allocation.
pub const MAX_ALLOCATION_RETRIES: usize = 5;

/// Parallel N-dimensional lattice energy calculator.
pub struct EnergyCalculator {
    config: LatticeConfig,
    lattice: Lattice,
    tables: NurbsTables,
    cached_cos: Vec<f64>,
    simulation_time: f64,
    needs_update: bool,
    projection_scale: f64,
    last_result: Option<EnergyResult>,
    dimension_data: Vec<DimensionData>,
    pool: rayon::ThreadPool,
    sink: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for EnergyCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnergyCalculator")
            .field("dimension", &self.config.mode)
            .field("num_vertices", &self.config.num_vertices)
            .field("simulation_time", &self.simulation_time)
            .field("needs_update", &self.needs_update)
            .field("threads", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

impl EnergyCalculator {
    /// Calculator with the default NURBS tables, logging to `log`.
    pub fn new(config: LatticeConfig) -> LatticeResult<Self> {
        Self::with_tables(config, NurbsTables::default(), Arc::new(LogSink))
    }

    /// Calculator with the default NURBS tables and a custom sink.
    pub fn with_sink(config: LatticeConfig, sink: Arc<dyn DiagnosticSink>) -> LatticeResult<Self> {
        Self::with_tables(config, NurbsTables::default(), sink)
    }

    /// Fully specified construction.
    ///
    /// Strict configs must validate; lenient ones are clamped. Fails with
    /// `Config` for a zero dimension or vertex count and with
    /// `Allocation` when even the halved lattice cannot be stored.
    pub fn with_tables(
        config: LatticeConfig,
        tables: NurbsTables,
        sink: Arc<dyn DiagnosticSink>,
    ) -> LatticeResult<Self> {
        let mut config = config.resolve()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("hyperlattice-{i}"))
            .build()
            .map_err(|e| LatticeError::Config(format!("worker pool: {e}")))?;

        let lattice = allocate_lattice(&config, config.mode, config.num_vertices, sink.as_ref())?;
        config.num_vertices = lattice.len();
        let cached_cos = cached_cosines(config.max_dimensions);

        if config.debug {
            sink.record(
                Level::Debug,
                &format!(
                    "calculator ready: d={} V={} d_max={} threads={}",
                    config.mode,
                    config.num_vertices,
                    config.max_dimensions,
                    pool.current_num_threads()
                ),
            );
        }

        Ok(Self {
            config,
            lattice,
            tables,
            cached_cos,
            simulation_time: 0.0,
            needs_update: true,
            projection_scale: 1.0,
            last_result: None,
            dimension_data: Vec::new(),
            pool,
            sink,
        })
    }

    // ── Parameters ──────────────────────────────────────────────────

    /// Store a parameter and return the stored value.
    ///
    /// Out-of-range values are clamped, or rejected with `Config` in
    /// strict mode.
    pub fn set_parameter(&mut self, key: ParamKey, value: f64) -> LatticeResult<f64> {
        let stored = if self.config.strict {
            self.config.set_strict(key, value)?
        } else {
            self.config.set(key, value)
        };
        if key == ParamKey::OneDPermeation {
            self.lattice.reset_wave_amplitudes(stored);
        }
        if self.config.debug && stored != value {
            self.sink.record(
                Level::Debug,
                &format!("{key} clamped from {value} to {stored}"),
            );
        }
        self.needs_update = true;
        Ok(stored)
    }

    pub fn parameter(&self, key: ParamKey) -> f64 {
        self.config.get(key)
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.config.strict = strict;
    }

    // ── Shape ───────────────────────────────────────────────────────

    /// Switch to dimension `d` and rebuild the lattice.
    ///
    /// `d` outside `[1, max_dimensions]` fails with `Config` and leaves
    /// the calculator untouched.
    pub fn set_current_dimension(&mut self, d: usize) -> LatticeResult<()> {
        if d == 0 || d > self.config.max_dimensions {
            return Err(LatticeError::Config(format!(
                "dimension {d} outside [1, {}]",
                self.config.max_dimensions
            )));
        }
        self.config.mode = d;
        self.rebuild()
    }

    /// Resize the lattice to `n` vertices at the current dimension.
    pub fn set_num_vertices(&mut self, n: usize) -> LatticeResult<()> {
        if n == 0 {
            return Err(LatticeError::Config(
                "num_vertices must be >= 1".to_string(),
            ));
        }
        let n = if n > VERTEX_LIMIT {
            if self.config.strict {
                return Err(LatticeError::Config(format!(
                    "num_vertices must be in [1, {VERTEX_LIMIT}], got {n}"
                )));
            }
            VERTEX_LIMIT
        } else {
            n
        };
        self.config.num_vertices = n;
        self.rebuild()
    }

    /// Change the dimension bound.
    ///
    /// Lowers the current dimension (rebuilding the lattice) if it now
    /// exceeds the bound; the cached cosines are recomputed. A failed
    /// rebuild leaves the bound and dimension unchanged.
    pub fn set_max_dimensions(&mut self, n: usize) -> LatticeResult<()> {
        let n = if (1..=DIMENSION_LIMIT).contains(&n) {
            n
        } else if self.config.strict {
            return Err(LatticeError::Config(format!(
                "max_dimensions must be in [1, {DIMENSION_LIMIT}], got {n}"
            )));
        } else {
            n.clamp(1, DIMENSION_LIMIT)
        };
        if self.config.mode > n {
            let previous = self.config.mode;
            self.config.mode = n;
            if let Err(e) = self.rebuild() {
                self.config.mode = previous;
                return Err(e);
            }
        }
        self.config.max_dimensions = n;
        self.cached_cos = cached_cosines(n);
        Ok(())
    }

    /// Replace every vertex position; rows must be `V` × `d`.
    pub fn set_vertices(&mut self, rows: &[Vec<f64>]) -> LatticeResult<()> {
        self.lattice.set_vertices(rows)?;
        self.needs_update = true;
        Ok(())
    }

    /// Replace every momentum; rows must be `V` × `d`.
    pub fn set_momenta(&mut self, rows: &[Vec<f64>]) -> LatticeResult<()> {
        self.lattice.set_momenta(rows)?;
        self.needs_update = true;
        Ok(())
    }

    fn rebuild(&mut self) -> LatticeResult<()> {
        let d = self.config.mode;
        let requested = self.config.num_vertices;
        let lattice = allocate_lattice(&self.config, d, requested, self.sink.as_ref())?;
        self.config.num_vertices = lattice.len();
        self.lattice = lattice;
        self.needs_update = true;
        if self.config.debug {
            self.sink.record(
                Level::Debug,
                &format!("lattice rebuilt: d={d} V={}", self.config.num_vertices),
            );
        }
        Ok(())
    }

    fn ensure_consistent(&self) -> LatticeResult<()> {
        if self.lattice.dimension() != self.config.mode
            || self.lattice.len() != self.config.num_vertices
        {
            return Err(LatticeError::Config(format!(
                "lattice holds {} vertices in {}D but {} vertices in {}D are configured; \
                 set a smaller vertex count",
                self.lattice.len(),
                self.lattice.dimension(),
                self.config.num_vertices,
                self.config.mode
            )));
        }
        Ok(())
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    pub fn current_dimension(&self) -> usize {
        self.config.mode
    }

    pub fn max_dimensions(&self) -> usize {
        self.config.max_dimensions
    }

    pub fn num_vertices(&self) -> usize {
        self.config.num_vertices
    }

    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn tables(&self) -> &NurbsTables {
        &self.tables
    }

    /// `cos(ω·k)` for `k` in `0..=max_dimensions`.
    pub fn cached_cos(&self) -> &[f64] {
        &self.cached_cos
    }

    #[track_caller]
    pub fn vertex(&self, i: usize) -> LatticeResult<&[f64]> {
        self.lattice.vertex(i)
    }

    #[track_caller]
    pub fn momentum(&self, i: usize) -> LatticeResult<&[f64]> {
        self.lattice.momentum(i)
    }

    #[track_caller]
    pub fn spin(&self, i: usize) -> LatticeResult<f64> {
        self.lattice.spin(i)
    }

    #[track_caller]
    pub fn wave_amplitude(&self, i: usize) -> LatticeResult<f64> {
        self.lattice.wave_amplitude(i)
    }

    #[track_caller]
    pub fn interaction(&self, i: usize) -> LatticeResult<&Interaction> {
        self.lattice.interaction(i)
    }

    /// Flat `V × d` vertex buffer.
    pub fn vertices(&self) -> &[f64] {
        self.lattice.vertices()
    }

    /// Flat `V × d` momentum buffer.
    pub fn momenta(&self) -> &[f64] {
        self.lattice.momenta()
    }

    /// Average projection scale from the last `compute`.
    pub fn projection_scale(&self) -> f64 {
        self.projection_scale
    }

    pub fn last_result(&self) -> Option<&EnergyResult> {
        self.last_result.as_ref()
    }

    /// Rows of the last `compute_batch`.
    pub fn dimension_data(&self) -> &[DimensionData] {
        &self.dimension_data
    }

    // ── Compute ─────────────────────────────────────────────────────

    /// Rebuild every interaction record from the current lattice.
    pub fn update_interactions(&mut self) -> LatticeResult<()> {
        let t = self.simulation_time;
        let records: Vec<Interaction> = {
            let ctx = KernelContext::new(&self.lattice, &self.tables, &self.config);
            let centroid = self.lattice.centroid();
            self.pool.install(|| {
                (0..ctx.len())
                    .into_par_iter()
                    .map(|i| ctx.interaction_record(i, &centroid, t))
                    .collect()
            })
        };
        self.lattice.set_interactions(records)?;
        self.needs_update = false;
        if self.config.debug {
            self.sink.record(
                Level::Debug,
                &format!("interactions refreshed at t={t:.4}"),
            );
        }
        Ok(())
    }

    /// Reduce the lattice to one [`EnergyResult`].
    ///
    /// Every field of the result is finite and `>= 1e-30`.
    pub fn compute(&mut self) -> LatticeResult<EnergyResult> {
        self.ensure_consistent()?;
        if self.needs_update {
            self.update_interactions()?;
        }

        let n = self.lattice.len();
        let sums = {
            let ctx = KernelContext::new(&self.lattice, &self.tables, &self.config);
            self.pool.install(|| reduce(&ctx))
        };
        let normalised = normalise(&sums, n);
        let result = normalised.result;
        self.projection_scale = scrub(sums.projection / n as f64);

        if self.config.debug {
            if sums.anomalies > 0 {
                self.sink.record(
                    Level::Warn,
                    &format!(
                        "{} non-finite kernel values floored at d={}",
                        sums.anomalies, self.config.mode
                    ),
                );
            }
            if normalised.replaced {
                self.sink.record(
                    Level::Warn,
                    &format!(
                        "non-finite observable at d={}; result replaced by floor",
                        self.config.mode
                    ),
                );
            }
            self.sink.record(
                Level::Debug,
                &format!(
                    "compute d={} V={n}: observable={:e} potential={:e}",
                    self.config.mode, result.observable, result.potential
                ),
            );
        }

        self.last_result = Some(result);
        Ok(result)
    }

    /// One time step: momenta follow the gravitational acceleration.
    ///
    /// `momenta += acc · time_step · d`, scrubbed; the simulation clock
    /// advances by `time_step`.
    pub fn advance_cycle(&mut self) -> LatticeResult<()> {
        self.ensure_consistent()?;
        let d = self.lattice.dimension();
        let len = self.lattice.momenta().len();

        let mut acc = Vec::new();
        acc.try_reserve_exact(len)
            .map_err(|_| LatticeError::Allocation {
                vertices: self.lattice.len(),
                dimension: d,
                attempts: 1,
            })?;
        acc.resize(len, 0.0);

        {
            let ctx = KernelContext::new(&self.lattice, &self.tables, &self.config);
            self.pool.install(|| {
                acc.par_chunks_mut(d)
                    .enumerate()
                    .for_each(|(i, out)| ctx.gravitational_acceleration_into(i, out));
            });
        }

        let step = self.config.time_step * d as f64;
        let pool = &self.pool;
        let momenta = self.lattice.momenta_mut();
        let anomalies: usize = pool.install(|| {
            momenta
                .par_iter_mut()
                .zip(acc.par_iter())
                .map(|(p, &a)| {
                    let raw = *p + a * step;
                    *p = scrub(raw);
                    usize::from(is_anomalous(raw))
                })
                .sum()
        });

        if self.config.debug && anomalies > 0 {
            self.sink.record(
                Level::Warn,
                &format!("{anomalies} non-finite momentum components floored"),
            );
        }

        self.simulation_time += self.config.time_step;
        self.needs_update = true;
        Ok(())
    }

    /// Sweep dimensions `start..=end`, one row each.
    ///
    /// A dimension whose rebuild or compute fails yields a floor row; the
    /// sweep carries on. The current dimension and vertex count are
    /// restored afterwards and the rows are kept for
    /// [`dimension_data`](Self::dimension_data).
    pub fn compute_batch(&mut self, start: usize, end: usize) -> LatticeResult<Vec<DimensionData>> {
        let d_max = self.config.max_dimensions;
        if start == 0 || end > d_max || start > end {
            return Err(LatticeError::Config(format!(
                "batch range [{start}, {end}] outside [1, {d_max}]"
            )));
        }

        let original = self.config.mode;
        let original_vertices = self.config.num_vertices;
        let mut rows = Vec::with_capacity(end - start + 1);
        for d in start..=end {
            let row = match self.set_current_dimension(d).and_then(|_| self.compute()) {
                Ok(result) => DimensionData::new(d, self.projection_scale, &result.floored()),
                Err(e) => {
                    self.sink
                        .record(Level::Warn, &format!("dimension {d} skipped: {e}"));
                    DimensionData::floor(d)
                }
            };
            rows.push(row);
        }
        self.config.num_vertices = original_vertices;
        self.set_current_dimension(original)?;

        self.dimension_data = rows.clone();
        Ok(rows)
    }
}

/// Allocate a `d`-dimensional lattice of up to `requested` vertices.
///
/// Each allocation failure halves the vertex count, at most
/// [`MAX_ALLOCATION_RETRIES`] times.
fn allocate_lattice(
    config: &LatticeConfig,
    d: usize,
    requested: usize,
    sink: &dyn DiagnosticSink,
) -> LatticeResult<Lattice> {
    let mut n = requested;
    for attempt in 0..=MAX_ALLOCATION_RETRIES {
        match Lattice::try_new(d, n, config.one_d_permeation, config.memory_budget_bytes) {
            Ok(lattice) => {
                if n != requested {
                    sink.record(
                        Level::Warn,
                        &format!("lattice allocated with {n} of {requested} vertices in {d}D"),
                    );
                }
                return Ok(lattice);
            }
            Err(LatticeError::Allocation { .. }) if attempt < MAX_ALLOCATION_RETRIES => {
                let halved = (n / 2).max(1);
                sink.record(
                    Level::Warn,
                    &format!("allocation of {n} vertices in {d}D failed; retrying with {halved}"),
                );
                n = halved;
            }
            Err(LatticeError::Allocation { .. }) => {
                return Err(LatticeError::Allocation {
                    vertices: n,
                    dimension: d,
                    attempts: attempt + 1,
                });
            }
            Err(e) => return Err(e),
        }
    }
    Err(LatticeError::Allocation {
        vertices: n,
        dimension: d,
        attempts: MAX_ALLOCATION_RETRIES + 1,
    })
}
