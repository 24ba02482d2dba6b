// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Lattice State
// ─────────────────────────────────────────────────────────────────────
//! Pre-allocated per-vertex state for a `d`-dimensional lattice of `V`
//! points.
//!
//! Positions and momenta are stored `V×d` row-major. Every per-vertex
//! array is resized together, so `|vertices| = |momenta| = |spins| =
//! |wave_amplitudes| = |interactions|` holds between operations.

use serde::{Deserialize, Serialize};

use hyperlattice_types::{LatticeError, LatticeResult};

use crate::params::{MOMENTUM_SCALE, SPIN_SCALE, VERTEX_SPACING};

/// Length of the vector potential for a lattice of dimension `d`.
#[inline]
pub fn vector_potential_len(dimension: usize) -> usize {
    dimension.min(3)
}

/// Derived per-vertex interaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub vertex_index: usize,
    /// Distance to the lattice centroid.
    pub distance: f64,
    pub strength: f64,
    /// `min(3, d)` components.
    pub vector_potential: Vec<f64>,
    pub god_wave_amplitude: f64,
}

impl Interaction {
    fn empty(vertex_index: usize, dimension: usize) -> Self {
        Self {
            vertex_index,
            distance: 0.0,
            strength: 0.0,
            vector_potential: vec![0.0; vector_potential_len(dimension)],
            god_wave_amplitude: 0.0,
        }
    }
}

/// Per-vertex state container.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    dimension: usize,
    n: usize,
    vertices: Vec<f64>,
    momenta: Vec<f64>,
    spins: Vec<f64>,
    wave_amplitudes: Vec<f64>,
    interactions: Vec<Interaction>,
    total_charge: f64,
}

fn alloc_error(n: usize, dimension: usize) -> LatticeError {
    LatticeError::Allocation {
        vertices: n,
        dimension,
        attempts: 1,
    }
}

fn try_filled<T: Clone>(len: usize, fill: T, n: usize, dimension: usize) -> LatticeResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| alloc_error(n, dimension))?;
    v.resize(len, fill);
    Ok(v)
}

impl Lattice {
    /// Estimated heap footprint of a lattice, in bytes.
    pub fn estimated_bytes(dimension: usize, n: usize) -> Option<u64> {
        let f = std::mem::size_of::<f64>() as u64;
        let record = std::mem::size_of::<Interaction>() as u64;
        let (d, n) = (dimension as u64, n as u64);
        let per_vertex = (2 * d + 2) * f + record + vector_potential_len(dimension) as u64 * f;
        n.checked_mul(per_vertex)
    }

    /// Allocate and initialise a lattice.
    ///
    /// Fails with `Config` for a zero dimension or vertex count, and with
    /// `Allocation` when storage cannot be reserved or would exceed
    /// `budget_bytes`.
    pub fn try_new(
        dimension: usize,
        n: usize,
        one_d_permeation: f64,
        budget_bytes: Option<u64>,
    ) -> LatticeResult<Self> {
        if dimension == 0 {
            return Err(LatticeError::Config(
                "lattice dimension must be >= 1".to_string(),
            ));
        }
        if n == 0 {
            return Err(LatticeError::Config(
                "lattice must have at least one vertex".to_string(),
            ));
        }
        let bytes = Self::estimated_bytes(dimension, n).ok_or_else(|| alloc_error(n, dimension))?;
        if budget_bytes.is_some_and(|budget| bytes > budget) {
            return Err(alloc_error(n, dimension));
        }
        let len = n.checked_mul(dimension).ok_or_else(|| alloc_error(n, dimension))?;

        let mut lattice = Self {
            dimension,
            n,
            vertices: try_filled(len, 0.0, n, dimension)?,
            momenta: try_filled(len, 0.0, n, dimension)?,
            spins: try_filled(n, 0.0, n, dimension)?,
            wave_amplitudes: try_filled(n, 0.0, n, dimension)?,
            interactions: {
                let mut v = Vec::new();
                v.try_reserve_exact(n)
                    .map_err(|_| alloc_error(n, dimension))?;
                v.extend((0..n).map(|i| Interaction::empty(i, dimension)));
                v
            },
            total_charge: 0.0,
        };
        lattice.initialise(one_d_permeation);
        Ok(lattice)
    }

    fn initialise(&mut self, one_d_permeation: f64) {
        let d = self.dimension;
        let df = d as f64;
        let nf = self.n as f64;
        self.total_charge = 0.0;

        for i in 0..self.n {
            let frac = i as f64 / nf;
            let position = frac * VERTEX_SPACING * df;
            let momentum = ((i % 2) as f64 - 0.5) * MOMENTUM_SCALE * df;
            self.vertices[i * d..(i + 1) * d].fill(position);
            self.momenta[i * d..(i + 1) * d].fill(momentum);
            self.spins[i] = if i % 2 == 0 {
                SPIN_SCALE * df
            } else {
                -SPIN_SCALE * df
            };
            self.total_charge += 1.0 / nf;
        }
        self.reset_wave_amplitudes(one_d_permeation);
    }

    /// Recompute `oneDPermeation · (1 + 0.1 · i/V) · 0.1` for every vertex.
    pub fn reset_wave_amplitudes(&mut self, one_d_permeation: f64) {
        let nf = self.n as f64;
        for (i, a) in self.wave_amplitudes.iter_mut().enumerate() {
            *a = one_d_permeation * (1.0 + 0.1 * (i as f64 / nf)) * 0.1;
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn total_charge(&self) -> f64 {
        self.total_charge
    }

    #[track_caller]
    fn check_index(&self, i: usize) -> LatticeResult<()> {
        if i >= self.n {
            return Err(LatticeError::index(i, self.n));
        }
        Ok(())
    }

    #[track_caller]
    pub fn vertex(&self, i: usize) -> LatticeResult<&[f64]> {
        self.check_index(i)?;
        Ok(self.vertex_row(i))
    }

    #[track_caller]
    pub fn momentum(&self, i: usize) -> LatticeResult<&[f64]> {
        self.check_index(i)?;
        Ok(self.momentum_row(i))
    }

    #[track_caller]
    pub fn spin(&self, i: usize) -> LatticeResult<f64> {
        self.check_index(i)?;
        Ok(self.spins[i])
    }

    #[track_caller]
    pub fn wave_amplitude(&self, i: usize) -> LatticeResult<f64> {
        self.check_index(i)?;
        Ok(self.wave_amplitudes[i])
    }

    #[track_caller]
    pub fn interaction(&self, i: usize) -> LatticeResult<&Interaction> {
        self.check_index(i)?;
        Ok(&self.interactions[i])
    }

    #[inline]
    pub(crate) fn vertex_row(&self, i: usize) -> &[f64] {
        let d = self.dimension;
        &self.vertices[i * d..(i + 1) * d]
    }

    #[inline]
    pub(crate) fn momentum_row(&self, i: usize) -> &[f64] {
        let d = self.dimension;
        &self.momenta[i * d..(i + 1) * d]
    }

    #[inline]
    pub(crate) fn spin_at(&self, i: usize) -> f64 {
        self.spins[i]
    }

    #[inline]
    pub(crate) fn amplitude_at(&self, i: usize) -> f64 {
        self.wave_amplitudes[i]
    }

    /// Flat `V×d` positions.
    pub fn vertices(&self) -> &[f64] {
        &self.vertices
    }

    /// Flat `V×d` momenta.
    pub fn momenta(&self) -> &[f64] {
        &self.momenta
    }

    pub fn momenta_mut(&mut self) -> &mut [f64] {
        &mut self.momenta
    }

    pub fn spins(&self) -> &[f64] {
        &self.spins
    }

    pub fn wave_amplitudes(&self) -> &[f64] {
        &self.wave_amplitudes
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Replace every interaction record; the count must equal `V`.
    pub fn set_interactions(&mut self, interactions: Vec<Interaction>) -> LatticeResult<()> {
        if interactions.len() != self.n {
            return Err(LatticeError::Config(format!(
                "expected {} interaction records, got {}",
                self.n,
                interactions.len()
            )));
        }
        self.interactions = interactions;
        Ok(())
    }

    fn flatten_rows(&self, what: &str, rows: &[Vec<f64>]) -> LatticeResult<Vec<f64>> {
        if rows.len() != self.n {
            return Err(LatticeError::Config(format!(
                "expected {} {what} rows, got {}",
                self.n,
                rows.len()
            )));
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.dimension)
        {
            return Err(LatticeError::Config(format!(
                "{what} row {i} has {} components, lattice dimension is {}",
                row.len(),
                self.dimension
            )));
        }
        Ok(rows.iter().flatten().copied().collect())
    }

    /// Replace every vertex position. Rows must be `V` vectors of length `d`.
    pub fn set_vertices(&mut self, rows: &[Vec<f64>]) -> LatticeResult<()> {
        self.vertices = self.flatten_rows("vertex", rows)?;
        Ok(())
    }

    /// Replace every momentum. Rows must be `V` vectors of length `d`.
    pub fn set_momenta(&mut self, rows: &[Vec<f64>]) -> LatticeResult<()> {
        self.momenta = self.flatten_rows("momentum", rows)?;
        Ok(())
    }

    /// Arithmetic mean of every vertex position.
    pub fn centroid(&self) -> Vec<f64> {
        let d = self.dimension;
        let mut c = vec![0.0; d];
        for row in self.vertices.chunks_exact(d) {
            for (acc, &x) in c.iter_mut().zip(row) {
                *acc += x;
            }
        }
        let nf = self.n as f64;
        c.iter_mut().for_each(|x| *x /= nf);
        c
    }

    /// True when every per-vertex array agrees with `V` and `d`.
    pub fn is_consistent(&self) -> bool {
        let n = self.n;
        let d = self.dimension;
        self.vertices.len() == n * d
            && self.momenta.len() == n * d
            && self.spins.len() == n
            && self.wave_amplitudes.len() == n
            && self.interactions.len() == n
            && self
                .interactions
                .iter()
                .all(|r| r.vector_potential.len() == vector_potential_len(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(d: usize, n: usize) -> Lattice {
        Lattice::try_new(d, n, 1.0, None).unwrap()
    }

    #[test]
    fn test_dimensions_consistent() {
        for d in [1, 3, 26] {
            let l = make(d, 17);
            assert!(l.is_consistent());
            assert_eq!(l.len(), 17);
            for i in 0..17 {
                assert_eq!(l.vertex(i).unwrap().len(), d);
                assert_eq!(l.momentum(i).unwrap().len(), d);
            }
        }
    }

    #[test]
    fn test_initialisation_laws() {
        let l = make(3, 10);
        let v = l.vertex(4).unwrap();
        let expected = 0.4 * VERTEX_SPACING * 3.0;
        assert!(v.iter().all(|&x| (x - expected).abs() < 1e-15));
        assert!((l.momentum(0).unwrap()[0] + 0.015).abs() < 1e-15);
        assert!((l.momentum(1).unwrap()[2] - 0.015).abs() < 1e-15);
        assert!((l.spin(0).unwrap() - SPIN_SCALE * 3.0).abs() < 1e-15);
        assert!((l.spin(1).unwrap() + SPIN_SCALE * 3.0).abs() < 1e-15);
        assert!((l.wave_amplitude(5).unwrap() - 1.0 * 1.05 * 0.1).abs() < 1e-15);
        assert!((l.total_charge() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(matches!(Lattice::try_new(0, 10, 1.0, None), Err(LatticeError::Config(_))));
        assert!(matches!(Lattice::try_new(3, 0, 1.0, None), Err(LatticeError::Config(_))));
    }

    #[test]
    fn test_budget_exceeded_is_allocation_error() {
        let need = Lattice::estimated_bytes(3, 100).unwrap();
        assert!(Lattice::try_new(3, 100, 1.0, Some(need)).is_ok());
        let err = Lattice::try_new(3, 100, 1.0, Some(need - 1)).unwrap_err();
        assert!(matches!(err, LatticeError::Allocation { vertices: 100, dimension: 3, .. }));
    }

    #[test]
    fn test_index_error_out_of_range() {
        let l = make(2, 4);
        let err = l.vertex(4).unwrap_err();
        match err {
            LatticeError::Index { index, len, location } => {
                assert_eq!(index, 4);
                assert_eq!(len, 4);
                assert!(location.file().ends_with("lattice.rs"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(l.spin(99).is_err());
        assert!(l.interaction(4).is_err());
    }

    #[test]
    fn test_vector_potential_length() {
        assert_eq!(make(1, 3).interaction(0).unwrap().vector_potential.len(), 1);
        assert_eq!(make(2, 3).interaction(0).unwrap().vector_potential.len(), 2);
        assert_eq!(make(7, 3).interaction(0).unwrap().vector_potential.len(), 3);
    }

    #[test]
    fn test_set_vertices_checks_shape() {
        let mut l = make(2, 3);
        assert!(l.set_vertices(&[vec![0.0, 1.0], vec![2.0, 3.0]]).is_err());
        assert!(l
            .set_vertices(&[vec![0.0, 1.0], vec![2.0], vec![4.0, 5.0]])
            .is_err());
        l.set_vertices(&[vec![0.0, 1.0], vec![2.0, 3.0], vec![4.0, 5.0]])
            .unwrap();
        assert_eq!(l.vertex(2).unwrap(), &[4.0, 5.0]);
        assert!(l.is_consistent());
    }

    #[test]
    fn test_set_momenta_checks_shape() {
        let mut l = make(1, 2);
        assert!(l.set_momenta(&[vec![1.0, 2.0], vec![3.0, 4.0]]).is_err());
        l.set_momenta(&[vec![1.0], vec![-1.0]]).unwrap();
        assert_eq!(l.momenta(), &[1.0, -1.0]);
    }

    #[test]
    fn test_centroid() {
        let mut l = make(2, 2);
        l.set_vertices(&[vec![0.0, 2.0], vec![4.0, 6.0]]).unwrap();
        assert_eq!(l.centroid(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_set_interactions_length_checked() {
        let mut l = make(2, 3);
        assert!(l.set_interactions(Vec::new()).is_err());
        let records = l.interactions().to_vec();
        assert!(l.set_interactions(records).is_ok());
    }

    #[test]
    fn test_reset_wave_amplitudes() {
        let mut l = make(3, 4);
        l.reset_wave_amplitudes(0.0);
        assert!(l.wave_amplitudes().iter().all(|&a| a == 0.0));
    }
}
