// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Lattice Physics
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! NURBS evaluator, canonical tables, lattice state, and the per-vertex
//! energy kernels of the N-dimensional lattice calculator.

pub mod kernels;
pub mod lattice;
pub mod nurbs;
pub mod params;

pub use kernels::{sample_stride, Kernel, KernelContext, VertexEnergies};
pub use lattice::{Interaction, Lattice};
pub use nurbs::NurbsCurve;
pub use params::{cached_cosines, Curve, NurbsTables};
