// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Core
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Energy calculator facade, parallel reducer, time-step driver, and
//! dimension sweep.
//!
//! # Invariants
//!
//! - Every field of a computed `EnergyResult` is finite and `>= 1e-30`.
//! - `nurb_matter : nurb_energy : nurb_regular_matter` is `0.27 : 0.68 : 0.05`.
//! - `compute_batch` restores the current dimension before returning.
//! - Two `compute` calls with nothing in between agree bit for bit.

pub mod calculator;
pub mod diagnostics;
pub mod reducer;

pub use calculator::{EnergyCalculator, MAX_ALLOCATION_RETRIES};
pub use diagnostics::{
    DiagnosticRecord, DiagnosticSink, ExternalSink, LogSink, MemorySink, NullSink,
};
pub use reducer::{normalise, reduce, ChannelSums, Normalised};
