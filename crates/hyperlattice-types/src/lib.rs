// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Parameter block, result records, numeric guards, and error hierarchy
//! for the Hyperlattice energy calculator.

pub mod config;
pub mod error;
pub mod numeric;
pub mod result;

pub use config::{LatticeConfig, ParamKey, DIMENSION_LIMIT, VERTEX_LIMIT};
pub use error::{LatticeError, LatticeResult};
pub use numeric::{clamp_param, floor_clamp, safe_div, safe_exp, scrub, FLOOR};
pub use result::{DimensionData, EnergyResult};
