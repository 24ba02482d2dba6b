// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use std::panic::Location;

use thiserror::Error;

/// Root error type for all calculator failures.
///
/// Numeric anomalies (NaN/Inf inside a kernel) never surface here: they
/// are scrubbed to the floor and reported through the diagnostics sink.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LatticeError {
    /// Invalid configuration: out-of-range parameter (strict mode),
    /// dimension outside `[1, d_max]`, zero vertices, NURBS shape
    /// mismatch, or a bulk replacement with the wrong shape.
    #[error("config error: {0}")]
    Config(String),

    /// Vertex index outside `[0, V)`.
    #[error("index error: vertex {index} out of range [0, {len}) (accessed at {location})")]
    Index {
        index: usize,
        len: usize,
        location: &'static Location<'static>,
    },

    /// Lattice storage could not be allocated, even after halving.
    #[error(
        "allocation error: lattice of {vertices} vertices in {dimension}D \
         could not be allocated after {attempts} attempts"
    )]
    Allocation {
        vertices: usize,
        dimension: usize,
        attempts: usize,
    },
}

impl LatticeError {
    /// Build an [`LatticeError::Index`] tagged with the caller's location.
    #[track_caller]
    pub fn index(index: usize, len: usize) -> Self {
        Self::Index {
            index,
            len,
            location: Location::caller(),
        }
    }
}

pub type LatticeResult<T> = Result<T, LatticeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn make_index_error() -> LatticeError {
        LatticeError::index(7, 3)
    }

    #[test]
    fn test_index_error_carries_caller_location() {
        let err = make_index_error();
        match err {
            LatticeError::Index { index, len, location } => {
                assert_eq!(index, 7);
                assert_eq!(len, 3);
                assert!(location.file().ends_with("error.rs"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_display_config() {
        let err = LatticeError::Config("dimension 0 outside [1, 26]".into());
        assert_eq!(err.to_string(), "config error: dimension 0 outside [1, 26]");
    }

    #[test]
    fn test_display_allocation() {
        let err = LatticeError::Allocation {
            vertices: 31_250,
            dimension: 26,
            attempts: 6,
        };
        let msg = err.to_string();
        assert!(msg.contains("31250 vertices"), "{msg}");
        assert!(msg.contains("26D"), "{msg}");
    }
}
