// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Diagnostics Sink
// ─────────────────────────────────────────────────────────────────────
//! Pluggable destination for calculator diagnostics.
//!
//! The calculator never writes to the console itself. It reports
//! retries, numeric anomalies and debug traces to the sink injected at
//! construction; [`LogSink`] forwards them to the `log` facade.

use parking_lot::Mutex;

pub use log::Level;

/// Log target used by [`LogSink`].
pub const LOG_TARGET: &str = "hyperlattice";

/// Receiver of calculator diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, level: Level, message: &str);
}

/// Forwards every record to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, level: Level, message: &str) {
        log::log!(target: LOG_TARGET, level, "{message}");
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _level: Level, _message: &str) {}
}

/// One buffered diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub level: Level,
    pub message: String,
}

/// Buffers records in memory.
///
/// Thread-safe: the buffer is guarded by a `parking_lot::Mutex`.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// True if any record at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .lock()
            .iter()
            .any(|r| r.level == level && r.message.contains(needle))
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, level: Level, message: &str) {
        self.records.lock().push(DiagnosticRecord {
            level,
            message: message.to_string(),
        });
    }
}

type RecordFn = Box<dyn Fn(Level, &str) + Send + Sync>;

/// Delegates every record to a caller-supplied function.
pub struct ExternalSink {
    record_fn: RecordFn,
}

impl ExternalSink {
    pub fn new(record_fn: impl Fn(Level, &str) + Send + Sync + 'static) -> Self {
        Self {
            record_fn: Box::new(record_fn),
        }
    }
}

impl DiagnosticSink for ExternalSink {
    fn record(&self, level: Level, message: &str) {
        (self.record_fn)(level, message)
    }
}
