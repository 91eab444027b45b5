//! Diagnostics sinks for target controllers.
//!
//! A controller reports degraded paths (empty sequences, missing surfaces,
//! readiness timeouts) through the sink it was constructed with. There is
//! no global overlay: each controller owns its sink.

use std::sync::{Arc, Mutex};

use log::Level;

/// Receiver of controller diagnostics
pub trait DiagnosticsSink {
    fn report(&self, level: Level, target: &str, message: &str);
}

/// Forwards diagnostics to the `log` facade
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn report(&self, level: Level, target: &str, message: &str) {
        log::log!(level, "[{}] {}", target, message);
    }
}

/// Collects diagnostics in memory. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reported lines as `"[target] message"`
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// True if any line at `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|(l, line)| *l == level && line.contains(needle))
    }

    pub fn clear(&self) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl DiagnosticsSink for MemorySink {
    fn report(&self, level: Level, target: &str, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((level, format!("[{}] {}", target, message)));
    }
}
