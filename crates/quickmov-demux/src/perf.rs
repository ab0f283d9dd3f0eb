//! Parse-phase timing instrumentation
//!
//! `init()` is the only expensive call the demuxer makes, so the probe is
//! deliberately small: one timing record per phase, captured with
//! monotonic clocks, retrievable afterwards and mirrored to the debug log
//! when diagnostics are on.

use serde::Serialize;
use std::time::Instant;

/// Duration of one named phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseTiming {
    pub phase: &'static str,
    pub micros: u64,
}

/// Timings collected across one `init()` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseTimings {
    entries: Vec<PhaseTiming>,
}

impl ParseTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a phase that started at `started`.
    pub fn record(&mut self, phase: &'static str, started: Instant) {
        self.entries.push(PhaseTiming {
            phase,
            micros: started.elapsed().as_micros() as u64,
        });
    }

    pub fn entries(&self) -> &[PhaseTiming] {
        &self.entries
    }

    pub fn total_micros(&self) -> u64 {
        self.entries.iter().map(|e| e.micros).sum()
    }

    /// Emit every phase to the debug log.
    pub fn log(&self) {
        for entry in &self.entries {
            tracing::debug!(phase = entry.phase, micros = entry.micros, "parse phase");
        }
        tracing::debug!(total_micros = self.total_micros(), "parse complete");
    }
}
