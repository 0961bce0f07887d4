//! Simulation configuration.

use crate::time::VirtualTime;

/// Knobs for a [`Simulation`](crate::Simulation).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Initial value of the clock.
    pub start_time: VirtualTime,
    /// Upper bound on dispatches performed by a single `run` call.
    /// `None` runs until the queue is exhausted.
    pub max_dispatches: Option<u64>,
    /// Keep a [`TraceEntry`](crate::TraceEntry) for every dispatch and
    /// store-driven resumption.
    pub record_trace: bool,
}

impl SimConfig {
    pub fn with_start_time(mut self, start: VirtualTime) -> Self {
        self.start_time = start;
        self
    }

    pub fn with_max_dispatches(mut self, max: u64) -> Self {
        self.max_dispatches = Some(max);
        self
    }

    pub fn with_trace(mut self, record: bool) -> Self {
        self.record_trace = record;
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            start_time: VirtualTime::ZERO,
            max_dispatches: None,
            record_trace: true,
        }
    }
}
