//! TraceEntry: one line per process resumption.

use crate::event::EventId;
use crate::store::StoreId;
use crate::time::VirtualTime;

/// What caused a process to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Resumption {
    /// The scheduler reached the event's due time.
    Dispatched,
    /// A match on the given store released a parked process.
    StoreMatch(StoreId),
}

/// A record of a single resumption.
///
/// Appended by the engine while `SimConfig::record_trace` is set. Useful
/// for asserting dispatch order in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEntry {
    pub time: VirtualTime,
    pub event: EventId,
    pub cause: Resumption,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cause {
            Resumption::Dispatched => write!(f, "[{} {}] dispatched", self.time, self.event),
            Resumption::StoreMatch(store) => {
                write!(f, "[{} {}] resumed by {}", self.time, self.event, store)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let entry = TraceEntry {
            time: VirtualTime::new(40),
            event: EventId::new(2),
            cause: Resumption::StoreMatch(StoreId::new(1)),
        };
        assert_eq!(entry.to_string(), "[t=40 E#2] resumed by S#1");

        let entry = TraceEntry { cause: Resumption::Dispatched, ..entry };
        assert_eq!(entry.to_string(), "[t=40 E#2] dispatched");
    }
}
