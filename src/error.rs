//! Structured error types for the simulation kernel.
//!
//! Every fallible public API returns [`SimResult`]. Store operations are
//! total and never produce an error; the only kernel-raised failure during
//! normal use is a causality violation on admission.

use crate::event::EventId;
use crate::time::VirtualTime;

/// The top-level error type for the kernel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SimError {
    // ── Scheduling errors ─────────────────────────────────

    /// An event was admitted with a due time earlier than the clock.
    #[error("cannot schedule {event} at {requested} when current time is {current}")]
    CausalityViolation {
        event: EventId,
        requested: VirtualTime,
        current: VirtualTime,
    },

    /// A relative delay pushed the due time past the end of the time axis.
    #[error("scheduling {delay} ticks after {now} overflows virtual time")]
    TimeOverflow { now: VirtualTime, delay: u64 },

    // ── Process errors ────────────────────────────────────

    /// A process body gave up with a reason of its own.
    #[error("process {event} failed: {reason}")]
    ProcessFailed { event: EventId, reason: String },

    /// A process awaited something other than a store operation. Nothing
    /// in the kernel could ever resume it.
    #[error("process {event} suspended outside of a store operation")]
    UnsupportedSuspension { event: EventId },
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_causality_display() {
        let e = SimError::CausalityViolation {
            event: EventId::new(3),
            requested: VirtualTime::new(5),
            current: VirtualTime::new(10),
        };
        let s = e.to_string();
        assert!(s.contains("E#3"));
        assert!(s.contains("t=5"));
        assert!(s.contains("t=10"));
    }

    #[test]
    fn test_overflow_display() {
        let e = SimError::TimeOverflow { now: VirtualTime::new(u64::MAX), delay: 1 };
        assert!(e.to_string().contains("overflows"));
    }

    #[test]
    fn test_is_std_error() {
        let e: Box<dyn std::error::Error> =
            Box::new(SimError::UnsupportedSuspension { event: EventId::new(0) });
        assert_eq!(e.to_string(), "process E#0 suspended outside of a store operation");
    }
}
