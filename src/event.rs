//! Events: the schedulable unit of the kernel.
//!
//! An [`Event`] is built with [`Simulation::create_event`] and carries the
//! process that runs when it is dispatched. Once admitted, the simulation
//! keeps an [`EventRecord`] for it for the rest of the run, whether the
//! process completed, failed or is still parked on a store.
//!
//! [`Simulation::create_event`]: crate::Simulation::create_event

use crate::error::SimError;
use crate::process::{Process, TaskState};
use crate::time::VirtualTime;

// ── Event ID ──────────────────────────────────────────────────────────

/// A per-simulation unique, strictly increasing event identifier.
///
/// Ids follow creation order. Dispatch ties are *not* broken by id but by
/// admission order, which the scheduler tracks separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw u64 into an `EventId`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Monotonic event-ID generator owned by exactly one simulation.
///
/// Two simulations never share a counter, so ids are reproducible from
/// run to run.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }
}

// ── Event Status ─────────────────────────────────────────────────────

/// Lifecycle of an event.
///
/// `Fired → Scheduled → Pending → Completed | Terminated`. An event whose
/// process is parked on a store when the run ends stays `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EventStatus {
    /// Constructed, not yet admitted.
    Fired,
    /// Admitted into the queue, waiting for its due time.
    Scheduled,
    /// Selected by the scheduler; its process has started.
    Pending,
    /// The process returned a result.
    Completed,
    /// The process returned an error or suspended on a foreign future.
    Terminated,
}

impl EventStatus {
    /// Returns `true` for `Completed` and `Terminated`.
    pub fn is_finished(self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Terminated)
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventStatus::Fired => "fired",
            EventStatus::Scheduled => "scheduled",
            EventStatus::Pending => "pending",
            EventStatus::Completed => "completed",
            EventStatus::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// An event that has been created but not yet admitted.
///
/// Owns the process body. [`Simulation::schedule_event`] consumes it and
/// moves the body into the kernel.
///
/// [`Simulation::schedule_event`]: crate::Simulation::schedule_event
pub struct Event<T> {
    pub(crate) id: EventId,
    pub(crate) fired_at: VirtualTime,
    pub(crate) scheduled_at: VirtualTime,
    pub(crate) item: Option<T>,
    pub(crate) process: Process<T>,
}

impl<T> Event<T> {
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Always [`EventStatus::Fired`]: admission consumes the event.
    pub fn status(&self) -> EventStatus {
        EventStatus::Fired
    }

    /// Clock value when the event was created.
    pub fn fired_at(&self) -> VirtualTime {
        self.fired_at
    }

    /// Due time.
    pub fn scheduled_at(&self) -> VirtualTime {
        self.scheduled_at
    }

    /// Initial payload handed to the process.
    pub fn item(&self) -> Option<&T> {
        self.item.as_ref()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("fired_at", &self.fired_at)
            .field("scheduled_at", &self.scheduled_at)
            .field("item", &self.item)
            .finish_non_exhaustive()
    }
}

// ── Event Record ──────────────────────────────────────────────────────

/// The kernel's view of an admitted event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventRecord<T> {
    pub id: EventId,
    pub status: EventStatus,
    pub fired_at: VirtualTime,
    pub scheduled_at: VirtualTime,
    /// Set on `Completed` and `Terminated`.
    pub finished_at: Option<VirtualTime>,
    /// Initial payload, then the last item received from a store, then
    /// the process result.
    pub item: Option<T>,
    pub task: TaskState,
    /// Position in admission order. Breaks ties between equal due times.
    pub admission: u64,
    /// Why the process was terminated, if it was.
    pub failure: Option<SimError>,
}

impl<T> EventRecord<T> {
    pub(crate) fn admitted(
        id: EventId,
        fired_at: VirtualTime,
        scheduled_at: VirtualTime,
        item: Option<T>,
        admission: u64,
    ) -> Self {
        EventRecord {
            id,
            status: EventStatus::Scheduled,
            fired_at,
            scheduled_at,
            finished_at: None,
            item,
            task: TaskState::NotStarted,
            admission,
            failure: None,
        }
    }

    /// Returns `true` while the process is parked in a store queue.
    pub fn is_parked(&self) -> bool {
        matches!(self.task, TaskState::WaitingOnStore(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_monotonic() {
        let mut gen = EventIdGen::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert_eq!(gen.next_id().raw(), 2);
        assert!(a < b);
    }

    #[test]
    fn test_independent_generators() {
        let mut g1 = EventIdGen::new();
        let mut g2 = EventIdGen::new();
        g1.next_id();
        g1.next_id();
        assert_eq!(g2.next_id(), EventId::new(0));
    }

    #[test]
    fn test_admitted_record() {
        let rec: EventRecord<u32> =
            EventRecord::admitted(EventId::new(7), VirtualTime::new(1), VirtualTime::new(5), Some(9), 2);
        assert_eq!(rec.status, EventStatus::Scheduled);
        assert_eq!(rec.task, TaskState::NotStarted);
        assert_eq!(rec.finished_at, None);
        assert!(!rec.is_parked());
    }

    #[test]
    fn test_status_finished() {
        assert!(EventStatus::Completed.is_finished());
        assert!(EventStatus::Terminated.is_finished());
        assert!(!EventStatus::Pending.is_finished());
        assert_eq!(EventStatus::Scheduled.to_string(), "scheduled");
    }
}
