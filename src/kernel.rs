//! Shared simulation state.
//!
//! The kernel sits behind an `Rc<RefCell<_>>` shared by the
//! [`Simulation`](crate::Simulation) handle and every running
//! [`ProcessContext`](crate::ProcessContext). Nobody holds a borrow while a
//! process is being polled.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, warn};

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventId, EventRecord, EventStatus};
use crate::process::{Process, Task, TaskState};
use crate::scheduler::{QueueEntry, Scheduler};
use crate::store::StoreId;
use crate::time::VirtualTime;
use crate::trace::{Resumption, TraceEntry};

/// Identifies one live store queue entry: a parked `get` or an unclaimed
/// blocking `put`. A process may hold several at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Ticket(u64);

pub(crate) struct Kernel<T> {
    pub(crate) now: VirtualTime,
    pub(crate) scheduler: Scheduler,
    /// Every admitted event, pending and historical.
    pub(crate) records: BTreeMap<EventId, EventRecord<T>>,
    /// Continuations of admitted processes that have not finished.
    pub(crate) tasks: BTreeMap<EventId, Task<T>>,
    /// Processes released by a store match, to be resumed in this turn.
    pub(crate) ready: VecDeque<(EventId, StoreId)>,
    /// Queue entries not yet matched or withdrawn, with their owner.
    waits: BTreeMap<Ticket, (EventId, StoreId)>,
    /// Items handed to parked consumers, collected when they resume.
    deliveries: BTreeMap<Ticket, (EventId, T)>,
    /// Blocking deposits that have been consumed.
    released: BTreeMap<Ticket, EventId>,
    next_ticket: u64,
    next_store: u64,
    pub(crate) trace: Vec<TraceEntry>,
    record_trace: bool,
}

impl<T> Kernel<T> {
    pub(crate) fn new(config: &SimConfig) -> Self {
        Kernel {
            now: config.start_time,
            scheduler: Scheduler::new(),
            records: BTreeMap::new(),
            tasks: BTreeMap::new(),
            ready: VecDeque::new(),
            waits: BTreeMap::new(),
            deliveries: BTreeMap::new(),
            released: BTreeMap::new(),
            next_ticket: 0,
            next_store: 0,
            trace: Vec::new(),
            record_trace: config.record_trace,
        }
    }

    pub(crate) fn mint_store_id(&mut self) -> StoreId {
        let id = StoreId::new(self.next_store);
        self.next_store += 1;
        id
    }

    // ── Scheduling ────────────────────────────────────────

    pub(crate) fn create_event(
        &mut self,
        scheduled_at: VirtualTime,
        process: Process<T>,
        item: Option<T>,
    ) -> Event<T> {
        Event {
            id: self.scheduler.mint_id(),
            fired_at: self.now,
            scheduled_at,
            item,
            process,
        }
    }

    /// Admit an event. Rejects due times earlier than the clock without
    /// touching the queue.
    pub(crate) fn schedule_event(&mut self, event: Event<T>) -> SimResult<EventId> {
        let Event { id, fired_at, scheduled_at, item, process } = event;

        if scheduled_at.is_before(self.now) {
            warn!(event = %id, requested = %scheduled_at, current = %self.now, "rejected non-causal event");
            return Err(SimError::CausalityViolation {
                event: id,
                requested: scheduled_at,
                current: self.now,
            });
        }

        let admission = self.scheduler.admit(id, scheduled_at);
        self.records
            .insert(id, EventRecord::admitted(id, fired_at, scheduled_at, item, admission));
        self.tasks.insert(id, Task::Unstarted(process));
        debug!(event = %id, at = %scheduled_at, admission, "event admitted");
        Ok(id)
    }

    /// Advance the clock to a popped entry and mark its event pending.
    pub(crate) fn begin_dispatch(&mut self, entry: QueueEntry) {
        // Virtual time must never go backward.
        debug_assert!(
            entry.scheduled_at >= self.now,
            "time went backward: now={}, event={}",
            self.now,
            entry.scheduled_at
        );
        self.now = entry.scheduled_at;
        if let Some(record) = self.records.get_mut(&entry.id) {
            record.status = EventStatus::Pending;
        }
        debug!(event = %entry.id, now = %self.now, "dispatching");
    }

    // ── Task bookkeeping ──────────────────────────────────

    pub(crate) fn set_task(&mut self, id: EventId, state: TaskState) {
        if let Some(record) = self.records.get_mut(&id) {
            record.task = state;
        }
    }

    /// The store a suspended process is waiting on, if any. A process with
    /// a hand-off already queued for this turn counts as waiting.
    pub(crate) fn waiting_on(&self, id: EventId) -> Option<StoreId> {
        self.waits
            .values()
            .rev()
            .find(|(owner, _)| *owner == id)
            .map(|&(_, store)| store)
            .or_else(|| self.ready.iter().find(|(e, _)| *e == id).map(|&(_, store)| store))
    }

    pub(crate) fn note_resumption(&mut self, event: EventId, cause: Resumption) {
        if self.record_trace {
            self.trace.push(TraceEntry { time: self.now, event, cause });
        }
    }

    pub(crate) fn complete(&mut self, id: EventId, result: T) {
        let now = self.now;
        if let Some(record) = self.records.get_mut(&id) {
            record.status = EventStatus::Completed;
            record.task = TaskState::Completed;
            record.finished_at = Some(now);
            record.item = Some(result);
        }
        self.forget(id);
        debug!(event = %id, %now, "process completed");
    }

    pub(crate) fn terminate(&mut self, id: EventId, error: SimError) {
        let now = self.now;
        warn!(event = %id, %now, %error, "process terminated");
        if let Some(record) = self.records.get_mut(&id) {
            record.status = EventStatus::Terminated;
            record.task = TaskState::Failed;
            record.finished_at = Some(now);
            record.failure = Some(error);
        }
        self.forget(id);
    }

    /// Drop hand-offs nobody can collect any more.
    fn forget(&mut self, id: EventId) {
        let before = self.deliveries.len() + self.released.len();
        self.deliveries.retain(|_, (owner, _)| *owner != id);
        self.released.retain(|_, owner| *owner != id);
        let dropped = before - self.deliveries.len() - self.released.len();
        if dropped > 0 {
            debug!(event = %id, dropped, "discarded uncollected hand-offs");
        }
    }

    // ── Store hand-off ────────────────────────────────────

    /// Open a queue entry for `id` on `store`.
    pub(crate) fn park(&mut self, id: EventId, store: StoreId) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.waits.insert(ticket, (id, store));
        debug!(event = %id, %store, now = %self.now, "process parked");
        ticket
    }

    /// Hand `item` to the consumer holding `ticket` and queue it for
    /// resumption.
    pub(crate) fn deliver(&mut self, ticket: Ticket, item: T) {
        if let Some((consumer, store)) = self.waits.remove(&ticket) {
            self.deliveries.insert(ticket, (consumer, item));
            self.wake(consumer, store);
        }
    }

    /// Queue the blocking producer holding `ticket` for resumption.
    pub(crate) fn release(&mut self, ticket: Ticket) {
        if let Some((producer, store)) = self.waits.remove(&ticket) {
            self.released.insert(ticket, producer);
            self.wake(producer, store);
        }
    }

    /// Close a queue entry that was abandoned before any match.
    pub(crate) fn withdraw(&mut self, ticket: Ticket) {
        if let Some((id, store)) = self.waits.remove(&ticket) {
            debug!(event = %id, %store, now = %self.now, "queue entry withdrawn");
        }
    }

    // One ready entry per process; a single resumption collects every
    // hand-off made to it.
    fn wake(&mut self, id: EventId, store: StoreId) {
        if !self.ready.iter().any(|(e, _)| *e == id) {
            self.ready.push_back((id, store));
        }
    }

    pub(crate) fn take_delivery(&mut self, ticket: Ticket) -> Option<T> {
        self.deliveries.remove(&ticket).map(|(_, item)| item)
    }

    pub(crate) fn take_release(&mut self, ticket: Ticket) -> bool {
        self.released.remove(&ticket).is_some()
    }

    /// Remember the last item a process received.
    pub(crate) fn record_item(&mut self, id: EventId, item: T) {
        if let Some(record) = self.records.get_mut(&id) {
            record.item = Some(item);
        }
    }
}
