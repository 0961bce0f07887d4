//! Simulation driver.
//!
//! Pops due events, advances virtual time and hands each event to the
//! execution engine. The loop is synchronous and single-threaded; a
//! process may admit new events while it runs and they are picked up by
//! the same loop.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::config::SimConfig;
use crate::engine;
use crate::error::SimResult;
use crate::event::{Event, EventId, EventRecord};
use crate::kernel::Kernel;
use crate::process::{Process, ProcessContext};
use crate::store::Store;
use crate::time::VirtualTime;
use crate::trace::TraceEntry;

/// Wall-clock statistics for one [`Simulation::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub duration: Duration,
}

/// Top-level simulation handle.
///
/// Owns the clock, the event queue and every event record. Build events
/// with [`create_event`](Self::create_event), admit them with
/// [`schedule_event`](Self::schedule_event), then [`run`](Self::run).
pub struct Simulation<T> {
    kernel: Rc<RefCell<Kernel<T>>>,
    config: SimConfig,
}

impl<T: Clone + 'static> Simulation<T> {
    /// A simulation at time zero with an empty queue.
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    pub fn with_config(config: SimConfig) -> Self {
        Simulation {
            kernel: Rc::new(RefCell::new(Kernel::new(&config))),
            config,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn current_time(&self) -> VirtualTime {
        self.kernel.borrow().now
    }

    // ── Events ────────────────────────────────────────────

    /// Build an event due at `at`. Nothing is queued until
    /// [`schedule_event`](Self::schedule_event).
    pub fn create_event<F, Fut>(&mut self, at: VirtualTime, body: F, item: Option<T>) -> Event<T>
    where
        F: FnOnce(ProcessContext<T>) -> Fut + 'static,
        Fut: Future<Output = SimResult<T>> + 'static,
    {
        self.kernel
            .borrow_mut()
            .create_event(at, Process::new(body), item)
    }

    /// Admit an event into the queue.
    ///
    /// Fails with [`SimError::CausalityViolation`] if the event is due
    /// before the current time; the queue is left as it was.
    ///
    /// [`SimError::CausalityViolation`]: crate::SimError::CausalityViolation
    pub fn schedule_event(&mut self, event: Event<T>) -> SimResult<EventId> {
        self.kernel.borrow_mut().schedule_event(event)
    }

    /// Create and admit an event in one go.
    pub fn schedule<F, Fut>(&mut self, at: VirtualTime, body: F, item: Option<T>) -> SimResult<EventId>
    where
        F: FnOnce(ProcessContext<T>) -> Fut + 'static,
        Fut: Future<Output = SimResult<T>> + 'static,
    {
        let event = self.create_event(at, body, item);
        self.schedule_event(event)
    }

    // ── Stores ────────────────────────────────────────────

    /// Create a store holding `items`, oldest first.
    pub fn create_store(&mut self, items: impl IntoIterator<Item = T>) -> Store<T> {
        let id = self.kernel.borrow_mut().mint_store_id();
        Store::with_items(id, items)
    }

    // ── Execution ─────────────────────────────────────────

    /// Dispatch exactly one event, plus every process its store operations
    /// release.
    ///
    /// Returns the dispatched event, or `None` when the queue is empty.
    pub fn step(&mut self) -> Option<EventId> {
        let entry = {
            let mut kernel = self.kernel.borrow_mut();
            let entry = kernel.scheduler.pop_next()?;
            kernel.begin_dispatch(entry);
            entry
        };
        engine::handle_event(&self.kernel, entry.id);
        Some(entry.id)
    }

    /// Run until the queue is exhausted or the configured dispatch budget
    /// is spent.
    ///
    /// Processes still parked on a store at the end stay parked; inspect
    /// [`parked`](Self::parked) or the store queues to see them.
    #[instrument(skip_all)]
    pub fn run(&mut self) -> RunStats {
        let started = Instant::now();
        info!(start = %self.current_time(), queued = self.pending_count(), "run started");

        let mut dispatched = 0u64;
        loop {
            if self.config.max_dispatches.is_some_and(|max| dispatched >= max) {
                if let Some(next) = self.next_due() {
                    warn!(dispatched, queued = self.pending_count(), %next, "dispatch budget exhausted");
                }
                break;
            }
            if self.step().is_none() {
                break;
            }
            dispatched += 1;
        }

        let stats = RunStats { duration: started.elapsed() };
        info!(
            dispatched,
            now = %self.current_time(),
            parked = self.parked().len(),
            duration = ?stats.duration,
            "run finished"
        );
        stats
    }

    // ── Inspection ────────────────────────────────────────

    /// Record of an admitted event.
    pub fn event(&self, id: EventId) -> Option<EventRecord<T>> {
        self.kernel.borrow().records.get(&id).cloned()
    }

    /// Every admitted event, in id order.
    pub fn events(&self) -> Vec<EventRecord<T>> {
        self.kernel.borrow().records.values().cloned().collect()
    }

    /// Admitted events not yet dispatched.
    pub fn pending_count(&self) -> usize {
        self.kernel.borrow().scheduler.len()
    }

    /// Due time of the next event to dispatch.
    pub fn next_due(&self) -> Option<VirtualTime> {
        self.kernel
            .borrow()
            .scheduler
            .peek_next()
            .map(|entry| entry.scheduled_at)
    }

    /// Events whose process is parked in a store queue.
    pub fn parked(&self) -> Vec<EventId> {
        self.kernel
            .borrow()
            .records
            .values()
            .filter(|record| record.is_parked())
            .map(|record| record.id)
            .collect()
    }

    pub fn trace(&self) -> Vec<TraceEntry> {
        self.kernel.borrow().trace.clone()
    }

    /// Returns `true` if there is nothing left to dispatch.
    pub fn is_finished(&self) -> bool {
        self.kernel.borrow().scheduler.is_empty()
    }
}

impl<T: Clone + 'static> Default for Simulation<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Simulation<T> {
    fn drop(&mut self) {
        // Suspended continuations hold the kernel; release them so it can
        // be freed.
        let tasks = match self.kernel.try_borrow_mut() {
            Ok(mut kernel) => std::mem::take(&mut kernel.tasks),
            Err(_) => return,
        };
        drop(tasks);
    }
}
