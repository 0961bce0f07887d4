//! Processes: suspendable computations attached to events.
//!
//! A process body is an `async` closure taking a [`ProcessContext`]. The
//! engine polls it with a no-op waker, so the only way for it to make
//! progress after suspending is a store match that puts it back on the
//! ready list. Suspending with no store operation pending is unsupported
//! and terminates the process. Store futures may be combined with
//! `join`/`select`; a dropped one gives up its place in the queue.
//!
//! # Example
//!
//! ```rust
//! use sundial::{Simulation, VirtualTime};
//!
//! let mut sim: Simulation<u32> = Simulation::new();
//! let store = sim.create_store([]);
//!
//! let producer_store = store.clone();
//! sim.schedule(VirtualTime::new(30), move |ctx| async move {
//!     ctx.put_blocking(&producer_store, 7).await;
//!     Ok(0)
//! }, None).unwrap();
//!
//! let consumer_store = store.clone();
//! let consumer = sim.schedule(VirtualTime::new(40), move |ctx| async move {
//!     Ok(ctx.get(&consumer_store).await)
//! }, None).unwrap();
//!
//! sim.run();
//! assert_eq!(sim.event(consumer).unwrap().item, Some(7));
//! ```

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};

use crate::error::{SimError, SimResult};
use crate::event::{Event, EventId, EventRecord};
use crate::kernel::Kernel;
use crate::store::{Get, Put, Store, StoreId};
use crate::time::VirtualTime;

// ── Task state ────────────────────────────────────────────────────────

/// Where a process is in its own execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskState {
    /// Admitted but never polled.
    NotStarted,
    /// Currently being polled by the engine.
    Running,
    /// Parked in a store wait queue. With several entries open, the most
    /// recent one.
    WaitingOnStore(StoreId),
    /// Returned a result.
    Completed,
    /// Returned an error or suspended on a foreign future.
    Failed,
}

// ── Process ───────────────────────────────────────────────────────────

type Body<T> = Box<dyn FnOnce(ProcessContext<T>) -> LocalBoxFuture<'static, SimResult<T>>>;

/// A process body that has not been started yet.
pub struct Process<T> {
    body: Body<T>,
}

impl<T: 'static> Process<T> {
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(ProcessContext<T>) -> Fut + 'static,
        Fut: Future<Output = SimResult<T>> + 'static,
    {
        Process {
            body: Box::new(move |ctx| body(ctx).boxed_local()),
        }
    }

    /// Build the continuation. No user code in an `async` body runs until
    /// the returned future is first polled.
    pub(crate) fn start(self, ctx: ProcessContext<T>) -> LocalBoxFuture<'static, SimResult<T>> {
        (self.body)(ctx)
    }
}

/// What the kernel holds for an admitted event.
pub(crate) enum Task<T> {
    Unstarted(Process<T>),
    Suspended(LocalBoxFuture<'static, SimResult<T>>),
}

// ── Process context ───────────────────────────────────────────────────

/// A process's handle onto the simulation.
///
/// Gives access to the process's own event, the clock, the stores and the
/// scheduler. Every call borrows the kernel only for its own duration.
pub struct ProcessContext<T> {
    kernel: Rc<RefCell<Kernel<T>>>,
    id: EventId,
    fired_at: VirtualTime,
    scheduled_at: VirtualTime,
}

impl<T> ProcessContext<T> {
    pub(crate) fn kernel(&self) -> &RefCell<Kernel<T>> {
        &self.kernel
    }
}

impl<T: Clone + 'static> ProcessContext<T> {
    pub(crate) fn new(
        kernel: Rc<RefCell<Kernel<T>>>,
        id: EventId,
        fired_at: VirtualTime,
        scheduled_at: VirtualTime,
    ) -> Self {
        ProcessContext { kernel, id, fired_at, scheduled_at }
    }

    /// Id of the event this process is attached to.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.kernel.borrow().now
    }

    pub fn fired_at(&self) -> VirtualTime {
        self.fired_at
    }

    pub fn scheduled_at(&self) -> VirtualTime {
        self.scheduled_at
    }

    /// The event's current payload: the initial item, or the last item
    /// received from a store.
    pub fn item(&self) -> Option<T> {
        self.kernel
            .borrow()
            .records
            .get(&self.id)
            .and_then(|record| record.item.clone())
    }

    /// Snapshot of this process's own event record.
    pub fn record(&self) -> Option<EventRecord<T>> {
        self.kernel.borrow().records.get(&self.id).cloned()
    }

    /// Request an item from `store`, suspending until one is available.
    pub fn get<'a>(&'a self, store: &'a Store<T>) -> Get<'a, T> {
        Get::new(self, store)
    }

    /// Deposit `item` into `store` and continue immediately.
    pub fn put<'a>(&'a self, store: &'a Store<T>, item: T) -> Put<'a, T> {
        Put::new(self, store, item, false)
    }

    /// Deposit `item` into `store` and suspend until a consumer takes it.
    pub fn put_blocking<'a>(&'a self, store: &'a Store<T>, item: T) -> Put<'a, T> {
        Put::new(self, store, item, true)
    }

    /// Create a new event. It is not admitted until passed to
    /// [`schedule_event`](Self::schedule_event).
    pub fn create_event<F, Fut>(&self, at: VirtualTime, body: F, item: Option<T>) -> Event<T>
    where
        F: FnOnce(ProcessContext<T>) -> Fut + 'static,
        Fut: Future<Output = SimResult<T>> + 'static,
    {
        self.kernel
            .borrow_mut()
            .create_event(at, Process::new(body), item)
    }

    /// Admit an event. Events due now run later in the same run, after
    /// every equal-time event admitted before them.
    pub fn schedule_event(&self, event: Event<T>) -> SimResult<EventId> {
        self.kernel.borrow_mut().schedule_event(event)
    }

    /// Create and admit an event `delay` ticks from now.
    pub fn schedule_after<F, Fut>(&self, delay: u64, body: F, item: Option<T>) -> SimResult<EventId>
    where
        F: FnOnce(ProcessContext<T>) -> Fut + 'static,
        Fut: Future<Output = SimResult<T>> + 'static,
    {
        let now = self.now();
        let at = now
            .checked_add(delay)
            .ok_or(SimError::TimeOverflow { now, delay })?;
        let event = self.create_event(at, body, item);
        self.schedule_event(event)
    }

    /// Build a [`SimError::ProcessFailed`] for this process.
    pub fn failure(&self, reason: impl Into<String>) -> SimError {
        SimError::ProcessFailed {
            event: self.id,
            reason: reason.into(),
        }
    }
}
