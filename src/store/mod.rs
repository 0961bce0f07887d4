//! Resource store: an unbounded FIFO synchronous channel.
//!
//! A store keeps two queues. `put_requests` holds deposited items nobody
//! has claimed yet; `get_requests` holds consumers waiting for an item.
//! Every operation first tries to match against the opposite queue, so at
//! any quiescent instant at most one of them is non-empty. Processes reach
//! the queues through the [`Get`] and [`Put`] futures.
//!
//! Matching is strictly oldest-demand against oldest-supply. The blocking
//! flag on a deposit only decides when the producer itself resumes:
//! immediately for a plain deposit, at the moment of consumption for a
//! blocking one.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::trace;

use crate::event::EventId;
use crate::kernel::{Kernel, Ticket};

mod ops;

pub use ops::{Get, Put};


// ── Store ID ──────────────────────────────────────────────────────────

/// Identifies a store within one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreId(u64);

impl StoreId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        StoreId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S#{}", self.0)
    }
}

// ── Queues ────────────────────────────────────────────────────────────

/// A deposited item not yet claimed.
#[derive(Debug)]
struct PutRequest<T> {
    item: T,
    /// `None` for seeded and re-offered items.
    producer: Option<EventId>,
    /// Set while a blocking producer is parked on this deposit.
    ticket: Option<Ticket>,
}

/// A parked consumer.
#[derive(Debug, Clone, Copy)]
struct GetRequest {
    consumer: EventId,
    ticket: Ticket,
}

#[derive(Debug)]
struct Queues<T> {
    put_requests: VecDeque<PutRequest<T>>,
    get_requests: VecDeque<GetRequest>,
}

impl<T> Queues<T> {
    fn is_balanced(&self) -> bool {
        self.put_requests.is_empty() || self.get_requests.is_empty()
    }
}

/// Outcome of a `get` against the put queue.
pub(crate) enum Claim<T> {
    Item(T),
    Parked(Ticket),
}

// ── Store ─────────────────────────────────────────────────────────────

/// Handle to a store. Clones share the same queues.
///
/// Built with [`Simulation::create_store`](crate::Simulation::create_store)
/// and used from processes through
/// [`ProcessContext::get`](crate::ProcessContext::get) and
/// [`ProcessContext::put`](crate::ProcessContext::put).
pub struct Store<T> {
    id: StoreId,
    queues: Rc<RefCell<Queues<T>>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Store {
            id: self.id,
            queues: Rc::clone(&self.queues),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queues = self.queues.borrow();
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("put_requests", &queues.put_requests)
            .field("get_requests", &queues.get_requests)
            .finish()
    }
}

impl<T> Store<T> {
    /// A store pre-filled with `items`, oldest first. Seeded items have no
    /// producer to resume.
    pub(crate) fn with_items(id: StoreId, items: impl IntoIterator<Item = T>) -> Self {
        let put_requests = items
            .into_iter()
            .map(|item| PutRequest { item, producer: None, ticket: None })
            .collect();
        Store {
            id,
            queues: Rc::new(RefCell::new(Queues {
                put_requests,
                get_requests: VecDeque::new(),
            })),
        }
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    /// Number of deposited items waiting for a consumer.
    pub fn put_requests_len(&self) -> usize {
        self.queues.borrow().put_requests.len()
    }

    /// Number of consumers waiting for an item.
    pub fn get_requests_len(&self) -> usize {
        self.queues.borrow().get_requests.len()
    }

    /// Parked consumers, oldest first.
    pub fn waiting_consumers(&self) -> Vec<EventId> {
        self.queues
            .borrow()
            .get_requests
            .iter()
            .map(|req| req.consumer)
            .collect()
    }

    /// Blocking producers parked until their deposit is claimed, oldest
    /// first. Plain deposits have already let their producer go.
    pub fn waiting_producers(&self) -> Vec<EventId> {
        self.queues
            .borrow()
            .put_requests
            .iter()
            .filter(|req| req.ticket.is_some())
            .filter_map(|req| req.producer)
            .collect()
    }

    /// Returns `true` when neither queue holds anything.
    pub fn is_idle(&self) -> bool {
        let queues = self.queues.borrow();
        queues.put_requests.is_empty() && queues.get_requests.is_empty()
    }

    /// Claim the oldest deposit for `consumer`, or park the consumer.
    ///
    /// Consuming a blocking deposit releases its producer at the current
    /// time.
    pub(crate) fn request(&self, kernel: &mut Kernel<T>, consumer: EventId) -> Claim<T> {
        let mut queues = self.queues.borrow_mut();
        let claim = match queues.put_requests.pop_front() {
            Some(deposit) => {
                if let Some(ticket) = deposit.ticket {
                    kernel.release(ticket);
                }
                trace!(store = %self.id, %consumer, producer = ?deposit.producer, now = %kernel.now, "get matched deposit");
                Claim::Item(deposit.item)
            }
            None => {
                let ticket = kernel.park(consumer, self.id);
                queues.get_requests.push_back(GetRequest { consumer, ticket });
                Claim::Parked(ticket)
            }
        };
        debug_assert!(queues.is_balanced());
        claim
    }

    /// Deposit `item` on behalf of `producer`.
    ///
    /// Returns `None` when the producer may continue in this turn: the item
    /// went straight to a waiting consumer, or the deposit is
    /// non-blocking. Otherwise returns the ticket the producer waits on.
    pub(crate) fn deposit(
        &self,
        kernel: &mut Kernel<T>,
        producer: EventId,
        item: T,
        blocking: bool,
    ) -> Option<Ticket> {
        let mut queues = self.queues.borrow_mut();
        let parked = match queues.get_requests.pop_front() {
            Some(waiter) => {
                trace!(store = %self.id, %producer, consumer = %waiter.consumer, now = %kernel.now, "put matched waiting consumer");
                kernel.deliver(waiter.ticket, item);
                None
            }
            None => {
                let ticket = blocking.then(|| kernel.park(producer, self.id));
                queues.put_requests.push_back(PutRequest {
                    item,
                    producer: Some(producer),
                    ticket,
                });
                ticket
            }
        };
        debug_assert!(queues.is_balanced());
        parked
    }

    /// Remove a parked consumer that stopped waiting.
    pub(crate) fn withdraw_request(&self, kernel: &mut Kernel<T>, ticket: Ticket) {
        let mut queues = self.queues.borrow_mut();
        if let Some(pos) = queues.get_requests.iter().position(|req| req.ticket == ticket) {
            queues.get_requests.remove(pos);
            kernel.withdraw(ticket);
        }
    }

    /// Remove an unclaimed blocking deposit whose producer stopped waiting.
    /// The item goes with it.
    pub(crate) fn withdraw_deposit(&self, kernel: &mut Kernel<T>, ticket: Ticket) -> Option<T> {
        let mut queues = self.queues.borrow_mut();
        let pos = queues
            .put_requests
            .iter()
            .position(|req| req.ticket == Some(ticket))?;
        kernel.withdraw(ticket);
        queues.put_requests.remove(pos).map(|req| req.item)
    }

    /// Return an item that was handed to a consumer who never collected
    /// it. It goes to the next waiting consumer, or back to the head of the
    /// put queue.
    pub(crate) fn reoffer(&self, kernel: &mut Kernel<T>, item: T) {
        let mut queues = self.queues.borrow_mut();
        match queues.get_requests.pop_front() {
            Some(waiter) => kernel.deliver(waiter.ticket, item),
            None => queues.put_requests.push_front(PutRequest {
                item,
                producer: None,
                ticket: None,
            }),
        }
        trace!(store = %self.id, now = %kernel.now, "uncollected item re-offered");
        debug_assert!(queues.is_balanced());
    }
}

impl<T: Clone> Store<T> {
    /// Unclaimed items, oldest first.
    pub fn queued_items(&self) -> Vec<T> {
        self.queues
            .borrow()
            .put_requests
            .iter()
            .map(|req| req.item.clone())
            .collect()
    }
}
