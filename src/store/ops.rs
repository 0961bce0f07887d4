//! Futures for store operations.
//!
//! Both follow the same pattern:
//! 1. First poll: try to match against the opposite queue. A match, or a
//!    non-blocking deposit, completes right away.
//! 2. Otherwise open a queue entry in the store and return `Pending`.
//! 3. The engine polls again only after a matching operation has put the
//!    process on the ready list; the hand-off is then collected from the
//!    kernel.
//!
//! Dropping a future that still holds a queue entry gives the entry up: an
//! unmatched request or deposit leaves the store, and an item delivered
//! but never collected is offered to the next consumer.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::kernel::Ticket;
use crate::process::ProcessContext;

use super::{Claim, Store};

/// Future returned by [`ProcessContext::get`]. Resolves to the claimed
/// item.
#[must_use = "store operations do nothing unless awaited"]
pub struct Get<'a, T> {
    ctx: &'a ProcessContext<T>,
    store: &'a Store<T>,
    ticket: Option<Ticket>,
}

impl<'a, T> Get<'a, T> {
    pub(crate) fn new(ctx: &'a ProcessContext<T>, store: &'a Store<T>) -> Self {
        Get { ctx, store, ticket: None }
    }
}

impl<T: Clone + 'static> Future for Get<'_, T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<T> {
        let ctx = self.ctx;
        let mut kernel = ctx.kernel().borrow_mut();

        let parked = self.ticket;
        let item = match parked {
            Some(ticket) => match kernel.take_delivery(ticket) {
                Some(item) => {
                    self.ticket = None;
                    item
                }
                None => return Poll::Pending,
            },
            None => match self.store.request(&mut kernel, ctx.id()) {
                Claim::Item(item) => item,
                Claim::Parked(ticket) => {
                    self.ticket = Some(ticket);
                    return Poll::Pending;
                }
            },
        };
        kernel.record_item(ctx.id(), item.clone());
        Poll::Ready(item)
    }
}

impl<T> Drop for Get<'_, T> {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        let Ok(mut kernel) = self.ctx.kernel().try_borrow_mut() else {
            return;
        };
        match kernel.take_delivery(ticket) {
            Some(item) => self.store.reoffer(&mut kernel, item),
            None => self.store.withdraw_request(&mut kernel, ticket),
        }
    }
}

/// Future returned by [`ProcessContext::put`] and
/// [`ProcessContext::put_blocking`].
#[must_use = "store operations do nothing unless awaited"]
pub struct Put<'a, T> {
    ctx: &'a ProcessContext<T>,
    store: &'a Store<T>,
    item: Option<T>,
    blocking: bool,
    ticket: Option<Ticket>,
}

impl<'a, T> Put<'a, T> {
    pub(crate) fn new(ctx: &'a ProcessContext<T>, store: &'a Store<T>, item: T, blocking: bool) -> Self {
        Put {
            ctx,
            store,
            item: Some(item),
            blocking,
            ticket: None,
        }
    }
}

// The item is moved out by value and never pinned.
impl<T> Unpin for Put<'_, T> {}

impl<T: Clone + 'static> Future for Put<'_, T> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let ctx = self.ctx;
        let mut kernel = ctx.kernel().borrow_mut();

        let parked = self.ticket;
        if let Some(ticket) = parked {
            return if kernel.take_release(ticket) {
                self.ticket = None;
                Poll::Ready(())
            } else {
                Poll::Pending
            };
        }

        let Some(item) = self.item.take() else {
            return Poll::Ready(());
        };
        match self.store.deposit(&mut kernel, ctx.id(), item, self.blocking) {
            None => Poll::Ready(()),
            Some(ticket) => {
                self.ticket = Some(ticket);
                Poll::Pending
            }
        }
    }
}

impl<T> Drop for Put<'_, T> {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        let Ok(mut kernel) = self.ctx.kernel().try_borrow_mut() else {
            return;
        };
        if !kernel.take_release(ticket) {
            self.store.withdraw_deposit(&mut kernel, ticket);
        }
    }
}
