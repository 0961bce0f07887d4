//! Process execution engine.
//!
//! Drives one dispatched process until it parks or finishes, then drains
//! the ready list of processes released by store matches during that
//! turn. Everything here happens at a single value of the clock.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;
use tracing::{debug, warn};

use crate::error::SimError;
use crate::event::EventId;
use crate::kernel::Kernel;
use crate::process::{ProcessContext, Task, TaskState};
use crate::trace::Resumption;

/// Run the process attached to a dispatched event, plus everything its
/// store operations release.
pub(crate) fn handle_event<T: Clone + 'static>(kernel: &Rc<RefCell<Kernel<T>>>, id: EventId) {
    resume(kernel, id, Resumption::Dispatched);

    loop {
        let next = kernel.borrow_mut().ready.pop_front();
        let Some((released, store)) = next else {
            break;
        };
        resume(kernel, released, Resumption::StoreMatch(store));
    }
}

/// Poll one process once.
fn resume<T: Clone + 'static>(kernel: &Rc<RefCell<Kernel<T>>>, id: EventId, cause: Resumption) {
    let (task, fired_at, scheduled_at) = {
        let mut k = kernel.borrow_mut();
        let Some((fired_at, scheduled_at)) = k.records.get(&id).map(|r| (r.fired_at, r.scheduled_at)) else {
            warn!(event = %id, "no record to resume");
            return;
        };
        // A process can finish in the same turn a hand-off to it was queued.
        let Some(task) = k.tasks.remove(&id) else {
            debug!(event = %id, "process already finished");
            return;
        };
        k.note_resumption(id, cause);
        k.set_task(id, TaskState::Running);
        (task, fired_at, scheduled_at)
    };

    let mut future = match task {
        Task::Suspended(future) => future,
        Task::Unstarted(process) => {
            let ctx = ProcessContext::new(Rc::clone(kernel), id, fired_at, scheduled_at);
            process.start(ctx)
        }
    };

    let mut cx = Context::from_waker(noop_waker_ref());
    let outcome = future.as_mut().poll(&mut cx);

    // The borrow ends before `future` is dropped: dropping store futures
    // touches the kernel.
    let mut k = kernel.borrow_mut();
    match outcome {
        Poll::Pending => match k.waiting_on(id) {
            Some(store) => {
                k.set_task(id, TaskState::WaitingOnStore(store));
                k.tasks.insert(id, Task::Suspended(future));
            }
            None => {
                debug!(event = %id, "process yielded without a store entry");
                k.terminate(id, SimError::UnsupportedSuspension { event: id });
            }
        },
        Poll::Ready(Ok(result)) => k.complete(id, result),
        Poll::Ready(Err(error)) => k.terminate(id, error),
    }
}
