//! # Sundial: coroutine-driven discrete-event simulation
//!
//! A single-threaded simulation kernel for queueing, producer/consumer
//! and resource-contention models. State changes only at discrete points
//! of virtual time, and every change is made by a *process*: an `async`
//! body attached to an event that runs until it finishes or parks on a
//! store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │         Simulation           │ ← clock, records, run loop
//! │  ┌────────────────────────┐  │
//! │  │       Scheduler        │  │ ← min-heap on (time, admission)
//! │  └────────────────────────┘  │
//! │  ┌────────────────────────┐  │
//! │  │   Execution engine     │  │ ← polls processes, drains ready list
//! │  └────────────────────────┘  │
//! │  ┌────────────────────────┐  │
//! │  │        Stores          │  │ ← FIFO put/get queues
//! │  └────────────────────────┘  │
//! └──────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use sundial::{Simulation, VirtualTime};
//!
//! let mut sim: Simulation<&'static str> = Simulation::new();
//! let store = sim.create_store([]);
//!
//! let s = store.clone();
//! let producer = sim
//!     .schedule(VirtualTime::new(50), move |ctx| async move {
//!         ctx.put(&s, "widget").await;
//!         Ok("produced")
//!     }, None)
//!     .unwrap();
//!
//! let s = store.clone();
//! let consumer = sim
//!     .schedule(VirtualTime::new(60), move |ctx| async move {
//!         Ok(ctx.get(&s).await)
//!     }, None)
//!     .unwrap();
//!
//! sim.run();
//! assert_eq!(sim.event(producer).unwrap().finished_at, Some(VirtualTime::new(50)));
//! assert_eq!(sim.event(consumer).unwrap().finished_at, Some(VirtualTime::new(60)));
//! assert_eq!(sim.event(consumer).unwrap().item, Some("widget"));
//! ```

pub mod config;
mod engine;
pub mod error;
pub mod event;
mod kernel;
pub mod process;
pub mod scheduler;
pub mod simulation;
pub mod store;
pub mod time;
pub mod trace;

// Re-exports for convenience.
pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use event::{Event, EventId, EventIdGen, EventRecord, EventStatus};
pub use process::{Process, ProcessContext, TaskState};
pub use scheduler::Scheduler;
pub use simulation::{RunStats, Simulation};
pub use store::{Get, Put, Store, StoreId};
pub use time::VirtualTime;
pub use trace::{Resumption, TraceEntry};
