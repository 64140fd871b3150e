//! Recomputing the derived view off the main thread.
//!
//! [`coordinator`] runs on the main thread and talks JSON to a worker through a
//! [`WorkerPort`]. [`worker`] is the other end. On native targets
//! [`thread::ThreadWorker`] hosts it on a background thread; in the browser the
//! `/api/worker/filter` route hosts it inside a web worker.

pub mod coordinator;
pub mod protocol;
pub mod worker;

#[cfg(not(target_arch = "wasm32"))]
pub mod thread;

pub use coordinator::{Coordinator, RankLookup, RankedJob, RankedResult, Recompute, WorkerPort};
pub use protocol::{Validated, WorkerResponse};
pub use worker::WorkerState;
