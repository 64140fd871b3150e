//! Background worker on a native thread.
//!
//! The thread owns its own [`WorkerState`]; the only link to the coordinator is
//! a pair of channels carrying JSON strings, the same messages a browser
//! worker would exchange.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use tracing::{debug, warn};

use super::coordinator::WorkerPort;
use super::worker::WorkerState;

/// Run the worker loop until the request channel closes.
pub fn run_worker_loop(mut state: WorkerState, requests: Receiver<String>, replies: Sender<String>) {
    for raw in requests {
        if let Some(reply) = state.handle_message(&raw)
            && replies.send(reply).is_err()
        {
            break;
        }
    }
    debug!("worker loop exiting");
}

pub struct ThreadWorker {
    requests: Option<Sender<String>>,
    replies: Receiver<String>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadWorker {
    /// Spawn the worker thread. Returns `None` when the platform cannot
    /// start threads, in which case the coordinator runs synchronously.
    pub fn spawn() -> Option<Self> {
        let (request_tx, request_rx) = unbounded::<String>();
        let (reply_tx, reply_rx) = unbounded::<String>();
        let handle = thread::Builder::new()
            .name("dexkit-filter".into())
            .spawn(move || run_worker_loop(WorkerState::new(), request_rx, reply_tx));
        match handle {
            Ok(handle) => Some(Self {
                requests: Some(request_tx),
                replies: reply_rx,
                handle: Some(handle),
            }),
            Err(e) => {
                warn!(error = %e, "could not spawn filter worker");
                None
            }
        }
    }

    /// Block until the next reply arrives. Test and shutdown helper.
    pub fn recv_blocking(&self) -> Option<String> {
        self.replies.recv().ok()
    }
}

impl WorkerPort for ThreadWorker {
    fn post(&mut self, message: String) -> bool {
        self.requests
            .as_ref()
            .is_some_and(|tx| tx.send(message).is_ok())
    }

    fn try_recv(&mut self) -> Option<String> {
        match self.replies.try_recv() {
            Ok(reply) => Some(reply),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("filter worker disconnected");
                None
            }
        }
    }
}

impl Drop for ThreadWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the loop.
        self.requests.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("filter worker thread panicked");
        }
    }
}
