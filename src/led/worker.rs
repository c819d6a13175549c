use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};

use crate::config::ChannelId;
use crate::led::dispatch::{ActionRequest, DispatchOutcome, Dispatcher};

/// Runs dispatches on one background thread, in submission order.
/// Dropping the worker cancels the dispatch in progress and discards queued
/// requests.
pub struct DispatchWorker {
    requests: Option<Sender<ActionRequest>>,
    shutdown: Option<Sender<()>>,
    completions: Receiver<(ChannelId, DispatchOutcome)>,
    join: Option<JoinHandle<()>>,
}

impl DispatchWorker {
    pub fn start(dispatcher: Dispatcher) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<ActionRequest>();
        let (done_tx, done_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let join = thread::Builder::new()
            .name("led-dispatch".to_string())
            .spawn(move || run_worker_loop(dispatcher, request_rx, shutdown_rx, done_tx))
            .context("failed to spawn LED dispatch thread")?;

        Ok(Self {
            requests: Some(request_tx),
            shutdown: Some(shutdown_tx),
            completions: done_rx,
            join: Some(join),
        })
    }

    pub fn submit(&self, request: ActionRequest) -> Result<()> {
        let sender = self
            .requests
            .as_ref()
            .ok_or_else(|| anyhow!("LED dispatch thread is shut down"))?;
        sender
            .send(request)
            .map_err(|_| anyhow!("LED dispatch thread exited"))
    }

    /// Returns the next finished dispatch, if any, without blocking.
    pub fn poll(&self) -> Option<(ChannelId, DispatchOutcome)> {
        self.completions.try_recv().ok()
    }
}

impl Drop for DispatchWorker {
    fn drop(&mut self) {
        // Disconnecting the shutdown channel interrupts the current wait.
        drop(self.shutdown.take());
        drop(self.requests.take());
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            tracing::warn!("LED dispatch thread panicked");
        }
    }
}

fn run_worker_loop(
    mut dispatcher: Dispatcher,
    requests: Receiver<ActionRequest>,
    shutdown: Receiver<()>,
    completions: Sender<(ChannelId, DispatchOutcome)>,
) {
    while let Ok(request) = requests.recv() {
        if !matches!(shutdown.try_recv(), Err(TryRecvError::Empty)) {
            tracing::debug!(channel = %request.channel, "dropping queued LED request");
            break;
        }
        let Some(outcome) = dispatcher.dispatch_until(&request, &shutdown) else {
            break;
        };
        if completions.send((request.channel, outcome)).is_err() {
            break;
        }
    }
    tracing::debug!("LED dispatch thread stopped");
}
