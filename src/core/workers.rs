//! Background probe worker.
//!
//! One thread answers probe requests in FIFO order over crossbeam channels.
//! The control thread submits requests and drains responses from its update
//! loop, so probe I/O never blocks a tick. Each player keeps at most one
//! request in flight, which keeps its probes sequential.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use log::trace;

use super::probe::{FrameProbe, ProbeRequest, ProbeResponse};

/// Dedicated probe thread with request/response channels.
///
/// # Example
/// ```ignore
/// let worker = ProbeWorker::spawn(Arc::new(FsProbe::new(".")), "poster");
/// worker.submit(request);
///
/// // In update loop:
/// while let Ok(Some(response)) = worker.try_recv() {
///     // feed response to the player
/// }
/// ```
pub struct ProbeWorker {
    requests: Option<Sender<ProbeRequest>>,
    responses: Receiver<ProbeResponse>,
    handle: Option<thread::JoinHandle<()>>,
}

/// The worker thread ended early (a probe panicked). Unanswered requests are lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerGone;

impl std::fmt::Display for WorkerGone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "probe worker thread is gone")
    }
}

impl std::error::Error for WorkerGone {}

impl ProbeWorker {
    /// Start the worker thread. `name` only labels the thread.
    pub fn spawn(probe: Arc<dyn FrameProbe>, name: &str) -> Self {
        let (request_tx, request_rx) = unbounded::<ProbeRequest>();
        let (response_tx, response_rx) = unbounded::<ProbeResponse>();
        let label = name.to_string();

        let handle = thread::Builder::new()
            .name(format!("flipbook-probe-{}", name))
            .spawn(move || {
                trace!("Probe worker {} started", label);
                // Ends when the request sender is dropped
                for request in request_rx.iter() {
                    let response = request.resolve(probe.as_ref());
                    if response_tx.send(response).is_err() {
                        break;
                    }
                }
                trace!("Probe worker {} stopped", label);
            })
            .expect("Failed to spawn probe worker thread");

        Self {
            requests: Some(request_tx),
            responses: response_rx,
            handle: Some(handle),
        }
    }

    /// Queue a request. False if the worker is gone.
    pub fn submit(&self, request: ProbeRequest) -> bool {
        match &self.requests {
            Some(tx) => tx.send(request).is_ok(),
            None => false,
        }
    }

    /// Next answered probe, if any. Never blocks.
    ///
    /// Answers already sent are still delivered after the thread died;
    /// `WorkerGone` only comes once the channel is drained.
    pub fn try_recv(&self) -> Result<Option<ProbeResponse>, WorkerGone> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerGone),
        }
    }

    /// Wait up to `timeout` for the next answered probe
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ProbeResponse> {
        self.responses.recv_timeout(timeout).ok()
    }
}

impl Drop for ProbeWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();

        let Some(handle) = self.handle.take() else {
            return;
        };

        // A probe in flight may be slow (network share); don't hang on it
        let deadline = Instant::now() + Duration::from_millis(500);
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                trace!("Probe worker shutdown timeout reached, detaching");
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        let _ = handle.join();
    }
}
