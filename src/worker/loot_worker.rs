//! OCR worker thread for processing screenshots.
//!
//! Runs in a separate thread, receiving screenshots from the work queue and
//! sending one result per item back on the result channel.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::PipelineError;
use crate::ocr::LootPipeline;
use crate::worker::queue::{LootWorkItem, LootWorkResult, create_work_queue};

/// Runs the OCR worker loop.
///
/// Processes items until the work channel is closed (all senders dropped) or
/// nobody is left to receive results. Each item is bounded by the pipeline's
/// configured timeout; a failure is reported for that item and the loop
/// moves on.
///
/// This function blocks, so it should be run in a dedicated thread.
pub fn run_loot_worker(
    receiver: Receiver<LootWorkItem>,
    results: Sender<LootWorkResult>,
    pipeline: LootPipeline,
) {
    info!("OCR worker started");
    let timeout = pipeline.config().timeout();

    while let Ok(work_item) = receiver.recv() {
        let request_id = work_item.request_id;
        info!(
            "OCR worker: processing request {} ({} bytes, queued at {})",
            request_id,
            work_item.image.len(),
            work_item.submitted_at.format("%H:%M:%S")
        );

        let result = pipeline.process_with_timeout(work_item.image, timeout);
        match &result {
            Ok(outcome) => info!(
                "OCR complete for request {}: {} items via {}",
                request_id,
                outcome.items.len(),
                outcome.method
            ),
            Err(e) => warn!("OCR worker: request {} failed: {}", request_id, e),
        }

        if results.send(LootWorkResult { request_id, result }).is_err() {
            warn!("OCR worker: result receiver dropped, exiting");
            break;
        }
    }

    info!("OCR worker finished");
}

/// Front-end side of a running worker.
pub struct WorkerHandle {
    sender: Sender<LootWorkItem>,
    results: Receiver<LootWorkResult>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Queues a screenshot. Fails only if the worker thread has exited.
    pub fn submit(&self, request_id: u64, image: Vec<u8>) -> Result<(), PipelineError> {
        self.sender
            .send(LootWorkItem::new(request_id, image))
            .map_err(|_| PipelineError::WorkerStopped)
    }

    /// A cloneable sender for handing to other event handlers.
    pub fn sender(&self) -> Sender<LootWorkItem> {
        self.sender.clone()
    }

    /// Blocks until the next result arrives.
    pub fn recv(&self) -> Result<LootWorkResult, PipelineError> {
        self.results.recv().map_err(|_| PipelineError::WorkerStopped)
    }

    /// Waits up to `timeout` for the next result.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<LootWorkResult, PipelineError> {
        self.results.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => PipelineError::Timeout(timeout),
            RecvTimeoutError::Disconnected => PipelineError::WorkerStopped,
        })
    }

    /// Returns a result if one is ready.
    pub fn try_recv(&self) -> Option<LootWorkResult> {
        self.results.try_recv().ok()
    }

    /// Closes the queue and waits for queued items to finish.
    ///
    /// Results still buffered in the channel are returned.
    pub fn shutdown(self) -> Vec<LootWorkResult> {
        let WorkerHandle {
            sender,
            results,
            thread,
        } = self;
        drop(sender);
        if thread.join().is_err() {
            warn!("OCR worker thread panicked");
        }
        results.try_iter().collect()
    }
}

/// Spawns the worker thread for a pipeline.
pub fn spawn_loot_worker(pipeline: LootPipeline) -> WorkerHandle {
    let (sender, receiver) = create_work_queue();
    let (result_sender, results) = channel();

    let thread = thread::spawn(move || run_loot_worker(receiver, result_sender, pipeline));

    WorkerHandle {
        sender,
        results,
        thread,
    }
}
