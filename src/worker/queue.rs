//! Work queue between the event-driven front end and the OCR worker.
//!
//! Uses std::sync::mpsc channels: screenshots go in on one channel, results
//! come back on another, tagged with the caller's request id.

use chrono::{DateTime, Local};
use std::sync::mpsc::{Receiver, Sender, channel};

use crate::error::PipelineError;
use crate::ocr::PipelineOutcome;

/// A screenshot waiting for OCR.
#[derive(Debug, Clone)]
pub struct LootWorkItem {
    /// Caller-chosen id echoed back in the result (e.g. the chat message id)
    pub request_id: u64,
    /// Encoded image bytes as downloaded
    pub image: Vec<u8>,
    /// Timestamp when the screenshot was queued
    pub submitted_at: DateTime<Local>,
}

impl LootWorkItem {
    /// Creates a new work item.
    pub fn new(request_id: u64, image: Vec<u8>) -> Self {
        Self {
            request_id,
            image,
            submitted_at: Local::now(),
        }
    }
}

/// Pipeline result for one work item.
#[derive(Debug)]
pub struct LootWorkResult {
    pub request_id: u64,
    pub result: Result<PipelineOutcome, PipelineError>,
}

/// Creates a new work queue.
///
/// Returns a tuple of (sender, receiver). The channel is unbounded - items
/// queue up if OCR is slower than screenshots arrive.
pub fn create_work_queue() -> (Sender<LootWorkItem>, Receiver<LootWorkItem>) {
    channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_queue_send_receive() {
        let (sender, receiver) = create_work_queue();

        sender
            .send(LootWorkItem::new(42, vec![1, 2, 3]))
            .expect("Failed to send");

        let received = receiver.recv().expect("Failed to receive");
        assert_eq!(received.request_id, 42);
        assert_eq!(received.image, vec![1, 2, 3]);
    }

    #[test]
    fn test_work_queue_preserves_order() {
        let (sender, receiver) = create_work_queue();

        for i in 1..=5 {
            sender.send(LootWorkItem::new(i, Vec::new())).expect("Failed to send");
        }

        for i in 1..=5 {
            let received = receiver.recv().expect("Failed to receive");
            assert_eq!(received.request_id, i);
        }
    }

    #[test]
    fn test_channel_closes_when_sender_dropped() {
        let (sender, receiver) = create_work_queue();

        sender.send(LootWorkItem::new(1, Vec::new())).unwrap();
        drop(sender);

        assert!(receiver.recv().is_ok());
        assert!(receiver.recv().is_err());
    }
}
