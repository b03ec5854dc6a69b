//! Background processing of screenshots.
//!
//! The chat front end queues screenshots and keeps handling events while a
//! dedicated worker thread runs the OCR pipeline and replies per request.

pub mod loot_worker;
pub mod queue;

pub use loot_worker::{WorkerHandle, run_loot_worker, spawn_loot_worker};
pub use queue::{LootWorkItem, LootWorkResult, create_work_queue};
