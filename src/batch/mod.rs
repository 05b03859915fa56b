//! Batch orchestration: sequential work loop, shutdown, and progress.

pub mod orchestrator;
pub mod progress;
pub mod shutdown;

pub use orchestrator::{BatchOrchestrator, RunOutcome, RunReport};
pub use shutdown::ShutdownFlag;
