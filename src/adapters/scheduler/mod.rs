//! Task scheduler adapters.
//!
//! - `TokioTaskScheduler` + `TaskWorker` - in-process queue drained by a
//!   worker that spawns one task per job
//! - `RecordingScheduler` - records tasks without running them (testing)

mod recording;
mod tokio_scheduler;

pub use recording::RecordingScheduler;
pub use tokio_scheduler::{TaskWorker, TokioTaskScheduler};
