//! Scheduler that only records what it was given.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::ports::{BackgroundTask, SchedulerError, TaskScheduler};

#[derive(Debug, Default)]
pub struct RecordingScheduler {
    tasks: Mutex<Vec<BackgroundTask>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks scheduled so far, in order.
    pub fn tasks(&self) -> Vec<BackgroundTask> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl TaskScheduler for RecordingScheduler {
    async fn schedule(&self, task: BackgroundTask) -> Result<(), SchedulerError> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(task);
        Ok(())
    }
}
