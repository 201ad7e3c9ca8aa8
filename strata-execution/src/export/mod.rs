//! Export task lifecycle on top of the fragment manager

mod manager;

pub use manager::{ExportCacheStats, ExportTaskManager, ExportTaskRequest, ExportTaskState};
