//! The observable event contract emitted to the platform (§6).

use signage_model::{FileId, FileKind};
use std::collections::HashSet;

/// Everything the Orchestrator surfaces. The renderer/platform layer
/// subscribes to these; the core never blocks waiting for a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CollectionStart,
    RegisterComplete,
    FilesReceived { count: usize },
    ScheduleReceived,
    DownloadRequest { file_id: FileId },
    LayoutsScheduled { count: usize },
    LayoutPrepareRequest { file_id: FileId },
    LayoutAlreadyPlaying { file_id: FileId },
    LayoutPending { file_id: FileId, missing: HashSet<FileId> },
    LayoutReady { file_id: FileId },
    LayoutCleared,
    LayoutCurrent { file_id: FileId },
    NoLayoutsScheduled,
    XmrConnected,
    XmrReconnected { attempt: u32 },
    FileReady { file_id: FileId, kind: FileKind },
    CheckPendingLayout { file_id: FileId, missing: HashSet<FileId> },
    SubmitStatsRequest,
    CollectionError { message: String },
    CollectionComplete,
    StatusNotified { file_id: FileId },
    StatusNotifyFailed { file_id: FileId, error: String },
    CollectionIntervalSet { seconds: u64 },
    CollectionIntervalUpdated { seconds: u64 },
    LogLevelChanged { level: String },
    CleanupComplete,
}

/// Fan-out sink for [`Event`]s. `tokio::sync::mpsc` gives the Orchestrator
/// a non-blocking `send` regardless of whether anything is listening.
pub type EventSender = tokio::sync::mpsc::UnboundedSender<Event>;
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<Event>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
