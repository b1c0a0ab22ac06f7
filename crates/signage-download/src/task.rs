//! `DownloadTask` state machine (§4.3): `Pending -> Downloading -> {Complete, Failed}`.

use crate::error::Error;
use signage_model::FileId;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub enum TaskStatus {
    Pending,
    Downloading { received_bytes: u64, total_bytes: u64 },
    Complete,
    Failed(Arc<Error>),
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed(_))
    }
}

/// Sink a running fetch uses to publish `progress(received, total)` and the
/// terminal outcome. Cloning is cheap; every clone shares the same
/// broadcast channel.
#[derive(Clone)]
pub struct ProgressSink {
    tx: watch::Sender<TaskStatus>,
}

impl ProgressSink {
    pub fn report(&self, received_bytes: u64, total_bytes: u64) {
        let _ = self.tx.send(TaskStatus::Downloading {
            received_bytes,
            total_bytes,
        });
    }

    pub(crate) fn complete(&self) {
        let _ = self.tx.send(TaskStatus::Complete);
    }

    pub(crate) fn fail(&self, err: Error) {
        let _ = self.tx.send(TaskStatus::Failed(Arc::new(err)));
    }
}

/// A handle any number of callers may hold for the same task. All handles
/// for a task observe the same terminal transition simultaneously (they
/// share one `watch` channel).
#[derive(Clone)]
pub struct TaskHandle {
    file_id: FileId,
    rx: watch::Receiver<TaskStatus>,
}

impl TaskHandle {
    pub(crate) fn new(file_id: FileId) -> (Self, ProgressSink) {
        let (tx, rx) = watch::channel(TaskStatus::Pending);
        (Self { file_id, rx }, ProgressSink { tx })
    }

    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }

    pub fn status(&self) -> TaskStatus {
        self.rx.borrow().clone()
    }

    /// Waits for the task to reach `Complete` or `Failed`, returning the
    /// outcome. Any number of callers may await the same handle.
    pub async fn wait(&self) -> Result<(), Arc<Error>> {
        let mut rx = self.rx.clone();
        loop {
            {
                let status = rx.borrow();
                match &*status {
                    TaskStatus::Complete => return Ok(()),
                    TaskStatus::Failed(err) => return Err(err.clone()),
                    _ => {}
                }
            }
            if rx.changed().await.is_err() {
                return Err(Arc::new(Error::PreconditionViolation(
                    "download task dropped before reaching a terminal state".into(),
                )));
            }
        }
    }
}
