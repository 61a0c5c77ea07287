//! Background persistence of completed exchanges.
//!
//! Saving a dialog after a successful generation is best effort: the session
//! pushes the record onto a channel and moves on. A worker task drains the
//! channel into a [`DialogStore`] and only logs failures.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{DialogRecord, DialogStore};

#[derive(Clone)]
pub struct AutosaveQueue {
    tx: mpsc::UnboundedSender<DialogRecord>,
}

impl AutosaveQueue {
    /// Starts the worker on the current tokio runtime.
    ///
    /// The worker exits once every clone of the returned queue is dropped and
    /// the channel is drained.
    pub fn spawn(store: Arc<dyn DialogStore>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<DialogRecord>();

        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                match store.save_dialog(&record).await {
                    Ok(()) => tracing::debug!(title = %record.title, "dialog saved"),
                    Err(e) => tracing::warn!(title = %record.title, error = %e, "failed to save dialog"),
                }
            }
            tracing::debug!("autosave worker stopped");
        });

        (Self { tx }, handle)
    }

    /// Queues a record for saving. Never blocks and never fails.
    pub fn enqueue(&self, record: DialogRecord) {
        if let Err(e) = self.tx.send(record) {
            tracing::warn!(title = %e.0.title, "autosave worker is gone, dialog not saved");
        }
    }
}
