use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chain::reconciler::ChainReconciler;

/// Fire-and-forget hand-off from the request path to the reconciler: handlers
/// push an entry id and return immediately, the worker owns the chain
/// latency. Anything lost here is picked up by the scheduled batch job.
#[derive(Clone)]
pub struct SyncQueue {
    tx: mpsc::UnboundedSender<i64>,
}

impl SyncQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<i64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, entry_id: i64) {
        if self.tx.send(entry_id).is_err() {
            tracing::warn!(
                "Sync queue is closed; entry {} will wait for the batch job",
                entry_id
            );
        }
    }
}

pub fn spawn_worker(
    mut rx: mpsc::UnboundedReceiver<i64>,
    reconciler: Arc<ChainReconciler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Chain sync worker started");
        while let Some(entry_id) = rx.recv().await {
            if let Err(e) = reconciler.sync_entry(entry_id).await {
                tracing::error!("Chain sync for entry {} failed: {}", entry_id, e);
            }
        }
        tracing::info!("Chain sync worker stopped");
    })
}
