//! Write-behind persistence
//!
//! Mutations happen in the registry first; the persister then writes a fresh
//! snapshot to the store on a background task. Store failures are logged and
//! never roll back in-memory state.

use std::sync::Arc;

use reactrole_store::BindingStore;
use reactrole_types::BindingId;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::registry::BindingRegistry;

enum PersistCommand {
    Upsert(BindingId),
    Remove(BindingId),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background persistence task
#[derive(Clone)]
pub struct Persister {
    tx: mpsc::UnboundedSender<PersistCommand>,
}

impl Persister {
    /// Spawn the persistence task. Must be called within a Tokio runtime.
    pub fn spawn(
        store: Arc<dyn BindingStore>,
        registry: Arc<BindingRegistry>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(store, registry, rx));
        (Self { tx }, handle)
    }

    /// Queue a write of the binding's current registry snapshot.
    pub fn schedule(&self, id: &BindingId) {
        self.send(PersistCommand::Upsert(id.clone()));
    }

    /// Queue removal of the binding from the store.
    pub fn schedule_removal(&self, id: &BindingId) {
        self.send(PersistCommand::Remove(id.clone()));
    }

    /// Wait until every previously queued write has been attempted.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        self.send(PersistCommand::Flush(ack));
        let _ = done.await;
    }

    fn send(&self, command: PersistCommand) {
        if self.tx.send(command).is_err() {
            warn!("Persistence task stopped; dropping write");
        }
    }
}

async fn run(
    store: Arc<dyn BindingStore>,
    registry: Arc<BindingRegistry>,
    mut rx: mpsc::UnboundedReceiver<PersistCommand>,
) {
    info!(store = store.name(), "Persistence task started");

    while let Some(command) = rx.recv().await {
        match command {
            PersistCommand::Upsert(id) => {
                let Some(binding) = registry.get(&id) else {
                    debug!(binding = %id, "Binding gone before write, skipping");
                    continue;
                };
                if let Err(e) = store.upsert(&binding).await {
                    warn!(binding = %id, error = %e, "Failed to persist binding");
                }
            }
            PersistCommand::Remove(id) => {
                if let Err(e) = store.remove(&id).await {
                    warn!(binding = %id, error = %e, "Failed to remove binding from store");
                }
            }
            PersistCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }

    info!("Persistence task stopped");
}
