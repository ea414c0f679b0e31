use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;
use crate::draft::ShipmentDraft;
use crate::store::{DraftStore, StorageKey};

/// Debounced background writer for the shipment draft.
///
/// Every pushed draft replaces the pending one; the draft is written once no new draft has
/// arrived for the quiet period. Dropping the saver or calling [`DraftAutosaver::shutdown`]
/// flushes whatever is still pending, even while [`AutosaveHandle`]s are alive.
pub struct DraftAutosaver {
    handle: AutosaveHandle,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Queues drafts on a running [`DraftAutosaver`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AutosaveHandle {
    sender: mpsc::UnboundedSender<ShipmentDraft>,
}

impl AutosaveHandle {
    pub fn push(&self, draft: ShipmentDraft) {
        if self.sender.send(draft).is_err() {
            warn!("draft autosave task is gone, dropping draft");
        }
    }
}

impl PartialEq for AutosaveHandle {
    fn eq(&self, other: &Self) -> bool {
        self.sender.same_channel(&other.sender)
    }
}

impl DraftAutosaver {
    pub fn spawn(store: DraftStore, quiet_period: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(run(store, quiet_period, receiver, stopped));
        Self {
            handle: AutosaveHandle { sender },
            stop,
            task,
        }
    }

    /// Uses `AUTOSAVE_DEBOUNCE_MS` as the quiet period.
    pub fn from_config(store: DraftStore, config: &Config) -> Self {
        Self::spawn(store, config.autosave_debounce)
    }

    pub fn handle(&self) -> AutosaveHandle {
        self.handle.clone()
    }

    pub fn push(&self, draft: ShipmentDraft) {
        self.handle.push(draft);
    }

    /// Flushes the pending draft and waits for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(err) = self.task.await {
            warn!(error = %err, "draft autosave task failed");
        }
    }
}

async fn run(
    store: DraftStore,
    quiet_period: Duration,
    mut receiver: mpsc::UnboundedReceiver<ShipmentDraft>,
    mut stopped: oneshot::Receiver<()>,
) {
    let mut pending: Option<ShipmentDraft> = None;

    loop {
        let next = if pending.is_some() {
            tokio::select! {
                next = receiver.recv() => next,
                _ = &mut stopped => break,
                _ = tokio::time::sleep(quiet_period) => {
                    if let Some(draft) = pending.take() {
                        save(&store, &draft);
                    }
                    continue;
                }
            }
        } else {
            tokio::select! {
                next = receiver.recv() => next,
                _ = &mut stopped => break,
            }
        };

        match next {
            Some(draft) => pending = Some(draft),
            None => break,
        }
    }

    // drafts pushed right before the stop signal still count
    while let Ok(draft) = receiver.try_recv() {
        pending = Some(draft);
    }

    if let Some(draft) = pending {
        save(&store, &draft);
    }
}

fn save(store: &DraftStore, draft: &ShipmentDraft) {
    match store.set(StorageKey::ShipmentDraft, draft) {
        Ok(()) => debug!(items = draft.items.len(), "draft autosaved"),
        Err(err) => warn!(error = %err, "draft autosave failed"),
    }
}
