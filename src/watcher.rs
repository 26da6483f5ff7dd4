//! Cross-context sync listener
//!
//! Watches the store's slot file for writes made by other processes (or other
//! store instances) and re-hydrates the in-memory state from it. Writes made
//! by the watching store itself are recognized by fingerprint and skipped.

use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::error::StoreError;
use crate::store::OrgStore;

/// Running listener. Dropping it stops the watcher and ends the task.
pub struct SyncListener {
    watcher: Option<RecommendedWatcher>,
    task: JoinHandle<()>,
}

impl SyncListener {
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.watcher = None;
        self.task.abort();
    }

    /// True while the file watcher is held and the reload task is alive.
    pub fn is_running(&self) -> bool {
        self.watcher.is_some() && !self.task.is_finished()
    }
}

/// Start listening for slot changes made outside this store.
///
/// Must be called from within a tokio runtime. Spawns a task that:
/// 1. Watches the slot file's directory for create/modify/remove events
/// 2. Keeps only events touching the slot file
/// 3. Debounces bursts (atomic replace emits several events)
/// 4. Hands the slot key to [`OrgStore::on_storage_event`]
pub fn start_sync_listener(
    store: Arc<OrgStore>,
    debounce: Duration,
) -> Result<SyncListener, StoreError> {
    let slot = store.slot();
    let key = slot.key().to_string();
    let path = slot
        .path()
        .ok_or_else(|| StoreError::Config(format!("slot '{}' is not file-backed", key)))?
        .to_path_buf();

    let dir = path
        .parent()
        .ok_or_else(|| StoreError::Config(format!("{} has no parent", path.display())))?
        .to_path_buf();
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }

    let file_name = path.file_name().map(|n| n.to_os_string());

    // Channel for forwarding notify events to the async debouncer
    let (fs_tx, mut fs_rx) = mpsc::channel::<()>(64);

    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| match result {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                let touches_slot = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if touches_slot {
                    let _ = fs_tx.try_send(());
                }
            }
            Err(e) => log::warn!("Watcher: event error: {}", e),
        },
        notify::Config::default(),
    )?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    log::info!("Watcher: watching {} for slot '{}'", path.display(), key);

    let task = tokio::spawn(async move {
        loop {
            if fs_rx.recv().await.is_none() {
                break; // Channel closed, watcher dropped
            }

            // Debounce: drain any events that arrive within the window
            sleep(debounce).await;
            while fs_rx.try_recv().is_ok() {}

            if store.on_storage_event(&key) {
                log::debug!("Watcher: applied external change to '{}'", key);
            }
        }

        log::info!("Watcher: stopped");
    });

    Ok(SyncListener {
        watcher: Some(watcher),
        task,
    })
}
