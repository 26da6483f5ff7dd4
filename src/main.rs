//! Headless host for the reference-data store.
//!
//! Opens the store from ~/.orgref/config.json, prints what it holds, then
//! follows local and cross-process changes until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use orgref_lib::{load_config, start_sync_listener, OrgStore, StoreEvent};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load config: {} ({})", e, e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    let store = match OrgStore::open(&config) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("Failed to open store: {} ({})", e, e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    print_summary(&store);

    let _listener = match start_sync_listener(
        store.clone(),
        Duration::from_millis(config.watch_debounce_ms),
    ) {
        Ok(listener) => Some(listener),
        Err(e) => {
            log::warn!("Sync listener unavailable: {} ({})", e, e.recovery_suggestion());
            None
        }
    };

    let mut events = store.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(StoreEvent::Reloaded) => {
                    log::info!("Reloaded from another context");
                    print_summary(&store);
                }
                Ok(StoreEvent::Updated(collection)) => {
                    log::info!("{} updated", collection);
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Missed {} change event(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

fn print_summary(store: &OrgStore) {
    let status = store.status();
    println!("slot: {}", status.slot_key);
    for count in &status.counts {
        println!(
            "  {:<18} {:>4} active / {:>4} total",
            count.collection.to_string(),
            count.active,
            count.total
        );
    }
}
