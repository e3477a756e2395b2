//! Configuration file watcher for hot reload.
//!
//! Editors often emit several events per save; a reload is only forwarded
//! when the validated configuration actually differs from the last one sent.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::DiscoveryConfig;

/// Watches one configuration file and forwards validated reloads.
pub struct ConfigWatcher {
    path: PathBuf,
    current: DiscoveryConfig,
    update_tx: mpsc::UnboundedSender<DiscoveryConfig>,
}

impl ConfigWatcher {
    /// `current` is the configuration already in effect.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(
        path: &Path,
        current: DiscoveryConfig,
    ) -> (Self, mpsc::UnboundedReceiver<DiscoveryConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                current,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Updates stop when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut current,
            update_tx,
        } = self;
        let reload_path = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }

                match load_config(&reload_path) {
                    Ok(new_config) if new_config == current => {
                        tracing::debug!("Config file touched without changes");
                    }
                    Ok(new_config) => {
                        tracing::info!(path = ?reload_path, "Configuration reloaded");
                        current = new_config.clone();
                        let _ = update_tx.send(new_config);
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "Failed to reload config, keeping current configuration"
                        );
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}
