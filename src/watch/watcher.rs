// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::config::loader::load_and_validate;
use crate::document::Document;

/// Handle for the config-file watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch the config file and route its `[document]` section into `document`.
///
/// The directory containing the file is watched (not the file itself) so
/// editors that save by rename are picked up too. The document is owned by
/// the watcher task from here on.
pub fn spawn_document_watcher(
    config_path: impl AsRef<Path>,
    mut document: Document,
) -> Result<WatcherHandle> {
    let config_path = config_path.as_ref();
    let config_path = config_path
        .canonicalize()
        .with_context(|| format!("resolving config path {}", config_path.display()))?;
    let dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = config_path.file_name().map(|n| n.to_os_string());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // We can't log via tracing here easily, so fallback to stderr.
                    eprintln!("barliman: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("barliman: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    info!("watching {:?} for document edits", config_path);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            let touches_config = event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
            if !touches_config {
                continue;
            }

            debug!(?event, "config file event");
            reload_document(&config_path, &mut document);
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Re-read the config file and apply its `[document]` section.
///
/// Returns how many document fields changed. A config that fails to load or
/// validate (often a half-written save) is logged and skipped.
pub fn reload_document(config_path: &Path, document: &mut Document) -> usize {
    let cfg = match load_and_validate(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "ignoring unreadable config edit");
            return 0;
        }
    };

    let changed = document.apply(&cfg.document.to_snapshot());
    if changed > 0 {
        info!(fields = changed, "document updated from config file");
    } else {
        debug!("config file changed but document is unchanged");
    }
    changed
}
