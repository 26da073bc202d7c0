//! Manifest watching
//!
//! Project definitions are only rebuilt on demand. This watcher turns file
//! system events on `elm.json` / `elm-package.json` into
//! [`ProjectResolver::refresh`](crate::project::resolver::ProjectResolver::refresh)
//! calls. Bursts of events (editors often write a file several times) are
//! collapsed into one refresh.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::state::ElmBackend;
use crate::project::manifest::{ELM_JSON, LEGACY_ELM_PACKAGE_JSON};

const DEBOUNCE: Duration = Duration::from_millis(200);

pub(super) fn is_manifest(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|n| n.to_str()),
        Some(ELM_JSON) | Some(LEGACY_ELM_PACKAGE_JSON)
    )
}

fn touches_manifest(event: &notify::Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| is_manifest(p))
}

impl ElmBackend {
    /// Starts watching `roots` for manifest changes. Replaces any previous watcher.
    pub(super) fn spawn_manifest_watcher(&self, roots: &[PathBuf]) {
        let (tx, rx) = mpsc::unbounded_channel::<notify::Result<notify::Event>>();
        let mut watcher = match RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            notify::Config::default(),
        ) {
            Ok(watcher) => watcher,
            Err(e) => {
                warn!("Failed to create manifest watcher: {}", e);
                return;
            }
        };

        for root in roots {
            if let Err(e) = watcher.watch(root, RecursiveMode::Recursive) {
                warn!("Failed to watch {:?}: {}", root, e);
            }
        }

        match self.manifest_watcher.lock() {
            Ok(mut slot) => *slot = Some(watcher),
            Err(_) => {
                warn!("Manifest watcher slot poisoned; not watching");
                return;
            }
        }

        let backend = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let events = futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|event| (event, rx))
            });

            let mut manifest_events = Box::pin(
                events
                    .filter_map(|res| async move {
                        match res {
                            Ok(event) => touches_manifest(&event).then_some(event),
                            Err(e) => {
                                warn!("Manifest watcher error: {}", e);
                                None
                            }
                        }
                    })
                    .take_until(async move {
                        let _ = shutdown_rx.recv().await;
                        info!("Manifest watcher received shutdown signal");
                    }),
            );

            while let Some(event) = manifest_events.next().await {
                debug!("Manifest change: {:?}", event.paths);

                // Swallow the rest of the burst before reloading.
                while let Ok(Some(more)) = tokio::time::timeout(DEBOUNCE, manifest_events.next()).await {
                    debug!("Manifest change: {:?}", more.paths);
                }

                backend.reload_projects().await;
            }

            info!("Manifest watcher task terminated");
        });
    }
}
