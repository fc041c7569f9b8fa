//! Development reload module
//!
//! Watches the build output for changes to the server bundle or the HTML
//! template and swaps a freshly loaded rendering runtime into the shared
//! state. Production mode never starts this watcher; it loads the
//! artifacts once at startup instead.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::AppState;
use crate::logger;
use crate::render::SsrRuntime;

/// Builds touch several files in quick succession; coalesce them
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Retry interval while a watched directory does not exist yet
const WATCH_RETRY: Duration = Duration::from_millis(500);

/// Start the artifact watcher task
pub fn spawn(state: Arc<AppState>) {
    tokio::spawn(async move {
        watch_artifacts(state).await;
    });
}

async fn watch_artifacts(state: Arc<AppState>) {
    // Pick up artifacts from a previous build before any change event
    match SsrRuntime::load(&state.config.assets).await {
        Ok(runtime) => {
            state.install_runtime(runtime).await;
            logger::log_reload_installed();
        }
        Err(_) => logger::log_waiting_for_build(),
    }

    let artifacts = [
        state.config.assets.bundle.clone(),
        state.config.assets.template.clone(),
    ];

    let (tx, mut rx) = mpsc::channel::<Result<Event, notify::Error>>(64);
    let mut watcher: RecommendedWatcher = match notify::recommended_watcher(move |res| {
        // Runs on the watcher's own thread
        let _ = tx.blocking_send(res);
    }) {
        Ok(w) => w,
        Err(e) => {
            logger::log_error(&format!("Failed to create file watcher: {e}"));
            return;
        }
    };

    let mut pending = watch_dirs(&artifacts);
    register_present(&mut watcher, &mut pending);

    loop {
        let res = if pending.is_empty() {
            rx.recv().await
        } else {
            // Keep retrying absent directories without stalling the
            // event stream from the ones already registered
            tokio::select! {
                res = rx.recv() => res,
                () = tokio::time::sleep(WATCH_RETRY) => {
                    register_present(&mut watcher, &mut pending);
                    continue;
                }
            }
        };

        let Some(res) = res else { return };
        match res {
            Ok(event) if touches_artifacts(&event, &artifacts) => {
                tokio::time::sleep(DEBOUNCE).await;
                while rx.try_recv().is_ok() {}

                match SsrRuntime::load(&state.config.assets).await {
                    Ok(runtime) => {
                        state.install_runtime(runtime).await;
                        logger::log_reload_installed();
                    }
                    Err(e) => logger::log_reload_failed(&e.to_string()),
                }
            }
            Ok(_) => {}
            Err(e) => logger::log_warning(&format!("File watcher error: {e}")),
        }
    }
}

/// Unique parent directories of the watched artifacts
fn watch_dirs(artifacts: &[PathBuf]) -> BTreeSet<PathBuf> {
    artifacts
        .iter()
        .filter_map(|p| p.parent())
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .collect()
}

/// Register every pending directory that exists, keeping the rest pending.
///
/// In a fresh checkout the build output directory is created by the first
/// bundler run, which may happen after the server starts, so absent
/// directories stay in the set for a later retry.
fn register_present(watcher: &mut RecommendedWatcher, pending: &mut BTreeSet<PathBuf>) {
    pending.retain(|dir| {
        if !dir.is_dir() {
            return true;
        }
        match watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => false,
            Err(e) => {
                logger::log_warning(&format!("Failed to watch {}: {e}", dir.display()));
                true
            }
        }
    });
}

/// Whether a filesystem event involves one of the watched artifacts
fn touches_artifacts(event: &Event, artifacts: &[PathBuf]) -> bool {
    event.paths.iter().any(|p| {
        p.file_name()
            .is_some_and(|name| artifacts.iter().any(|a| a.file_name() == Some(name)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;

    #[test]
    fn test_watch_dirs_deduplicates_parents() {
        let artifacts = [
            PathBuf::from("dist/server-bundle.js"),
            PathBuf::from("dist/index.html"),
        ];
        let dirs = watch_dirs(&artifacts);
        assert_eq!(dirs.len(), 1);
        assert!(dirs.contains(Path::new("dist")));
    }

    #[test]
    fn test_register_present_keeps_absent_dirs_pending() {
        let present = std::env::temp_dir().join("renderd-test-watch-present");
        std::fs::create_dir_all(&present).unwrap();
        let absent = std::env::temp_dir().join("renderd-test-watch-absent/missing");

        let mut watcher = notify::recommended_watcher(|_res| {}).unwrap();
        let mut pending: BTreeSet<PathBuf> = [present, absent.clone()].into_iter().collect();

        // The absent directory must not block registration of the present one
        register_present(&mut watcher, &mut pending);
        assert_eq!(pending.len(), 1);
        assert!(pending.contains(&absent));
    }

    #[test]
    fn test_touches_artifacts_matches_by_file_name() {
        let artifacts = [
            PathBuf::from("dist/server-bundle.js"),
            PathBuf::from("dist/index.html"),
        ];

        let hit = Event::new(EventKind::Any).add_path(PathBuf::from("/abs/dist/index.html"));
        assert!(touches_artifacts(&hit, &artifacts));

        let miss = Event::new(EventKind::Any).add_path(PathBuf::from("/abs/dist/client.js"));
        assert!(!touches_artifacts(&miss, &artifacts));

        let empty = Event::new(EventKind::Any);
        assert!(!touches_artifacts(&empty, &artifacts));
    }
}
