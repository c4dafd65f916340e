use std::path::Path;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches one collection file and calls back whenever it changes on disk.
///
/// The callback runs on the watcher's thread. Dropping the watcher stops
/// the callbacks.
pub struct CollectionWatcher {
    _watcher: RecommendedWatcher,
}

impl CollectionWatcher {
    /// Start watching `store_dir` for changes to `file_name`.
    pub fn start<F>(store_dir: &Path, file_name: &str, on_change: F) -> Result<Self, notify::Error>
    where
        F: Fn() + Send + 'static,
    {
        let target = store_dir.join(file_name);
        let target_name = file_name.to_string();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::debug!(error = %e, "watch error");
                        return;
                    }
                };

                // Atomic writes land as create/rename on the target path
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }

                let relevant = event.paths.iter().any(|p| {
                    p == &target
                        || p.file_name().and_then(|n| n.to_str()) == Some(target_name.as_str())
                });
                if relevant {
                    on_change();
                }
            },
            Config::default(),
        )?;

        watcher.watch(store_dir, RecursiveMode::NonRecursive)?;
        Ok(CollectionWatcher { _watcher: watcher })
    }
}
