// src/watcher/debounce.rs
// Per-path debounce scheduler: successive events for the same path
// overwrite the prior within a fixed window; at window expiry the final
// event is dispatched to the handler exactly once (§4.6, §8 invariant 8).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use super::ChangeHandler;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Moved { from: PathBuf },
}

struct PendingEntry {
    generation: u64,
    kind: ChangeKind,
}

pub struct Debouncer {
    window: Duration,
    handler: Arc<dyn ChangeHandler>,
    pending: Arc<Mutex<HashMap<PathBuf, PendingEntry>>>,
}

impl Debouncer {
    pub fn new(window: Duration, handler: Arc<dyn ChangeHandler>) -> Self {
        Self { window, handler, pending: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Records an event for `path`, overwriting any event already pending
    /// within the window, and (re)schedules the dispatch. Each call bumps
    /// a per-path generation counter; only the task holding the latest
    /// generation at wake-up actually dispatches.
    pub async fn record(&self, path: PathBuf, kind: ChangeKind) {
        let generation = {
            let mut pending = self.pending.lock().await;
            let generation = pending.get(&path).map(|e| e.generation + 1).unwrap_or(1);
            pending.insert(path.clone(), PendingEntry { generation, kind });
            generation
        };

        let window = self.window;
        let handler = self.handler.clone();
        let pending_map = self.pending.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let final_kind = {
                let mut pending = pending_map.lock().await;
                match pending.get(&path) {
                    Some(entry) if entry.generation == generation => pending.remove(&path).map(|e| e.kind),
                    _ => None,
                }
            };
            if let Some(kind) = final_kind {
                debug!(path = %path.display(), ?kind, "dispatching debounced change");
                handler.handle(&path, kind).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        count: Arc<AtomicUsize>,
        last_kind: Mutex<Option<ChangeKind>>,
    }

    #[async_trait::async_trait]
    impl ChangeHandler for CountingHandler {
        async fn handle(&self, _path: &Path, kind: ChangeKind) {
            self.count.fetch_add(1, Ordering::SeqCst);
            *self.last_kind.lock().await = Some(kind);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn s5_five_modifies_dispatch_exactly_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(CountingHandler { count: count.clone(), last_kind: Mutex::new(None) });
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(500), handler));

        let path = PathBuf::from("x.py");
        for _ in 0..5 {
            debouncer.record(path.clone(), ChangeKind::Modified).await;
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        tokio::time::advance(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
