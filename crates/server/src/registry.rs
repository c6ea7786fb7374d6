//! Session registry
//!
//! Maps a Claude session id to the Slack thread it posts into and the tmux
//! pane replies should be typed into. The map lives behind a single `RwLock`
//! owned here; nothing else touches it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionEntry {
    thread_anchor: String,
    terminal_target: String,
    /// Reset on every `set`; used only for eviction aging.
    created_at: Instant,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Thread anchor for a session, if one has been recorded.
    pub fn get(&self, session_id: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(session_id)
            .map(|entry| entry.thread_anchor.clone())
            .filter(|anchor| !anchor.is_empty())
    }

    /// Upsert. Replaces any existing entry and restarts its aging clock.
    pub fn set(&self, session_id: &str, thread_anchor: &str, terminal_target: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            session_id.to_string(),
            SessionEntry {
                thread_anchor: thread_anchor.to_string(),
                terminal_target: terminal_target.to_string(),
                created_at: Instant::now(),
            },
        );
    }

    /// Reverse lookup by thread anchor. `Some("")` means the thread is known
    /// but has no terminal target.
    pub fn get_by_thread_anchor(&self, thread_anchor: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .values()
            .find(|entry| entry.thread_anchor == thread_anchor)
            .map(|entry| entry.terminal_target.clone())
    }

    /// Remove every entry whose clock is strictly older than `max_age`.
    /// Returns the number of entries removed.
    pub fn evict_older_than(&self, max_age: Duration) -> usize {
        self.evict_older_than_at(max_age, Instant::now())
    }

    fn evict_older_than_at(&self, max_age: Duration, now: Instant) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.created_at) <= max_age);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Spawn the periodic eviction sweep. The first sweep runs one `interval`
/// after start; the task exits when `shutdown` flips to `true`.
pub fn spawn_sweeper(
    registry: Arc<SessionRegistry>,
    interval: Duration,
    max_age: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        info!(
            component = "registry",
            event = "registry.sweeper_started",
            interval_secs = interval.as_secs(),
            max_age_secs = max_age.as_secs(),
            "Session sweeper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = registry.evict_older_than(max_age);
                    debug!(
                        component = "registry",
                        event = "registry.swept",
                        removed,
                        remaining = registry.len(),
                        "Session sweep complete"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            component = "registry",
            event = "registry.sweeper_stopped",
            "Session sweeper stopped"
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn entry(registry: &SessionRegistry, session_id: &str) -> SessionEntry {
        registry.entries.read().unwrap()[session_id].clone()
    }

    #[test]
    fn get_returns_none_for_unknown_session() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.get("unknown"), None);
    }

    #[test]
    fn set_then_get() {
        let registry = SessionRegistry::new();
        registry.set("sess-1", "123.456", "");
        assert_eq!(registry.get("sess-1").as_deref(), Some("123.456"));
    }

    #[test]
    fn set_overwrites_existing_entry() {
        let registry = SessionRegistry::new();
        registry.set("sess-1", "111.111", "%1");
        registry.set("sess-1", "222.222", "%2");
        assert_eq!(registry.get("sess-1").as_deref(), Some("222.222"));
        assert_eq!(
            registry.get_by_thread_anchor("222.222").as_deref(),
            Some("%2")
        );
        assert_eq!(registry.get_by_thread_anchor("111.111"), None);
    }

    #[test]
    fn sessions_are_independent() {
        let registry = SessionRegistry::new();
        registry.set("sess-1", "111.111", "");
        registry.set("sess-2", "222.222", "");
        assert_eq!(registry.get("sess-1").as_deref(), Some("111.111"));
        assert_eq!(registry.get("sess-2").as_deref(), Some("222.222"));
    }

    #[test]
    fn reverse_lookup_distinguishes_unknown_and_empty_target() {
        let registry = SessionRegistry::new();
        registry.set("sess-1", "111.111", "");
        registry.set("sess-2", "222.222", "main:0.1");

        assert_eq!(registry.get_by_thread_anchor("111.111").as_deref(), Some(""));
        assert_eq!(
            registry.get_by_thread_anchor("222.222").as_deref(),
            Some("main:0.1")
        );
        assert_eq!(registry.get_by_thread_anchor("999.999"), None);
    }

    #[test]
    fn evict_removes_only_strictly_older_entries() {
        let registry = SessionRegistry::new();
        registry.set("old", "111.111", "%1");
        registry.set("new", "222.222", "%2");

        let now = entry(&registry, "old").created_at + 2 * DAY;
        registry
            .entries
            .write()
            .unwrap()
            .get_mut("new")
            .unwrap()
            .created_at = now - Duration::from_secs(60 * 60);
        let new_before = entry(&registry, "new");

        let removed = registry.evict_older_than_at(DAY, now);

        assert_eq!(removed, 1);
        assert_eq!(registry.get("old"), None);
        assert_eq!(entry(&registry, "new"), new_before);
    }

    #[test]
    fn evict_keeps_entry_exactly_at_cutoff() {
        let registry = SessionRegistry::new();
        registry.set("edge", "111.111", "");
        let now = entry(&registry, "edge").created_at + DAY;

        assert_eq!(registry.evict_older_than_at(DAY, now), 0);
        assert_eq!(registry.get("edge").as_deref(), Some("111.111"));
    }

    #[test]
    fn evict_does_nothing_when_all_entries_are_recent() {
        let registry = SessionRegistry::new();
        registry.set("a", "111.111", "");
        registry.set("b", "222.222", "");

        assert_eq!(registry.evict_older_than(DAY), 0);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn concurrent_access_is_safe() {
        let registry = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..100)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let id = format!("sess-{}", i % 26);
                    registry.set(&id, &format!("ts-{id}"), "");
                    registry.get(&id);
                    registry.get_by_thread_anchor(&format!("ts-{id}"));
                    registry.evict_older_than(DAY);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 26);
    }

    #[tokio::test]
    async fn sweeper_stops_on_shutdown() {
        let registry = Arc::new(SessionRegistry::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn_sweeper(
            Arc::clone(&registry),
            Duration::from_secs(3600),
            DAY,
            shutdown_rx,
        );

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper should exit")
            .unwrap();
    }
}
