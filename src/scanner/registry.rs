//! Process-wide registry of per-chat session tasks and scan state.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::opportunity::Opportunity;

/// Cancellable handle to a running session task.
#[derive(Debug)]
pub struct SessionHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl SessionHandle {
    fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }

    fn cancel(&self) {
        self.token.cancel();
    }
}

/// Last scan results for one chat, read by the status façade.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    /// Opportunities found by the most recent iteration.
    pub last_found: Vec<Opportunity>,
    /// Whether a scan session is live for this chat.
    pub scanning: bool,
}

/// Registry of live sessions, keyed by chat id.
///
/// Enforces at most one scan session and one monitor session per chat.
/// Finished handles left behind by naturally-ending tasks are reaped on the
/// next start.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    scans: DashMap<i64, SessionHandle>,
    monitors: DashMap<i64, SessionHandle>,
    scan_states: DashMap<i64, ScanState>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a scan session unless one is already live. Returns whether a
    /// new session was started; starting twice is a no-op.
    pub fn start_scan<F>(&self, chat_id: i64, spawn: F) -> bool
    where
        F: FnOnce(CancellationToken) -> JoinHandle<()>,
    {
        let started = self.start_in(&self.scans, chat_id, spawn);
        if started {
            self.scan_states.entry(chat_id).or_default().scanning = true;
            info!(chat_id, "Scan session started");
        } else {
            debug!(chat_id, "Scan session already running");
        }
        started
    }

    /// Stop the scan session for a chat. A missing session is a no-op.
    pub fn stop_scan(&self, chat_id: i64) -> bool {
        if let Some(entry) = self.scan_states.get_mut(&chat_id).as_deref_mut() {
            entry.scanning = false;
        }
        let stopped = self.stop_in(&self.scans, chat_id);
        if stopped {
            info!(chat_id, "Scan session stopped");
        }
        stopped
    }

    /// Start a monitor session unless one is already live.
    pub fn start_monitor<F>(&self, chat_id: i64, spawn: F) -> bool
    where
        F: FnOnce(CancellationToken) -> JoinHandle<()>,
    {
        let started = self.start_in(&self.monitors, chat_id, spawn);
        if started {
            info!(chat_id, "Monitor session started");
        }
        started
    }

    /// Stop the monitor session for a chat. A missing session is a no-op.
    pub fn stop_monitor(&self, chat_id: i64) -> bool {
        self.stop_in(&self.monitors, chat_id)
    }

    /// Whether a scan session is live for a chat.
    pub fn is_scanning(&self, chat_id: i64) -> bool {
        self.scans
            .get(&chat_id)
            .map(|h| h.is_live())
            .unwrap_or(false)
    }

    /// Whether a monitor session is live for a chat.
    pub fn is_monitoring(&self, chat_id: i64) -> bool {
        self.monitors
            .get(&chat_id)
            .map(|h| h.is_live())
            .unwrap_or(false)
    }

    /// Snapshot of the scan state for a chat.
    pub fn scan_state(&self, chat_id: i64) -> ScanState {
        self.scan_states
            .get(&chat_id)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Replace the last-found list for a chat. Called only by the owning
    /// scan session.
    pub fn set_last_found(&self, chat_id: i64, opportunities: Vec<Opportunity>) {
        let mut state = self.scan_states.entry(chat_id).or_default();
        state.last_found = opportunities;
    }

    /// Cancel every live session. Used on shutdown.
    pub fn stop_all(&self) {
        for entry in self.scans.iter() {
            entry.value().cancel();
        }
        self.scans.clear();
        for entry in self.monitors.iter() {
            entry.value().cancel();
        }
        self.monitors.clear();
        for mut state in self.scan_states.iter_mut() {
            state.scanning = false;
        }
    }

    fn start_in<F>(&self, map: &DashMap<i64, SessionHandle>, chat_id: i64, spawn: F) -> bool
    where
        F: FnOnce(CancellationToken) -> JoinHandle<()>,
    {
        match map.entry(chat_id) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live() {
                    return false;
                }
                // Previous task ended on its own; reap and replace.
                let token = CancellationToken::new();
                let handle = spawn(token.clone());
                occupied.insert(SessionHandle { token, handle });
                true
            }
            Entry::Vacant(vacant) => {
                let token = CancellationToken::new();
                let handle = spawn(token.clone());
                vacant.insert(SessionHandle { token, handle });
                true
            }
        }
    }

    fn stop_in(&self, map: &DashMap<i64, SessionHandle>, chat_id: i64) -> bool {
        match map.remove(&chat_id) {
            Some((_, handle)) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn idle_task(token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            token.cancelled().await;
        })
    }

    #[tokio::test]
    async fn start_scan_is_idempotent() {
        let registry = SessionRegistry::new();
        let spawned = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let spawned = spawned.clone();
            registry.start_scan(1, move |token| {
                spawned.fetch_add(1, Ordering::SeqCst);
                idle_task(token)
            });
        }

        assert_eq!(spawned.load(Ordering::SeqCst), 1);
        assert!(registry.is_scanning(1));
    }

    #[tokio::test]
    async fn stop_without_session_is_a_noop() {
        let registry = SessionRegistry::new();
        assert!(!registry.stop_scan(99));
        assert!(!registry.stop_monitor(99));
    }

    #[tokio::test]
    async fn stop_cancels_the_task() {
        let registry = SessionRegistry::new();
        registry.start_scan(1, idle_task);
        assert!(registry.is_scanning(1));

        assert!(registry.stop_scan(1));
        assert!(!registry.is_scanning(1));
        assert!(!registry.scan_state(1).scanning);
    }

    #[tokio::test]
    async fn second_monitor_is_rejected_while_live() {
        let registry = SessionRegistry::new();
        assert!(registry.start_monitor(1, idle_task));
        assert!(!registry.start_monitor(1, idle_task));
        // A different chat is unaffected.
        assert!(registry.start_monitor(2, idle_task));
    }

    #[tokio::test]
    async fn finished_session_can_be_restarted() {
        let registry = SessionRegistry::new();
        registry.start_monitor(1, |_token| tokio::spawn(async {}));

        // Let the no-op task finish.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(!registry.is_monitoring(1));
        assert!(registry.start_monitor(1, idle_task));
        assert!(registry.is_monitoring(1));
    }

    #[tokio::test]
    async fn scan_state_is_replaced_atomically() {
        let registry = SessionRegistry::new();
        registry.set_last_found(1, Vec::new());
        assert_eq!(registry.scan_state(1).last_found.len(), 0);
    }
}
