//! Process-wide registry of live sessions (§5), keyed by telephony call id.
//! Lock-free map — a session's own event loop is the only writer of its
//! entry's lifecycle; the registry just tracks which calls are live for
//! shutdown draining and duplicate-start detection.

use crate::domain::CallId;
use dashmap::DashMap;
use tokio::sync::broadcast;

/// Handle kept in the registry for a running session — just enough to
/// signal it without reaching into its internals.
pub struct SessionHandle {
    pub shutdown: broadcast::Sender<()>,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<CallId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, call_id: CallId, handle: SessionHandle) {
        self.sessions.insert(call_id, handle);
    }

    pub fn remove(&self, call_id: &CallId) {
        self.sessions.remove(call_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, call_id: &CallId) -> bool {
        self.sessions.contains_key(call_id)
    }

    /// Broadcast shutdown to every live session — each session's loop
    /// observes this on its `select!` and begins its own teardown.
    pub fn shutdown_all(&self) {
        for entry in self.sessions.iter() {
            let _ = entry.value().shutdown.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_tracks_count() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = broadcast::channel(1);
        registry.insert("call-1".to_string(), SessionHandle { shutdown: tx });
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&"call-1".to_string()));
        registry.remove(&"call-1".to_string());
        assert!(registry.is_empty());
    }

    #[test]
    fn shutdown_all_notifies_every_session() {
        let registry = SessionRegistry::new();
        let (tx1, mut rx1) = broadcast::channel(1);
        let (tx2, mut rx2) = broadcast::channel(1);
        registry.insert("call-1".to_string(), SessionHandle { shutdown: tx1 });
        registry.insert("call-2".to_string(), SessionHandle { shutdown: tx2 });
        registry.shutdown_all();
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }
}
