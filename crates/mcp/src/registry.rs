use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use toolgate_tool_runtime::ToolService;

use crate::session::SessionTransport;

/// Owns every live [`SessionTransport`], keyed by session identifier.
///
/// At most one transport exists per identifier: creation happens under the
/// write lock, after re-checking for an existing entry. Identifiers are
/// allocated by callers, never here.
pub struct SessionRegistry {
    service: Arc<dyn ToolService>,
    sessions: RwLock<HashMap<String, Arc<SessionTransport>>>,
}

impl SessionRegistry {
    pub fn new(service: Arc<dyn ToolService>) -> Self {
        Self {
            service,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the transport for `id`, creating and registering it on first use.
    pub async fn get_or_create(&self, id: &str) -> Arc<SessionTransport> {
        if let Some(transport) = self.sessions.read().await.get(id) {
            return transport.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::info!(session_id = %id, "Session created");
                Arc::new(SessionTransport::new(id, self.service.clone()))
            })
            .clone()
    }

    /// Pure lookup; never creates state.
    pub async fn get(&self, id: &str) -> Option<Arc<SessionTransport>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Retire a session. Requests already holding the transport finish normally.
    pub async fn remove(&self, id: &str) -> Option<Arc<SessionTransport>> {
        let removed = self.sessions.write().await.remove(id);
        if removed.is_some() {
            tracing::info!(session_id = %id, "Session closed");
        }
        removed
    }

    /// Drop sessions idle for longer than `max_idle`. Returns the evicted
    /// identifiers.
    ///
    /// A transport is kept while anyone outside the registry holds it: a
    /// request that looked it up but has not locked it yet must still land
    /// on the registered transport.
    pub async fn evict_idle(&self, max_idle: Duration) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, t)| Arc::strong_count(t) == 1)
            .filter(|(_, t)| t.idle_for().is_some_and(|idle| idle > max_idle))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            sessions.remove(id);
            tracing::info!(session_id = %id, "Session evicted after idle timeout");
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
