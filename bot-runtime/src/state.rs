//! In-memory conversation state keyed by user id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Per-user conversation state. Cloning shares the same map.
#[derive(Clone)]
pub struct StateManager<S> {
    states: Arc<RwLock<HashMap<i64, S>>>,
}

impl<S: Clone + Send + Sync> StateManager<S> {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn set(&self, user_id: i64, state: S) {
        self.states.write().await.insert(user_id, state);
    }

    pub async fn get(&self, user_id: i64) -> Option<S> {
        self.states.read().await.get(&user_id).cloned()
    }

    /// Removes and returns the user's state.
    pub async fn take(&self, user_id: i64) -> Option<S> {
        self.states.write().await.remove(&user_id)
    }

    pub async fn remove(&self, user_id: i64) {
        self.states.write().await.remove(&user_id);
    }
}

impl<S: Clone + Send + Sync> Default for StateManager<S> {
    fn default() -> Self {
        Self::new()
    }
}
