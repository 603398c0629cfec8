//! Persistence seam. The core ships only an in-memory reference
//! implementation; file-backed and session-backed stores are the host's
//! problem, same as the transport layer leaves socket/process wiring to
//! its caller.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::OAuthResult;
use crate::state::OAuthState;

/// Per-server-URL authorization state storage.
#[async_trait]
pub trait OAuthStore: Send + Sync {
    async fn load(&self, server_url: &str) -> OAuthResult<Option<OAuthState>>;
    async fn save(&self, state: &OAuthState) -> OAuthResult<()>;
    async fn clear(&self, server_url: &str) -> OAuthResult<()>;
}

/// A reference `OAuthStore` backed by a `Mutex<HashMap>`. Good enough for
/// tests and single-process hosts; anything that needs to survive a
/// restart should implement the trait against a file or session store.
#[derive(Default)]
pub struct InMemoryOAuthStore {
    states: Mutex<HashMap<String, OAuthState>>,
}

impl InMemoryOAuthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OAuthStore for InMemoryOAuthStore {
    async fn load(&self, server_url: &str) -> OAuthResult<Option<OAuthState>> {
        Ok(self.states.lock().get(server_url).cloned())
    }

    async fn save(&self, state: &OAuthState) -> OAuthResult<()> {
        self.states
            .lock()
            .insert(state.server_url.clone(), state.clone());
        Ok(())
    }

    async fn clear(&self, server_url: &str) -> OAuthResult<()> {
        self.states.lock().remove(server_url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_state() {
        let store = InMemoryOAuthStore::new();
        let state = OAuthState::new("https://mcp.example.com");
        store.save(&state).await.unwrap();

        let loaded = store.load("https://mcp.example.com").await.unwrap();
        assert_eq!(loaded.unwrap().server_url, "https://mcp.example.com");

        store.clear("https://mcp.example.com").await.unwrap();
        assert!(store.load("https://mcp.example.com").await.unwrap().is_none());
    }
}
