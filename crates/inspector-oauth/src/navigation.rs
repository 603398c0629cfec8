//! The host-supplied collaborator that gets the user to the authorization
//! URL. The core never opens a browser window itself — it only knows how
//! to build the URL and hand it off.

use async_trait::async_trait;

#[async_trait]
pub trait Navigation: Send + Sync {
    /// Called once per authorization attempt with the fully-built
    /// authorization URL.
    async fn navigate(&self, authorization_url: &str);
}

/// A `Navigation` that records URLs instead of opening them, for tests and
/// headless drivers that print the link for the operator to copy.
#[derive(Default)]
pub struct RecordingNavigation {
    urls: parking_lot::Mutex<Vec<String>>,
}

impl RecordingNavigation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl Navigation for RecordingNavigation {
    async fn navigate(&self, authorization_url: &str) {
        self.urls.lock().push(authorization_url.to_string());
    }
}
