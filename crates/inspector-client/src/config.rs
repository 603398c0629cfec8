//! Session configuration and the fluent builder used to assemble an
//! [`crate::InspectorClient`] before `connect()`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use inspector_protocol::types::Root;
use inspector_transport::Transport;

use crate::reverse::{RootsProvider, StaticRootsProvider};

/// Ring buffer capacities and protocol defaults. Mirrors the defaults named
/// in the session core design: a 10 000 ms request timeout and history
/// buffers generous enough for an interactive session without growing
/// unbounded.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) default_request_timeout: Duration,
    pub(crate) message_history_capacity: usize,
    pub(crate) stderr_history_capacity: usize,
    pub(crate) fetch_history_capacity: usize,
    pub(crate) task_poll_interval: Duration,
    pub(crate) client_name: String,
    pub(crate) client_version: String,
    pub(crate) sampling_enabled: bool,
    pub(crate) elicitation_form_enabled: bool,
    pub(crate) elicitation_url_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_request_timeout: Duration::from_millis(10_000),
            message_history_capacity: 1_000,
            stderr_history_capacity: 500,
            fetch_history_capacity: 200,
            task_poll_interval: Duration::from_millis(250),
            client_name: "inspector-client".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            sampling_enabled: false,
            elicitation_form_enabled: false,
            elicitation_url_enabled: false,
        }
    }
}

/// Builds a [`SessionConfig`] plus the host collaborators (transport, roots
/// provider) needed to start a session.
pub struct SessionBuilder<T: Transport> {
    transport: T,
    config: SessionConfig,
    roots: Vec<Root>,
    roots_provider: Option<Arc<dyn RootsProvider>>,
    stderr_rx: Option<mpsc::UnboundedReceiver<String>>,
}

impl<T: Transport> SessionBuilder<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: SessionConfig::default(),
            roots: Vec::new(),
            roots_provider: None,
            stderr_rx: None,
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_message_history_capacity(mut self, capacity: usize) -> Self {
        self.config.message_history_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_stderr_history_capacity(mut self, capacity: usize) -> Self {
        self.config.stderr_history_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_fetch_history_capacity(mut self, capacity: usize) -> Self {
        self.config.fetch_history_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_task_poll_interval(mut self, interval: Duration) -> Self {
        self.config.task_poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self.config.client_version = version.into();
        self
    }

    #[must_use]
    pub fn with_sampling(mut self, enabled: bool) -> Self {
        self.config.sampling_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_elicitation(mut self, form: bool, url: bool) -> Self {
        self.config.elicitation_form_enabled = form;
        self.config.elicitation_url_enabled = url;
        self
    }

    /// Seed the roots list the synchronous `roots/list` handler answers
    /// with. Replaced wholesale by a later `setRoots` call.
    #[must_use]
    pub fn with_roots(mut self, roots: Vec<Root>) -> Self {
        self.roots = roots;
        self
    }

    /// Register the host-supplied synchronous roots callback. If omitted,
    /// the builder installs a provider backed by `with_roots`'s static list.
    #[must_use]
    pub fn with_roots_provider(mut self, provider: Arc<dyn RootsProvider>) -> Self {
        self.roots_provider = Some(provider);
        self
    }

    /// Wire a child process's stderr into the session's stderr history. The
    /// host pairs this with the matching sink on the concrete transport
    /// (e.g. `StdioTransport::with_stderr_sink`) before handing the
    /// transport to [`SessionBuilder::new`].
    #[must_use]
    pub fn with_stderr_receiver(mut self, rx: mpsc::UnboundedReceiver<String>) -> Self {
        self.stderr_rx = Some(rx);
        self
    }

    /// Splits the builder into its parts for [`crate::InspectorClient::connect`].
    ///
    /// The third element is `Some` only when no custom provider was given:
    /// `set_roots` needs the concrete type to mutate the list in place, so a
    /// host-supplied [`RootsProvider`] opts out of `set_roots` by design —
    /// it owns its own update path.
    pub(crate) fn into_parts(
        self,
    ) -> (
        T,
        SessionConfig,
        Arc<dyn RootsProvider>,
        Option<Arc<StaticRootsProvider>>,
        Option<mpsc::UnboundedReceiver<String>>,
    ) {
        match self.roots_provider {
            Some(provider) => (self.transport, self.config, provider, None, self.stderr_rx),
            None => {
                let provider = Arc::new(StaticRootsProvider::new(self.roots));
                (self.transport, self.config, provider.clone(), Some(provider), self.stderr_rx)
            }
        }
    }
}
