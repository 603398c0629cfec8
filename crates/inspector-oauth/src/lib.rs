//! OAuth 2.1 authorization as a pure state graph plus a thin async driver.
//!
//! [`state::step`] never performs I/O; it is safe to single-step in a
//! debugger or drive it from a test without a network. [`driver::OAuthDriver`]
//! runs that graph to completion, handing discovery, registration, and
//! token exchange off to [`http`] and persistence off to an [`store::OAuthStore`].

mod driver;
mod error;
mod http;
mod navigation;
mod pkce;
mod state;
mod store;

pub use driver::{bearer_token, OAuthDriver};
pub use error::{OAuthError, OAuthResult};
pub use navigation::{Navigation, RecordingNavigation};
pub use pkce::{generate_csrf_token, PkceChallenge};
pub use state::{
    AuthorizationServerMetadata, ClientInformation, OAuthClientConfig, OAuthEffect, OAuthInput,
    OAuthState, OAuthStep, PendingAuthorization, ProtectedResourceMetadata, RegistrationMode,
    RegistrationModeEffect, TokenSet,
};
pub use store::{InMemoryOAuthStore, OAuthStore};
