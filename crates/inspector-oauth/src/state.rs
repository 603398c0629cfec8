//! The authorization state graph and the pure function that walks it.
//!
//! `step` never performs I/O. It inspects the current [`OAuthState`] and an
//! [`OAuthInput`] describing what just happened (a fetch completed, the
//! host delivered an authorization code, ...) and returns the next state
//! plus zero or more [`OAuthEffect`]s the driver should carry out. This
//! keeps the graph single-steppable and testable without a network.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::pkce::{generate_csrf_token, PkceChallenge};

/// Which step of the graph a server's authorization attempt currently sits
/// at. Mirrors the table: discovery, registration, the redirect round trip,
/// token exchange, and the terminal `Complete`/`Error` states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthStep {
    ProtectedResourceMetadata,
    AuthorizationServerMetadata,
    ClientRegistration,
    AuthorizationRedirect,
    AwaitingAuthorizationCode,
    TokenRequest,
    Complete,
    Refresh,
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    pub resource: Option<String>,
    pub authorization_servers: Vec<String>,
    pub scopes_supported: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub registration_endpoint: Option<String>,
    pub scopes_supported: Vec<String>,
}

/// `client_secret` wraps [`SecretString`], which secrecy only implements
/// `Deserialize` for (never `Serialize`, so a secret can't leak into a log
/// or debug dump through an accidental derive); this type is therefore
/// plain `Clone`/`Debug` rather than serde-round-trippable as a whole.
#[derive(Debug, Clone)]
pub struct ClientInformation {
    pub client_id: String,
    pub client_secret: Option<SecretString>,
}

#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub verifier: String,
    pub csrf_state: String,
}

#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

/// How the client should identify itself during dynamic registration, if no
/// client id is already known.
#[derive(Debug, Clone)]
pub enum RegistrationMode {
    /// A client id (and optional secret) is already configured; registration
    /// is skipped entirely.
    Preregistered(ClientInformation),
    /// Client-Metadata-Document: register by pointing the server at a URL
    /// describing this client.
    Cimd { metadata_url: String },
    /// Dynamic Client Registration: register with an inline metadata
    /// document (RFC 7591).
    Dcr { client_name: String },
}

/// Per-server-URL authorization state. Cloneable snapshot; the driver keeps
/// the live copy and persists it through an [`crate::store::OAuthStore`]
/// after every transition.
#[derive(Debug, Clone)]
pub struct OAuthState {
    pub server_url: String,
    pub step: OAuthStep,
    pub protected_resource_metadata: Option<ProtectedResourceMetadata>,
    pub authorization_server_metadata: Option<AuthorizationServerMetadata>,
    pub client_information: Option<ClientInformation>,
    pub pending_authorization: Option<PendingAuthorization>,
    pub tokens: Option<TokenSet>,
    pub latest_error: Option<String>,
}

impl OAuthState {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            step: OAuthStep::ProtectedResourceMetadata,
            protected_resource_metadata: None,
            authorization_server_metadata: None,
            client_information: None,
            pending_authorization: None,
            tokens: None,
            latest_error: None,
        }
    }
}

/// Inputs that drive the graph forward: the result of an effect the driver
/// just executed, or an external event (the host delivering an
/// authorization callback).
#[derive(Debug, Clone)]
pub enum OAuthInput {
    Start,
    ProtectedResourceMetadataFetched(Result<ProtectedResourceMetadata, String>),
    AuthorizationServerMetadataFetched(Result<AuthorizationServerMetadata, String>),
    ClientRegistered(Result<ClientInformation, String>),
    AuthorizationCodeReceived { code: String, state: String },
    TokenResponseReceived(Result<TokenSet, String>),
    RefreshRequested,
    RefreshFailedInvalidGrant,
}

/// Side effects `step` asks the driver to perform. Each carries everything
/// the driver needs; none of them read state the driver hasn't been given.
#[derive(Debug, Clone)]
pub enum OAuthEffect {
    FetchProtectedResourceMetadata { url: String },
    FetchAuthorizationServerMetadata { url: String },
    RegisterClient { registration_endpoint: String, mode: RegistrationModeEffect },
    Navigate { url: String },
    RequestAuthorizationCodeGrant { token_endpoint: String, code: String, verifier: String, client: ClientInformation },
    RequestRefreshGrant { token_endpoint: String, refresh_token: SecretString, client: ClientInformation },
    Persist,
    Clear,
}

#[derive(Debug, Clone)]
pub enum RegistrationModeEffect {
    Cimd { metadata_url: String },
    Dcr { client_name: String, redirect_uri: String },
}

/// Configuration that doesn't change across a `step` call: the redirect URI
/// the host's callback server listens on, and how to register if needed.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub redirect_uri: String,
    pub registration: RegistrationMode,
}

/// Advance the graph by one tick. Pure: given the same `state`, `input`,
/// and `config`, always returns the same result.
pub fn step(
    state: OAuthState,
    input: OAuthInput,
    config: &OAuthClientConfig,
) -> (OAuthState, Vec<OAuthEffect>) {
    let mut state = state;

    match (state.step, input) {
        (OAuthStep::ProtectedResourceMetadata, OAuthInput::Start) => {
            let url = format!(
                "{}/.well-known/oauth-protected-resource",
                state.server_url.trim_end_matches('/')
            );
            (state, vec![OAuthEffect::FetchProtectedResourceMetadata { url }])
        }

        (OAuthStep::ProtectedResourceMetadata, OAuthInput::ProtectedResourceMetadataFetched(result)) => {
            match result {
                Ok(metadata) => {
                    let base = metadata
                        .authorization_servers
                        .first()
                        .cloned()
                        .unwrap_or_else(|| state.server_url.clone());
                    state.protected_resource_metadata = Some(metadata);
                    state.step = OAuthStep::AuthorizationServerMetadata;
                    let url = format!(
                        "{}/.well-known/oauth-authorization-server",
                        base.trim_end_matches('/')
                    );
                    (state, vec![OAuthEffect::FetchAuthorizationServerMetadata { url }])
                }
                Err(message) => fail(state, message),
            }
        }

        (OAuthStep::AuthorizationServerMetadata, OAuthInput::AuthorizationServerMetadataFetched(result)) => {
            match result {
                Ok(metadata) => {
                    state.authorization_server_metadata = Some(metadata);
                    state.step = OAuthStep::ClientRegistration;
                    step(state, OAuthInput::Start, config)
                }
                Err(message) => fail(state, message),
            }
        }

        (OAuthStep::ClientRegistration, OAuthInput::Start) => {
            if let RegistrationMode::Preregistered(client) = &config.registration {
                state.client_information = Some(client.clone());
                state.step = OAuthStep::AuthorizationRedirect;
                return step(state, OAuthInput::Start, config);
            }

            let Some(metadata) = state.authorization_server_metadata.clone() else {
                return fail(state, "missing authorization server metadata".to_string());
            };
            let Some(registration_endpoint) = metadata.registration_endpoint else {
                return fail(state, "server did not advertise a registration endpoint".to_string());
            };

            let mode = match &config.registration {
                RegistrationMode::Cimd { metadata_url } => RegistrationModeEffect::Cimd {
                    metadata_url: metadata_url.clone(),
                },
                RegistrationMode::Dcr { client_name } => RegistrationModeEffect::Dcr {
                    client_name: client_name.clone(),
                    redirect_uri: config.redirect_uri.clone(),
                },
                RegistrationMode::Preregistered(_) => unreachable!("handled above"),
            };

            (state, vec![OAuthEffect::RegisterClient { registration_endpoint, mode }])
        }

        (OAuthStep::ClientRegistration, OAuthInput::ClientRegistered(result)) => match result {
            Ok(client) => {
                state.client_information = Some(client);
                state.step = OAuthStep::AuthorizationRedirect;
                step(state, OAuthInput::Start, config)
            }
            Err(message) => fail(state, message),
        },

        (OAuthStep::AuthorizationRedirect, OAuthInput::Start) => {
            let Some(client) = state.client_information.clone() else {
                return fail(state, "no client information to authorize with".to_string());
            };
            let Some(metadata) = state.authorization_server_metadata.clone() else {
                return fail(state, "missing authorization server metadata".to_string());
            };

            let pkce = PkceChallenge::generate();
            let csrf_state = generate_csrf_token();

            let scopes = resource_scopes(&state).unwrap_or_else(|| metadata.scopes_supported.clone());

            let mut query = vec![
                ("response_type".to_string(), "code".to_string()),
                ("client_id".to_string(), client.client_id.clone()),
                ("redirect_uri".to_string(), config.redirect_uri.clone()),
                ("state".to_string(), csrf_state.clone()),
                ("code_challenge".to_string(), pkce.challenge.clone()),
                ("code_challenge_method".to_string(), "S256".to_string()),
            ];
            if !scopes.is_empty() {
                query.push(("scope".to_string(), scopes.join(" ")));
            }

            let url = format!(
                "{}?{}",
                metadata.authorization_endpoint,
                serde_urlencoded::to_string(&query).unwrap_or_default()
            );

            state.pending_authorization = Some(PendingAuthorization {
                verifier: pkce.verifier,
                csrf_state,
            });
            state.step = OAuthStep::AwaitingAuthorizationCode;

            (state, vec![OAuthEffect::Navigate { url }])
        }

        (OAuthStep::AwaitingAuthorizationCode, OAuthInput::AuthorizationCodeReceived { code, state: returned_state }) => {
            let Some(pending) = state.pending_authorization.clone() else {
                return fail(state, "no pending authorization to resume".to_string());
            };
            if pending.csrf_state != returned_state {
                return fail(state, "state parameter mismatch on callback".to_string());
            }
            let Some(client) = state.client_information.clone() else {
                return fail(state, "no client information to exchange code with".to_string());
            };
            let Some(metadata) = state.authorization_server_metadata.clone() else {
                return fail(state, "missing authorization server metadata".to_string());
            };

            state.step = OAuthStep::TokenRequest;
            (
                state,
                vec![OAuthEffect::RequestAuthorizationCodeGrant {
                    token_endpoint: metadata.token_endpoint,
                    code,
                    verifier: pending.verifier,
                    client,
                }],
            )
        }

        (OAuthStep::TokenRequest, OAuthInput::TokenResponseReceived(result)) => match result {
            Ok(tokens) => {
                state.tokens = Some(tokens);
                state.pending_authorization = None;
                state.latest_error = None;
                state.step = OAuthStep::Complete;
                (state, vec![OAuthEffect::Persist])
            }
            Err(message) => fail(state, message),
        },

        (_, OAuthInput::RefreshRequested) => {
            let Some(client) = state.client_information.clone() else {
                return fail(state, "no client information to refresh with".to_string());
            };
            let Some(metadata) = state.authorization_server_metadata.clone() else {
                return fail(state, "missing authorization server metadata".to_string());
            };
            let Some(refresh_token) = state.tokens.as_ref().and_then(|t| t.refresh_token.clone()) else {
                return fail(state, "no refresh token on record".to_string());
            };

            state.step = OAuthStep::Refresh;
            (
                state,
                vec![OAuthEffect::RequestRefreshGrant {
                    token_endpoint: metadata.token_endpoint,
                    refresh_token,
                    client,
                }],
            )
        }

        (OAuthStep::Refresh, OAuthInput::TokenResponseReceived(result)) => match result {
            Ok(tokens) => {
                state.tokens = Some(tokens);
                state.latest_error = None;
                state.step = OAuthStep::Complete;
                (state, vec![OAuthEffect::Persist])
            }
            Err(message) => fail(state, message),
        },

        (OAuthStep::Refresh, OAuthInput::RefreshFailedInvalidGrant) => {
            let server_url = state.server_url.clone();
            let mut fresh = OAuthState::new(server_url);
            fresh.protected_resource_metadata = state.protected_resource_metadata;
            fresh.authorization_server_metadata = state.authorization_server_metadata;
            fresh.client_information = state.client_information;
            (fresh, vec![OAuthEffect::Clear])
        }

        (step_at, _) => fail(state, format!("unexpected input at step {step_at:?}")),
    }
}

fn fail(mut state: OAuthState, message: String) -> (OAuthState, Vec<OAuthEffect>) {
    state.latest_error = Some(message);
    state.step = OAuthStep::Error;
    (state, Vec::new())
}

/// Prefer resource-metadata scopes over auth-server scopes; `None` if
/// neither side advertised any (the caller should then fall back to the
/// auth server's list, or request no scope at all).
fn resource_scopes(state: &OAuthState) -> Option<Vec<String>> {
    state
        .protected_resource_metadata
        .as_ref()
        .map(|m| m.scopes_supported.clone())
        .filter(|scopes| !scopes.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthClientConfig {
        OAuthClientConfig {
            redirect_uri: "http://localhost:3333/callback".to_string(),
            registration: RegistrationMode::Dcr {
                client_name: "inspector".to_string(),
            },
        }
    }

    #[test]
    fn start_requests_protected_resource_metadata() {
        let state = OAuthState::new("https://mcp.example.com");
        let (state, effects) = step(state, OAuthInput::Start, &config());
        assert_eq!(state.step, OAuthStep::ProtectedResourceMetadata);
        assert!(matches!(
            effects.as_slice(),
            [OAuthEffect::FetchProtectedResourceMetadata { url }]
                if url == "https://mcp.example.com/.well-known/oauth-protected-resource"
        ));
    }

    #[test]
    fn successful_discovery_chains_straight_to_registration_effect() {
        let state = OAuthState::new("https://mcp.example.com");
        let (state, _) = step(
            state,
            OAuthInput::ProtectedResourceMetadataFetched(Ok(ProtectedResourceMetadata {
                resource: None,
                authorization_servers: vec!["https://auth.example.com".to_string()],
                scopes_supported: vec![],
            })),
            &config(),
        );
        assert_eq!(state.step, OAuthStep::AuthorizationServerMetadata);

        let (state, effects) = step(
            state,
            OAuthInput::AuthorizationServerMetadataFetched(Ok(AuthorizationServerMetadata {
                issuer: Some("https://auth.example.com".to_string()),
                authorization_endpoint: "https://auth.example.com/authorize".to_string(),
                token_endpoint: "https://auth.example.com/token".to_string(),
                registration_endpoint: Some("https://auth.example.com/register".to_string()),
                scopes_supported: vec!["mcp".to_string()],
            })),
            &config(),
        );
        assert_eq!(state.step, OAuthStep::ClientRegistration);
        assert!(matches!(effects.as_slice(), [OAuthEffect::RegisterClient { .. }]));
    }

    #[test]
    fn preregistered_client_skips_registration() {
        let mut cfg = config();
        cfg.registration = RegistrationMode::Preregistered(ClientInformation {
            client_id: "known-client".to_string(),
            client_secret: None,
        });

        let mut state = OAuthState::new("https://mcp.example.com");
        state.step = OAuthStep::ClientRegistration;
        state.authorization_server_metadata = Some(AuthorizationServerMetadata {
            issuer: None,
            authorization_endpoint: "https://auth.example.com/authorize".to_string(),
            token_endpoint: "https://auth.example.com/token".to_string(),
            registration_endpoint: None,
            scopes_supported: vec![],
        });

        let (state, effects) = step(state, OAuthInput::Start, &cfg);
        assert_eq!(state.step, OAuthStep::AwaitingAuthorizationCode);
        assert!(matches!(effects.as_slice(), [OAuthEffect::Navigate { .. }]));
        assert_eq!(state.client_information.unwrap().client_id, "known-client");
    }

    #[test]
    fn mismatched_callback_state_fails_without_exchanging() {
        let mut state = OAuthState::new("https://mcp.example.com");
        state.step = OAuthStep::AwaitingAuthorizationCode;
        state.client_information = Some(ClientInformation {
            client_id: "c1".to_string(),
            client_secret: None,
        });
        state.authorization_server_metadata = Some(AuthorizationServerMetadata {
            issuer: None,
            authorization_endpoint: "https://auth.example.com/authorize".to_string(),
            token_endpoint: "https://auth.example.com/token".to_string(),
            registration_endpoint: None,
            scopes_supported: vec![],
        });
        state.pending_authorization = Some(PendingAuthorization {
            verifier: "verifier".to_string(),
            csrf_state: "expected".to_string(),
        });

        let (state, effects) = step(
            state,
            OAuthInput::AuthorizationCodeReceived {
                code: "abc".to_string(),
                state: "wrong".to_string(),
            },
            &config(),
        );
        assert_eq!(state.step, OAuthStep::Error);
        assert!(effects.is_empty());
        assert!(state.latest_error.unwrap().contains("mismatch"));
    }

    #[test]
    fn invalid_grant_on_refresh_restarts_discovery_but_keeps_client_info() {
        let mut state = OAuthState::new("https://mcp.example.com");
        state.step = OAuthStep::Refresh;
        state.client_information = Some(ClientInformation {
            client_id: "c1".to_string(),
            client_secret: None,
        });

        let (state, effects) = step(state, OAuthInput::RefreshFailedInvalidGrant, &config());
        assert_eq!(state.step, OAuthStep::ProtectedResourceMetadata);
        assert!(state.client_information.is_some());
        assert!(state.tokens.is_none());
        assert!(matches!(effects.as_slice(), [OAuthEffect::Clear]));
    }
}
