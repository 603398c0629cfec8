//! Thin async driver: executes the [`OAuthEffect`]s `step` asks for and
//! feeds the result back in as the next [`OAuthInput`], until the graph
//! either suspends (waiting on the authorization redirect) or reaches a
//! terminal step.

use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::error::OAuthResult;
use crate::http;
use crate::navigation::Navigation;
use crate::state::{step, OAuthClientConfig, OAuthEffect, OAuthInput, OAuthState};
use crate::store::OAuthStore;

pub struct OAuthDriver<S, N> {
    http: reqwest::Client,
    store: Arc<S>,
    navigation: Arc<N>,
    config: OAuthClientConfig,
}

impl<S, N> OAuthDriver<S, N>
where
    S: OAuthStore,
    N: Navigation,
{
    pub fn new(store: Arc<S>, navigation: Arc<N>, config: OAuthClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            store,
            navigation,
            config,
        }
    }

    /// Begin (or resume) authorization for a server. Loads any persisted
    /// state first so a partially-completed attempt continues instead of
    /// restarting from scratch.
    pub async fn start(&self, server_url: &str) -> OAuthResult<OAuthState> {
        let state = match self.store.load(server_url).await? {
            Some(state) if state.tokens.is_some() => return Ok(state),
            Some(state) => state,
            None => OAuthState::new(server_url),
        };
        self.drive(state, OAuthInput::Start).await
    }

    /// Deliver the `{code, state}` pair the host's redirect handler
    /// received, resuming the graph at `token_request`.
    pub async fn handle_callback(
        &self,
        state: OAuthState,
        code: String,
        returned_state: String,
    ) -> OAuthResult<OAuthState> {
        self.drive(
            state,
            OAuthInput::AuthorizationCodeReceived { code, state: returned_state },
        )
        .await
    }

    /// Force a refresh of the current access token.
    pub async fn refresh(&self, state: OAuthState) -> OAuthResult<OAuthState> {
        self.drive(state, OAuthInput::RefreshRequested).await
    }

    async fn drive(&self, state: OAuthState, input: OAuthInput) -> OAuthResult<OAuthState> {
        let (mut state, mut effects) = step(state, input, &self.config);

        loop {
            let Some(effect) = effects.into_iter().next() else {
                break;
            };

            match effect {
                OAuthEffect::FetchProtectedResourceMetadata { url } => {
                    let result = http::fetch_protected_resource_metadata(&self.http, &url).await;
                    let (next_state, next_effects) = step(
                        state,
                        OAuthInput::ProtectedResourceMetadataFetched(result),
                        &self.config,
                    );
                    state = next_state;
                    effects = next_effects;
                }
                OAuthEffect::FetchAuthorizationServerMetadata { url } => {
                    let result = http::fetch_authorization_server_metadata(&self.http, &url).await;
                    let (next_state, next_effects) = step(
                        state,
                        OAuthInput::AuthorizationServerMetadataFetched(result),
                        &self.config,
                    );
                    state = next_state;
                    effects = next_effects;
                }
                OAuthEffect::RegisterClient { registration_endpoint, mode } => {
                    let result = http::register_client(&self.http, &registration_endpoint, mode).await;
                    let (next_state, next_effects) =
                        step(state, OAuthInput::ClientRegistered(result), &self.config);
                    state = next_state;
                    effects = next_effects;
                }
                OAuthEffect::RequestAuthorizationCodeGrant { token_endpoint, code, verifier, client } => {
                    let result = http::request_authorization_code_grant(
                        &self.http,
                        &token_endpoint,
                        &code,
                        &verifier,
                        &self.config.redirect_uri,
                        &client,
                    )
                    .await;
                    let (next_state, next_effects) =
                        step(state, OAuthInput::TokenResponseReceived(result), &self.config);
                    state = next_state;
                    effects = next_effects;
                }
                OAuthEffect::RequestRefreshGrant { token_endpoint, refresh_token, client } => {
                    let result =
                        http::request_refresh_grant(&self.http, &token_endpoint, &refresh_token, &client)
                            .await;
                    match &result {
                        Err(message) if message == "invalid_grant" => {
                            let (next_state, next_effects) =
                                step(state, OAuthInput::RefreshFailedInvalidGrant, &self.config);
                            state = next_state;
                            effects = next_effects;
                        }
                        _ => {
                            let (next_state, next_effects) =
                                step(state, OAuthInput::TokenResponseReceived(result), &self.config);
                            state = next_state;
                            effects = next_effects;
                        }
                    }
                }
                OAuthEffect::Navigate { url } => {
                    self.navigation.navigate(&url).await;
                    self.store.save(&state).await?;
                    return Ok(state);
                }
                OAuthEffect::Persist => {
                    self.store.save(&state).await?;
                    effects = Vec::new();
                }
                OAuthEffect::Clear => {
                    self.store.clear(&state.server_url).await?;
                    effects = Vec::new();
                }
            }
        }

        self.store.save(&state).await?;
        Ok(state)
    }
}

/// The bearer token to attach to outbound transport requests, if the state
/// holds one.
pub fn bearer_token(state: &OAuthState) -> Option<String> {
    state
        .tokens
        .as_ref()
        .map(|tokens| tokens.access_token.expose_secret().to_string())
}
