//! The HTTP calls each [`crate::state::OAuthEffect`] needs: discovery,
//! registration, and token exchange. Kept separate from `driver` so the
//! wire shapes (RFC 8414, RFC 9728, RFC 7591) are easy to find.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::state::{
    AuthorizationServerMetadata, ClientInformation, ProtectedResourceMetadata,
    RegistrationModeEffect, TokenSet,
};

#[derive(Debug, Deserialize)]
struct ProtectedResourceMetadataDoc {
    resource: Option<String>,
    #[serde(default)]
    authorization_servers: Vec<String>,
    #[serde(default)]
    scopes_supported: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorizationServerMetadataDoc {
    issuer: Option<String>,
    authorization_endpoint: String,
    token_endpoint: String,
    registration_endpoint: Option<String>,
    #[serde(default)]
    scopes_supported: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RegistrationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uris: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id_metadata_url: Option<String>,
    grant_types: Vec<String>,
    response_types: Vec<String>,
    token_endpoint_auth_method: String,
}

#[derive(Debug, Deserialize)]
struct RegistrationResponse {
    client_id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
}

pub async fn fetch_protected_resource_metadata(
    client: &reqwest::Client,
    url: &str,
) -> Result<ProtectedResourceMetadata, String> {
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("GET {url} returned {}", response.status()));
    }
    let doc: ProtectedResourceMetadataDoc = response.json().await.map_err(|e| e.to_string())?;
    Ok(ProtectedResourceMetadata {
        resource: doc.resource,
        authorization_servers: doc.authorization_servers,
        scopes_supported: doc.scopes_supported,
    })
}

pub async fn fetch_authorization_server_metadata(
    client: &reqwest::Client,
    url: &str,
) -> Result<AuthorizationServerMetadata, String> {
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("GET {url} returned {}", response.status()));
    }
    let doc: AuthorizationServerMetadataDoc = response.json().await.map_err(|e| e.to_string())?;
    Ok(AuthorizationServerMetadata {
        issuer: doc.issuer,
        authorization_endpoint: doc.authorization_endpoint,
        token_endpoint: doc.token_endpoint,
        registration_endpoint: doc.registration_endpoint,
        scopes_supported: doc.scopes_supported,
    })
}

pub async fn register_client(
    client: &reqwest::Client,
    registration_endpoint: &str,
    mode: RegistrationModeEffect,
) -> Result<ClientInformation, String> {
    let request = match mode {
        RegistrationModeEffect::Cimd { metadata_url } => RegistrationRequest {
            redirect_uris: None,
            client_name: None,
            client_id_metadata_url: Some(metadata_url),
            grant_types: vec!["authorization_code".to_string(), "refresh_token".to_string()],
            response_types: vec!["code".to_string()],
            token_endpoint_auth_method: "none".to_string(),
        },
        RegistrationModeEffect::Dcr { client_name, redirect_uri } => RegistrationRequest {
            redirect_uris: Some(vec![redirect_uri]),
            client_name: Some(client_name),
            client_id_metadata_url: None,
            grant_types: vec!["authorization_code".to_string(), "refresh_token".to_string()],
            response_types: vec!["code".to_string()],
            token_endpoint_auth_method: "none".to_string(),
        },
    };

    let response = client
        .post(registration_endpoint)
        .json(&request)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("registration returned {status}: {body}"));
    }

    let body: RegistrationResponse = response.json().await.map_err(|e| e.to_string())?;
    Ok(ClientInformation {
        client_id: body.client_id,
        client_secret: body.client_secret.map(SecretString::from),
    })
}

pub async fn request_authorization_code_grant(
    client: &reqwest::Client,
    token_endpoint: &str,
    code: &str,
    verifier: &str,
    redirect_uri: &str,
    client_info: &ClientInformation,
) -> Result<TokenSet, String> {
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("code_verifier", verifier),
        ("redirect_uri", redirect_uri),
        ("client_id", client_info.client_id.as_str()),
    ];
    let secret_exposed;
    if let Some(secret) = &client_info.client_secret {
        secret_exposed = secret.expose_secret().to_string();
        form.push(("client_secret", secret_exposed.as_str()));
    }
    request_token(client, token_endpoint, &form).await
}

pub async fn request_refresh_grant(
    client: &reqwest::Client,
    token_endpoint: &str,
    refresh_token: &SecretString,
    client_info: &ClientInformation,
) -> Result<TokenSet, String> {
    let refresh_exposed = refresh_token.expose_secret().to_string();
    let mut form = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_exposed.as_str()),
        ("client_id", client_info.client_id.as_str()),
    ];
    let secret_exposed;
    if let Some(secret) = &client_info.client_secret {
        secret_exposed = secret.expose_secret().to_string();
        form.push(("client_secret", secret_exposed.as_str()));
    }
    request_token(client, token_endpoint, &form).await
}

async fn request_token(
    client: &reqwest::Client,
    token_endpoint: &str,
    form: &[(&str, &str)],
) -> Result<TokenSet, String> {
    let response = client
        .post(token_endpoint)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .form(form)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if response.status() == reqwest::StatusCode::BAD_REQUEST {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        if body.get("error").and_then(|v| v.as_str()) == Some("invalid_grant") {
            return Err("invalid_grant".to_string());
        }
        return Err(format!("token request rejected: {body}"));
    }
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("token request returned {status}: {body}"));
    }

    let body: TokenResponse = response.json().await.map_err(|e| e.to_string())?;
    Ok(TokenSet {
        access_token: SecretString::from(body.access_token),
        refresh_token: body.refresh_token.map(SecretString::from),
        expires_in: body.expires_in,
        scope: body.scope,
    })
}
