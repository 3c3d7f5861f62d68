// Copyright (c) 2025 - Cowboy AI, Inc.
//! OAuth2 client-credentials token for ARM
//!
//! ```text
//! POST {authority}/{tenant}/oauth2/v2.0/token
//!   grant_type=client_credentials
//!   client_id=..  client_secret=..
//!   scope={resource_manager}/.default
//! ```
//!
//! The access token is cached until [`REFRESH_MARGIN`] before it expires.

use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ControlPlaneSettings;
use crate::credentials::{SecretString, ServicePrincipalCredentials};
use crate::errors::{ProvisionError, ProvisionResult};

/// Tokens are refreshed this long before they expire
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: SecretString,
    expires_in: ExpiresIn,
}

/// The token endpoint sends `expires_in` as a number or as a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
    Seconds(u64),
    Text(String),
}

impl ExpiresIn {
    fn seconds(&self) -> ProvisionResult<u64> {
        match self {
            ExpiresIn::Seconds(secs) => Ok(*secs),
            ExpiresIn::Text(text) => text.parse().map_err(|_| {
                ProvisionError::Authentication(format!("invalid expires_in value '{text}'"))
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: SecretString,
    refresh_at: Instant,
}

/// Service-principal token source with an in-memory cache
#[derive(Debug)]
pub struct TokenCredential {
    client: Client,
    token_url: String,
    scope: String,
    client_id: String,
    client_secret: SecretString,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenCredential {
    pub fn new(
        client: Client,
        settings: &ControlPlaneSettings,
        credentials: &ServicePrincipalCredentials,
    ) -> Self {
        Self {
            client,
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                settings.authority_url.trim_end_matches('/'),
                urlencoding::encode(&credentials.tenant_id)
            ),
            scope: format!(
                "{}/.default",
                settings.resource_manager_url.trim_end_matches('/')
            ),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            cache: Mutex::new(None),
        }
    }

    /// Bearer token for the resource manager, fetched on first use
    pub async fn bearer_token(&self) -> ProvisionResult<SecretString> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    async fn request_token(&self) -> ProvisionResult<CachedToken> {
        debug!("Requesting ARM access token from {}", self.token_url);

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ProvisionError::Authentication(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("token endpoint returned {status}"),
            };
            return Err(ProvisionError::Authentication(message));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ProvisionError::Authentication(format!("malformed token response: {e}"))
        })?;

        let lifetime = Duration::from_secs(token.expires_in.seconds()?);
        Ok(CachedToken {
            token: token.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        })
    }
}
