use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::{Credentials, GRAPH_SCOPE};
use crate::error::{redact_response_body, GraphError};

/// Opaque bearer token. Expiry is not tracked locally: a 401 from Graph is
/// the signal to refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Arc<str>);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Arc::from(value.into()))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Decodes the JWT payload without verifying the signature.
    pub fn claims(&self) -> Result<TokenClaims, GraphError> {
        let payload = self
            .0
            .split('.')
            .nth(1)
            .ok_or_else(|| GraphError::validation("access token", "not a JWT"))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|error| GraphError::validation("access token", error.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Application permissions granted to the app registration.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Space separated delegated scopes; absent for app-only tokens.
    pub scp: Option<String>,
    pub tid: Option<String>,
    pub app_displayname: Option<String>,
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn delegated_scopes(&self) -> Vec<&str> {
        self.scp
            .as_deref()
            .map(|scopes| scopes.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp
            .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OAuthTokenResponse {
    access_token: Option<String>,
}

/// Holds the single app-only token and replaces it wholesale on refresh.
pub struct TokenProvider {
    http: Client,
    credentials: Credentials,
    token_url: String,
    current: RwLock<AccessToken>,
    refresh_lock: Mutex<()>,
}

impl TokenProvider {
    /// Acquires the first token immediately; bad credentials or an
    /// unreachable endpoint fail here rather than on the first Graph call.
    pub async fn acquire_new(
        http: Client,
        credentials: Credentials,
        token_url: impl Into<String>,
    ) -> Result<Self, GraphError> {
        let token_url = token_url.into();
        let token = fetch_token(&http, &credentials, &token_url).await?;
        Ok(Self::with_token(http, credentials, token_url, token))
    }

    pub fn with_token(
        http: Client,
        credentials: Credentials,
        token_url: impl Into<String>,
        token: AccessToken,
    ) -> Self {
        Self {
            http,
            credentials,
            token_url: token_url.into(),
            current: RwLock::new(token),
            refresh_lock: Mutex::new(()),
        }
    }

    pub async fn current(&self) -> AccessToken {
        self.current.read().await.clone()
    }

    pub async fn acquire(&self) -> Result<AccessToken, GraphError> {
        let _guard = self.refresh_lock.lock().await;
        self.replace().await
    }

    pub async fn refresh(&self) -> Result<AccessToken, GraphError> {
        self.acquire().await
    }

    /// Refreshes only if `stale` is still the held token; a caller that lost
    /// the race picks up the token another request already fetched.
    pub(crate) async fn refresh_if_current(
        &self,
        stale: &AccessToken,
    ) -> Result<AccessToken, GraphError> {
        let _guard = self.refresh_lock.lock().await;
        {
            let held = self.current.read().await;
            if *held != *stale {
                debug!("token already refreshed by a concurrent request");
                return Ok(held.clone());
            }
        }
        self.replace().await
    }

    async fn replace(&self) -> Result<AccessToken, GraphError> {
        let fresh = fetch_token(&self.http, &self.credentials, &self.token_url).await?;
        *self.current.write().await = fresh.clone();
        Ok(fresh)
    }
}

async fn fetch_token(
    http: &Client,
    credentials: &Credentials,
    token_url: &str,
) -> Result<AccessToken, GraphError> {
    let response = http
        .post(token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
        ])
        .send()
        .await
        .map_err(|source| GraphError::TokenRequest {
            url: token_url.to_string(),
            source,
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| GraphError::TokenRequest {
            url: token_url.to_string(),
            source,
        })?;

    let access_token = serde_json::from_str::<OAuthTokenResponse>(&body)
        .ok()
        .and_then(|payload| payload.access_token)
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| GraphError::TokenMissing {
            status: status.as_u16(),
            body: redact_response_body(&body),
        })?;

    info!(
        client_id = %credentials.client_id,
        tenant_id = %credentials.tenant_id,
        "acquired graph app token"
    );
    Ok(AccessToken::new(access_token))
}
