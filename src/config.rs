use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::GraphError;

pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const TENANT_ID_ENV: &str = "HERMES_TENANT_ID";
pub const CLIENT_ID_ENV: &str = "HERMES_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "HERMES_CLIENT_SECRET";
pub const API_BASE_ENV: &str = "HERMES_GRAPH_API_BASE";
pub const TOKEN_URL_ENV: &str = "HERMES_GRAPH_TOKEN_URL";
pub const TIMEOUT_ENV: &str = "HERMES_HTTP_TIMEOUT_SECS";

/// Azure AD application identity used for the client-credentials grant.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn token_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub credentials: Credentials,
    pub api_base: String,
    pub token_url: String,
    pub timeout: Duration,
}

impl GraphConfig {
    pub fn new(credentials: Credentials) -> Self {
        let token_url = credentials.token_url();
        Self {
            credentials,
            api_base: GRAPH_API_BASE.to_string(),
            token_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn default_config_path() -> Result<PathBuf, GraphError> {
        let home = dirs::home_dir()
            .ok_or_else(|| GraphError::Config("failed to determine home directory".to_string()))?;
        Ok(home.join(".hermes-graph").join("config.json"))
    }

    /// Resolves configuration from the process environment, falling back to
    /// `~/.hermes-graph/config.json` when it exists.
    pub fn from_env() -> Result<Self, GraphError> {
        let path = Self::default_config_path()?;
        let file = ConfigFile::load_optional(&path)?;
        Self::resolve(|key| std::env::var(key).ok(), file.as_ref())
    }

    pub fn resolve<F>(lookup: F, file: Option<&ConfigFile>) -> Result<Self, GraphError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let file_value = |select: fn(&ConfigFile) -> Option<&String>| {
            file.and_then(select)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let tenant_id = env_value(TENANT_ID_ENV)
            .or_else(|| file_value(|file| file.tenant_id.as_ref()))
            .ok_or_else(|| missing(TENANT_ID_ENV, "tenant_id"))?;
        let client_id = env_value(CLIENT_ID_ENV)
            .or_else(|| file_value(|file| file.client_id.as_ref()))
            .ok_or_else(|| missing(CLIENT_ID_ENV, "client_id"))?;
        let client_secret = env_value(CLIENT_SECRET_ENV)
            .or_else(|| file_value(|file| file.client_secret.as_ref()))
            .ok_or_else(|| missing(CLIENT_SECRET_ENV, "client_secret"))?;

        let mut config = Self::new(Credentials::new(tenant_id, client_id, client_secret));

        if let Some(api_base) =
            env_value(API_BASE_ENV).or_else(|| file_value(|file| file.api_base.as_ref()))
        {
            config = config.with_api_base(api_base);
        }

        if let Some(token_url) =
            env_value(TOKEN_URL_ENV).or_else(|| file_value(|file| file.token_url.as_ref()))
        {
            config = config.with_token_url(token_url);
        }

        let timeout_secs = match env_value(TIMEOUT_ENV) {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                GraphError::Config(format!("{TIMEOUT_ENV} must be a whole number of seconds"))
            })?),
            None => file.and_then(|file| file.timeout_secs),
        };
        if let Some(secs) = timeout_secs {
            if secs == 0 {
                return Err(GraphError::Config(
                    "request timeout must be at least one second".to_string(),
                ));
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn missing(env_key: &str, file_key: &str) -> GraphError {
    GraphError::Config(format!("missing {file_key} ({env_key} or config file)"))
}

/// On-disk configuration; every field is optional and overridden by the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base: Option<String>,
    pub token_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ConfigFile {
    pub fn load_optional(path: &Path) -> Result<Option<Self>, GraphError> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            GraphError::Config(format!("read config file {}: {error}", path.display()))
        })?;
        let parsed = serde_json::from_str(&raw).map_err(|error| {
            GraphError::Config(format!("parse config file {}: {error}", path.display()))
        })?;
        Ok(Some(parsed))
    }
}
