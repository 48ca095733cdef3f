use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::pagination::{Page, PageSource};
use crate::client::token::{AccessToken, TokenProvider};
use crate::config::GraphConfig;
use crate::error::GraphError;

const CLIENT_REQUEST_ID: &str = "client-request-id";

/// A fully read Graph response. Status policy is left to the caller except
/// for 401, which the gateway handles itself.
#[derive(Debug, Clone)]
pub struct GraphResponse {
    status: StatusCode,
    body: String,
}

impl GraphResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// 200 OK or 202 Accepted.
    pub fn is_success(&self) -> bool {
        matches!(self.status, StatusCode::OK | StatusCode::ACCEPTED)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GraphError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn error(&self, context: &str) -> GraphError {
        GraphError::status(self.status, context, &self.body)
    }
}

pub struct HttpGateway {
    http: Client,
    tokens: TokenProvider,
    api_base: String,
}

impl HttpGateway {
    pub fn new(http: Client, tokens: TokenProvider, api_base: impl Into<String>) -> Self {
        Self {
            http,
            tokens,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Builds the HTTP client with the configured timeout and acquires the
    /// first app token.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| GraphError::Transport {
                url: config.api_base.clone(),
                source,
            })?;
        let tokens =
            TokenProvider::acquire_new(http.clone(), config.credentials.clone(), &config.token_url)
                .await?;
        Ok(Self::new(http, tokens, &config.api_base))
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// Joins percent-encoded path segments onto the API base.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, GraphError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|error| GraphError::Config(format!("invalid api base {}: {error}", self.api_base)))?;
        url.path_segments_mut()
            .map_err(|_| GraphError::Config(format!("api base {} cannot carry a path", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Like [`endpoint`](Self::endpoint) with query parameters appended.
    /// Values are form-encoded, so `+` and `&` inside a `$filter` survive.
    pub fn endpoint_with_query<K, V>(
        &self,
        segments: &[&str],
        params: &[(K, V)],
    ) -> Result<String, GraphError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut url = self.endpoint(segments)?;
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key.as_ref(), value.as_ref());
            }
        }
        Ok(url.to_string())
    }

    pub async fn get(&self, url: &str) -> Result<GraphResponse, GraphError> {
        self.execute(Method::GET, url, None, &[]).await
    }

    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<GraphResponse, GraphError> {
        self.execute(Method::GET, url, None, headers).await
    }

    pub async fn post<T>(&self, url: &str, payload: &T) -> Result<GraphResponse, GraphError>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(payload)?;
        self.execute(Method::POST, url, Some(body), &[]).await
    }

    /// GET returning decoded JSON. With `unwrap_value` the `value` array of
    /// the collection envelope is returned (empty when absent). A 200 whose
    /// body is not JSON yields `Value::Null`; any other status is an error.
    pub async fn get_json_response(
        &self,
        url: &str,
        unwrap_value: bool,
    ) -> Result<Value, GraphError> {
        let response = self.get(url).await?;
        if response.status() != StatusCode::OK {
            return Err(response.error(&format!("error fetching data from {url}")));
        }

        let decoded: Value = match serde_json::from_str(response.text()) {
            Ok(decoded) => decoded,
            Err(error) => {
                warn!(%url, %error, "invalid JSON in graph response");
                return Ok(Value::Null);
            }
        };

        if !unwrap_value {
            return Ok(decoded);
        }

        Ok(match decoded {
            Value::Object(mut map) => map
                .remove("value")
                .filter(Value::is_array)
                .unwrap_or_else(|| Value::Array(Vec::new())),
            _ => Value::Array(Vec::new()),
        })
    }

    /// Single-page collection read through [`get_json_response`](Self::get_json_response).
    pub async fn get_collection(&self, url: &str) -> Result<Vec<Value>, GraphError> {
        match self.get_json_response(url, true).await? {
            Value::Array(items) => Ok(items),
            _ => Ok(Vec::new()),
        }
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        extra_headers: &[(&str, &str)],
    ) -> Result<GraphResponse, GraphError> {
        let token = self.tokens.current().await;
        let first = self
            .send_once(method.clone(), url, body.as_deref(), extra_headers, &token)
            .await?;
        if first.status() != StatusCode::UNAUTHORIZED {
            return Ok(first);
        }

        warn!(%method, %url, "graph returned 401; refreshing token and retrying once");
        let fresh = self.tokens.refresh_if_current(&token).await?;
        let retried = self
            .send_once(method, url, body.as_deref(), extra_headers, &fresh)
            .await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            return Err(GraphError::Unauthorized {
                url: url.to_string(),
                body: crate::error::redact_response_body(retried.text()),
            });
        }
        Ok(retried)
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
        extra_headers: &[(&str, &str)],
        token: &AccessToken,
    ) -> Result<GraphResponse, GraphError> {
        let request_id = Uuid::new_v4().to_string();
        let headers = build_headers(token, &request_id, extra_headers)?;

        let mut request = self.http.request(method.clone(), url).headers(headers);
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = request.send().await.map_err(|source| GraphError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|source| GraphError::Transport {
            url: url.to_string(),
            source,
        })?;

        debug!(%method, %url, %request_id, status = status.as_u16(), "graph request");
        Ok(GraphResponse { status, body: text })
    }
}

fn build_headers(
    token: &AccessToken,
    request_id: &str,
    extra_headers: &[(&str, &str)],
) -> Result<HeaderMap, GraphError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token.secret()))
            .map_err(|_| GraphError::validation("access token", "not a valid header value"))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static(CLIENT_REQUEST_ID),
        HeaderValue::from_str(request_id)
            .map_err(|_| GraphError::validation("client-request-id", "not a valid header value"))?,
    );

    for (name, value) in extra_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|error| GraphError::validation("header name", format!("{name}: {error}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|error| GraphError::validation("header value", error.to_string()))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

#[async_trait(?Send)]
impl PageSource for HttpGateway {
    async fn fetch_page(&self, url: &str) -> Result<Page, GraphError> {
        let response = self.get(url).await?;
        if response.status() != StatusCode::OK {
            return Err(response.error(&format!("error fetching page {url}")));
        }
        response.json()
    }
}
