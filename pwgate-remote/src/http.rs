//! Shared HTTP plumbing for both API generations.

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use pwgate_core::ConnectionConfig;

use crate::error::ApiError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How a request authenticates.
#[derive(Clone, Copy)]
pub enum Auth<'a> {
    None,
    /// A named header carrying the raw token.
    Header(&'static str, &'a str),
    Bearer(&'a str),
}

/// A `reqwest` client bound to one API base URL.
pub struct HttpClient {
    http: reqwest::Client,
    base: String,
}

impl HttpClient {
    /// Build a client for `{server}{api_prefix}`. A server URL that already
    /// ends with the prefix is used as is.
    pub fn new(config: &ConnectionConfig, api_prefix: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("pwgate/{}", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        let server = config.server.trim_end_matches('/');
        let base = if server.ends_with(api_prefix) {
            server.to_string()
        } else {
            format!("{server}{api_prefix}")
        };

        if !config.verify_tls {
            debug!(base = %base, "TLS certificate verification disabled");
        }

        Ok(Self { http, base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Send one request and return the body of a 2xx response.
    ///
    /// 401 becomes [`ApiError::Unauthorized`], any other non-2xx
    /// [`ApiError::Status`] with the body verbatim.
    pub async fn send<B>(
        &self,
        method: Method,
        path: &str,
        auth: Auth<'_>,
        query: &[(String, String)],
        body: Option<&B>,
    ) -> Result<String, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{path}", self.base);
        debug!(method = %method, path, "request");

        let mut req = self.http.request(method.clone(), &url);
        req = match auth {
            Auth::None => req,
            Auth::Header(name, token) => req.header(name, token),
            Auth::Bearer(token) => req.bearer_auth(token),
        };
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        trace!(method = %method, path, status = status.as_u16(), "response");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized {
                status: status.as_u16(),
                body: text,
            });
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

/// Parse a response body.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Parse(e.to_string()))
}

/// What a create or update call answers with: the entity itself, or only
/// its ID (bare or as `{"id": ...}`), in which case the caller fetches it.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum Created<T> {
    Entity(T),
    Ref { id: String },
    Id(String),
}

/// A token that can be taken away exactly once, on release.
pub struct TokenSlot(Mutex<Option<Zeroizing<String>>>);

impl TokenSlot {
    pub fn new(token: Zeroizing<String>) -> Self {
        Self(Mutex::new(Some(token)))
    }

    /// A copy of the token, or [`ApiError::Released`].
    pub async fn get(&self) -> Result<Zeroizing<String>, ApiError> {
        self.0.lock().await.clone().ok_or(ApiError::Released)
    }

    /// Remove the token. `None` if it was already gone.
    pub async fn take(&self) -> Option<Zeroizing<String>> {
        self.0.lock().await.take()
    }
}

impl std::fmt::Debug for TokenSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenSlot([redacted])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwgate_core::ConnectionParams;

    fn config(server: &str) -> ConnectionConfig {
        ConnectionParams {
            api_server: Some(server.to_string()),
            access_token: Some(zeroize::Zeroizing::new("t".to_string())),
            ..ConnectionParams::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn base_url_appends_prefix_once() {
        let c = HttpClient::new(&config("https://pw.example.com/"), "/api/v1").unwrap();
        assert_eq!(c.base(), "https://pw.example.com/api/v1");
        let c = HttpClient::new(&config("https://pw.example.com/api/v1"), "/api/v1").unwrap();
        assert_eq!(c.base(), "https://pw.example.com/api/v1");
    }

    #[test]
    fn decode_reports_parse_errors() {
        #[derive(serde::Deserialize)]
        struct Id {
            #[allow(dead_code)]
            id: String,
        }
        assert!(decode::<Id>(r#"{"id":"x"}"#).is_ok());
        assert!(matches!(decode::<Id>("<html>"), Err(ApiError::Parse(_))));
    }

    #[test]
    fn created_accepts_entity_or_id() {
        #[derive(serde::Deserialize)]
        struct Named {
            name: String,
        }
        match decode::<Created<Named>>(r#"{"name":"x"}"#).unwrap() {
            Created::Entity(n) => assert_eq!(n.name, "x"),
            _ => panic!("expected entity"),
        }
        assert!(matches!(
            decode::<Created<Named>>(r#"{"id":"abc"}"#).unwrap(),
            Created::Ref { id } if id == "abc"
        ));
        assert!(matches!(
            decode::<Created<Named>>(r#""abc""#).unwrap(),
            Created::Id(id) if id == "abc"
        ));
    }

    #[tokio::test]
    async fn token_slot_releases_once() {
        let slot = TokenSlot::new(Zeroizing::new("tok".to_string()));
        assert_eq!(slot.get().await.unwrap().as_str(), "tok");
        assert!(slot.take().await.is_some());
        assert!(slot.take().await.is_none());
        assert!(matches!(slot.get().await, Err(ApiError::Released)));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connect_or_http_error() {
        let c = HttpClient::new(&config("http://127.0.0.1:9"), "/api/v1").unwrap();
        let err = c
            .send::<()>(Method::GET, "/vaults", Auth::None, &[], None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Connect(_) | ApiError::Http(_) | ApiError::Timeout
        ));
    }
}
