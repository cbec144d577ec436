//! Blocking HTTP transport with bearer-token authentication.

use std::fmt;

use parking_lot::RwLock;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, trace};

use crate::config::{ClientConfig, join_url};
use crate::error::{ClientError, Result};
use crate::transport::{ApiRequest, ApiResponse, HttpMethod, Transport};

/// Tokens returned by the login endpoint.
#[derive(Clone, Default, Deserialize)]
struct Tokens {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokens")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// [`Transport`] over `reqwest`'s blocking client.
///
/// Requests carry `Authorization: Bearer <access token>` once
/// [`HttpTransport::login`] has succeeded.
#[derive(Debug)]
pub struct HttpTransport {
    config: ClientConfig,
    http: Client,
    base_url: String,
    tokens: RwLock<Tokens>,
}

impl HttpTransport {
    /// Build an unauthenticated transport.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] for invalid configuration and
    /// [`ClientError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder().timeout(config.timeout).build()?;
        let base_url = config.api_url();
        Ok(Self {
            config,
            http,
            base_url,
            tokens: RwLock::new(Tokens::default()),
        })
    }

    /// Build a transport and log in.
    ///
    /// # Errors
    ///
    /// See [`HttpTransport::new`] and [`HttpTransport::login`].
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let transport = Self::new(config)?;
        transport.login()?;
        Ok(transport)
    }

    /// Exchange the configured credentials for access and refresh tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Auth`] when the server rejects the credentials
    /// or returns no access token.
    pub fn login(&self) -> Result<()> {
        let body = json!({
            "username": self.config.username,
            "password": self.config.raw_password(),
            "provider": self.config.provider,
            "refresh": true,
        });
        let response = self.execute(&ApiRequest::post("security/login").with_json(body), None)?;
        let tokens: Tokens = auth_result(response)?.parse()?;
        if tokens.access_token.is_none() {
            return Err(ClientError::Auth("login returned no access token".to_string()));
        }
        info!(host = %self.config.host, username = %self.config.username, "logged in");
        *self.tokens.write() = tokens;
        Ok(())
    }

    /// Get a new access token with the refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Auth`] without a prior login or when the server
    /// rejects the refresh token.
    pub fn refresh(&self) -> Result<()> {
        let refresh_token = self
            .tokens
            .read()
            .refresh_token
            .clone()
            .ok_or_else(|| ClientError::Auth("no refresh token, log in first".to_string()))?;

        let response = self.execute(&ApiRequest::post("security/refresh"), Some(&refresh_token))?;
        let refreshed: Tokens = auth_result(response)?.parse()?;
        let Some(access_token) = refreshed.access_token else {
            return Err(ClientError::Auth("refresh returned no access token".to_string()));
        };
        debug!(host = %self.config.host, "access token refreshed");
        self.tokens.write().access_token = Some(access_token);
        Ok(())
    }

    /// Whether a login has succeeded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tokens.read().access_token.is_some()
    }

    /// Client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL of an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn execute(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse> {
        let url = self.url(&request.path);
        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
            HttpMethod::Put => self.http.put(&url),
            HttpMethod::Delete => self.http.delete(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        trace!(method = %request.method, url = %url, "sending request");
        let response = builder.send()?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes()?.to_vec();
        debug!(method = %request.method, path = %request.path, status, "response received");

        Ok(ApiResponse {
            status,
            content_type,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let token = self.tokens.read().access_token.clone();
        self.execute(&request, token.as_deref())
    }
}

fn auth_result(response: ApiResponse) -> Result<ApiResponse> {
    response.error_for_status().map_err(|err| match err {
        ClientError::Api { status, message } => ClientError::Auth(format!("{status}: {message}")),
        other => other,
    })
}
