//! Request/response types and the transport boundary.
//!
//! Everything above this module talks to the server through [`Transport`].
//! Paths are relative to the API base (`chart/12`, `dashboard/export`); the
//! transport owns the host, the API prefix and authentication.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// HTTP verbs used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Upper-case verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request against the REST API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Verb.
    pub method: HttpMethod,
    /// Path below the API base.
    pub path: String,
    /// Query string parameters.
    pub query: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Request with no parameters or body.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// GET `path`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// POST `path`.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// PUT `path`.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// DELETE `path`.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Add a query string parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set the JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of the query parameter `key`.
    #[must_use]
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A response from the REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Response with a JSON body.
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string().into_bytes(),
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] for malformed bodies.
    pub fn value(&self) -> Result<Value> {
        if self.body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Parse the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] when the body does not match.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn non-2xx responses into [`ClientError::Api`].
    ///
    /// The message is the body's `message` field, else its `errors` field
    /// encoded as JSON, else the raw body text.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] for non-2xx statuses.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(ClientError::Api {
            status: self.status,
            message: self.error_message(),
        })
    }

    fn error_message(&self) -> String {
        if let Ok(body) = serde_json::from_slice::<Value>(&self.body) {
            match body.get("message") {
                Some(Value::String(message)) => return message.clone(),
                Some(message) if !message.is_null() => return message.to_string(),
                _ => {}
            }
            if let Some(errors) = body.get("errors") {
                return errors.to_string();
            }
        }
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Authenticated access to the REST API.
pub trait Transport: fmt::Debug + Send + Sync {
    /// Send one request and return the raw response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] when no response was received.
    fn send(&self, request: ApiRequest) -> Result<ApiResponse>;

    /// GET `path` and fail on non-2xx.
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse> {
        let mut request = ApiRequest::get(path);
        for (key, value) in query {
            request = request.with_query(*key, value.clone());
        }
        self.send(request)?.error_for_status()
    }

    /// POST a JSON body to `path` and fail on non-2xx.
    fn post(&self, path: &str, body: Value) -> Result<ApiResponse> {
        self.send(ApiRequest::post(path).with_json(body))?
            .error_for_status()
    }

    /// PUT a JSON body to `path` and fail on non-2xx.
    fn put(&self, path: &str, body: Value) -> Result<ApiResponse> {
        self.send(ApiRequest::put(path).with_json(body))?
            .error_for_status()
    }

    /// DELETE `path` and fail on non-2xx.
    fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::delete(path))?.error_for_status()
    }
}
