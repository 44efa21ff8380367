use reqwest::blocking::Client;
use serde_json::Value;
use sheetstream_core::{AccessMode, SheetError};
use std::fmt;
use std::sync::Arc;

use crate::config::ClientConfig;

/// OAuth scope granting read access to spreadsheets
pub const READ_ONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
/// OAuth scope granting read and write access to spreadsheets
pub const READ_WRITE_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// OAuth scope a token must carry for the given access mode
pub fn oauth_scope(mode: AccessMode) -> &'static str {
    match mode {
        AccessMode::ReadOnly => READ_ONLY_SCOPE,
        AccessMode::ReadWrite => READ_WRITE_SCOPE,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// One call against the remote API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body,
        }
    }
}

/// Status line and raw body of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Authenticated request/response capability.
///
/// Implementations only move bytes; status handling is left to the caller.
pub trait Transport: fmt::Debug + Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, SheetError>;
}

/// Builds a transport holding credentials for an access mode
pub trait Connector: fmt::Debug + Send + Sync {
    fn connect(&self, mode: AccessMode) -> Result<Arc<dyn Transport>, SheetError>;
}

/// Blocking HTTP transport presenting a bearer token
pub struct HttpTransport {
    client: Client,
    token: String,
}

impl HttpTransport {
    pub fn new(token: impl Into<String>, config: &ClientConfig) -> Result<Self, SheetError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SheetError::transport_caused_by("could not build HTTP client", e))?;

        Ok(Self {
            client,
            token: token.into(),
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, SheetError> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        let builder = builder.bearer_auth(&self.token);
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder
            .send()
            .map_err(|e| {
                SheetError::transport_caused_by(format!("{} {}", request.method, request.url), e)
            })?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response
            .bytes()
            .map_err(|e| SheetError::transport_caused_by("could not read response body", e))?;

        Ok(ApiResponse {
            status: status.as_u16(),
            status_text,
            body: body.to_vec(),
        })
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Connector creating [`HttpTransport`]s from a [`ClientConfig`]
#[derive(Debug, Clone)]
pub struct HttpConnector {
    config: ClientConfig,
}

impl HttpConnector {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Connector for HttpConnector {
    fn connect(&self, mode: AccessMode) -> Result<Arc<dyn Transport>, SheetError> {
        tracing::debug!(scope = oauth_scope(mode), "building HTTP transport");
        let transport = HttpTransport::new(self.config.token_for(mode), &self.config)?;
        Ok(Arc::new(transport))
    }
}
