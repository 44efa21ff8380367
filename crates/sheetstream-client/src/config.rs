use anyhow::Context;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sheetstream_core::{AccessMode, SheetId};
use std::env;
use std::fmt;
use std::time::Duration;

/// Everything except RFC 3986 unreserved characters gets escaped in a path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Wire constants of the remote spreadsheet API.
///
/// Endpoint templates are rendered from here so a client can be pointed at a
/// different API version or at a fixture server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Scheme and host, e.g. `https://sheets.googleapis.com`
    pub base_url: String,
    /// API version path segment
    pub version: String,
    /// How appended values are interpreted (`RAW` keeps text verbatim)
    pub value_input_option: String,
    /// Major dimension of value payloads
    pub major_dimension: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sheets.googleapis.com".to_string(),
            version: "v4".to_string(),
            value_input_option: "RAW".to_string(),
            major_dimension: "ROWS".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Prefix shared by every endpoint
    pub fn spreadsheets_root(&self) -> String {
        format!(
            "{}/{}/spreadsheets",
            self.base_url.trim_end_matches('/'),
            self.version
        )
    }

    /// `GET` container metadata
    pub fn spreadsheet_url(&self, container: &str) -> String {
        format!("{}/{}", self.spreadsheets_root(), encode_segment(container))
    }

    /// `POST` structural updates
    pub fn batch_update_url(&self, container: &str) -> String {
        format!("{}:batchUpdate", self.spreadsheet_url(container))
    }

    /// `GET` all values of a sheet
    pub fn values_url(&self, container: &str, sheet_name: &str) -> String {
        format!("{}?alt=json", self.values_base(container, sheet_name))
    }

    /// `POST` rows after the last populated row
    pub fn append_url(&self, container: &str, sheet_name: &str) -> String {
        format!(
            "{}:append?valueInputOption={}",
            self.values_base(container, sheet_name),
            self.value_input_option
        )
    }

    /// `POST` to clear all values of a sheet
    pub fn clear_url(&self, container: &str, sheet_name: &str) -> String {
        format!("{}:clear", self.values_base(container, sheet_name))
    }

    /// `POST` to copy a sheet into another (or the same) container
    pub fn copy_to_url(&self, container: &str, sheet_id: SheetId) -> String {
        format!("{}/sheets/{}:copyTo", self.spreadsheet_url(container), sheet_id)
    }

    fn values_base(&self, container: &str, sheet_name: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(container),
            encode_segment(sheet_name)
        )
    }
}

/// Percent-encode a container id or sheet name for use in a URL path
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Client configuration: API constants plus transport settings
#[derive(Clone)]
pub struct ClientConfig {
    pub api: ApiConfig,
    /// Bearer token with the read-write scope
    pub access_token: String,
    /// Bearer token with the read-only scope, if a separate one is issued
    pub read_only_access_token: Option<String>,
    /// Per-request timeout applied by the HTTP transport
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            api: ApiConfig::default(),
            access_token: access_token.into(),
            read_only_access_token: None,
            timeout: None,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = ApiConfig::default();
        let base_url = env::var("SHEETS_API_BASE_URL").unwrap_or(defaults.base_url);
        let version = env::var("SHEETS_API_VERSION").unwrap_or(defaults.version);
        let access_token =
            env::var("SHEETS_ACCESS_TOKEN").context("SHEETS_ACCESS_TOKEN must be set")?;
        let read_only_access_token = env::var("SHEETS_READONLY_ACCESS_TOKEN").ok();
        let timeout = match env::var("SHEETS_TIMEOUT_SECS") {
            Ok(secs) => Some(Duration::from_secs(
                secs.parse().context("SHEETS_TIMEOUT_SECS must be a number of seconds")?,
            )),
            Err(_) => None,
        };

        Ok(Self {
            api: ApiConfig {
                base_url,
                version,
                ..defaults
            },
            access_token,
            read_only_access_token,
            timeout,
        })
    }

    /// Read a `.env` file if present, then load from the environment
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Token to present for the given access mode
    pub fn token_for(&self, mode: AccessMode) -> &str {
        match (mode, &self.read_only_access_token) {
            (AccessMode::ReadOnly, Some(token)) => token,
            _ => &self.access_token,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api", &self.api)
            .field("access_token", &"<redacted>")
            .field(
                "read_only_access_token",
                &self.read_only_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}
