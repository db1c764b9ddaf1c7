//! WeChat Official Account token module.
//!
//! Provides the client, the unified error type and access_token acquisition
//! through the stable_token endpoint.
//!
//! Design:
//! - `OaClient` handles HTTP and maps the `{errcode, errmsg}` envelope to `Error`.
//! - Credentials are passed explicitly to every call.
//! - No caching: every call fetches a fresh token from the provider.
//!
//! Endpoint:
//! - POST https://api.weixin.qq.com/cgi-bin/stable_token
//!   body: {"grant_type": "client_credential", "appid": APPID, "secret": APPSECRET}
//!
//! Example:
//! ```ignore
//! use wxoa_rs::{Credentials, OaClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OaClient::default();
//!     let creds = Credentials::new("api.weixin.qq.com", "your_appid", "your_appsecret");
//!     let token = client.fetch_access_token(&creds).await?;
//!     println!("access_token length: {}", token.len());
//!     Ok(())
//! }
//! ```

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::credentials::Credentials;
use crate::envelope::Envelope;
use crate::errors;

const STABLE_TOKEN_PATH: &str = "/cgi-bin/stable_token";

const MAX_BODY_IN_ERROR: usize = 2048;

/// Successful stable_token response
#[derive(Clone, Debug, Deserialize)]
pub struct AccessToken {
    /// Access token string
    pub access_token: String,
    /// Expiration in seconds (0 when the provider omits it)
    #[serde(default)]
    pub expires_in: u32,
}

/// Body of POST /cgi-bin/stable_token
#[derive(Debug, Serialize)]
struct StableTokenRequest<'a> {
    grant_type: &'a str,
    appid: &'a str,
    secret: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    force_refresh: bool,
}

impl<'a> StableTokenRequest<'a> {
    fn new(credentials: &'a Credentials, force_refresh: bool) -> Self {
        Self {
            grant_type: "client_credential",
            appid: &credentials.appid,
            secret: &credentials.appsecret,
            force_refresh,
        }
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("failed to acquire access_token: {code}, {message}")]
    TokenAcquisition { code: i64, message: String },

    #[error("request error: {code}, {message}")]
    Request { code: i64, message: String },

    #[error("credential test failed (errcode {code:?}): {message}")]
    CredentialTest { code: Option<i64>, message: String },

    #[error("unexpected response (status {status}): {error}; body: {body}")]
    UnexpectedResponse {
        status: u16,
        error: String,
        body: String,
    },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}

impl Error {
    /// Provider errcode carried by this error, if any.
    pub fn errcode(&self) -> Option<i64> {
        match self {
            Error::TokenAcquisition { code, .. } | Error::Request { code, .. } => Some(*code),
            Error::CredentialTest { code, .. } => *code,
            _ => None,
        }
    }

    /// Build `UnexpectedResponse`, redacting `access_token` and truncating the body.
    pub(crate) fn unexpected(status: u16, error: impl ToString, bytes: &[u8]) -> Self {
        Error::UnexpectedResponse {
            status,
            error: error.to_string(),
            body: redact_body(bytes),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the WeChat Official Account API
///
/// - Wraps `reqwest::Client`
/// - Fetches a fresh token on every call (no caching)
#[derive(Clone, Debug)]
pub struct OaClient {
    pub(crate) http: reqwest::Client,
}

impl Default for OaClient {
    fn default() -> Self {
        let http = reqwest::Client::builder()
            .gzip(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http }
    }
}

impl OaClient {
    /// Use a custom `reqwest::Client` (timeouts, proxies, ...)
    pub fn with_http(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Fetch a fresh access_token string.
    pub async fn fetch_access_token(&self, credentials: &Credentials) -> Result<String> {
        self.get_stable_token(credentials, false)
            .await
            .map(|t| t.access_token)
    }

    /// Call /cgi-bin/stable_token and return the full token response.
    ///
    /// `force_refresh` is only sent when true; a forced refresh invalidates
    /// the previously issued token on the provider side.
    #[instrument(level = "debug", skip(self, credentials))]
    pub async fn get_stable_token(
        &self,
        credentials: &Credentials,
        force_refresh: bool,
    ) -> Result<AccessToken> {
        let (status, bytes) = self.post_stable_token(credentials, force_refresh).await?;

        let payload = match Envelope::from_slice(&bytes) {
            Ok(Envelope::Ok(_)) if !(200..300).contains(&status) => {
                return Err(Error::unexpected(status, "http status", &bytes));
            }
            Ok(Envelope::Ok(payload)) => payload,
            Ok(Envelope::Err { code, message }) => {
                warn!(
                    errcode = code,
                    hint = errors::hint_for(code),
                    "stable_token rejected"
                );
                return Err(Error::TokenAcquisition { code, message });
            }
            Err(de_err) => return Err(Error::unexpected(status, de_err, &bytes)),
        };

        let token: AccessToken = serde_json::from_value(payload)
            .map_err(|de_err| Error::unexpected(status, de_err, &bytes))?;
        debug!(
            token = %token_hint(&token.access_token),
            expires_in = token.expires_in,
            "got access_token"
        );
        Ok(token)
    }

    /// POST /cgi-bin/stable_token and return status + raw body.
    pub(crate) async fn post_stable_token(
        &self,
        credentials: &Credentials,
        force_refresh: bool,
    ) -> Result<(u16, Vec<u8>)> {
        let url = format!("{}{}", credentials.api_base(), STABLE_TOKEN_PATH);
        debug!(
            %url,
            appid = %appid_hint(&credentials.appid),
            "requesting stable access_token (no secrets)"
        );

        let resp = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(&StableTokenRequest::new(credentials, force_refresh))
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;
        let status = resp.status().as_u16();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;
        Ok((status, bytes.to_vec()))
    }
}

/// Shape-preserving hint for an appid, safe to log.
pub(crate) fn appid_hint(appid: &str) -> String {
    if appid.len() <= 4 {
        format!("{}***", appid)
    } else {
        let head = appid.get(..2).unwrap_or_default();
        let tail = appid.get(appid.len() - 2..).unwrap_or_default();
        format!("{}***{}", head, tail)
    }
}

/// First 20 characters of a token followed by "...".
pub(crate) fn token_hint(token: &str) -> String {
    let prefix: String = token.chars().take(20).collect();
    format!("{}...", prefix)
}

fn redact_body(bytes: &[u8]) -> String {
    let mut body = String::from_utf8_lossy(bytes).to_string();
    if let Ok(mut v) = serde_json::from_str::<serde_json::Value>(&body) {
        if let Some(obj) = v.as_object_mut() {
            if obj.contains_key("access_token") {
                obj.insert(
                    "access_token".to_string(),
                    serde_json::Value::String("[redacted]".into()),
                );
            }
        }
        if let Ok(s) = serde_json::to_string(&v) {
            body = s;
        }
    }
    if body.len() > MAX_BODY_IN_ERROR {
        let mut cut = MAX_BODY_IN_ERROR;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}
