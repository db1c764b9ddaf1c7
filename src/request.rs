//! Authenticated request dispatch.
//!
//! Every call:
//! 1. resolves the URL against `https://{base_url}`
//! 2. fetches a fresh access_token (unless `skip_token` is set)
//! 3. sets the `access_token` query parameter (overwriting any existing one)
//! 4. sends the request
//! 5. decodes the `{errcode, errmsg}` envelope
//!
//! Example:
//! ```ignore
//! use wxoa_rs::{Credentials, OaClient, RequestOptions};
//!
//! let client = OaClient::default();
//! let creds = Credentials::new("api.weixin.qq.com", "wx...", "secret...");
//! let info = client
//!     .dispatch(&creds, RequestOptions::get("/cgi-bin/user/info").query("openid", "OPENID"))
//!     .await?;
//! println!("nickname: {}", info["nickname"]);
//! ```

use std::collections::BTreeMap;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::envelope::Envelope;
use crate::token::{appid_hint, token_hint};
use crate::{Credentials, Error, OaClient, Result, errors};

pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Request body variants
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    /// application/x-www-form-urlencoded
    Form(Vec<(String, String)>),
    /// Pre-encoded body, e.g. a hand-built multipart/form-data payload
    Raw {
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// Options for one outbound call
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL
    pub url: String,
    pub qs: BTreeMap<String, String>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    /// Do not fetch/attach a token (used for the token endpoint itself)
    pub skip_token: bool,
}

impl RequestOptions {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            qs: BTreeMap::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            skip_token: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.qs.insert(key.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    pub fn raw(mut self, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.body = RequestBody::Raw {
            content_type: content_type.into(),
            bytes,
        };
        self
    }

    pub fn skip_token(mut self, skip: bool) -> Self {
        self.skip_token = skip;
        self
    }

    /// Merge `access_token` into the query map.
    pub(crate) fn attach_token(&mut self, token: &str) {
        self.qs
            .insert(ACCESS_TOKEN_PARAM.to_string(), token.to_string());
    }

    pub(crate) fn resolve_url(&self, base_url: &str) -> String {
        if self.url.starts_with("https://") || self.url.starts_with("http://") {
            return self.url.clone();
        }
        if self.url.starts_with('/') {
            format!("{}{}", base_url, self.url)
        } else {
            format!("{}/{}", base_url, self.url)
        }
    }
}

/// Status and raw bytes of a response, before envelope decoding
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON and map a non-zero errcode to `Error::Request`.
    ///
    /// A non-2xx status without an errcode in the body is `UnexpectedResponse`.
    pub fn into_json(self) -> Result<Value> {
        let envelope = match Envelope::from_slice(&self.body) {
            Ok(envelope) => envelope,
            Err(de_err) if self.is_success() => {
                return Err(Error::unexpected(self.status, de_err, &self.body));
            }
            Err(_) => return Err(Error::unexpected(self.status, "http status", &self.body)),
        };
        match envelope {
            Envelope::Err { code, message } => {
                warn!(errcode = code, hint = errors::hint_for(code), "request rejected");
                Err(Error::Request { code, message })
            }
            Envelope::Ok(_) if !self.is_success() => {
                warn!(status = self.status, "request failed with http status");
                Err(Error::unexpected(self.status, "http status", &self.body))
            }
            Envelope::Ok(payload) => Ok(payload),
        }
    }
}

impl OaClient {
    /// Send the request with a freshly fetched token and return the raw response.
    #[instrument(level = "debug", skip(self, credentials, options), fields(method = %options.method, url = %options.url))]
    pub async fn origin_request(
        &self,
        credentials: &Credentials,
        mut options: RequestOptions,
    ) -> Result<RawResponse> {
        let base_url = credentials.api_base();

        if !options.skip_token {
            debug!(appid = %appid_hint(&credentials.appid), "fetching new access_token");
            let token = self.fetch_access_token(credentials).await?;
            debug!(token = %token_hint(&token), "attaching access_token");
            options.attach_token(&token);
        }

        let url = options.resolve_url(&base_url);
        let mut req = self.http.request(options.method.clone(), &url);
        if !options.qs.is_empty() {
            req = req.query(&options.qs);
        }
        for (name, value) in &options.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        req = match options.body {
            RequestBody::Empty => req,
            RequestBody::Json(body) => req.json(&body),
            RequestBody::Form(fields) => req.form(&fields),
            RequestBody::Raw {
                content_type,
                bytes,
            } => req.header(CONTENT_TYPE, content_type).body(bytes),
        };

        // reqwest errors carry the URL, which includes the token
        let resp = req
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Http(e.without_url()))?
            .to_vec();
        debug!(status, len = body.len(), "response received");

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    /// Authenticated call returning the parsed body; non-zero errcode fails.
    pub async fn dispatch(
        &self,
        credentials: &Credentials,
        options: RequestOptions,
    ) -> Result<Value> {
        self.origin_request(credentials, options).await?.into_json()
    }

    /// Like `dispatch`, decoding the successful payload into `T`.
    pub async fn dispatch_as<T: DeserializeOwned>(
        &self,
        credentials: &Credentials,
        options: RequestOptions,
    ) -> Result<T> {
        let raw = self.origin_request(credentials, options).await?;
        let status = raw.status;
        let body = raw.body.clone();
        let value = raw.into_json()?;
        serde_json::from_value(value).map_err(|de_err| Error::unexpected(status, de_err, &body))
    }
}
