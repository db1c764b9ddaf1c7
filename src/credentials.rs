//! Official Account credential descriptor.
//!
//! Three required fields (base URL, appid, appsecret) plus a validation request
//! against /cgi-bin/stable_token.
//!
//! AppID and AppSecret are found on "微信公众平台 - 设置与开发 - 基本配置".
//!
//! Environment (see `Credentials::from_env`):
//! - WX_OA_BASE_URL (optional, default `api.weixin.qq.com`)
//! - WX_APPID
//! - WX_APPSECRET

use std::env;
use std::fmt;

use tracing::{debug, instrument, warn};

use crate::token::appid_hint;
use crate::{Error, OaClient, Result};

pub const DEFAULT_BASE_URL: &str = "api.weixin.qq.com";

const CREDENTIAL_TEST_FAILED: &str = "credential verification failed";

/// Declarative description of one credential field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CredentialField {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: Option<&'static str>,
    pub default: &'static str,
    pub required: bool,
}

const FIELDS: [CredentialField; 3] = [
    CredentialField {
        name: "baseUrl",
        display_name: "Base URL",
        description: None,
        default: DEFAULT_BASE_URL,
        required: true,
    },
    CredentialField {
        name: "appid",
        display_name: "Appid",
        description: Some(
            "第三方用户唯一凭证，AppID和AppSecret可在\"微信公众平台-设置与开发--基本配置\"页中获得",
        ),
        default: "",
        required: true,
    },
    CredentialField {
        name: "appsecret",
        display_name: "AppSecret",
        description: Some("第三方用户唯一凭证密钥"),
        default: "",
        required: true,
    },
];

/// Official Account credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Host of the API, e.g. `api.weixin.qq.com`. May carry an explicit scheme.
    pub base_url: String,
    pub appid: String,
    pub appsecret: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            appid: String::new(),
            appsecret: String::new(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("appid", &appid_hint(&self.appid))
            .field("appsecret", &"[redacted]")
            .finish()
    }
}

impl Credentials {
    pub fn new(
        base_url: impl Into<String>,
        appid: impl Into<String>,
        appsecret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            appid: appid.into(),
            appsecret: appsecret.into(),
        }
    }

    /// Field descriptors in display order.
    pub fn fields() -> &'static [CredentialField] {
        &FIELDS
    }

    /// Read WX_OA_BASE_URL / WX_APPID / WX_APPSECRET.
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("WX_OA_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let appid = env::var("WX_APPID")
            .map_err(|_| Error::InvalidCredentials("WX_APPID is not set".into()))?;
        let appsecret = env::var("WX_APPSECRET")
            .map_err(|_| Error::InvalidCredentials("WX_APPSECRET is not set".into()))?;
        let creds = Self::new(base_url, appid, appsecret);
        creds.validate()?;
        Ok(creds)
    }

    /// Every field is required; reject empty values.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in FIELDS
            .iter()
            .zip([&self.base_url, &self.appid, &self.appsecret])
        {
            if field.required && value.trim().is_empty() {
                return Err(Error::InvalidCredentials(format!(
                    "{} is required",
                    field.name
                )));
            }
        }
        if self.appid.starts_with("ww") {
            warn!(
                "appid starts with 'ww' (likely a WeCom corpid); Official Account APIs need the appid starting with 'wx'"
            );
        }
        Ok(())
    }

    /// `https://{base_url}`; an explicit http/https scheme is kept as-is.
    pub fn api_base(&self) -> String {
        let host = self.base_url.trim().trim_end_matches('/');
        if host.starts_with("https://") || host.starts_with("http://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }
}

impl OaClient {
    /// Probe the credentials against /cgi-bin/stable_token.
    ///
    /// Succeeds only when the response body carries `errcode` equal to 0.
    #[instrument(level = "debug", skip(self, credentials))]
    pub async fn test_credentials(&self, credentials: &Credentials) -> Result<()> {
        debug!(appid = %appid_hint(&credentials.appid), "testing credentials");
        let (status, bytes) = self.post_stable_token(credentials, false).await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|de_err| Error::unexpected(status, de_err, &bytes))?;

        let code = body.get("errcode").and_then(serde_json::Value::as_i64);
        if code == Some(0) {
            return Ok(());
        }
        let message = body
            .get("errmsg")
            .and_then(serde_json::Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(CREDENTIAL_TEST_FAILED)
            .to_string();
        warn!(errcode = ?code, "credential test failed");
        Err(Error::CredentialTest { code, message })
    }
}
