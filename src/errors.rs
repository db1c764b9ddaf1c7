//! Global Official Account errcode helpers
//!
//! Purpose
//! - Map well-known global errcode values to categories and hints
//! - Tell whether a fresh access_token would help
//! - Detect the "wrong json format" warning in errmsg
//!
//! Notes
//! - Make program logic depend on `errcode`, never on `errmsg`.
//! - Nothing here retries; callers decide what to do with the advice.
//! - Unknown codes are categorized as `Unknown` with a generic hint.

/// High-level classification for an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Success,
    /// System busy (errcode -1)
    TemporarySystem,
    /// Credential, token or IP whitelist problems
    Auth,
    /// Missing or malformed request parameters
    InvalidParam,
    /// Quota or frequency limits
    Limit,
    /// API not authorized for this account
    Unauthorized,
    Unknown,
}

/// A compact explanation for an errcode.
#[derive(Debug, Clone)]
pub struct ErrorHelp {
    pub code: i64,
    pub category: ErrorCategory,
    pub summary: &'static str,
    pub hint: &'static str,
    /// Whether re-fetching the access_token can fix the error
    pub refresh_token: bool,
}

/// Returns a hint for a known errcode.
pub fn hint_for(code: i64) -> &'static str {
    match code {
        -1 => "System busy; try again later.",
        0 => "Success.",
        40001 => {
            "Invalid AppSecret or access_token; verify the AppSecret and that the token belongs to this appid."
        }
        40002 => "Invalid grant_type; stable_token expects 'client_credential'.",
        40013 => "Invalid appid; Official Account appids start with 'wx'.",
        40125 => "Invalid appsecret; reset it on the platform if it was rotated.",
        40164 => "Caller IP is not in the API IP whitelist; add it under 基本配置.",
        41002 => "appid missing from the request.",
        41004 => "secret missing from the request.",
        42001 => "access_token expired; fetch a new one.",
        45009 => "Daily API quota reached; wait for the reset or clear the quota on the platform.",
        45011 => "API called too frequently; slow down.",
        48001 => "API not authorized for this account; check account type and permissions.",
        89503 => "Call requires administrator confirmation on the platform.",
        _ => "Unknown code; refer to official docs and logs for details.",
    }
}

/// Classify errcode into a category.
pub fn category_for(code: i64) -> ErrorCategory {
    match code {
        0 => ErrorCategory::Success,
        -1 => ErrorCategory::TemporarySystem,
        40001 | 40013 | 40125 | 40164 | 42001 | 89503 => ErrorCategory::Auth,
        40002 | 41002 | 41004 => ErrorCategory::InvalidParam,
        45009 | 45011 => ErrorCategory::Limit,
        48001 => ErrorCategory::Unauthorized,
        _ => ErrorCategory::Unknown,
    }
}

/// Whether a freshly fetched access_token can fix this code.
pub fn should_refresh_token(code: i64) -> bool {
    matches!(code, 40001 | 42001)
}

/// Build a structured help object for a given errcode.
pub fn lookup(code: i64) -> ErrorHelp {
    let summary = match code {
        -1 => "System busy",
        0 => "Success",
        40001 => "Invalid credential",
        40002 => "Invalid grant_type",
        40013 => "Invalid appid",
        40125 => "Invalid appsecret",
        40164 => "IP not whitelisted",
        41002 => "Missing appid",
        41004 => "Missing secret",
        42001 => "access_token expired",
        45009 => "Daily quota exceeded",
        45011 => "Frequency limit",
        48001 => "API unauthorized",
        89503 => "Admin confirmation required",
        _ => "Unknown error",
    };
    ErrorHelp {
        code,
        category: category_for(code),
        summary,
        hint: hint_for(code),
        refresh_token: should_refresh_token(code),
    }
}

/// One-line, human-readable explanation.
pub fn explain(errcode: i64, errmsg: &str) -> String {
    let help = lookup(errcode);
    let mut parts = vec![
        format!("errcode={} ({:?})", help.code, help.category),
        help.summary.to_string(),
        format!("hint: {}", help.hint),
    ];
    if help.refresh_token {
        parts.push("refresh_token: yes".to_string());
    } else {
        parts.push("refresh_token: no".to_string());
    }
    if contains_wrong_json_format(errmsg) {
        parts.push("detected: wrong json format; validate the request body".to_string());
    }
    parts.join(" | ")
}

/// Detect "Warning: wrong json format." in errmsg (case-insensitive).
pub fn contains_wrong_json_format(errmsg: &str) -> bool {
    errmsg
        .to_ascii_lowercase()
        .contains("warning: wrong json format")
}
