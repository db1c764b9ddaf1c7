//! The `{errcode, errmsg}` envelope.
//!
//! The provider reports failures inside an HTTP 200 body. Every response is
//! decoded once into `Envelope`: `errcode` absent or 0 is success and the
//! payload is kept unchanged, anything else is an error.

use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// Success; the full parsed body (including `errcode: 0` when present)
    Ok(Value),
    /// Non-zero errcode
    Err { code: i64, message: String },
}

impl Envelope {
    /// Parse a raw body (bytes or text) as JSON and classify it.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice::<Value>(bytes).map(Self::from_value)
    }

    pub fn from_value(body: Value) -> Self {
        let code = body.get("errcode").map_or(0, errcode_of);
        if code == 0 {
            return Envelope::Ok(body);
        }
        let message = body
            .get("errmsg")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Envelope::Err { code, message }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Envelope::Ok(_))
    }

    /// Convert into a `Result`, mapping the error arm with `f`.
    pub fn into_result<E>(self, f: impl FnOnce(i64, String) -> E) -> Result<Value, E> {
        match self {
            Envelope::Ok(payload) => Ok(payload),
            Envelope::Err { code, message } => Err(f(code, message)),
        }
    }
}

/// Code used when `errcode` is set but not an integer.
pub const UNPARSABLE_ERRCODE: i64 = -1;

// null, false, "" and 0 mean no error. Numeric strings are parsed; any other
// set value is a failure.
fn errcode_of(v: &Value) -> i64 {
    match v {
        Value::Null | Value::Bool(false) => 0,
        Value::Number(n) => match n.as_i64() {
            Some(code) => code,
            None if n.as_f64() == Some(0.0) => 0,
            None => UNPARSABLE_ERRCODE,
        },
        Value::String(s) if s.trim().is_empty() => 0,
        Value::String(s) => s.trim().parse().unwrap_or(UNPARSABLE_ERRCODE),
        _ => UNPARSABLE_ERRCODE,
    }
}
