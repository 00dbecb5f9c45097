//! The `{code, msg, data}` response envelope shared by every backend call.
//!
//! A call succeeds only when the HTTP status is 2xx and `code` is zero. On
//! success `data` is decoded into the caller's type (a missing `data` decodes
//! as JSON `null`, so `()` and `Option<T>` outputs work unchanged). On failure
//! the envelope is turned into `ApiError::Api`, carrying a bind conflict when
//! `data` describes one.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use studio_types::error::{ApiError, BindConflict};

#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Decode a raw response body received with `status`.
pub fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, ApiError> {
    let envelope = match serde_json::from_slice::<Envelope>(body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(ApiError::Api {
                code: i64::from(status.as_u16()),
                message: status_message(status, body),
                conflict: None,
            });
        }
        Err(e) => return Err(ApiError::Decode(format!("invalid envelope: {e}"))),
    };

    if !status.is_success() || envelope.code != 0 {
        let code = if envelope.code != 0 {
            envelope.code
        } else {
            i64::from(status.as_u16())
        };
        let message = if envelope.msg.is_empty() {
            status_message(status, &[])
        } else {
            envelope.msg
        };
        return Err(ApiError::Api {
            code,
            message,
            conflict: envelope.data.and_then(conflict_from),
        });
    }

    serde_json::from_value(envelope.data.unwrap_or(Value::Null))
        .map_err(|e| ApiError::Decode(format!("invalid data: {e}")))
}

fn status_message(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() {
        return text.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}

fn conflict_from(data: Value) -> Option<BindConflict> {
    let conflict: BindConflict = serde_json::from_value(data).ok()?;
    let any = conflict.entity_id.is_some()
        || conflict.entity_name.is_some()
        || conflict.space_name.is_some();
    any.then_some(conflict)
}
