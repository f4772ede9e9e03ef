//! Response normalization.
//!
//! The backend answers with varying shapes: a JSON object carrying a `reply`
//! string, one carrying an `output` string, some other JSON value, or plain
//! text. Callers get one canonical display string, chosen by a fixed
//! precedence: `reply` > `output` > pretty-printed dump > raw text. The
//! precedence is a contract with the backend and must not change.

use serde_json::Value;

/// How the raw body was interpreted. Tagged so tests and diagnostics can
/// see which branch fired, rather than probing fields opportunistically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NormalizedBody {
    /// Non-empty string `reply` field of a JSON object.
    Reply(String),
    /// Non-empty string `output` field of a JSON object.
    Output(String),
    /// Any other JSON value, pretty-printed wholesale.
    Dump(String),
    /// Non-JSON content type, or a JSON content type that failed to parse.
    Raw(String),
}

impl NormalizedBody {
    pub fn into_text(self) -> String {
        match self {
            NormalizedBody::Reply(s)
            | NormalizedBody::Output(s)
            | NormalizedBody::Dump(s)
            | NormalizedBody::Raw(s) => s,
        }
    }
}

fn non_empty_string_field(value: &Value, field: &str) -> Option<String> {
    match value.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Converts a raw response body into its canonical display form.
pub fn normalize(body: &str, content_type: Option<&str>) -> NormalizedBody {
    let is_json = content_type
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);
    if !is_json {
        return NormalizedBody::Raw(body.to_string());
    }

    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            // Declared JSON but isn't; treat the body as plain text.
            log::warn!("Response declared JSON but failed to parse: {}", e);
            return NormalizedBody::Raw(body.to_string());
        }
    };

    if let Some(reply) = non_empty_string_field(&parsed, "reply") {
        return NormalizedBody::Reply(reply);
    }
    if let Some(output) = non_empty_string_field(&parsed, "output") {
        return NormalizedBody::Output(output);
    }

    let dump = serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| body.to_string());
    NormalizedBody::Dump(dump)
}
