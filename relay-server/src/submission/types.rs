//! Submission payload types.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Raw contact-form body as posted by the browser.
///
/// Every field is optional, and a field holding a non-string JSON value is
/// treated as absent so that validation reports it as an invalid field.
///
/// Only a JSON object carries fields. An array body yields an empty request;
/// any other top-level value is rejected.
#[derive(Debug, Clone, Default)]
pub struct SubmissionRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    /// reCAPTCHA token from the client-side challenge
    pub token: Option<String>,
}

impl SubmissionRequest {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);

        SubmissionRequest {
            name: text("name"),
            email: text("email"),
            message: text("message"),
            token: text("token"),
        }
    }
}

impl<'de> Deserialize<'de> for SubmissionRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Object(fields) => Ok(SubmissionRequest::from_fields(&fields)),
            Value::Array(_) => Ok(SubmissionRequest::default()),
            other => Err(D::Error::custom(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A submission that passed every field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    /// Trimmed submitter name
    pub name: String,
    /// Submitter email, as submitted
    pub email: String,
    /// Trimmed message body
    pub message: String,
    /// Bot-check token
    pub token: String,
}
