use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Duration used when the request omits `duration_seconds` or cannot be read.
pub const DEFAULT_DURATION_SECS: f64 = 1.0;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("duration_seconds must be a non-negative finite number, got {0}")]
    InvalidDuration(String),
}

/// Input read from stdin: how long to track, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackRequest {
    pub duration_seconds: f64,
}

impl Default for TrackRequest {
    fn default() -> Self {
        Self {
            duration_seconds: DEFAULT_DURATION_SECS,
        }
    }
}

impl TrackRequest {
    pub fn new(duration_seconds: f64) -> Self {
        Self { duration_seconds }
    }

    /// Parses a request object.
    ///
    /// `duration_seconds` may be a number or a numeric string. A missing
    /// field yields [`DEFAULT_DURATION_SECS`]; any other shape is an error.
    pub fn from_json(s: &str) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_str(s)?;
        let Value::Object(fields) = value else {
            return Err(RequestError::NotAnObject(json_kind(&value)));
        };

        match fields.get("duration_seconds") {
            None => Ok(Self::default()),
            Some(raw) => parse_duration(raw).map(Self::new),
        }
    }

    /// Like [`TrackRequest::from_json`], but any error falls back to the default.
    pub fn from_json_or_default(s: &str) -> Self {
        Self::from_json(s).unwrap_or_default()
    }
}

fn parse_duration(raw: &Value) -> Result<f64, RequestError> {
    let secs = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match secs {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(RequestError::InvalidDuration(raw.to_string())),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_duration() {
        let req = TrackRequest::from_json(r#"{"duration_seconds": 2.5}"#).unwrap();
        assert_eq!(req.duration_seconds, 2.5);

        let req = TrackRequest::from_json(r#"{"duration_seconds": 3}"#).unwrap();
        assert_eq!(req.duration_seconds, 3.0);
    }

    #[test]
    fn test_string_duration() {
        let req = TrackRequest::from_json(r#"{"duration_seconds": " 0.75 "}"#).unwrap();
        assert_eq!(req.duration_seconds, 0.75);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let req = TrackRequest::from_json(r#"{"other": 5}"#).unwrap();
        assert_eq!(req.duration_seconds, DEFAULT_DURATION_SECS);
    }

    #[test]
    fn test_rejected_inputs() {
        assert!(matches!(
            TrackRequest::from_json("not json"),
            Err(RequestError::Json(_))
        ));
        assert!(matches!(
            TrackRequest::from_json("[1, 2]"),
            Err(RequestError::NotAnObject("an array"))
        ));
        assert!(matches!(
            TrackRequest::from_json(r#"{"duration_seconds": -4}"#),
            Err(RequestError::InvalidDuration(_))
        ));
        assert!(matches!(
            TrackRequest::from_json(r#"{"duration_seconds": null}"#),
            Err(RequestError::InvalidDuration(_))
        ));
        assert!(matches!(
            TrackRequest::from_json(r#"{"duration_seconds": "soon"}"#),
            Err(RequestError::InvalidDuration(_))
        ));
        assert!(matches!(
            TrackRequest::from_json(r#"{"duration_seconds": "inf"}"#),
            Err(RequestError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_default_on_error() {
        assert_eq!(TrackRequest::from_json_or_default("").duration_seconds, 1.0);
        assert_eq!(
            TrackRequest::from_json_or_default(r#"{"duration_seconds": true}"#).duration_seconds,
            1.0
        );
        assert_eq!(
            TrackRequest::from_json_or_default(r#"{"duration_seconds": false}"#).duration_seconds,
            1.0
        );
    }
}
