//! Newline-delimited JSON codec.
//!
//! Wire format:
//! ```text
//! <one compact JSON object>\n
//! ```
//! There is no length prefix and no framing beyond the newline.  Compact
//! `serde_json` output escapes any newline inside string values, so an encoded
//! message can never contain a raw `\n` before its terminator.
//!
//! Command decoding happens in two steps so that a bad line can still be
//! answered: the envelope (`id`, `type`) is read first from an untyped
//! [`serde_json::Value`], then the full typed payload.  An unknown `type` or a
//! malformed payload therefore produces a [`ProtocolError`] that still knows
//! which id to echo.

use thiserror::Error;

use crate::protocol::messages::{Command, Response, COMMAND_TYPES};

/// Errors that can occur while encoding or decoding a protocol line.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The line is not a JSON object at all.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The `type` field names no known command.
    #[error("unknown command: {kind}")]
    UnknownCommand { id: Option<String>, kind: String },

    /// The `type` is known but the payload does not fit it.
    #[error("invalid {kind} command: {reason}")]
    InvalidCommand {
        id: Option<String>,
        kind: String,
        reason: String,
    },

    /// Serialization failed.
    #[error("failed to encode message: {0}")]
    Encode(String),
}

impl ProtocolError {
    /// The correlation id recovered from the offending line, if any.
    pub fn command_id(&self) -> Option<&str> {
        match self {
            ProtocolError::UnknownCommand { id, .. } | ProtocolError::InvalidCommand { id, .. } => {
                id.as_deref()
            }
            ProtocolError::InvalidJson(_) | ProtocolError::Encode(_) => None,
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Command`] as one newline-terminated line.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use touch_core::protocol::{encode_command, Command, CommandKind};
///
/// let line = encode_command(&Command::with_id("s1", CommandKind::Shutdown)).unwrap();
/// assert_eq!(line, "{\"id\":\"s1\",\"type\":\"shutdown\"}\n");
/// ```
pub fn encode_command(cmd: &Command) -> Result<String, ProtocolError> {
    to_line(cmd)
}

/// Encodes a [`Response`] as one newline-terminated line.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode_response(resp: &Response) -> Result<String, ProtocolError> {
    to_line(resp)
}

/// Decodes one command line (surrounding whitespace is ignored).
///
/// # Errors
///
/// - [`ProtocolError::InvalidJson`] if the line is not a JSON object.
/// - [`ProtocolError::UnknownCommand`] if `type` is missing or unrecognised.
/// - [`ProtocolError::InvalidCommand`] if the payload does not match the type
///   (including a missing `id`).
pub fn decode_command(line: &str) -> Result<Command, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(line.trim())
        .map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
    if !value.is_object() {
        return Err(ProtocolError::InvalidJson(
            "expected a JSON object".to_string(),
        ));
    }

    let id = value
        .get("id")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();

    if !COMMAND_TYPES.contains(&kind.as_str()) {
        return Err(ProtocolError::UnknownCommand { id, kind });
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidCommand {
        id,
        kind,
        reason: e.to_string(),
    })
}

/// Decodes one response line (surrounding whitespace is ignored).
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidJson`] if the line is not a valid response.
pub fn decode_response(line: &str) -> Result<Response, ProtocolError> {
    serde_json::from_str(line.trim()).map_err(|e| ProtocolError::InvalidJson(e.to_string()))
}

fn to_line<T: serde::Serialize>(msg: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(msg).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{CommandKind, ResponseStatus};

    #[test]
    fn test_encode_command_has_exactly_one_trailing_newline() {
        // Arrange – text with an embedded newline must be escaped, not emitted raw
        let cmd = Command::with_id(
            "t",
            CommandKind::KeyType {
                text: "line1\nline2".to_string(),
            },
        );

        // Act
        let line = encode_command(&cmd).unwrap();

        // Assert
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_decode_command_unknown_type_keeps_id() {
        // Act
        let err = decode_command(r#"{"id":"x1","type":"pinch"}"#).unwrap_err();

        // Assert
        assert_eq!(
            err,
            ProtocolError::UnknownCommand {
                id: Some("x1".to_string()),
                kind: "pinch".to_string()
            }
        );
        assert_eq!(err.command_id(), Some("x1"));
        assert_eq!(err.to_string(), "unknown command: pinch");
    }

    #[test]
    fn test_decode_command_missing_type_is_unknown_command() {
        let err = decode_command(r#"{"id":"x2"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCommand { ref kind, .. } if kind.is_empty()));
    }

    #[test]
    fn test_decode_command_bad_payload_is_invalid_command() {
        // `x` must be an integer
        let err = decode_command(r#"{"id":"t1","type":"tap","x":"left","y":3}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidCommand { .. }));
        assert_eq!(err.command_id(), Some("t1"));
    }

    #[test]
    fn test_decode_command_rejects_non_object() {
        let err = decode_command("[1,2,3]").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidJson(_)));
        assert_eq!(err.command_id(), None);
    }

    #[test]
    fn test_decode_command_tolerates_surrounding_whitespace() {
        let cmd = decode_command("  {\"id\":\"d\",\"type\":\"double_tap\",\"x\":5,\"y\":6}\r\n")
            .unwrap();
        assert_eq!(cmd.kind, CommandKind::DoubleTap { x: 5, y: 6 });
    }

    #[test]
    fn test_decode_response_reads_status_and_message() {
        let resp =
            decode_response(r#"{"id":"k","status":"error","message":"keyboard unavailable"}"#)
                .unwrap();
        assert_eq!(resp.status, ResponseStatus::Error);
        assert_eq!(resp.message.as_deref(), Some("keyboard unavailable"));
    }

    #[test]
    fn test_decode_response_rejects_garbage() {
        assert!(decode_response("Warning: Permanently added host").is_err());
    }
}
