//! Command and response messages exchanged between host and daemon.
//!
//! Every message is a single JSON object.  Commands carry a caller-chosen
//! correlation `id` and a `type` discriminant; all other fields are flattened
//! into the same object:
//!
//! ```json
//! {"id":"tap-1","type":"tap","x":100,"y":200,"duration_ms":50}
//! {"id":"tap-1","status":"ok"}
//! ```
//!
//! # Why a struct around an enum?
//!
//! The `id` is common to every command, while the payload differs per kind.
//! Keeping the id on the outer [`Command`] struct and the payload on the
//! closed [`CommandKind`] enum means the engine can match exhaustively on the
//! kind (adding a new gesture is a compile error until every `match` handles
//! it) without repeating the id field in every variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::screen::ScreenSize;

/// Every `type` discriminant the engine understands.
pub const COMMAND_TYPES: &[&str] = &[
    "init",
    "tap",
    "swipe",
    "long_press",
    "double_tap",
    "key_press",
    "key_type",
    "shutdown",
];

/// A typed request sent from the host to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Correlation token, unique per session.  Echoed back in the [`Response`].
    pub id: String,
    /// The command payload.
    #[serde(flatten)]
    pub kind: CommandKind,
}

/// Payload of a [`Command`], discriminated by the JSON `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    /// Handshake: create or discover the input devices.
    ///
    /// Absent (or non-positive) dimensions ask the engine to auto-detect the
    /// screen size.
    Init {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        screen_width: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        screen_height: Option<u32>,
    },

    /// Short touch at a point.
    Tap {
        x: i32,
        y: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },

    /// Touch down at (`x`, `y`), move to (`x2`, `y2`), release.
    Swipe {
        x: i32,
        y: i32,
        x2: i32,
        y2: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        steps: Option<u32>,
    },

    /// Touch held at a point for a longer duration.
    LongPress {
        x: i32,
        y: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },

    /// Two taps in quick succession with fixed timings.
    DoubleTap { x: i32, y: i32 },

    /// A single key chord: modifiers held around one key.
    KeyPress {
        key: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        modifiers: Vec<String>,
    },

    /// Type a string character by character.
    KeyType { text: String },

    /// Acknowledge and stop the engine's read loop.
    Shutdown,
}

impl CommandKind {
    /// The wire `type` discriminant for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Init { .. } => "init",
            CommandKind::Tap { .. } => "tap",
            CommandKind::Swipe { .. } => "swipe",
            CommandKind::LongPress { .. } => "long_press",
            CommandKind::DoubleTap { .. } => "double_tap",
            CommandKind::KeyPress { .. } => "key_press",
            CommandKind::KeyType { .. } => "key_type",
            CommandKind::Shutdown => "shutdown",
        }
    }
}

impl Command {
    /// Builds a command with an explicit correlation id.
    pub fn with_id(id: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// Builds a command with a fresh id of the form `<type>-<uuid>`.
    pub fn new(kind: CommandKind) -> Self {
        let id = format!("{}-{}", kind.name(), Uuid::new_v4().simple());
        Self { id, kind }
    }
}

/// Outcome reported by the engine for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Successful `init`.
    Ready,
    /// Successful action.
    Ok,
    /// Anything that went wrong on the remote side.
    Error,
}

/// A reply from the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Echo of [`Command::id`].
    pub id: String,
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Resolved logical screen width (only on `init`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,
    /// Resolved logical screen height (only on `init`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,
}

impl Response {
    /// A bare `ok` response.
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ResponseStatus::Ok,
            message: None,
            screen_width: None,
            screen_height: None,
        }
    }

    /// A `ready` handshake response carrying the resolved screen size.
    pub fn ready(id: impl Into<String>, screen: ScreenSize, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ResponseStatus::Ready,
            message: Some(message.into()),
            screen_width: Some(screen.width),
            screen_height: Some(screen.height),
        }
    }

    /// An `error` response with a human-readable reason.
    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ResponseStatus::Error,
            message: Some(message.into()),
            screen_width: None,
            screen_height: None,
        }
    }

    /// Attaches a message to the response.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == ResponseStatus::Error
    }

    /// The resolved screen size, if both dimensions are present and non-zero.
    pub fn screen_size(&self) -> Option<ScreenSize> {
        match (self.screen_width, self.screen_height) {
            (Some(w), Some(h)) => ScreenSize::new(w, h),
            _ => None,
        }
    }

    /// Converts an `error` status into a [`RemoteError`].
    ///
    /// Transport failures are reported separately by the host, so this is the
    /// only way a remote-side failure becomes an `Err`.
    pub fn into_result(self) -> Result<Response, RemoteError> {
        if self.is_error() {
            Err(RemoteError {
                id: self.id,
                message: self.message.unwrap_or_else(|| "unknown error".to_string()),
            })
        } else {
            Ok(self)
        }
    }
}

/// A command that reached the engine but failed there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote error for {id}: {message}")]
pub struct RemoteError {
    pub id: String,
    pub message: String,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
