//! Autosplit wire format
//!
//! UTF-8 text, one message per line:
//!
//! ```text
//! <code>:<timestamp>     e.g. "3:1234567890123"
//! exit                   the client is disconnecting
//! ```
//!
//! Codes: 1 start, 3 split, 4 end, 5 reset, 6 pause, 7 resume. The timestamp
//! is an opaque nanosecond counter; only differences matter. Fields are
//! parsed strictly, so surrounding spaces make a line a no-op. Anything that
//! does not decode is a no-op, never an error.

use crate::core::{Action, ControlEvent};
use crate::time::Timestamp;

/// Line a client sends before disconnecting
pub const EXIT_COMMAND: &str = "exit";

/// Longest line the listener buffers; longer lines are discarded
pub const MAX_LINE_LEN: usize = 1024;

pub const CODE_START: u32 = 1;
/// Reserved for a restart action that is not implemented
pub const CODE_RESTART: u32 = 2;
pub const CODE_SPLIT: u32 = 3;
pub const CODE_END: u32 = 4;
pub const CODE_RESET: u32 = 5;
pub const CODE_PAUSE: u32 = 6;
pub const CODE_RESUME: u32 = 7;

/// Event decoded from one protocol line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerEvent {
    pub action: Action,
    pub timestamp: Timestamp,
}

impl ServerEvent {
    /// The no-op event
    pub fn nothing() -> Self {
        Self {
            action: Action::DoNothing,
            timestamp: 0,
        }
    }

    /// Map a protocol code to an event.
    ///
    /// End and reset carry no timestamp; unknown codes are no-ops.
    pub fn from_code(code: u32, timestamp: Timestamp) -> Self {
        let (action, timestamp) = match code {
            CODE_START => (Action::Start, timestamp),
            CODE_SPLIT => (Action::Split, timestamp),
            CODE_END => (Action::End, 0),
            CODE_RESET => (Action::Reset, 0),
            CODE_PAUSE => (Action::Pause, timestamp),
            CODE_RESUME => (Action::Resume, timestamp),
            _ => (Action::DoNothing, 0),
        };
        Self { action, timestamp }
    }

    /// Protocol code for this event's action, if it has one
    pub fn code(&self) -> Option<u32> {
        match self.action {
            Action::Start => Some(CODE_START),
            Action::Split => Some(CODE_SPLIT),
            Action::End => Some(CODE_END),
            Action::Reset => Some(CODE_RESET),
            Action::Pause => Some(CODE_PAUSE),
            Action::Resume => Some(CODE_RESUME),
            Action::Unsplit | Action::DoNothing => None,
        }
    }

    /// Encode as a protocol line (without the trailing newline)
    pub fn encode(&self) -> Option<String> {
        self.code().map(|code| encode(code, self.timestamp))
    }
}

impl From<ServerEvent> for ControlEvent {
    fn from(event: ServerEvent) -> Self {
        ControlEvent::network(event.action, event.timestamp)
    }
}

/// Result of decoding one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub event: ServerEvent,
    /// The client asked to disconnect
    pub exit: bool,
}

/// Whether a line is the exit command.
///
/// Case-insensitive; surrounding whitespace and control characters (NUL
/// included) are ignored.
pub fn is_exit(line: &str) -> bool {
    line.trim_matches(|c: char| c <= ' ').eq_ignore_ascii_case(EXIT_COMMAND)
}

/// Decode one line (without its line terminator)
pub fn decode(line: &str) -> Decoded {
    Decoded {
        event: decode_event(line),
        exit: is_exit(line),
    }
}

/// Encode a code and timestamp as a protocol line
pub fn encode(code: u32, timestamp: Timestamp) -> String {
    format!("{}:{}", code, timestamp)
}

fn decode_event(line: &str) -> ServerEvent {
    if line.chars().count() <= 1 {
        return ServerEvent::nothing();
    }

    let mut fields: Vec<&str> = line.split(':').collect();

    // Some clients prefix the code with a NUL byte, sometimes as its own field
    let first = fields[0];
    if first == "\0" && fields.len() > 1 {
        fields.remove(0);
    } else if first.len() > 1 && first.starts_with('\0') {
        fields[0] = &first[1..];
    }

    let Ok(code) = fields[0].parse::<u32>() else {
        log::debug!("Ignoring malformed autosplit line {:?}", line);
        return ServerEvent::nothing();
    };

    let timestamp = match fields.get(1) {
        Some(field) => match field.parse::<Timestamp>() {
            Ok(timestamp) => timestamp,
            Err(_) => {
                log::debug!("Ignoring malformed autosplit line {:?}", line);
                return ServerEvent::nothing();
            }
        },
        None => 0,
    };

    ServerEvent::from_code(code, timestamp)
}
