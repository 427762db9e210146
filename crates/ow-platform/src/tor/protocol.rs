//! Tor control-protocol framing and decoding.
//!
//! Everything here is pure: reply lines go in, [`Reply`] values and
//! [`ControlEvent`]s come out. The socket handling lives in
//! [`super::control`].

use std::collections::HashMap;

use thiserror::Error;

use ow_core::transport::{ControlEvent, TransportError};

pub const TAKE_OWNERSHIP: &str = "TAKEOWNERSHIP";
pub const SET_EVENTS: &str = "SETEVENTS STATUS_CLIENT";
pub const GETINFO_BOOTSTRAP_PHASE: &str = "GETINFO status/bootstrap-phase";
pub const GETINFO_CIRCUIT_ESTABLISHED: &str = "GETINFO status/circuit-established";
pub const QUIT: &str = "QUIT";

const ASYNC_EVENT_CODE: u16 = 650;
const BAD_AUTHENTICATION_CODE: u16 = 515;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlProtocolError {
    #[error("malformed control line: {0:?}")]
    Malformed(String),

    #[error("command rejected: {code} {message}")]
    Rejected { code: u16, message: String },

    #[error("control connection closed")]
    Closed,

    #[error("control connection i/o error: {0}")]
    Io(String),
}

impl From<ControlProtocolError> for TransportError {
    fn from(err: ControlProtocolError) -> Self {
        match err {
            ControlProtocolError::Rejected {
                code: BAD_AUTHENTICATION_CODE,
                message,
            } => TransportError::AuthenticationFailed(format!("{BAD_AUTHENTICATION_CODE} {message}")),
            other => TransportError::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `NNN-text`, more lines follow.
    Mid,
    /// `NNN+text`, a dot-terminated data block follows.
    Data,
    /// `NNN text`, last line of the reply.
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine {
    pub code: u16,
    pub kind: LineKind,
    pub text: String,
}

pub fn parse_line(line: &str) -> Result<ReplyLine, ControlProtocolError> {
    let malformed = || ControlProtocolError::Malformed(line.to_string());

    let code_part = line.get(..3).ok_or_else(malformed)?;
    if !code_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let code: u16 = code_part.parse().map_err(|_| malformed())?;

    let rest = &line[3..];
    let (kind, text) = match rest.chars().next() {
        None => (LineKind::End, ""),
        Some(' ') => (LineKind::End, &rest[1..]),
        Some('-') => (LineKind::Mid, &rest[1..]),
        Some('+') => (LineKind::Data, &rest[1..]),
        Some(_) => return Err(malformed()),
    };

    Ok(ReplyLine {
        code,
        kind,
        text: text.to_string(),
    })
}

/// A complete reply: status code of the final line plus every line's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_async_event(&self) -> bool {
        self.code == ASYNC_EVENT_CODE
    }

    /// Text of the final line, e.g. `OK` or `Authentication failed`.
    pub fn message(&self) -> &str {
        self.lines.last().map(String::as_str).unwrap_or_default()
    }

    pub fn into_ok(self) -> Result<Reply, ControlProtocolError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(ControlProtocolError::Rejected {
                code: self.code,
                message: self.message().to_string(),
            })
        }
    }

    /// Value of `key=value` in a `GETINFO` reply.
    pub fn info_value(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| {
            line.strip_prefix(key)
                .and_then(|rest| rest.strip_prefix('='))
        })
    }
}

/// Accumulates lines until a reply is complete.
#[derive(Debug, Default)]
pub struct ReplyAssembler {
    lines: Vec<String>,
    in_data: bool,
}

impl ReplyAssembler {
    pub fn push(&mut self, raw: &str) -> Result<Option<Reply>, ControlProtocolError> {
        if self.in_data {
            if raw == "." {
                self.in_data = false;
            } else if let Some(last) = self.lines.last_mut() {
                let unescaped = raw.strip_prefix('.').filter(|r| r.starts_with('.')).unwrap_or(raw);
                last.push('\n');
                last.push_str(unescaped);
            }
            return Ok(None);
        }

        let line = match parse_line(raw) {
            Ok(line) => line,
            Err(err) => {
                self.lines.clear();
                return Err(err);
            }
        };

        self.lines.push(line.text);
        match line.kind {
            LineKind::Mid => Ok(None),
            LineKind::Data => {
                self.in_data = true;
                Ok(None)
            }
            LineKind::End => Ok(Some(Reply {
                code: line.code,
                lines: std::mem::take(&mut self.lines),
            })),
        }
    }
}

pub fn authenticate_command(cookie: &[u8]) -> String {
    format!("AUTHENTICATE {}", hex::encode_upper(cookie))
}

pub fn set_conf_command(key: &str, value: &str) -> String {
    format!("SETCONF {key}={}", quote_value(value))
}

fn quote_value(value: &str) -> String {
    let needs_quotes =
        value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\');
    if !needs_quotes {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Split `KEY=VALUE KEY="quoted value"` arguments. Bare words are skipped.
pub fn parse_keywords(args: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let mut chars = args.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                break;
            }
            key.push(c);
            chars.next();
        }
        if chars.peek() != Some(&'=') {
            continue;
        }
        chars.next();

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                value.push(c);
                chars.next();
            }
        }
        out.insert(key, value);
    }

    out
}

/// Decode a `650` reply. Anything other than the client status events we
/// subscribe to yields `None`.
pub fn decode_event(reply: &Reply) -> Option<ControlEvent> {
    if !reply.is_async_event() {
        return None;
    }
    let line = reply.lines.first()?;
    let status = line.strip_prefix("STATUS_CLIENT ")?;
    decode_client_status(status)
}

/// Decode the value of `GETINFO status/bootstrap-phase`.
pub fn decode_bootstrap_phase(reply: &Reply) -> Option<ControlEvent> {
    decode_client_status(reply.info_value("status/bootstrap-phase")?)
}

pub fn circuit_established(reply: &Reply) -> bool {
    reply.info_value("status/circuit-established") == Some("1")
}

// `<severity> <action> [arguments]`
fn decode_client_status(status: &str) -> Option<ControlEvent> {
    let (_severity, action) = status.split_once(' ')?;
    let (name, args) = action.split_once(' ').unwrap_or((action, ""));
    let keywords = parse_keywords(args);

    match name {
        "BOOTSTRAP" => {
            let progress = keywords.get("PROGRESS")?.parse::<u8>().ok()?.min(100);
            Some(ControlEvent::BootstrapProgress {
                progress,
                tag: keywords.get("TAG").cloned(),
                summary: keywords.get("SUMMARY").cloned(),
            })
        }
        "CIRCUIT_ESTABLISHED" => Some(ControlEvent::CircuitEstablished),
        "CIRCUIT_NOT_ESTABLISHED" => Some(ControlEvent::CircuitNotEstablished {
            reason: keywords.get("REASON").cloned(),
        }),
        _ => None,
    }
}
