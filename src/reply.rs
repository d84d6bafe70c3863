//! Stateful SMTP reply framing.
//!
//! [`ReplyParser`] is fed arbitrary byte chunks as they arrive off the wire
//! and yields exactly one [`Reply`] once a complete multi-line reply has
//! accumulated in its buffer. Excess bytes (the start of the next reply)
//! stay buffered. The parser has no socket of its own — callers (the
//! `session` module) own the I/O and just push bytes in.

use crate::error::SessionError;
use crate::session::SessionState;

/// Buffer growth past this size without a complete reply is treated as a
/// protocol error.
const MAX_BUFFER_BYTES: usize = 64 * 1024;

/// A complete SMTP server reply: a numeric code and the joined text of all
/// continuation lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub message: String,
    pub complete: bool,
}

impl Reply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

#[derive(Debug, Default)]
pub struct ReplyParser {
    buffer: Vec<u8>,
}

impl ReplyParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly-read bytes to the internal buffer.
    pub fn push(&mut self, chunk: &[u8], state: SessionState) -> Result<(), SessionError> {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > MAX_BUFFER_BYTES {
            return Err(SessionError::Protocol {
                state,
                message: "reply exceeded 64 KiB without terminating".to_string(),
            });
        }
        Ok(())
    }

    /// If the buffer holds one complete reply, drain and return it. A
    /// `Some` result always carries `complete: true`; a partial reply never
    /// escapes this function (the caller waits for more bytes instead).
    pub fn try_take(&mut self, state: SessionState) -> Result<Option<Reply>, SessionError> {
        let lines = split_lines(&self.buffer);
        if lines.is_empty() {
            return Ok(None);
        }

        let Some(last) = lines.last() else {
            return Ok(None);
        };
        let Some((last_code, _, is_final)) = parse_line(last, state)? else {
            return Ok(None);
        };
        if !is_final {
            return Ok(None);
        }

        let mut code = None;
        let mut parts = Vec::with_capacity(lines.len());
        for line in &lines {
            let Some((line_code, text, _)) = parse_line(line, state)? else {
                return Ok(None);
            };
            if let Some(existing) = code {
                if existing != line_code {
                    return Err(SessionError::Protocol {
                        state,
                        message: format!(
                            "inconsistent reply codes: {existing} vs {line_code}"
                        ),
                    });
                }
            } else {
                code = Some(line_code);
            }
            parts.push(text);
        }

        let consumed = consumed_bytes(&self.buffer, lines.len());
        self.buffer.drain(..consumed);

        Ok(Some(Reply {
            code: code.unwrap_or(last_code),
            message: parts.join(" "),
            complete: true,
        }))
    }
}

/// Split the buffer on CRLF (bare LF tolerated), dropping a trailing empty
/// segment produced by a buffer that ends exactly on a line boundary.
fn split_lines(buffer: &[u8]) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < buffer.len() {
        if buffer[i] == b'\n' {
            let mut end = i;
            if end > start && buffer[end - 1] == b'\r' {
                end -= 1;
            }
            lines.push(buffer[start..end].to_vec());
            start = i + 1;
        }
        i += 1;
    }
    lines
}

/// How many raw bytes (including terminators) the first `count` lines
/// occupy in `buffer`, so they can be drained after a reply is taken.
fn consumed_bytes(buffer: &[u8], count: usize) -> usize {
    let mut seen = 0;
    for (i, &byte) in buffer.iter().enumerate() {
        if byte == b'\n' {
            seen += 1;
            if seen == count {
                return i + 1;
            }
        }
    }
    buffer.len()
}

/// Parse one line as `DDD<sep>text`. Returns `(code, text, is_final)` where
/// `is_final` is true for `DDD ` and false for `DDD-`. `Ok(None)` means the
/// line doesn't yet look like a full status line (shouldn't happen once a
/// full `\n`-terminated line has been split out, but guards malformed
/// input).
fn parse_line(
    line: &[u8],
    state: SessionState,
) -> Result<Option<(u16, String, bool)>, SessionError> {
    if line.len() < 3 {
        return Err(SessionError::Protocol {
            state,
            message: format!("reply line too short: {:?}", String::from_utf8_lossy(line)),
        });
    }
    let code_bytes = &line[..3];
    if !code_bytes.iter().all(u8::is_ascii_digit) {
        return Err(SessionError::Protocol {
            state,
            message: format!(
                "non-numeric reply code: {:?}",
                String::from_utf8_lossy(code_bytes)
            ),
        });
    }
    let code: u16 = std::str::from_utf8(code_bytes)
        .unwrap()
        .parse()
        .map_err(|_| SessionError::Protocol {
            state,
            message: "reply code did not parse as u16".to_string(),
        })?;

    let sep = line.get(3).copied();
    let (is_final, text_start) = match sep {
        Some(b' ') => (true, 4),
        Some(b'-') => (false, 4),
        None => (true, 3),
        Some(_) => {
            return Err(SessionError::Protocol {
                state,
                message: format!(
                    "unexpected reply separator after code {code}: {:?}",
                    sep.map(char::from)
                ),
            });
        }
    };
    let text = String::from_utf8_lossy(&line[text_start.min(line.len())..]).into_owned();
    Ok(Some((code, text, is_final)))
}
