//! Single-session SMTP state machine: drives one TCP conversation through
//! CONNECT -> EHLO/HELO -> MAIL FROM -> RCPT TO -> QUIT and folds the
//! observed replies into a terminal verdict. A session never retries on its
//! own — that's `Verifier`'s job.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use std::io::{Read, Write};

use crate::classifier;
use crate::error::SessionError;
use crate::reply::{Reply, ReplyParser};
use crate::{Status, VerifierOptions};

/// States of the dialogue. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connect,
    Ehlo,
    Helo,
    MailFrom,
    RcptTo,
    Quit,
    Done,
}

/// A terminal, fully-classified outcome of one session (either a server
/// reply turned into a verdict, or a local "blocked" verdict synthesized
/// from a bad early-stage reply).
pub(crate) struct SessionVerdict {
    pub status: Status,
    pub smtp_code: u16,
    pub is_catch_all: bool,
    pub is_temporary_error: bool,
    pub reason: String,
}

impl SessionVerdict {
    fn blocked(code: u16, is_temporary_error: bool, reason: impl Into<String>) -> Self {
        Self {
            status: Status::Blocked,
            smtp_code: code,
            is_catch_all: false,
            is_temporary_error,
            reason: reason.into(),
        }
    }
}

pub(crate) struct Session {
    stream: TcpStream,
    parser: ReplyParser,
    timeout: Duration,
}

impl Session {
    /// Dial `host:port` and return a ready session. Any connect failure is a
    /// [`SessionError::Connect`] / [`SessionError::NoAddress`], which
    /// `Verifier` treats as "try the next host".
    pub(crate) fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|source| SessionError::Connect {
                host: host.to_string(),
                source,
            })?
            .collect();
        let Some(addr) = addrs.into_iter().next() else {
            return Err(SessionError::NoAddress {
                host: host.to_string(),
            });
        };
        let stream =
            TcpStream::connect_timeout(&addr, timeout).map_err(|source| SessionError::Connect {
                host: host.to_string(),
                source,
            })?;
        stream
            .set_read_timeout(Some(timeout))
            .map_err(|source| SessionError::Io {
                state: SessionState::Connect,
                source,
            })?;
        stream
            .set_write_timeout(Some(timeout))
            .map_err(|source| SessionError::Io {
                state: SessionState::Connect,
                source,
            })?;
        Ok(Self {
            stream,
            parser: ReplyParser::new(),
            timeout,
        })
    }

    /// Drive the full dialogue for `recipient` against the already-connected
    /// host and return the terminal verdict.
    pub(crate) fn run(
        &mut self,
        recipient: &crate::email::EmailAddress,
        mail_from: &str,
        helo_name: &str,
    ) -> Result<SessionVerdict, SessionError> {
        let greeting = self.read_reply(SessionState::Connect)?;
        if greeting.code != 220 {
            return Ok(SessionVerdict::blocked(
                greeting.code,
                false,
                format!("Server refused connection: {}", greeting.message),
            ));
        }

        let ehlo = self.command(&format!("EHLO {helo_name}"), SessionState::Ehlo)?;
        let post_greeting = if ehlo.code == 250 {
            None
        } else if matches!(ehlo.code, 500 | 502) {
            let helo = self.command(&format!("HELO {helo_name}"), SessionState::Helo)?;
            if helo.code != 250 {
                return Ok(SessionVerdict::blocked(
                    helo.code,
                    (400..500).contains(&helo.code),
                    format!("HELO rejected: {}", helo.message),
                ));
            }
            Some(helo)
        } else {
            return Ok(SessionVerdict::blocked(
                ehlo.code,
                (400..500).contains(&ehlo.code),
                format!("EHLO rejected: {}", ehlo.message),
            ));
        };
        let _ = post_greeting;

        let mail_cmd = format!("MAIL FROM:<{mail_from}>");
        let mail_reply = self.command(&mail_cmd, SessionState::MailFrom)?;
        if mail_reply.code != 250 {
            return Ok(SessionVerdict::blocked(
                mail_reply.code,
                (400..500).contains(&mail_reply.code),
                format!("MAIL FROM rejected: {}", mail_reply.message),
            ));
        }

        let rcpt_cmd = format!("RCPT TO:<{}@{}>", recipient.local, recipient.domain);
        let rcpt_reply = self.command(&rcpt_cmd, SessionState::RcptTo)?;
        let classified = classifier::classify(rcpt_reply.code, &rcpt_reply.message);

        self.quit();

        Ok(SessionVerdict {
            status: classified.status,
            smtp_code: rcpt_reply.code,
            is_catch_all: classified.is_catch_all,
            is_temporary_error: classified.is_temporary_error,
            reason: classified.reason,
        })
    }

    fn command(&mut self, command: &str, state: SessionState) -> Result<Reply, SessionError> {
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.write_all(&line, state)?;
        self.read_reply(state)
    }

    fn quit(&mut self) {
        // Best-effort: a failure here must not affect the verdict already
        // determined by the RCPT TO reply.
        if self.write_all(b"QUIT\r\n", SessionState::Quit).is_ok() {
            let _ = self.read_reply(SessionState::Quit);
        }
    }

    fn write_all(&mut self, data: &[u8], state: SessionState) -> Result<(), SessionError> {
        self.stream
            .write_all(data)
            .and_then(|()| self.stream.flush())
            .map_err(|source| SessionError::Io { state, source })
    }

    fn read_reply(&mut self, state: SessionState) -> Result<Reply, SessionError> {
        loop {
            if let Some(reply) = self.parser.try_take(state)? {
                return Ok(reply);
            }
            let mut buf = [0u8; 4096];
            let read = self.stream.read(&mut buf).map_err(|source| {
                if matches!(
                    source.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) {
                    SessionError::Timeout { state }
                } else {
                    SessionError::Io { state, source }
                }
            })?;
            if read == 0 {
                return Err(SessionError::Io {
                    state,
                    source: std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "connection closed before a complete reply was received",
                    ),
                });
            }
            self.parser.push(&buf[..read], state)?;
        }
    }
}

/// Run one full attempt against `host` (connect + dialogue), wrapping
/// connection setup and the dialogue itself in a single `Result` for
/// `Verifier`.
pub(crate) fn run_host(
    host: &str,
    recipient: &crate::email::EmailAddress,
    mail_from: &str,
    helo_name: &str,
    options: &VerifierOptions,
) -> Result<SessionVerdict, SessionError> {
    let mut session = Session::connect(host, options.connect_port, options.smtp_timeout)?;
    session.run(recipient, mail_from, helo_name)
}
