//! Pure classification of a RCPT TO reply. This is evaluated only for the
//! reply that answers `RCPT TO`; the blocked-at-earlier-stage verdicts
//! produced by CONNECT/EHLO/HELO/MAIL_FROM failures are computed directly by
//! the session state machine and never pass through here — hence the
//! asymmetry where 554 is `blocked` at CONNECT but `invalid` at RCPT TO.

use crate::Status;

pub(crate) struct Classified {
    pub status: Status,
    pub is_catch_all: bool,
    pub is_temporary_error: bool,
    pub reason: String,
}

/// Classify a RCPT TO reply. Rows are evaluated top-to-bottom; the first
/// match wins. The greylist keyword check runs only once the explicit
/// numeric branches have all missed, so an explicitly enumerated code never
/// gets reclassified just because its message happens to mention the word.
pub(crate) fn classify(code: u16, message: &str) -> Classified {
    match code {
        250 => Classified {
            status: Status::Valid,
            is_catch_all: false,
            is_temporary_error: false,
            reason: "Mailbox exists".to_string(),
        },
        251 => Classified {
            status: Status::Valid,
            is_catch_all: false,
            is_temporary_error: false,
            reason: "User not local but will forward".to_string(),
        },
        252 => Classified {
            status: Status::CatchAll,
            is_catch_all: true,
            is_temporary_error: false,
            reason: "Cannot verify user, but will accept message".to_string(),
        },
        550 | 551 | 552 | 553 | 554 => Classified {
            status: Status::Invalid,
            is_catch_all: false,
            is_temporary_error: false,
            reason: format!("Mailbox rejected: {message}"),
        },
        450 | 451 | 452 => Classified {
            status: Status::RetryLater,
            is_catch_all: false,
            is_temporary_error: true,
            reason: format!("Temporary error: {message}"),
        },
        421 => Classified {
            status: Status::RetryLater,
            is_catch_all: false,
            is_temporary_error: true,
            reason: format!("Server busy: {message}"),
        },
        _ if message.to_ascii_lowercase().contains("greylist") => Classified {
            status: Status::Greylisted,
            is_catch_all: false,
            is_temporary_error: true,
            reason: format!("Greylisted: {message}"),
        },
        _ if code >= 500 => Classified {
            status: Status::Invalid,
            is_catch_all: false,
            is_temporary_error: false,
            reason: format!("Permanent error: {message}"),
        },
        _ if code >= 400 => Classified {
            status: Status::RetryLater,
            is_catch_all: false,
            is_temporary_error: true,
            reason: format!("Temporary error: {message}"),
        },
        _ => Classified {
            status: Status::Unknown,
            is_catch_all: false,
            is_temporary_error: false,
            reason: format!("Unknown SMTP response: {code} {message}"),
        },
    }
}
