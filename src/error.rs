use thiserror::Error;

use crate::session::SessionState;

/// Failure modes of [`crate::mx::MxResolver::resolve`]. None of these ever
/// reach the public API: a resolution failure collapses to an empty record
/// list, which `Verifier` interprets as "no mail route".
#[derive(Debug, Error)]
pub enum ResolveFailure {
    #[error("resolver initialization failed: {source}")]
    Init {
        #[source]
        source: std::io::Error,
    },
    #[error("MX lookup failed: {source}")]
    Lookup {
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
}

/// Failure modes of a single [`crate::session::Session::run`] call. Caught by
/// `Verifier`, which either tries the next MX host or synthesizes a
/// temporary/unknown verdict once every host has failed this way.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connecting to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no socket address resolved for {host}")]
    NoAddress { host: String },
    #[error("I/O error in state {state:?}: {source}")]
    Io {
        state: SessionState,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out in state {state:?}")]
    Timeout { state: SessionState },
    #[error("protocol error in state {state:?}: {message}")]
    Protocol { state: SessionState, message: String },
}

impl SessionError {
    /// The session state active when the failure occurred, used by
    /// `Verifier` for its `reason` strings ("timed out during MAIL_FROM").
    pub fn state(&self) -> Option<SessionState> {
        match self {
            SessionError::Io { state, .. }
            | SessionError::Timeout { state }
            | SessionError::Protocol { state, .. } => Some(*state),
            SessionError::Connect { .. } | SessionError::NoAddress { .. } => {
                Some(SessionState::Connect)
            }
        }
    }
}
