use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Deliverability classification returned for a single address.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Valid,
    Invalid,
    Unknown,
    CatchAll,
    RetryLater,
    Blocked,
    Greylisted,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Valid => "valid",
            Status::Invalid => "invalid",
            Status::Unknown => "unknown",
            Status::CatchAll => "catch_all",
            Status::RetryLater => "retry_later",
            Status::Blocked => "blocked",
            Status::Greylisted => "greylisted",
        };
        f.write_str(s)
    }
}

/// Output of [`crate::Verifier::verify`].
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    pub email: String,
    pub status: Status,
    pub smtp_code: u16,
    pub mx_server: String,
    pub attempts: u32,
    pub is_catch_all: bool,
    pub is_temporary_error: bool,
    pub reason: String,
    pub time_taken_ms: u64,
}
