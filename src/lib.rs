#![forbid(unsafe_code)]
//! smtpverify_lib — SMTP-level mailbox deliverability probing.
//!
//! The crate establishes a direct TCP conversation with a recipient domain's
//! mail exchange host and infers, from the server's replies to the envelope
//! protocol, whether a given mailbox address will accept mail — without ever
//! sending `DATA`. See [`Verifier`] for the single public entry point.

mod classifier;
mod email;
mod error;
mod mx;
mod options;
mod reply;
mod result;
mod session;
mod verifier;

pub use error::ResolveFailure;
pub use mx::{MxRecord, MxResolver};
pub use options::VerifierOptions;
pub use result::{Status, VerifyResult};
pub use verifier::Verifier;
