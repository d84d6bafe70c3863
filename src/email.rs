//! Email address splitting. This is deliberately minimal: the core does not
//! perform RFC 5322 format validation — callers are expected to pre-validate
//! at the edge. All the core needs is the local-part/domain split used to
//! build `MAIL FROM`/`RCPT TO` and to key the MX lookup.

/// A split, domain-lowercased email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EmailAddress {
    pub local: String,
    pub domain: String,
}

/// Split `email` on `@`. Fails only when the count of parts is not exactly
/// two — an empty local part or domain still splits successfully.
pub(crate) fn split(email: &str) -> Option<EmailAddress> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return None;
    }
    let (local, domain) = (parts[0], parts[1]);
    Some(EmailAddress {
        local: local.to_string(),
        domain: domain.to_ascii_lowercase(),
    })
}
