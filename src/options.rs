use std::time::Duration;

/// Configuration surface of `Verifier`.
#[derive(Debug, Clone)]
pub struct VerifierOptions {
    /// The verifier's own domain, used to build the default
    /// `envelope_sender`/`helo_name` below. Never the domain of the address
    /// being probed.
    pub own_domain: String,
    /// Mailbox used in `MAIL FROM`. Defaults to `verify@<own_domain>` when
    /// left `None`.
    pub envelope_sender: Option<String>,
    /// FQDN announced in `EHLO`/`HELO`. Should match `envelope_sender`'s
    /// domain for best deliverability results. Defaults to `own_domain` when
    /// left `None`.
    pub helo_name: Option<String>,
    /// Per-step I/O timeout, armed before every connect and every read.
    pub smtp_timeout: Duration,
    /// Number of attempts across all MX hosts before giving up.
    pub max_attempts: u32,
    /// Base delays between attempts, indexed by `attempt - 2` (no delay
    /// before the first attempt).
    pub backoff_ms: Vec<u64>,
    /// Uniform jitter fraction applied to each backoff delay.
    pub jitter_fraction: f64,
    /// TCP port dialed on each MX host. Always 25 in production; overridable
    /// only so tests can point the dialer at a loopback mock server instead
    /// of real port 25.
    pub connect_port: u16,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            own_domain: "localhost".to_string(),
            envelope_sender: None,
            helo_name: None,
            smtp_timeout: Duration::from_secs(15),
            max_attempts: 3,
            backoff_ms: vec![1_000, 3_000, 10_000],
            jitter_fraction: 0.3,
            connect_port: 25,
        }
    }
}

impl VerifierOptions {
    pub(crate) fn envelope_sender(&self) -> String {
        self.envelope_sender
            .clone()
            .unwrap_or_else(|| format!("verify@{}", self.own_domain))
    }

    pub(crate) fn helo_name(&self) -> String {
        self.helo_name.clone().unwrap_or_else(|| self.own_domain.clone())
    }

    /// Base delay (pre-jitter) for the attempt about to start, where
    /// `attempt` is 1-based and attempt 1 never waits.
    pub(crate) fn base_backoff_for(&self, attempt: u32) -> Option<Duration> {
        if attempt < 2 {
            return None;
        }
        let index = (attempt - 2) as usize;
        self.backoff_ms.get(index).map(|ms| Duration::from_millis(*ms))
    }
}
