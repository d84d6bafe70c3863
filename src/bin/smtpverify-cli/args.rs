use clap::Parser;
use smtpverify_lib::VerifierOptions;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "smtpverify-cli")]
pub struct Cli {
    /// mailbox address to probe
    pub email: Option<String>,

    /// read addresses from stdin instead (one per line)
    #[arg(long)]
    pub stdin: bool,

    /// print results as a JSON array (feature `with-serde`)
    #[arg(long)]
    pub json: bool,

    /// this verifier's own domain (defaults to localhost)
    #[arg(long = "own-domain")]
    pub own_domain: Option<String>,

    /// MAIL FROM envelope sender (defaults to verify@<own-domain>)
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// name announced in EHLO/HELO (defaults to <own-domain>)
    #[arg(long)]
    pub helo: Option<String>,

    /// per-step I/O timeout in milliseconds
    #[arg(long = "timeout", default_value_t = 15_000)]
    pub timeout_ms: u64,

    /// number of attempts across MX hosts before giving up
    #[arg(long = "max-attempts", default_value_t = 3)]
    pub max_attempts: u32,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    pub fn verifier_options(&self) -> VerifierOptions {
        let mut options = VerifierOptions::default();
        if let Some(own_domain) = self.own_domain.clone() {
            options.own_domain = own_domain;
        }
        options.envelope_sender = self.mail_from.clone();
        options.helo_name = self.helo.clone();
        options.smtp_timeout = Duration::from_millis(self.timeout_ms);
        options.max_attempts = self.max_attempts.max(1);
        options
    }
}
