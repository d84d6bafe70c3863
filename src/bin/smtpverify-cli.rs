#[path = "smtpverify-cli/args.rs"]
mod args;
#[path = "smtpverify-cli/output.rs"]
mod output;

use anyhow::{Context, Result};
use args::Cli;
use output::{any_invalid, write_reports};
use smtpverify_lib::Verifier;

use std::io::{self, BufRead};

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "cli-logging")]
    init_logging();

    let options = cli.verifier_options();
    let verifier = Verifier::new(options).context("initializing DNS resolver")?;

    let mut results = Vec::new();
    if cli.stdin {
        for line in io::stdin().lock().lines() {
            let email = line.context("read stdin")?;
            let email = email.trim();
            if email.is_empty() {
                continue;
            }
            results.push(verifier.verify(email));
        }
    } else if let Some(email) = &cli.email {
        results.push(verifier.verify(email));
    } else {
        args::Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    }

    write_reports(&results, &cli)?;

    if any_invalid(&results) {
        std::process::exit(2);
    }

    Ok(())
}

#[cfg(feature = "cli-logging")]
fn init_logging() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}
