use anyhow::{Result, bail};
use smtpverify_lib::{Status, VerifyResult};

use crate::args::Cli;

pub fn any_invalid(results: &[VerifyResult]) -> bool {
    results.iter().any(|r| r.status == Status::Invalid)
}

pub fn write_reports(results: &[VerifyResult], cli: &Cli) -> Result<()> {
    if cli.json {
        write_json(results)
    } else {
        write_human(results);
        Ok(())
    }
}

fn write_human(results: &[VerifyResult]) {
    for r in results {
        println!(
            "{:<32} {:<12} code={:<3} mx={:<24} attempts={} {}",
            r.email, r.status, r.smtp_code, r.mx_server, r.attempts, r.reason
        );
    }
}

#[cfg(feature = "with-serde")]
fn write_json(results: &[VerifyResult]) -> Result<()> {
    let s = serde_json::to_string_pretty(results)?;
    println!("{s}");
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_results: &[VerifyResult]) -> Result<()> {
    bail!("--json requires the 'with-serde' feature")
}
