//! Retry/backoff controller: orchestrates MX resolution, host iteration, and
//! the attempt loop, folding everything into one [`VerifyResult`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::email;
use crate::mx::MxResolver;
use crate::options::VerifierOptions;
use crate::result::{Status, VerifyResult};
use crate::session;

/// Single public entry point of the core: given an email address, run the
/// MX-resolve / dial / dialogue / retry pipeline and return a verdict. Never
/// panics, never returns `Err` — every code path produces a `VerifyResult`.
pub struct Verifier {
    options: VerifierOptions,
    resolver: MxResolver,
}

impl Verifier {
    pub fn new(options: VerifierOptions) -> Result<Self, crate::error::ResolveFailure> {
        let resolver = MxResolver::from_system_conf()?;
        Ok(Self { options, resolver })
    }

    pub(crate) fn with_resolver(options: VerifierOptions, resolver: MxResolver) -> Self {
        Self { options, resolver }
    }

    /// Verify `email` without cancellation support.
    pub fn verify(&self, email: &str) -> VerifyResult {
        self.verify_inner(email, None)
    }

    /// Verify `email`, checking `cancel` at every suspension point: before MX
    /// resolution, before each connect, and before each attempt's backoff
    /// sleep. A flag raised while blocked inside a socket read cannot
    /// preempt that read.
    pub fn verify_with_cancel(&self, email: &str, cancel: &AtomicBool) -> VerifyResult {
        self.verify_inner(email, Some(cancel))
    }

    fn verify_inner(&self, email_input: &str, cancel: Option<&AtomicBool>) -> VerifyResult {
        let start = Instant::now();

        let Some(address) = email::split(email_input) else {
            return VerifyResult {
                email: email_input.to_string(),
                status: Status::Unknown,
                smtp_code: 0,
                mx_server: "error".to_string(),
                attempts: 1,
                is_catch_all: false,
                is_temporary_error: false,
                reason: "Invalid email format".to_string(),
                time_taken_ms: elapsed_ms(start),
            };
        };

        if is_cancelled(cancel) {
            return cancelled_result(email_input, 0, start);
        }

        let records = self.resolver.resolve(&address.domain);
        if records.is_empty() {
            return VerifyResult {
                email: email_input.to_string(),
                status: Status::Invalid,
                smtp_code: 550,
                mx_server: "No MX".to_string(),
                attempts: 1,
                is_catch_all: false,
                is_temporary_error: false,
                reason: "No MX".to_string(),
                time_taken_ms: elapsed_ms(start),
            };
        }

        let mail_from = self.options.envelope_sender();
        let helo_name = self.options.helo_name();

        let mut last_result: Option<VerifyResult> = None;

        for attempt in 1..=self.options.max_attempts {
            if attempt > 1 {
                if is_cancelled(cancel) {
                    return cancelled_result(email_input, attempt, start);
                }
                if let Some(base) = self.options.base_backoff_for(attempt) {
                    std::thread::sleep(jitter(base, self.options.jitter_fraction));
                }
            }

            if is_cancelled(cancel) {
                return cancelled_result(email_input, attempt, start);
            }

            let mut last_err: Option<crate::error::SessionError> = None;
            let mut attempt_verdict: Option<(String, session::SessionVerdict)> = None;

            for record in &records {
                if is_cancelled(cancel) {
                    return cancelled_result(email_input, attempt, start);
                }
                match session::run_host(
                    &record.exchange,
                    &address,
                    &mail_from,
                    &helo_name,
                    &self.options,
                ) {
                    Ok(verdict) => {
                        attempt_verdict = Some((record.exchange.clone(), verdict));
                        break;
                    }
                    Err(err) => {
                        tracing::debug!(
                            target: "smtpverify::verifier",
                            host = %record.exchange,
                            attempt,
                            error = %err,
                            "session attempt failed, trying next host"
                        );
                        last_err = Some(err);
                    }
                }
            }

            let result = match attempt_verdict {
                Some((host, verdict)) => VerifyResult {
                    email: email_input.to_string(),
                    status: verdict.status,
                    smtp_code: verdict.smtp_code,
                    mx_server: host,
                    attempts: attempt,
                    is_catch_all: verdict.is_catch_all,
                    is_temporary_error: verdict.is_temporary_error,
                    reason: verdict.reason,
                    time_taken_ms: elapsed_ms(start),
                },
                None => {
                    let reason = match &last_err {
                        Some(err) => match err.state() {
                            Some(state) => {
                                format!("All MX hosts failed (last failure in {state:?}: {err})")
                            }
                            None => format!("All MX hosts failed: {err}"),
                        },
                        None => "All MX hosts failed to respond".to_string(),
                    };
                    VerifyResult {
                        email: email_input.to_string(),
                        status: Status::Unknown,
                        smtp_code: 0,
                        mx_server: "error".to_string(),
                        attempts: attempt,
                        is_catch_all: false,
                        is_temporary_error: true,
                        reason,
                        time_taken_ms: elapsed_ms(start),
                    }
                }
            };

            if matches!(result.status, Status::Valid | Status::Invalid | Status::CatchAll) {
                return result;
            }

            last_result = Some(result);
        }

        let mut result = last_result.unwrap_or_else(|| VerifyResult {
            email: email_input.to_string(),
            status: Status::Unknown,
            smtp_code: 0,
            mx_server: "error".to_string(),
            attempts: self.options.max_attempts,
            is_catch_all: false,
            is_temporary_error: true,
            reason: "No session ever produced a verdict".to_string(),
            time_taken_ms: elapsed_ms(start),
        });
        result.attempts = self.options.max_attempts;
        result.time_taken_ms = elapsed_ms(start);
        result
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::SeqCst))
}

fn cancelled_result(email: &str, attempts: u32, start: Instant) -> VerifyResult {
    VerifyResult {
        email: email.to_string(),
        status: Status::Unknown,
        smtp_code: 0,
        mx_server: "error".to_string(),
        attempts: attempts.max(1),
        is_catch_all: false,
        is_temporary_error: false,
        reason: "cancelled".to_string(),
        time_taken_ms: elapsed_ms(start),
    }
}

/// `jitter(d) = d * (1 + U(-fraction, +fraction))`.
fn jitter(base: Duration, fraction: f64) -> Duration {
    let factor = 1.0 + rand::thread_rng().gen_range(-fraction..=fraction);
    let millis = (base.as_secs_f64() * factor.max(0.0) * 1000.0).round();
    Duration::from_millis(millis.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mx::MxRecord;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    fn options(port: u16) -> VerifierOptions {
        VerifierOptions {
            connect_port: port,
            smtp_timeout: Duration::from_secs(2),
            max_attempts: 3,
            backoff_ms: vec![10, 10, 10],
            jitter_fraction: 0.1,
            ..VerifierOptions::default()
        }
    }

    fn spawn_mock(scripts: Vec<Vec<(&'static str, &'static str)>>) -> (String, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let (ready_tx, ready_rx) = mpsc::channel();
        thread::spawn(move || {
            ready_tx.send(()).ok();
            for script in scripts {
                if let Ok((mut stream, _)) = listener.accept() {
                    let mut reader = BufReader::new(stream.try_clone().unwrap());
                    stream.write_all(b"220 mock.test ESMTP\r\n").ok();
                    stream.flush().ok();
                    for (expect_prefix, response) in script {
                        let mut line = String::new();
                        if reader.read_line(&mut line).unwrap_or(0) == 0 {
                            break;
                        }
                        assert!(line.starts_with(expect_prefix), "got {line:?}");
                        stream.write_all(response.as_bytes()).ok();
                        stream.flush().ok();
                    }
                }
            }
        });
        ready_rx.recv().expect("ready");
        ("127.0.0.1".to_string(), port)
    }

    #[test]
    fn invalid_email_format_short_circuits() {
        let verifier = Verifier::with_resolver(
            VerifierOptions::default(),
            MxResolver::with_lookup_for_tests(|_| Ok(vec![])),
        );
        let result = verifier.verify("not-an-email");
        assert_eq!(result.status, Status::Unknown);
        assert_eq!(result.smtp_code, 0);
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn no_mx_records_is_invalid_550() {
        let verifier = Verifier::with_resolver(
            VerifierOptions::default(),
            MxResolver::with_lookup_for_tests(|_| Ok(vec![])),
        );
        let result = verifier.verify("user@example.com");
        assert_eq!(result.status, Status::Invalid);
        assert_eq!(result.smtp_code, 550);
        assert_eq!(result.mx_server, "No MX");
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn accepted_rcpt_on_first_attempt_is_valid() {
        let (host, port) = spawn_mock(vec![vec![
            ("EHLO", "250-x\r\n250 ok\r\n"),
            ("MAIL FROM:", "250 ok\r\n"),
            ("RCPT TO:", "250 ok\r\n"),
            ("QUIT", "221 bye\r\n"),
        ]]);
        let verifier = Verifier::with_resolver(
            options(port),
            MxResolver::with_lookup_for_tests(move |_| Ok(vec![MxRecord::new(10, host.clone())])),
        );
        let result = verifier.verify("u@target.example");
        assert_eq!(result.status, Status::Valid);
        assert_eq!(result.smtp_code, 250);
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn retries_after_transient_then_succeeds() {
        let (host, port) = spawn_mock(vec![
            vec![
                ("EHLO", "250 ok\r\n"),
                ("MAIL FROM:", "250 ok\r\n"),
                ("RCPT TO:", "451 greylisted, try later\r\n"),
                ("QUIT", "221 bye\r\n"),
            ],
            vec![
                ("EHLO", "250 ok\r\n"),
                ("MAIL FROM:", "250 ok\r\n"),
                ("RCPT TO:", "250 ok\r\n"),
                ("QUIT", "221 bye\r\n"),
            ],
        ]);
        let verifier = Verifier::with_resolver(
            options(port),
            MxResolver::with_lookup_for_tests(move |_| Ok(vec![MxRecord::new(10, host.clone())])),
        );
        let result = verifier.verify("u@target.example");
        assert_eq!(result.status, Status::Valid);
        assert_eq!(result.attempts, 2);
    }

    #[test]
    fn connect_refused_every_attempt_is_unknown_after_max_attempts() {
        let verifier = Verifier::with_resolver(
            options(1),
            MxResolver::with_lookup_for_tests(|_| {
                Ok(vec![MxRecord::new(10, "127.0.0.1".to_string())])
            }),
        );
        let result = verifier.verify("u@target.example");
        assert_eq!(result.status, Status::Unknown);
        assert_eq!(result.smtp_code, 0);
        assert!(result.is_temporary_error);
        assert_eq!(result.attempts, 3);
    }

    #[test]
    fn definitive_invalid_never_retries() {
        let (host, port) = spawn_mock(vec![vec![
            ("EHLO", "250 ok\r\n"),
            ("MAIL FROM:", "250 ok\r\n"),
            ("RCPT TO:", "550 no such user\r\n"),
            ("QUIT", "221 bye\r\n"),
        ]]);
        let verifier = Verifier::with_resolver(
            options(port),
            MxResolver::with_lookup_for_tests(move |_| Ok(vec![MxRecord::new(10, host.clone())])),
        );
        let result = verifier.verify("u@target.example");
        assert_eq!(result.status, Status::Invalid);
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn cancellation_short_circuits_before_lookup() {
        let verifier = Verifier::with_resolver(
            VerifierOptions::default(),
            MxResolver::with_lookup_for_tests(|_| Ok(vec![])),
        );
        let flag = AtomicBool::new(true);
        let result = verifier.verify_with_cancel("u@target.example", &flag);
        assert_eq!(result.reason, "cancelled");
    }
}
