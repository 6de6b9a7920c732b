// src/checker/prober.rs
// =============================================================================
// This module checks if a single URL is alive by making HTTP requests.
//
// Key functionality:
// - Tries a HEAD request first (no body download)
// - Falls back to GET when HEAD is rejected (405) or never settles
// - Retries each method up to 3 times with exponential backoff, but only for
//   conditions that can change (timeouts, 429, 5xx...)
// - Sends a browser User-Agent so sites don't block us as a bot
//
// The retry policy is split in two:
// - ProbeOutcome::is_retryable() decides whether ONE attempt is worth repeating
// - Verdict::is_terminal() decides whether the NEXT method is worth trying
//
// Rust concepts:
// - Traits with async methods (via async-trait): so the pipeline can run on a
//   fake prober in tests
// - Enums with data: ProbeOutcome is either a status code or a failure
// =============================================================================

use std::error::Error as _;
use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Method, Response};
use thiserror::Error;
use tracing::{debug, warn};

use super::status::{self, status_text, LivenessStatus};
use super::user_agent;

// Probe strategies, in the order they are tried.
const STRATEGIES: [Method; 2] = [Method::HEAD, Method::GET];

const METHOD_NOT_ALLOWED: u16 = 405;

/// How a transport-level failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The request timed out
    Timeout,
    /// A hiccup that may go away (connection reset, interrupted...)
    Temporary,
    /// Anything else (DNS failure, refused connection, bad URL, TLS...)
    Permanent,
}

impl TransportKind {
    /// Classifies a reqwest error by looking for the I/O error underneath.
    pub fn of(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return TransportKind::Timeout;
        }
        if error.is_builder() || error.is_redirect() {
            return TransportKind::Permanent;
        }

        let mut source = error.source();
        while let Some(cause) = source {
            if let Some(io_error) = cause.downcast_ref::<io::Error>() {
                return match io_error.kind() {
                    io::ErrorKind::TimedOut => TransportKind::Timeout,
                    io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::UnexpectedEof => TransportKind::Temporary,
                    _ => TransportKind::Permanent,
                };
            }
            source = cause.source();
        }

        TransportKind::Permanent
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Timeout => f.write_str("timeout"),
            TransportKind::Temporary => f.write_str("temporary network failure"),
            TransportKind::Permanent => f.write_str("network failure"),
        }
    }
}

/// Why a URL was not classified Alive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The server answered with a non-2xx code
    #[error("{}", status_text(.0))]
    Status(u16),
    /// No usable answer at all
    #[error("{kind}: {message}")]
    Transport { kind: TransportKind, message: String },
}

impl ProbeError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ProbeError::Status(code) => status::is_retryable_code(*code),
            ProbeError::Transport { kind, .. } => {
                matches!(kind, TransportKind::Timeout | TransportKind::Temporary)
            }
        }
    }

    /// The server rejected the method, not the resource.
    pub fn is_method_not_allowed(&self) -> bool {
        matches!(self, ProbeError::Status(METHOD_NOT_ALLOWED))
    }
}

/// The answer for one URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub status: LivenessStatus,
    pub error: Option<ProbeError>,
}

impl Verdict {
    /// Returns true if no further probe strategy should be tried.
    ///
    /// Alive and Dead are final. An Unknown with a non-retryable error is final
    /// too, except for 405, which only says HEAD is not welcome.
    pub fn is_terminal(&self) -> bool {
        match (&self.status, &self.error) {
            (LivenessStatus::Alive | LivenessStatus::Dead, _) => true,
            (LivenessStatus::Unknown, None) => true,
            (LivenessStatus::Unknown, Some(error)) => {
                !error.is_retryable() && !error.is_method_not_allowed()
            }
        }
    }
}

/// Anything that can tell whether a URL is alive.
///
/// Implementations must be safe to call from many tasks at once.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> Verdict;
}

/// Knobs for HttpProber.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Timeout for a whole request, including the response body
    pub timeout: Duration,
    /// Redirects to follow before giving up
    pub max_redirects: usize,
    /// Attempts per strategy
    pub attempts: u32,
    /// Delay before the first retry; doubled for each one after
    pub base_delay: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_redirects: 5,
            attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

// The result of a single HTTP attempt
#[derive(Debug)]
enum ProbeOutcome {
    Status(u16),
    Transport(TransportKind, String),
}

impl ProbeOutcome {
    fn is_retryable(&self) -> bool {
        match self {
            ProbeOutcome::Status(code) => status::is_retryable_code(*code),
            ProbeOutcome::Transport(kind, _) => {
                matches!(kind, TransportKind::Timeout | TransportKind::Temporary)
            }
        }
    }

    fn into_verdict(self) -> Verdict {
        match self {
            ProbeOutcome::Status(code) => {
                let status = status::classify(code);
                let error = (status != LivenessStatus::Alive).then_some(ProbeError::Status(code));
                Verdict { status, error }
            }
            ProbeOutcome::Transport(kind, message) => Verdict {
                status: LivenessStatus::Unknown,
                error: Some(ProbeError::Transport { kind, message }),
            },
        }
    }
}

/// Probes URLs over HTTP(S) with reqwest.
///
/// Cloning is cheap: the reqwest Client inside is reference counted, so all
/// clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    settings: ProbeSettings,
}

impl HttpProber {
    /// Builds a prober with its own HTTP client.
    pub fn new(settings: ProbeSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .build()?;

        Ok(Self { client, settings })
    }

    /// Runs one strategy with retries.
    async fn ping(&self, method: Method, url: &str) -> Verdict {
        let mut delay = self.settings.base_delay;
        let mut attempt = 1;

        loop {
            let outcome = self.attempt(method.clone(), url).await;

            if !outcome.is_retryable() || attempt >= self.settings.attempts {
                return outcome.into_verdict();
            }

            debug!(url, %method, attempt, ?outcome, ?delay, "retrying probe");
            tokio::time::sleep(delay).await;
            delay *= 2;
            attempt += 1;
        }
    }

    async fn attempt(&self, method: Method, url: &str) -> ProbeOutcome {
        let result = self
            .client
            .request(method, url)
            .header(USER_AGENT, user_agent::random())
            .send()
            .await;

        match result {
            Ok(response) => {
                let code = response.status().as_u16();
                if !response.status().is_success() {
                    // Read the body to the end so the connection can be reused
                    drain(response).await;
                }
                ProbeOutcome::Status(code)
            }
            Err(error) => ProbeOutcome::Transport(TransportKind::of(&error), error.to_string()),
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> Verdict {
        let mut verdict = Verdict::default();

        for method in STRATEGIES {
            verdict = self.ping(method, url).await;
            if verdict.is_terminal() {
                break;
            }
            debug!(url, ?verdict, "probe strategy inconclusive, escalating");
        }

        verdict
    }
}

async fn drain(mut response: Response) {
    loop {
        match response.chunk().await {
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(error) => {
                warn!(url = %response.url(), %error, "failed to drain response body");
                break;
            }
        }
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why HEAD first?
//    - HEAD asks for headers only, so a live page costs almost nothing
//    - Some servers answer HEAD with 405, so GET is kept as a fallback
//
// 2. Why is 404 "unknown" and not "dead"?
//    - Plenty of sites answer 404 to bots, or to HEAD, while serving the page
//      to a browser. Only codes that can't be explained that way count as dead.
//
// 3. Why exponential backoff?
//    - A server answering 429/503 is overloaded; hammering it makes it worse.
//      Waiting 100ms, then 200ms gives it room to recover.
// -----------------------------------------------------------------------------
