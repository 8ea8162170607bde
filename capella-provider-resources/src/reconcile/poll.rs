use std::fmt::{Display, Formatter, Result as FmtResult};
use std::future::Future;
use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

use capella_provider_common::config::PollSettings;
use capella_provider_common::telemetry::{debug, info, warn};

use crate::error::{ProviderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Converged,
    TimedOut,
    Failed,
    WrongTerminal,
    Cancelled,
}

impl Display for PollState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PollState::Polling => write!(f, "Polling"),
            PollState::Converged => write!(f, "Converged"),
            PollState::TimedOut => write!(f, "TimedOut"),
            PollState::Failed => write!(f, "Failed"),
            PollState::WrongTerminal => write!(f, "WrongTerminal"),
            PollState::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Waits for a remote resource to report a target status.
///
/// The poller owns its timing for one wait only. A fetch error ends the
/// wait at once without retrying; cancellation and the deadline are only
/// checked between fetches, never while one is in flight.
#[derive(Debug, Clone)]
pub struct Poller {
    resource: String,
    target: String,
    terminal: Vec<String>,
    interval: Duration,
    timeout: Duration,
    initial_delay: Duration,
    max_interval: Option<Duration>,
    cancel: CancellationToken,
}

impl Poller {
    /// Create a poller from configured timings
    ///
    /// # Arguments
    /// * `resource` - Human readable name of the resource being watched
    /// * `target` - The status that ends the wait successfully
    /// * `settings` - Interval, timeout, initial delay and back-off cap
    pub fn new(resource: impl Into<String>, target: impl Into<String>, settings: &PollSettings) -> Self {
        Poller {
            resource: resource.into(),
            target: target.into(),
            terminal: Vec::new(),
            interval: settings.interval(),
            timeout: settings.timeout(),
            initial_delay: settings.initial_delay(),
            max_interval: settings.max_interval(),
            cancel: CancellationToken::new(),
        }
    }

    /// Statuses after which the remote side will not change on its own.
    pub fn terminal<S: AsRef<str>>(mut self, statuses: &[S]) -> Self {
        self.terminal = statuses.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Decide the state a fetched status moves the wait into.
    pub fn classify(&self, status: &str) -> PollState {
        if status == self.target {
            PollState::Converged
        } else if self.terminal.iter().any(|t| t == status) {
            PollState::WrongTerminal
        } else {
            PollState::Polling
        }
    }

    /// Poll `fetch` until it reports the target status
    ///
    /// # Arguments
    /// * `fetch` - Returns the current remote status
    ///
    /// # Returns
    /// The converged status, or the error that ended the wait
    pub async fn wait<F, Fut>(&self, mut fetch: F) -> Result<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut delay = self.initial_delay;
        let mut next_interval = self.interval;
        let mut fetches: u32 = 0;

        loop {
            let wake = Instant::now() + delay;
            let timed_out = wake > deadline;

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(self.finish(PollState::Cancelled, fetches, None));
                },
                _ = sleep_until(wake.min(deadline)) => {
                    if timed_out {
                        return Err(self.finish(PollState::TimedOut, fetches, None));
                    }
                },
            }

            fetches += 1;
            let status = match fetch().await {
                Ok(status) => status,
                Err(e) => {
                    warn!(
                        event = "PollFailed",
                        resource = self.resource.as_str(),
                        target = self.target.as_str(),
                        state = %PollState::Failed,
                        fetches = fetches,
                        error = %e,
                    );
                    return Err(e);
                },
            };

            match self.classify(&status) {
                PollState::Converged => {
                    info!(
                        event = "PollConverged",
                        resource = self.resource.as_str(),
                        status = status.as_str(),
                        state = %PollState::Converged,
                        fetches = fetches,
                    );
                    return Ok(status);
                },
                PollState::WrongTerminal => {
                    return Err(self.finish(PollState::WrongTerminal, fetches, Some(status)));
                },
                _ => {
                    debug!(
                        event = "Polling",
                        resource = self.resource.as_str(),
                        status = status.as_str(),
                        target = self.target.as_str(),
                        fetches = fetches,
                    );
                },
            }

            delay = next_interval;
            if let Some(cap) = self.max_interval {
                next_interval = (next_interval * 2).min(cap);
            }
        }
    }

    fn finish(&self, state: PollState, fetches: u32, status: Option<String>) -> ProviderError {
        warn!(
            event = "PollStopped",
            resource = self.resource.as_str(),
            target = self.target.as_str(),
            state = %state,
            status = status.as_deref().unwrap_or_default(),
            fetches = fetches,
        );

        match state {
            PollState::WrongTerminal => ProviderError::WrongTerminalState {
                resource: self.resource.clone(),
                actual: status.unwrap_or_default(),
                target: self.target.clone(),
            },
            PollState::Cancelled => ProviderError::Cancelled,
            _ => ProviderError::ConvergenceTimeout {
                resource: self.resource.clone(),
                target: self.target.clone(),
            },
        }
    }
}
