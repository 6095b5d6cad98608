//! The retry loop around a [`ReachabilityProbe`].

use crate::backoff::ExponentialBackoff;
use crate::error::{ConnectError, ConnectResult};
use crate::policy::{RetryMode, RetryPolicy};
use crate::probe::{Credentials, HttpProbe, ReachabilityProbe};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Probes until the endpoint answers, the retries run out, or `cancel` fires.
///
/// Every attempt is bounded by `policy.attempt_timeout`; a timed-out attempt
/// counts as a failed one. With [`RetryMode::Finite`] the probe runs at most
/// `retries + 1` times. With [`RetryMode::Infinite`] the only error ever
/// returned is [`ConnectError::Cancelled`].
pub async fn check_connectivity<P>(
    probe: &P,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> ConnectResult<()>
where
    P: ReachabilityProbe + ?Sized,
{
    let mode = policy.mode();
    let mut backoff = ExponentialBackoff::new(policy.min_backoff, policy.max_backoff);
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConnectError::Cancelled),
            outcome = tokio::time::timeout(policy.attempt_timeout, probe.probe()) => outcome,
        };

        let error = match outcome {
            Ok(Ok(())) => {
                info!(attempts = attempt, "Collector endpoint reachable");
                return Ok(());
            }
            Ok(Err(e)) => e,
            Err(_) => ConnectError::Timeout(policy.attempt_timeout),
        };

        if let RetryMode::Finite(retries) = mode {
            if attempt > retries {
                warn!(attempts = attempt, error = %error, "Giving up on collector connectivity");
                return Err(ConnectError::ConnectionFailed {
                    attempts: attempt,
                    last_error: Box::new(error),
                });
            }
        }

        let wait = backoff.next_wait();
        warn!(
            attempt,
            error = %error,
            retry_in = ?wait,
            "Collector endpoint not reachable, retrying"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConnectError::Cancelled),
            _ = tokio::time::sleep(wait) => {}
        }
    }
}

/// Startup connectivity check against the collector over HTTP.
pub struct ConnectivityBootstrapper {
    probe: HttpProbe,
    policy: RetryPolicy,
}

impl ConnectivityBootstrapper {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: Credentials,
        policy: RetryPolicy,
    ) -> ConnectResult<Self> {
        Ok(Self {
            probe: HttpProbe::new(endpoint, &credentials)?,
            policy,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn probe(&self) -> &HttpProbe {
        &self.probe
    }

    /// Runs [`check_connectivity`] with this bootstrapper's probe and policy.
    pub async fn run(&self, cancel: &CancellationToken) -> ConnectResult<()> {
        info!(
            endpoint = %self.probe.endpoint(),
            retries = self.policy.retries,
            timeout = ?self.policy.attempt_timeout,
            "Checking collector connectivity"
        );
        check_connectivity(&self.probe, &self.policy, cancel).await
    }
}
