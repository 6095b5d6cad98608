//! Collector connectivity bootstrap.
//!
//! Before the agent starts collecting, it checks that the collector endpoint
//! answers at all. The check retries with exponential backoff, either a
//! fixed number of times or forever, and every attempt is bounded by a
//! timeout. A [`CancellationToken`](tokio_util::sync::CancellationToken)
//! interrupts it at any point.

mod backoff;
mod bootstrap;
mod error;
mod policy;
mod probe;

pub use backoff::ExponentialBackoff;
pub use bootstrap::{check_connectivity, ConnectivityBootstrapper};
pub use error::{ConnectError, ConnectResult};
pub use policy::{RetryMode, RetryPolicy};
pub use probe::{Credentials, HttpProbe, ReachabilityProbe, LICENSE_KEY_HEADER};
