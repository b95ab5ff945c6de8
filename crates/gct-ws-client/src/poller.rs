/*
[INPUT]:  A request, the response event it expects, a resend policy and cancel token
[OUTPUT]: The matching envelope, or a give-up outcome after bounded resends
[POS]:    Request layer - resend-on-timeout for request/response exchanges
[UPDATE]: When changing resend cadence, ceiling, or cancellation semantics
*/

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::types::{EventType, Request};
use crate::ws::{Envelope, RequestSink, Subscription, SubscriptionError};

pub const DEFAULT_RESEND_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_RESENDS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendPolicy {
    pub interval: Duration,
    pub max_resends: u32,
}

impl Default for ResendPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RESEND_INTERVAL,
            max_resends: DEFAULT_MAX_RESENDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Received { envelope: Envelope, resends: u32 },
    GaveUp { resends: u32 },
    Cancelled { resends: u32 },
    Closed { resends: u32 },
}

impl PollOutcome {
    pub fn envelope(self) -> Option<Envelope> {
        match self {
            PollOutcome::Received { envelope, .. } => Some(envelope),
            _ => None,
        }
    }

    /// For exchanges where silence is a failure: `GaveUp` becomes
    /// `ClientError::Timeout`, `Closed` a websocket error, `Cancelled` is `None`.
    pub fn into_result(self, event: &EventType) -> Result<Option<Envelope>> {
        match self {
            PollOutcome::Received { envelope, .. } => Ok(Some(envelope)),
            PollOutcome::GaveUp { resends } => Err(ClientError::Timeout {
                event: event.to_string(),
                attempts: resends + 1,
            }),
            PollOutcome::Closed { .. } => Err(ClientError::WebSocket(format!(
                "connection closed before {event} response"
            ))),
            PollOutcome::Cancelled { .. } => Ok(None),
        }
    }

    pub fn resends(&self) -> u32 {
        match self {
            PollOutcome::Received { resends, .. }
            | PollOutcome::GaveUp { resends }
            | PollOutcome::Cancelled { resends }
            | PollOutcome::Closed { resends } => *resends,
        }
    }
}

/// Issues a request and re-issues it on every empty tick until the expected
/// event arrives, the ceiling is hit, or the token is cancelled.
#[derive(Debug, Clone)]
pub struct ResendPoller {
    policy: ResendPolicy,
    cancel: CancellationToken,
}

impl ResendPoller {
    pub fn new(policy: ResendPolicy) -> Self {
        Self::with_cancel(policy, CancellationToken::new())
    }

    pub fn with_cancel(policy: ResendPolicy, cancel: CancellationToken) -> Self {
        Self { policy, cancel }
    }

    pub fn policy(&self) -> ResendPolicy {
        self.policy
    }

    /// Handle that stops every poll running on this poller.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// `subscription` must be taken before calling so the first reply is not missed.
    pub async fn poll<S>(
        &self,
        sink: &S,
        mut subscription: Subscription,
        request: &Request,
        expected: &EventType,
    ) -> PollOutcome
    where
        S: RequestSink + ?Sized,
    {
        sink.send(request);

        let start = Instant::now() + self.policy.interval;
        let mut ticker = interval_at(start, self.policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut resends: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(event = %expected, resends, "poll cancelled");
                    return PollOutcome::Cancelled { resends };
                }
                received = subscription.next_event(expected) => {
                    return match received {
                        Ok(envelope) => PollOutcome::Received { envelope, resends },
                        Err(SubscriptionError::Closed) | Err(SubscriptionError::Lagged(_)) => {
                            debug!(event = %expected, resends, "stream closed while polling");
                            PollOutcome::Closed { resends }
                        }
                    };
                }
                _ = ticker.tick() => {
                    if resends >= self.policy.max_resends {
                        warn!(
                            event = %expected,
                            resends,
                            "no response after resend ceiling; check that the bot is running"
                        );
                        return PollOutcome::GaveUp { resends };
                    }
                    resends += 1;
                    debug!(event = %expected, attempt = resends, "no response yet, resending");
                    sink.send(request);
                }
            }
        }
    }
}

impl Default for ResendPoller {
    fn default() -> Self {
        Self::new(ResendPolicy::default())
    }
}
