//! Retry-with-backoff around single page requests, plus page-end detection.
use rand::Rng;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::error::FetchError;
use crate::model::ReportQuery;
use crate::wb::SearchReportApi;

/// Bounded exponential backoff with jitter; 429 responses get a long floor.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per page, including the first one.
    pub max_attempts: u32,
    pub base: Duration,
    pub jitter: Duration,
    pub rate_limit_floor: Duration,
    pub rate_limit_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base: Duration::from_secs(5),
            jitter: Duration::from_secs(1),
            rate_limit_floor: Duration::from_secs(30),
            rate_limit_jitter: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    /// `base * 2^(attempt-1)`, without jitter. `attempt` is 1-based.
    pub fn exponential(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base.saturating_mul(1_u32 << shift)
    }

    /// Wait before the attempt following failed attempt number `attempt`.
    pub fn delay_for(&self, attempt: u32, err: &FetchError) -> Duration {
        let wait = self
            .exponential(attempt)
            .saturating_add(random_up_to(self.jitter));
        if err.is_rate_limited() {
            let floor = self
                .rate_limit_floor
                .saturating_add(random_up_to(self.rate_limit_jitter));
            wait.max(floor)
        } else {
            wait
        }
    }
}

fn random_up_to(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..max.as_secs_f64()))
}

/// A page shorter than requested, or empty, is the last one for its date.
/// With `stop_on_short_page` off only an empty page ends pagination.
pub fn is_last_page(len: usize, limit: u32, stop_on_short_page: bool) -> bool {
    len == 0 || (stop_on_short_page && len < limit as usize)
}

pub struct PageFetcher<A> {
    api: A,
    policy: RetryPolicy,
}

impl<A: SearchReportApi> PageFetcher<A> {
    pub fn new(api: A, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch one page, retrying transient failures. Fatal failures return at once.
    #[instrument(skip_all, fields(report_date = %query.report_date, offset = offset, limit = limit))]
    pub async fn fetch(
        &self,
        query: &ReportQuery,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Value>, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let err = match self.api.fetch_page(query, offset, limit).await {
                Ok(products) => {
                    if attempt > 1 {
                        info!(attempt, "page fetched after retry");
                    }
                    return Ok(products);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            if attempt >= max_attempts {
                return Err(FetchError::RetriesExhausted {
                    attempts: attempt,
                    last: err.to_string(),
                });
            }

            let wait = self.policy.delay_for(attempt, &err);
            warn!(
                attempt,
                max_attempts,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "transient fetch failure; backing off"
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}
