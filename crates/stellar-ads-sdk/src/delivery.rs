//! Delivery client: bounded, retryable calls to the ad backend.
//!
//! - `GET /api/ad` is retried on transport failures, non-2xx statuses,
//!   malformed bodies, and timeouts, up to the configured attempt cap. A
//!   well-formed "no ad" answer is final and never retried.
//! - Engagement reports get exactly one attempt. The caller decides what
//!   to do with a failure; the client never retries them.
//!
//! Every attempt is bounded by the per-attempt timeout, and the whole fetch
//! (attempts plus backoff) is bounded by `attempts x timeout`. Backoff
//! sleeps are carved out of that budget, so the last attempt may get a
//! slightly shorter deadline than the first.

use std::time::Duration;

use rand::Rng;
use reqwest::header::ACCEPT;
use stellar_ads_types::{
    AdQuery, AdRecord, AdResponse, ClickQuery, EngagementEvent, EngagementKind,
    EngagementResponse, ImpressionRequest, RewardOffer, SlotDeclaration,
};
use tokio::time::{Instant, timeout};
use tracing::{debug, warn};

use crate::error::DeliveryError;

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// First backoff is the timeout divided by this.
const BACKOFF_DIVISOR: u32 = 20;

/// Result of a successful ad fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The backend selected an ad.
    Ad(AdRecord),
    /// The backend answered but had nothing to show.
    NoAd,
}

/// HTTP client for the ad backend.
pub struct DeliveryClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_attempts: u32,
}

impl DeliveryClient {
    /// Create a client for `base_url` (no trailing slash).
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            timeout,
            max_attempts: max_attempts.max(1),
        })
    }

    /// Backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Total wall-clock budget of one [`fetch_ad`](Self::fetch_ad) call.
    pub fn fetch_budget(&self) -> Duration {
        self.timeout.saturating_mul(self.max_attempts)
    }

    /// Fetch an ad for `slot`, retrying per the delivery policy.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's [`DeliveryError`] once every attempt has
    /// failed or the budget is spent.
    pub async fn fetch_ad(&self, slot: &SlotDeclaration) -> Result<FetchOutcome, DeliveryError> {
        let query = AdQuery::new(slot.site_id.clone(), &slot.tags);
        let deadline = Instant::now()
            .checked_add(self.fetch_budget())
            .unwrap_or_else(Instant::now);

        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let remaining = deadline.saturating_duration_since(Instant::now());
            let budget = self.timeout.min(remaining);

            let err = match self.fetch_once(&query, budget).await {
                Ok(outcome) => {
                    debug!(
                        slot_id = %slot.slot_id,
                        attempt = attempt,
                        has_ad = matches!(outcome, FetchOutcome::Ad(_)),
                        "ad fetch settled"
                    );
                    return Ok(outcome);
                }
                Err(err) => err,
            };

            if attempt >= self.max_attempts {
                warn!(
                    slot_id = %slot.slot_id,
                    attempts = attempt,
                    error = %err,
                    "ad fetch failed, attempts exhausted"
                );
                return Err(err);
            }

            let pause = backoff(self.timeout, attempt);
            let after_pause = deadline.saturating_duration_since(Instant::now());
            if after_pause <= pause {
                warn!(
                    slot_id = %slot.slot_id,
                    attempts = attempt,
                    error = %err,
                    "ad fetch failed, time budget exhausted"
                );
                return Err(err);
            }

            debug!(
                slot_id = %slot.slot_id,
                attempt = attempt,
                error = %err,
                backoff_ms = pause.as_millis(),
                "ad fetch attempt failed, retrying"
            );
            tokio::time::sleep(pause).await;
        }
    }

    async fn fetch_once(
        &self,
        query: &AdQuery,
        budget: Duration,
    ) -> Result<FetchOutcome, DeliveryError> {
        let url = format!("{}/api/ad", self.base_url);
        let request = async {
            let response = self
                .http
                .get(&url)
                .query(query)
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| DeliveryError::from_reqwest(&e, budget))?;

            let status = response.status();
            if !status.is_success() {
                return Err(DeliveryError::Status(status.as_u16()));
            }

            response
                .json::<AdResponse>()
                .await
                .map_err(|e| DeliveryError::from_reqwest(&e, budget))
        };

        let body = timeout(budget, request)
            .await
            .map_err(|_elapsed| DeliveryError::Timeout(budget))??;

        Ok(body
            .into_ad()
            .map_or(FetchOutcome::NoAd, FetchOutcome::Ad))
    }

    /// Report an engagement event. One attempt, bounded by the timeout.
    ///
    /// Impressions go out as `POST /api/impression`, clicks as
    /// `GET /api/click`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the call fails; callers log it and
    /// carry on.
    pub async fn report_event(
        &self,
        event: &EngagementEvent,
    ) -> Result<Option<RewardOffer>, DeliveryError> {
        let budget = self.timeout;
        let request = async {
            let builder = match event.kind {
                EngagementKind::Impression => self
                    .http
                    .post(format!("{}/api/impression", self.base_url))
                    .json(&ImpressionRequest::from(event)),
                EngagementKind::Click => self
                    .http
                    .get(format!("{}/api/click", self.base_url))
                    .query(&ClickQuery::from(event)),
            };

            let response = builder
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| DeliveryError::from_reqwest(&e, budget))?;

            let status = response.status();
            if !status.is_success() {
                return Err(DeliveryError::Status(status.as_u16()));
            }

            response
                .json::<EngagementResponse>()
                .await
                .map_err(|e| DeliveryError::from_reqwest(&e, budget))
        };

        let body = timeout(budget, request)
            .await
            .map_err(|_elapsed| DeliveryError::Timeout(budget))??;

        debug!(
            kind = event.kind.as_str(),
            campaign_id = %event.campaign_id,
            site_id = %event.site_id,
            recorded = body.success,
            "engagement reported"
        );
        Ok(body.user_reward)
    }
}

/// Backoff before retry number `attempt + 1`.
///
/// Exponential from `timeout / 20`, capped at two seconds, plus up to a
/// quarter of jitter.
fn backoff(timeout: Duration, attempt: u32) -> Duration {
    let base = timeout
        .checked_div(BACKOFF_DIVISOR)
        .unwrap_or_default()
        .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
        .min(MAX_BACKOFF);
    let jitter_cap = u64::try_from(base.as_millis() / 4).unwrap_or(0);
    let jitter = if jitter_cap == 0 {
        0
    } else {
        rand::rng().random_range(0..=jitter_cap)
    };
    base.saturating_add(Duration::from_millis(jitter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_is_capped() {
        let timeout = Duration::from_millis(8000);
        let first = backoff(timeout, 1);
        let second = backoff(timeout, 2);
        assert!(first >= Duration::from_millis(400) && first <= Duration::from_millis(500));
        assert!(second >= Duration::from_millis(800) && second <= Duration::from_millis(1000));
        assert!(backoff(timeout, 10) <= Duration::from_millis(2500));
    }

    #[test]
    fn budget_is_attempts_times_timeout() {
        let client = DeliveryClient::new("http://127.0.0.1:1", Duration::from_millis(250), 3);
        assert_eq!(
            client.map(|c| c.fetch_budget()).ok(),
            Some(Duration::from_millis(750))
        );
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let client = DeliveryClient::new("http://127.0.0.1:1", Duration::from_millis(100), 0);
        assert_eq!(
            client.map(|c| c.fetch_budget()).ok(),
            Some(Duration::from_millis(100))
        );
    }
}
