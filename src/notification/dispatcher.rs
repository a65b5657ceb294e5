use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, PushError};
use crate::metrics::{RecipientMetrics, RequestMetrics};
use crate::retry::RetryPolicy;
use crate::transport::{GatewayRequest, HttpTransport, Transport};

use super::batch::{batch_count, batches, Recipients, RequestMode};
use super::message::Notification;
use super::outcome::{BatchOutcome, Outcome, SendOutcome};
use super::wire::{reconcile_form_response, reconcile_multicast_response};

/// Statistics for the push dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Total `send` calls that returned an outcome
    pub sends_succeeded: AtomicU64,
    /// Total `send` calls that returned an error
    pub sends_failed: AtomicU64,
    /// Gateway requests answered with HTTP 200
    pub requests_completed: AtomicU64,
    /// Recipients accepted by the gateway
    pub recipients_delivered: AtomicU64,
    /// Recipients rejected by the gateway
    pub recipients_failed: AtomicU64,
    /// Recipients reported with a replacement identifier
    pub recipients_replaced: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            sends_succeeded: self.sends_succeeded.load(Ordering::Relaxed),
            sends_failed: self.sends_failed.load(Ordering::Relaxed),
            requests_completed: self.requests_completed.load(Ordering::Relaxed),
            recipients_delivered: self.recipients_delivered.load(Ordering::Relaxed),
            recipients_failed: self.recipients_failed.load(Ordering::Relaxed),
            recipients_replaced: self.recipients_replaced.load(Ordering::Relaxed),
        }
    }

    fn record_single(&self, outcome: &Outcome) {
        if outcome.is_delivered() {
            self.recipients_delivered.fetch_add(1, Ordering::Relaxed);
            RecipientMetrics::record_delivered(1);
        } else if let Some(error) = outcome.error() {
            self.recipients_failed.fetch_add(1, Ordering::Relaxed);
            RecipientMetrics::record_failed(error, 1);
        }
        if outcome.replacement().is_some() {
            self.recipients_replaced.fetch_add(1, Ordering::Relaxed);
            RecipientMetrics::record_replaced(1);
        }
    }

    fn record_batch(&self, outcome: &BatchOutcome) {
        self.recipients_delivered
            .fetch_add(outcome.success_count(), Ordering::Relaxed);
        self.recipients_failed
            .fetch_add(outcome.failure_count(), Ordering::Relaxed);
        self.recipients_replaced
            .fetch_add(outcome.replacement_count(), Ordering::Relaxed);

        RecipientMetrics::record_delivered(outcome.success_count());
        for (error, recipients) in outcome.failures() {
            RecipientMetrics::record_failed(error, recipients.len() as u64);
        }
        RecipientMetrics::record_replaced(outcome.replacement_count());
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub sends_succeeded: u64,
    pub sends_failed: u64,
    pub requests_completed: u64,
    pub recipients_delivered: u64,
    pub recipients_failed: u64,
    pub recipients_replaced: u64,
}

/// Sends notifications to the push gateway.
///
/// Configuration is fixed at construction; a dispatcher can be shared
/// between tasks and `send` called concurrently. Within one `send`, chunks
/// and attempts run strictly one after another.
pub struct Dispatcher {
    config: GatewayConfig,
    policy: RetryPolicy,
    transport: Arc<dyn Transport>,
    stats: DispatcherStats,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher using the `reqwest` transport
    pub fn new(config: GatewayConfig) -> Result<Self, PushError> {
        let config = config.sanitized();
        let transport = HttpTransport::new(config.request_timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a dispatcher with a custom transport
    pub fn with_transport(config: GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        let config = config.sanitized();
        let policy = config.retry_policy();

        tracing::debug!(
            url = %config.url(),
            max_attempts = policy.max_attempts,
            backoff_delay_ms = policy.backoff.initial_delay_ms,
            backoff_factor = policy.backoff.multiplier,
            "Push dispatcher initialized"
        );

        Self {
            config,
            policy,
            transport,
            stats: DispatcherStats::default(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Send `notification` to `recipients`.
    ///
    /// One recipient is sent with the flat protocol and yields
    /// `SendOutcome::Single`. Several recipients are sent as JSON in chunks
    /// of at most 1000, one chunk after another, and yield
    /// `SendOutcome::Batch`. If any chunk fails after its attempts are used
    /// up, the whole send fails and earlier chunk results are dropped.
    ///
    /// `retries == 0` makes exactly one attempt per request; otherwise up to
    /// `retries` attempts (capped by `max_attempts`) with exponential backoff.
    #[tracing::instrument(
        name = "dispatcher.send",
        skip(self, notification, recipients),
        fields(send_id = %Uuid::new_v4())
    )]
    pub async fn send(
        &self,
        notification: &Notification,
        recipients: impl Into<Recipients>,
        retries: u32,
    ) -> Result<SendOutcome, PushError> {
        let result = self.send_inner(notification, recipients.into(), retries).await;

        match &result {
            Ok(SendOutcome::Single(outcome)) => {
                self.stats.sends_succeeded.fetch_add(1, Ordering::Relaxed);
                self.stats.record_single(outcome);
            }
            Ok(SendOutcome::Batch(outcome)) => {
                self.stats.sends_succeeded.fetch_add(1, Ordering::Relaxed);
                self.stats.record_batch(outcome);
            }
            Err(e) => {
                self.stats.sends_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, code = e.code(), "Push send failed");
            }
        }

        result
    }

    async fn send_inner(
        &self,
        notification: &Notification,
        recipients: Recipients,
        retries: u32,
    ) -> Result<SendOutcome, PushError> {
        if !self.config.has_api_key() {
            return Err(PushError::Configuration(
                "gateway api_key is not set".to_string(),
            ));
        }

        let mode = recipients.mode()?;
        let recipients = recipients.into_vec();

        match mode {
            RequestMode::Flat => {
                let outcome = self.send_flat(notification, &recipients[0], retries).await?;
                Ok(SendOutcome::Single(outcome))
            }
            RequestMode::Structured => {
                let outcome = self
                    .send_structured(notification, &recipients, retries)
                    .await?;
                Ok(SendOutcome::Batch(outcome))
            }
        }
    }

    async fn send_flat(
        &self,
        notification: &Notification,
        recipient: &str,
        retries: u32,
    ) -> Result<Outcome, PushError> {
        let body = notification.form_body(recipient)?;
        let request = self.build_request(RequestMode::Flat, body);

        let response = self.post_with_retry(&request, RequestMode::Flat, retries).await?;
        let outcome = reconcile_form_response(&response, recipient)?;

        tracing::debug!(
            delivered = outcome.is_delivered(),
            replaced = outcome.replacement().is_some(),
            "Single recipient send reconciled"
        );

        Ok(outcome)
    }

    async fn send_structured(
        &self,
        notification: &Notification,
        recipients: &[String],
        retries: u32,
    ) -> Result<BatchOutcome, PushError> {
        // Validate every chunk before the first request goes out
        let bodies = batches(recipients)
            .map(|chunk| notification.structured_body(chunk))
            .collect::<Result<Vec<_>, _>>()?;

        let total = batch_count(recipients.len());
        let mut outcome = BatchOutcome::new();

        for (index, (chunk, body)) in batches(recipients).zip(bodies).enumerate() {
            let request = self.build_request(RequestMode::Structured, body);

            let response = self
                .post_with_retry(&request, RequestMode::Structured, retries)
                .await
                .inspect_err(|e| {
                    tracing::warn!(
                        batch = index + 1,
                        batches = total,
                        error = %e,
                        "Batch failed, abandoning send"
                    );
                })?;

            let partial = reconcile_multicast_response(&response, chunk)?;

            tracing::debug!(
                batch = index + 1,
                batches = total,
                recipients = chunk.len(),
                success = partial.success_count(),
                failures = partial.failure_count(),
                replacements = partial.replacement_count(),
                "Batch reconciled"
            );

            outcome.merge(partial);
        }

        Ok(outcome)
    }

    fn build_request(&self, mode: RequestMode, body: String) -> GatewayRequest {
        GatewayRequest {
            url: self.config.url(),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("key={}", self.config.api_key),
                ),
                ("Content-Type".to_string(), mode.content_type().to_string()),
                ("Content-Length".to_string(), body.len().to_string()),
            ],
            body,
        }
    }

    /// Post until the gateway answers 200 or the attempts run out.
    /// Returns the 200 response body.
    async fn post_with_retry(
        &self,
        request: &GatewayRequest,
        mode: RequestMode,
        retries: u32,
    ) -> Result<String, PushError> {
        let body = self
            .policy
            .run(retries, |attempt| self.post_once(request, attempt))
            .await?;

        self.stats.requests_completed.fetch_add(1, Ordering::Relaxed);
        RequestMetrics::record_completed(mode.as_str());
        Ok(body)
    }

    async fn post_once(&self, request: &GatewayRequest, attempt: u32) -> Result<String, PushError> {
        let started = Instant::now();
        let result = self.transport.post(request).await;
        RequestMetrics::record_latency(started.elapsed());

        let response = result.map_err(|e| {
            RequestMetrics::record_error("TRANSPORT_ERROR");
            PushError::Transport(e)
        })?;

        tracing::debug!(attempt, status = response.status, "Gateway responded");

        match GatewayError::from_status(response.status, &response.body) {
            None => Ok(response.body),
            Some(e) => {
                RequestMetrics::record_error(e.code());
                Err(PushError::Gateway(e))
            }
        }
    }
}
