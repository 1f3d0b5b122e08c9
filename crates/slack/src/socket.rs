use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::{EventContext, EventDispatcher, SlackEnvelope, SlackEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl Default for SocketModeRunner {
    fn default() -> Self {
        Self {
            transport: Arc::new(NoopSocketTransport),
            dispatcher: Arc::new(EventDispatcher::new()),
            reconnect_policy: ReconnectPolicy::default(),
        }
    }
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: Arc<EventDispatcher>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    /// Runs sessions until the transport closes cleanly or consecutive
    /// failures use up the retry budget. A session that delivered at least
    /// one envelope resets the budget.
    pub async fn start(&self) -> Result<()> {
        let mut attempt = 0;
        loop {
            let mut delivered = 0;
            let Err(transport_error) = self.connect_and_pump(attempt, &mut delivered).await else {
                return Ok(());
            };
            if delivered > 0 {
                attempt = 0;
            }
            warn!(
                attempt,
                delivered,
                max_retries = self.reconnect_policy.max_retries,
                error = %transport_error,
                "socket mode transport failed"
            );

            if attempt >= self.reconnect_policy.max_retries {
                warn!(
                    max_retries = self.reconnect_policy.max_retries,
                    "socket mode retries exhausted; continuing process without crash"
                );
                return Ok(());
            }

            let delay = self.reconnect_policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    async fn connect_and_pump(
        &self,
        attempt: u32,
        delivered: &mut usize,
    ) -> Result<(), TransportError> {
        info!(attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        info!(attempt, "socket mode transport connected");

        let mut in_flight = JoinSet::new();
        let outcome = self.pump(&mut in_flight, delivered).await;

        // Commands already accepted still get their replies.
        while let Some(joined) = in_flight.join_next().await {
            log_abnormal_exit(joined);
        }

        outcome?;
        self.transport.disconnect().await
    }

    async fn pump(
        &self,
        in_flight: &mut JoinSet<()>,
        delivered: &mut usize,
    ) -> Result<(), TransportError> {
        loop {
            let next = self.transport.next_envelope().await;
            while let Some(joined) = in_flight.try_join_next() {
                log_abnormal_exit(joined);
            }

            let Some(envelope) = next? else {
                info!("socket mode transport stream closed");
                return Ok(());
            };
            *delivered += 1;
            let correlation_id = Uuid::new_v4().to_string();
            let (channel_id, user_id) = correlation_fields(&envelope);

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %correlation_id,
                channel_id = channel_id.unwrap_or("unknown"),
                user_id = user_id.unwrap_or("unknown"),
                "received slack envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %correlation_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %correlation_id,
                    "acknowledged slack envelope"
                );
            }

            // Each event gets its own task. Per-user draft locks keep one
            // user's commands from interleaving; they do not preserve arrival
            // order.
            let dispatcher = Arc::clone(&self.dispatcher);
            in_flight.spawn(async move {
                let context = EventContext { correlation_id };
                if let Err(error) = dispatcher.dispatch(&envelope, &context).await {
                    warn!(
                        envelope_id = %envelope.envelope_id,
                        correlation_id = %context.correlation_id,
                        error = %error,
                        "event dispatch failed; continuing socket loop"
                    );
                }
            });
        }
    }
}

fn log_abnormal_exit(joined: Result<(), JoinError>) {
    if let Err(error) = joined {
        warn!(error = %error, "event task ended abnormally");
    }
}

fn correlation_fields(envelope: &SlackEnvelope) -> (Option<&str>, Option<&str>) {
    match &envelope.event {
        SlackEvent::Message(event) => (Some(&event.channel_id), Some(&event.user_id)),
        SlackEvent::Unsupported { .. } => (None, None),
    }
}
