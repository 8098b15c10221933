use std::{
    sync::atomic::{AtomicBool, Ordering},
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{ChatEnvelope, ChatEvent, EventContext, EventDispatcher, HandlerResult};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
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

/// Outbound half of a chat platform: post text to a channel.
#[async_trait]
pub trait OutboundMessenger: Send + Sync {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), TransportError>;
}

/// A chat platform connection. `next_envelope` returning `Ok(None)` means the
/// stream closed cleanly.
#[async_trait]
pub trait ChatTransport: OutboundMessenger {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Reports ready once, then stays silent. Outbound messages are only logged.
#[derive(Default)]
pub struct NoopTransport {
    ready_sent: AtomicBool,
}

#[async_trait]
impl OutboundMessenger for NoopTransport {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), TransportError> {
        info!(
            event_name = "egress.chat.noop_send",
            channel_id,
            chars = text.chars().count(),
            "dropping outbound message"
        );
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for NoopTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        if !self.ready_sent.swap(true, Ordering::SeqCst) {
            return Ok(Some(ChatEnvelope {
                envelope_id: "noop-ready".to_owned(),
                event: ChatEvent::Ready,
            }));
        }
        std::future::pending().await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

struct SessionFailure {
    error: TransportError,
    received_envelope: bool,
}

pub struct ChatRunner {
    transport: Arc<dyn ChatTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
}

impl ChatRunner {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    /// Runs sessions until the stream closes cleanly or `max_retries`
    /// consecutive sessions fail. A session that received at least one
    /// envelope resets the retry budget and the backoff.
    pub async fn start(&self) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            let Err(failure) = self.connect_and_pump(attempt).await else {
                return Ok(());
            };

            if failure.received_envelope {
                attempt = 0;
            }

            warn!(
                attempt,
                max_retries = self.reconnect_policy.max_retries,
                received_envelope = failure.received_envelope,
                error = %failure.error,
                "chat transport failed"
            );

            if attempt >= self.reconnect_policy.max_retries {
                warn!(
                    max_retries = self.reconnect_policy.max_retries,
                    "chat transport retries exhausted; continuing process without crash"
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

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), SessionFailure> {
        let mut received_envelope = false;
        let fail = |error, received_envelope| SessionFailure { error, received_envelope };

        info!(attempt, "opening chat transport connection");
        self.transport.connect().await.map_err(|error| fail(error, false))?;
        info!(attempt, "chat transport connected");

        loop {
            let next = self
                .transport
                .next_envelope()
                .await
                .map_err(|error| fail(error, received_envelope))?;
            let Some(envelope) = next else {
                info!(attempt, "chat transport stream closed");
                self.transport.disconnect().await.map_err(|error| fail(error, received_envelope))?;
                return Ok(());
            };
            received_envelope = true;

            info!(
                event_name = "ingress.chat.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                "received chat envelope"
            );

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Replied { channel_id, text }) => {
                    self.deliver(&context, &channel_id, &text).await;
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(
                        envelope_id = %envelope.envelope_id,
                        correlation_id = %envelope.envelope_id,
                        error = %error,
                        "event dispatch failed; continuing chat loop"
                    );
                }
            }
        }
    }

    async fn deliver(&self, context: &EventContext, channel_id: &str, text: &str) {
        match self.transport.send_message(channel_id, text).await {
            Ok(()) => debug!(
                event_name = "egress.chat.reply_sent",
                correlation_id = %context.correlation_id,
                channel_id,
                "reply sent"
            ),
            Err(error) => warn!(
                event_name = "egress.chat.reply_sent",
                correlation_id = %context.correlation_id,
                channel_id,
                error = %error,
                "failed to send reply"
            ),
        }
    }
}
