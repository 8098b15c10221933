use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::commands::{CollectionCommandService, CommandRouter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub envelope_id: String,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    /// The transport finished its handshake and can send messages.
    Ready,
    Message(MessageEvent),
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::Ready => ChatEventType::Ready,
            Self::Message(_) => ChatEventType::Message,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    Ready,
    Message,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub author_id: String,
    pub author_is_bot: bool,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Replied { channel_id: String, text: String },
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("{handler} handler cannot process {received:?} events")]
    Misrouted { handler: &'static str, received: ChatEventType },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChatEventType;
    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChatEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher wired for the bot: readiness goes to `ready`, prefixed messages
/// go through the command router.
pub fn command_dispatcher<S>(router: CommandRouter<S>, ready: watch::Sender<bool>) -> EventDispatcher
where
    S: CollectionCommandService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(ReadyHandler::new(ready));
    dispatcher.register(MessageCommandHandler::new(router));
    dispatcher
}

/// Publishes transport readiness. Reconnects re-send `Ready`; the flag only
/// ever moves to `true`.
pub struct ReadyHandler {
    ready: watch::Sender<bool>,
}

impl ReadyHandler {
    pub fn new(ready: watch::Sender<bool>) -> Self {
        Self { ready }
    }
}

#[async_trait]
impl EventHandler for ReadyHandler {
    fn event_type(&self) -> ChatEventType {
        ChatEventType::Ready
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        if envelope.event != ChatEvent::Ready {
            return Err(EventHandlerError::Misrouted {
                handler: "ready",
                received: envelope.event.event_type(),
            });
        }

        let was_ready = self.ready.send_replace(true);
        info!(
            event_name = "ingress.chat.ready",
            correlation_id = %ctx.correlation_id,
            first = !was_ready,
            "chat transport ready"
        );
        Ok(HandlerResult::Processed)
    }
}

pub struct MessageCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> MessageCommandHandler<S>
where
    S: CollectionCommandService,
{
    pub fn new(router: CommandRouter<S>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl<S> EventHandler for MessageCommandHandler<S>
where
    S: CollectionCommandService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::Message
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::Message(message) = &envelope.event else {
            return Err(EventHandlerError::Misrouted {
                handler: "message",
                received: envelope.event.event_type(),
            });
        };

        if message.author_is_bot {
            debug!(
                correlation_id = %ctx.correlation_id,
                author_id = %message.author_id,
                "ignoring bot-authored message"
            );
            return Ok(HandlerResult::Ignored);
        }

        Ok(match self.router.reply(&message.text, &ctx.correlation_id).await {
            Some(text) => HandlerResult::Replied { channel_id: message.channel_id.clone(), text },
            None => HandlerResult::Ignored,
        })
    }
}
