use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::client::ChatError;
use crate::handlers::WhiteboardService;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    Message(MessageEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Message(_) => SlackEventType::Message,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }

    /// Decodes the `event` object of an Events API callback. Bot-authored
    /// messages and edits come back as `Unsupported` so the bot never
    /// answers itself.
    pub fn from_event_json(value: &serde_json::Value) -> Self {
        let raw: RawEvent = match serde_json::from_value(value.clone()) {
            Ok(raw) => raw,
            Err(_) => return Self::Unsupported { event_type: "malformed".to_owned() },
        };

        let unsupported = |event_type: String| Self::Unsupported { event_type };
        if raw.event_type != "message" {
            return unsupported(raw.event_type);
        }
        if raw.bot_id.is_some() {
            return unsupported("message.bot".to_owned());
        }
        if let Some(subtype) = raw.subtype.as_deref().filter(|subtype| *subtype != "file_share") {
            return unsupported(format!("message.{subtype}"));
        }
        let (Some(channel_id), Some(user_id)) = (raw.channel, raw.user) else {
            return unsupported("message.anonymous".to_owned());
        };

        let text = raw.text.unwrap_or_default();
        let upload = raw.files.into_iter().next().map(|file| FileUpload {
            title: file.title.unwrap_or_default(),
            permalink: file.permalink.unwrap_or_default(),
            initial_comment: text.clone(),
        });
        Self::Message(MessageEvent { channel_id, user_id, text, upload })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Message,
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    files: Vec<RawFile>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub title: String,
    pub permalink: String,
    pub initial_comment: String,
}

impl FileUpload {
    /// Entry body for an uploaded image: the comment followed by an inline tag.
    pub fn image_body(&self) -> String {
        format!(
            "{}\n<img src=\"{}\" style=\"max-width: 500px\">",
            self.initial_comment, self.permalink
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub upload: Option<FileUpload>,
}

impl MessageEvent {
    /// Uploads carry the command in their title rather than the message text.
    pub fn input_text(&self) -> &str {
        match &self.upload {
            Some(upload) => &upload.title,
            None => &self.text,
        }
    }
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
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Chat(#[from] ChatError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
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
        envelope: &SlackEnvelope,
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

pub fn whiteboard_dispatcher(service: Arc<WhiteboardService>) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(service));
    dispatcher
}

pub struct MessageHandler {
    service: Arc<WhiteboardService>,
}

impl MessageHandler {
    pub fn new(service: Arc<WhiteboardService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Message
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let handled = self.service.handle_message(event, ctx).await?;
        Ok(if handled { HandlerResult::Processed } else { HandlerResult::Ignored })
    }
}
