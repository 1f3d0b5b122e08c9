use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use wbbot_core::domain::entry::{Entry, EntryError, EntryKind, EntryVariant};
use wbbot_core::domain::standup::Standup;
use wbbot_core::errors::BackendError;
use wbbot_core::{Clock, DraftStore, WhiteboardApi};
use wbbot_db::StandupRegistry;

use crate::client::{ChatClient, ChatError, MessageStyle, SlackUser, THUMBS_DOWN};
use crate::commands::{strip_invocation, CommandContext, CommandRouter, WhiteboardCommandService};
use crate::events::{EventContext, MessageEvent};
use crate::normalize::TextNormalizer;
use crate::replies;

/// Collaborators shared by every command handler.
#[derive(Clone)]
pub struct WhiteboardDeps {
    pub chat: Arc<dyn ChatClient>,
    pub whiteboard: Arc<dyn WhiteboardApi>,
    pub registry: Arc<dyn StandupRegistry>,
    pub clock: Arc<dyn Clock>,
    /// Upper bound on every backend call.
    pub backend_timeout: Duration,
}

/// Entry point for chat messages: normalizes, routes and answers them.
pub struct WhiteboardService {
    chat: Arc<dyn ChatClient>,
    normalizer: TextNormalizer,
    router: CommandRouter<WhiteboardHandlers>,
}

impl WhiteboardService {
    pub fn new(deps: WhiteboardDeps, normalizer: TextNormalizer) -> Self {
        Self {
            chat: deps.chat.clone(),
            normalizer,
            router: CommandRouter::new(WhiteboardHandlers::new(deps)),
        }
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.router.service().drafts
    }

    /// Returns `false` when the message was not addressed to the bot.
    pub async fn handle_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<bool, ChatError> {
        let input = event.input_text();
        // Ids never render as an invocation keyword, so the cheap check
        // can run before any lookup.
        if strip_invocation(input).is_none() {
            return Ok(false);
        }

        let text = self.normalizer.normalize(self.chat.as_ref(), input).await;
        let command_ctx = CommandContext {
            channel_id: event.channel_id.clone(),
            user_id: event.user_id.clone(),
            upload: event.upload.clone(),
            correlation_id: ctx.correlation_id.clone(),
        };
        debug!(
            event_name = "whiteboard.message.received",
            correlation_id = %ctx.correlation_id,
            channel_id = %event.channel_id,
            user_id = %event.user_id,
            "routing whiteboard command"
        );
        self.router.route_text(&text, &command_ctx).await
    }
}

/// Why an update was refused before reaching validation.
enum Rejection {
    Message(String),
    /// Echo the draft back under a status line.
    WithEntry(String),
}

pub struct WhiteboardHandlers {
    chat: Arc<dyn ChatClient>,
    whiteboard: Arc<dyn WhiteboardApi>,
    registry: Arc<dyn StandupRegistry>,
    clock: Arc<dyn Clock>,
    backend_timeout: Duration,
    drafts: DraftStore,
}

impl WhiteboardHandlers {
    pub fn new(deps: WhiteboardDeps) -> Self {
        Self {
            chat: deps.chat,
            whiteboard: deps.whiteboard,
            registry: deps.registry,
            clock: deps.clock,
            backend_timeout: deps.backend_timeout,
            drafts: DraftStore::new(),
        }
    }

    async fn reply(
        &self,
        ctx: &CommandContext,
        text: &str,
        style: MessageStyle,
    ) -> Result<(), ChatError> {
        self.chat.post_message(&ctx.channel_id, text, style).await
    }

    async fn channel_standup(&self, ctx: &CommandContext) -> Option<Standup> {
        match self.registry.get_standup(&ctx.channel_id).await {
            Ok(standup) => standup,
            Err(error) => {
                warn!(
                    event_name = "whiteboard.registry.lookup_failed",
                    correlation_id = %ctx.correlation_id,
                    channel_id = %ctx.channel_id,
                    error = %error,
                    "standup registry lookup failed; treating channel as unregistered"
                );
                None
            }
        }
    }

    /// The channel's standup, or a "register first" reply when there is none.
    async fn require_standup(&self, ctx: &CommandContext) -> Result<Option<Standup>, ChatError> {
        let standup = self.channel_standup(ctx).await;
        if standup.is_none() {
            self.reply(ctx, replies::NOT_REGISTERED, MessageStyle::ThumbsDown).await?;
        }
        Ok(standup)
    }

    async fn user(&self, ctx: &CommandContext) -> SlackUser {
        self.chat.user_details(&ctx.user_id).await
    }

    async fn with_timeout<T, F>(&self, operation: &'static str, call: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>> + Send,
    {
        tokio::time::timeout(self.backend_timeout, call).await.map_err(|_| {
            BackendError::Timeout { operation, timeout_secs: self.backend_timeout.as_secs() }
        })?
    }

    async fn update_draft<F>(&self, ctx: &CommandContext, apply: F) -> Result<(), ChatError>
    where
        F: FnOnce(&mut EntryVariant) -> Result<(), Rejection> + Send,
    {
        let Some(standup) = self.require_standup(ctx).await? else {
            return Ok(());
        };

        let mut draft = self.drafts.lock(&ctx.user_id).await;
        let Some(variant) = draft.as_mut() else {
            return self.reply(ctx, replies::MISSING_ENTRY, MessageStyle::ThumbsDown).await;
        };

        match apply(variant) {
            Ok(()) => self.validate_and_post(variant, standup.id, ctx).await,
            Err(Rejection::Message(text)) => self.reply(ctx, &text, MessageStyle::ThumbsDown).await,
            Err(Rejection::WithEntry(status)) => {
                self.chat.post_entry(variant, &ctx.channel_id, &status).await
            }
        }
    }

    /// Submits a complete draft and echoes it back. A backend failure only
    /// drops the status line; local edits are kept either way.
    async fn validate_and_post(
        &self,
        variant: &mut EntryVariant,
        standup_id: i64,
        ctx: &CommandContext,
    ) -> Result<(), ChatError> {
        let mut status = String::new();
        if variant.validate() {
            let creating = !variant.entry().is_submitted();
            let request = variant.submission_request(standup_id);
            match self.with_timeout("submit", self.whiteboard.submit(&request, standup_id)).await {
                Ok(item_id) => {
                    info!(
                        event_name = "whiteboard.entry.synced",
                        correlation_id = %ctx.correlation_id,
                        user_id = %ctx.user_id,
                        kind = variant.kind().keyword(),
                        item_id = %item_id,
                        created = creating,
                        "whiteboard entry submitted"
                    );
                    if creating {
                        variant.entry_mut().id = item_id;
                        status = replies::created_status(variant.kind());
                    } else {
                        status = replies::updated_status(variant.kind());
                    }
                }
                Err(error) => warn!(
                    event_name = "whiteboard.entry.sync_failed",
                    correlation_id = %ctx.correlation_id,
                    user_id = %ctx.user_id,
                    kind = variant.kind().keyword(),
                    error = %error,
                    "whiteboard submission failed; keeping local draft"
                ),
            }
        }
        self.chat.post_entry(variant, &ctx.channel_id, &status).await
    }
}

#[async_trait]
impl WhiteboardCommandService for WhiteboardHandlers {
    async fn register(&self, standup_id: &str, ctx: &CommandContext) -> Result<(), ChatError> {
        let lookup = self.with_timeout("get_standup", self.whiteboard.get_standup(standup_id));
        let standup = match lookup.await {
            Ok(standup) => standup,
            Err(error) => {
                if !error.is_not_found() {
                    warn!(
                        event_name = "whiteboard.standup.lookup_failed",
                        correlation_id = %ctx.correlation_id,
                        standup_id,
                        error = %error,
                        "standup lookup failed"
                    );
                }
                return self
                    .reply(ctx, &replies::standup_not_found(standup_id), MessageStyle::ThumbsDown)
                    .await;
            }
        };

        if let Err(error) = self.registry.set_standup(&ctx.channel_id, &standup).await {
            warn!(
                event_name = "whiteboard.registry.save_failed",
                correlation_id = %ctx.correlation_id,
                channel_id = %ctx.channel_id,
                standup_id = standup.id,
                error = %error,
                "could not persist standup registration"
            );
            let text = replies::registration_not_saved(&standup.title);
            return self.reply(ctx, &text, MessageStyle::ThumbsDown).await;
        }

        info!(
            event_name = "whiteboard.standup.registered",
            correlation_id = %ctx.correlation_id,
            channel_id = %ctx.channel_id,
            standup_id = standup.id,
            "channel registered to standup"
        );
        self.reply(ctx, &replies::standup_registered(&standup.title), MessageStyle::ThumbsUp).await
    }

    async fn usage(&self, ctx: &CommandContext) -> Result<(), ChatError> {
        self.reply(ctx, replies::USAGE, MessageStyle::Plain).await
    }

    async fn create_entry(
        &self,
        kind: EntryKind,
        title: &str,
        ctx: &CommandContext,
    ) -> Result<(), ChatError> {
        let Some(standup) = self.require_standup(ctx).await? else {
            return Ok(());
        };
        if title.is_empty() {
            return self.reply(ctx, replies::MISSING_TITLE, MessageStyle::ThumbsDown).await;
        }

        let user = self.user(ctx).await;
        let mut entry = Entry::new(user.author, title, self.clock.now());
        if let Some(upload) = &ctx.upload {
            entry.body = upload.image_body();
        }

        let mut draft = self.drafts.lock(&ctx.user_id).await;
        let variant = draft.insert(EntryVariant::new(kind, entry));
        debug!(
            event_name = "whiteboard.draft.started",
            correlation_id = %ctx.correlation_id,
            user_id = %ctx.user_id,
            kind = kind.keyword(),
            "new draft replaces any previous one"
        );
        self.validate_and_post(variant, standup.id, ctx).await
    }

    async fn update_title(&self, title: &str, ctx: &CommandContext) -> Result<(), ChatError> {
        self.update_draft(ctx, |variant| {
            if title.is_empty() {
                return Err(Rejection::Message(replies::EMPTY_TITLE.to_owned()));
            }
            variant.set_title(title);
            Ok(())
        })
        .await
    }

    async fn update_body(&self, body: &str, ctx: &CommandContext) -> Result<(), ChatError> {
        self.update_draft(ctx, |variant| variant.set_body(body).map_err(Rejection::from)).await
    }

    async fn update_date(&self, date: &str, ctx: &CommandContext) -> Result<(), ChatError> {
        self.update_draft(ctx, |variant| variant.set_date(date).map_err(Rejection::from)).await
    }

    async fn present(&self, num_days: Option<i64>, ctx: &CommandContext) -> Result<(), ChatError> {
        let Some(standup) = self.require_standup(ctx).await? else {
            return Ok(());
        };
        let user = self.user(ctx).await;

        let mut items = match self
            .with_timeout("get_standup_items", self.whiteboard.get_standup_items(standup.id))
            .await
        {
            Ok(items) => items,
            Err(error) => {
                warn!(
                    event_name = "whiteboard.standup.items_failed",
                    correlation_id = %ctx.correlation_id,
                    standup_id = standup.id,
                    error = %error,
                    "could not fetch standup items"
                );
                return self.reply(ctx, replies::NOTHING_TO_PRESENT, MessageStyle::ThumbsDown).await;
            }
        };
        if items.is_empty() {
            return self.reply(ctx, replies::NOTHING_TO_PRESENT, MessageStyle::ThumbsDown).await;
        }

        if let Some(num_days) = num_days {
            let time_zone = user
                .time_zone
                .as_deref()
                .or(standup.time_zone.as_deref())
                .unwrap_or("UTC");
            items.filter_out_old(self.clock.now(), num_days, time_zone);
            if items.is_empty() {
                return self.reply(ctx, replies::NOTHING_TO_PRESENT, MessageStyle::ThumbsDown).await;
            }
        }
        self.reply(ctx, &items.render(), MessageStyle::Plain).await
    }

    async fn fallback(&self, remainder: &str, ctx: &CommandContext) -> Result<(), ChatError> {
        if self.channel_standup(ctx).await.is_none() {
            return Ok(());
        }
        let user = self.user(ctx).await;
        let text = replies::default_echo(&user.username, remainder);
        self.reply(ctx, &text, MessageStyle::Plain).await
    }
}

impl From<EntryError> for Rejection {
    fn from(error: EntryError) -> Self {
        match error {
            EntryError::BodyNotSupported(_) => Self::Message(replies::face_has_no_body()),
            EntryError::InvalidDate(_) => {
                Self::WithEntry(format!("{THUMBS_DOWN}{}", replies::INVALID_DATE))
            }
        }
    }
}
