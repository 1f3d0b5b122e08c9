//! In-memory collaborators for handler and normalizer tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use wbbot_core::domain::entry::WhiteboardRequest;
use wbbot_core::domain::standup::{Standup, StandupItems};
use wbbot_core::errors::BackendError;
use wbbot_core::whiteboard::WhiteboardApi;

use crate::client::{fallback_user, ChatClient, ChatError, MessageStyle, SlackChannel, SlackUser};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel_id: String,
    pub text: String,
    pub style: MessageStyle,
}

#[derive(Default)]
pub struct RecordingChat {
    posts: Mutex<Vec<PostedMessage>>,
    users: Mutex<HashMap<String, SlackUser>>,
    channels: Mutex<HashMap<String, String>>,
    lookups: Mutex<Vec<String>>,
}

impl RecordingChat {
    pub fn with_user(self, user_id: &str, username: &str, author: &str, time_zone: Option<&str>) -> Self {
        self.users.lock().expect("users lock").insert(
            user_id.to_owned(),
            SlackUser {
                user_id: user_id.to_owned(),
                username: username.to_owned(),
                author: author.to_owned(),
                time_zone: time_zone.map(str::to_owned),
            },
        );
        self
    }

    pub fn with_channel(self, channel_id: &str, name: &str) -> Self {
        self.channels.lock().expect("channels lock").insert(channel_id.to_owned(), name.to_owned());
        self
    }

    pub fn posts(&self) -> Vec<PostedMessage> {
        self.posts.lock().expect("posts lock").clone()
    }

    pub fn last_post(&self) -> PostedMessage {
        self.posts().pop().expect("at least one message posted")
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().expect("lookups lock").clone()
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        style: MessageStyle,
    ) -> Result<(), ChatError> {
        self.posts.lock().expect("posts lock").push(PostedMessage {
            channel_id: channel_id.to_owned(),
            text: text.to_owned(),
            style,
        });
        Ok(())
    }

    async fn user_details(&self, user_id: &str) -> SlackUser {
        self.lookups.lock().expect("lookups lock").push(user_id.to_owned());
        self.users
            .lock()
            .expect("users lock")
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| fallback_user(user_id))
    }

    async fn channel_details(&self, channel_id: &str) -> SlackChannel {
        self.lookups.lock().expect("lookups lock").push(channel_id.to_owned());
        let name = self
            .channels
            .lock()
            .expect("channels lock")
            .get(channel_id)
            .cloned()
            .unwrap_or_else(|| channel_id.to_owned());
        SlackChannel { channel_id: channel_id.to_owned(), name }
    }
}

#[derive(Default)]
pub struct FakeWhiteboard {
    standups: Mutex<HashMap<String, Standup>>,
    items: Mutex<Option<StandupItems>>,
    submit_results: Mutex<VecDeque<Result<String, BackendError>>>,
    submissions: Mutex<Vec<(WhiteboardRequest, i64)>>,
    submit_delay: Mutex<Option<Duration>>,
}

impl FakeWhiteboard {
    pub fn with_standup(self, standup: Standup) -> Self {
        self.standups.lock().expect("standups lock").insert(standup.id.to_string(), standup);
        self
    }

    pub fn with_items(self, items: StandupItems) -> Self {
        *self.items.lock().expect("items lock") = Some(items);
        self
    }

    pub fn with_submit_delay(self, delay: Duration) -> Self {
        *self.submit_delay.lock().expect("delay lock") = Some(delay);
        self
    }

    pub fn queue_submit(&self, result: Result<String, BackendError>) {
        self.submit_results.lock().expect("results lock").push_back(result);
    }

    pub fn submissions(&self) -> Vec<(WhiteboardRequest, i64)> {
        self.submissions.lock().expect("submissions lock").clone()
    }
}

#[async_trait]
impl WhiteboardApi for FakeWhiteboard {
    async fn get_standup(&self, standup_id: &str) -> Result<Standup, BackendError> {
        self.standups
            .lock()
            .expect("standups lock")
            .get(standup_id)
            .cloned()
            .ok_or_else(|| BackendError::StandupNotFound(standup_id.to_owned()))
    }

    async fn get_standup_items(&self, _standup_id: i64) -> Result<StandupItems, BackendError> {
        self.items
            .lock()
            .expect("items lock")
            .clone()
            .ok_or_else(|| BackendError::Transport("no items scripted".to_owned()))
    }

    async fn submit(
        &self,
        request: &WhiteboardRequest,
        standup_id: i64,
    ) -> Result<String, BackendError> {
        let delay = *self.submit_delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.submissions.lock().expect("submissions lock").push((request.clone(), standup_id));
        self.submit_results
            .lock()
            .expect("results lock")
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Transport("no submit result scripted".to_owned())))
    }
}
