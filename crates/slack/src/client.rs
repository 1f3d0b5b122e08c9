//! Chat collaborator: what the command handlers need from Slack, plus the
//! Web API implementation used in production.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};
use wbbot_core::domain::entry::EntryVariant;

pub const THUMBS_UP: &str = ":thumbsup: ";
pub const THUMBS_DOWN: &str = ":thumbsdown: ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageStyle {
    Plain,
    ThumbsUp,
    ThumbsDown,
}

impl MessageStyle {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Plain => "",
            Self::ThumbsUp => THUMBS_UP,
            Self::ThumbsDown => THUMBS_DOWN,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlackUser {
    pub user_id: String,
    pub username: String,
    /// Name shown as the author of whiteboard entries.
    pub author: String,
    /// `None` when Slack has no zone for the user or the lookup failed.
    pub time_zone: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlackChannel {
    pub channel_id: String,
    pub name: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("slack request `{method}` failed: {detail}")]
    Request { method: &'static str, detail: String },
    #[error("slack api `{method}` returned error: {error}")]
    Api { method: &'static str, error: String },
}

/// Lookups are total: an unknown id comes back as a user/channel named after
/// the id itself.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        style: MessageStyle,
    ) -> Result<(), ChatError>;

    async fn post_entry(
        &self,
        entry: &EntryVariant,
        channel_id: &str,
        status: &str,
    ) -> Result<(), ChatError> {
        let text = format!("{status}{}", entry.render());
        self.post_message(channel_id, &text, MessageStyle::Plain).await
    }

    async fn user_details(&self, user_id: &str) -> SlackUser;

    async fn channel_details(&self, channel_id: &str) -> SlackChannel;
}

pub fn fallback_user(user_id: &str) -> SlackUser {
    SlackUser {
        user_id: user_id.to_owned(),
        username: user_id.to_owned(),
        author: user_id.to_owned(),
        time_zone: None,
    }
}

#[derive(Debug, Deserialize)]
struct SlackEnvelopeResponse<T> {
    ok: bool,
    error: Option<String>,
    #[serde(flatten)]
    body: Option<T>,
}

#[derive(Debug, Deserialize)]
struct UsersInfoBody {
    user: SlackApiUser,
}

#[derive(Debug, Deserialize)]
struct SlackApiUser {
    name: String,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    tz: Option<String>,
    #[serde(default)]
    profile: Option<SlackApiProfile>,
}

#[derive(Debug, Deserialize)]
struct SlackApiProfile {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversationsInfoBody {
    channel: SlackApiChannel,
}

#[derive(Debug, Deserialize)]
struct SlackApiChannel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageBody {}

#[derive(Clone)]
pub struct SlackWebClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: SecretString,
}

impl SlackWebClient {
    pub fn new(
        api_base: &str,
        bot_token: SecretString,
        request_timeout: Duration,
    ) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .user_agent("wbbot")
            .timeout(request_timeout)
            .build()
            .map_err(|error| ChatError::Request { method: "client", detail: error.to_string() })?;

        Ok(Self { http, api_base: api_base.trim_end_matches('/').to_owned(), bot_token })
    }

    /// Write methods take a JSON body; read methods such as `users.info`
    /// only accept form arguments, so each caller attaches its own.
    async fn call<T, F>(&self, method: &'static str, with_arguments: F) -> Result<T, ChatError>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        let request = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(self.bot_token.expose_secret());
        let response = with_arguments(request)
            .send()
            .await
            .map_err(|error| ChatError::Request { method, detail: error.to_string() })?;

        let envelope: SlackEnvelopeResponse<T> = response
            .json()
            .await
            .map_err(|error| ChatError::Request { method, detail: error.to_string() })?;

        if !envelope.ok {
            return Err(ChatError::Api {
                method,
                error: envelope.error.unwrap_or_else(|| "unknown error".to_owned()),
            });
        }
        envelope.body.ok_or_else(|| ChatError::Request {
            method,
            detail: "response body was missing expected fields".to_owned(),
        })
    }
}

#[async_trait]
impl ChatClient for SlackWebClient {
    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        style: MessageStyle,
    ) -> Result<(), ChatError> {
        let text = format!("{}{text}", style.prefix());
        debug!(channel_id, chars = text.len(), "posting slack message");
        let payload = json!({
            "channel": channel_id,
            "text": text,
            "mrkdwn": true,
            "as_user": true,
        });
        self.call::<PostMessageBody, _>("chat.postMessage", |request| request.json(&payload))
            .await?;
        Ok(())
    }

    async fn user_details(&self, user_id: &str) -> SlackUser {
        let lookup = self.call::<UsersInfoBody, _>("users.info", |request| {
            request.form(&[("user", user_id)])
        });
        match lookup.await {
            Ok(body) => {
                let user = body.user;
                let profile = user.profile.as_ref();
                let author = [
                    user.real_name.as_deref(),
                    profile.and_then(|profile| profile.real_name.as_deref()),
                    profile.and_then(|profile| profile.display_name.as_deref()),
                ]
                .into_iter()
                .flatten()
                .find(|name| !name.trim().is_empty())
                .unwrap_or(&user.name)
                .to_owned();

                SlackUser {
                    user_id: user_id.to_owned(),
                    author,
                    time_zone: user.tz.filter(|tz| !tz.is_empty()),
                    username: user.name,
                }
            }
            Err(error) => {
                warn!(user_id, error = %error, "slack user lookup failed; using raw id");
                fallback_user(user_id)
            }
        }
    }

    async fn channel_details(&self, channel_id: &str) -> SlackChannel {
        let lookup = self.call::<ConversationsInfoBody, _>("conversations.info", |request| {
            request.form(&[("channel", channel_id)])
        });
        match lookup.await {
            Ok(body) => SlackChannel { channel_id: channel_id.to_owned(), name: body.channel.name },
            Err(error) => {
                warn!(channel_id, error = %error, "slack channel lookup failed; using raw id");
                SlackChannel { channel_id: channel_id.to_owned(), name: channel_id.to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::{
        extract::State,
        http::{header::CONTENT_TYPE, HeaderMap},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};

    use super::{
        fallback_user, ChatClient, ConversationsInfoBody, MessageStyle, SlackEnvelopeResponse,
        SlackWebClient, UsersInfoBody,
    };

    #[derive(Clone, Default)]
    struct Requests {
        seen: Arc<Mutex<Vec<(String, String, String)>>>,
    }

    impl Requests {
        fn record(&self, method: &str, headers: &HeaderMap, body: String) {
            let content_type = headers
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            self.seen.lock().expect("lock").push((method.to_owned(), content_type, body));
        }

        fn seen(&self) -> Vec<(String, String, String)> {
            self.seen.lock().expect("lock").clone()
        }
    }

    async fn users_info(
        State(requests): State<Requests>,
        headers: HeaderMap,
        body: String,
    ) -> Json<Value> {
        requests.record("users.info", &headers, body.clone());
        if body != "user=U1" {
            return Json(json!({ "ok": false, "error": "invalid_arguments" }));
        }
        Json(json!({
            "ok": true,
            "user": { "name": "aleung", "real_name": "Andrew Leung", "tz": "Australia/Sydney" }
        }))
    }

    async fn conversations_info(
        State(requests): State<Requests>,
        headers: HeaderMap,
        body: String,
    ) -> Json<Value> {
        requests.record("conversations.info", &headers, body.clone());
        if body != "channel=C9" {
            return Json(json!({ "ok": false, "error": "invalid_arguments" }));
        }
        Json(json!({ "ok": true, "channel": { "name": "standup" } }))
    }

    async fn post_message(
        State(requests): State<Requests>,
        headers: HeaderMap,
        body: String,
    ) -> Json<Value> {
        requests.record("chat.postMessage", &headers, body);
        Json(json!({ "ok": true, "ts": "1.0" }))
    }

    async fn serve() -> (SlackWebClient, Requests) {
        let requests = Requests::default();
        let app = Router::new()
            .route("/users.info", post(users_info))
            .route("/conversations.info", post(conversations_info))
            .route("/chat.postMessage", post(post_message))
            .with_state(requests.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        let client = SlackWebClient::new(
            &format!("http://{address}"),
            "xoxb-test".to_owned().into(),
            Duration::from_secs(5),
        )
        .expect("client");
        (client, requests)
    }

    #[tokio::test]
    async fn lookups_send_form_arguments() {
        let (client, requests) = serve().await;

        let user = client.user_details("U1").await;
        let channel = client.channel_details("C9").await;

        assert_eq!(user.username, "aleung");
        assert_eq!(user.author, "Andrew Leung");
        assert_eq!(user.time_zone.as_deref(), Some("Australia/Sydney"));
        assert_eq!(channel.name, "standup");
        for (method, content_type, _) in requests.seen() {
            assert_eq!(content_type, "application/x-www-form-urlencoded", "{method}");
        }
    }

    #[tokio::test]
    async fn post_message_sends_json_with_style_prefix() {
        let (client, requests) = serve().await;

        client.post_message("C1", "HELP updated", MessageStyle::ThumbsUp).await.expect("post");

        let (method, content_type, body) = requests.seen().pop().expect("request");
        assert_eq!(method, "chat.postMessage");
        assert_eq!(content_type, "application/json");
        let body: Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(body["channel"], "C1");
        assert_eq!(body["text"], ":thumbsup: HELP updated");
    }

    #[tokio::test]
    async fn rejected_lookup_falls_back_to_the_raw_id() {
        let (client, _) = serve().await;

        assert_eq!(client.user_details("U404").await, fallback_user("U404"));
        assert_eq!(client.channel_details("C404").await.name, "C404");
    }

    #[test]
    fn style_prefixes_match_reaction_emoji() {
        assert_eq!(MessageStyle::Plain.prefix(), "");
        assert_eq!(MessageStyle::ThumbsUp.prefix(), ":thumbsup: ");
        assert_eq!(MessageStyle::ThumbsDown.prefix(), ":thumbsdown: ");
    }

    #[test]
    fn decodes_users_info_payload() {
        let envelope: SlackEnvelopeResponse<UsersInfoBody> = serde_json::from_str(
            r#"{"ok":true,"user":{"name":"aleung","real_name":"Andrew Leung","tz":"Australia/Sydney"}}"#,
        )
        .expect("decode");
        assert!(envelope.ok);
        let user = envelope.body.expect("body").user;
        assert_eq!(user.name, "aleung");
        assert_eq!(user.tz.as_deref(), Some("Australia/Sydney"));
    }

    #[test]
    fn error_payload_carries_slack_error_code() {
        let envelope: SlackEnvelopeResponse<ConversationsInfoBody> =
            serde_json::from_str(r#"{"ok":false,"error":"channel_not_found"}"#).expect("decode");
        assert!(!envelope.ok);
        assert_eq!(envelope.error.as_deref(), Some("channel_not_found"));
        assert!(envelope.body.is_none());
    }

    #[test]
    fn fallback_user_is_named_after_the_id() {
        let user = fallback_user("U123");
        assert_eq!(user.username, "U123");
        assert_eq!(user.time_zone, None);
    }
}
