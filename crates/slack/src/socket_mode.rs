//! Slack Socket Mode over a websocket: `apps.connections.open` hands out a
//! URL, envelopes arrive as JSON frames and each one is acknowledged by id.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::events::{SlackEnvelope, SlackEvent};
use crate::socket::{SocketTransport, TransportError};

type SocketStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct SlackSocketTransport {
    http: reqwest::Client,
    api_base: String,
    app_token: SecretString,
    sink: Mutex<Option<SplitSink<SocketStream, WsMessage>>>,
    source: Mutex<Option<SplitStream<SocketStream>>>,
}

impl SlackSocketTransport {
    pub fn new(
        api_base: &str,
        app_token: SecretString,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .user_agent("wbbot")
            .timeout(request_timeout)
            .build()
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_owned(),
            app_token,
            sink: Mutex::new(None),
            source: Mutex::new(None),
        })
    }

    async fn open_socket_url(&self) -> Result<String, TransportError> {
        let response: OpenConnectionResponse = self
            .http
            .post(format!("{}/apps.connections.open", self.api_base))
            .bearer_auth(self.app_token.expose_secret())
            .send()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?
            .json()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        if !response.ok {
            return Err(TransportError::Connect(format!(
                "apps.connections.open failed: {}",
                response.error.unwrap_or_else(|| "unknown error".to_owned())
            )));
        }
        response.url.filter(|url| !url.trim().is_empty()).ok_or_else(|| {
            TransportError::Connect("apps.connections.open did not return url".to_owned())
        })
    }

    async fn read_frame(&self) -> Result<WsMessage, TransportError> {
        let mut source = self.source.lock().await;
        let Some(stream) = source.as_mut() else {
            return Err(TransportError::Receive("socket is not connected".to_owned()));
        };
        match stream.next().await {
            Some(Ok(message)) => Ok(message),
            Some(Err(error)) => Err(TransportError::Receive(error.to_string())),
            None => Err(TransportError::Receive("socket closed by slack".to_owned())),
        }
    }
}

#[async_trait]
impl SocketTransport for SlackSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self.open_socket_url().await?;
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (sink, source) = stream.split();

        *self.sink.lock().await = Some(sink);
        *self.source.lock().await = Some(source);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        loop {
            let Some(frame) = parse_socket_frame(self.read_frame().await?)? else {
                continue;
            };

            match frame.envelope_type.as_str() {
                "hello" => debug!("socket mode session ready"),
                // Slack rotates connections; open a fresh one in place.
                "disconnect" => {
                    info!(
                        reason = frame.reason.as_deref().unwrap_or("unspecified"),
                        "slack requested reconnect"
                    );
                    self.connect().await?;
                }
                _ => return Ok(Some(frame.into_envelope())),
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        if envelope_id.is_empty() {
            return Ok(());
        }
        let mut sink = self.sink.lock().await;
        let Some(sink) = sink.as_mut() else {
            return Err(TransportError::Acknowledge("socket is not connected".to_owned()));
        };
        let ack = json!({ "envelope_id": envelope_id }).to_string();
        sink.send(WsMessage::Text(ack.into()))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.source.lock().await.take();
        let Some(mut sink) = self.sink.lock().await.take() else {
            return Ok(());
        };
        sink.close().await.map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct OpenConnectionResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SocketFrame {
    #[serde(rename = "type")]
    envelope_type: String,
    #[serde(default)]
    envelope_id: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    payload: Value,
}

impl SocketFrame {
    fn into_envelope(self) -> SlackEnvelope {
        let event = match (self.envelope_type.as_str(), self.payload.get("event")) {
            ("events_api", Some(event)) => SlackEvent::from_event_json(event),
            (other, _) => SlackEvent::Unsupported { event_type: other.to_owned() },
        };
        SlackEnvelope { envelope_id: self.envelope_id, event }
    }
}

fn parse_socket_frame(message: WsMessage) -> Result<Option<SocketFrame>, TransportError> {
    let text = match message {
        WsMessage::Text(text) => text.as_str().to_owned(),
        WsMessage::Binary(bytes) => String::from_utf8(bytes.to_vec())
            .map_err(|error| TransportError::Receive(format!("invalid utf-8 frame: {error}")))?,
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_) => {
            return Ok(None)
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|error| TransportError::Receive(format!("malformed socket envelope: {error}")))
}
