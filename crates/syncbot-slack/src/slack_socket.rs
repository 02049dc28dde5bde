//! Socket Mode envelope decoding.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use syncbot_core::ChatMessagePosted;
use tokio_tungstenite::tungstenite::Message as WsMessage;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SlackSocketEnvelope {
    /// Absent on `hello` and `disconnect` frames, which need no ack.
    #[serde(default)]
    pub envelope_id: Option<String>,
    #[serde(rename = "type")]
    pub envelope_type: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub reason: Option<String>,
}

impl SlackSocketEnvelope {
    pub fn is_disconnect(&self) -> bool {
        self.envelope_type == "disconnect"
    }
}

pub fn ack_payload(envelope_id: &str) -> String {
    json!({ "envelope_id": envelope_id }).to_string()
}

pub fn parse_socket_envelope(message: WsMessage) -> Result<Option<SlackSocketEnvelope>> {
    let text = match message {
        WsMessage::Text(text) => text.as_str().to_owned(),
        WsMessage::Binary(bytes) => {
            String::from_utf8(bytes.to_vec()).context("invalid utf-8 slack socket payload")?
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_) => {
            return Ok(None)
        }
    };
    serde_json::from_str::<SlackSocketEnvelope>(&text)
        .map(Some)
        .context("failed to parse slack socket envelope")
}

#[derive(Debug, Deserialize)]
struct SlackEventCallbackEnvelope {
    #[serde(rename = "type")]
    callback_type: String,
    event: SlackEventPayload,
}

#[derive(Debug, Deserialize)]
struct SlackEventPayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    parent_user_id: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

/// Maps an `events_api` envelope carrying a `message` event. Every other
/// envelope or event type yields `None`; relay filtering happens later.
pub fn normalize_socket_envelope(
    envelope: &SlackSocketEnvelope,
) -> Result<Option<ChatMessagePosted>> {
    if envelope.envelope_type != "events_api" {
        return Ok(None);
    }
    let callback = serde_json::from_value::<SlackEventCallbackEnvelope>(envelope.payload.clone())
        .context("failed to decode slack event callback payload")?;
    if callback.callback_type != "event_callback" {
        return Ok(None);
    }

    let event = callback.event;
    if event.event_type != "message" {
        return Ok(None);
    }
    let channel_id = match event.channel {
        Some(channel) if !channel.trim().is_empty() => channel,
        _ => return Ok(None),
    };
    let ts = match event.ts {
        Some(ts) if !ts.trim().is_empty() => ts,
        _ => return Ok(None),
    };

    Ok(Some(ChatMessagePosted {
        channel_id,
        user_id: event.user.filter(|user| !user.trim().is_empty()),
        parent_user_id: event.parent_user_id,
        ts,
        thread_ts: event.thread_ts,
        subtype: event.subtype,
        bot_id: event.bot_id,
        text: event.text.unwrap_or_default(),
    }))
}
