//! Socket Mode session loop feeding Slack messages into the relay engine.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use syncbot_core::{ChatMessagePosted, EventOrigin, RelayEngine};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

use crate::slack_api_client::SlackApiClient;
use crate::slack_socket::{ack_payload, normalize_socket_envelope, parse_socket_envelope};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketSessionEnd {
    /// Slack asked the client to reconnect.
    Disconnected { reason: Option<String> },
    StreamClosed,
    Shutdown,
}

/// Keeps a Socket Mode session open until `shutdown` flips, reconnecting
/// after `reconnect_delay` whenever a session ends or fails to start.
pub async fn run_socket_mode(
    client: SlackApiClient,
    engine: RelayEngine,
    reconnect_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        if *shutdown.borrow() {
            return Ok(());
        }
        match client.open_socket_connection().await {
            Ok(socket_url) => {
                info!("slack socket connected");
                match run_socket_session(&socket_url, &engine, &mut shutdown).await {
                    Ok(SocketSessionEnd::Shutdown) => return Ok(()),
                    Ok(end) => info!(?end, "slack socket session ended"),
                    Err(error) => warn!(error = %format!("{error:#}"), "slack socket session error"),
                }
            }
            Err(error) => {
                warn!(error = %format!("{error:#}"), "failed to open slack socket connection");
            }
        }

        tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }
}

pub async fn run_socket_session(
    socket_url: &str,
    engine: &RelayEngine,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<SocketSessionEnd> {
    let (stream, _response) = connect_async(socket_url)
        .await
        .context("failed to connect slack socket mode websocket")?;
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                let _ = sink.close().await;
                return Ok(SocketSessionEnd::Shutdown);
            }
            maybe_message = source.next() => {
                let Some(message_result) = maybe_message else {
                    return Ok(SocketSessionEnd::StreamClosed);
                };
                let message = message_result.context("failed reading slack websocket message")?;
                let envelope = match parse_socket_envelope(message) {
                    Ok(Some(envelope)) => envelope,
                    Ok(None) => continue,
                    Err(error) => {
                        warn!(error = %format!("{error:#}"), "dropping unreadable slack socket frame");
                        continue;
                    }
                };
                if let Some(envelope_id) = envelope.envelope_id.as_deref() {
                    sink.send(WsMessage::Text(ack_payload(envelope_id).into()))
                        .await
                        .context("failed to send slack socket ack")?;
                }
                if envelope.is_disconnect() {
                    return Ok(SocketSessionEnd::Disconnected { reason: envelope.reason });
                }
                match normalize_socket_envelope(&envelope) {
                    Ok(Some(message)) => dispatch_chat_message(engine, message),
                    Ok(None) => debug!(envelope_type = %envelope.envelope_type, "skipping slack envelope"),
                    Err(error) => warn!(error = %format!("{error:#}"), "failed to decode slack event"),
                }
            }
        }
    }
}

/// Relays on a separate task so a slow platform call never delays acks.
fn dispatch_chat_message(engine: &RelayEngine, message: ChatMessagePosted) {
    let engine = engine.clone();
    tokio::spawn(async move {
        match engine.handle_chat_message(&message).await {
            Ok(outcome) => debug!(
                origin = EventOrigin::Chat.as_str(),
                ts = %message.ts,
                status = outcome.status(),
                "slack message handled"
            ),
            Err(error) => warn!(
                origin = EventOrigin::Chat.as_str(),
                channel = %message.channel_id,
                ts = %message.ts,
                error = %error,
                "slack relay failed"
            ),
        }
    });
}
