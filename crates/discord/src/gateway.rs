use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::{sync::mpsc, time};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

use crate::model::{GatewayPayload, Hello, Interaction, Ready};

pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";
pub const GUILDS_INTENT: u64 = 1;

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(Ready),
    InteractionCreate(Interaction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Connection dropped or the gateway asked us to reconnect.
    Reconnect,
    /// The event consumer went away.
    Shutdown,
    /// Close code the gateway documents as not worth retrying.
    Rejected(u16),
}

/// Long-lived gateway connection. Identifies fresh on every reconnect; no
/// session resumption.
pub struct GatewayClient {
    url: String,
    token: String,
    intents: u64,
}

impl GatewayClient {
    pub fn new(url: impl Into<String>, token: impl Into<String>, intents: u64) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            intents,
        }
    }

    /// Forwards gateway events into `events` until the receiver is dropped.
    /// Returns an error only when the gateway rejects the bot outright
    /// (bad token, disallowed intents).
    pub async fn run(self, events: mpsc::Sender<GatewayEvent>) -> Result<()> {
        loop {
            match self.run_session(&events).await {
                Ok(SessionEnd::Shutdown) => return Ok(()),
                Ok(SessionEnd::Rejected(code)) => {
                    bail!("gateway closed the connection with fatal code {code}")
                }
                Ok(SessionEnd::Reconnect) => {
                    warn!("gateway session ended; reconnecting");
                }
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "gateway session failed; reconnecting");
                }
            }
            if events.is_closed() {
                return Ok(());
            }
            time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn run_session(&self, events: &mpsc::Sender<GatewayEvent>) -> Result<SessionEnd> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("failed to connect gateway: {}", self.url))?;
        let (mut writer, mut reader) = ws_stream.split();

        let hello = loop {
            match reader.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    let payload: GatewayPayload = serde_json::from_str(&text)?;
                    if payload.op != OP_HELLO {
                        bail!("expected hello, gateway sent op {}", payload.op);
                    }
                    break serde_json::from_value::<Hello>(payload.d)?;
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    return Ok(close_outcome(frame.map(|f| u16::from(f.code))));
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(err.into()),
                None => return Ok(SessionEnd::Reconnect),
            }
        };
        debug!(interval_ms = hello.heartbeat_interval, "gateway hello");

        writer
            .send(WsMessage::Text(identify_payload(&self.token, self.intents).to_string()))
            .await
            .context("failed to identify")?;

        let mut heartbeat = time::interval(Duration::from_millis(hello.heartbeat_interval.max(1)));
        heartbeat.tick().await;
        let mut sequence: Option<u64> = None;
        let mut awaiting_ack = false;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if awaiting_ack {
                        warn!("gateway heartbeat not acknowledged");
                        return Ok(SessionEnd::Reconnect);
                    }
                    writer.send(WsMessage::Text(heartbeat_payload(sequence).to_string())).await?;
                    awaiting_ack = true;
                }
                frame = reader.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        let payload: GatewayPayload = serde_json::from_str(&text)
                            .context("invalid gateway payload")?;
                        if payload.s.is_some() {
                            sequence = payload.s;
                        }
                        match payload.op {
                            OP_DISPATCH => {
                                let name = payload.t.unwrap_or_default();
                                if let Some(event) = decode_dispatch(&name, payload.d)? {
                                    if events.send(event).await.is_err() {
                                        return Ok(SessionEnd::Shutdown);
                                    }
                                }
                            }
                            OP_HEARTBEAT => {
                                writer.send(WsMessage::Text(heartbeat_payload(sequence).to_string())).await?;
                            }
                            OP_HEARTBEAT_ACK => awaiting_ack = false,
                            OP_RECONNECT | OP_INVALID_SESSION => {
                                info!(op = payload.op, "gateway requested a new session");
                                return Ok(SessionEnd::Reconnect);
                            }
                            other => debug!(op = other, "ignoring gateway opcode"),
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        return Ok(close_outcome(frame.map(|f| u16::from(f.code))));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(anyhow!("gateway receive failed: {err}")),
                    None => return Ok(SessionEnd::Reconnect),
                }
            }
        }
    }
}

/// Decodes the dispatch events this bot reacts to; others yield `None`.
pub fn decode_dispatch(name: &str, data: Value) -> Result<Option<GatewayEvent>> {
    let event = match name {
        "READY" => GatewayEvent::Ready(
            serde_json::from_value(data).context("invalid READY payload")?,
        ),
        "INTERACTION_CREATE" => GatewayEvent::InteractionCreate(
            serde_json::from_value(data).context("invalid INTERACTION_CREATE payload")?,
        ),
        _ => return Ok(None),
    };
    Ok(Some(event))
}

fn identify_payload(token: &str, intents: u64) -> Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "enterprise-roster",
                "device": "enterprise-roster",
            },
        },
    })
}

fn heartbeat_payload(sequence: Option<u64>) -> Value {
    json!({ "op": OP_HEARTBEAT, "d": sequence })
}

/// Authentication failed, invalid shard, sharding required, invalid API
/// version, invalid intents, disallowed intents.
fn is_fatal_close(code: u16) -> bool {
    matches!(code, 4004 | 4010 | 4011 | 4012 | 4013 | 4014)
}

fn close_outcome(code: Option<u16>) -> SessionEnd {
    match code {
        Some(code) if is_fatal_close(code) => SessionEnd::Rejected(code),
        _ => SessionEnd::Reconnect,
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
