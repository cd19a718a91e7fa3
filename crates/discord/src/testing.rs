//! In-process stand-in for the Discord REST API, for tests.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const BOT_USER_ID: u64 = 4242;
pub const KNOWN_CHANNEL_ID: u64 = 500;

#[derive(Debug, Clone)]
pub struct MockMessage {
    pub id: u64,
    pub author_id: u64,
    pub body: Value,
}

#[derive(Debug, Default)]
pub struct MockState {
    /// Oldest first.
    pub messages: Vec<MockMessage>,
    pub interaction_callbacks: Vec<(String, Value)>,
    pub registered_commands: Vec<Value>,
    pub authorization: Vec<String>,
    pub history_limits: Vec<String>,
    pub me_calls: usize,
    next_id: u64,
}

impl MockState {
    pub fn own_messages(&self) -> Vec<&MockMessage> {
        self.messages
            .iter()
            .filter(|message| message.author_id == BOT_USER_ID)
            .collect()
    }

    pub fn push_foreign(&mut self, author_id: u64) -> u64 {
        let id = self.allocate_id();
        self.messages.push(MockMessage {
            id,
            author_id,
            body: json!({ "content": "hello" }),
        });
        id
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        9_000 + self.next_id
    }
}

#[derive(Clone, Default)]
pub struct MockDiscord {
    pub state: Arc<Mutex<MockState>>,
}

impl MockDiscord {
    /// Binds an ephemeral port and serves until the runtime shuts down.
    /// Returns the api base url.
    pub async fn spawn(&self) -> std::io::Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let app = Router::new()
            .route("/users/@me", get(me))
            .route("/channels/:channel_id", get(get_channel))
            .route(
                "/channels/:channel_id/messages",
                get(list_messages).post(create_message),
            )
            .route(
                "/channels/:channel_id/messages/:message_id",
                patch(edit_message),
            )
            .route(
                "/applications/:application_id/guilds/:guild_id/commands",
                put(put_commands),
            )
            .route(
                "/interactions/:interaction_id/:token/callback",
                post(interaction_callback),
            )
            .with_state(self.state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(format!("http://{addr}"))
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

type SharedState = Arc<Mutex<MockState>>;

fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn record_auth(state: &SharedState, headers: &HeaderMap) {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    lock(state).authorization.push(value);
}

fn api_error(status: StatusCode, code: u64, message: &str) -> Response {
    (status, Json(json!({ "code": code, "message": message }))).into_response()
}

fn unknown_channel() -> Response {
    api_error(StatusCode::NOT_FOUND, 10003, "Unknown Channel")
}

fn message_json(channel_id: u64, message: &MockMessage) -> Value {
    json!({
        "id": message.id.to_string(),
        "channel_id": channel_id.to_string(),
        "author": { "id": message.author_id.to_string(), "username": "someone" },
        "embeds": message.body.get("embeds").cloned().unwrap_or_else(|| json!([])),
    })
}

async fn me(State(state): State<SharedState>, headers: HeaderMap) -> Json<Value> {
    record_auth(&state, &headers);
    lock(&state).me_calls += 1;
    Json(json!({ "id": BOT_USER_ID.to_string(), "username": "roster", "discriminator": "0" }))
}

async fn get_channel(
    State(state): State<SharedState>,
    Path(channel_id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    record_auth(&state, &headers);
    if channel_id != KNOWN_CHANNEL_ID {
        return unknown_channel();
    }
    Json(json!({ "id": channel_id.to_string(), "guild_id": "1" })).into_response()
}

async fn list_messages(
    State(state): State<SharedState>,
    Path(channel_id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if channel_id != KNOWN_CHANNEL_ID {
        return unknown_channel();
    }
    let limit = query
        .get("limit")
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(50);
    let mut guard = lock(&state);
    guard
        .history_limits
        .push(query.get("limit").cloned().unwrap_or_default());
    let listed: Vec<Value> = guard
        .messages
        .iter()
        .rev()
        .take(limit)
        .map(|message| message_json(channel_id, message))
        .collect();
    Json(Value::Array(listed)).into_response()
}

async fn create_message(
    State(state): State<SharedState>,
    Path(channel_id): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_auth(&state, &headers);
    if channel_id != KNOWN_CHANNEL_ID {
        return unknown_channel();
    }
    let mut guard = lock(&state);
    let id = guard.allocate_id();
    let message = MockMessage {
        id,
        author_id: BOT_USER_ID,
        body,
    };
    let response = message_json(channel_id, &message);
    guard.messages.push(message);
    Json(response).into_response()
}

async fn edit_message(
    State(state): State<SharedState>,
    Path((channel_id, message_id)): Path<(u64, u64)>,
    Json(body): Json<Value>,
) -> Response {
    if channel_id != KNOWN_CHANNEL_ID {
        return unknown_channel();
    }
    let mut guard = lock(&state);
    let Some(message) = guard.messages.iter_mut().find(|m| m.id == message_id) else {
        return api_error(StatusCode::NOT_FOUND, 10008, "Unknown Message");
    };
    if message.author_id != BOT_USER_ID {
        return api_error(
            StatusCode::FORBIDDEN,
            50005,
            "Cannot edit a message authored by another user",
        );
    }
    message.body = body;
    let response = message_json(channel_id, message);
    Json(response).into_response()
}

async fn put_commands(
    State(state): State<SharedState>,
    Path((_application_id, _guild_id)): Path<(u64, u64)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let commands = body.as_array().cloned().unwrap_or_default();
    lock(&state).registered_commands = commands.clone();
    Json(Value::Array(commands))
}

async fn interaction_callback(
    State(state): State<SharedState>,
    Path((interaction_id, token)): Path<(u64, String)>,
    Json(body): Json<Value>,
) -> StatusCode {
    lock(&state)
        .interaction_callbacks
        .push((format!("{interaction_id}/{token}"), body));
    StatusCode::NO_CONTENT
}
