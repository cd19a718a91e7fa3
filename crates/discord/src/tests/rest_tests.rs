use serde_json::json;
use shared::protocol::EmbedField;

use super::*;
use crate::testing::{MockDiscord, BOT_USER_ID, KNOWN_CHANNEL_ID};

const CHANNEL: ChannelId = ChannelId(KNOWN_CHANNEL_ID);

async fn client() -> (DiscordHttp, MockDiscord) {
    let mock = MockDiscord::default();
    let base_url = mock.spawn().await.expect("mock server");
    let http = DiscordHttp::new(&base_url, "secret-token").expect("client");
    (http, mock)
}

fn embed(value: &str) -> Embed {
    Embed {
        title: "roster".into(),
        color: 0x00ff99,
        timestamp: None,
        fields: vec![EmbedField {
            name: "section".into(),
            value: value.into(),
            inline: false,
        }],
    }
}

fn interaction(id: u64, token: &str) -> Interaction {
    serde_json::from_value(json!({
        "id": id.to_string(),
        "application_id": "77",
        "type": 2,
        "token": token,
        "data": { "name": "entreprise-list" }
    }))
    .expect("interaction")
}

#[test]
fn rejects_non_http_base_url() {
    assert!(DiscordHttp::new("wss://discord.com/api", "t").is_err());
    assert!(DiscordHttp::new("not a url", "t").is_err());
}

#[tokio::test]
async fn posts_then_edits_the_same_message_with_bot_authorization() {
    let (http, mock) = client().await;

    let id = http.post_embed(CHANNEL, &embed("one")).await.expect("post");
    http.edit_embed(CHANNEL, id, &embed("two"))
        .await
        .expect("edit");

    let state = mock.lock();
    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.messages[0].id, id.0);
    assert_eq!(state.messages[0].body["embeds"][0]["fields"][0]["value"], "two");
    assert!(state
        .authorization
        .iter()
        .all(|value| value == "Bot secret-token"));
}

#[tokio::test]
async fn recent_messages_are_newest_first_and_bounded() {
    let (http, mock) = client().await;
    let own = http.post_embed(CHANNEL, &embed("x")).await.expect("post");
    let newest = {
        let mut state = mock.lock();
        for author in 1..=6 {
            state.push_foreign(author);
        }
        state.messages.last().map(|m| m.id).expect("newest")
    };

    let recent = http.recent_messages(CHANNEL, 5).await.expect("history");

    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].id, MessageId(newest));
    assert!(recent.iter().all(|m| m.id != own));
    assert!(recent.iter().all(|m| !m.has_embed));

    let window = http.recent_messages(CHANNEL, 7).await.expect("history");
    let posted = window.iter().find(|m| m.id == own).expect("own message");
    assert!(posted.has_embed);
    assert_eq!(
        mock.lock().history_limits,
        vec!["5".to_string(), "7".to_string()]
    );
}

#[tokio::test]
async fn unknown_channel_maps_to_channel_unavailable() {
    let (http, _mock) = client().await;
    let missing = ChannelId(KNOWN_CHANNEL_ID + 1);

    assert_eq!(
        http.resolve_channel(missing).await,
        Err(DisplayError::ChannelUnavailable)
    );
    assert_eq!(
        http.post_embed(missing, &embed("x")).await,
        Err(DisplayError::ChannelUnavailable)
    );
    http.resolve_channel(CHANNEL).await.expect("known channel");
}

#[tokio::test]
async fn editing_a_deleted_message_maps_to_message_missing() {
    let (http, _mock) = client().await;
    assert_eq!(
        http.edit_embed(CHANNEL, MessageId(1), &embed("x")).await,
        Err(DisplayError::MessageMissing)
    );
}

#[tokio::test]
async fn current_user_is_fetched_once_unless_remembered() {
    let (http, mock) = client().await;
    assert_eq!(
        http.current_user().await.expect("me"),
        UserId(BOT_USER_ID)
    );
    assert_eq!(
        http.current_user().await.expect("me"),
        UserId(BOT_USER_ID)
    );
    assert_eq!(mock.lock().me_calls, 1);

    let (remembered, mock) = client().await;
    remembered.remember_current_user(UserId(9));
    assert_eq!(remembered.current_user().await.expect("me"), UserId(9));
    assert_eq!(mock.lock().me_calls, 0);
}

#[tokio::test]
async fn ephemeral_replies_carry_the_ephemeral_flag() {
    let (http, mock) = client().await;

    http.respond_to_interaction(&interaction(11, "tok-a"), &Reply::ephemeral("nope"))
        .await
        .expect("ephemeral reply");
    http.respond_to_interaction(&interaction(12, "tok-b"), &Reply::public("ok"))
        .await
        .expect("public reply");

    let state = mock.lock();
    let (path, body) = &state.interaction_callbacks[0];
    assert_eq!(path, "11/tok-a");
    assert_eq!(body["type"], 4);
    assert_eq!(body["data"]["content"], "nope");
    assert_eq!(body["data"]["flags"], 64);

    let (_, public) = &state.interaction_callbacks[1];
    assert!(public["data"].get("flags").is_none());
    assert_eq!(public["data"]["allowed_mentions"]["parse"], json!([]));
}

#[tokio::test]
async fn registers_chat_input_commands_with_string_options() {
    let (http, mock) = client().await;
    let definitions = roster::command_definitions();

    let count = http
        .register_guild_commands(ApplicationId(77), GuildId(1), &definitions)
        .await
        .expect("register");

    assert_eq!(count, 3);
    let state = mock.lock();
    let add = &state.registered_commands[0];
    assert_eq!(add["type"], 1);
    assert_eq!(add["name"], "entreprise-add");
    assert_eq!(add["options"][0]["type"], 3);
    assert_eq!(add["options"][0]["name"], "nom");
    assert_eq!(add["options"][0]["required"], true);
    assert_eq!(state.registered_commands[2]["options"], json!([]));
}
