use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

use super::*;

fn interaction_create() -> Value {
    json!({
        "id": "3001",
        "application_id": "77",
        "type": 2,
        "token": "interaction-token",
        "guild_id": "1",
        "channel_id": "500",
        "member": { "user": { "id": "31", "username": "eve" } },
        "data": {
            "name": "entreprise-add",
            "options": [
                { "name": "nom", "type": 3, "value": "Shadow Co" },
                { "name": "gerant", "type": 3, "value": "Eve" },
                { "name": "type", "type": 3, "value": "illegal" }
            ]
        }
    })
}

#[test]
fn decodes_interaction_into_invocation() {
    let event = decode_dispatch("INTERACTION_CREATE", interaction_create())
        .expect("decode")
        .expect("event");
    let GatewayEvent::InteractionCreate(interaction) = event else {
        panic!("expected interaction");
    };
    let invocation = interaction.invocation().expect("slash command");
    assert_eq!(invocation.name, "entreprise-add");
    assert_eq!(invocation.option("nom"), Some("Shadow Co"));
    assert_eq!(invocation.option("type"), Some("illegal"));
    assert_eq!(invocation.invoked_by, Some(shared::domain::UserId(31)));
}

#[test]
fn non_command_interactions_have_no_invocation() {
    let mut raw = interaction_create();
    raw["type"] = json!(3);
    let event = decode_dispatch("INTERACTION_CREATE", raw)
        .expect("decode")
        .expect("event");
    let GatewayEvent::InteractionCreate(interaction) = event else {
        panic!("expected interaction");
    };
    assert!(interaction.invocation().is_none());
}

#[test]
fn ignores_unhandled_dispatches() {
    assert!(decode_dispatch("GUILD_CREATE", json!({ "id": "1" }))
        .expect("decode")
        .is_none());
}

#[test]
fn classifies_close_codes() {
    assert_eq!(close_outcome(Some(4004)), SessionEnd::Rejected(4004));
    assert_eq!(close_outcome(Some(4014)), SessionEnd::Rejected(4014));
    assert_eq!(close_outcome(Some(4000)), SessionEnd::Reconnect);
    assert_eq!(close_outcome(Some(1000)), SessionEnd::Reconnect);
    assert_eq!(close_outcome(None), SessionEnd::Reconnect);
}

#[test]
fn identify_carries_token_and_intents() {
    let payload = identify_payload("abc", GUILDS_INTENT);
    assert_eq!(payload["op"], 2);
    assert_eq!(payload["d"]["token"], "abc");
    assert_eq!(payload["d"]["intents"], 1);
    assert_eq!(heartbeat_payload(None)["d"], Value::Null);
    assert_eq!(heartbeat_payload(Some(7))["d"], 7);
}

#[tokio::test]
async fn session_identifies_and_forwards_dispatches() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (identify_tx, identify_rx) = tokio::sync::oneshot::channel::<Value>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        ws.send(WsMessage::Text(
            json!({ "op": 10, "d": { "heartbeat_interval": 45000 } }).to_string(),
        ))
        .await
        .expect("hello");

        let identify = loop {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    break serde_json::from_str::<Value>(&text).expect("identify json")
                }
                Some(Ok(_)) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        };
        let _ = identify_tx.send(identify);

        let ready = json!({
            "op": 0, "s": 1, "t": "READY",
            "d": {
                "user": { "id": "4242", "username": "roster", "discriminator": "0" },
                "application": { "id": "77" }
            }
        });
        ws.send(WsMessage::Text(ready.to_string()))
            .await
            .expect("ready");
        let interaction = json!({
            "op": 0, "s": 2, "t": "INTERACTION_CREATE", "d": interaction_create()
        });
        ws.send(WsMessage::Text(interaction.to_string()))
            .await
            .expect("interaction");

        while ws.next().await.is_some() {}
    });

    let (events_tx, mut events_rx) = mpsc::channel(8);
    let gateway = GatewayClient::new(format!("ws://{addr}"), "bot-token", GUILDS_INTENT);
    let handle = tokio::spawn(gateway.run(events_tx));

    let identify = identify_rx.await.expect("identify received");
    assert_eq!(identify["op"], 2);
    assert_eq!(identify["d"]["token"], "bot-token");

    let Some(GatewayEvent::Ready(ready)) = events_rx.recv().await else {
        panic!("expected READY first");
    };
    assert_eq!(ready.user.tag(), "roster");
    assert_eq!(ready.application.id, shared::domain::ApplicationId(77));

    let Some(GatewayEvent::InteractionCreate(interaction)) = events_rx.recv().await else {
        panic!("expected INTERACTION_CREATE");
    };
    assert_eq!(interaction.token, "interaction-token");

    handle.abort();
}
