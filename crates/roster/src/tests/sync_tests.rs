use shared::domain::{EnterpriseKind, NewEnterprise, UserId};

use super::*;
use crate::{
    test_support::{context, FakeSurface, BOT_USER, DISPLAY_CHANNEL},
    view::{EMPTY_SECTION, LEGAL_SECTION},
};

#[tokio::test]
async fn first_sync_posts_and_persists_the_roster_message() {
    let surface = FakeSurface::new();
    let ctx = context(surface.clone()).await;

    let outcome = synchronize(&ctx).await.expect("sync");

    let SyncOutcome::Created(message_id) = outcome else {
        panic!("expected a created message, got {outcome:?}");
    };
    assert_eq!(surface.posts(), 1);
    assert_eq!(
        ctx.storage
            .load_display_artifact(DISPLAY_CHANNEL)
            .await
            .expect("load"),
        Some(message_id)
    );
}

#[tokio::test]
async fn syncing_twice_leaves_exactly_one_artifact() {
    let surface = FakeSurface::new();
    let ctx = context(surface.clone()).await;

    let first = synchronize(&ctx).await.expect("first sync");
    let second = synchronize(&ctx).await.expect("second sync");

    let SyncOutcome::Created(created) = first else {
        panic!("expected creation, got {first:?}");
    };
    assert_eq!(second, SyncOutcome::Updated(created));
    assert_eq!(surface.own_messages().len(), 1);
    assert_eq!(surface.posts(), 1);
    assert_eq!(surface.edits(), 1);

    let messages = surface.own_messages();
    let embed = messages[0].embed.as_ref().expect("embed");
    assert_eq!(embed.fields[0].name, LEGAL_SECTION);
    assert_eq!(embed.fields[0].value, EMPTY_SECTION);
}

#[tokio::test]
async fn unchanged_roster_renders_identical_content_into_the_same_message() {
    let surface = FakeSurface::new();
    let ctx = context(surface.clone()).await;
    ctx.storage
        .create_enterprise(&NewEnterprise::new("Acme", "Bob", EnterpriseKind::Legal))
        .await
        .expect("create");

    synchronize(&ctx).await.expect("first sync");
    let before = surface.own_messages()[0].clone();
    synchronize(&ctx).await.expect("second sync");
    let after = surface.own_messages()[0].clone();

    assert_eq!(before.id, after.id);
    let before_embed = before.embed.expect("embed");
    let after_embed = after.embed.expect("embed");
    assert_eq!(before_embed.fields, after_embed.fields);
    assert_eq!(before_embed.title, after_embed.title);
}

#[tokio::test]
async fn stored_identity_survives_foreign_posts_pushing_it_out_of_the_window() {
    let surface = FakeSurface::new();
    let ctx = context(surface.clone()).await;

    let SyncOutcome::Created(created) = synchronize(&ctx).await.expect("sync") else {
        panic!("expected creation");
    };
    for _ in 0..(RECENT_WINDOW + 3) {
        surface.push_message(UserId(42));
    }

    let outcome = synchronize(&ctx).await.expect("sync");
    assert_eq!(outcome, SyncOutcome::Updated(created));
    assert_eq!(surface.own_messages().len(), 1);
}

#[tokio::test]
async fn adopts_an_own_message_within_the_recent_window() {
    let surface = FakeSurface::new();
    let legacy = surface.push_roster_message(BOT_USER);
    surface.push_message(UserId(42));
    let ctx = context(surface.clone()).await;

    let outcome = synchronize(&ctx).await.expect("sync");

    assert_eq!(outcome, SyncOutcome::Updated(legacy));
    assert_eq!(surface.posts(), 0);
    assert_eq!(
        ctx.storage
            .load_display_artifact(DISPLAY_CHANNEL)
            .await
            .expect("load"),
        Some(legacy)
    );
}

#[tokio::test]
async fn own_message_outside_the_window_is_not_found() {
    let surface = FakeSurface::new();
    surface.push_roster_message(BOT_USER);
    for _ in 0..RECENT_WINDOW {
        surface.push_message(UserId(42));
    }
    let ctx = context(surface.clone()).await;

    let outcome = synchronize(&ctx).await.expect("sync");

    assert!(matches!(outcome, SyncOutcome::Created(_)));
    assert_eq!(surface.own_messages().len(), 2);
}

#[tokio::test]
async fn externally_deleted_message_is_recreated() {
    let surface = FakeSurface::new();
    let ctx = context(surface.clone()).await;

    let SyncOutcome::Created(first) = synchronize(&ctx).await.expect("sync") else {
        panic!("expected creation");
    };
    surface.delete_message(first);

    let outcome = synchronize(&ctx).await.expect("sync");
    let SyncOutcome::Created(second) = outcome else {
        panic!("expected recreation, got {outcome:?}");
    };
    assert_ne!(first, second);
    assert_eq!(
        ctx.storage
            .load_display_artifact(DISPLAY_CHANNEL)
            .await
            .expect("load"),
        Some(second)
    );
}

#[tokio::test]
async fn unavailable_channel_is_skipped_silently() {
    let surface = FakeSurface::new();
    surface.set_channel_missing(true);
    let ctx = context(surface.clone()).await;

    let outcome = synchronize(&ctx).await.expect("sync");

    assert_eq!(outcome, SyncOutcome::Skipped);
    assert!(surface.messages().is_empty());
}

#[tokio::test]
async fn transport_failures_are_reported() {
    let surface = FakeSurface::new();
    surface.set_transport_down(true);
    let ctx = context(surface.clone()).await;

    let err = synchronize(&ctx).await.expect_err("should fail");
    assert!(matches!(err, SyncError::Display(DisplayError::Transport(_))));
}

#[tokio::test]
async fn own_plain_replies_in_the_window_are_not_adopted() {
    let surface = FakeSurface::new();
    let reply = surface.push_message(BOT_USER);
    let ctx = context(surface.clone()).await;

    let outcome = synchronize(&ctx).await.expect("sync");

    let SyncOutcome::Created(created) = outcome else {
        panic!("expected a new roster message, got {outcome:?}");
    };
    assert_ne!(created, reply);
    let untouched = surface
        .messages()
        .into_iter()
        .find(|message| message.id == reply)
        .expect("reply still there");
    assert!(untouched.embed.is_none());
}
