use serde_json::{json, Value};
use std::path::Path;
use tgk_app::prelude::*;
use tgk_event::Dispatcher;
use tgk_models::{MatchId, TeamId};
use tgk_storage::ReadableStorage;
use tgk_test_utils::{init_tracing, temp_dir};
use uuid::Uuid;

fn config(root: &Path) -> KitConfig {
    KitConfig::default()
        .rooted_at(root)
        .with_push_token("c0ffee")
        .with_device_identifier(Uuid::from_u128(7))
}

fn read_json(path: impl AsRef<Path>) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn game(id: i64, home: i64, away: i64) -> Value {
    json!({
        "id": id,
        "home": {"id": home, "name": format!("Team {home}"), "short_name": format!("T{home}")},
        "away": {"id": away, "name": format!("Team {away}"), "short_name": format!("T{away}")},
        "date": "2017-07-16T16:00:00Z",
        "endDate": "2017-07-16T17:45:00Z",
        "location": "Utrecht",
    })
}

fn write_mirror(mirror: &Path) {
    std::fs::create_dir_all(mirror.join("matches")).unwrap();
    let all = json!({"edition": 2, "content": {"matches": [game(1, 10, 11), game(2, 12, 10)]}});
    std::fs::write(mirror.join("matches/all.json"), serde_json::to_vec(&all).unwrap()).unwrap();
}

#[tokio::test]
async fn test_favorite_is_uploaded_and_snapshotted() {
    init_tracing();
    let dir = temp_dir();
    let kit = Kit::new(config(dir.path()), Dispatcher::current().unwrap()).unwrap();
    kit.load().await.unwrap();
    let _wiring = kit.start();

    kit.favorite_teams()
        .registry()
        .update_presence(TeamId(4), true)
        .await
        .unwrap();
    kit.settle().await;

    let body = read_json(dir.path().join("outbox/favorite-teams-upload.json"));
    assert_eq!(body["favorites"], json!([4]));
    assert_eq!(body["token"], json!("c0ffee"));
    assert_eq!(body["device_identifier"], json!(Uuid::from_u128(7).to_string()));
    assert_eq!(
        read_json(dir.path().join("cache/keeper-notifications-favorite-teams")),
        json!({"ids": [4]})
    );
    assert_eq!(
        read_json(dir.path().join("data/favorite-teams.json")),
        json!({"ids": [4]})
    );
    assert_eq!(kit.activity().active(), 0);
}

#[tokio::test]
async fn test_launch_registers_push_token() {
    init_tracing();
    let dir = temp_dir();
    let kit = Kit::new(config(dir.path()), Dispatcher::current().unwrap()).unwrap();
    kit.load().await.unwrap();
    let _wiring = kit.start();

    kit.launch();
    kit.settle().await;

    assert_eq!(
        read_json(dir.path().join("outbox/push-token-upload.json")),
        json!({
            "device_identifier": Uuid::from_u128(7).to_string(),
            "token": "c0ffee",
        })
    );
    assert_eq!(
        read_json(dir.path().join("cache/token-uploader-consistency-keeper")),
        json!({"token": "c0ffee"})
    );
    // empty favorites match the empty default snapshot
    assert!(!dir.path().join("outbox/favorite-teams-upload.json").exists());
}

#[tokio::test]
async fn test_without_token_nothing_leaves_the_device() {
    init_tracing();
    let dir = temp_dir();
    let config = KitConfig::default()
        .rooted_at(dir.path())
        .with_device_identifier(Uuid::from_u128(7));
    let kit = Kit::new(config, Dispatcher::current().unwrap()).unwrap();
    kit.load().await.unwrap();
    let _wiring = kit.start();

    kit.favorite_matches()
        .registry()
        .update_presence(MatchId(3), true)
        .await
        .unwrap();
    kit.launch();
    kit.settle().await;

    assert!(!dir.path().join("outbox").exists());
    assert!(!dir.path().join("cache/keeper-notifications-favorite-matches").exists());
    assert!(kit.favorite_matches().registry().is_present(&MatchId(3)));
}

#[tokio::test]
async fn test_matches_are_cached_from_the_mirror() {
    init_tracing();
    let dir = temp_dir();
    let mirror = dir.path().join("mirror");
    write_mirror(&mirror);
    let kit = Kit::new(
        config(dir.path()).with_api_mirror_dir(&mirror),
        Dispatcher::current().unwrap(),
    )
    .unwrap();

    let all = kit.matches_api().all.retrieve(()).await.unwrap();
    assert_eq!(all.edition, 2);
    assert_eq!(all.content.matches.len(), 2);
    assert!(dir.path().join("cache/api/all.json").exists());

    std::fs::remove_dir_all(&mirror).unwrap();
    let cached = kit.matches_api().all.retrieve(()).await.unwrap();
    assert_eq!(cached, all);
}

#[tokio::test]
async fn test_muted_match_is_favorite_but_silent() {
    let dir = temp_dir();
    let mirror = dir.path().join("mirror");
    write_mirror(&mirror);
    let kit = Kit::new(
        config(dir.path()).with_api_mirror_dir(&mirror),
        Dispatcher::current().unwrap(),
    )
    .unwrap();
    kit.load().await.unwrap();

    kit.favorite_teams()
        .registry()
        .update_presence(TeamId(10), true)
        .await
        .unwrap();
    kit.unsubscribed_matches()
        .update_presence(MatchId(2), true)
        .await
        .unwrap();

    let all = kit.matches_api().all.retrieve(()).await.unwrap();
    let (first, second) = (&all.content.matches[0], &all.content.matches[1]);
    assert!(kit.is_favorite(first) && kit.should_notify(first));
    assert!(kit.is_favorite(second) && !kit.should_notify(second));
}

#[tokio::test]
async fn test_missing_mirror_is_reported_as_not_found() {
    let dir = temp_dir();
    let kit = Kit::new(config(dir.path()), Dispatcher::current().unwrap()).unwrap();
    let err = kit.matches_api().all.retrieve(()).await.unwrap_err();
    assert!(err.is_not_found());
}
