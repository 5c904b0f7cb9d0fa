use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tgk_consistency::CheckOutcome;
use tgk_event::prelude::*;
use tgk_flags::prelude::*;
use tgk_flags::{DeviceIdentifier, TOKEN_KEEPER_NAME};
use tgk_models::{MatchId, TeamId};
use tgk_storage::prelude::*;
use tgk_test_utils::{init_tracing, temp_dir, FlakyWriter};
use uuid::Uuid;

fn device() -> DeviceIdentifier {
    Arc::new(|| Some(Uuid::nil()))
}

fn teams(ids: &[i64]) -> HashSet<TeamId> {
    ids.iter().copied().map(TeamId).collect()
}

fn last_body(remote: &FlakyWriter<Vec<u8>>) -> Value {
    let written = remote.written();
    let body = written.last().expect("nothing was uploaded");
    serde_json::from_slice(body).unwrap()
}

fn favorite_teams(
    root: &Path,
    remote: &FlakyWriter<Vec<u8>>,
    dispatcher: &Dispatcher,
) -> Flags<FavoriteTeams> {
    let registry = Arc::new(
        FlagsRegistry::<FavoriteTeams>::in_directory(FileSystemStorage::new(root.join("data")))
            .unwrap(),
    );
    let uploader = Arc::new(FlagsUploader::new(
        FlagsUploader::<FavoriteTeams>::adapt(remote.clone().write_only()),
        DevStorage::successing(PushToken::new(vec![0xca, 0xfe])).read_only(),
        device(),
        dispatcher.clone(),
    ));
    Flags::with_keepers_storage(
        registry,
        uploader,
        FileSystemStorage::new(root.join("cache")),
        dispatcher.clone(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_favorite_survives_restart_and_reaches_backend() {
    init_tracing();
    let dir = temp_dir();
    let dispatcher = Dispatcher::current().unwrap();
    let remote = FlakyWriter::<Vec<u8>>::reliable();

    let flags = favorite_teams(dir.path(), &remote, &dispatcher);
    flags.registry().load().await.unwrap();
    let _wiring = flags.subscribe();
    flags.registry().update_presence(TeamId(4), true).await.unwrap();
    flags.settle().await;

    assert_eq!(
        last_body(&remote),
        json!({
            "device_identifier": "00000000-0000-0000-0000-000000000000",
            "token": "cafe",
            "favorites": [4],
        })
    );
    let snapshot = std::fs::read(dir.path().join("cache/keeper-notifications-favorite-teams")).unwrap();
    assert_eq!(snapshot, br#"{"ids":[4]}"#);

    let restarted = favorite_teams(dir.path(), &remote, &dispatcher);
    restarted.registry().load().await.unwrap();
    assert!(restarted.registry().is_present(&TeamId(4)));
    assert_eq!(restarted.check().await, CheckOutcome::Consistent);
}

#[tokio::test]
async fn test_failed_upload_is_retried_by_lifecycle() {
    init_tracing();
    let dir = temp_dir();
    let dispatcher = Dispatcher::current().unwrap();
    let remote = FlakyWriter::<Vec<u8>>::failing_first(1);
    let lifecycle = Lifecycle::new();

    let flags = favorite_teams(dir.path(), &remote, &dispatcher);
    flags.registry().load().await.unwrap();
    let _wiring = flags.subscribe().and(flags.start(&lifecycle.should_check_upload_consistency()));

    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    flags
        .uploader()
        .did_fail()
        .subscribe(move |failure: &UploadFailure<TeamId>| sink.lock().push(failure.favorites.clone()));

    flags.registry().update_presence(TeamId(8), true).await.unwrap();
    flags.settle().await;
    assert_eq!(*failures.lock(), vec![teams(&[8])]);
    assert!(remote.written().is_empty());
    assert!(!dir.path().join("cache/keeper-notifications-favorite-teams").exists());

    lifecycle.did_become_active().publish(());
    flags.settle().await;

    assert_eq!(remote.attempts(), 2);
    assert_eq!(last_body(&remote)["favorites"], json!([8]));
    assert_eq!(flags.check().await, CheckOutcome::Consistent);
}

#[tokio::test]
async fn test_changes_before_load_are_uploaded_once_loaded() {
    init_tracing();
    let dir = temp_dir();
    let dispatcher = Dispatcher::current().unwrap();
    let remote = FlakyWriter::<Vec<u8>>::reliable();
    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    std::fs::write(dir.path().join("data/favorite-teams.json"), br#"{"ids":[1,2]}"#).unwrap();

    let flags = favorite_teams(dir.path(), &remote, &dispatcher);
    flags.registry().update_presence(TeamId(3), true).await.unwrap();
    assert_eq!(flags.check().await, CheckOutcome::Skipped);
    assert_eq!(remote.attempts(), 0);

    flags.registry().load().await.unwrap();
    assert_eq!(flags.check().await, CheckOutcome::Reuploaded);
    flags.settle().await;

    assert_eq!(last_body(&remote)["favorites"], json!([1, 2, 3]));
    let persisted = std::fs::read(dir.path().join("data/favorite-teams.json")).unwrap();
    assert_eq!(persisted, br#"{"ids":[1,2,3]}"#);
}

#[tokio::test]
async fn test_wired_changes_before_load_upload_only_the_merged_set() {
    init_tracing();
    let dir = temp_dir();
    let dispatcher = Dispatcher::current().unwrap();
    let remote = FlakyWriter::<Vec<u8>>::reliable();
    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    std::fs::write(dir.path().join("data/favorite-teams.json"), br#"{"ids":[1,2]}"#).unwrap();

    let flags = favorite_teams(dir.path(), &remote, &dispatcher);
    let _wiring = flags.subscribe();
    flags.registry().update_presence(TeamId(3), true).await.unwrap();
    flags.settle().await;

    assert_eq!(remote.attempts(), 0);
    assert!(!dir.path().join("cache/keeper-notifications-favorite-teams").exists());

    flags.registry().load().await.unwrap();
    flags.settle().await;

    assert_eq!(remote.attempts(), 1);
    assert_eq!(last_body(&remote)["favorites"], json!([1, 2, 3]));
    let snapshot = std::fs::read(dir.path().join("cache/keeper-notifications-favorite-teams")).unwrap();
    assert_eq!(snapshot, br#"{"ids":[1,2,3]}"#);
    assert_eq!(flags.check().await, CheckOutcome::Consistent);
}

#[tokio::test]
async fn test_registries_are_independent() {
    let dir = temp_dir();
    let disk = FileSystemStorage::new(dir.path());
    let teams = FlagsRegistry::<FavoriteTeams>::in_directory(disk.clone()).unwrap();
    let matches = FlagsRegistry::<FavoriteMatches>::in_directory(disk.clone()).unwrap();
    let muted = FlagsRegistry::<UnsubscribedMatches>::in_directory(disk).unwrap();
    teams.load().await.unwrap();
    matches.load().await.unwrap();
    muted.load().await.unwrap();

    teams.update_presence(TeamId(5), true).await.unwrap();
    matches.update_presence(MatchId(5), true).await.unwrap();

    assert!(teams.is_present(&TeamId(5)));
    assert!(matches.is_present(&MatchId(5)));
    assert!(!muted.is_present(&MatchId(5)));
    assert!(dir.path().join("favorite-teams.json").exists());
    assert!(dir.path().join("favorite-matches.json").exists());
    assert!(!dir.path().join("unsubscribed-matches.json").exists());
}

#[tokio::test]
async fn test_token_uploader_follows_rotated_token() {
    init_tracing();
    let dir = temp_dir();
    let dispatcher = Dispatcher::current().unwrap();
    let remote = FlakyWriter::<Vec<u8>>::reliable();
    let current = MemoryStorage::<(), PushToken>::new();
    let snapshot_file = Filename::new(TOKEN_KEEPER_NAME).unwrap();

    let uploader = TokenUploader::new(
        TokenUploader::adapt(remote.clone().write_only()),
        device(),
        FileSystemStorage::new(dir.path())
            .map_json()
            .map_mappable::<PushToken>()
            .single_key(snapshot_file)
            .shared(),
        current.clone().read_only(),
        dispatcher,
    );
    let lifecycle = Lifecycle::new();
    let _checks = uploader.subscribe_to(&lifecycle.should_check_upload_consistency());

    lifecycle.did_launch().publish(());
    uploader.settle().await;
    assert_eq!(remote.attempts(), 0);

    current.set(PushToken::new(vec![0x01]), ()).await.unwrap();
    lifecycle.did_launch().publish(());
    uploader.settle().await;
    assert_eq!(last_body(&remote)["token"], json!("01"));

    current.set(PushToken::new(vec![0x02]), ()).await.unwrap();
    lifecycle.did_become_active().publish(());
    uploader.settle().await;
    assert_eq!(remote.attempts(), 2);
    assert_eq!(last_body(&remote)["token"], json!("02"));

    let snapshot = std::fs::read(dir.path().join(TOKEN_KEEPER_NAME)).unwrap();
    assert_eq!(snapshot, br#"{"token":"02"}"#);
}
