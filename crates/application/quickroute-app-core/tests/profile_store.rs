mod support;

use std::time::Duration;

use quickroute_app_core::{AppCommand, CommandOutcome, CoreError, ProfileStore, ValidationError};
use quickroute_core::{Profile, ProfileKind};
use support::{kernel, no_credential, two_profiles, FakeBackend, StaticPrompt, World};

fn three_profiles() -> World {
    let mut w = two_profiles();
    w.collection.items.push(Profile::new("P3", ProfileKind::Local));
    w
}

#[tokio::test]
async fn failed_persist_restores_previous_order() {
    let fake = FakeBackend::new(three_profiles());
    let store = ProfileStore::new(fake.clone());
    store.load().await.unwrap();
    fake.fail("persist_reorder");

    let err = store.reorder("P1", "P3").await.unwrap_err();
    assert!(matches!(err, CoreError::RemoteCall { .. }));
    assert_eq!(store.list().uids(), vec!["P1", "P2", "P3"]);
}

#[tokio::test(start_paused = true)]
async fn rollback_keeps_a_removal_that_landed_mid_persist() {
    let mut world = three_profiles();
    world.collection.current = Some("P3".into());
    world.reorder_delay = Duration::from_millis(300);
    let fake = FakeBackend::new(world);
    let store = ProfileStore::new(fake.clone());
    store.load().await.unwrap();
    fake.fail("persist_reorder");

    let (reordered, removed) = tokio::join!(store.reorder("P1", "P2"), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.remove("P3").await
    });

    assert!(reordered.is_err());
    assert!(removed.unwrap());
    assert_eq!(store.list().uids(), vec!["P1", "P2"]);
    assert_eq!(store.current(), "");
    assert_eq!(fake.world().collection.uids(), vec!["P1", "P2"]);
}

#[tokio::test]
async fn adjacent_swap_and_back_restores_order() {
    let fake = FakeBackend::new(three_profiles());
    let store = ProfileStore::new(fake.clone());
    store.load().await.unwrap();

    assert!(store.reorder("P2", "P3").await.unwrap());
    assert_eq!(store.list().uids(), vec!["P1", "P3", "P2"]);
    assert!(store.reorder("P3", "P2").await.unwrap());
    assert_eq!(store.list().uids(), vec!["P1", "P2", "P3"]);
    assert_eq!(fake.count("persist_reorder"), 2);
}

#[tokio::test]
async fn reorder_with_unknown_uid_is_a_no_op() {
    let fake = FakeBackend::new(three_profiles());
    let store = ProfileStore::new(fake.clone());
    store.load().await.unwrap();

    assert!(!store.reorder("P1", "ghost").await.unwrap());
    assert!(!store.reorder("P2", "P2").await.unwrap());
    assert_eq!(fake.count("persist_reorder"), 0);
}

#[tokio::test]
async fn select_only_moves_the_local_pointer() {
    let fake = FakeBackend::new(two_profiles());
    let store = ProfileStore::new(fake.clone());
    store.load().await.unwrap();

    assert!(store.select("P2"));
    assert!(!store.select("ghost"));
    assert_eq!(store.current(), "P2");
    assert_eq!(fake.count("patch_current"), 0);
}

#[tokio::test]
async fn removing_unknown_profile_is_a_validation_error() {
    let fake = FakeBackend::new(two_profiles());
    let store = ProfileStore::new(fake.clone());
    store.load().await.unwrap();

    let err = store.remove("ghost").await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation(ValidationError::UnknownProfile(_))
    ));
    assert_eq!(fake.count("delete_profile"), 0);
}

#[tokio::test]
async fn reload_drops_dangling_current() {
    let mut world = two_profiles();
    world.collection.current = Some("gone".into());
    let fake = FakeBackend::new(world);
    let store = ProfileStore::new(fake.clone());

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.current_uid(), "");
    assert_eq!(store.current(), "");
}

#[tokio::test]
async fn kernel_reports_failed_reorder() {
    let fake = FakeBackend::new(three_profiles());
    let k = kernel(&fake, StaticPrompt::answering(None), no_credential());
    k.load().await;
    fake.fail("persist_reorder");

    let outcome = k
        .dispatch(AppCommand::Reorder {
            source: "P3".into(),
            target: "P1".into(),
        })
        .await;
    assert_eq!(outcome, CommandOutcome::Failed);
    assert_eq!(k.store.state().errors().count(), 1);
    assert_eq!(k.profiles.list().uids(), vec!["P1", "P2", "P3"]);
}
