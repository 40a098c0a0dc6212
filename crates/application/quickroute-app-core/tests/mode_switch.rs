mod support;

use quickroute_app_core::{CommandOutcome, ModeOutcome};
use quickroute_core::RoutingMode;
use support::{kernel, no_credential, two_profiles, FakeBackend, StaticPrompt, World};

fn world(mode: &str, auto_close: bool) -> World {
    let mut w = two_profiles();
    w.engine.mode = mode.to_string();
    w.flags.auto_close_connection = auto_close;
    w
}

#[tokio::test]
async fn switching_mode_closes_connections_first_when_enabled() {
    let fake = FakeBackend::new(world("global", true));
    let k = kernel(&fake, StaticPrompt::answering(None), no_credential());
    assert_eq!(k.load().await, CommandOutcome::Loaded);

    assert_eq!(k.mode.set_mode(RoutingMode::Rule).await, ModeOutcome::Applied);

    assert_eq!(fake.count("close_all_connections"), 1);
    let close = fake.position("close_all_connections").unwrap();
    let live = fake.position("patch_live_config:rule").unwrap();
    let persisted = fake.position("patch_engine_config:rule").unwrap();
    assert!(close < live && live < persisted);
    assert_eq!(k.mode.current().as_deref(), Some("rule"));
}

#[tokio::test]
async fn same_mode_does_not_close_connections() {
    let fake = FakeBackend::new(world("Rule", true));
    let k = kernel(&fake, StaticPrompt::answering(None), no_credential());
    k.load().await;

    assert_eq!(k.mode.set_mode(RoutingMode::Rule).await, ModeOutcome::Applied);
    assert_eq!(fake.count("close_all_connections"), 0);
    assert_eq!(fake.count("patch_live_config"), 1);
}

#[tokio::test]
async fn preference_off_keeps_connections() {
    let fake = FakeBackend::new(world("global", false));
    let k = kernel(&fake, StaticPrompt::answering(None), no_credential());
    k.load().await;

    assert_eq!(k.mode.set_mode_str("direct").await, ModeOutcome::Applied);
    assert_eq!(fake.count("close_all_connections"), 0);
    assert_eq!(fake.world().persisted_engine.len(), 1);
}

#[tokio::test]
async fn unknown_engine_mode_heals_to_rule_silently() {
    let fake = FakeBackend::new(world("script", false));
    let k = kernel(&fake, StaticPrompt::answering(None), no_credential());

    assert_eq!(k.load().await, CommandOutcome::Loaded);

    assert_eq!(fake.count("patch_live_config"), 1);
    assert!(fake.position("patch_engine_config:rule").is_some());
    assert_eq!(k.mode.current().as_deref(), Some("rule"));
    assert_eq!(k.store.state().errors().count(), 0);
}

#[tokio::test]
async fn missing_engine_mode_is_not_healed() {
    let fake = FakeBackend::new(world("", true));
    let k = kernel(&fake, StaticPrompt::answering(None), no_credential());

    assert_eq!(k.load().await, CommandOutcome::Loaded);

    assert_eq!(fake.count("patch_live_config"), 0);
    assert_eq!(fake.count("patch_engine_config"), 0);
    assert_eq!(fake.count("close_all_connections"), 0);
    assert_eq!(k.mode.refresh().await, ModeOutcome::Unchanged);
}

#[tokio::test]
async fn invalid_input_is_rejected_without_push() {
    let fake = FakeBackend::new(world("rule", true));
    let k = kernel(&fake, StaticPrompt::answering(None), no_credential());
    k.load().await;

    assert_eq!(k.mode.set_mode_str("script").await, ModeOutcome::Rejected);
    assert_eq!(fake.count("patch_live_config"), 0);
    assert_eq!(fake.count("close_all_connections"), 0);
    assert_eq!(k.store.state().errors().count(), 1);
}

#[tokio::test]
async fn failed_live_patch_is_not_persisted() {
    let fake = FakeBackend::new(world("rule", false));
    let k = kernel(&fake, StaticPrompt::answering(None), no_credential());
    k.load().await;
    fake.fail("patch_live_config");

    assert_eq!(k.mode.set_mode(RoutingMode::Global).await, ModeOutcome::Failed);
    assert_eq!(fake.count("patch_engine_config"), 0);
    assert_eq!(k.mode.current().as_deref(), Some("rule"));
    assert_eq!(k.store.state().errors().count(), 1);
}
