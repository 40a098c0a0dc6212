#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use quickroute_app_core::{
    AppKernel, Backends, ConfigPort, Credential, CredentialPrompt, EnginePort, KernelOptions,
    Platform, ProfilesPort, RemoteCallError, RemoteResult, ServiceAction, ServicePort, UiStore,
};
use quickroute_core::{
    AppFlags, EngineConfig, EnginePatch, FlagsPatch, Profile, ProfileCollection, ProfileKind,
    RuntimeLogs, ServiceStatus,
};

/// External state behind every port, plus a log of every call made.
#[derive(Default)]
pub struct World {
    pub collection: ProfileCollection,
    pub engine: EngineConfig,
    pub flags: AppFlags,
    pub persisted_engine: Vec<EnginePatch>,
    pub status: ServiceStatus,
    pub calls: Vec<String>,
    /// Calls starting with any of these prefixes fail.
    pub failing: Vec<String>,
    pub imported: usize,
    /// How long `persist_reorder` stays in flight.
    pub reorder_delay: Duration,
}

pub struct FakeBackend {
    world: Mutex<World>,
    push_delay: Duration,
    observer: OnceLock<UiStore>,
    pub observed_activating: Mutex<Vec<BTreeSet<String>>>,
}

impl FakeBackend {
    pub fn new(world: World) -> Arc<Self> {
        Self::with_push_delay(world, Duration::ZERO)
    }

    pub fn with_push_delay(world: World, push_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            world: Mutex::new(world),
            push_delay,
            observer: OnceLock::new(),
            observed_activating: Mutex::new(Vec::new()),
        })
    }

    /// Lets `patch_current` record what the UI saw while the push was in flight.
    pub fn observe(&self, store: &UiStore) {
        let _ = self.observer.set(store.clone());
    }

    pub fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap()
    }

    pub fn fail(&self, prefix: &str) {
        self.world().failing.push(prefix.to_string());
    }

    pub fn heal(&self) {
        self.world().failing.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.world().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.world()
            .calls
            .iter()
            .filter(|c| c.split(':').next() == Some(op))
            .count()
    }

    pub fn position(&self, call_prefix: &str) -> Option<usize> {
        self.world()
            .calls
            .iter()
            .position(|c| c.starts_with(call_prefix))
    }

    fn record(&self, call: String) -> RemoteResult<()> {
        let mut w = self.world();
        let failing = w.failing.iter().any(|p| call.starts_with(p.as_str()));
        w.calls.push(call.clone());
        if failing {
            Err(RemoteCallError::new(format!("{call} rejected")))
        } else {
            Ok(())
        }
    }
}

fn describe(patch: &FlagsPatch) -> String {
    let mut parts = Vec::new();
    if let Some(v) = patch.enable_service_mode {
        parts.push(format!("service={v}"));
    }
    if let Some(v) = patch.enable_tun_mode {
        parts.push(format!("tun={v}"));
    }
    if let Some(v) = patch.enable_system_proxy {
        parts.push(format!("proxy={v}"));
    }
    if let Some(v) = patch.auto_close_connection {
        parts.push(format!("auto_close={v}"));
    }
    parts.join(",")
}

#[async_trait]
impl ProfilesPort for FakeBackend {
    async fn fetch_profiles(&self) -> RemoteResult<ProfileCollection> {
        self.record("fetch_profiles".into())?;
        Ok(self.world().collection.clone())
    }

    async fn patch_current(&self, uid: &str) -> RemoteResult<()> {
        if !self.push_delay.is_zero() {
            tokio::time::sleep(self.push_delay).await;
        }
        if let Some(store) = self.observer.get() {
            self.observed_activating
                .lock()
                .unwrap()
                .push(store.state().activating);
        }
        self.record(format!("patch_current:{uid}"))?;
        self.world().collection.current = Some(uid.to_string());
        Ok(())
    }

    async fn persist_reorder(&self, uid: &str, target_uid: &str) -> RemoteResult<()> {
        let delay = self.world().reorder_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.record(format!("persist_reorder:{uid}>{target_uid}"))?;
        self.world().collection.move_to(uid, target_uid);
        Ok(())
    }

    async fn delete_profile(&self, uid: &str) -> RemoteResult<()> {
        self.record(format!("delete_profile:{uid}"))?;
        self.world().collection.remove(uid);
        Ok(())
    }

    async fn import_profile(&self, url: &str) -> RemoteResult<()> {
        self.record(format!("import_profile:{url}"))?;
        let mut w = self.world();
        w.imported += 1;
        let mut profile = Profile::new(format!("imported-{}", w.imported), ProfileKind::Remote);
        profile.url = Some(url.to_string());
        w.collection.items.push(profile);
        Ok(())
    }

    async fn reactivate_engine(&self) -> RemoteResult<()> {
        self.record("reactivate_engine".into())
    }

    async fn fetch_runtime_logs(&self) -> RemoteResult<RuntimeLogs> {
        self.record("fetch_runtime_logs".into())?;
        Ok(RuntimeLogs::new())
    }
}

#[async_trait]
impl EnginePort for FakeBackend {
    async fn fetch_engine_config(&self) -> RemoteResult<EngineConfig> {
        self.record("fetch_engine_config".into())?;
        Ok(self.world().engine.clone())
    }

    async fn patch_live_config(&self, patch: &EnginePatch) -> RemoteResult<()> {
        let mode = patch.mode.map(|m| m.to_string()).unwrap_or_default();
        self.record(format!("patch_live_config:{mode}"))?;
        if patch.mode.is_some() {
            self.world().engine.mode = mode;
        }
        Ok(())
    }

    async fn close_all_connections(&self) -> RemoteResult<()> {
        self.record("close_all_connections".into())
    }
}

#[async_trait]
impl ConfigPort for FakeBackend {
    async fn fetch_flags(&self) -> RemoteResult<AppFlags> {
        self.record("fetch_flags".into())?;
        Ok(self.world().flags)
    }

    async fn patch_flags(&self, patch: &FlagsPatch) -> RemoteResult<()> {
        self.record(format!("patch_flags:{}", describe(patch)))?;
        let mut w = self.world();
        patch.apply_to(&mut w.flags);
        if let Some(on) = patch.enable_service_mode {
            if w.status.is_installed() {
                w.status = if on {
                    ServiceStatus::Active
                } else {
                    ServiceStatus::Installed
                };
            }
        }
        Ok(())
    }

    async fn patch_engine_config(&self, patch: &EnginePatch) -> RemoteResult<()> {
        let mode = patch.mode.map(|m| m.to_string()).unwrap_or_default();
        self.record(format!("patch_engine_config:{mode}"))?;
        self.world().persisted_engine.push(patch.clone());
        Ok(())
    }
}

#[async_trait]
impl ServicePort for FakeBackend {
    async fn fetch_service_status(&self) -> RemoteResult<ServiceStatus> {
        self.record("fetch_service_status".into())?;
        Ok(self.world().status)
    }

    async fn install_service(&self, credential: Option<&Credential>) -> RemoteResult<()> {
        let secret = credential.map(|c| c.expose().to_string()).unwrap_or_default();
        self.record(format!("install_service:{secret}"))?;
        self.world().status = ServiceStatus::Installed;
        Ok(())
    }

    async fn uninstall_service(&self, credential: Option<&Credential>) -> RemoteResult<()> {
        let secret = credential.map(|c| c.expose().to_string()).unwrap_or_default();
        self.record(format!("uninstall_service:{secret}"))?;
        self.world().status = ServiceStatus::Uninstalled;
        Ok(())
    }
}

/// Answers every prompt the same way.
pub struct StaticPrompt {
    answer: Option<Credential>,
    pub asked: Mutex<Vec<ServiceAction>>,
}

impl StaticPrompt {
    pub fn answering(answer: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.map(Credential::new),
            asked: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CredentialPrompt for StaticPrompt {
    async fn request_credential(&self, action: ServiceAction) -> Option<Credential> {
        self.asked.lock().unwrap().push(action);
        self.answer.clone()
    }
}

/// Blocks until the test hands over a credential.
pub struct GatedPrompt {
    rx: tokio::sync::Mutex<Option<oneshot::Receiver<Option<Credential>>>>,
}

impl GatedPrompt {
    pub fn new() -> (Arc<Self>, oneshot::Sender<Option<Credential>>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                rx: tokio::sync::Mutex::new(Some(rx)),
            }),
            tx,
        )
    }
}

#[async_trait]
impl CredentialPrompt for GatedPrompt {
    async fn request_credential(&self, _action: ServiceAction) -> Option<Credential> {
        let rx = self.rx.lock().await.take()?;
        rx.await.ok().flatten()
    }
}

pub fn backends(fake: &Arc<FakeBackend>, prompt: Arc<dyn CredentialPrompt>) -> Backends {
    Backends {
        profiles: fake.clone(),
        engine: fake.clone(),
        config: fake.clone(),
        service: fake.clone(),
        prompt,
    }
}

pub fn kernel(fake: &Arc<FakeBackend>, prompt: Arc<dyn CredentialPrompt>, platform: Platform) -> AppKernel {
    let options = KernelOptions {
        platform,
        ..KernelOptions::default()
    };
    AppKernel::new(backends(fake, prompt), options)
}

pub fn no_credential() -> Platform {
    Platform {
        requires_credential: false,
    }
}

pub fn with_credential() -> Platform {
    Platform {
        requires_credential: true,
    }
}

/// `P1` (local) and `P2` (remote), nothing current.
pub fn two_profiles() -> World {
    World {
        collection: ProfileCollection::new(
            vec![
                Profile::new("P1", ProfileKind::Local),
                Profile::new("P2", ProfileKind::Remote),
            ],
            None,
        ),
        engine: EngineConfig::with_mode("rule"),
        ..Default::default()
    }
}

pub async fn settle_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
