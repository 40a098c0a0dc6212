//! Profile storage backed by the state file plus one document per profile
//! under the profiles directory.

use std::sync::Arc;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use reqwest::{Client, Url};
use tracing::{debug, info, warn};

use quickroute_app_core::{ProfilesPort, RemoteCallError, RemoteResult};
use quickroute_config::PROFILES_DIR_NAME;
use quickroute_core::{LogLine, Profile, ProfileCollection, ProfileKind, RuntimeLogs};

use crate::controller::ControllerClient;
use crate::state::{StateFile, StateFileError};

pub struct FileProfiles {
    state: Arc<StateFile>,
    controller: Arc<ControllerClient>,
    http: Client,
    dir: Utf8PathBuf,
}

impl FileProfiles {
    pub fn new(state: Arc<StateFile>, controller: Arc<ControllerClient>, state_dir: &Utf8Path) -> Self {
        Self::with_client(state, controller, state_dir, Client::new())
    }

    pub fn with_client(
        state: Arc<StateFile>,
        controller: Arc<ControllerClient>,
        state_dir: &Utf8Path,
        http: Client,
    ) -> Self {
        Self {
            state,
            controller,
            http,
            dir: state_dir.join(PROFILES_DIR_NAME),
        }
    }

    /// Path of the document backing `profile`.
    pub fn document_path(&self, profile: &Profile) -> Utf8PathBuf {
        match &profile.file {
            Some(file) => self.dir.join(file),
            None => self.dir.join(format!("{}.yaml", profile.uid)),
        }
    }

    /// Loads `uid`'s document into the engine and records the outcome in the
    /// runtime logs.
    async fn apply(&self, uid: &str) -> RemoteResult<()> {
        let collection = self.state.load().await?.profiles;
        let profile = collection
            .get(uid)
            .ok_or_else(|| RemoteCallError::new(format!("profile {uid} not found")))?;
        let path = self.document_path(profile);

        let res = self.controller.reload_from(&path).await;
        let line = match &res {
            Ok(()) => LogLine("info".into(), format!("loaded {path}")),
            Err(e) => LogLine("error".into(), e.to_string()),
        };
        let uid = uid.to_string();
        self.state
            .update(move |s| {
                s.logs.insert(uid, vec![line]);
                Ok(())
            })
            .await?;
        Ok(res?)
    }

    async fn download(&self, url: &Url) -> Result<String, RemoteCallError> {
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RemoteCallError::new(format!("download {url} failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteCallError::new(format!(
                "download {url} failed: HTTP {status}"
            )));
        }
        resp.text()
            .await
            .map_err(|e| RemoteCallError::new(format!("download {url} body failed: {e}")))
    }
}

fn unknown(uid: &str) -> StateFileError {
    StateFileError::Rejected(format!("profile {uid} not found"))
}

#[async_trait]
impl ProfilesPort for FileProfiles {
    async fn fetch_profiles(&self) -> RemoteResult<ProfileCollection> {
        Ok(self.state.load().await?.profiles)
    }

    async fn patch_current(&self, uid: &str) -> RemoteResult<()> {
        self.state
            .update(|s| {
                if !s.profiles.contains(uid) {
                    return Err(unknown(uid));
                }
                s.profiles.current = Some(uid.to_string());
                Ok(())
            })
            .await?;
        self.apply(uid).await
    }

    async fn persist_reorder(&self, uid: &str, target_uid: &str) -> RemoteResult<()> {
        self.state
            .update(|s| {
                if !s.profiles.move_to(uid, target_uid) {
                    return Err(StateFileError::Rejected(format!(
                        "cannot move profile {uid} to {target_uid}"
                    )));
                }
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete_profile(&self, uid: &str) -> RemoteResult<()> {
        let removed = self
            .state
            .update(|s| {
                s.logs.remove(uid);
                s.profiles.remove(uid).ok_or_else(|| unknown(uid))
            })
            .await?;

        let path = self.document_path(&removed);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(%path, "profile document removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(%path, "profile document not removed: {e}"),
        }
        Ok(())
    }

    async fn import_profile(&self, url: &str) -> RemoteResult<()> {
        let parsed = Url::parse(url)
            .map_err(|e| RemoteCallError::new(format!("invalid profile url {url}: {e}")))?;
        let body = self.download(&parsed).await?;

        let uid = format!("r{}", uuid::Uuid::new_v4().simple());
        let mut profile = Profile::new(uid.clone(), ProfileKind::Remote);
        profile.name = parsed.host_str().map(str::to_string);
        profile.file = Some(format!("{uid}.yaml"));
        profile.url = Some(url.to_string());
        profile.updated = Some(chrono::Utc::now().timestamp());

        let path = self.document_path(&profile);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| RemoteCallError::new(format!("create {}: {e}", self.dir)))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| RemoteCallError::new(format!("write {path}: {e}")))?;

        self.state
            .update(move |s| {
                s.profiles.items.push(profile);
                Ok(())
            })
            .await?;
        info!(%uid, %url, "profile imported");
        Ok(())
    }

    async fn reactivate_engine(&self) -> RemoteResult<()> {
        let collection = self.state.load().await?.profiles;
        match collection.active() {
            Some(profile) => self.apply(&profile.uid).await,
            None => {
                debug!("no current profile, nothing to reactivate");
                Ok(())
            }
        }
    }

    async fn fetch_runtime_logs(&self) -> RemoteResult<RuntimeLogs> {
        Ok(self.state.load().await?.logs)
    }
}
