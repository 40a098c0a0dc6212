//! JSON state file: profiles, the current pointer, app flags and the
//! persisted engine patch. Every write goes through a temp file and a rename.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use quickroute_app_core::{ConfigPort, RemoteCallError, RemoteResult};
use quickroute_config::STATE_FILE_NAME;
use quickroute_core::{AppFlags, EnginePatch, FlagsPatch, ProfileCollection, RuntimeLogs};

#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("state file IO error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {path} is not valid JSON: {source}")]
    Json {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Rejected(String),
}

impl From<StateFileError> for RemoteCallError {
    fn from(e: StateFileError) -> Self {
        RemoteCallError::new(e.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    #[serde(default)]
    pub profiles: ProfileCollection,
    #[serde(default)]
    pub flags: AppFlags,
    #[serde(default)]
    pub engine: EnginePatch,
    #[serde(default)]
    pub logs: RuntimeLogs,
}

pub struct StateFile {
    path: Utf8PathBuf,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl StateFile {
    /// State file inside `dir`. The directory is created on first write.
    pub fn in_dir(dir: &Utf8Path) -> Self {
        Self::at(dir.join(STATE_FILE_NAME))
    }

    pub fn at(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Missing file reads as the default state.
    pub async fn load(&self) -> Result<PersistedState, StateFileError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Loads, applies `f`, and writes back only when `f` succeeds.
    pub async fn update<T>(
        &self,
        f: impl FnOnce(&mut PersistedState) -> Result<T, StateFileError>,
    ) -> Result<T, StateFileError> {
        let _guard = self.lock.lock().await;
        let mut state = self.read().await?;
        let out = f(&mut state)?;
        self.write(&state).await?;
        Ok(out)
    }

    async fn read(&self) -> Result<PersistedState, StateFileError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PersistedState::default())
            }
            Err(source) => {
                return Err(StateFileError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let mut state: PersistedState =
            serde_json::from_slice(&bytes).map_err(|source| StateFileError::Json {
                path: self.path.clone(),
                source,
            })?;
        state.profiles.normalize();
        Ok(state)
    }

    async fn write(&self, state: &PersistedState) -> Result<(), StateFileError> {
        let json = serde_json::to_vec_pretty(state).map_err(|source| StateFileError::Json {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StateFileError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        atomic_write(&self.path, &json)
            .await
            .map_err(|source| StateFileError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path, "state saved");
        Ok(())
    }
}

async fn atomic_write(path: &Utf8Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp_path = Utf8PathBuf::from(format!("{path}.tmp"));

    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    match tokio::fs::rename(&tmp_path, path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            tokio::fs::remove_file(path).await.ok();
            tokio::fs::rename(&tmp_path, path).await
        }
        Err(e) => {
            tokio::fs::remove_file(&tmp_path).await.ok();
            Err(e)
        }
    }
}

#[async_trait]
impl ConfigPort for StateFile {
    async fn fetch_flags(&self) -> RemoteResult<AppFlags> {
        Ok(self.load().await?.flags)
    }

    async fn patch_flags(&self, patch: &FlagsPatch) -> RemoteResult<()> {
        self.update(|s| {
            patch.apply_to(&mut s.flags);
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn patch_engine_config(&self, patch: &EnginePatch) -> RemoteResult<()> {
        self.update(|s| {
            if let Some(mode) = patch.mode {
                s.engine.mode = Some(mode);
            }
            Ok(())
        })
        .await?;
        Ok(())
    }
}
