//! Helper-service adapter that shells out to user-configured commands.
//!
//! The status command prints one of `uninstalled`, `installing`, `installed`
//! or `active` on stdout. Install and uninstall receive the elevation
//! credential, when there is one, on stdin.

use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use quickroute_app_core::{Credential, RemoteCallError, RemoteResult, ServiceAction, ServicePort};
use quickroute_core::ServiceStatus;

#[derive(Debug, Error)]
pub enum HelperError {
    #[error("no command configured to {0}")]
    NotConfigured(&'static str),
    #[error("command line could not be parsed: {0}")]
    Parse(String),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl From<HelperError> for RemoteCallError {
    fn from(e: HelperError) -> Self {
        RemoteCallError::new(e.to_string())
    }
}

/// Raw command lines, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct HelperCommands {
    pub status: Option<String>,
    pub install: Option<String>,
    pub uninstall: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HelperService {
    status: Option<Vec<String>>,
    install: Option<Vec<String>>,
    uninstall: Option<Vec<String>>,
}

fn split(line: Option<&str>) -> Result<Option<Vec<String>>, HelperError> {
    let Some(line) = line.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(None);
    };
    let argv = shlex::split(line).ok_or_else(|| HelperError::Parse(line.to_string()))?;
    if argv.is_empty() {
        return Err(HelperError::Parse(line.to_string()));
    }
    Ok(Some(argv))
}

impl HelperService {
    pub fn from_commands(commands: &HelperCommands) -> Result<Self, HelperError> {
        Ok(Self {
            status: split(commands.status.as_deref())?,
            install: split(commands.install.as_deref())?,
            uninstall: split(commands.uninstall.as_deref())?,
        })
    }

    async fn run(
        argv: Option<&[String]>,
        what: &'static str,
        credential: Option<&Credential>,
    ) -> Result<String, HelperError> {
        let [program, args @ ..] = argv.ok_or(HelperError::NotConfigured(what))? else {
            return Err(HelperError::NotConfigured(what));
        };
        debug!(%program, ?args, "running helper command");

        let mut child = Command::new(program)
            .args(args)
            .stdin(if credential.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HelperError::Spawn {
                program: program.clone(),
                source,
            })?;

        if let (Some(credential), Some(mut stdin)) = (credential, child.stdin.take()) {
            let written = async {
                stdin.write_all(credential.expose().as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.shutdown().await
            }
            .await;
            // A helper that ignores stdin may close it early.
            if let Err(e) = written {
                debug!("credential not fully written: {e}");
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| HelperError::Spawn {
                program: program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(HelperError::Failed {
                program: program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn change(
        &self,
        action: ServiceAction,
        credential: Option<&Credential>,
    ) -> Result<(), HelperError> {
        let (argv, what) = match action {
            ServiceAction::Install => (self.install.as_deref(), "install the service"),
            ServiceAction::Uninstall => (self.uninstall.as_deref(), "uninstall the service"),
        };
        Self::run(argv, what, credential).await?;
        info!(?action, "helper command succeeded");
        Ok(())
    }
}

#[async_trait]
impl ServicePort for HelperService {
    async fn fetch_service_status(&self) -> RemoteResult<ServiceStatus> {
        let out = Self::run(self.status.as_deref(), "query the service status", None).await?;
        Ok(ServiceStatus::parse_lossy(&out))
    }

    async fn install_service(&self, credential: Option<&Credential>) -> RemoteResult<()> {
        Ok(self.change(ServiceAction::Install, credential).await?)
    }

    async fn uninstall_service(&self, credential: Option<&Credential>) -> RemoteResult<()> {
        Ok(self.change(ServiceAction::Uninstall, credential).await?)
    }
}
