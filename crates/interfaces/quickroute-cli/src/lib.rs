pub mod commands;
pub mod prompt;
pub mod render;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use camino::Utf8PathBuf;
use clap::ValueEnum;
use directories::ProjectDirs;

use quickroute_app_core::{
    ActivationOutcome, AppKernel, Backends, CommandOutcome, KernelOptions, ModeOutcome,
    QuickConnectOutcome,
};
use quickroute_infra::{ControllerClient, FileProfiles, HelperCommands, HelperService, StateFile};

use crate::prompt::CliPrompt;

const QUALIFIER: &str = "net";
const ORG: &str = "quickroute";
const APP: &str = "quickroute";

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum CliServiceAction {
    Install,
    Uninstall,
    Toggle,
}

/// Runtime configuration resolved from flags and environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub controller: String,
    pub secret: Option<String>,
    pub state_dir: Utf8PathBuf,
    pub helper: HelperCommands,
    pub credential: Option<String>,
    /// Ask on stdin when no credential was given.
    pub interactive: bool,
}

pub fn default_state_dir() -> Result<Utf8PathBuf> {
    let dirs = ProjectDirs::from(QUALIFIER, ORG, APP)
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;
    Utf8PathBuf::from_path_buf(dirs.config_dir().to_path_buf())
        .map_err(|p| anyhow!("Config directory is not UTF-8: {}", p.display()))
}

/// Wires the file/HTTP/process adapters into a kernel.
pub fn build_kernel(settings: &Settings) -> Result<AppKernel> {
    let state = Arc::new(StateFile::in_dir(&settings.state_dir));
    let controller = Arc::new(
        ControllerClient::new(&settings.controller, settings.secret.clone())
            .context("Invalid controller address")?,
    );
    let profiles = Arc::new(FileProfiles::new(
        state.clone(),
        controller.clone(),
        &settings.state_dir,
    ));
    let service =
        Arc::new(HelperService::from_commands(&settings.helper).context("Invalid helper command")?);
    let prompt = Arc::new(CliPrompt::new(
        settings.credential.clone(),
        settings.interactive,
    ));

    let backends = Backends {
        profiles,
        engine: controller,
        config: state,
        service,
        prompt,
    };
    Ok(AppKernel::new(backends, KernelOptions::default()))
}

/// Whether an outcome should end the process successfully.
pub fn is_success(outcome: &CommandOutcome) -> bool {
    match outcome {
        CommandOutcome::Loaded | CommandOutcome::Refreshed | CommandOutcome::Reordered(_) => true,
        CommandOutcome::Activation(o) => {
            matches!(o, ActivationOutcome::Succeeded | ActivationOutcome::Skipped)
        }
        CommandOutcome::Mode(o) => matches!(
            o,
            ModeOutcome::Applied | ModeOutcome::Unchanged | ModeOutcome::Corrected
        ),
        CommandOutcome::Service(o) => o.is_ok(),
        CommandOutcome::QuickConnect(QuickConnectOutcome::Completed(report)) => report.all_ok(),
        CommandOutcome::QuickConnect(QuickConnectOutcome::Rejected) => false,
        CommandOutcome::Failed => false,
    }
}
