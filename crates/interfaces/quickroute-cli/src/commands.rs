use std::time::Duration;

use anyhow::{bail, Result};
use tracing::{info, warn};

use quickroute_app_core::{AppCommand, AppKernel, CommandOutcome, QuickConnectOutcome};

use crate::{is_success, render, CliServiceAction};

/// Loads every external state. A partial load is reported but not fatal so
/// that commands which do not need the failing part still run.
async fn boot(kernel: &AppKernel) {
    if kernel.load().await != CommandOutcome::Loaded {
        warn!("some state could not be loaded");
    }
}

fn finish(kernel: &AppKernel, what: &str, outcome: CommandOutcome) -> Result<()> {
    render::print_notices(&kernel.store.drain_notices());
    if !is_success(&outcome) {
        bail!("{what} did not complete ({outcome:?})");
    }
    Ok(())
}

pub async fn cmd_status(kernel: &AppKernel) -> Result<()> {
    boot(kernel).await;
    render::print_notices(&kernel.store.drain_notices());
    print!(
        "{}",
        render::status_report(&kernel.store.state(), &kernel.profiles.list())
    );
    Ok(())
}

pub async fn cmd_profile_list(kernel: &AppKernel) -> Result<()> {
    boot(kernel).await;
    render::print_notices(&kernel.store.drain_notices());
    print!("{}", render::profile_table(&kernel.profiles.list()));
    Ok(())
}

pub async fn cmd_profile_select(kernel: &AppKernel, uid: String, force: bool) -> Result<()> {
    boot(kernel).await;
    let outcome = kernel.dispatch(AppCommand::Activate { uid, force }).await;
    finish(kernel, "Profile switch", outcome)
}

pub async fn cmd_profile_reorder(kernel: &AppKernel, source: String, target: String) -> Result<()> {
    boot(kernel).await;
    let outcome = kernel
        .dispatch(AppCommand::Reorder { source, target })
        .await;
    if outcome == CommandOutcome::Reordered(false) {
        println!("Nothing to move.");
    }
    finish(kernel, "Reorder", outcome)
}

pub async fn cmd_profile_remove(kernel: &AppKernel, uid: String) -> Result<()> {
    boot(kernel).await;
    let outcome = kernel.dispatch(AppCommand::Delete(uid)).await;
    finish(kernel, "Delete", outcome)
}

pub async fn cmd_profile_import(kernel: &AppKernel, url: String) -> Result<()> {
    boot(kernel).await;
    println!(":: Importing {url}");
    let outcome = kernel.dispatch(AppCommand::Import(url)).await;
    finish(kernel, "Import", outcome)
}

pub async fn cmd_profile_reactivate(kernel: &AppKernel) -> Result<()> {
    boot(kernel).await;
    let outcome = kernel.dispatch(AppCommand::Reactivate).await;
    finish(kernel, "Reactivation", outcome)
}

/// Without `mode`, prints the engine's current mode.
pub async fn cmd_mode(kernel: &AppKernel, mode: Option<String>) -> Result<()> {
    boot(kernel).await;
    let Some(mode) = mode else {
        render::print_notices(&kernel.store.drain_notices());
        match kernel.mode.current() {
            Some(m) => println!("{m}"),
            None => bail!("Engine configuration unavailable"),
        }
        return Ok(());
    };
    let outcome = kernel.dispatch(AppCommand::SetMode(mode)).await;
    if let Some(m) = kernel.mode.current() {
        println!(":: Mode is {m}");
    }
    finish(kernel, "Mode switch", outcome)
}

pub async fn cmd_service(kernel: &AppKernel, action: CliServiceAction) -> Result<()> {
    boot(kernel).await;
    let status = kernel.service.status();
    let cmd = match action {
        CliServiceAction::Install if status.is_installed() => {
            render::print_notices(&kernel.store.drain_notices());
            println!("Service already installed ({status}).");
            return Ok(());
        }
        CliServiceAction::Install | CliServiceAction::Toggle => AppCommand::InstallOrEnableService,
        CliServiceAction::Uninstall => AppCommand::UninstallService,
    };
    let outcome = kernel.dispatch(cmd).await;
    kernel.service.settled().await;
    println!(":: Service is {}", kernel.service.status());
    finish(kernel, "Service operation", outcome)
}

/// Prints every observed status change until Ctrl-C.
pub async fn cmd_service_watch(kernel: &AppKernel, every: Duration) -> Result<()> {
    let mut rx = kernel.store.subscribe();
    let token = kernel.service.spawn_poller(every);
    info!(?every, "watching service status");

    let mut last = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = rx.borrow_and_update().service_status;
                if last != Some(status) {
                    println!(":: Service is {status}");
                    last = Some(status);
                }
            }
        }
    }
    token.cancel();
    Ok(())
}

pub async fn cmd_quick(kernel: &AppKernel, on: bool) -> Result<()> {
    boot(kernel).await;
    let cmd = if on {
        AppCommand::EnableQuickConnect
    } else {
        AppCommand::DisableQuickConnect
    };
    let outcome = kernel.dispatch(cmd).await;
    if let CommandOutcome::QuickConnect(QuickConnectOutcome::Completed(report)) = &outcome {
        print!("{}", render::saga_summary(report));
    }
    kernel.service.settled().await;
    kernel.dispatch(AppCommand::RefreshFlags).await;
    println!(
        "   Connected:     {}",
        if kernel.quick.is_connected() { "yes" } else { "no" }
    );
    finish(kernel, "Quick connect", outcome)
}
