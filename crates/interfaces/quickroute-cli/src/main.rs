use std::io::IsTerminal;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use quickroute_cli::{build_kernel, commands, default_state_dir, CliServiceAction, Settings};
use quickroute_config::{DEFAULT_CONTROLLER_URL, DEFAULT_STATUS_POLL_INTERVAL};
use quickroute_infra::HelperCommands;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    /// External controller of the proxy engine
    #[arg(long, global = true, env = "QUICKROUTE_CONTROLLER", default_value = DEFAULT_CONTROLLER_URL)]
    controller: String,
    #[arg(long, global = true, env = "QUICKROUTE_SECRET", hide_env_values = true)]
    secret: Option<String>,
    /// Directory holding the state file and profile documents
    #[arg(long, global = true, env = "QUICKROUTE_STATE_DIR")]
    state_dir: Option<Utf8PathBuf>,
    #[arg(long, global = true, env = "QUICKROUTE_SERVICE_STATUS_CMD")]
    service_status_cmd: Option<String>,
    #[arg(long, global = true, env = "QUICKROUTE_SERVICE_INSTALL_CMD")]
    service_install_cmd: Option<String>,
    #[arg(long, global = true, env = "QUICKROUTE_SERVICE_UNINSTALL_CMD")]
    service_uninstall_cmd: Option<String>,
    /// Elevation credential for service install/uninstall
    #[arg(long, global = true, env = "QUICKROUTE_CREDENTIAL", hide_env_values = true)]
    credential: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active profile, mode, service and switches
    Status,
    /// Manage profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Show or set the routing mode (rule, global, direct)
    Mode { mode: Option<String> },
    /// Manage the helper service
    Service {
        #[command(subcommand)]
        command: ServiceCommands,
    },
    /// Turn service mode, TUN mode and the system proxy on or off together
    Quick {
        #[command(subcommand)]
        command: QuickCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    List,
    Select {
        uid: String,
        /// Re-apply even when already current
        #[arg(long)]
        force: bool,
    },
    /// Move a profile to another profile's position
    Reorder { source: String, target: String },
    Remove { uid: String },
    Import { url: String },
    /// Re-apply the current profile
    Reactivate,
}

#[derive(Subcommand)]
enum ServiceCommands {
    Install,
    Uninstall,
    /// Install when missing, otherwise switch service mode
    Toggle,
    /// Poll the status and print changes
    Watch {
        #[arg(long, default_value_t = DEFAULT_STATUS_POLL_INTERVAL.as_secs())]
        interval_secs: u64,
    },
}

#[derive(Subcommand)]
enum QuickCommands {
    On,
    Off,
}

fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::default().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let state_dir = match cli.state_dir {
        Some(dir) => dir,
        None => default_state_dir()?,
    };
    let settings = Settings {
        controller: cli.controller,
        secret: cli.secret,
        state_dir,
        helper: HelperCommands {
            status: cli.service_status_cmd,
            install: cli.service_install_cmd,
            uninstall: cli.service_uninstall_cmd,
        },
        credential: cli.credential,
        interactive: std::io::stdin().is_terminal(),
    };
    let kernel = build_kernel(&settings)?;

    match cli.command {
        Commands::Status => commands::cmd_status(&kernel).await?,
        Commands::Profile { command } => match command {
            ProfileCommands::List => commands::cmd_profile_list(&kernel).await?,
            ProfileCommands::Select { uid, force } => {
                commands::cmd_profile_select(&kernel, uid, force).await?
            }
            ProfileCommands::Reorder { source, target } => {
                commands::cmd_profile_reorder(&kernel, source, target).await?
            }
            ProfileCommands::Remove { uid } => commands::cmd_profile_remove(&kernel, uid).await?,
            ProfileCommands::Import { url } => commands::cmd_profile_import(&kernel, url).await?,
            ProfileCommands::Reactivate => commands::cmd_profile_reactivate(&kernel).await?,
        },
        Commands::Mode { mode } => commands::cmd_mode(&kernel, mode).await?,
        Commands::Service { command } => match command {
            ServiceCommands::Install => {
                commands::cmd_service(&kernel, CliServiceAction::Install).await?
            }
            ServiceCommands::Uninstall => {
                commands::cmd_service(&kernel, CliServiceAction::Uninstall).await?
            }
            ServiceCommands::Toggle => {
                commands::cmd_service(&kernel, CliServiceAction::Toggle).await?
            }
            ServiceCommands::Watch { interval_secs } => {
                commands::cmd_service_watch(&kernel, Duration::from_secs(interval_secs.max(1)))
                    .await?
            }
        },
        Commands::Quick { command } => match command {
            QuickCommands::On => commands::cmd_quick(&kernel, true).await?,
            QuickCommands::Off => commands::cmd_quick(&kernel, false).await?,
        },
    }

    Ok(())
}
