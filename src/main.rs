//! ccm-e2e CLI - Node controller e2e tests for cloud-controller-manager

use anyhow::Result;
use ccm_e2e::commands::check::CheckOptions;
use ccm_e2e::commands::test::TestRunOptions;
use ccm_e2e::config::Settings;
use ccm_e2e::k8s::nodes::RegistrationCondition;
use ccm_e2e::utils::{display_error_and_exit, enhance_error, logger};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "ccm-e2e")]
#[command(author, version, about = "Node controller e2e tests for cloud-controller-manager", long_about = None)]
struct Cli {
    /// Verbose output (can be used multiple times: -v, -vv, -vvv)
    /// -v: INFO, -vv: DEBUG, -vvv: TRACE
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run e2e tests
    Test {
        #[command(subcommand)]
        command: TestCommands,
    },

    /// Delete a test node left behind by an interrupted run
    Cleanup {
        /// Name of the node to delete
        #[arg(short, long)]
        node_name: Option<String>,

        /// Cloud the node lives in
        #[arg(long, env = "CCM_E2E_CLOUD")]
        cloud: Option<String>,
    },

    /// Check prerequisites
    Check {
        /// Also connect to the cluster and the cloud
        #[arg(long)]
        live: bool,

        /// Cloud to authenticate with
        #[arg(long, env = "CCM_E2E_CLOUD")]
        cloud: Option<String>,

        /// Node name to look for leftovers of
        #[arg(short, long)]
        node_name: Option<String>,

        /// Path to kubeconfig
        #[arg(short, long, env = "KUBECONFIG")]
        kubeconfig: Option<String>,
    },

    /// Configuration file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum TestCommands {
    /// Run the node controller test on an existing cluster
    Run {
        /// Cloud underlying the cluster
        #[arg(long, env = "CCM_E2E_CLOUD")]
        cloud: Option<String>,

        /// Name of the node to create
        #[arg(short, long)]
        node_name: Option<String>,

        /// Append a random suffix to the node name
        #[arg(long)]
        randomize_name: bool,

        /// Path to kubeconfig
        #[arg(short, long, env = "KUBECONFIG")]
        kubeconfig: Option<String>,

        /// Seconds to wait for the node to register
        #[arg(short, long)]
        timeout: Option<u64>,

        /// When the node counts as registered
        #[arg(long, value_enum)]
        condition: Option<RegistrationCondition>,

        /// Don't show the progress spinner
        #[arg(long)]
        no_progress: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print an example configuration file
    Example,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logger::init(cli.verbose);

    let settings = Settings::load();
    if cli.no_color || !settings.colors.enabled {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli, settings).await {
        display_error_and_exit(enhance_error(e));
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<()> {
    match cli.command {
        Commands::Test { command } => handle_test_command(command, &settings).await,
        Commands::Cleanup { node_name, cloud } => {
            let cloud = cloud.unwrap_or_else(|| settings.defaults.cloud.clone());
            let node_name = node_name.unwrap_or_else(|| settings.defaults.node_name.clone());
            ccm_e2e::commands::cleanup::cleanup(&cloud, &node_name).await
        }
        Commands::Check {
            live,
            cloud,
            node_name,
            kubeconfig,
        } => {
            ccm_e2e::commands::check::check(CheckOptions {
                live,
                cloud: cloud.unwrap_or_else(|| settings.defaults.cloud.clone()),
                node_name: node_name.unwrap_or_else(|| settings.defaults.node_name.clone()),
                kubeconfig: kubeconfig
                    .or_else(|| settings.defaults.kubeconfig.clone())
                    .map(PathBuf::from),
            })
            .await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Example => {
                print!("{}", Settings::example_config());
                Ok(())
            }
        },
        Commands::Completion { shell } => handle_completion_command(shell),
        Commands::Version => handle_version_command(),
    }
}

async fn handle_test_command(command: TestCommands, settings: &Settings) -> Result<()> {
    match command {
        TestCommands::Run {
            cloud,
            node_name,
            randomize_name,
            kubeconfig,
            timeout,
            condition,
            no_progress,
        } => {
            let mut options = TestRunOptions::from_settings(settings);
            if let Some(cloud) = cloud {
                options.cloud = cloud;
            }
            if let Some(node_name) = node_name {
                options.node_name = node_name;
            }
            options.randomize_name |= randomize_name;
            if let Some(kc) = kubeconfig {
                options.kubeconfig = Some(PathBuf::from(kc));
            }
            if let Some(secs) = timeout {
                options.wait.timeout = Duration::from_secs(secs);
                options.wait = options.wait.clamped();
            }
            if let Some(condition) = condition {
                options.wait.condition = condition;
            }
            if no_progress {
                options.show_progress = false;
            }

            ccm_e2e::commands::test::run_node_controller_test(options).await
        }
    }
}

fn handle_completion_command(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "ccm-e2e", &mut io::stdout());
    Ok(())
}

fn handle_version_command() -> Result<()> {
    println!("ccm-e2e {}", env!("CARGO_PKG_VERSION"));
    println!("Node controller e2e tests for cloud-controller-manager");
    Ok(())
}
