mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, RunOptions, BUILD_TIMESTAMP};
use dvm_cli::core::{BackupManager, DecodePolicy, DockerRuntime, PullPolicy, VaultConfig};
use dvm_cli::utils::{AppConfig, DEFAULT_LOG_FILTER};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.options.verbose);
    tracing::debug!(built = BUILD_TIMESTAMP, "dvm-cli {}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = run(cli).await {
        eprintln!("{} {:#}", "✗".red(), err);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("dvm_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let app = AppConfig::load()?;
    let config = build_config(&cli.command, &cli.options, &app)?;
    config.validate()?;

    let runtime = DockerRuntime::connect()?;
    if !runtime.check_docker().await {
        anyhow::bail!("Docker daemon is not reachable. Is Docker running?");
    }
    let manager = BackupManager::new(&runtime, &config);

    match cli.command {
        Commands::Backup { .. } => {
            let image = manager.backup().await.context("Backup failed")?;
            println!("{} Image {} created successfully", "✓".green(), image.bold());
        }
        Commands::Restore { .. } => {
            let image = manager.restore().await.context("Restore failed")?;
            println!(
                "{} Volume {} restored successfully from {}",
                "✓".green(),
                config.volume.bold(),
                image
            );
        }
    }

    Ok(())
}

/// Merge command arguments, global flags and the config file
fn build_config(command: &Commands, options: &RunOptions, app: &AppConfig) -> Result<VaultConfig> {
    let mut config = match command {
        Commands::Backup { volume, tag } => VaultConfig::new(volume.as_str()).with_tag(tag.as_str()),
        Commands::Restore {
            volume,
            tag,
            namespace,
        } => {
            let namespace = namespace
                .clone()
                .or_else(|| app.namespace.clone())
                .unwrap_or_default();
            VaultConfig::new(volume.as_str())
                .with_tag(tag.as_str())
                .with_namespace(namespace)
        }
    };
    config = config.with_app_config(app)?;

    if options.timeout.is_some() {
        config.step_timeout = options.timeout;
    }
    if options.no_pull {
        config.pull_policy = PullPolicy::Never;
    }
    if options.strict_progress {
        config.decode_policy = DecodePolicy::Abort;
    }
    config.check_exit_status = options.check_exit;
    config.cleanup_on_failure = options.cleanup_on_failure;

    Ok(config)
}
