use aphrc_cli::app;
use aphrc_cli::backend::container::ContainerBackend;
use aphrc_cli::backend::native::{NativeBackend, ReportFormat};
use aphrc_cli::bootstrap::Environment;
use aphrc_cli::cli::{Cli, Command};
use aphrc_cli::error::WorkflowResult;
use aphrc_cli::prompt::DialoguerPrompter;
use aphrc_core::config::{LocalDbConfig, RunnerMode};
use aphrc_core::docker::Docker;
use aphrc_core::process::SystemCommandRunner;
use aphrc_core::readiness::ReadinessConfig;
use aphrc_db::wait_until_ready;
use aphrc_openalex::api::OpenAlexApi;
use aphrc_openalex::extract::ExtractConfig;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "aphrc=info,aphrc_cli=info,aphrc_core=info,aphrc_db=info,aphrc_openalex=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => {}
        Err(e) if e.is_expected() => {
            println!("{e}");
            std::process::exit(e.exit_code());
        }
        Err(e) => {
            tracing::error!(error = %e, "Workflow failed");
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> WorkflowResult<()> {
    let env = Environment::new(
        Docker::new(SystemCommandRunner::default()),
        cli.global.environment(),
    );

    if cli.global.skip_bootstrap {
        tracing::info!("Skipping container bootstrap");
    } else {
        let outcome = env.ensure_running().await?;
        tracing::info!(
            started = outcome.started,
            probe_attempts = outcome.probe_attempts,
            "Environment ready",
        );
    }

    if matches!(cli.command, Command::Up) {
        return Ok(());
    }

    tracing::info!(mode = %cli.global.mode, "Selected runner");
    let prompter = DialoguerPrompter::default();
    match cli.global.mode {
        RunnerMode::Container => {
            app::dispatch(&ContainerBackend::new(&env), cli.command, &prompter).await
        }
        RunnerMode::Native => {
            let local = LocalDbConfig::from_env()?;
            let readiness = ReadinessConfig::with_timeout(env.config.readiness_timeout);
            let pool = wait_until_ready(&local.connection_url(), &readiness).await?;
            let backend = configure_native(
                NativeBackend::new(pool, OpenAlexApi::default()),
                &cli.command,
            );
            app::dispatch(&backend, cli.command, &prompter).await
        }
    }
}

/// Apply the command's native-only options.
fn configure_native(backend: NativeBackend, command: &Command) -> NativeBackend {
    match command {
        Command::Import(args) => {
            let mut config = ExtractConfig::default();
            if let Some(max_files) = args.max_snapshot_files {
                config.snapshot.max_files = max_files;
            }
            backend.with_extract_config(config)
        }
        Command::Verify(args) if args.json => backend.with_report_format(ReportFormat::Json),
        Command::Export(args) => backend.with_batch_size(args.batch_size),
        _ => backend,
    }
}
