use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use prompt_session::app::{Command, Frontend};
use prompt_session::config::{Cli, Config};
use prompt_session::metrics::SessionMetrics;
use prompt_session::ui::{Surface, TerminalSurface};

fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        "prompt_session=debug"
    } else {
        "prompt_session=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    // Logs share stderr with the status line; stdout carries only output.
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Parse CLI arguments.
    let cli = Cli::parse();
    init_tracing(&cli);

    info!("prompt-session v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    config.apply_cli(&cli);

    info!(
        model = config.model.model_id,
        sources = ?config.library.sources,
        "Configuration loaded"
    );

    let metrics = Arc::new(SessionMetrics::new()?);
    let surface: Arc<dyn Surface> = Arc::new(TerminalSurface::new());
    let frontend = Frontend::start(&config, surface, metrics.clone()).await;

    let code = match &cli.prompt {
        // One-shot runs report failure through the exit status.
        Some(prompt) => match frontend.trigger(prompt).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                info!(error = %e, "One-shot run failed");
                ExitCode::FAILURE
            }
        },
        None => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if frontend.handle(Command::parse(&line)).await.is_break() {
                    break;
                }
            }
            ExitCode::SUCCESS
        }
    };

    if cli.metrics {
        eprint!("{}", metrics.encode()?);
    }

    Ok(code)
}
