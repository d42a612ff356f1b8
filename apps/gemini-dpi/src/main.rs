mod cli;

use clap::Parser;
use cli::Cli;
use gd_config::PluginConfig;
use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use gd_dpip::DEFAULT_MAX_TAG_BYTES;
use gd_dpip::HostCommand;
use gd_dpip::HostEvent;
use gd_dpip::read_tag;
use gd_navigator::NavigationOutcome;
use gd_navigator::NavigationReport;
use gd_navigator::Navigator;
use gd_net::GeminiClient;
use std::io;
use std::io::Write;
use std::ops::ControlFlow;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "gemini_dpi=info,gd_navigator=info,gd_net=info";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "plugin stopped");
            ExitCode::FAILURE
        }
    }
}

// stdout carries the host channel, so logs must stay on stderr.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> DpiResult<PluginConfig> {
    let mut config = PluginConfig::load(cli.config.as_deref())?;
    if let Some(path) = &cli.trust_store {
        config = config.with_trust_store_path(path.clone());
    }
    if let Some(seconds) = cli.timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(seconds));
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> DpiResult<()> {
    let config = load_config(cli)?;
    tracing::info!(
        trust_store = %config.trust_store_path.display(),
        timeout_secs = config.request_timeout.as_secs(),
        "starting"
    );

    let client = GeminiClient::from_config(&config)?;
    let mut navigator = Navigator::new(config, client);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();

    while let Some(tag) = read_tag(&mut input, DEFAULT_MAX_TAG_BYTES)? {
        let event = match HostEvent::from_tag(tag) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, "ignoring malformed host tag");
                continue;
            }
        };
        if event.command == HostCommand::Bye {
            tracing::info!("host requested teardown");
            std::process::exit(0);
        }

        let mut out = stdout.lock();
        let report = navigator.handle_event(&event, &mut out);
        out.flush().map_err(|error| {
            DpiError::new(ErrorKind::Host, format!("failed to flush page: {error}"))
        })?;

        if next_step(&report)?.is_break() {
            tracing::debug!(warnings = report.warnings.len(), "navigation handled");
            return Ok(());
        }
        tracing::debug!(command = ?event.command, "not handled");
    }

    tracing::info!("host closed the channel");
    Ok(())
}

/// One navigation per session: a handled event ends it cleanly, a failed
/// one ends it with the failure, anything else waits for the next tag.
fn next_step(report: &NavigationReport) -> DpiResult<ControlFlow<()>> {
    match &report.outcome {
        NavigationOutcome::Handled => Ok(ControlFlow::Break(())),
        NavigationOutcome::NotHandled => Ok(ControlFlow::Continue(())),
        NavigationOutcome::Failed(error) => Err(error.clone()),
    }
}
