//! CLI entry point.
//!
//! Parses arguments, composes the supervisor via [`bootstrap`] and feeds
//! inbound chat messages to the [`Dispatcher`] until shutdown. The managed
//! process is left running when the supervisor exits.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use warden_cli::{Cli, CliError, Dispatcher, Warden, WardenConfig, bootstrap, notify_startup};
use warden_core::ChatConnectionPort;
use warden_runtime::SupervisorError;

/// Name used in the startup notice when the bot identity is unavailable.
const FALLBACK_NAME: &str = "warden";

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
fn watch_signals(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Cannot listen for SIGTERM");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("Shutdown requested");
        shutdown.cancel();
    });
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = WardenConfig::from_cli(&cli)?;
    info!(
        owner = %config.owner,
        users = config.users.len(),
        workdir = %config.target.workdir.display(),
        "Starting warden"
    );

    let Warden {
        context,
        bot,
        supervisor,
        mut inbound,
        shutdown,
    } = bootstrap(config)?;
    watch_signals(shutdown.clone());

    match supervisor.establish().await {
        Ok(()) => {}
        Err(SupervisorError::Cancelled) => return Ok(()),
        Err(e) => return Err(CliError::from(e).into()),
    }
    if context.controller.resume_streaming() {
        info!(
            observers = context.broadcaster.observers().len(),
            "Streaming output to restored debug chats"
        );
    }

    let name = match bot.whoami().await {
        Ok(identity) => identity.username.unwrap_or(identity.name),
        Err(e) => {
            warn!(error = %e, "Could not fetch bot identity");
            FALLBACK_NAME.to_string()
        }
    };
    notify_startup(context.sender.as_ref(), &context.access, &name).await;

    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&context)));
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            message = inbound.recv() => {
                let Some(message) = message else {
                    warn!("Inbound queue closed");
                    break;
                };
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move { dispatcher.serve(message).await });
            }
        }
    }

    context.broadcaster.flush().await;
    supervisor.shutdown().await;
    info!("Warden stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}
