//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together.
//! All concrete implementations are instantiated here:
//! - Process table and shell launcher (via warden-runtime)
//! - Telegram bot (via warden-telegram)
//! - Lifecycle controller, broadcaster, terminal runner and watchdogs
//!
//! Command handlers receive the composed [`AppContext`].

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use warden_core::{
    ChatConnectionPort, ChatSenderPort, InboundMessage, ProcessLauncherPort, ProcessTablePort,
    Settings, UserId, default_workdir, validate_settings,
};
use warden_runtime::{
    AccessList, ConnectionWatchdog, DebugBroadcaster, LifecycleController, ObserverRegistry,
    PollingSupervisor, ProcessMatcher, ReconnectState, ShellLauncher, StateStore,
    SysinfoProcessTable, TargetConfig, TerminalRunner,
};
use warden_telegram::{DefaultTelegramBot, TelegramConfig};

use crate::error::CliError;
use crate::parser::Cli;

/// Capacity of the inbound message queue.
const INBOUND_QUEUE: usize = 64;

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct WardenConfig {
    pub telegram: TelegramConfig,
    pub owner: UserId,
    pub users: Vec<UserId>,
    pub target: TargetConfig,
    pub settings: Settings,
    pub state_file: Option<PathBuf>,
}

impl WardenConfig {
    /// Resolve parsed arguments into a validated configuration.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.bot_token.trim().is_empty() {
            return Err(CliError::Arguments("bot token must not be empty".into()));
        }

        let workdir = match &cli.workdir {
            Some(dir) => dir.clone(),
            None => default_workdir()?,
        };
        let mut target = TargetConfig::new(workdir)
            .with_module(&cli.module)
            .with_launch_flag(&cli.launch_flag)
            .with_relay(&cli.relay)
            .with_package(&cli.package);
        target = match &cli.path_override {
            Some(path) => target.with_path_override(path).with_python(&cli.python),
            None => target.with_python(&cli.python),
        };
        if let Some(log_file) = &cli.log_file {
            target = target.with_log_file(log_file);
        }
        if let Some(tail_file) = &cli.tail_file {
            target = target.with_tail_file(tail_file);
        }

        let settings = Settings {
            max_retries: cli.max_retries,
            ..Settings::default()
        };
        validate_settings(&settings)?;

        Ok(Self {
            telegram: TelegramConfig::new(&cli.bot_token).with_base_url(&cli.api_url),
            owner: UserId(cli.owner_id),
            users: cli.user_ids.iter().copied().map(UserId).collect(),
            target,
            settings,
            state_file: cli.state_file.clone(),
        })
    }
}

/// Everything command handlers need.
pub struct AppContext {
    pub controller: Arc<LifecycleController>,
    pub broadcaster: Arc<DebugBroadcaster>,
    pub terminal: TerminalRunner,
    pub access: Arc<AccessList>,
    pub sender: Arc<dyn ChatSenderPort>,
}

impl AppContext {
    /// Wire the runtime components around the given ports.
    pub fn compose(
        table: Arc<dyn ProcessTablePort>,
        launcher: Arc<dyn ProcessLauncherPort>,
        sender: Arc<dyn ChatSenderPort>,
        access: Arc<AccessList>,
        observers: Arc<ObserverRegistry>,
        target: TargetConfig,
        settings: &Settings,
    ) -> Self {
        let matcher = Arc::new(ProcessMatcher::new(table, target.markers()));
        let broadcaster = Arc::new(DebugBroadcaster::new(
            Arc::clone(&sender),
            observers,
            settings,
        ));
        let controller = Arc::new(LifecycleController::new(
            matcher,
            launcher,
            target.clone(),
            settings.clone(),
            Arc::clone(&broadcaster),
        ));
        Self {
            controller,
            broadcaster,
            terminal: TerminalRunner::new(target, settings),
            access,
            sender,
        }
    }
}

/// The fully composed supervisor.
pub struct Warden {
    pub context: Arc<AppContext>,
    pub bot: Arc<DefaultTelegramBot>,
    pub supervisor: PollingSupervisor,
    pub inbound: mpsc::Receiver<InboundMessage>,
    pub shutdown: CancellationToken,
}

/// Bootstrap the supervisor.
///
/// This is the composition root. It:
/// 1. Opens the state file when one is configured
/// 2. Builds the access list and observer registry on top of it
/// 3. Creates the bot and the runtime components
/// 4. Creates the watchdog and polling supervisor sharing one reconnect state
pub fn bootstrap(config: WardenConfig) -> Result<Warden, CliError> {
    let store = config
        .state_file
        .as_ref()
        .map(StateStore::open)
        .transpose()?
        .map(Arc::new);

    let (access, observers) = match &store {
        Some(store) => {
            info!(path = %store.path().display(), "Using persistent state");
            (
                AccessList::with_store(config.owner, config.users, Arc::clone(store)),
                ObserverRegistry::with_store(Arc::clone(store)),
            )
        }
        None => (
            AccessList::new(config.owner, config.users),
            ObserverRegistry::new(),
        ),
    };

    let (tx, inbound) = mpsc::channel(INBOUND_QUEUE);
    let bot = Arc::new(DefaultTelegramBot::new(&config.telegram, tx)?);

    let context = AppContext::compose(
        Arc::new(SysinfoProcessTable::new()),
        Arc::new(ShellLauncher::new()),
        Arc::clone(&bot) as Arc<dyn ChatSenderPort>,
        Arc::new(access),
        Arc::new(observers),
        config.target,
        &config.settings,
    );

    let connection = Arc::clone(&bot) as Arc<dyn ChatConnectionPort>;
    let watchdog = Arc::new(ConnectionWatchdog::new(
        Arc::clone(&connection),
        Arc::new(ReconnectState::new()),
        &config.settings,
    ));
    let shutdown = CancellationToken::new();
    let supervisor = PollingSupervisor::new(
        connection,
        watchdog,
        &config.settings,
        shutdown.child_token(),
    );

    Ok(Warden {
        context: Arc::new(context),
        bot,
        supervisor,
        inbound,
        shutdown,
    })
}
