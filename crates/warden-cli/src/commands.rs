//! Chat command grammar.
//!
//! Commands are slash-prefixed words, optionally addressed to the bot
//! (`/status@warden_bot`), followed by whitespace-separated arguments.

use std::str::FromStr;

use thiserror::Error;
use warden_core::UserId;
use warden_runtime::TerminalCommand;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    StartProcess { alternate_route: bool },
    StopProcess,
    RestartProcess { alternate_route: bool },
    Status,
    ProcessUptime,
    SystemUptime,
    Info,
    Ram,
    Cpu,
    Disk,
    Ping { host: Option<String> },
    Terminal(TerminalCommand),
    Logs { level: String },
    DebugOn,
    DebugOff,
    Diagnose,
    InstallRequirements,
    Update,
    AddUser(UserId),
    RemoveUser(UserId),
    ListUsers,
}

/// Why a command could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command /{0}. Send /help for the list.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Unknown terminal command '{0}'. Allowed: {allowed}", allowed = allowed_terminal())]
    UnknownTerminal(String),
}

fn allowed_terminal() -> String {
    TerminalCommand::ALL
        .iter()
        .map(|cmd| cmd.name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ChatCommand {
    /// Parse a message. `None` means the text is not a command at all.
    pub fn parse(text: &str) -> Option<Result<Self, CommandError>> {
        let rest = text.trim().strip_prefix('/')?;
        let mut words = rest.split_whitespace();
        let head = words.next()?;
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        let args: Vec<&str> = words.collect();
        Some(Self::from_parts(&name, &args))
    }

    fn from_parts(name: &str, args: &[&str]) -> Result<Self, CommandError> {
        let first = args.first().copied();
        let proxy = first.is_some_and(|a| a.eq_ignore_ascii_case("proxy"));
        let command = match name {
            "start" | "help" | "menu" => Self::Help,
            "start_userbot" => Self::StartProcess {
                alternate_route: proxy,
            },
            "start_userbot_proxy" => Self::StartProcess {
                alternate_route: true,
            },
            "stop_userbot" => Self::StopProcess,
            "restart_userbot" => Self::RestartProcess {
                alternate_route: proxy,
            },
            "status" => Self::Status,
            "uptime_userbot" => Self::ProcessUptime,
            "uptime" => Self::SystemUptime,
            "info" => Self::Info,
            "ram" => Self::Ram,
            "cpu" => Self::Cpu,
            "disk" => Self::Disk,
            "ping" => Self::Ping {
                host: first.map(str::to_string),
            },
            "terminal" => {
                let arg = first.ok_or(CommandError::Usage("/terminal <command>"))?;
                let command = TerminalCommand::from_str(arg)
                    .map_err(|_| CommandError::UnknownTerminal(arg.to_string()))?;
                Self::Terminal(command)
            }
            "logs" => Self::Logs {
                level: first
                    .ok_or(CommandError::Usage("/logs <level|ALL>"))?
                    .to_uppercase(),
            },
            "debug_on" => Self::DebugOn,
            "debug_off" => Self::DebugOff,
            "debug_userbot" | "diag" => Self::Diagnose,
            "install_requirements" => Self::InstallRequirements,
            "update_heroku" | "update" => Self::Update,
            "get_user" | "adduser" => {
                Self::AddUser(parse_user(first, "/get_user <user id>")?)
            }
            "del_user" | "deluser" => {
                Self::RemoveUser(parse_user(first, "/del_user <user id>")?)
            }
            "users" => Self::ListUsers,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }

    /// Whether only the owner may run this command.
    pub const fn owner_only(&self) -> bool {
        matches!(
            self,
            Self::StartProcess { .. }
                | Self::StopProcess
                | Self::RestartProcess { .. }
                | Self::Terminal(_)
                | Self::DebugOn
                | Self::DebugOff
                | Self::Diagnose
                | Self::InstallRequirements
                | Self::Update
                | Self::AddUser(_)
                | Self::RemoveUser(_)
                | Self::ListUsers
        )
    }

    /// Whether the command is only accepted in a private chat.
    pub const fn private_only(&self) -> bool {
        matches!(self, Self::AddUser(_) | Self::RemoveUser(_))
    }
}

fn parse_user(arg: Option<&str>, usage: &'static str) -> Result<UserId, CommandError> {
    let arg = arg.ok_or(CommandError::Usage(usage))?;
    arg.parse::<i64>()
        .map(UserId)
        .map_err(|_| CommandError::InvalidUserId(arg.to_string()))
}

/// Reply to `/help`.
pub const HELP_TEXT: &str = "\
Process:
/start_userbot [proxy] - start the managed process
/stop_userbot - stop it
/restart_userbot [proxy] - stop, then start
/status - running or stopped, with uptime
/uptime_userbot - managed process uptime

Logs:
/logs <level|ALL> - export the log file filtered by level
/debug_on, /debug_off - stream process output to this chat
/debug_userbot - diagnostics

Host:
/info - CPU, RAM, disk and uptime
/ram, /cpu, /disk, /uptime
/ping [host]
/terminal <free|top|ls|ps|outdated|purge>

Maintenance:
/install_requirements
/update_heroku

Users:
/get_user <id>, /del_user <id>, /users";
