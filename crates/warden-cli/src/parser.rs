//! Command-line arguments.
//!
//! Every option has an environment-variable fallback so the supervisor can
//! be configured from a `.env` file next to the binary.

use std::path::PathBuf;

use clap::Parser;

/// Chat-controlled supervisor for a long-running bot process.
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Start, stop and watch a bot process from a Telegram chat")]
#[command(version)]
pub struct Cli {
    /// Bot API token of the control bot
    #[arg(long = "bot-token", env = "WARDEN_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    /// User id of the owner (full access)
    #[arg(long = "owner-id", env = "WARDEN_OWNER_ID")]
    pub owner_id: i64,

    /// Additional authorized user ids (repeat or comma-separate)
    #[arg(long = "user-id", env = "WARDEN_USER_IDS", value_delimiter = ',')]
    pub user_ids: Vec<i64>,

    /// Working directory of the managed process [default: ~/Heroku-dev]
    #[arg(long, env = "WARDEN_WORKDIR")]
    pub workdir: Option<PathBuf>,

    /// Interpreter used to launch the managed process
    #[arg(long, env = "WARDEN_PYTHON", default_value = "python3")]
    pub python: PathBuf,

    /// Module run by the interpreter
    #[arg(long, env = "WARDEN_MODULE", default_value = "heroku")]
    pub module: String,

    /// Flag passed to the module
    #[arg(
        long = "launch-flag",
        env = "WARDEN_LAUNCH_FLAG",
        default_value = "--no-web",
        allow_hyphen_values = true
    )]
    pub launch_flag: String,

    /// Proxy relay binary used by `/start_userbot proxy`
    #[arg(long, env = "WARDEN_RELAY", default_value = "/usr/bin/proxychains")]
    pub relay: PathBuf,

    /// Static log file for `/logs` [default: <workdir>/heroku.log]
    #[arg(long = "log-file", env = "WARDEN_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Output file streamed to debug chats [default: <workdir>/userbot_output.log]
    #[arg(long = "tail-file", env = "WARDEN_TAIL_FILE")]
    pub tail_file: Option<PathBuf>,

    /// PATH given to the managed process [default: system dirs plus the interpreter's dir]
    #[arg(long = "path-override", env = "WARDEN_PATH")]
    pub path_override: Option<String>,

    /// Package upgraded by `/update_heroku`
    #[arg(long, env = "WARDEN_PACKAGE", default_value = "heroku-tl-new")]
    pub package: String,

    /// Persist authorized users and debug chats to this JSON file
    #[arg(long = "state-file", env = "WARDEN_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Give up reconnecting after this many attempts [default: never]
    #[arg(long = "max-retries", env = "WARDEN_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Bot API base URL
    #[arg(long = "api-url", env = "WARDEN_API_URL", default_value = "https://api.telegram.org")]
    pub api_url: String,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
