//! Command-line front end for the Pincho notification API.

pub mod config_cmd;
pub mod exit_code;
pub mod notifai_cmd;
pub mod output;
pub mod send_cmd;
pub mod settings;

use anyhow::Context;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use pincho_client::CancellationToken;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;

use crate::config_cmd::ConfigCli;
use crate::exit_code::CliError;
use crate::notifai_cmd::NotifAiArgs;
use crate::send_cmd::SendArgs;
use crate::settings::FlagOverrides;

/// Send push notifications via Pincho.
#[derive(Debug, Parser)]
#[command(name = "pincho", version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// API token (env: PINCHO_TOKEN).
    #[arg(long, short = 't', global = true)]
    pub token: Option<String>,

    /// Enable debug logging on stderr.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Per-request timeout in seconds (env: PINCHO_TIMEOUT).
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Retries after the first attempt (env: PINCHO_MAX_RETRIES).
    #[arg(long, global = true, value_name = "N")]
    pub max_retries: Option<u32>,
}

impl GlobalArgs {
    pub fn overrides(&self) -> FlagOverrides {
        FlagOverrides {
            token: self.token.clone(),
            timeout: self.timeout,
            max_retries: self.max_retries,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Send(SendArgs),

    #[command(name = "notifai")]
    NotifAi(NotifAiArgs),

    Config(ConfigCli),

    /// Print version, commit and build date.
    Version,
}

/// Run the parsed command to completion. `cancel` fires on Ctrl-C.
pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<(), CliError> {
    match cli.command {
        Command::Send(args) => send_cmd::run_send(args, &cli.global, cancel).await,
        Command::NotifAi(args) => notifai_cmd::run_notifai(args, &cli.global, cancel).await,
        Command::Config(config) => config_cmd::run_config(config),
        Command::Version => {
            println!("{}", version_info());
            Ok(())
        }
    }
}

pub fn version_info() -> String {
    format!(
        "pincho version {}\ncommit: {}\nbuilt: {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("PINCHO_GIT_COMMIT").unwrap_or("unknown"),
        option_env!("PINCHO_BUILD_DATE").unwrap_or("unknown"),
    )
}

/// All of stdin, lines joined with `\n`.
pub(crate) async fn read_stdin() -> anyhow::Result<String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut collected = Vec::new();
    while let Some(line) = lines.next_line().await.context("failed to read from stdin")? {
        collected.push(line);
    }
    Ok(collected.join("\n"))
}
