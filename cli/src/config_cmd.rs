//! `pincho config`

use clap::Parser;
use clap::Subcommand;

use crate::exit_code::CliError;
use crate::settings::ConfigKey;
use crate::settings::SettingsStore;

/// Manage the configuration file.
#[derive(Debug, Parser)]
pub struct ConfigCli {
    #[command(subcommand)]
    pub cmd: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Set a value (token, api_url, timeout, max_retries, default_type, default_tags).
    Set {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Show one value. The token is masked.
    Get { key: String },

    /// Show every value that is set.
    List,
}

pub fn run_config(cli: ConfigCli) -> Result<(), CliError> {
    let store = SettingsStore::locate()?;
    let out = match cli.cmd {
        ConfigCommand::Set { key, value } => set(&store, &key, &value)?,
        ConfigCommand::Get { key } => get(&store, &key)?,
        ConfigCommand::List => list(&store)?,
    };
    print!("{out}");
    Ok(())
}

fn set(store: &SettingsStore, key: &str, value: &str) -> Result<String, CliError> {
    let key: ConfigKey = key.parse()?;
    let mut settings = store.load()?;
    settings.set(key, value)?;
    store.save(&settings)?;
    Ok(format!(
        "✓ Set {} in {}\n",
        key.as_str(),
        store.path().display()
    ))
}

fn get(store: &SettingsStore, key: &str) -> Result<String, CliError> {
    let key: ConfigKey = key.parse()?;
    let out = match store.load()?.get(key) {
        Some(value) => format!("{}: {}\n", key.as_str(), display_value(key, &value)),
        None => format!("{}: (not set)\n", key.as_str()),
    };
    Ok(out)
}

fn list(store: &SettingsStore) -> Result<String, CliError> {
    let entries = store.load()?.entries();
    if entries.is_empty() {
        return Ok(
            "No configuration set\n\nTo get started:\n  pincho config set token YOUR_TOKEN\n"
                .to_string(),
        );
    }

    let mut out = format!("Configuration from {}:\n\n", store.path().display());
    for (key, value) in entries {
        out.push_str(&format!("  {}: {}\n", key.as_str(), display_value(key, &value)));
    }
    Ok(out)
}

fn display_value(key: ConfigKey, value: &str) -> String {
    match key {
        ConfigKey::Token => mask_token(value),
        _ => value.to_string(),
    }
}

/// `abcd...wxyz` for tokens longer than eight characters.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return token.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
