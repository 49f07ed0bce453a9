//! Layered CLI settings.
//!
//! Precedence, highest first:
//! 1. Command-line flags
//! 2. Environment (`PINCHO_TOKEN`, `PINCHO_API_URL`, `PINCHO_TIMEOUT`,
//!    `PINCHO_MAX_RETRIES`)
//! 3. `config.toml` in the settings directory (`$PINCHO_HOME`, else
//!    `~/.pincho`)
//! 4. Built-in defaults

use pincho_client::BackoffPolicy;
use pincho_client::ClientConfig;
use pincho_client::DEFAULT_TIMEOUT;
use pincho_client::RetryPolicy;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const HOME_ENV: &str = "PINCHO_HOME";
pub const TOKEN_ENV: &str = "PINCHO_TOKEN";
pub const API_URL_ENV: &str = "PINCHO_API_URL";
pub const TIMEOUT_ENV: &str = "PINCHO_TIMEOUT";
pub const MAX_RETRIES_ENV: &str = "PINCHO_MAX_RETRIES";

const CONFIG_DIR: &str = ".pincho";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(
        "invalid key '{0}' (supported: token, api_url, timeout, max_retries, default_type, default_tags)"
    )]
    UnknownKey(String),

    #[error("invalid value for {key}: must be an integer")]
    NotAnInteger { key: &'static str },

    #[error("invalid value for {key}: must be non-negative")]
    Negative { key: &'static str },

    #[error("invalid {var}={value:?}: expected {expected}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("could not determine home directory; set PINCHO_HOME")]
    NoHome,

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl SettingsError {
    /// Mistakes the user can fix on the command line (exit code 1).
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::UnknownKey(_)
            | Self::NotAnInteger { .. }
            | Self::Negative { .. }
            | Self::InvalidEnv { .. } => true,
            Self::NoHome
            | Self::Read { .. }
            | Self::Parse { .. }
            | Self::Write { .. }
            | Self::Serialize(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Token,
    ApiUrl,
    Timeout,
    MaxRetries,
    DefaultType,
    DefaultTags,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 6] = [
        Self::Token,
        Self::ApiUrl,
        Self::Timeout,
        Self::MaxRetries,
        Self::DefaultType,
        Self::DefaultTags,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::ApiUrl => "api_url",
            Self::Timeout => "timeout",
            Self::MaxRetries => "max_retries",
            Self::DefaultType => "default_type",
            Self::DefaultTags => "default_tags",
        }
    }
}

impl FromStr for ConfigKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| SettingsError::UnknownKey(s.to_string()))
    }
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub default_tags: Vec<String>,
}

impl FileSettings {
    /// Parse `raw` for `key` and store it.
    pub fn set(&mut self, key: ConfigKey, raw: &str) -> Result<(), SettingsError> {
        match key {
            ConfigKey::Token => self.token = Some(raw.to_string()),
            ConfigKey::ApiUrl => self.api_url = Some(raw.to_string()),
            ConfigKey::Timeout => self.timeout = Some(parse_non_negative(key.as_str(), raw)?),
            ConfigKey::MaxRetries => {
                self.max_retries = Some(parse_non_negative(key.as_str(), raw)?);
            }
            ConfigKey::DefaultType => self.default_type = Some(raw.to_string()),
            ConfigKey::DefaultTags => {
                self.default_tags = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }
        Ok(())
    }

    pub fn get(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::Token => self.token.clone(),
            ConfigKey::ApiUrl => self.api_url.clone(),
            ConfigKey::Timeout => self.timeout.map(|t| t.to_string()),
            ConfigKey::MaxRetries => self.max_retries.map(|r| r.to_string()),
            ConfigKey::DefaultType => self.default_type.clone(),
            ConfigKey::DefaultTags => {
                (!self.default_tags.is_empty()).then(|| self.default_tags.join(","))
            }
        }
    }

    /// Keys that are set, in display order.
    pub fn entries(&self) -> Vec<(ConfigKey, String)> {
        ConfigKey::ALL
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
            .collect()
    }
}

fn parse_non_negative<T: TryFrom<i64>>(key: &'static str, raw: &str) -> Result<T, SettingsError> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SettingsError::NotAnInteger { key })?;
    if value < 0 {
        return Err(SettingsError::Negative { key });
    }
    T::try_from(value).map_err(|_| SettingsError::NotAnInteger { key })
}

/// Reads and writes `config.toml`.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$PINCHO_HOME`, else `~/.pincho`.
    pub fn locate() -> Result<Self, SettingsError> {
        if let Ok(dir) = std::env::var(HOME_ENV)
            && !dir.trim().is_empty()
        {
            return Ok(Self::new(dir));
        }
        let home = dirs::home_dir().ok_or(SettingsError::NoHome)?;
        Ok(Self::new(home.join(CONFIG_DIR)))
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    /// A missing file is an empty configuration.
    pub fn load(&self) -> Result<FileSettings, SettingsError> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FileSettings::default());
            }
            Err(source) => return Err(SettingsError::Read { path, source }),
        };
        toml::from_str(&content).map_err(|source| SettingsError::Parse { path, source })
    }

    /// Write `settings`, creating the directory (0700) and file (0600).
    pub fn save(&self, settings: &FileSettings) -> Result<(), SettingsError> {
        let content = toml::to_string_pretty(settings)?;
        let write_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SettingsError::Write { path, source }
        };

        fs::create_dir_all(&self.dir).map_err(write_err(self.dir.as_path()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700))
                .map_err(write_err(self.dir.as_path()))?;
        }

        let path = self.path();
        fs::write(&path, content).map_err(write_err(path.as_path()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(write_err(path.as_path()))?;
        }

        tracing::debug!("wrote settings to {}", path.display());
        Ok(())
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagOverrides {
    pub token: Option<String>,
    pub timeout: Option<u64>,
    pub max_retries: Option<u32>,
}

/// Settings after all layers are applied.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub token: String,
    pub api_url: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub default_type: Option<String>,
    pub default_tags: Vec<String>,
}

impl std::fmt::Debug for ResolvedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSettings")
            .field("token", &pincho_client::token_prefix(&self.token))
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("default_type", &self.default_type)
            .field("default_tags", &self.default_tags)
            .finish()
    }
}

impl ResolvedSettings {
    /// Merge the layers. `env` looks up an environment variable by name.
    pub fn resolve(
        flags: &FlagOverrides,
        env: impl Fn(&str) -> Option<String>,
        file: FileSettings,
    ) -> Result<Self, SettingsError> {
        let env = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        let token = flags
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| env(TOKEN_ENV))
            .or(file.token)
            .unwrap_or_default();

        let api_url = env(API_URL_ENV).or(file.api_url.filter(|u| !u.is_empty()));

        let env_timeout = env(TIMEOUT_ENV)
            .map(|raw| parse_env::<u64>(TIMEOUT_ENV, raw, "a positive number of seconds"))
            .transpose()?;
        let timeout = flags
            .timeout
            .filter(|t| *t > 0)
            .or(env_timeout.filter(|t| *t > 0))
            .or(file.timeout.filter(|t| *t > 0))
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        let env_retries = env(MAX_RETRIES_ENV)
            .map(|raw| parse_env::<u32>(MAX_RETRIES_ENV, raw, "a non-negative integer"))
            .transpose()?;
        let max_retries = flags
            .max_retries
            .or(env_retries)
            .or(file.max_retries)
            .unwrap_or(RetryPolicy::default().max_retries);

        Ok(Self {
            token,
            api_url,
            timeout,
            max_retries,
            default_type: file.default_type.filter(|t| !t.is_empty()),
            default_tags: file.default_tags,
        })
    }

    /// Resolve against the real environment and the on-disk file.
    pub fn load(flags: &FlagOverrides) -> Result<Self, SettingsError> {
        let file = SettingsStore::locate()?.load()?;
        Self::resolve(flags, |name| std::env::var(name).ok(), file)
    }

    pub fn client_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            api_url: self.api_url.clone().unwrap_or(defaults.api_url),
            timeout: self.timeout,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                backoff: BackoffPolicy::default(),
            },
            token: self.token.clone(),
            user_agent: defaults.user_agent,
        }
    }

    /// The flag value, else the configured default type.
    pub fn notification_type(&self, flag: Option<String>) -> Option<String> {
        flag.filter(|t| !t.is_empty())
            .or_else(|| self.default_type.clone())
    }

    /// Flag tags first, then configured defaults, without repeats.
    pub fn merged_tags(&self, flag_tags: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        flag_tags
            .iter()
            .chain(&self.default_tags)
            .filter(|tag| seen.insert(tag.as_str()))
            .cloned()
            .collect()
    }
}

fn parse_env<T: FromStr>(
    var: &'static str,
    value: String,
    expected: &'static str,
) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidEnv {
            var,
            value,
            expected,
        })
}
