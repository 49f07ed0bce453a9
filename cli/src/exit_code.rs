//! Exit-code contract and the error type that carries it.
//!
//! - 0: success
//! - 1: usage error (bad input, missing or rejected token)
//! - 2: API error (remote validation, rate limit, server fault)
//! - 3: system error (network, I/O, anything unexpected)

use pincho_client::ErrorKind;
use pincho_client::Origin;
use pincho_client::PinchoError;
use pincho_client::crypto::CryptoError;

use crate::settings::SettingsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Usage = 1,
    Api = 2,
    System = 3,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

/// Endpoint a failure came from. Selects the rate-limit hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Send,
    NotifAi,
}

impl Endpoint {
    fn name(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::NotifAi => "notifai",
        }
    }

    fn hourly_limit(self) -> u32 {
        match self {
            Self::Send => 30,
            Self::NotifAi => 50,
        }
    }
}

const TOKEN_HINT: &str = "Get your token: Open Pincho app → Settings → Help → Copy token\nOr set it: pincho config set token YOUR_TOKEN";
const NETWORK_HINT: &str = "Please check your internet connection and try again.";

/// Terminal error of a command: a headline, an optional cause, and the exit
/// code the process should end with.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CliError {
    pub code: ExitCode,
    pub message: String,
    pub cause: Option<String>,
}

impl CliError {
    pub fn new(code: ExitCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(ExitCode::Usage, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(ExitCode::System, message)
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Map a client failure onto the exit-code contract, adding the hint a
    /// user needs to act on it.
    pub fn from_api(err: &PinchoError, endpoint: Endpoint) -> Self {
        match err.kind() {
            ErrorKind::Validation => {
                let code = match err.origin().unwrap_or(Origin::Local) {
                    Origin::Local => ExitCode::Usage,
                    Origin::Remote => ExitCode::Api,
                };
                Self::new(code, "Invalid input").with_cause(err.to_string())
            }
            ErrorKind::Authentication => Self::usage("Authentication failed")
                .with_cause(format!("{err}\n\n{TOKEN_HINT}")),
            ErrorKind::RateLimit => Self::new(ExitCode::Api, "Rate limit exceeded").with_cause(
                format!(
                    "{err}\n\nThe {} endpoint allows {} requests per hour. Please wait before trying again.",
                    endpoint.name(),
                    endpoint.hourly_limit()
                ),
            ),
            ErrorKind::Server => Self::new(ExitCode::Api, "Server error").with_cause(err.to_string()),
            ErrorKind::Network if caused_by_crypto(err) => {
                Self::system("Encryption failed").with_cause(err.to_string())
            }
            ErrorKind::Network => {
                Self::system("Network error").with_cause(format!("{err}\n\n{NETWORK_HINT}"))
            }
        }
    }

    /// Text written to stderr.
    pub fn render(&self) -> String {
        match &self.cause {
            Some(cause) => format!("Error: {}\nCause: {cause}\n", self.message),
            None => format!("Error: {}\n", self.message),
        }
    }
}

fn caused_by_crypto(err: &PinchoError) -> bool {
    std::error::Error::source(err).is_some_and(|source| source.is::<CryptoError>())
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        if err.is_user_error() {
            Self::usage("Invalid configuration").with_cause(err.to_string())
        } else {
            Self::system("Configuration error").with_cause(err.to_string())
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::system("Unexpected error").with_cause(format!("{err:#}"))
    }
}
