//! Error taxonomy for the Pincho request pipeline.
//!
//! Every failure the pipeline can observe ends up as exactly one
//! [`PinchoError`] variant. Retryability is a property of the variant, never
//! of an individual value, so the retry decision is a total function over
//! five cases.

use thiserror::Error;

use crate::models::ErrorEnvelope;

/// Crate result type alias.
pub type Result<T> = std::result::Result<T, PinchoError>;

/// Boxed cause carried by network errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Category of a [`PinchoError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    RateLimit,
    Server,
    Network,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::RateLimit => "rate_limit",
            Self::Server => "server",
            Self::Network => "network",
        }
    }

    pub fn is_retryable(self) -> bool {
        match self {
            Self::Validation | Self::Authentication => false,
            Self::RateLimit | Self::Server | Self::Network => true,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a validation failure was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Rejected by local checks before any network traffic.
    Local,
    /// Rejected by the API.
    Remote,
}

/// Pincho client error taxonomy.
#[derive(Debug, Error)]
pub enum PinchoError {
    /// Malformed or missing request fields (400/404-class). Never retried.
    #[error("{}", render_validation(.message, .param.as_deref(), .code.as_deref()))]
    Validation {
        message: String,
        param: Option<String>,
        code: Option<String>,
        status: u16,
        origin: Origin,
    },

    /// Credential missing or rejected (401/403-class). Never retried.
    #[error("{message}")]
    Authentication { message: String, status: u16 },

    /// Quota exceeded (429). Always retried.
    #[error("{}", render_rate_limit(.message, .retry_after))]
    RateLimit {
        message: String,
        /// Seconds the server asked us to wait, if it said.
        retry_after: Option<u64>,
    },

    /// Backend fault (5xx). Always retried.
    #[error("{message}")]
    Server { message: String, status: u16 },

    /// Transport failure, cancellation, or retry exhaustion. Always retried.
    #[error("{}", render_network(.message, .source.as_deref()))]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

fn render_validation(message: &str, param: Option<&str>, code: Option<&str>) -> String {
    let mut rendered = message.to_string();
    if let Some(param) = param {
        rendered.push_str(&format!(" (parameter: {param})"));
    }
    if let Some(code) = code {
        rendered.push_str(&format!(" [{code}]"));
    }
    rendered
}

fn render_rate_limit(message: &str, retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(seconds) => format!("{message} (retry after {seconds} seconds)"),
        None => message.to_string(),
    }
}

fn render_network(
    message: &str,
    source: Option<&(dyn std::error::Error + Send + Sync + 'static)>,
) -> String {
    match source {
        Some(source) => format!("{message}: {source}"),
        None => message.to_string(),
    }
}

impl PinchoError {
    /// Local input error (status 400).
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            param: None,
            code: None,
            status: 400,
            origin: Origin::Local,
        }
    }

    /// Local input error naming the offending parameter and a machine code.
    pub fn validation_with_details(
        message: impl Into<String>,
        param: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            param: Some(param.into()),
            code: Some(code.into()),
            status: 400,
            origin: Origin::Local,
        }
    }

    /// Validation rejection reported by the API.
    pub fn rejected(
        status: u16,
        message: impl Into<String>,
        param: Option<String>,
        code: Option<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            param: param.filter(|p| !p.is_empty()),
            code: code.filter(|c| !c.is_empty()),
            status,
            origin: Origin::Remote,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::authentication_with_status(message, 401)
    }

    pub fn authentication_with_status(message: impl Into<String>, status: u16) -> Self {
        Self::Authentication {
            message: message.into(),
            status,
        }
    }

    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after: retry_after.filter(|s| *s > 0),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::server_with_status(message, 500)
    }

    pub fn server_with_status(message: impl Into<String>, status: u16) -> Self {
        Self::Server {
            message: message.into(),
            status,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    pub fn network_with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::Server { .. } => ErrorKind::Server,
            Self::Network { .. } => ErrorKind::Network,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// HTTP-equivalent status. Pure network faults report 0.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { status, .. }
            | Self::Authentication { status, .. }
            | Self::Server { status, .. } => *status,
            Self::RateLimit { .. } => 429,
            Self::Network { .. } => 0,
        }
    }

    /// Message without the parameter/code/retry decorations of `Display`.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::Authentication { message, .. }
            | Self::RateLimit { message, .. }
            | Self::Server { message, .. }
            | Self::Network { message, .. } => message,
        }
    }

    pub fn param(&self) -> Option<&str> {
        match self {
            Self::Validation { param, .. } => param.as_deref(),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Validation { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// `Some` only for validation errors.
    pub fn origin(&self) -> Option<Origin> {
        match self {
            Self::Validation { origin, .. } => Some(*origin),
            _ => None,
        }
    }

    /// Classify an HTTP failure (status ≥ 400).
    ///
    /// Uses the nested error envelope when it parses and carries a message;
    /// otherwise falls back to the status range with the raw body as message.
    pub fn from_response(status: u16, retry_after: Option<&str>, body: &[u8]) -> Self {
        let retry_after = retry_after.and_then(crate::backoff::parse_retry_after);

        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body)
            && !envelope.error.message.is_empty()
        {
            let details = envelope.error;
            return match status {
                401 | 403 => Self::authentication_with_status(details.message, status),
                429 => Self::rate_limit(details.message, retry_after),
                500.. => Self::server_with_status(details.message, status),
                _ => Self::rejected(status, details.message, details.param, details.code),
            };
        }

        let raw = String::from_utf8_lossy(body);
        match status {
            400 | 404 => Self::rejected(status, format!("validation error: {raw}"), None, None),
            401 | 403 => {
                Self::authentication_with_status(format!("authentication error: {raw}"), status)
            }
            429 => Self::rate_limit(format!("rate limit exceeded: {raw}"), retry_after),
            500.. => Self::server_with_status(format!("server error: {raw}"), status),
            _ => Self::rejected(status, format!("API error ({status}): {raw}"), None, None),
        }
    }
}
