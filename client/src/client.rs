//! Public Pincho client.
//!
//! Validates input locally, encrypts the body when asked, builds the wire
//! payload and hands it to the [`RequestExecutor`]. Success envelopes are
//! parsed into typed results together with the rate-limit headers.

use bytes::Bytes;
use pincho_async_utils::CancelScope;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::USER_AGENT;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::backoff::BackoffPolicy;
use crate::crypto;
use crate::crypto::IvSource;
use crate::crypto::OsIvSource;
use crate::error::PinchoError;
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::executor::RetryPolicy;
use crate::executor::Sleeper;
use crate::executor::TokioSleeper;
use crate::models::NotifAiOptions;
use crate::models::NotifAiPayload;
use crate::models::NotifAiResponse;
use crate::models::NotifAiResult;
use crate::models::NotificationPayload;
use crate::models::RateLimitInfo;
use crate::models::SendOptions;
use crate::models::SendResponse;
use crate::models::SendResult;
use crate::tags::normalize_tags;
use crate::transport::HttpRequest;
use crate::transport::HttpResponse;
use crate::transport::ReqwestTransport;
use crate::transport::Transport;

pub const DEFAULT_API_URL: &str = "https://api.pincho.app/send";
pub const DEFAULT_NOTIFAI_URL: &str = "https://api.pincho.app/notifai";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("pincho-cli/", env!("CARGO_PKG_VERSION"));

pub const NOTIFAI_MIN_TEXT_LEN: usize = 5;
pub const NOTIFAI_MAX_TEXT_LEN: usize = 2500;

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    /// Per-attempt HTTP timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub token: String,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            token: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("token", &token_prefix(&self.token))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// The NotifAI endpoint that pairs with `api_url`.
    pub fn notifai_url(&self) -> String {
        if self.api_url == DEFAULT_API_URL {
            DEFAULT_NOTIFAI_URL.to_string()
        } else {
            self.api_url.replacen("/send", "/notifai", 1)
        }
    }
}

/// At most the first eight characters, for logs.
pub fn token_prefix(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    if prefix.len() < token.len() {
        format!("{prefix}...")
    } else {
        prefix
    }
}

pub struct PinchoClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    iv_source: Arc<dyn IvSource>,
}

impl std::fmt::Debug for PinchoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinchoClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PinchoClient {
    /// Client with default settings for `token`.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig {
            token: token.into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new()
            .map_err(|e| PinchoError::network_with_source("failed to initialise HTTP client", e))?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
            sleeper: Arc::new(TokioSleeper),
            iv_source: Arc::new(OsIvSource),
        })
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_iv_source(mut self, iv_source: Arc<dyn IvSource>) -> Self {
        self.iv_source = iv_source;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Zero is ignored.
    pub fn set_timeout(&mut self, timeout: Duration) {
        if !timeout.is_zero() {
            self.config.timeout = timeout;
        }
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.config.token = token.into();
    }

    /// A zero `initial_backoff` keeps the current unit.
    pub fn set_retry_config(&mut self, max_retries: u32, initial_backoff: Duration) {
        self.config.retry.max_retries = max_retries;
        if !initial_backoff.is_zero() {
            self.config.retry.backoff = BackoffPolicy::new(initial_backoff);
        }
    }

    pub fn set_api_url(&mut self, api_url: impl Into<String>) {
        self.config.api_url = api_url.into();
    }

    pub async fn send(&self, options: SendOptions) -> Result<SendResult> {
        self.send_with_cancel(options, &CancelScope::default()).await
    }

    /// Send a notification, stopping early if `scope` is cancelled or expires.
    pub async fn send_with_cancel(
        &self,
        options: SendOptions,
        scope: &CancelScope,
    ) -> Result<SendResult> {
        if options.title.is_empty() {
            return Err(PinchoError::validation_with_details(
                "title is required",
                "title",
                "missing_title",
            ));
        }
        self.require_token()?;
        let tags = normalize_tags(&options.tags).map_err(|e| {
            PinchoError::validation_with_details(
                format!("tag validation failed: {e}"),
                "tags",
                "invalid_tags",
            )
        })?;

        let encrypted = match non_empty(options.encryption_password.as_deref()) {
            Some(passphrase) if !options.message.is_empty() => {
                let encrypted = crypto::encrypt_with_fresh_iv(
                    &options.message,
                    passphrase,
                    self.iv_source.as_ref(),
                )
                .map_err(|e| PinchoError::network_with_source("failed to encrypt message", e))?;
                debug!("message body encrypted");
                Some(encrypted)
            }
            _ => None,
        };

        let payload = NotificationPayload {
            title: &options.title,
            message: encrypted
                .as_ref()
                .map_or(options.message.as_str(), |e| e.ciphertext.as_str()),
            notification_type: non_empty(options.notification_type.as_deref()),
            tags: &tags,
            image_url: non_empty(options.image_url.as_deref()),
            action_url: non_empty(options.action_url.as_deref()),
            iv: encrypted.as_ref().map(|e| e.iv_hex.as_str()),
        };

        let response = self.post(&self.config.api_url, &payload, scope).await?;
        Ok(SendResult {
            rate_limit: rate_limit_info(&response),
            response: parse_success::<SendResponse>(&response)?,
        })
    }

    pub async fn notifai(&self, options: NotifAiOptions) -> Result<NotifAiResult> {
        self.notifai_with_cancel(options, &CancelScope::default()).await
    }

    /// Ask the API to turn free-form text into a notification.
    pub async fn notifai_with_cancel(
        &self,
        options: NotifAiOptions,
        scope: &CancelScope,
    ) -> Result<NotifAiResult> {
        let text = options.text.as_str();
        if text.is_empty() {
            return Err(PinchoError::validation_with_details(
                "text is required",
                "text",
                "missing_text",
            ));
        }
        if text.len() < NOTIFAI_MIN_TEXT_LEN {
            return Err(PinchoError::validation_with_details(
                format!("text must be at least {NOTIFAI_MIN_TEXT_LEN} characters"),
                "text",
                "text_too_short",
            ));
        }
        if text.len() > NOTIFAI_MAX_TEXT_LEN {
            return Err(PinchoError::validation_with_details(
                format!("text must not exceed {NOTIFAI_MAX_TEXT_LEN} characters"),
                "text",
                "text_too_long",
            ));
        }
        self.require_token()?;

        let payload = NotifAiPayload {
            text,
            notification_type: non_empty(options.notification_type.as_deref()),
        };
        let url = self.config.notifai_url();

        let response = self.post(&url, &payload, scope).await?;
        Ok(NotifAiResult {
            rate_limit: rate_limit_info(&response),
            response: parse_success::<NotifAiResponse>(&response)?,
        })
    }

    fn require_token(&self) -> Result<()> {
        if self.config.token.trim().is_empty() {
            return Err(PinchoError::authentication("API token is required"));
        }
        Ok(())
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.token))
            .map_err(|_| PinchoError::authentication("API token contains invalid characters"))?;
        headers.insert(AUTHORIZATION, bearer);
        let user_agent = HeaderValue::from_str(&self.config.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(USER_AGENT, user_agent);
        Ok(headers)
    }

    async fn post<P: Serialize>(
        &self,
        url: &str,
        payload: &P,
        scope: &CancelScope,
    ) -> Result<HttpResponse> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| PinchoError::network_with_source("failed to encode request", e))?;
        let request = HttpRequest::new(
            url,
            self.headers()?,
            Bytes::from(body),
            self.config.timeout,
        );

        debug!(
            url,
            token = %token_prefix(&self.config.token),
            max_retries = self.config.retry.max_retries,
            "posting notification"
        );
        RequestExecutor::new(
            self.transport.as_ref(),
            self.sleeper.as_ref(),
            self.config.retry,
        )
        .execute(&request, scope)
        .await
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_success<T: DeserializeOwned + Default>(response: &HttpResponse) -> Result<T> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&response.body)
        .map_err(|e| PinchoError::network_with_source("failed to parse response", e))
}

fn rate_limit_info(response: &HttpResponse) -> RateLimitInfo {
    let number = |name: &str| response.header(name).and_then(|v| v.trim().parse().ok());
    RateLimitInfo {
        limit: number("RateLimit-Limit"),
        remaining: number("RateLimit-Remaining"),
        reset: response
            .header("RateLimit-Reset")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned),
    }
}
