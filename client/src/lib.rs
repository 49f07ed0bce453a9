//! Client library for the Pincho push-notification API.
//!
//! The core is a resilient request pipeline: local validation, optional body
//! encryption compatible with the mobile apps, and a retrying executor with a
//! closed error taxonomy.

pub mod backoff;
mod client;
pub mod crypto;
pub mod error;
pub mod executor;
pub mod models;
pub mod tags;
pub mod transport;

pub use backoff::BackoffPolicy;
pub use backoff::backoff;
pub use client::ClientConfig;
pub use client::DEFAULT_API_URL;
pub use client::DEFAULT_NOTIFAI_URL;
pub use client::DEFAULT_TIMEOUT;
pub use client::DEFAULT_USER_AGENT;
pub use client::PinchoClient;
pub use client::token_prefix;
pub use error::ErrorKind;
pub use error::Origin;
pub use error::PinchoError;
pub use error::Result;
pub use executor::RetryPolicy;
pub use executor::Sleeper;
pub use executor::TokioSleeper;
pub use models::NotifAiOptions;
pub use models::NotifAiResult;
pub use models::RateLimitInfo;
pub use models::SendOptions;
pub use models::SendResult;
pub use pincho_async_utils::CancelScope;
pub use tags::normalize_tags;
pub use transport::Transport;
pub use tokio_util::sync::CancellationToken;
