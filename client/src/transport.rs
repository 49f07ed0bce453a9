//! HTTP transport seam.
//!
//! The executor talks to a [`Transport`] so tests can script responses and
//! count attempts without a socket. [`ReqwestTransport`] is the production
//! implementation.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use std::time::Duration;
use thiserror::Error;

use crate::error::BoxError;

/// One fully-buffered POST. The body is immutable and cheap to clone, so
/// every attempt resends the same bytes.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub timeout: Duration,
    body: Bytes,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>, headers: HeaderMap, body: Bytes, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers,
            timeout,
            body,
        }
    }

    /// A fresh handle to the body for the next attempt.
    pub fn body(&self) -> Bytes {
        self.body.clone()
    }
}

/// Fully-read response. Reading the body to the end lets the connection be
/// reused before a retry.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Header value as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),
    #[error("request timed out: {0}")]
    Timeout(#[source] BoxError),
    #[error("failed to read response body: {0}")]
    Body(#[source] BoxError),
    #[error("request failed: {0}")]
    Request(#[source] BoxError),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(Box::new(err))
        } else if err.is_connect() {
            Self::Connect(Box::new(err))
        } else if err.is_body() || err.is_decode() {
            Self::Body(Box::new(err))
        } else {
            Self::Request(Box::new(err))
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Request(Box::new(e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .post(&request.url)
            .headers(request.headers.clone())
            .timeout(request.timeout)
            .body(request.body())
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(Box::new(e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
