//! Wire and result types for the Pincho API.

use serde::Deserialize;
use serde::Serialize;

/// Parameters for one `send` call. Constructed per call and consumed by it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub title: String,
    pub message: String,
    pub notification_type: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub action_url: Option<String>,
    /// Body passphrase. Used locally for encryption, never sent.
    pub encryption_password: Option<String>,
}

impl SendOptions {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ..Default::default()
        }
    }
}

/// JSON body posted to `/send`.
#[derive(Debug, Serialize)]
pub(crate) struct NotificationPayload<'a> {
    pub title: &'a str,
    pub message: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<&'a str>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub tags: &'a [String],
    #[serde(rename = "imageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<&'a str>,
    #[serde(rename = "actionURL", skip_serializing_if = "Option::is_none")]
    pub action_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iv: Option<&'a str>,
}

/// Parameters for one `notifai` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifAiOptions {
    pub text: String,
    pub notification_type: Option<String>,
}

/// JSON body posted to `/notifai`.
#[derive(Debug, Serialize)]
pub(crate) struct NotifAiPayload<'a> {
    pub text: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<&'a str>,
}

/// Firestore-style expiry timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiresAt {
    #[serde(rename = "_seconds")]
    pub seconds: i64,
    #[serde(rename = "_nanoseconds")]
    pub nanoseconds: i64,
}

/// Notification as stored by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDetails {
    #[serde(rename = "notificationID")]
    pub notification_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    #[serde(rename = "imageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "actionURL", skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(rename = "teamId", skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(rename = "teamName", skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    #[serde(rename = "expiresAt")]
    pub expires_at: ExpiresAt,
}

/// Success envelope returned by `/send`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendResponse {
    pub status: String,
    pub message: String,
    #[serde(
        rename = "receivedNotification",
        skip_serializing_if = "Option::is_none"
    )]
    pub received_notification: Option<NotificationDetails>,
    #[serde(rename = "teamId", skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(rename = "memberCount", skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<NotificationDetails>,
}

/// AI-generated summary returned by `/notifai`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifAiSummary {
    pub title: String,
    pub message: String,
    #[serde(rename = "actionURL", skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Success envelope returned by `/notifai`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifAiResponse {
    #[serde(flatten)]
    pub send: SendResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<NotifAiSummary>,
}

/// Rate-limit headers surfaced from the final response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    /// `RateLimit-Reset` exactly as the server sent it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset: Option<String>,
}

impl RateLimitInfo {
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.remaining.is_none() && self.reset.is_none()
    }

    /// The reset value as unix seconds, when it is one.
    pub fn reset_unix(&self) -> Option<i64> {
        self.reset.as_deref().and_then(|v| v.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendResult {
    pub response: SendResponse,
    #[serde(rename = "rateLimit", skip_serializing_if = "RateLimitInfo::is_empty")]
    pub rate_limit: RateLimitInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotifAiResult {
    pub response: NotifAiResponse,
    #[serde(rename = "rateLimit", skip_serializing_if = "RateLimitInfo::is_empty")]
    pub rate_limit: RateLimitInfo,
}

/// `{"status":"error","error":{...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetails {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
}
