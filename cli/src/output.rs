//! Human-readable and JSON rendering of command results.

use chrono::DateTime;
use chrono::SecondsFormat;
use pincho_client::NotifAiResult;
use pincho_client::RateLimitInfo;
use pincho_client::SendResult;
use pincho_client::models::ExpiresAt;
use pincho_client::models::SendResponse;
use serde::Serialize;

pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn render_send(result: &SendResult) -> String {
    let mut lines = vec!["✓ Notification sent successfully".to_string(), String::new()];
    push_delivery(&mut lines, &result.response, true);
    push_rate_limit(&mut lines, &result.rate_limit);
    finish(lines)
}

pub fn render_notifai(result: &NotifAiResult) -> String {
    let mut lines = vec![
        "✓ AI-generated notification sent successfully".to_string(),
        String::new(),
    ];

    if let Some(summary) = &result.response.summary {
        lines.push("AI Summary:".to_string());
        lines.push(format!("  Title: {}", summary.title));
        if !summary.message.is_empty() {
            lines.push(format!("  Message: {}", summary.message));
        }
        if !summary.tags.is_empty() {
            lines.push(format!("  Tags: {}", summary.tags.join(", ")));
        }
        if let Some(action_url) = summary.action_url.as_deref().filter(|u| !u.is_empty()) {
            lines.push(format!("  Action URL: {action_url}"));
        }
        lines.push(String::new());
    }

    push_delivery(&mut lines, &result.response.send, false);
    push_rate_limit(&mut lines, &result.rate_limit);
    finish(lines)
}

/// Team fan-out or the single stored notification.
fn push_delivery(lines: &mut Vec<String>, response: &SendResponse, detailed: bool) {
    if let Some(team_id) = response.team_id.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("Team: {team_id}"));
        lines.push(format!(
            "Members notified: {}",
            response.member_count.unwrap_or_default()
        ));
        return;
    }

    let Some(notification) = &response.received_notification else {
        return;
    };
    lines.push(format!("Notification ID: {}", notification.notification_id));
    if detailed {
        lines.push(format!("Title: {}", notification.title));
        if !notification.body.is_empty() {
            lines.push(format!("Message: {}", notification.body));
        }
        if !notification.notification_type.is_empty() {
            lines.push(format!("Type: {}", notification.notification_type));
        }
        if !notification.tags.is_empty() {
            lines.push(format!("Tags: {}", notification.tags.join(", ")));
        }
    }
    if let Some(expires) = format_expiry(notification.expires_at) {
        lines.push(format!("Expires: {expires}"));
    }
}

fn push_rate_limit(lines: &mut Vec<String>, info: &RateLimitInfo) {
    let Some(limit) = info.limit else {
        return;
    };
    let remaining = info
        .remaining
        .map_or_else(|| "?".to_string(), |r| r.to_string());
    let mut line = format!("Rate Limit: {remaining}/{limit} remaining");
    let reset = info
        .reset_unix()
        .and_then(|secs| format_unix(secs, 0))
        .or_else(|| info.reset.clone());
    if let Some(reset) = reset {
        line.push_str(&format!(" (resets at {reset})"));
    }
    lines.push(String::new());
    lines.push(line);
}

fn format_expiry(expires_at: ExpiresAt) -> Option<String> {
    if expires_at.seconds <= 0 {
        return None;
    }
    format_unix(expires_at.seconds, expires_at.nanoseconds)
}

/// RFC 3339 in UTC, second precision.
fn format_unix(seconds: i64, nanoseconds: i64) -> Option<String> {
    let nanos = u32::try_from(nanoseconds).unwrap_or_default();
    DateTime::from_timestamp(seconds, nanos).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn finish(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
