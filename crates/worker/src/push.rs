//! Push notifications.
//!
//! A push payload becomes a notification description; showing it is up to
//! the host. A click always closes the notification, and the `explore`
//! action additionally opens the app root.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const ICON: &str = "/icon-192x192.png";
const BADGE: &str = "/badge-72x72.png";
const VIBRATE: [u32; 3] = [100, 50, 100];

pub const EXPLORE_ACTION: &str = "explore";
pub const CLOSE_ACTION: &str = "close";

/// Page opened by the `explore` action.
pub const APP_ROOT: &str = "/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PushPayload {
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Opaque key identifying what the push is about.
    #[serde(rename = "primaryKey", default)]
    pub primary_key: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

fn action(action: &str, title: &str) -> NotificationAction {
    NotificationAction { action: action.into(), title: title.into(), icon: ICON.into() }
}

pub fn notification_for(payload: PushPayload) -> Notification {
    Notification {
        title: payload.title,
        body: payload.body,
        icon: ICON.into(),
        badge: BADGE.into(),
        vibrate: VIBRATE.to_vec(),
        data: NotificationData { date_of_arrival: Utc::now().timestamp_millis(), primary_key: payload.primary_key },
        actions: vec![action(EXPLORE_ACTION, "View Details"), action(CLOSE_ACTION, "Close")],
    }
}

/// Handle a push event. A push without data shows nothing.
pub fn on_push(payload: Option<PushPayload>) -> Option<Notification> {
    let Some(payload) = payload else {
        tracing::debug!("push without data ignored");
        return None;
    };
    tracing::info!(title = %payload.title, "showing push notification");
    Some(notification_for(payload))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClickOutcome {
    pub closed: bool,
    /// Window to open, if any.
    pub open: Option<String>,
}

pub fn on_notification_click(action: Option<&str>) -> ClickOutcome {
    let open = (action == Some(EXPLORE_ACTION)).then(|| APP_ROOT.to_string());
    tracing::debug!(?action, ?open, "notification clicked");
    ClickOutcome { closed: true, open }
}
