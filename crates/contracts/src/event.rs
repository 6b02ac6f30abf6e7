//! Event - discrete, non-aggregable occurrence (e.g. a deploy marker)

use serde::{Deserialize, Serialize};

use crate::{Nanotime, Tags};

/// Ordered batch of events. Insertion order is meaningful.
pub type Events = Vec<Event>;

/// Event priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    Low,
}

/// Event alert type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    #[default]
    Info,
    Warning,
    Error,
    Success,
}

/// A single event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,

    pub text: String,

    #[serde(default)]
    pub tags: Tags,

    /// When the event happened
    #[serde(default)]
    pub timestamp: Nanotime,

    #[serde(default)]
    pub hostname: String,

    /// Events sharing a key are grouped by consumers that support it
    #[serde(default)]
    pub aggregation_key: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub alert_type: AlertType,
}

impl Event {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_alert_type(mut self, alert_type: AlertType) -> Self {
        self.alert_type = alert_type;
        self
    }
}
