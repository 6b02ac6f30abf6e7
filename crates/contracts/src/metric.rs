//! Metric - a single measurement handed between pipeline stages

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Nanoseconds since the Unix epoch
pub type Nanotime = i64;

/// Key/value tags attached to metrics and events.
///
/// Ordered so that two equal tag sets always render the same key.
pub type Tags = BTreeMap<String, String>;

/// Completion callback carried by a metric.
///
/// Invoked by the consumer once the metric has been fully processed, which
/// lets producers apply backpressure on unacknowledged work.
pub type DoneFunc = Arc<dyn Fn() + Send + Sync>;

/// Render tags into a stable grouping key (`k1:v1,k2:v2`)
pub fn tags_key(tags: &Tags) -> String {
    let mut key = String::new();
    for (i, (k, v)) in tags.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        key.push_str(k);
        key.push(':');
        key.push_str(v);
    }
    key
}

/// Metric kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Counter,
    Gauge,
    Timer,
    Set,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Timer => "timer",
            Self::Set => "set",
        };
        f.write_str(s)
    }
}

/// A single named, timestamped measurement
#[derive(Clone, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name
    pub name: String,

    /// Numeric value (unused for sets)
    pub value: f64,

    /// Set member (only meaningful for `MetricType::Set`)
    #[serde(default)]
    pub string_value: String,

    /// Metric kind
    pub metric_type: MetricType,

    /// Tags
    #[serde(default)]
    pub tags: Tags,

    /// Sample rate in (0, 1]
    #[serde(default = "default_rate")]
    pub rate: f64,

    /// Observation time
    #[serde(default)]
    pub timestamp: Nanotime,

    /// Originating host
    #[serde(default)]
    pub source: String,

    /// Completion callback, never serialized
    #[serde(skip)]
    pub done: Option<DoneFunc>,
}

fn default_rate() -> f64 {
    1.0
}

impl Metric {
    /// Create a metric of the given kind with no tags and rate 1.0
    pub fn new(name: impl Into<String>, value: f64, metric_type: MetricType) -> Self {
        Self {
            name: name.into(),
            value,
            string_value: String::new(),
            metric_type,
            tags: Tags::new(),
            rate: 1.0,
            timestamp: 0,
            source: String::new(),
            done: None,
        }
    }

    pub fn counter(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value, MetricType::Counter)
    }

    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value, MetricType::Gauge)
    }

    pub fn timer(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value, MetricType::Timer)
    }

    /// Create a set metric observing `member`
    pub fn set(name: impl Into<String>, member: impl Into<String>) -> Self {
        let mut m = Self::new(name, 0.0, MetricType::Set);
        m.string_value = member.into();
        m
    }

    /// Add or overwrite a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_timestamp(mut self, timestamp: Nanotime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Attach a completion callback
    pub fn with_done(mut self, done: DoneFunc) -> Self {
        self.done = Some(done);
        self
    }

    /// Signal that this metric has been fully processed.
    ///
    /// The callback is taken, so it fires at most once per metric value.
    pub fn done(&mut self) {
        if let Some(done) = self.done.take() {
            done();
        }
    }

    /// Drop the completion callback without invoking it
    pub fn clear_done(&mut self) {
        self.done = None;
    }

    pub fn has_done(&self) -> bool {
        self.done.is_some()
    }

    /// Grouping key of this metric's tags
    pub fn tags_key(&self) -> String {
        tags_key(&self.tags)
    }
}

impl PartialEq for Metric {
    fn eq(&self, other: &Self) -> bool {
        let done_eq = match (&self.done, &other.done) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        done_eq
            && self.name == other.name
            && self.value == other.value
            && self.string_value == other.string_value
            && self.metric_type == other.metric_type
            && self.tags == other.tags
            && self.rate == other.rate
            && self.timestamp == other.timestamp
            && self.source == other.source
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("string_value", &self.string_value)
            .field("metric_type", &self.metric_type)
            .field("tags", &self.tags)
            .field("rate", &self.rate)
            .field("timestamp", &self.timestamp)
            .field("source", &self.source)
            .field("done", &self.done.as_ref().map(|_| "DoneFunc"))
            .finish()
    }
}
