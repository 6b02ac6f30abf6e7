//! MetricMap - pre-aggregated batch of metrics
//!
//! Groups values by kind, then name, then series (tags + source).
//! `as_metrics` flattens the map back into individual `Metric`s.

use std::collections::{BTreeMap, BTreeSet};

use crate::{Metric, MetricType, Nanotime, Tags};

/// Identity of a series within one metric name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub tags: Tags,
    /// Originating host
    pub source: String,
}

impl SeriesKey {
    fn of(metric: &Metric) -> Self {
        Self {
            tags: metric.tags.clone(),
            source: metric.source.clone(),
        }
    }
}

/// name -> series -> aggregate
pub type Bucket<T> = BTreeMap<String, BTreeMap<SeriesKey, T>>;

/// Summed counter
#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub value: f64,
    pub timestamp: Nanotime,
    pub source: String,
    pub tags: Tags,
}

/// Last observed gauge value
#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    pub value: f64,
    pub timestamp: Nanotime,
    pub source: String,
    pub tags: Tags,
}

/// Raw timer observations
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub values: Vec<f64>,
    /// Observations scaled by sample rate (`sum(1 / rate)`)
    pub sampled_count: f64,
    pub timestamp: Nanotime,
    pub source: String,
    pub tags: Tags,
}

/// Distinct set members
#[derive(Debug, Clone, PartialEq)]
pub struct Set {
    pub values: BTreeSet<String>,
    pub timestamp: Nanotime,
    pub source: String,
    pub tags: Tags,
}

trait Aggregate {
    fn merge(&mut self, other: Self);
}

impl Aggregate for Counter {
    fn merge(&mut self, other: Self) {
        self.value += other.value;
        self.timestamp = self.timestamp.max(other.timestamp);
    }
}

impl Aggregate for Gauge {
    fn merge(&mut self, other: Self) {
        if other.timestamp >= self.timestamp {
            self.value = other.value;
            self.timestamp = other.timestamp;
        }
    }
}

impl Aggregate for Timer {
    fn merge(&mut self, other: Self) {
        self.values.extend(other.values);
        self.sampled_count += other.sampled_count;
        self.timestamp = self.timestamp.max(other.timestamp);
    }
}

impl Aggregate for Set {
    fn merge(&mut self, other: Self) {
        self.values.extend(other.values);
        self.timestamp = self.timestamp.max(other.timestamp);
    }
}

fn merge_bucket<T: Aggregate>(into: &mut Bucket<T>, from: Bucket<T>) {
    for (name, series) in from {
        let target = into.entry(name).or_default();
        for (key, value) in series {
            match target.get_mut(&key) {
                Some(existing) => existing.merge(value),
                None => {
                    target.insert(key, value);
                }
            }
        }
    }
}

fn effective_rate(rate: f64) -> f64 {
    if rate > 0.0 && rate <= 1.0 {
        rate
    } else {
        1.0
    }
}

/// Pre-aggregated collection of metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricMap {
    pub counters: Bucket<Counter>,
    pub gauges: Bucket<Gauge>,
    pub timers: Bucket<Timer>,
    pub sets: Bucket<Set>,
}

impl MetricMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a single metric into the map, then signal its completion
    pub fn receive(&mut self, mut metric: Metric) {
        let key = SeriesKey::of(&metric);
        let rate = effective_rate(metric.rate);

        match metric.metric_type {
            MetricType::Counter => {
                let counter = Counter {
                    value: metric.value / rate,
                    timestamp: metric.timestamp,
                    source: metric.source.clone(),
                    tags: metric.tags.clone(),
                };
                merge_bucket(
                    &mut self.counters,
                    single(&metric.name, key, counter),
                );
            }
            MetricType::Gauge => {
                let gauge = Gauge {
                    value: metric.value,
                    timestamp: metric.timestamp,
                    source: metric.source.clone(),
                    tags: metric.tags.clone(),
                };
                merge_bucket(&mut self.gauges, single(&metric.name, key, gauge));
            }
            MetricType::Timer => {
                let timer = Timer {
                    values: vec![metric.value],
                    sampled_count: 1.0 / rate,
                    timestamp: metric.timestamp,
                    source: metric.source.clone(),
                    tags: metric.tags.clone(),
                };
                merge_bucket(&mut self.timers, single(&metric.name, key, timer));
            }
            MetricType::Set => {
                let set = Set {
                    values: BTreeSet::from([metric.string_value.clone()]),
                    timestamp: metric.timestamp,
                    source: metric.source.clone(),
                    tags: metric.tags.clone(),
                };
                merge_bucket(&mut self.sets, single(&metric.name, key, set));
            }
        }

        metric.done();
    }

    /// Fold another map into this one
    pub fn merge(&mut self, other: MetricMap) {
        merge_bucket(&mut self.counters, other.counters);
        merge_bucket(&mut self.gauges, other.gauges);
        merge_bucket(&mut self.timers, other.timers);
        merge_bucket(&mut self.sets, other.sets);
    }

    /// Number of distinct series across all kinds
    pub fn len(&self) -> usize {
        fn count<T>(bucket: &Bucket<T>) -> usize {
            bucket.values().map(BTreeMap::len).sum()
        }
        count(&self.counters) + count(&self.gauges) + count(&self.timers) + count(&self.sets)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into individual metrics.
    ///
    /// Order is counters, gauges, timers, sets; each by name then series.
    /// Returned metrics never carry a completion callback.
    pub fn as_metrics(&self) -> Vec<Metric> {
        let mut out = Vec::new();

        for (name, series) in &self.counters {
            for c in series.values() {
                out.push(
                    Metric::counter(name.as_str(), c.value)
                        .with_timestamp(c.timestamp)
                        .with_source(c.source.as_str())
                        .with_tags(&c.tags),
                );
            }
        }

        for (name, series) in &self.gauges {
            for g in series.values() {
                out.push(
                    Metric::gauge(name.as_str(), g.value)
                        .with_timestamp(g.timestamp)
                        .with_source(g.source.as_str())
                        .with_tags(&g.tags),
                );
            }
        }

        for (name, series) in &self.timers {
            for t in series.values() {
                let rate = if t.sampled_count > 0.0 {
                    t.values.len() as f64 / t.sampled_count
                } else {
                    1.0
                };
                for value in &t.values {
                    out.push(
                        Metric::timer(name.as_str(), *value)
                            .with_rate(rate)
                            .with_timestamp(t.timestamp)
                            .with_source(t.source.as_str())
                            .with_tags(&t.tags),
                    );
                }
            }
        }

        for (name, series) in &self.sets {
            for s in series.values() {
                for member in &s.values {
                    out.push(
                        Metric::set(name.as_str(), member.as_str())
                            .with_timestamp(s.timestamp)
                            .with_source(s.source.as_str())
                            .with_tags(&s.tags),
                    );
                }
            }
        }

        out
    }
}

fn single<T>(name: &str, key: SeriesKey, value: T) -> Bucket<T> {
    BTreeMap::from([(name.to_string(), BTreeMap::from([(key, value)]))])
}

impl Metric {
    fn with_tags(mut self, tags: &Tags) -> Self {
        self.tags = tags.clone();
        self
    }
}

impl FromIterator<Metric> for MetricMap {
    fn from_iter<I: IntoIterator<Item = Metric>>(iter: I) -> Self {
        let mut mm = MetricMap::new();
        mm.extend(iter);
        mm
    }
}

impl Extend<Metric> for MetricMap {
    fn extend<I: IntoIterator<Item = Metric>>(&mut self, iter: I) {
        for metric in iter {
            self.receive(metric);
        }
    }
}
