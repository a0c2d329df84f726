// Rolling time-series domain models backing the chart
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

pub const DEFAULT_SERIES_CAPACITY: usize = 10;

/// Payload field preferred for a point's label
pub const LABEL_FIELD: &str = "last_updated";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// How a source payload maps onto one named series
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBinding {
    pub series: String,
    pub field: String,
    pub fallback_field: Option<String>,
}

impl SeriesBinding {
    pub fn new(series: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            field: field.into(),
            fallback_field: None,
        }
    }

    pub fn with_fallback(mut self, field: impl Into<String>) -> Self {
        self.fallback_field = Some(field.into());
        self
    }

    /// Primary field, then the fallback field, then 0.
    pub fn value_from(&self, payload: &Value) -> f64 {
        numeric_field(payload, &self.field)
            .or_else(|| {
                self.fallback_field
                    .as_deref()
                    .and_then(|field| numeric_field(payload, field))
            })
            .unwrap_or(0.0)
    }
}

fn numeric_field(payload: &Value, field: &str) -> Option<f64> {
    payload.get(field).and_then(Value::as_f64)
}

/// Label carried by the payload itself, if any
pub fn payload_label(payload: &Value) -> Option<String> {
    payload
        .get(LABEL_FIELD)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Fixed-capacity FIFO of points, oldest first
#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    points: VecDeque<SeriesPoint>,
    capacity: usize,
}

impl SeriesBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, point: SeriesPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter()
    }
}

/// What the charting boundary consumes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub series: BTreeMap<String, Vec<f64>>,
}

/// Named series buffers, kept in registration order
#[derive(Debug, Clone)]
pub struct RollingSeriesStore {
    capacity: usize,
    series: Vec<(String, SeriesBuffer)>,
}

impl RollingSeriesStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            series: Vec::new(),
        }
    }

    /// Declare a series up front so it charts (empty) before its first point.
    pub fn register(&mut self, name: &str) {
        self.buffer_mut(name);
    }

    pub fn push(&mut self, name: &str, point: SeriesPoint) {
        self.buffer_mut(name).push(point);
    }

    pub fn snapshot(&self, name: &str) -> Vec<SeriesPoint> {
        self.series
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, buffer)| buffer.points().cloned().collect())
            .unwrap_or_default()
    }

    /// Labels come from the longest series; ties go to the first registered.
    pub fn chart(&self) -> ChartData {
        let mut longest: Option<&SeriesBuffer> = None;
        for (_, buffer) in &self.series {
            if longest.is_none_or(|l| buffer.len() > l.len()) {
                longest = Some(buffer);
            }
        }

        let labels = longest
            .map(|buffer| buffer.points().map(|p| p.label.clone()).collect())
            .unwrap_or_default();

        let series = self
            .series
            .iter()
            .map(|(name, buffer)| (name.clone(), buffer.points().map(|p| p.value).collect()))
            .collect();

        ChartData { labels, series }
    }

    fn buffer_mut(&mut self, name: &str) -> &mut SeriesBuffer {
        let position = match self.series.iter().position(|(n, _)| n == name) {
            Some(position) => position,
            None => {
                self.series
                    .push((name.to_string(), SeriesBuffer::new(self.capacity)));
                self.series.len() - 1
            }
        };
        &mut self.series[position].1
    }
}
