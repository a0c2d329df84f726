// Source domain model - logical telemetry feeds and the outcome of fetching one
use super::selection::EventType;
use super::series::SeriesBinding;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Stable identifier of one logical telemetry feed ("processing-stats", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered feed. Immutable once the registry is built.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub id: SourceId,
    /// URL template; `${name}` placeholders are filled at resolve time
    pub url: String,
    /// Static query parameters appended to every request
    pub params: BTreeMap<String, String>,
    /// Event type whose selected index is sent as `index`
    pub selector: Option<EventType>,
    /// Chart series fed from this source's payload
    pub series: Vec<SeriesBinding>,
    /// Payload carries `num_<event>` counts bounding the selectors
    pub reports_counts: bool,
}

impl SourceDescriptor {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: SourceId::new(id),
            url: url.into(),
            params: BTreeMap::new(),
            selector: None,
            series: Vec::new(),
            reports_counts: false,
        }
    }

    pub fn with_selector(mut self, event_type: EventType) -> Self {
        self.selector = Some(event_type);
        self
    }

    pub fn with_series(mut self, binding: SeriesBinding) -> Self {
        self.series.push(binding);
        self
    }

    pub fn reporting_counts(mut self) -> Self {
        self.reports_counts = true;
        self
    }
}

/// One GET, fully resolved against the current selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub source: SourceId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success { payload: Value },
    Failure { reason: String },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

/// Outcomes of one polling cycle, keyed by source
pub type TickResult = HashMap<SourceId, FetchOutcome>;
