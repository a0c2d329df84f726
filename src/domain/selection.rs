// Event selector state - operator-chosen 1-based index per event type
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A paginated event feed on the analyzer ("drone_position", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Count fields the stats payloads use for this type, most specific first.
    /// The analyzer reports `num_drone_position`, processing `num_drone_positions`.
    pub fn count_fields(&self) -> [String; 2] {
        [format!("num_{}", self.0), format!("num_{}s", self.0)]
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("unknown event type `{0}`")]
    UnknownEventType(String),
    #[error("index must be a positive 1-based integer")]
    ZeroIndex,
    #[error("no `{0}` events are available yet")]
    NoEvents(String),
    #[error("index {index} is out of range 1..={count} for `{event_type}`")]
    OutOfRange {
        event_type: String,
        index: u32,
        count: u32,
    },
}

/// One selector: the chosen index and the last known event count.
/// `count == None` means no stats have arrived yet, so any positive index is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub selected: Option<u32>,
    pub count: Option<u32>,
}

impl Selector {
    fn new() -> Self {
        Self {
            selected: Some(1),
            count: None,
        }
    }

    /// Selectable indices, exactly `1..=count`; None until some event exists.
    pub fn options(&self) -> Option<IndexRange> {
        self.count
            .filter(|count| *count > 0)
            .map(|last| IndexRange { first: 1, last })
    }
}

/// Inclusive bounds of the selectable indices, never built out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexRange {
    pub first: u32,
    pub last: u32,
}

impl IndexRange {
    pub fn contains(&self, index: u32) -> bool {
        (self.first..=self.last).contains(&index)
    }
}

/// Selected 1-based index per event type, frozen for one tick
pub type SelectionSnapshot = BTreeMap<EventType, u32>;

#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    selectors: BTreeMap<EventType, Selector>,
}

impl SelectionState {
    pub fn new(event_types: impl IntoIterator<Item = EventType>) -> Self {
        Self {
            selectors: event_types
                .into_iter()
                .map(|event_type| (event_type, Selector::new()))
                .collect(),
        }
    }

    pub fn select(&mut self, event_type: &EventType, index: u32) -> Result<(), SelectionError> {
        let selector = self
            .selectors
            .get_mut(event_type)
            .ok_or_else(|| SelectionError::UnknownEventType(event_type.to_string()))?;

        if index == 0 {
            return Err(SelectionError::ZeroIndex);
        }
        if selector.count == Some(0) {
            return Err(SelectionError::NoEvents(event_type.to_string()));
        }
        if let Some(range) = selector.options() {
            if !range.contains(index) {
                return Err(SelectionError::OutOfRange {
                    event_type: event_type.to_string(),
                    index,
                    count: range.last,
                });
            }
        }

        selector.selected = Some(index);
        Ok(())
    }

    pub fn selectors(&self) -> impl Iterator<Item = (&EventType, &Selector)> {
        self.selectors.iter()
    }

    /// Regenerate the bound for one event type; the selection is clamped into it.
    pub fn update_count(&mut self, event_type: &EventType, count: u32) {
        let Some(selector) = self.selectors.get_mut(event_type) else {
            return;
        };
        if selector.count == Some(count) {
            return;
        }

        selector.count = Some(count);
        selector.selected = match (selector.selected, count) {
            (_, 0) => None,
            (None, _) => Some(1),
            (Some(index), count) if index > count => {
                tracing::info!(
                    event_type = %event_type,
                    index,
                    count,
                    "selection clamped to new event count"
                );
                Some(count)
            }
            (selected, _) => selected,
        };
    }

    /// Pick up every count a stats payload reports.
    pub fn refresh_counts(&mut self, payload: &Value) {
        let updates: Vec<(EventType, u32)> = self
            .selectors
            .keys()
            .filter_map(|event_type| {
                event_type
                    .count_fields()
                    .iter()
                    .find_map(|field| payload.get(field).and_then(Value::as_u64))
                    .map(|count| (event_type.clone(), u32::try_from(count).unwrap_or(u32::MAX)))
            })
            .collect();

        for (event_type, count) in updates {
            self.update_count(&event_type, count);
        }
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        self.selectors
            .iter()
            .filter_map(|(event_type, selector)| {
                selector.selected.map(|index| (event_type.clone(), index))
            })
            .collect()
    }
}
