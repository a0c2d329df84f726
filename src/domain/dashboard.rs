// Dashboard view model - everything the presentation boundary renders
use super::health::HealthState;
use super::selection::IndexRange;
use super::series::ChartData;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Serialize)]
pub struct HealthView {
    pub state: HealthState,
    pub text: &'static str,
}

impl From<HealthState> for HealthView {
    fn from(state: HealthState) -> Self {
        Self {
            state,
            text: state.status_text(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntryView {
    pub id: i64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorLogView {
    pub visible: bool,
    pub entries: Vec<ErrorEntryView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectorView {
    pub event_type: String,
    pub selected: Option<u32>,
    /// None until the event type has at least one event
    pub options: Option<IndexRange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub last_updated: Option<String>,
    pub health: HealthView,
    /// Pretty-printed JSON per source id
    pub panels: BTreeMap<String, String>,
    pub chart: ChartData,
    pub errors: ErrorLogView,
    pub selectors: Vec<SelectorView>,
}

impl DashboardView {
    /// Plain-text rendering for terminals and curl
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Status: {}", self.health.text);
        let _ = writeln!(
            out,
            "Last updated: {}",
            self.last_updated.as_deref().unwrap_or("never")
        );

        for (source, panel) in &self.panels {
            let _ = writeln!(out, "\n== {} ==\n{}", source, panel);
        }

        if !self.chart.labels.is_empty() {
            let _ = writeln!(out, "\n== chart ==");
            let _ = writeln!(out, "labels: {}", self.chart.labels.join(", "));
            for (name, values) in &self.chart.series {
                let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                let _ = writeln!(out, "{}: {}", name, values.join(", "));
            }
        }

        for selector in &self.selectors {
            let range = match selector.options {
                Some(range) => format!("{}..={}", range.first, range.last),
                None => "none".to_string(),
            };
            let selected = selector
                .selected
                .map(|i| i.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "\nselector {}: {} (options {})",
                selector.event_type, selected, range
            );
        }

        if self.errors.visible {
            let _ = writeln!(out, "\n== errors ==");
            for entry in &self.errors.entries {
                let _ = writeln!(out, "{}", entry.text);
            }
        }

        out
    }
}

/// Local wall-clock time, as shown for "last updated" and fallback chart labels
pub fn local_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
