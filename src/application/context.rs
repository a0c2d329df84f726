// Dashboard context - all shared dashboard state and the reducer applying outcomes
use crate::domain::dashboard::{
    local_timestamp, DashboardView, ErrorEntryView, ErrorLogView, SelectorView,
};
use crate::domain::error_log::{EntryId, ErrorLog};
use crate::domain::health::HealthState;
use crate::domain::selection::SelectionState;
use crate::domain::series::{payload_label, ChartData, RollingSeriesStore, SeriesPoint};
use crate::domain::source::{FetchOutcome, SourceDescriptor, SourceId};
use crate::infrastructure::endpoint_registry::EndpointRegistry;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

/// What applying one outcome did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Success,
    Failure(EntryId),
    /// Superseded by a newer tick's outcome for the same source
    Discarded,
}

#[derive(Debug)]
pub struct DashboardContext {
    panels: BTreeMap<SourceId, String>,
    health: HealthState,
    series: RollingSeriesStore,
    chart: ChartData,
    pub(crate) errors: ErrorLog,
    pub(crate) selection: SelectionState,
    last_updated: Option<String>,
    last_applied_tick: HashMap<SourceId, u64>,
    discard_stale: bool,
}

impl DashboardContext {
    pub fn new(
        registry: &EndpointRegistry,
        chart_capacity: usize,
        error_ttl: Duration,
        discard_stale: bool,
    ) -> Self {
        let mut series = RollingSeriesStore::new(chart_capacity);
        for name in registry.series_names() {
            series.register(name);
        }
        let chart = series.chart();

        Self {
            panels: BTreeMap::new(),
            health: HealthState::default(),
            series,
            chart,
            errors: ErrorLog::new(error_ttl),
            selection: SelectionState::new(registry.event_types()),
            last_updated: None,
            last_applied_tick: HashMap::new(),
            discard_stale,
        }
    }

    pub fn begin_tick(&mut self) {
        self.last_updated = Some(local_timestamp());
    }

    /// Apply one fetch outcome. Health always follows the outcome just applied.
    pub fn apply_outcome(
        &mut self,
        source: &SourceDescriptor,
        tick: u64,
        outcome: &FetchOutcome,
        now: Instant,
    ) -> Applied {
        let latest = self.last_applied_tick.entry(source.id.clone()).or_insert(0);
        if self.discard_stale && tick < *latest {
            return Applied::Discarded;
        }
        *latest = (*latest).max(tick);

        self.health = HealthState::from_outcome(outcome);

        match outcome {
            FetchOutcome::Success { payload } => {
                let rendered =
                    serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
                self.panels.insert(source.id.clone(), rendered);

                if !source.series.is_empty() {
                    let label = payload_label(payload).unwrap_or_else(local_timestamp);
                    for binding in &source.series {
                        let point = SeriesPoint::new(label.clone(), binding.value_from(payload));
                        self.series.push(&binding.series, point);
                    }
                }

                if source.reports_counts {
                    self.selection.refresh_counts(payload);
                }

                Applied::Success
            }
            FetchOutcome::Failure { reason } => Applied::Failure(self.errors.report(reason.clone(), now)),
        }
    }

    /// Hand the current series to the chart.
    pub fn refresh_chart(&mut self) {
        self.chart = self.series.chart();
    }

    pub fn view(&self, now: Instant) -> DashboardView {
        let entries = self
            .errors
            .entries(now)
            .map(|entry| ErrorEntryView {
                id: entry.id.as_i64(),
                text: entry.display_text(),
            })
            .collect();

        let selectors = self
            .selection
            .selectors()
            .map(|(event_type, selector)| SelectorView {
                event_type: event_type.to_string(),
                selected: selector.selected,
                options: selector.options(),
            })
            .collect();

        DashboardView {
            last_updated: self.last_updated.clone(),
            health: self.health.into(),
            panels: self
                .panels
                .iter()
                .map(|(id, panel)| (id.to_string(), panel.clone()))
                .collect(),
            chart: self.chart.clone(),
            errors: ErrorLogView {
                visible: self.errors.is_visible(now),
                entries,
            },
            selectors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error_log::DEFAULT_ERROR_TTL;
    use crate::domain::selection::{EventType, IndexRange};
    use crate::infrastructure::config::default_sources;
    use serde_json::json;

    fn registry() -> EndpointRegistry {
        EndpointRegistry::from_config(&default_sources()).unwrap()
    }

    fn context(registry: &EndpointRegistry, discard_stale: bool) -> DashboardContext {
        DashboardContext::new(registry, 10, DEFAULT_ERROR_TTL, discard_stale)
    }

    fn success(payload: serde_json::Value) -> FetchOutcome {
        FetchOutcome::Success { payload }
    }

    fn panel<'a>(ctx: &'a DashboardContext, source: &SourceId) -> Option<&'a str> {
        ctx.panels.get(source).map(String::as_str)
    }

    fn failure(reason: &str) -> FetchOutcome {
        FetchOutcome::Failure {
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_success_renders_pretty_json_and_feeds_chart() {
        let registry = registry();
        let mut ctx = context(&registry, false);
        let processing = registry.get(&SourceId::new("processing-stats")).unwrap();
        let now = Instant::now();

        let applied = ctx.apply_outcome(
            processing,
            1,
            &success(json!({"last_updated": "t1", "num_drone_positions": 3})),
            now,
        );

        assert_eq!(applied, Applied::Success);
        assert_eq!(
            panel(&ctx, &processing.id),
            Some("{\n  \"last_updated\": \"t1\",\n  \"num_drone_positions\": 3\n}")
        );
        assert_eq!(
            ctx.series.snapshot("drone positions"),
            vec![SeriesPoint::new("t1", 3.0)]
        );
        // no acquisitions field at all
        assert_eq!(
            ctx.series.snapshot("target acquisitions"),
            vec![SeriesPoint::new("t1", 0.0)]
        );

        // the chart only moves when refreshed
        assert!(ctx.view(now).chart.labels.is_empty());
        ctx.refresh_chart();
        assert_eq!(ctx.view(now).chart.labels, vec!["t1"]);
    }

    #[test]
    fn test_failure_keeps_stale_panel_and_logs() {
        let registry = registry();
        let mut ctx = context(&registry, false);
        let analyzer = registry.get(&SourceId::new("analyzer-stats")).unwrap();
        let now = Instant::now();

        ctx.apply_outcome(analyzer, 1, &success(json!({"num_drone_position": 2})), now);
        let before = panel(&ctx, &analyzer.id).map(str::to_string);
        let applied = ctx.apply_outcome(analyzer, 2, &failure("HTTP error! Status: 500"), now);

        assert!(matches!(applied, Applied::Failure(_)));
        assert_eq!(panel(&ctx, &analyzer.id).map(str::to_string), before);
        assert_eq!(ctx.health, HealthState::Offline);

        let view = ctx.view(now);
        assert!(view.errors.visible);
        assert_eq!(view.errors.entries.len(), 1);
        assert!(view.errors.entries[0].text.ends_with("HTTP error! Status: 500"));
    }

    #[test]
    fn test_analyzer_counts_bound_selectors() {
        let registry = registry();
        let mut ctx = context(&registry, false);
        let analyzer = registry.get(&SourceId::new("analyzer-stats")).unwrap();
        let target = EventType::new("target_acquisition");
        ctx.selection.select(&target, 5).unwrap();

        ctx.apply_outcome(
            analyzer,
            1,
            &success(json!({"num_drone_position": 8, "num_target_acquisition": 3})),
            Instant::now(),
        );

        let view = ctx.view(Instant::now());
        let selector = view
            .selectors
            .iter()
            .find(|s| s.event_type == "target_acquisition")
            .unwrap();
        assert_eq!(selector.options, Some(IndexRange { first: 1, last: 3 }));
        assert_eq!(selector.selected, Some(3));
    }

    #[test]
    fn test_huge_event_count_serializes_as_bounds() {
        let registry = registry();
        let mut ctx = context(&registry, false);
        let analyzer = registry.get(&SourceId::new("analyzer-stats")).unwrap();
        let now = Instant::now();

        ctx.apply_outcome(
            analyzer,
            1,
            &success(json!({"num_drone_position": 20_000_000u64})),
            now,
        );

        let view = ctx.view(now);
        let drone = view
            .selectors
            .iter()
            .find(|s| s.event_type == "drone_position")
            .unwrap();
        assert_eq!(drone.options, Some(IndexRange { first: 1, last: 20_000_000 }));

        let body = serde_json::to_string(&view).unwrap();
        assert!(body.len() < 2_000, "view serialized to {} bytes", body.len());
        assert!(body.contains("\"options\":{\"first\":1,\"last\":20000000}"));
    }

    #[test]
    fn test_late_outcome_applies_by_default() {
        let registry = registry();
        let mut ctx = context(&registry, false);
        let analyzer = registry.get(&SourceId::new("analyzer-stats")).unwrap();
        let now = Instant::now();

        ctx.apply_outcome(analyzer, 2, &success(json!({"tick": 2})), now);
        let applied = ctx.apply_outcome(analyzer, 1, &success(json!({"tick": 1})), now);

        assert_eq!(applied, Applied::Success);
        assert!(panel(&ctx, &analyzer.id).unwrap().contains("\"tick\": 1"));
    }

    #[test]
    fn test_late_outcome_discarded_when_enabled() {
        let registry = registry();
        let mut ctx = context(&registry, true);
        let analyzer = registry.get(&SourceId::new("analyzer-stats")).unwrap();
        let now = Instant::now();

        ctx.apply_outcome(analyzer, 2, &success(json!({"tick": 2})), now);
        let applied = ctx.apply_outcome(analyzer, 1, &failure("late"), now);

        assert_eq!(applied, Applied::Discarded);
        assert!(panel(&ctx, &analyzer.id).unwrap().contains("\"tick\": 2"));
        assert_eq!(ctx.health, HealthState::Online);
        assert!(!ctx.view(now).errors.visible);
    }
}
