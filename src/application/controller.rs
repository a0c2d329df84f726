// Aggregation controller - fans out one fetch per source on every tick
use crate::application::context::{Applied, DashboardContext};
use crate::application::fetch_gateway::FetchGateway;
use crate::domain::dashboard::DashboardView;
use crate::domain::error_log::EntryId;
use crate::domain::selection::{EventType, SelectionError};
use crate::domain::source::{FetchOutcome, SourceDescriptor, SourceId, TickResult};
use crate::infrastructure::endpoint_registry::EndpointRegistry;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct PollingSettings {
    pub interval: Duration,
    pub error_ttl: Duration,
    pub chart_capacity: usize,
    pub discard_stale_outcomes: bool,
}

#[derive(Clone)]
pub struct AggregationController {
    gateway: Arc<dyn FetchGateway>,
    registry: Arc<EndpointRegistry>,
    context: Arc<Mutex<DashboardContext>>,
    settings: PollingSettings,
    tick_seq: Arc<AtomicU64>,
}

fn lock(context: &Mutex<DashboardContext>) -> MutexGuard<'_, DashboardContext> {
    context.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AggregationController {
    pub fn new(
        gateway: Arc<dyn FetchGateway>,
        registry: Arc<EndpointRegistry>,
        settings: PollingSettings,
    ) -> Self {
        let context = DashboardContext::new(
            &registry,
            settings.chart_capacity,
            settings.error_ttl,
            settings.discard_stale_outcomes,
        );

        Self {
            gateway,
            registry,
            context: Arc::new(Mutex::new(context)),
            settings,
            tick_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Tick immediately, then every interval, forever. Each tick runs as its
    /// own task so a slow backend never holds up the schedule.
    pub async fn run(self) {
        let interval_ms = self.settings.interval.as_millis() as u64;
        tracing::info!(
            interval_ms,
            sources = self.registry.sources().len(),
            "polling started"
        );

        let mut interval = tokio::time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let controller = self.clone();
            tokio::spawn(async move {
                controller.tick().await;
            });
        }
    }

    /// One polling cycle over every registered source.
    pub async fn tick(&self) -> TickResult {
        let tick = self.next_tick();
        lock(&self.context).begin_tick();

        let sources: Vec<&SourceDescriptor> = self.registry.sources().iter().collect();
        let results = self.fetch_all(tick, sources).await;

        let failed = results.values().filter(|o| !o.is_success()).count();
        tracing::info!(tick, fetched = results.len(), failed, "tick complete");
        results
    }

    /// User-initiated refetch of every source that depends on the given selector.
    pub async fn refresh_selector(&self, event_type: &EventType) -> TickResult {
        let sources: Vec<&SourceDescriptor> = self.registry.bound_to(event_type).collect();
        let tick = self.next_tick();
        self.fetch_all(tick, sources).await
    }

    /// Record the operator's choice; the next fetch for that selector uses it.
    pub fn select(&self, event_type: &EventType, index: u32) -> Result<(), SelectionError> {
        lock(&self.context).selection.select(event_type, index)?;
        tracing::info!(event_type = %event_type, index, "selection changed");
        Ok(())
    }

    pub fn view(&self) -> DashboardView {
        lock(&self.context).view(Instant::now())
    }

    fn next_tick(&self) -> u64 {
        self.tick_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn fetch_all(&self, tick: u64, sources: Vec<&SourceDescriptor>) -> TickResult {
        let selection = lock(&self.context).selection.snapshot();

        let mut pending: FuturesUnordered<_> = sources
            .into_iter()
            .filter_map(|source| {
                let request = self.registry.resolve(source, &selection);
                if request.is_none() {
                    tracing::debug!(source = %source.id, "no valid selection, skipping");
                }
                request
            })
            .map(|request| {
                let gateway = Arc::clone(&self.gateway);
                async move {
                    let outcome = gateway.fetch(&request).await;
                    (request.source, outcome)
                }
            })
            .collect();

        let mut results = TickResult::new();
        while let Some((source, outcome)) = pending.next().await {
            self.apply(tick, &source, &outcome);
            results.insert(source, outcome);
        }
        results
    }

    fn apply(&self, tick: u64, id: &SourceId, outcome: &FetchOutcome) {
        let Some(source) = self.registry.get(id) else {
            return;
        };

        // The chart follows every series update, not the end of the tick.
        let applied = {
            let mut context = lock(&self.context);
            let applied = context.apply_outcome(source, tick, outcome, Instant::now());
            if applied == Applied::Success && !source.series.is_empty() {
                context.refresh_chart();
            }
            applied
        };
        match (applied, outcome) {
            (Applied::Failure(entry), FetchOutcome::Failure { reason }) => {
                tracing::warn!(tick, source = %id, reason = %reason, "fetch failed");
                self.schedule_expiry(entry);
            }
            (Applied::Discarded, _) => {
                tracing::debug!(tick, source = %id, "discarded superseded outcome");
            }
            _ => {
                tracing::debug!(tick, source = %id, "outcome applied");
            }
        }
    }

    fn schedule_expiry(&self, entry: EntryId) {
        let context = Arc::clone(&self.context);
        let ttl = self.settings.error_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if lock(&context).errors.expire(entry) {
                tracing::debug!("error log emptied");
            }
        });
    }
}
