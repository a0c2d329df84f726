// Endpoint registry - static map of logical sources to request URLs
use crate::domain::selection::{EventType, SelectionSnapshot};
use crate::domain::series::SeriesBinding;
use crate::domain::source::{FetchRequest, SourceDescriptor, SourceId};
use crate::infrastructure::config::{prepare_url, SourceConfig};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Query parameter carrying the 0-based event index on the wire
pub const INDEX_PARAM: &str = "index";

#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    sources: Vec<SourceDescriptor>,
}

impl EndpointRegistry {
    pub fn new(sources: Vec<SourceDescriptor>) -> anyhow::Result<Self> {
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.id.clone()) {
                anyhow::bail!("source `{}` is registered more than once", source.id);
            }
        }
        Ok(Self { sources })
    }

    pub fn from_config(configs: &[SourceConfig]) -> anyhow::Result<Self> {
        let sources = configs.iter().map(Self::descriptor).collect();
        Self::new(sources)
    }

    fn descriptor(config: &SourceConfig) -> SourceDescriptor {
        let mut source =
            SourceDescriptor::new(config.id.clone(), config.url.trim_end_matches('/'));
        source.params = config.params.clone();
        if let Some(event_type) = &config.selector {
            source = source.with_selector(EventType::new(event_type.clone()));
        }
        for series in &config.series {
            let mut binding = SeriesBinding::new(series.name.clone(), series.field.clone());
            if let Some(fallback) = &series.fallback_field {
                binding = binding.with_fallback(fallback.clone());
            }
            source = source.with_series(binding);
        }
        if config.reports_counts {
            source = source.reporting_counts();
        }
        source
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn get(&self, id: &SourceId) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| &s.id == id)
    }

    /// Sources whose request depends on the given selector
    pub fn bound_to<'a>(
        &'a self,
        event_type: &'a EventType,
    ) -> impl Iterator<Item = &'a SourceDescriptor> + 'a {
        self.sources
            .iter()
            .filter(move |s| s.selector.as_ref() == Some(event_type))
    }

    /// Every event type some source is bound to
    pub fn event_types(&self) -> BTreeSet<EventType> {
        self.sources
            .iter()
            .filter_map(|s| s.selector.clone())
            .collect()
    }

    /// Chart series names, in registration order
    pub fn series_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for binding in self.sources.iter().flat_map(|s| &s.series) {
            if !names.contains(&binding.series.as_str()) {
                names.push(&binding.series);
            }
        }
        names
    }

    /// Build the concrete request for a source. The 1-based selection is
    /// translated to the 0-based wire index here and nowhere else.
    /// Returns None when the source needs a selection and none is valid.
    pub fn resolve(
        &self,
        source: &SourceDescriptor,
        selection: &SelectionSnapshot,
    ) -> Option<FetchRequest> {
        let mut vars = HashMap::new();
        let mut params = source.params.clone();

        if let Some(event_type) = &source.selector {
            let index = selection.get(event_type).copied().filter(|i| *i > 0)?;
            let api_index = (index - 1).to_string();
            if source.url.contains("${index}") {
                vars.insert(INDEX_PARAM.to_string(), api_index);
            } else {
                params.insert(INDEX_PARAM.to_string(), api_index);
            }
        }

        let mut url = prepare_url(&source.url, &vars);
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            let separator = if url.contains('?') { '&' } else { '?' };
            url.push(separator);
            url.push_str(&query.join("&"));
        }

        Some(FetchRequest {
            source: source.id.clone(),
            url,
        })
    }
}
