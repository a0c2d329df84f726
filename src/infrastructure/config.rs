use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::domain::error_log::DEFAULT_ERROR_TTL;
use crate::domain::series::DEFAULT_SERIES_CAPACITY;

const DEFAULT_PROCESSING_URL: &str = "http://processing:8100";
const DEFAULT_ANALYZER_URL: &str = "http://analyzer:8200";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub server: ServerSettings,
    pub polling: PollingConfig,
    pub error_log: ErrorLogConfig,
    pub chart: ChartConfig,
    pub sources: Vec<SourceConfig>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            polling: PollingConfig::default(),
            error_log: ErrorLogConfig::default(),
            chart: ChartConfig::default(),
            sources: default_sources(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub request_timeout_ms: Option<u64>,
    pub discard_stale_outcomes: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            request_timeout_ms: None,
            discard_stale_outcomes: false,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ErrorLogConfig {
    pub ttl_ms: u64,
}

impl Default for ErrorLogConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_ERROR_TTL.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartConfig {
    pub capacity: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_SERIES_CAPACITY,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    pub selector: Option<String>,
    #[serde(default)]
    pub series: Vec<SeriesConfig>,
    #[serde(default)]
    pub reports_counts: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeriesConfig {
    pub name: String,
    pub field: String,
    pub fallback_field: Option<String>,
}

fn source(id: &str, url: String) -> SourceConfig {
    SourceConfig {
        id: id.to_string(),
        url,
        params: BTreeMap::new(),
        selector: None,
        series: Vec::new(),
        reports_counts: false,
    }
}

fn series(name: &str, field: &str, fallback_field: &str) -> SeriesConfig {
    SeriesConfig {
        name: name.to_string(),
        field: field.to_string(),
        fallback_field: Some(fallback_field.to_string()),
    }
}

/// The stock deployment: processing stats feed the chart, analyzer stats
/// bound the two event selectors.
pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            series: vec![
                series("drone positions", "num_drone_positions", "num_drone_position"),
                series(
                    "target acquisitions",
                    "num_target_acquisitions",
                    "num_target_acquisition",
                ),
            ],
            ..source("processing-stats", format!("{}/stats", DEFAULT_PROCESSING_URL))
        },
        SourceConfig {
            reports_counts: true,
            ..source("analyzer-stats", format!("{}/stats", DEFAULT_ANALYZER_URL))
        },
        SourceConfig {
            selector: Some("drone_position".to_string()),
            ..source("drone-position", format!("{}/drone_position", DEFAULT_ANALYZER_URL))
        },
        SourceConfig {
            selector: Some("target_acquisition".to_string()),
            ..source(
                "target-acquisition",
                format!("{}/target_acquisition", DEFAULT_ANALYZER_URL),
            )
        },
    ]
}

impl DashboardConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.polling.interval_ms == 0 {
            anyhow::bail!("polling.interval_ms must be greater than zero");
        }
        if self.chart.capacity == 0 {
            anyhow::bail!("chart.capacity must be greater than zero");
        }
        if self.sources.is_empty() {
            anyhow::bail!("at least one source must be configured");
        }
        Ok(())
    }
}

/// Load `config/dashboard.{toml,yaml,json}` (optional) overlaid with
/// `DASHBOARD__SECTION__KEY` environment variables.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: DashboardConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Replace `${name}` template variables in a URL
pub fn prepare_url(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, &urlencoding::encode(value));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_url() {
        let mut vars = HashMap::new();
        vars.insert("index".to_string(), "4".to_string());
        vars.insert("kind".to_string(), "drone position".to_string());

        let template = "http://analyzer:8200/${kind}/${index}";
        let result = prepare_url(template, &vars);

        assert_eq!(result, "http://analyzer:8200/drone%20position/4");
    }

    #[test]
    fn test_defaults_describe_stock_deployment() {
        let config = DashboardConfig::default();
        config.validate().unwrap();

        assert_eq!(config.polling.interval(), Duration::from_secs(3));
        assert_eq!(config.polling.request_timeout(), None);
        assert_eq!(config.error_log.ttl_ms, 7000);
        assert_eq!(config.chart.capacity, 10);

        let ids: Vec<&str> = config.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["processing-stats", "analyzer-stats", "drone-position", "target-acquisition"]
        );
        let urls: Vec<&str> = config.sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "http://processing:8100/stats",
                "http://analyzer:8200/stats",
                "http://analyzer:8200/drone_position",
                "http://analyzer:8200/target_acquisition",
            ]
        );
        assert_eq!(config.sources[0].series.len(), 2);
        assert!(config.sources[1].reports_counts);
    }

    #[test]
    fn test_shipped_file_matches_stock_urls() {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/dashboard"))
            .build()
            .unwrap();
        let shipped: DashboardConfig = settings.try_deserialize().unwrap();

        let urls = |config: &DashboardConfig| -> Vec<String> {
            config.sources.iter().map(|s| s.url.clone()).collect()
        };
        assert_eq!(urls(&shipped), urls(&DashboardConfig::default()));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                "[polling]\ninterval_ms = 4000\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: DashboardConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.polling.interval_ms, 4000);
        assert!(!config.polling.discard_stale_outcomes);
        assert_eq!(config.sources.len(), 4);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = DashboardConfig::default();
        config.polling.interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
