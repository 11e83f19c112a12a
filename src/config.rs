use crate::classify::{BandMode, Classifier, DEFAULT_THRESHOLD_MINUTES};
use crate::estimation::EstimatorKind;
use crate::history::AttractionId;
use crate::history::csv::HistorySources;
use crate::lightning::{DEFAULT_LANE_INTERVAL, LaneSettings};
use crate::monitor::MonitorSettings;
use crate::scheduler::SchedulerMode;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_ITEM_DELAY_SECS: u64 = 5;
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 10;
/// Largest accepted `hour_offset`, in either direction.
pub const MAX_HOUR_OFFSET: i64 = 24;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub scheduler: Option<SchedulerSection>,
    #[serde(default)]
    pub estimation: Option<EstimationSection>,
    #[serde(default)]
    pub source: Option<SourceSection>,
    #[serde(default)]
    pub notifier: Option<NotifierSection>,
    #[serde(default)]
    pub attractions: Vec<AttractionConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port for the status API (default: 8080)
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    #[default]
    Concurrent,
    Sequential,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerSection {
    #[serde(default)]
    pub mode: SchedulerKind,
    /// Pause between attractions in sequential mode (default: 5)
    pub item_delay_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EstimationSection {
    #[serde(default)]
    pub model: EstimatorKind,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSection {
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Log,
    Pushover,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierSection {
    #[serde(default)]
    pub kind: NotifierKind,
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub user: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AttractionConfig {
    /// Display name, matched exactly against history and the live page
    pub name: String,
    pub interval_secs: Option<u64>,
    #[serde(default)]
    pub hour_offset: i64,
    pub threshold_minutes: Option<f64>,
    #[serde(default)]
    pub bands: BandMode,
    #[serde(default)]
    pub track_decrease: bool,
    #[serde(default)]
    pub history_files: Vec<PathBuf>,
    pub history_dir: Option<PathBuf>,
    #[serde(default)]
    pub lightning_lane: Option<LightningLaneConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LightningLaneConfig {
    /// Notify when the next return time is at most this many minutes away
    pub window_minutes: i64,
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attractions.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one [[attractions]] entry is required".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for attraction in &self.attractions {
            if attraction.name.trim().is_empty() {
                return Err(ConfigError::Invalid("attraction name is empty".to_string()));
            }
            if !seen.insert(attraction.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate attraction: {}",
                    attraction.name
                )));
            }
            if attraction.interval_secs == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "{}: interval_secs must be positive",
                    attraction.name
                )));
            }
            if !(-MAX_HOUR_OFFSET..=MAX_HOUR_OFFSET).contains(&attraction.hour_offset) {
                return Err(ConfigError::Invalid(format!(
                    "{}: hour_offset must be within ±{MAX_HOUR_OFFSET}",
                    attraction.name
                )));
            }
            if let Some(lane) = &attraction.lightning_lane {
                if lane.window_minutes < 0 {
                    return Err(ConfigError::Invalid(format!(
                        "{}: lightning_lane.window_minutes must not be negative",
                        attraction.name
                    )));
                }
                if lane.interval_secs == Some(0) {
                    return Err(ConfigError::Invalid(format!(
                        "{}: lightning_lane.interval_secs must be positive",
                        attraction.name
                    )));
                }
            }
            if let Some(threshold) = attraction.threshold_minutes
                && !(threshold.is_finite() && threshold >= 0.0)
            {
                return Err(ConfigError::Invalid(format!(
                    "{}: threshold_minutes must be a non-negative number",
                    attraction.name
                )));
            }
        }

        if let Some(notifier) = &self.notifier
            && notifier.kind == NotifierKind::Pushover
            && (notifier.token.is_none() || notifier.user.is_none())
        {
            return Err(ConfigError::Invalid(
                "pushover notifier requires token and user".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    pub fn scheduler_mode(&self) -> SchedulerMode {
        match &self.scheduler {
            Some(section) if section.mode == SchedulerKind::Sequential => {
                SchedulerMode::Sequential {
                    item_delay: Duration::from_secs(
                        section.item_delay_secs.unwrap_or(DEFAULT_ITEM_DELAY_SECS),
                    ),
                }
            }
            _ => SchedulerMode::Concurrent,
        }
    }

    pub fn estimator_kind(&self) -> EstimatorKind {
        self.estimation
            .as_ref()
            .map(|e| e.model)
            .unwrap_or_default()
    }

    pub fn source_url(&self) -> &str {
        self.source
            .as_ref()
            .and_then(|s| s.url.as_deref())
            .unwrap_or(crate::source::thrill::DEFAULT_URL)
    }

    pub fn source_timeout(&self) -> Duration {
        let secs = self
            .source
            .as_ref()
            .and_then(|s| s.timeout_secs)
            .unwrap_or(DEFAULT_SOURCE_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn notifier_kind(&self) -> NotifierKind {
        self.notifier
            .as_ref()
            .map(|n| n.kind)
            .unwrap_or_default()
    }
}

impl AttractionConfig {
    pub fn id(&self) -> AttractionId {
        AttractionId::new(self.name.clone())
    }

    /// Returns the polling interval as Duration (default: 30 seconds)
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(
            self.threshold_minutes.unwrap_or(DEFAULT_THRESHOLD_MINUTES),
            self.bands,
        )
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            interval: self.interval(),
            hour_offset: self.hour_offset,
            classifier: self.classifier(),
            track_decrease: self.track_decrease,
        }
    }

    /// Lightning Lane watch settings, if the attraction has one configured.
    pub fn lane_settings(&self) -> Option<LaneSettings> {
        self.lightning_lane.as_ref().map(|lane| LaneSettings {
            interval: lane
                .interval_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_LANE_INTERVAL),
            window_minutes: lane.window_minutes,
        })
    }

    pub fn history_sources(&self) -> HistorySources {
        HistorySources {
            files: self.history_files.clone(),
            dir: self.history_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    const MINIMAL: &str = r#"
[app]
name = "wait-watch"

[logging]
level = "info"

[[attractions]]
name = "Space Mountain"
"#;

    fn write_temp(label: &str, contents: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let path = std::env::temp_dir().join(format!("wait-watch-config-{label}-{unique}.toml"));
        fs::write(&path, contents)?;
        Ok(path)
    }

    #[test]
    fn default_config_lists_attractions() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_default()?;
        assert!(!config.attractions.is_empty());
        Ok(())
    }

    #[test]
    fn minimal_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let path = write_temp("minimal", MINIMAL)?;

        let config = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        assert_eq!(config.server_port(), DEFAULT_SERVER_PORT);
        assert_eq!(config.scheduler_mode(), SchedulerMode::Concurrent);
        assert_eq!(config.estimator_kind(), EstimatorKind::Weighted);
        assert_eq!(config.notifier_kind(), NotifierKind::Log);
        let attraction = &config.attractions[0];
        assert_eq!(attraction.interval(), Duration::from_secs(DEFAULT_INTERVAL_SECS));
        assert_eq!(attraction.classifier(), Classifier::default());
        assert_eq!(attraction.hour_offset, 0);
        assert!(!attraction.track_decrease);
        assert_eq!(attraction.lane_settings(), None);
        Ok(())
    }

    #[test]
    fn attraction_overrides_are_applied() -> Result<(), Box<dyn std::error::Error>> {
        let contents = r#"
[app]
name = "wait-watch"

[logging]
level = "debug"

[scheduler]
mode = "sequential"
item_delay_secs = 2

[estimation]
model = "pooled"

[[attractions]]
name = "Star Tours - The Adventures Continue"
interval_secs = 300
hour_offset = -3
threshold_minutes = 12.5
bands = "two"
track_decrease = true
history_files = ["data/star_tours/january.csv"]
history_dir = "data/star_tours"

[attractions.lightning_lane]
window_minutes = 60
interval_secs = 15
"#;
        let path = write_temp("overrides", contents)?;

        let config = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        assert_eq!(
            config.scheduler_mode(),
            SchedulerMode::Sequential {
                item_delay: Duration::from_secs(2)
            }
        );
        assert_eq!(config.estimator_kind(), EstimatorKind::Pooled);
        let settings = config.attractions[0].monitor_settings();
        assert_eq!(settings.interval, Duration::from_secs(300));
        assert_eq!(settings.hour_offset, -3);
        assert_eq!(settings.classifier, Classifier::new(12.5, BandMode::Two));
        assert!(settings.track_decrease);
        let sources = config.attractions[0].history_sources();
        assert_eq!(sources.files.len(), 1);
        assert_eq!(sources.dir, Some(PathBuf::from("data/star_tours")));
        assert_eq!(
            config.attractions[0].lane_settings(),
            Some(LaneSettings {
                interval: Duration::from_secs(15),
                window_minutes: 60,
            })
        );
        Ok(())
    }

    #[test]
    fn duplicate_attractions_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!("{MINIMAL}\n[[attractions]]\nname = \"Space Mountain\"\n");
        let path = write_temp("duplicate", &contents)?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        Ok(())
    }

    #[test]
    fn zero_interval_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let contents = MINIMAL.replace(
            "name = \"Space Mountain\"",
            "name = \"Space Mountain\"\ninterval_secs = 0",
        );
        let path = write_temp("zero-interval", &contents)?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        Ok(())
    }

    #[test]
    fn out_of_range_hour_offset_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        for offset in ["9000000000000000", "-25"] {
            let contents = MINIMAL.replace(
                "name = \"Space Mountain\"",
                &format!("name = \"Space Mountain\"\nhour_offset = {offset}"),
            );
            let path = write_temp("hour-offset", &contents)?;

            let result = load_from_path(&path);
            let _ = fs::remove_file(&path);

            assert!(matches!(result, Err(ConfigError::Invalid(_))), "offset {offset}");
        }
        Ok(())
    }

    #[test]
    fn negative_lane_window_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!("{MINIMAL}\n[attractions.lightning_lane]\nwindow_minutes = -5\n");
        let path = write_temp("lane-window", &contents)?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        Ok(())
    }

    #[test]
    fn pushover_without_credentials_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!("{MINIMAL}\n[notifier]\nkind = \"pushover\"\ntoken = \"abc\"\n");
        let path = write_temp("pushover", &contents)?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        Ok(())
    }

    #[test]
    fn unknown_estimator_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!("{MINIMAL}\n[estimation]\nmodel = \"regression\"\n");
        let path = write_temp("unknown-model", &contents)?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        Ok(())
    }

    #[test]
    fn missing_config_file_returns_read_error() {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("wait-watch-config-missing-{unique}.toml"));

        let result = load_from_path(&path);

        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn invalid_toml_returns_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let path = write_temp("invalid", "not = [valid")?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        Ok(())
    }
}
