//! YAML configuration file.
//!
//! ```yaml
//! fedora:
//!   url: http://localhost:8080/fcrepo
//!   username: fedoraAdmin
//!   password: secret
//! regenerator:
//!   url: http://localhost:8080/ocr
//!   batch_size: 10
//!   delay_seconds: 30
//! queue_monitor:
//!   host: http://localhost:8161
//!   username: admin
//!   password: admin
//!   queue_name: [ocr.requests, ocr.derivatives]
//!   max_queue_size: 100
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use regen_ocr_engine::PacingConfig;
use regen_ocr_queue::{DEFAULT_BROKER_NAME, DEFAULT_MAX_QUEUE_SIZE, QueueMonitorConfig};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("missing required config key '{0}'")]
    MissingKey(String),

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    fedora: Option<RawFedora>,
    regenerator: Option<RawRegenerator>,
    queue_monitor: Option<RawQueueMonitor>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFedora {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRegenerator {
    url: Option<String>,
    batch_size: Option<usize>,
    delay_seconds: Option<u64>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawQueueMonitor {
    host: Option<String>,
    username: Option<String>,
    password: Option<String>,
    queue_name: Option<QueueNames>,
    max_queue_size: Option<u64>,
    broker_name: Option<String>,
    backpressure_max_waits: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QueueNames {
    One(String),
    Many(Vec<String>),
}

impl QueueNames {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name],
            Self::Many(names) => names,
        }
    }
}

/// Repository connection settings.
#[derive(Clone)]
pub struct FedoraSettings {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for FedoraSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FedoraSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// OCR service settings.
#[derive(Debug, Clone)]
pub struct RegeneratorSettings {
    pub url: String,
    pub pacing: PacingConfig,
    pub timeout: Option<Duration>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub fedora: FedoraSettings,
    pub regenerator: RegeneratorSettings,
    pub queue_monitor: Option<QueueMonitorConfig>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_owned(),
                source,
            },
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping.
        let raw: RawConfig = if content.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml_ng::from_str(content).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?
        };
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let fedora = raw.fedora.unwrap_or_default();
        let fedora = FedoraSettings {
            url: http_url("fedora.url", required("fedora.url", fedora.url)?)?,
            username: required("fedora.username", fedora.username)?,
            password: required("fedora.password", fedora.password)?,
        };

        let regenerator = raw.regenerator.unwrap_or_default();
        let url = http_url("regenerator.url", required("regenerator.url", regenerator.url)?)?;
        let mut pacing = PacingConfig::default();
        if let Some(batch_size) = regenerator.batch_size {
            if batch_size == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "regenerator.batch_size".into(),
                    reason: "must be at least 1".into(),
                });
            }
            pacing.batch_size = batch_size;
        }
        if let Some(delay) = regenerator.delay_seconds {
            pacing.delay = Duration::from_secs(delay);
        }

        let timeout = regenerator.timeout_seconds.map(Duration::from_secs);
        let queue_monitor = match raw.queue_monitor {
            Some(monitor) => {
                if let Some(waits) = monitor.backpressure_max_waits {
                    pacing.backpressure_max_waits = waits;
                }
                Some(QueueMonitorConfig {
                    host: http_url(
                        "queue_monitor.host",
                        required("queue_monitor.host", monitor.host)?,
                    )?,
                    username: required("queue_monitor.username", monitor.username)?,
                    password: required("queue_monitor.password", monitor.password)?,
                    queue_names: monitor
                        .queue_name
                        .map(QueueNames::into_vec)
                        .unwrap_or_default(),
                    max_queue_size: monitor.max_queue_size.unwrap_or(DEFAULT_MAX_QUEUE_SIZE),
                    broker_name: monitor
                        .broker_name
                        .unwrap_or_else(|| DEFAULT_BROKER_NAME.to_owned()),
                    timeout,
                })
            }
            None => None,
        };

        Ok(Self {
            fedora,
            regenerator: RegeneratorSettings {
                url,
                pacing,
                timeout,
            },
            queue_monitor,
        })
    }
}

fn required(key: &str, value: Option<String>) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingKey(key.to_owned()))
}

fn http_url(key: &str, value: String) -> Result<String, ConfigError> {
    let value = value.trim().trim_end_matches('/').to_owned();
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: key.to_owned(),
        reason,
    };
    let url = Url::parse(&value).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MINIMAL: &str = "
fedora:
  url: http://localhost:8080/fcrepo/
  username: fedoraAdmin
  password: secret
regenerator:
  url: http://localhost:8080/ocr
";

    #[test]
    fn minimal_config_uses_defaults() {
        let config = AppConfig::parse(MINIMAL).unwrap();
        assert_eq!(config.fedora.url, "http://localhost:8080/fcrepo");
        assert_eq!(config.fedora.username, "fedoraAdmin");
        assert_eq!(config.regenerator.url, "http://localhost:8080/ocr");
        assert_eq!(config.regenerator.pacing, PacingConfig::default());
        assert!(config.regenerator.timeout.is_none());
        assert!(config.queue_monitor.is_none());
    }

    #[test]
    fn debug_redacts_password() {
        let config = AppConfig::parse(MINIMAL).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn pacing_overrides() {
        let yaml = format!(
            "{MINIMAL}  batch_size: 25\n  delay_seconds: 5\n  timeout_seconds: 60\n"
        );
        let config = AppConfig::parse(&yaml).unwrap();
        assert_eq!(config.regenerator.pacing.batch_size, 25);
        assert_eq!(config.regenerator.pacing.delay, Duration::from_secs(5));
        assert_eq!(config.regenerator.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let yaml = format!("{MINIMAL}  batch_size: 0\n");
        assert!(matches!(
            AppConfig::parse(&yaml),
            Err(ConfigError::InvalidValue { key, .. }) if key == "regenerator.batch_size"
        ));
    }

    #[test]
    fn first_missing_key_is_reported() {
        let err = AppConfig::parse("").unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(ref k) if k == "fedora.url"));

        let err = AppConfig::parse(
            "fedora:\n  url: http://localhost/fcrepo\n  username: admin\n  password: pw\n",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "missing required config key 'regenerator.url'");

        let err = AppConfig::parse(
            "fedora:\n  url: http://localhost/fcrepo\n  password: pw\nregenerator:\n  url: http://x/ocr\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(ref k) if k == "fedora.username"));
    }

    #[test]
    fn urls_must_be_http() {
        let yaml = MINIMAL.replace("http://localhost:8080/ocr", "ftp://localhost/ocr");
        assert!(matches!(
            AppConfig::parse(&yaml),
            Err(ConfigError::InvalidValue { key, .. }) if key == "regenerator.url"
        ));

        let yaml = MINIMAL.replace("http://localhost:8080/fcrepo/", "localhost:8080");
        assert!(AppConfig::parse(&yaml).is_err());
    }

    #[test]
    fn queue_monitor_with_single_queue() {
        let yaml = format!(
            "{MINIMAL}queue_monitor:\n  host: http://broker:8161\n  username: admin\n  password: admin\n  queue_name: ocr.requests\n"
        );
        let monitor = AppConfig::parse(&yaml).unwrap().queue_monitor.unwrap();
        assert_eq!(monitor.queue_names, ["ocr.requests"]);
        assert_eq!(monitor.max_queue_size, DEFAULT_MAX_QUEUE_SIZE);
        assert_eq!(monitor.broker_name, DEFAULT_BROKER_NAME);
    }

    #[test]
    fn queue_monitor_with_queue_list() {
        let yaml = format!(
            "{MINIMAL}queue_monitor:\n  host: http://broker:8161\n  username: admin\n  password: admin\n  queue_name: [a, b]\n  max_queue_size: 7\n  broker_name: amq\n  backpressure_max_waits: 2\n"
        );
        let config = AppConfig::parse(&yaml).unwrap();
        let monitor = config.queue_monitor.unwrap();
        assert_eq!(monitor.queue_names, ["a", "b"]);
        assert_eq!(monitor.max_queue_size, 7);
        assert_eq!(monitor.broker_name, "amq");
        assert!(monitor.timeout.is_none());
        assert_eq!(config.regenerator.pacing.backpressure_max_waits, 2);
    }

    #[test]
    fn queue_monitor_shares_request_timeout() {
        let yaml = format!(
            "{MINIMAL}  timeout_seconds: 15\nqueue_monitor:\n  host: http://broker:8161\n  username: admin\n  password: admin\n  queue_name: ocr\n"
        );
        let config = AppConfig::parse(&yaml).unwrap();
        assert_eq!(config.regenerator.timeout, Some(Duration::from_secs(15)));
        assert_eq!(
            config.queue_monitor.unwrap().timeout,
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn queue_monitor_requires_credentials() {
        let yaml = format!("{MINIMAL}queue_monitor:\n  host: http://broker:8161\n");
        assert!(matches!(
            AppConfig::parse(&yaml),
            Err(ConfigError::MissingKey(k)) if k == "queue_monitor.username"
        ));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.fedora.password, "secret");
    }

    #[test]
    fn load_reports_path_on_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yml");
        assert!(matches!(
            AppConfig::load(&missing),
            Err(ConfigError::Read { path, .. }) if path == missing
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"fedora: [unclosed").unwrap();
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(ConfigError::Parse { path, .. }) if path == file.path()
        ));
    }
}
