use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::fswebcam::parse_resolution;
use crate::capture::FswebcamConfig;
use crate::detect::{ModelConfig, CAT_CLASS_ID};
use crate::notify::webhook::validate_webhook_url;
use crate::notify::WebhookConfig;
use crate::storage::CaptureLayout;

const DEFAULT_INTERVAL_SECS: u64 = 30;
const DEFAULT_LOG_DIR: &str = "logs";

pub const ENV_CONFIG: &str = "CAT_SENTRY_CONFIG";
pub const ENV_INTERVAL_SECS: &str = "CAT_SENTRY_INTERVAL_SECS";
pub const ENV_TARGET_CLASS: &str = "CAT_SENTRY_TARGET_CLASS";
pub const ENV_MODEL_PATH: &str = "CAT_SENTRY_MODEL_PATH";
pub const ENV_CAPTURE_DIR: &str = "CAT_SENTRY_CAPTURE_DIR";
pub const ENV_CAPTURE_TIMEOUT_SECS: &str = "CAT_SENTRY_CAPTURE_TIMEOUT_SECS";
pub const ENV_LOG_DIR: &str = "CAT_SENTRY_LOG_DIR";
pub const ENV_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SentryConfigFile {
    interval_secs: Option<u64>,
    target_class: Option<u32>,
    log_dir: Option<PathBuf>,
    capture: Option<CaptureConfigFile>,
    storage: Option<StorageConfigFile>,
    model: Option<ModelConfigFile>,
    webhook: Option<WebhookConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CaptureConfigFile {
    program: Option<PathBuf>,
    resolution: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StorageConfigFile {
    root: Option<PathBuf>,
    all_dir: Option<PathBuf>,
    positive_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    max_detections: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct WebhookConfigFile {
    url: Option<String>,
    message: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub interval: Duration,
    pub target_class: u32,
    pub log_dir: PathBuf,
    pub capture: FswebcamConfig,
    pub layout: CaptureLayout,
    pub model: ModelConfig,
    pub webhook: WebhookConfig,
}

impl SentryConfig {
    /// Load from `$CAT_SENTRY_CONFIG` (if set), then environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(ENV_CONFIG).ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Load from an explicit config file (JSON, or TOML by extension), then environment overrides.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let file_cfg = match config_path {
            Some(path) => read_config_file(path)?,
            None => SentryConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentryConfigFile) -> Self {
        let capture_defaults = FswebcamConfig::default();
        let capture = match file.capture {
            Some(c) => FswebcamConfig {
                program: c.program.unwrap_or(capture_defaults.program),
                resolution: c.resolution.unwrap_or(capture_defaults.resolution),
                timeout: c
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(capture_defaults.timeout),
            },
            None => capture_defaults,
        };

        let layout = match file.storage {
            Some(s) => {
                let base = s.root.map(|root| CaptureLayout::under(root)).unwrap_or_default();
                CaptureLayout {
                    all_dir: s.all_dir.unwrap_or(base.all_dir),
                    positive_dir: s.positive_dir.unwrap_or(base.positive_dir),
                }
            }
            None => CaptureLayout::default(),
        };

        let mut model = ModelConfig::default();
        if let Some(m) = file.model {
            if let Some(path) = m.path {
                model.path = path;
            }
            if let Some(input_size) = m.input_size {
                model.params.input_size = input_size;
            }
            if let Some(threshold) = m.confidence_threshold {
                model.params.confidence_threshold = threshold;
            }
            if let Some(threshold) = m.iou_threshold {
                model.params.iou_threshold = threshold;
            }
            if let Some(max) = m.max_detections {
                model.params.max_detections = max;
            }
        }

        let mut webhook = WebhookConfig::new(String::new());
        if let Some(w) = file.webhook {
            if let Some(url) = w.url {
                webhook.url = url;
            }
            if let Some(message) = w.message {
                webhook.message = message;
            }
            if let Some(secs) = w.timeout_secs {
                webhook.timeout = Duration::from_secs(secs);
            }
        }

        Self {
            interval: Duration::from_secs(file.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS)),
            target_class: file.target_class.unwrap_or(CAT_CLASS_ID),
            log_dir: file
                .log_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            capture,
            layout,
            model,
            webhook,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(secs) = env_u64(ENV_INTERVAL_SECS)? {
            self.interval = Duration::from_secs(secs);
        }
        if let Some(class) = env_u64(ENV_TARGET_CLASS)? {
            self.target_class = u32::try_from(class)
                .map_err(|_| anyhow!("{} is out of range", ENV_TARGET_CLASS))?;
        }
        if let Some(path) = env_nonempty(ENV_MODEL_PATH) {
            self.model.path = PathBuf::from(path);
        }
        if let Some(root) = env_nonempty(ENV_CAPTURE_DIR) {
            self.layout = CaptureLayout::under(root);
        }
        if let Some(secs) = env_u64(ENV_CAPTURE_TIMEOUT_SECS)? {
            self.capture.timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = env_nonempty(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(url) = env_nonempty(ENV_WEBHOOK_URL) {
            self.webhook.url = url;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(anyhow!("interval must be greater than zero"));
        }
        if self.capture.timeout.is_zero() {
            return Err(anyhow!("capture timeout must be greater than zero"));
        }
        parse_resolution(&self.capture.resolution)?;

        let params = &self.model.params;
        if params.input_size == 0 {
            return Err(anyhow!("model input_size must be greater than zero"));
        }
        if !(params.confidence_threshold > 0.0 && params.confidence_threshold <= 1.0) {
            return Err(anyhow!("confidence_threshold must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&params.iou_threshold) {
            return Err(anyhow!("iou_threshold must be in [0, 1]"));
        }

        if self.webhook.url.trim().is_empty() {
            return Err(anyhow!("{} must be set", ENV_WEBHOOK_URL));
        }
        validate_webhook_url(&self.webhook.url)?;
        self.webhook.url = self.webhook.url.trim().to_string();
        if self.webhook.timeout.is_zero() {
            return Err(anyhow!("webhook timeout must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentryConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    env_nonempty(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|_| anyhow!("{} must be a non-negative integer", key))
        })
        .transpose()
}
