//! Discord-style webhook notifier.
//!
//! Sends `multipart/form-data` with a `content` text field and the JPEG as a
//! `file` part named `<timestamp>.jpg`. Anything other than a 2xx response is
//! a failure.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use url::Url;

use super::{MultipartForm, Notifier};
use crate::cycle::CycleTimestamp;

const DEFAULT_MESSAGE: &str = "cat detected";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const FILE_FIELD: &str = "file";
const MAX_ERROR_BODY: u64 = 512;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookConfig {
    pub url: String,
    /// Text sent in the `content` field.
    pub message: String,
    pub timeout: Duration,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: DEFAULT_MESSAGE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Parse a webhook URL, accepting only http(s).
pub fn validate_webhook_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| anyhow!("invalid webhook url: {}", e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!(
            "unsupported webhook scheme '{}'; expected http or https",
            other
        )),
    }
}

pub struct WebhookNotifier {
    config: WebhookConfig,
    agent: ureq::Agent,
}

impl WebhookNotifier {
    pub fn new(mut config: WebhookConfig) -> Result<Self> {
        validate_webhook_url(&config.url)?;
        config.url = config.url.trim().to_string();
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Ok(Self { config, agent })
    }

    fn build_form(&self, image_path: &Path, ts: &CycleTimestamp) -> Result<MultipartForm> {
        let bytes = fs::read(image_path)
            .with_context(|| format!("failed to read {}", image_path.display()))?;
        Ok(MultipartForm::new()
            .text("content", &self.config.message)
            .file(FILE_FIELD, &ts.file_name(), "image/jpeg", &bytes))
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn notify(&mut self, image_path: &Path, ts: &CycleTimestamp) -> Result<()> {
        let form = self.build_form(image_path, ts)?;
        let content_type = form.content_type();
        let body = form.finish();

        let response = match self
            .agent
            .post(&self.config.url)
            .set("Content-Type", &content_type)
            .send_bytes(&body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(anyhow!(
                    "webhook returned HTTP {}: {}",
                    code,
                    error_body(response)
                ))
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(anyhow!("webhook transport error: {}", transport))
            }
        };

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(anyhow!("webhook returned HTTP {}", status));
        }
        log::info!("notification sent for {}", ts);
        Ok(())
    }
}

fn error_body(response: ureq::Response) -> String {
    let mut text = String::new();
    let _ = response
        .into_reader()
        .take(MAX_ERROR_BODY)
        .read_to_string(&mut text);
    text.trim().to_string()
}
