use crate::engine::FallbackPolicy;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SESSION_DIR: &str = ".extracts";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub backend_url: String,
    pub timeout_secs: u64,
    pub fallback: FallbackPolicy,
    pub session_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            fallback: FallbackPolicy::default(),
            session_dir: PathBuf::from(DEFAULT_SESSION_DIR),
        }
    }
}

impl ClientConfig {
    /// Loads a YAML or TOML config file, picking the parser from the
    /// extension. A relative `session_dir` is resolved against the file's
    /// directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut config: ClientConfig = match ext.as_str() {
            "yml" | "yaml" => serde_yaml::from_str(&contents).context("parse config")?,
            "toml" | "tml" => toml::from_str(&contents).context("parse config")?,
            _ => serde_yaml::from_str(&contents)
                .or_else(|_| toml::from_str(&contents))
                .context("parse config (yaml or toml)")?,
        };
        if config.session_dir.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.session_dir = base.join(&config.session_dir);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.backend_url.trim();
        if url.is_empty() {
            anyhow::bail!("backend_url must not be empty");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("backend_url must be an http(s) URL, got {url}");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
