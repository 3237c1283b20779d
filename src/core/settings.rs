use anyhow::{Context, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub remote: RemoteSettings,
    pub polling: PollingSettings,
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub url: String,
    pub server_key: String,
    pub hardware_key: String,
    pub fetch_timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            server_key: String::new(),
            hardware_key: String::new(),
            fetch_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub enabled: bool,
    pub interval_secs: u64,
    pub rate_limit_wait_secs: u64,
    /// TTL stamped on poll-derived records; defaults to the poll interval.
    pub default_ttl_secs: Option<u64>,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            rate_limit_wait_secs: 120,
            default_ttl_secs: None,
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.rate_limit_wait_secs)
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl_secs.unwrap_or(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub bind: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:9505".to_string(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("criteria-relay").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path().context("Could not determine config directory")?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            tracing::info!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(?path, "Loaded config");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_secs == 0 {
            anyhow::bail!("polling.interval_secs must be at least 1");
        }
        if self.remote.fetch_timeout_secs == 0 {
            anyhow::bail!("remote.fetch_timeout_secs must be at least 1");
        }
        self.ingest
            .bind
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("ingest.bind is not a socket address: {}", self.ingest.bind))?;
        Ok(())
    }
}

/// Watches the config file and emits a freshly loaded `Settings` on change.
/// Invalid edits are logged and skipped, keeping the last good settings live.
pub struct SettingsWatcher {
    _watcher: RecommendedWatcher,
}

impl SettingsWatcher {
    pub fn start(path: PathBuf) -> Result<(Self, mpsc::UnboundedReceiver<Settings>)> {
        let (settings_tx, settings_rx) = mpsc::unbounded_channel::<Settings>();
        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<()>();

        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .context("Config path has no file name")?;
        let parent = path
            .parent()
            .map(|p| p.to_path_buf())
            .context("Config path has no parent directory")?;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Ok(event) = res {
                    if event.kind.is_modify() || event.kind.is_create() {
                        for changed in &event.paths {
                            if changed
                                .file_name()
                                .is_some_and(|f| f.to_string_lossy() == filename)
                            {
                                let _ = notify_tx.send(());
                            }
                        }
                    }
                }
            },
            Config::default(),
        )?;

        if parent.exists() {
            watcher
                .watch(&parent, RecursiveMode::NonRecursive)
                .with_context(|| format!("Failed to watch directory: {}", parent.display()))?;
            tracing::info!(?parent, "Watching config directory");
        } else {
            tracing::warn!(?parent, "Config directory does not exist, skipping watch");
        }

        tokio::spawn(async move {
            while notify_rx.recv().await.is_some() {
                // Editors fire bursts of events; settle before reloading.
                tokio::time::sleep(Duration::from_millis(200)).await;
                while notify_rx.try_recv().is_ok() {}

                match Settings::load_from(&path).and_then(|s| {
                    s.validate()?;
                    Ok(s)
                }) {
                    Ok(settings) => {
                        tracing::info!("Config file changed on disk, reloaded");
                        let _ = settings_tx.send(settings);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring config change that failed to load");
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, settings_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.polling.enabled);
        assert_eq!(settings.polling.interval_secs, 300);
        assert_eq!(settings.polling.rate_limit_wait_secs, 120);
        assert_eq!(settings.polling.default_ttl(), 300);
        assert_eq!(settings.remote.fetch_timeout_secs, 30);
        assert_eq!(settings.ingest.bind, "127.0.0.1:9505");
    }

    #[test]
    fn test_default_ttl_tracks_interval_unless_overridden() {
        let mut polling = PollingSettings::default();
        polling.interval_secs = 60;
        assert_eq!(polling.default_ttl(), 60);

        polling.default_ttl_secs = Some(900);
        assert_eq!(polling.default_ttl(), 900);
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.polling.interval_secs = 0;
        assert!(settings.validate().is_err());

        settings.polling.interval_secs = 60;
        settings.ingest.bind = "not-an-address".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [remote]
            url = "https://example.com/xmds"
            server_key = "abc"
            hardware_key = "display-01"
            fetch_timeout_secs = 10

            [polling]
            enabled = false
            interval_secs = 120
            rate_limit_wait_secs = 90
            default_ttl_secs = 600

            [ingest]
            bind = "0.0.0.0:9600"
        "#;

        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.remote.url, "https://example.com/xmds");
        assert_eq!(settings.remote.server_key, "abc");
        assert_eq!(settings.remote.hardware_key, "display-01");
        assert!(!settings.polling.enabled);
        assert_eq!(settings.polling.interval(), Duration::from_secs(120));
        assert_eq!(settings.polling.rate_limit_wait(), Duration::from_secs(90));
        assert_eq!(settings.polling.default_ttl(), 600);
        assert_eq!(settings.ingest.bind, "0.0.0.0:9600");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str("[polling]\ninterval_secs = 60\n").unwrap();
        assert_eq!(settings.polling.interval_secs, 60);
        assert!(settings.polling.enabled);
        assert_eq!(settings.remote.fetch_timeout_secs, 30);
    }
}
