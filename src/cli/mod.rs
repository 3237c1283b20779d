pub mod status;
pub mod submit;

use crate::core::settings::Settings;
use anyhow::Result;

/// Base URL of the running daemon: an explicit `--url` wins, otherwise the
/// configured ingest bind address.
pub fn daemon_url(override_url: Option<String>) -> Result<String> {
    match override_url {
        Some(url) => Ok(url.trim_end_matches('/').to_string()),
        None => {
            let settings = Settings::load()?;
            Ok(format!("http://{}", settings.ingest.bind))
        }
    }
}
