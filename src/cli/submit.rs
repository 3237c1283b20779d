use anyhow::{Context, Result};
use std::io::Read;
use std::path::PathBuf;

/// Read a JSON criteria batch from a file or stdin and push it to the running
/// daemon's ingest endpoint.
pub async fn run(file: Option<PathBuf>, url: Option<String>) -> Result<()> {
    let body = match file {
        Some(path) => std::fs::read(&path)
            .with_context(|| format!("Failed to read batch file: {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read batch from stdin")?;
            buf
        }
    };

    let base = crate::cli::daemon_url(url)?;
    let response = reqwest::Client::new()
        .post(format!("{base}/criteria"))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .context("Failed to reach the daemon - is it running?")?;

    let status = response.status();
    let payload: serde_json::Value = response
        .json()
        .await
        .context("Failed to decode daemon response")?;

    if status.is_success() {
        println!("Accepted {} criteria", payload["accepted"]);
        Ok(())
    } else {
        anyhow::bail!(
            "Batch rejected: {}",
            payload["error"].as_str().unwrap_or("unknown error")
        );
    }
}
