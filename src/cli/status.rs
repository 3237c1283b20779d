use anyhow::{Context, Result};

/// Query the running daemon's `/status` surface.
pub async fn run(json: bool, url: Option<String>) -> Result<()> {
    let base = crate::cli::daemon_url(url)?;
    let payload: serde_json::Value = reqwest::get(format!("{base}/status"))
        .await
        .context("Failed to reach the daemon - is it running?")?
        .error_for_status()
        .context("Status request failed")?
        .json()
        .await
        .context("Failed to decode status response")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("polling enabled:    {}", payload["polling_enabled"]);
        println!("transport failures: {}", payload["transport_failures"]);
    }

    Ok(())
}
