//! Remote content loading
//!
//! A content document is fetched once at startup from an `http(s)` URL or a
//! local file and replaces the configured content table.

use crate::config::ContentConfig;
use crate::error::{MuseError, Result};
use std::path::Path;
use tracing::info;

/// Whether `source` names an http(s) resource
pub fn is_remote_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Load a content document from a URL or a path relative to `base_dir`
pub async fn load_content(source: &str, base_dir: &Path) -> Result<ContentConfig> {
    let body = if is_remote_url(source) {
        fetch(source).await?
    } else {
        let path = base_dir.join(source);
        tokio::fs::read_to_string(&path).await?
    };

    let content = ContentConfig::from_json_str(&body)?;
    info!(
        "Loaded {} content items from {}",
        content.item_count(),
        source
    );
    Ok(content)
}

async fn fetch(url: &str) -> Result<String> {
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| MuseError::RemoteFetch(e.to_string()))?;

    if !response.status().is_success() {
        return Err(MuseError::RemoteStatus(response.status().as_u16()));
    }

    response
        .text()
        .await
        .map_err(|e| MuseError::RemoteFetch(e.to_string()))
}
