//! Shared HTTP plumbing for the hosted model clients.

use anyhow::Result;
use std::time::Duration;

use crate::error::PipelineError;

/// Build a client, applying `timeout_secs` when set.
pub fn client(timeout_secs: Option<u64>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// Send `request` and decode a JSON body, tagging every failure as a
/// remote error of `service`. No retries.
pub async fn send_json(
    service: &str,
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, PipelineError> {
    let response = request
        .send()
        .await
        .map_err(|e| PipelineError::remote(service, e))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PipelineError::remote(
            service,
            format!("HTTP {}: {}", status, body.trim()),
        ));
    }
    response
        .json()
        .await
        .map_err(|e| PipelineError::remote(service, format!("invalid response body: {}", e)))
}

/// Strip trailing slashes so paths can be appended with `format!`.
pub fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
