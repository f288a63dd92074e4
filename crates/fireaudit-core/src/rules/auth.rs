//! Ambient Google credential discovery for the Firebase Rules API.
//!
//! Mirrors Application Default Credentials lookup order as far as this tool
//! needs it: an explicit token in the environment, an authenticated gcloud
//! session, then the GCE metadata server. Each source is probed once.

use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{AuditError, Result};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
}

/// Discover an OAuth2 access token from the ambient environment. Failure to
/// find one anywhere is an auth fault, not a missing-rules condition.
pub async fn discover_access_token(http: &reqwest::Client) -> Result<String> {
    if let Ok(token) = std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN") {
        let token = token.trim().to_string();
        if !token.is_empty() {
            debug!("Using access token from GOOGLE_OAUTH_ACCESS_TOKEN");
            return Ok(token);
        }
    }

    if let Some(token) = try_gcloud_token() {
        debug!("Using access token from gcloud");
        return Ok(token);
    }

    if let Some(token) = try_metadata_token(http).await {
        debug!("Using access token from metadata server");
        return Ok(token);
    }

    Err(AuditError::Internal(
        "Failed to access Firebase Rules API: no Google credentials discovered \
         (set GOOGLE_OAUTH_ACCESS_TOKEN, run `gcloud auth login`, or run on GCE)"
            .to_string(),
    ))
}

fn try_gcloud_token() -> Option<String> {
    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .ok()?;
    if !output.status.success() {
        debug!(status = ?output.status.code(), "gcloud auth print-access-token failed");
        return None;
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

async fn try_metadata_token(http: &reqwest::Client) -> Option<String> {
    let resp = http
        .get(METADATA_TOKEN_URL)
        .header("Metadata-Flavor", "Google")
        .timeout(Duration::from_secs(2))
        .send()
        .await
        .ok()?;
    if !resp.status().is_success() {
        debug!(status = %resp.status(), "Metadata server token request failed");
        return None;
    }
    let parsed: MetadataTokenResponse = resp.json().await.ok()?;
    if parsed.access_token.is_empty() {
        None
    } else {
        Some(parsed.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_token_response_deserializes() {
        let json = r#"{"access_token":"ya29.abc","expires_in":3599,"token_type":"Bearer"}"#;
        let parsed: MetadataTokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token, "ya29.abc");
    }
}
