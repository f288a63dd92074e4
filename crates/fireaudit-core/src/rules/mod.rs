//! Rule acquisition: explicit file, Firebase CLI, Firebase Rules API.
//!
//! Sources are tried in that order; the first success wins. CLI and API
//! failures inside the chain are soft: logged at debug level, then the next
//! source is tried. Only when every source is exhausted does resolution fail
//! with `NotFound`. A transport or auth fault while talking to the Rules API
//! is not a soft failure; it surfaces as `Internal` so the operator can tell
//! "unreachable" apart from "nothing there".

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AuditError, Result};

mod auth;

pub use auth::discover_access_token;

/// Literal substring that identifies Firestore rules among arbitrary text.
pub const FIRESTORE_MARKER: &str = "service cloud.firestore";

const RULES_API_BASE: &str = "https://firebaserules.googleapis.com/v1";

/// Where a rule document came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOrigin {
    File(PathBuf),
    Cli,
    Api,
}

/// One resolved Firestore security-rules source. Immutable once created;
/// the text is guaranteed non-empty.
#[derive(Debug, Clone)]
pub struct RuleDocument {
    pub text: String,
    pub origin: RuleOrigin,
}

impl RuleDocument {
    pub fn byte_len(&self) -> usize {
        self.text.len()
    }
}

/// Load rules from an explicit local file. A missing path is `NotFound`;
/// any other read fault is `Internal`. Empty content fails resolution.
pub fn load_rules_file(path: &Path) -> Result<RuleDocument> {
    info!(path = %path.display(), "Loading rules from file");

    if !path.exists() {
        return Err(AuditError::not_found("Rules file", path.display().to_string()));
    }

    let text = std::fs::read_to_string(path)
        .map_err(|e| AuditError::Internal(format!("Failed to read rules file: {}", e)))?;

    if text.trim().is_empty() {
        return Err(AuditError::not_found("Rules file", path.display().to_string()));
    }

    info!(bytes = text.len(), "Rules file loaded");
    Ok(RuleDocument {
        text,
        origin: RuleOrigin::File(path.to_path_buf()),
    })
}

/// Fetch rules for a project: Firebase CLI first, then the Rules API.
/// Each source is attempted exactly once; no retries.
pub async fn fetch_rules_from_project(
    project_id: &str,
    http: &reqwest::Client,
) -> Result<RuleDocument> {
    info!(project_id, "Attempting to fetch Firestore security rules");

    if let Some(text) = try_fetch_with_cli(project_id) {
        info!("Successfully fetched rules via Firebase CLI");
        return Ok(RuleDocument {
            text,
            origin: RuleOrigin::Cli,
        });
    }

    if let Some(text) = try_fetch_with_api(project_id, http).await? {
        info!("Successfully fetched rules via Firebase Rules API");
        return Ok(RuleDocument {
            text,
            origin: RuleOrigin::Api,
        });
    }

    Err(AuditError::not_found(
        "Firestore security rules",
        project_id,
    ))
}

/// Try the Firebase CLI. Missing binary, non-zero exit, or output lacking
/// the Firestore marker are all soft failures.
fn try_fetch_with_cli(project_id: &str) -> Option<String> {
    debug!(project_id, "Trying to fetch rules via Firebase CLI");

    let output = Command::new("firebase")
        .arg("firestore:rules")
        .arg(format!("--project={}", project_id))
        .output();

    let output = match output {
        Ok(out) => out,
        Err(e) => {
            debug!(error = %e, "Firebase CLI not available");
            return None;
        }
    };

    if !output.status.success() {
        debug!(status = ?output.status.code(), "Firebase CLI exited with failure");
        return None;
    }

    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    if accept_cli_output(&text) {
        Some(text)
    } else {
        debug!("Firebase CLI output did not contain valid Firestore rules");
        None
    }
}

/// CLI stdout counts as rules only when it carries the Firestore marker.
fn accept_cli_output(stdout: &str) -> bool {
    stdout.contains(FIRESTORE_MARKER)
}

#[derive(Debug, Deserialize)]
struct RulesetListResponse {
    #[serde(default)]
    rulesets: Vec<RulesetRef>,
}

#[derive(Debug, Deserialize)]
struct RulesetRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RulesetContentResponse {
    #[serde(default)]
    source: Option<RulesetSource>,
}

#[derive(Debug, Deserialize)]
struct RulesetSource {
    #[serde(default)]
    files: Vec<RulesetFile>,
}

#[derive(Debug, Deserialize)]
struct RulesetFile {
    #[serde(default)]
    content: Option<String>,
}

/// Try the Firebase Rules API. `Ok(None)` means a soft failure (no rulesets,
/// no files, no marker match); transport/auth faults are `Internal`.
async fn try_fetch_with_api(
    project_id: &str,
    http: &reqwest::Client,
) -> Result<Option<String>> {
    debug!(project_id, "Trying to fetch rules via Firebase Rules API");

    let token = auth::discover_access_token(http).await?;

    let list_url = format!("{}/projects/{}/rulesets", RULES_API_BASE, project_id);
    let rulesets: RulesetListResponse = api_get(http, &list_url, &token).await?;

    // First entry is the latest ruleset per API ordering.
    let Some(latest) = rulesets.rulesets.first() else {
        debug!("No rulesets found for this project");
        return Ok(None);
    };

    let content_url = format!("{}/{}", RULES_API_BASE, latest.name);
    let content: RulesetContentResponse = api_get(http, &content_url, &token).await?;

    let files = content.source.map(|s| s.files).unwrap_or_default();
    if files.is_empty() {
        debug!("Ruleset contains no files");
        return Ok(None);
    }

    match select_rules_file(files.iter().filter_map(|f| f.content.as_deref())) {
        Some(text) => Ok(Some(text.to_string())),
        None => {
            debug!("No Firestore rules found in ruleset");
            Ok(None)
        }
    }
}

/// Pick the first file whose content carries the Firestore marker.
fn select_rules_file<'a>(contents: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    contents
        .into_iter()
        .find(|content| content.contains(FIRESTORE_MARKER))
}

async fn api_get<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    token: &str,
) -> Result<T> {
    let resp = http
        .get(url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| AuditError::Internal(format!("Failed to access Firebase Rules API: {}", e)))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AuditError::Internal(format!(
            "Failed to access Firebase Rules API ({}): {}",
            status, body
        )));
    }

    resp.json::<T>().await.map_err(|e| {
        AuditError::Internal(format!("Failed to parse Firebase Rules API response: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_RULES: &str = "rules_version = '2';\nservice cloud.firestore {\n  match /databases/{database}/documents {\n    allow read, write: if true;\n  }\n}\n";

    #[test]
    fn load_rules_file_returns_exact_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_RULES.as_bytes()).unwrap();

        let doc = load_rules_file(file.path()).unwrap();
        assert_eq!(doc.text, SAMPLE_RULES);
        assert_eq!(doc.byte_len(), SAMPLE_RULES.len());
        assert_eq!(doc.origin, RuleOrigin::File(file.path().to_path_buf()));
    }

    #[test]
    fn load_rules_file_missing_path_is_not_found() {
        let err = load_rules_file(Path::new("/nonexistent/firestore.rules")).unwrap_err();
        assert!(matches!(err, AuditError::NotFound { .. }));
    }

    #[test]
    fn load_rules_file_rejects_empty_content() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = load_rules_file(file.path()).unwrap_err();
        assert!(matches!(err, AuditError::NotFound { .. }));
    }

    #[test]
    fn cli_output_requires_marker() {
        assert!(accept_cli_output(SAMPLE_RULES));
        assert!(!accept_cli_output("Error: not logged in"));
        assert!(!accept_cli_output(""));
        // Well-formed text without the marker is still rejected.
        assert!(!accept_cli_output("rules_version = '2';\nservice firebase.storage {}"));
    }

    #[test]
    fn select_rules_file_picks_first_marker_match() {
        let files = vec![
            "service firebase.storage { }",
            SAMPLE_RULES,
            "service cloud.firestore { /* second match, ignored */ }",
        ];
        assert_eq!(select_rules_file(files.iter().copied()), Some(SAMPLE_RULES));
    }

    #[test]
    fn select_rules_file_none_when_no_match() {
        let files = vec!["service firebase.storage { }", "plain text"];
        assert_eq!(select_rules_file(files.iter().copied()), None);
    }

    #[test]
    fn ruleset_list_deserializes_api_shape() {
        let json = r#"{"rulesets":[{"name":"projects/p/rulesets/abc","createTime":"2024-01-01T00:00:00Z"}]}"#;
        let parsed: RulesetListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.rulesets.len(), 1);
        assert_eq!(parsed.rulesets[0].name, "projects/p/rulesets/abc");
    }

    #[test]
    fn ruleset_list_tolerates_empty_response() {
        let parsed: RulesetListResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.rulesets.is_empty());
    }

    #[test]
    fn ruleset_content_deserializes_api_shape() {
        let json = r#"{"source":{"files":[{"name":"firestore.rules","content":"service cloud.firestore {}"}]}}"#;
        let parsed: RulesetContentResponse = serde_json::from_str(json).unwrap();
        let files = parsed.source.unwrap().files;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content.as_deref(), Some("service cloud.firestore {}"));
    }
}
