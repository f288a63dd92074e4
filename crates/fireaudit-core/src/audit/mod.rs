//! LLM audit client for Firestore security rules.
//!
//! The external model is the single point of non-determinism in the pipeline,
//! so it sits behind the narrow [`Analyzer`] trait: build the request
//! deterministically, validate the response deterministically, and surface
//! exactly one of validated result or typed failure. Tests substitute a mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::error::{AuditError, Result};


/// Risk classification of a finding, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// One finding reported by the analysis. The location is a free-text pointer
/// into the rule text and is not validated against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Validated audit result. Vulnerabilities keep the order the model returned
/// them in (order = significance); the rating is within [1, 10].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    pub summary: String,
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(rename = "bestPractices")]
    pub best_practices: Vec<String>,
    #[serde(rename = "overallRating")]
    pub overall_rating: u8,
}

/// Rule text plus optional project identifier, packaged for one dispatch.
#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub rules: String,
    pub project_id: Option<String>,
}

impl AuditRequest {
    pub fn new(rules: impl Into<String>, project_id: Option<String>) -> Self {
        Self {
            rules: rules.into(),
            project_id,
        }
    }
}

/// Caller-selected response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditMode {
    /// Schema-constrained [`AuditResult`].
    Structured,
    /// Free-form text, returned without validation.
    Text,
}

/// What the analysis produced, matching the requested mode.
#[derive(Debug, Clone)]
pub enum AuditOutcome {
    Structured(AuditResult),
    Text(String),
}

/// Narrow seam around the external analysis capability.
#[async_trait]
pub trait Analyzer {
    async fn analyze(&self, request: &AuditRequest, mode: AuditMode) -> Result<AuditOutcome>;
}

// ─── Prompt construction ────────────────────────────────────────────────────

const PROMPT_PREAMBLE: &str = "\
You are a Firebase security expert conducting an audit of Firestore security rules.

Please analyze the following Firestore security rules carefully and provide a comprehensive security assessment.

Focus on:
1. Identifying any security vulnerabilities or overly permissive rules
2. Checking for proper authentication requirements
3. Evaluating data validation rules
4. Assessing field-level security
5. Identifying any potential performance issues
6. Suggesting best practices improvements
";

/// Build the analysis prompt, embedding the rule text verbatim. Same inputs
/// always produce the same prompt.
pub fn build_audit_prompt(request: &AuditRequest, mode: AuditMode) -> String {
    let mut prompt = String::from(PROMPT_PREAMBLE);

    if let Some(ref project_id) = request.project_id {
        prompt.push_str(&format!("\nProject ID: {}\n", project_id));
    }

    prompt.push_str(&format!("\nFirestore Rules:\n```\n{}\n```\n", request.rules));

    match mode {
        AuditMode::Structured => {
            prompt.push_str(
                "\nRespond with a JSON object (and nothing else) with this exact shape:\n\
                 {\n\
                 \x20 \"summary\": string,\n\
                 \x20 \"vulnerabilities\": [{\"severity\": \"low\"|\"medium\"|\"high\"|\"critical\", \
                 \"description\": string, \"recommendation\": string, \"location\": string (optional)}],\n\
                 \x20 \"bestPractices\": [string],\n\
                 \x20 \"overallRating\": integer from 1 to 10\n\
                 }\n\
                 List vulnerabilities in order of significance.\n",
            );
        }
        AuditMode::Text => {
            prompt.push_str(
                "\nProvide your analysis in a clear, readable format with sections for:\n\
                 - Summary\n\
                 - Vulnerabilities\n\
                 - Recommendations\n\
                 - Best Practices\n",
            );
        }
    }

    prompt
}

// ─── Response validation ────────────────────────────────────────────────────

/// Validate raw model output against the audit-result schema. Pure function,
/// independent of the transport; any failure is `Analysis` and no partial
/// result is ever produced.
pub fn parse_audit_result(raw: &str) -> Result<AuditResult> {
    let payload = extract_json_payload(raw);
    let result: AuditResult = serde_json::from_str(payload)
        .map_err(|e| AuditError::Analysis(format!("invalid audit result: {}", e)))?;

    if !(1..=10).contains(&result.overall_rating) {
        return Err(AuditError::Analysis(format!(
            "overall rating {} outside 1-10",
            result.overall_rating
        )));
    }

    Ok(result)
}

/// Strip a Markdown code fence if the model wrapped its JSON in one.
fn extract_json_payload(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// ─── LLM-backed analyzer ────────────────────────────────────────────────────

/// Analyzer backed by an OpenAI-compatible chat completions endpoint.
pub struct LlmAnalyzer {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl LlmAnalyzer {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| AuditError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn chat_completion(&self, prompt: &str, mode: AuditMode) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);

        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.2,
        });
        if mode == AuditMode::Structured {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AuditError::Analysis(format!("LLM API request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(AuditError::Analysis(format!(
                "LLM API error ({}): {}",
                status, body_text
            )));
        }

        let response: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| AuditError::Analysis(format!("failed to parse LLM API response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AuditError::Analysis("LLM returned no content".to_string()))
    }
}

#[async_trait]
impl Analyzer for LlmAnalyzer {
    async fn analyze(&self, request: &AuditRequest, mode: AuditMode) -> Result<AuditOutcome> {
        info!("Starting security rules audit");
        let prompt = build_audit_prompt(request, mode);

        debug!(mode = ?mode, "Sending rules to AI for analysis");
        let content = self.chat_completion(&prompt, mode).await?;

        match mode {
            AuditMode::Structured => {
                let result = parse_audit_result(&content)?;
                info!(
                    rating = result.overall_rating,
                    vulnerabilities = result.vulnerabilities.len(),
                    "Audit completed"
                );
                Ok(AuditOutcome::Structured(result))
            }
            AuditMode::Text => {
                info!("Simplified audit completed");
                Ok(AuditOutcome::Text(content))
            }
        }
    }
}

// ─── Response types ─────────────────────────────────────────────────────────
// Fields id/model/usage/index/finish_reason/role are required for API
// deserialization but not read by our code.

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ChatCompletionResponse {
    id: Option<String>,
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Choice {
    index: Option<u32>,
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ChoiceMessage {
    role: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}
