use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::app::ports::CorrectionPort;
use crate::config::CollaboratorConfig;
use crate::domain::{CorrectedBundle, CorrectionRequest};
use crate::error::{ReconError, Result};

/// Collaborators sometimes wrap the JSON object in a Markdown code fence
/// despite being told not to; unwrap a single fence before parsing.
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").expect("valid code fence regex")
});

/// HTTP adapter for the correction collaborator, speaking the generative
/// language API's `generateContent` wire format.
pub struct CollaboratorClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl CollaboratorClient {
    pub fn new(config: &CollaboratorConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            client,
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

#[async_trait]
impl CorrectionPort for CollaboratorClient {
    #[instrument(skip_all)]
    async fn correct(&self, request: &CorrectionRequest) -> Result<CorrectedBundle> {
        let prompt = request.render_prompt()?;
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        debug!(model = %self.model, "sending correction request to collaborator");
        let response = self.client.post(&url).json(&body).send().await?;
        let response = response.error_for_status()?;
        let body_text = response.text().await?;

        decode_response(&body_text)
    }
}

/// Decode the service envelope and the corrected bundle inside it. Every
/// failure past the transport layer is a contract violation.
pub(crate) fn decode_response(body: &str) -> Result<CorrectedBundle> {
    let envelope: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ReconError::Contract(format!("unparsable service envelope: {e}")))?;

    let text = envelope
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| ReconError::Contract("response carried no candidate text".to_string()))?;

    parse_corrected_bundle(&text)
}

pub(crate) fn parse_corrected_bundle(text: &str) -> Result<CorrectedBundle> {
    let trimmed = text.trim();
    let unfenced = match CODE_FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(trimmed),
        None => trimmed,
    };
    serde_json::from_str(unfenced)
        .map_err(|e| ReconError::Contract(format!("malformed corrected bundle: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE_JSON: &str = r#"{
        "consolidatedInventory": [
            {"item_id": "A1", "item_name": "WIDGET", "inventory_qty": -2,
             "last_updated": "2024-01-03", "_source": "AI-Corrected",
             "_ai_explanation": "Subtracted 12 returned units"}
        ],
        "consolidatedOrders": [],
        "consolidatedReturns": [],
        "report": {"fixesApplied": ["x"], "rootCauseAnalysis": [], "recommendations": []}
    }"#;

    #[test]
    fn parses_a_bare_json_bundle() {
        let bundle = parse_corrected_bundle(BUNDLE_JSON).unwrap();
        assert_eq!(bundle.consolidated_inventory.len(), 1);
        let row = &bundle.consolidated_inventory[0];
        assert_eq!(row.number("inventory_qty"), Some(-2.0));
        assert_eq!(row.text("_ai_explanation"), Some("Subtracted 12 returned units"));
    }

    #[test]
    fn unwraps_a_markdown_code_fence() {
        let fenced = format!("```json\n{BUNDLE_JSON}\n```");
        assert!(parse_corrected_bundle(&fenced).is_ok());
        let plain_fence = format!("```\n{BUNDLE_JSON}\n```");
        assert!(parse_corrected_bundle(&plain_fence).is_ok());
    }

    #[test]
    fn garbage_is_a_contract_violation() {
        let err = parse_corrected_bundle("the data looks fine to me").unwrap_err();
        assert!(matches!(err, ReconError::Contract(_)));
    }

    #[test]
    fn decodes_the_full_service_envelope() {
        let envelope = serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": BUNDLE_JSON}]}}
            ]
        });
        let bundle = decode_response(&envelope.to_string()).unwrap();
        assert_eq!(bundle.report.fixes_applied, vec!["x".to_string()]);
    }

    #[test]
    fn empty_candidates_are_a_contract_violation() {
        let err = decode_response(r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, ReconError::Contract(_)));
    }
}
