//! Gemini client for scene-by-scene clip analysis.
//!
//! The clip travels inline as a base64 part next to the storyboard
//! prompt; the response is requested as JSON and parsed straight into a
//! [`Storyboard`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use storylens_models::{Storyboard, RECOMMENDED_MAX_CLIP_SECS};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

pub use crate::config::DEFAULT_MODEL;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Seam for the external analysis collaborator.
#[async_trait]
pub trait StoryboardAnalyzer: Send + Sync {
    /// Analyze an inline video payload into a storyboard.
    async fn analyze(&self, video_base64: &str, mime_type: &str) -> EngineResult<Storyboard>;
}

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
            client: Client::new(),
        }
    }

    /// Create a client from `GEMINI_API_KEY` and the engine config.
    pub fn from_env(config: &EngineConfig) -> EngineResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| EngineError::config_error("GEMINI_API_KEY not set"))?;
        Ok(Self::new(api_key, config.model.clone()))
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the storyboard prompt.
    fn build_prompt(&self) -> String {
        format!(
            r#"You are a professional film editor and AI prompting expert.
Break down this video (max {max_secs}s) into a professional storyboard for video reproduction.

CRITICAL REQUIREMENTS:
1. The first item MUST be the Intro (00:00).
2. The last item MUST be the Outro (the final frame).
3. Capture all significant shot changes in between.
4. EXTRACT ALL TEXT: Identify any on-screen text, subtitles, or spoken dialogue.

Return ONLY a single JSON object with this schema:
{{
  "title": "Short title for the clip",
  "summary": "Concise summary of the visual narrative",
  "scenes": [
    {{
      "timestamp": "MM:SS",
      "duration": "e.g. 3.2s",
      "shotType": "e.g. Medium Close Up",
      "cameraMovement": "e.g. Handheld Tracking or Static",
      "description": "Visual layout and color palette",
      "action": "What is physically happening",
      "lighting": "Lighting direction and temperature",
      "subtitles": "Any visible text/captions or spoken dialogue in this shot",
      "reproductionPrompt": "A detailed prompt for AI video generators (Sora/Veo) to recreate this specific shot. Include lens, subject, environment, and motion."
    }}
  ]
}}

Additional instructions:
- Return ONLY a single JSON object and nothing else.
- Ensure all timestamps are in "MM:SS" or "HH:MM:SS" format.
- Provide a concise summary of the visual narrative.
"#,
            max_secs = RECOMMENDED_MAX_CLIP_SECS
        )
    }
}

#[async_trait]
impl StoryboardAnalyzer for GeminiClient {
    async fn analyze(&self, video_base64: &str, mime_type: &str) -> EngineResult<Storyboard> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::inline(mime_type, video_base64),
                    Part::text(self.build_prompt()),
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        info!(model = %self.model, "requesting storyboard analysis");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::external(format!("analysis request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EngineError::external(format!(
                "analysis service returned {}: {}",
                status, error_text
            )));
        }

        let body: GeminiResponse = response.json().await.map_err(|e| {
            EngineError::external(format!("failed to parse analysis response: {}", e))
        })?;

        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or(EngineError::EmptyResponse)?;

        // Strip markdown code fences some models wrap around JSON output.
        let text = text.trim();
        let text = text.strip_prefix("```json").unwrap_or(text);
        let text = text.strip_suffix("```").unwrap_or(text);
        let text = text.trim();

        if text.is_empty() {
            return Err(EngineError::EmptyResponse);
        }

        let storyboard: Storyboard = serde_json::from_str(text).map_err(|e| {
            EngineError::external(format!("failed to parse storyboard JSON: {}", e))
        })?;

        if storyboard.scenes.is_empty() {
            return Err(EngineError::EmptyResponse);
        }

        debug!(scenes = storyboard.scenes.len(), "storyboard parsed");
        Ok(storyboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn storyboard_json() -> String {
        json!({
            "title": "Morning Run",
            "summary": "A runner crosses a bridge at dawn.",
            "scenes": [{
                "timestamp": "00:00",
                "duration": "2.0s",
                "shotType": "Wide",
                "cameraMovement": "Static",
                "description": "Blue hour skyline",
                "action": "Runner enters frame",
                "lighting": "Cold ambient",
                "subtitles": "",
                "reproductionPrompt": "Wide static shot of a runner at dawn"
            }]
        })
        .to_string()
    }

    fn gemini_body(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }] }
            }]
        })
    }

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key", "test-model").with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_analyze_parses_storyboard() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/test-model:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(&storyboard_json())))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let board = client.analyze("AAAA", "video/mp4").await.unwrap();
        assert_eq!(board.title, "Morning Run");
        assert_eq!(board.scenes.len(), 1);
        assert_eq!(board.scenes[0].shot_type, "Wide");
    }

    #[tokio::test]
    async fn test_analyze_strips_markdown_fences() {
        let server = MockServer::start().await;
        let fenced = format!("```json\n{}\n```", storyboard_json());
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(&fenced)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let board = client.analyze("AAAA", "video/mp4").await.unwrap();
        assert_eq!(board.scenes.len(), 1);
    }

    #[tokio::test]
    async fn test_no_candidates_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.analyze("AAAA", "video/mp4").await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_empty_scene_list_is_empty_response() {
        let server = MockServer::start().await;
        let body = json!({ "title": "t", "summary": "s", "scenes": [] }).to_string();
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(&body)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.analyze("AAAA", "video/mp4").await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_service_error_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.analyze("AAAA", "video/mp4").await.unwrap_err();
        let message = err.user_message();
        assert!(message.contains("429"));
        assert!(message.contains("quota exceeded"));
    }

    #[test]
    fn test_prompt_carries_the_contract() {
        let client = GeminiClient::new("k", "m");
        let prompt = client.build_prompt();
        assert!(prompt.contains("Intro (00:00)"));
        assert!(prompt.contains("Outro"));
        assert!(prompt.contains("reproductionPrompt"));
        assert!(prompt.contains("max 70s"));
    }
}
