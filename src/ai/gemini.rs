use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;
use crate::models::{ReportKind, Source};

use super::generator::{GeneratedReport, GenerationError, ReportGenerator};
use super::prompts::PromptTemplates;

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_MODEL: &str = "gemini-3-flash-preview";
pub const NO_CONTENT_PLACEHOLDER: &str = "No content generated.";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    prompts: PromptTemplates,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, prompts: PromptTemplates, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("marketflow/1.0")
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: GEMINI_MODEL.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            timeout,
            prompts,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn classify_send_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::timeout(self.timeout)
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ReportGenerator for GeminiClient {
    async fn generate(&self, kind: ReportKind) -> std::result::Result<GeneratedReport, GenerationError> {
        let Some(api_key) = &self.api_key else {
            return Err(GenerationError::Credential("no API key configured".to_string()));
        };

        let prompt = self.prompts.render(kind, Local::now());
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![RequestPart { text: prompt }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
        };

        tracing::debug!("Requesting {} report from {}", kind, self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        if !status.is_success() {
            return Err(classify_api_error(status, &body));
        }

        Ok(parse_response(&body))
    }
}

fn classify_api_error(status: StatusCode, body: &str) -> GenerationError {
    let (message, api_status) = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => (parsed.error.message, parsed.error.status),
        Err(_) => (body.trim().to_string(), String::new()),
    };

    if status == StatusCode::TOO_MANY_REQUESTS
        || api_status == "RESOURCE_EXHAUSTED"
        || message.contains("Quota")
        || message.contains("quota")
    {
        return GenerationError::RateLimit(message);
    }

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || message.contains("API key")
    {
        return GenerationError::Credential(message);
    }

    GenerationError::Transport(format!("HTTP {}: {}", status.as_u16(), message))
}

// Extracts the text body and web citations. A body that cannot be parsed
// degrades to placeholder content with no sources.
fn parse_response(body: &str) -> GeneratedReport {
    let parsed: GenerateResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Unparseable generation response: {}", e);
            return GeneratedReport {
                content: NO_CONTENT_PLACEHOLDER.to_string(),
                sources: Vec::new(),
            };
        }
    };

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return GeneratedReport {
            content: NO_CONTENT_PLACEHOLDER.to_string(),
            sources: Vec::new(),
        };
    };

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    let content = if text.trim().is_empty() {
        NO_CONTENT_PLACEHOLDER.to_string()
    } else {
        text
    };

    let sources = candidate
        .grounding_metadata
        .map(|metadata| {
            metadata
                .grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| {
                    let url = web.uri.filter(|uri| Url::parse(uri).is_ok())?;
                    let title = web
                        .title
                        .filter(|title| !title.trim().is_empty())
                        .unwrap_or_else(|| url.clone());
                    Some(Source { title, url })
                })
                .collect()
        })
        .unwrap_or_default();

    GeneratedReport { content, sources }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/models/gemini-test:generateContent";

    fn client(server: &MockServer, api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            api_key.map(str::to_string),
            PromptTemplates::new("English"),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_model("gemini-test")
        .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn sends_prompt_with_search_tool_and_parses_citations() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({ "tools": [{ "google_search": {} }] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "| Stock |" }, { "text": " table" }] },
                    "groundingMetadata": {
                        "groundingChunks": [
                            { "web": { "uri": "https://www.reuters.com/a", "title": "Reuters" } },
                            { "web": { "title": "No link" } },
                            { "web": { "uri": "https://www.cnbc.com/b" } },
                            { "retrievedContext": {} }
                        ]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let report = client(&server, Some("test-key"))
            .generate(ReportKind::Morning)
            .await
            .unwrap();

        assert_eq!(report.content, "| Stock | table");
        assert_eq!(
            report.sources,
            vec![
                Source {
                    title: "Reuters".into(),
                    url: "https://www.reuters.com/a".into(),
                },
                Source {
                    title: "https://www.cnbc.com/b".into(),
                    url: "https://www.cnbc.com/b".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn duplicate_citations_are_kept_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "news" }] },
                    "groundingMetadata": {
                        "groundingChunks": [
                            { "web": { "uri": "https://a.example/", "title": "A" } },
                            { "web": { "uri": "https://b.example/", "title": "B" } },
                            { "web": { "uri": "https://a.example/", "title": "A" } }
                        ]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let report = client(&server, Some("k"))
            .generate(ReportKind::Evening)
            .await
            .unwrap();

        let titles: Vec<&str> = report.sources.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "A"]);
    }

    #[tokio::test]
    async fn missing_text_falls_back_to_placeholder() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [] } }]
            })))
            .mount(&server)
            .await;

        let report = client(&server, Some("k"))
            .generate(ReportKind::Evening)
            .await
            .unwrap();

        assert_eq!(report.content, NO_CONTENT_PLACEHOLDER);
        assert!(report.sources.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_degrades_to_placeholder() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let report = client(&server, Some("k"))
            .generate(ReportKind::Morning)
            .await
            .unwrap();

        assert_eq!(report.content, NO_CONTENT_PLACEHOLDER);
        assert!(report.sources.is_empty());
    }

    #[tokio::test]
    async fn quota_error_maps_to_rate_limit() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "code": 429,
                    "message": "Quota exceeded for metric",
                    "status": "RESOURCE_EXHAUSTED"
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server, Some("k"))
            .generate(ReportKind::Morning)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::RateLimit(_)));
    }

    #[tokio::test]
    async fn invalid_key_maps_to_credential_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server, Some("bad"))
            .generate(ReportKind::Morning)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Credential(_)));
    }

    #[tokio::test]
    async fn server_error_maps_to_transport() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = client(&server, Some("k"))
            .generate(ReportKind::Evening)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GenerationError::Transport("HTTP 503: unavailable".into())
        );
    }

    #[tokio::test]
    async fn missing_key_fails_without_network_call() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server, Some("  "))
            .generate(ReportKind::Morning)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Credential(_)));
    }

    #[tokio::test]
    async fn slow_service_maps_to_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = GeminiClient::new(
            Some("k".into()),
            PromptTemplates::new("English"),
            Duration::from_millis(200),
        )
        .unwrap()
        .with_model("gemini-test")
        .with_base_url(server.uri());

        let err = client.generate(ReportKind::Morning).await.unwrap_err();
        assert!(matches!(err, GenerationError::Timeout(_)));
    }
}
