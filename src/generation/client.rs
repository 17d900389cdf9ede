//! Gemini image generation client
//!
//! Provides:
//! - The `ImageGenerator` boundary used by the orchestrator
//! - `generateContent` request encoding (prompt + source map image)
//! - Response scanning for the first inline image
//! - Failure classification into `GenerationError`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{GenerationError, MalformedResponse};
use super::options::{AspectRatio, ImageSize};
use crate::config::Config;

/// Mime type of source and generated images
pub const PNG_MIME_TYPE: &str = "image/png";

/// One call to the generation endpoint
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub api_key: String,
    pub prompt: String,
    /// PNG bytes of the captured map or fantasy map image
    pub source_image: Arc<[u8]>,
    pub aspect_ratio: AspectRatio,
    pub image_size: ImageSize,
}

/// A generated image as returned by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Arc<[u8]>,
    pub mime_type: String,
}

/// The external image generation service
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, call: &GenerationCall) -> Result<GeneratedImage, GenerationError>;
}

/// generateContent request body
#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfigWire,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineDataWire },
}

#[derive(Debug, Serialize)]
struct InlineDataWire {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfigWire {
    response_modalities: [&'static str; 2],
    image_config: ImageConfigWire,
}

#[derive(Debug, Serialize)]
struct ImageConfigWire {
    aspect_ratio: &'static str,
    image_size: &'static str,
}

/// generateContent response body
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
struct ResponseInlineData {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
    data: Option<String>,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn build_request_body(call: &GenerationCall) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: vec![RequestContent {
            parts: vec![
                RequestPart::Text { text: &call.prompt },
                RequestPart::Image {
                    inline_data: InlineDataWire {
                        mime_type: PNG_MIME_TYPE,
                        data: BASE64.encode(&call.source_image),
                    },
                },
            ],
        }],
        generation_config: GenerationConfigWire {
            response_modalities: ["TEXT", "IMAGE"],
            image_config: ImageConfigWire {
                aspect_ratio: call.aspect_ratio.wire_value(),
                image_size: call.image_size.wire_value(),
            },
        },
    }
}

/// Map a non-2xx response onto the error taxonomy
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> GenerationError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("API error: {}", status)
            } else {
                body.to_string()
            }
        });

    if status == StatusCode::TOO_MANY_REQUESTS || message.to_lowercase().contains("quota") {
        GenerationError::QuotaExceeded
    } else if (status == StatusCode::BAD_REQUEST && message.contains("API key"))
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        GenerationError::InvalidCredential
    } else {
        GenerationError::RemoteError(message)
    }
}

/// Find and decode the first inline image in a successful response body
pub(crate) fn extract_image(body: &str) -> Result<GeneratedImage, GenerationError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| MalformedResponse::InvalidBody(e.to_string()))?;

    let candidates = response.candidates.ok_or(MalformedResponse::NoCandidates)?;
    let candidate = candidates
        .into_iter()
        .next()
        .ok_or(MalformedResponse::EmptyCandidates)?;
    let content = candidate.content.ok_or(MalformedResponse::NoContent)?;
    let parts = content.parts.ok_or(MalformedResponse::NoParts)?;

    for part in parts {
        let Some(inline) = part.inline_data else {
            continue;
        };
        let Some(data) = inline.data.filter(|d| !d.is_empty()) else {
            continue;
        };
        let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64
            .decode(cleaned)
            .map_err(|e| MalformedResponse::UndecodableImage(e.to_string()))?;
        return Ok(GeneratedImage {
            bytes: bytes.into(),
            mime_type: inline
                .mime_type
                .unwrap_or_else(|| PNG_MIME_TYPE.to_string()),
        });
    }

    Err(MalformedResponse::NoImage.into())
}

/// Gemini generateContent client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    /// HTTP client
    client: Client,
    /// API base URL, e.g. https://generativelanguage.googleapis.com/v1beta
    base_url: String,
    /// Model identifier used in the request path
    model: String,
}

impl GeminiClient {
    /// Create a client with explicit timeouts
    pub fn new(
        base_url: &str,
        model: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Create a client from configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            &config.api_base_url,
            &config.model,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full generateContent URL
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(&self, call: &GenerationCall) -> Result<GeneratedImage, GenerationError> {
        let body = build_request_body(call);

        debug!(
            "Sending generateContent request to {} ({} byte prompt, {} byte image)",
            self.model,
            call.prompt.len(),
            call.source_image.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &call.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("Generation API error: {} - {}", status, text);
            return Err(classify_failure(status, &text));
        }

        let image = extract_image(&text)?;
        debug!("Received {} byte image", image.bytes.len());
        Ok(image)
    }
}
