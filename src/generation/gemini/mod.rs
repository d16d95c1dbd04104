
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Lines};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::generation::{CompletionBackend, FragmentStream};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

// Generation calls can run long, especially when streaming a full answer.
const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Live backend speaking the Gemini `generateContent` REST API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    api_base: Url,
    api_key: String,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: RequestGenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Normalize a decoded response to plain text.
    ///
    /// Field priority, applied once here and nowhere else:
    /// `candidates[0].content.parts[*].text`, joined in order. Parts without
    /// text and trailing candidates are ignored; a response with no
    /// candidates yields an empty string.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl GeminiBackend {
    #[inline]
    pub fn new(api_key: String, model: String, api_base: Option<&str>) -> Result<Self> {
        let api_base = Url::parse(api_base.unwrap_or(DEFAULT_API_BASE))
            .context("Failed to parse generation API base URL")?;

        // Error statuses are handled as responses so quota payloads (which
        // carry the retryDelay hint) survive into the error message.
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            api_base,
            api_key,
            model,
            agent,
        })
    }

    fn endpoint(&self, method: &str, streaming: bool) -> Result<Url> {
        let mut url = self
            .api_base
            .join(&format!("/v1beta/models/{}:{}", self.model, method))
            .context("Failed to build generation endpoint URL")?;

        {
            let mut query = url.query_pairs_mut();
            if streaming {
                query.append_pair("alt", "sse");
            }
            query.append_pair("key", &self.api_key);
        }

        Ok(url)
    }

    fn send(&self, url: &Url, prompt: &str, max_output_tokens: u32) -> Result<ureq::http::Response<ureq::Body>> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: RequestGenerationConfig { max_output_tokens },
        };

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        self.agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .with_context(|| format!("Request to model {} failed", self.model))
    }
}

impl CompletionBackend for GeminiBackend {
    #[inline]
    fn complete(&self, prompt: &str, max_output_tokens: u32) -> Result<String> {
        let url = self.endpoint("generateContent", false)?;
        debug!(
            "Requesting completion from model {} (prompt length {})",
            self.model,
            prompt.len()
        );

        let mut response = self.send(&url, prompt, max_output_tokens)?;
        let status = response.status();
        let body = response
            .body_mut()
            .read_to_string()
            .context("Failed to read generation response body")?;

        if !status.is_success() {
            return Err(anyhow!("Gemini API error {status}: {body}"));
        }

        let decoded: GenerateContentResponse =
            serde_json::from_str(&body).context("Failed to parse generation response")?;

        Ok(decoded.into_text())
    }

    #[inline]
    fn complete_stream(&self, prompt: &str, max_output_tokens: u32) -> Result<FragmentStream> {
        let url = self.endpoint("streamGenerateContent", true)?;
        debug!(
            "Requesting streamed completion from model {} (prompt length {})",
            self.model,
            prompt.len()
        );

        let mut response = self.send(&url, prompt, max_output_tokens)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(anyhow!("Gemini API error {status}: {body}"));
        }

        let reader = BufReader::new(response.into_body().into_reader());
        Ok(Box::new(SseFragments {
            lines: reader.lines(),
        }))
    }
}

/// Lazy iterator over text fragments parsed from an SSE response body.
///
/// Dropping the iterator closes the underlying connection, so ceasing to
/// pull is a complete cancellation.
struct SseFragments<R: BufRead> {
    lines: Lines<R>,
}

impl<R: BufRead> Iterator for SseFragments<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(error) => {
                    warn!("Error reading generation stream: {}", error);
                    return Some(Err(anyhow!("Error reading generation stream: {error}")));
                }
            };

            let Some(data) = line.strip_prefix("data:") else {
                // SSE comments, event names, and blank keep-alive lines
                continue;
            };
            let data = data.trim();
            if data.is_empty() || data == "[DONE]" {
                continue;
            }

            match serde_json::from_str::<GenerateContentResponse>(data) {
                Ok(event) => {
                    let text = event.into_text();
                    if !text.is_empty() {
                        return Some(Ok(text));
                    }
                    // In-band error events decode to an empty candidate list;
                    // surface them instead of silently dropping the stream.
                    if data.contains("\"error\"") {
                        return Some(Err(anyhow!("Gemini stream error event: {data}")));
                    }
                }
                Err(error) => {
                    return Some(Err(anyhow!("Failed to parse stream event: {error}")));
                }
            }
        }
    }
}
