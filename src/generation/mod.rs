
pub mod classify;
pub mod gemini;
pub mod mock;

pub use classify::{ErrorKind, backoff_delay, classify, extract_retry_delay};
pub use gemini::GeminiBackend;
pub use mock::MockBackend;

use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::{AskdocError, Result};

/// Lazy, finite fragment sequence produced by one streaming completion.
pub type FragmentStream = Box<dyn Iterator<Item = anyhow::Result<String>>>;

/// Capability to produce text from a prompt, in one shot or incrementally.
///
/// Two implementations exist: the live [`GeminiBackend`] and the
/// deterministic [`MockBackend`]; one is selected when the client is
/// constructed and fixed for its lifetime.
pub trait CompletionBackend: Send + Sync {
    fn complete(&self, prompt: &str, max_output_tokens: u32) -> anyhow::Result<String>;

    fn complete_stream(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> anyhow::Result<FragmentStream>;
}

/// Client for the generative model, wrapping a [`CompletionBackend`] with
/// quota-aware retry for blocking calls and a fail-fast policy for streams.
///
/// Holds no cross-request mutable state; safe to share across concurrent
/// requests.
pub struct GenerationClient {
    backend: Box<dyn CompletionBackend>,
    model: String,
    dev: bool,
    max_retries: u32,
    max_output_tokens: u32,
}

impl GenerationClient {
    /// Select the backend once from configuration.
    ///
    /// Dev mode wins when requested explicitly or when no API credential is
    /// present; a live backend is only constructed with a usable key.
    #[inline]
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let dev = config.dev || config.api_key.is_none();

        let backend: Box<dyn CompletionBackend> = if dev {
            info!("Generation client running in dev mode; no live model calls will be made");
            Box::new(MockBackend)
        } else {
            let api_key = config.api_key.clone().ok_or_else(|| {
                AskdocError::Generation("no API credential available for live mode".to_string())
            })?;
            let backend =
                GeminiBackend::new(api_key, config.model.clone(), config.api_base.as_deref())
                    .map_err(|e| AskdocError::Generation(format!("{e:#}")))?;
            info!("Generation client using live model {}", config.model);
            Box::new(backend)
        };

        Ok(Self {
            backend,
            model: config.model.clone(),
            dev,
            max_retries: config.max_retries,
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Wrap an explicit backend. Used by tests and custom compositions.
    #[inline]
    pub fn with_backend(backend: Box<dyn CompletionBackend>, max_retries: u32) -> Self {
        Self {
            backend,
            model: "custom".to_string(),
            dev: false,
            max_retries,
            max_output_tokens: 512,
        }
    }

    #[inline]
    pub fn is_dev(&self) -> bool {
        self.dev
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Produce the full answer in one blocking call.
    ///
    /// Quota failures are retried up to `max_retries` attempts total,
    /// sleeping the operator-specified delay from the error text when one is
    /// present, else exponential backoff. Any other failure surfaces
    /// immediately; blind retry does not help a non-transient error.
    #[inline]
    pub fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_limit(prompt, self.max_output_tokens)
    }

    #[inline]
    pub fn generate_with_limit(&self, prompt: &str, max_output_tokens: u32) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            match self.backend.complete(prompt, max_output_tokens) {
                Ok(text) => {
                    debug!(
                        "Generation succeeded on attempt {} ({} chars)",
                        attempt + 1,
                        text.len()
                    );
                    return Ok(text);
                }
                Err(error) => {
                    let message = format!("{error:#}");
                    match classify(&message) {
                        ErrorKind::RateLimited { retry_after } => {
                            last_error = Some(message);
                            if attempt + 1 < self.max_retries {
                                let delay = backoff_delay(retry_after, attempt);
                                warn!(
                                    "Rate limited by model API; retrying after {:?} (attempt {}/{})",
                                    delay,
                                    attempt + 1,
                                    self.max_retries
                                );
                                std::thread::sleep(delay);
                            }
                        }
                        ErrorKind::Other => {
                            return Err(AskdocError::Generation(message));
                        }
                    }
                }
            }
        }

        Err(AskdocError::Generation(format!(
            "model request failed after {} attempts: {}",
            self.max_retries,
            last_error.unwrap_or_else(|| "no attempts were made".to_string())
        )))
    }

    /// Produce the answer incrementally.
    ///
    /// The returned iterator is lazy, finite, and non-restartable; dropping
    /// it cancels the stream. Failure policy is deliberately lighter than
    /// the blocking path: a quota error becomes a single terminal error
    /// fragment (backing off mid-stream would stall the consumer without
    /// producing output), and any other failure triggers exactly one
    /// fallback attempt through [`GenerationClient::generate`].
    #[inline]
    pub fn stream_generate(&self, prompt: &str) -> AnswerStream<'_> {
        self.stream_generate_with_limit(prompt, self.max_output_tokens)
    }

    #[inline]
    pub fn stream_generate_with_limit(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> AnswerStream<'_> {
        let state = match self.backend.complete_stream(prompt, max_output_tokens) {
            Ok(fragments) => StreamState::Streaming(fragments),
            Err(error) => StreamState::Failed(format!("{error:#}")),
        };

        AnswerStream {
            client: self,
            prompt: prompt.to_string(),
            max_output_tokens,
            state,
        }
    }
}

/// Fragment sequence for one streamed answer.
///
/// Fragments arrive in generation order and concatenate to the full answer.
/// Failures are converted into a single terminal in-band fragment so the
/// consumer always observes a definite end state.
pub struct AnswerStream<'a> {
    client: &'a GenerationClient,
    prompt: String,
    max_output_tokens: u32,
    state: StreamState,
}

enum StreamState {
    Streaming(FragmentStream),
    Failed(String),
    Finished,
}

impl Iterator for AnswerStream<'_> {
    type Item = String;

    #[inline]
    fn next(&mut self) -> Option<String> {
        match &mut self.state {
            StreamState::Finished => None,
            StreamState::Failed(message) => {
                let message = std::mem::take(message);
                self.state = StreamState::Finished;
                Some(self.failure_fragment(&message))
            }
            StreamState::Streaming(fragments) => match fragments.next() {
                Some(Ok(text)) => Some(text),
                Some(Err(error)) => {
                    let message = format!("{error:#}");
                    self.state = StreamState::Finished;
                    Some(self.failure_fragment(&message))
                }
                None => {
                    self.state = StreamState::Finished;
                    None
                }
            },
        }
    }
}

impl AnswerStream<'_> {
    /// One terminal fragment for a failed stream.
    fn failure_fragment(&self, message: &str) -> String {
        match classify(message) {
            ErrorKind::RateLimited { retry_after } => {
                warn!("Stream rate limited by model API: {}", message);
                retry_after.map_or_else(
                    || "[ERROR] Rate limited by model API. Please retry later".to_string(),
                    |delay| {
                        format!(
                            "[ERROR] Rate limited by model API. Retry after {} seconds",
                            delay.as_secs()
                        )
                    },
                )
            }
            ErrorKind::Other => {
                warn!(
                    "Stream failed ({}); falling back to blocking generation",
                    message
                );
                match self
                    .client
                    .generate_with_limit(&self.prompt, self.max_output_tokens)
                {
                    Ok(full) => full,
                    Err(fallback_error) => format!("[ERROR] {message} / {fallback_error}"),
                }
            }
        }
    }
}
