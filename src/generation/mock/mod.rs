
use anyhow::Result;

use crate::generation::{CompletionBackend, FragmentStream};

/// Maximum prompt prefix echoed into the mock answer.
const PROMPT_ECHO_CHARS: usize = 200;

/// Fragment size used to exercise incremental consumption without a network.
const STREAM_FRAGMENT_CHARS: usize = 40;

/// Deterministic offline backend, selected when no API credential is
/// configured or dev mode is requested. Answers echo a bounded prefix of the
/// prompt so tests can assert on them, and the streamed fragments
/// concatenate to exactly the blocking answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockBackend;

impl MockBackend {
    fn mock_answer(prompt: &str) -> String {
        let prefix: String = prompt.chars().take(PROMPT_ECHO_CHARS).collect();
        format!("[DEV] Mock answer for prompt: {prefix}")
    }
}

impl CompletionBackend for MockBackend {
    #[inline]
    fn complete(&self, prompt: &str, _max_output_tokens: u32) -> Result<String> {
        Ok(Self::mock_answer(prompt))
    }

    #[inline]
    fn complete_stream(&self, prompt: &str, _max_output_tokens: u32) -> Result<FragmentStream> {
        let full = Self::mock_answer(prompt);
        let chars: Vec<char> = full.chars().collect();
        let fragments: Vec<anyhow::Result<String>> = chars
            .chunks(STREAM_FRAGMENT_CHARS)
            .map(|fragment| Ok(fragment.iter().collect()))
            .collect();
        Ok(Box::new(fragments.into_iter()))
    }
}
