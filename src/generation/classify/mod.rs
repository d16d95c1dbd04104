#[cfg(test)]
mod tests;

use fancy_regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Longest backoff the client will ever sleep between attempts.
const MAX_BACKOFF_SECONDS: u64 = 60;

/// Classified failure kind for a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Quota or rate-limit exhaustion; retryable after a delay.
    RateLimited { retry_after: Option<Duration> },
    /// Everything else; assumed non-transient and never retried blindly.
    Other,
}

/// Classify a backend error by its message text.
///
/// The upstream API surfaces quota conditions only as opaque message text,
/// so this is the one place that pattern-matches it. Recognized markers:
/// `RESOURCE_EXHAUSTED` (gRPC status), `429` (HTTP status), and the
/// case-insensitive phrase `quota exceeded`. The rest of the retry logic
/// depends only on the returned kind, never on the raw text.
#[inline]
pub fn classify(message: &str) -> ErrorKind {
    let rate_limited = message.contains("RESOURCE_EXHAUSTED")
        || message.contains("429")
        || message.to_lowercase().contains("quota exceeded");

    if rate_limited {
        ErrorKind::RateLimited {
            retry_after: extract_retry_delay(message),
        }
    } else {
        ErrorKind::Other
    }
}

// Matches "retry in 53.46271898s" and similar prose.
static RETRY_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)retry\s*(?:in)?\s*(\d+(?:\.\d+)?)s").expect("retry pattern is valid")
});

// Matches the structured `"retryDelay": "53s"` field Google embeds in
// RESOURCE_EXHAUSTED error payloads.
static RETRY_DELAY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)retryDelay[^\d]*(\d+(?:\.\d+)?)s").expect("retryDelay pattern is valid")
});

/// Extract an operator-specified retry delay from an error message, trying
/// the `retry in Ns` prose form first, then the `retryDelay` field form.
#[inline]
pub fn extract_retry_delay(message: &str) -> Option<Duration> {
    for pattern in [&RETRY_IN, &RETRY_DELAY_FIELD] {
        if let Ok(Some(captures)) = pattern.captures(message) {
            let seconds = captures
                .get(1)
                .and_then(|m| m.as_str().parse::<f64>().ok());
            if let Some(seconds) = seconds {
                return Some(Duration::from_secs_f64(seconds));
            }
        }
    }
    None
}

/// Delay before the next attempt: the operator-specified delay when the
/// error carried one, else exponential backoff capped at 60 seconds.
#[inline]
pub fn backoff_delay(retry_after: Option<Duration>, attempt: u32) -> Duration {
    retry_after.unwrap_or_else(|| {
        Duration::from_secs(2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECONDS))
    })
}
