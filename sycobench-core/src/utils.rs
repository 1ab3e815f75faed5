//! Small utilities shared across crates.

use rust_genai::InteractionResponse;

/// Extract total token count from an LLM response.
///
/// Safely converts from `i32` to `u32`, returning `None` on negative values
/// or if usage metadata is unavailable.
pub fn extract_total_tokens(response: &InteractionResponse) -> Option<u32> {
    response
        .usage
        .as_ref()
        .and_then(|u| u.total_tokens)
        .and_then(|t| u32::try_from(t).ok())
}

/// Truncate text to a maximum character count, adding ellipsis if needed.
///
/// Uses Unicode-aware character counting to handle multi-byte characters
/// correctly. Trims whitespace from input and from truncated output before
/// adding ellipsis.
///
/// # Examples
///
/// ```
/// use sycobench_core::truncate;
///
/// assert_eq!(truncate("hello world", 8), "hello...");
/// assert_eq!(truncate("short", 10), "short");
/// ```
pub fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated.trim_end())
    }
}
