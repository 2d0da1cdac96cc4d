//! Prompt construction and token-budget truncation

use serde_json::Value;
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

use crate::Result;
use crate::enrichment::RouteContext;
use crate::error::RouteError;
use crate::geospatial::GeospatialData;
use crate::models::Place;

/// Serializes the aggregate into one prompt and keeps it within a token budget.
///
/// Truncation is a hard cutoff on token boundaries. The result never
/// re-tokenizes to more than `max_tokens`, so truncating twice is the same as
/// truncating once.
pub struct TextNormalizer {
    bpe: CoreBPE,
    max_tokens: usize,
}

impl TextNormalizer {
    /// Loads the `cl100k_base` vocabulary; do this once and share the result.
    pub fn new(max_tokens: usize) -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| RouteError::config(format!("Failed to load tokenizer: {e}")))?;
        Ok(Self { bpe, max_tokens })
    }

    #[must_use]
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    #[must_use]
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Prompt text embedding every collected dataset
    #[must_use]
    pub fn build_prompt(
        start: &Place,
        end: &Place,
        geo: &GeospatialData,
        context: &RouteContext,
    ) -> String {
        let places = serde_json::to_value(&geo.places).unwrap_or(Value::Null);
        format!(
            "I have collected the following data for a route from {start} to {end}. \
             Can you summarize this information with a focus on health benefits of cycling? \
             What about cycling on this route given its elevation? \
             Give as much information about these as possible. \
             Give a fun fact about cycling as well: {}, {}, {}, {}, {}, {}.",
            geo.directions.raw,
            places,
            geo.elevation.raw,
            context.weather,
            context.traffic,
            context.roadworks,
        )
    }

    /// Cut `text` down to the token budget; text within budget is returned as is
    #[must_use]
    pub fn truncate(&self, text: &str) -> String {
        let tokens = self.bpe.encode_with_special_tokens(text);
        if tokens.len() <= self.max_tokens {
            return text.to_string();
        }

        debug!(
            "Truncating prompt from {} to {} tokens",
            tokens.len(),
            self.max_tokens
        );

        // A cut can split a multi-byte character or re-tokenize differently,
        // so back off until the decoded text fits.
        let mut cut = self.max_tokens;
        while cut > 0 {
            if let Ok(candidate) = self.bpe.decode(tokens[..cut].to_vec()) {
                if self.count_tokens(&candidate) <= self.max_tokens {
                    return candidate;
                }
            }
            cut -= 1;
        }

        warn!("Prompt could not be truncated on a token boundary");
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn normalizer(max_tokens: usize) -> TextNormalizer {
        TextNormalizer::new(max_tokens).unwrap()
    }

    #[test]
    fn test_text_within_budget_is_unchanged() {
        let n = normalizer(50);
        let text = "Cycling along the harbour is flat and scenic.";
        assert_eq!(n.truncate(text), text);
    }

    #[rstest]
    #[case(1)]
    #[case(7)]
    #[case(100)]
    fn test_truncated_text_fits_budget(#[case] max_tokens: usize) {
        let n = normalizer(max_tokens);
        let text = "The route climbs 120 metres over 8 km before a long descent. ".repeat(50);
        let truncated = n.truncate(&text);
        assert!(n.count_tokens(&truncated) <= max_tokens);
        assert!(text.starts_with(&truncated));
    }

    #[test]
    fn test_truncation_is_idempotent() {
        let n = normalizer(25);
        let text = "Über die Brücke, dann 🚲 bergauf zum Aussichtspunkt. ".repeat(20);
        let once = n.truncate(&text);
        assert_eq!(n.truncate(&once), once);

        let short = "short text";
        assert_eq!(n.truncate(&n.truncate(short)), n.truncate(short));
    }

    #[test]
    fn test_multibyte_input_never_exceeds_budget() {
        let n = normalizer(10);
        let text = "🚴‍♀️🏔️🌧️ ".repeat(40);
        let truncated = n.truncate(&text);
        assert!(n.count_tokens(&truncated) <= 10);
    }

    #[test]
    fn test_default_budget() {
        assert_eq!(normalizer(15_000).max_tokens(), 15_000);
    }
}
