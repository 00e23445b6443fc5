//! Response sanitizer.
//!
//! Replaces provider-identifying words in the primary completion text with
//! the persona name. Only `choices[0].message.content` is touched.

use regex_lite::{NoExpand, Regex};
use std::borrow::Cow;
use wellmed_config::replacement_conflict;
use wellmed_core::provider::CompletionResponse;

#[derive(Debug, thiserror::Error)]
pub enum SanitizerError {
    #[error("invalid provider token pattern: {0}")]
    Pattern(#[from] regex_lite::Error),

    /// The replacement could recreate a token next to surrounding text.
    #[error("replacement '{replacement}' overlaps the provider token '{token}'")]
    Overlap { replacement: String, token: String },
}

#[derive(Debug, Clone)]
pub struct ResponseSanitizer {
    /// `None` when no tokens are configured
    pattern: Option<Regex>,
    replacement: String,
}

impl ResponseSanitizer {
    /// Build a sanitizer replacing every token (ASCII case-insensitive)
    /// with `replacement`. Longer tokens are tried first so `GPT-4` wins
    /// over `GPT`.
    ///
    /// Fails when `replacement` overlaps a token, since sanitized text
    /// could then contain a token again.
    pub fn new(tokens: &[String], replacement: impl Into<String>) -> Result<Self, SanitizerError> {
        let replacement = replacement.into();
        if let Some(token) = replacement_conflict(&replacement, tokens) {
            return Err(SanitizerError::Overlap {
                replacement,
                token: token.to_string(),
            });
        }

        let mut tokens: Vec<&str> = tokens
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        tokens.dedup();

        let pattern = if tokens.is_empty() {
            None
        } else {
            let alternation = tokens
                .iter()
                .map(|t| regex_lite::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!("(?i)(?:{alternation})"))?)
        };

        Ok(Self {
            pattern,
            replacement,
        })
    }

    /// Rewrite `text` in one pass. The replacement never overlaps a
    /// token, so `sanitize_text(sanitize_text(x)) == sanitize_text(x)`.
    pub fn sanitize_text<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(text, NoExpand(&self.replacement)),
            None => Cow::Borrowed(text),
        }
    }

    /// Sanitize the primary choice of a completion in place.
    pub fn sanitize(&self, response: &mut CompletionResponse) {
        let Some(content) = response.primary_content_mut() else {
            return;
        };
        let clean = match self.sanitize_text(content) {
            Cow::Owned(clean) => clean,
            Cow::Borrowed(_) => return,
        };
        *content = clean;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> ResponseSanitizer {
        let tokens: Vec<String> = ["OpenAI", "ChatGPT", "GPT-4", "GPT"]
            .into_iter()
            .map(String::from)
            .collect();
        ResponseSanitizer::new(&tokens, "Wellmed AI").unwrap()
    }

    #[test]
    fn replaces_provider_names() {
        let out = sanitizer().sanitize_text("As ChatGPT, the code is 99213");
        assert_eq!(out, "As Wellmed AI, the code is 99213");
    }

    #[test]
    fn replacement_is_case_insensitive_and_global() {
        let out = sanitizer().sanitize_text("openai built chatgpt on Gpt-4; GPT rocks");
        assert_eq!(
            out,
            "Wellmed AI built Wellmed AI on Wellmed AI; Wellmed AI rocks"
        );
    }

    #[test]
    fn longest_token_wins() {
        let out = sanitizer().sanitize_text("Powered by GPT-4.");
        assert_eq!(out, "Powered by Wellmed AI.");
    }

    #[test]
    fn clean_text_is_borrowed() {
        let out = sanitizer().sanitize_text("Use modifier 25 with E/M services.");
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let s = sanitizer();
        let chained = format!("GPT{}", "PT".repeat(12));
        let samples = [
            "As ChatGPT, the code is 99213",
            "OPENAI openai OpenAi",
            "GPTGPT-4GPT",
            "GGPTPT gpgptt",
            chained.as_str(),
            "nothing to see here",
            "",
        ];
        for sample in samples {
            let once = s.sanitize_text(sample).into_owned();
            let twice = s.sanitize_text(&once).into_owned();
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn overlapping_replacement_is_refused() {
        let tokens: Vec<String> = ["OpenAI", "ChatGPT", "GPT-4", "GPT"]
            .into_iter()
            .map(String::from)
            .collect();
        // "...G" followed by "PT" would spell "GPT" again.
        let err = ResponseSanitizer::new(&tokens, "Assistant G").unwrap_err();
        assert!(matches!(err, SanitizerError::Overlap { .. }));

        let tokens = vec!["AIX".to_string()];
        assert!(ResponseSanitizer::new(&tokens, "Wellmed AI").is_err());
    }

    #[test]
    fn replacement_text_is_not_expanded() {
        let tokens = vec!["GPT".to_string()];
        let s = ResponseSanitizer::new(&tokens, "$1 Bot").unwrap();
        assert_eq!(s.sanitize_text("I am GPT"), "I am $1 Bot");
    }

    #[test]
    fn no_tokens_means_no_change() {
        let s = ResponseSanitizer::new(&[], "Wellmed AI").unwrap();
        assert_eq!(s.sanitize_text("ChatGPT"), "ChatGPT");
    }

    #[test]
    fn only_primary_choice_content_changes() {
        let mut response = CompletionResponse::scripted("gpt-4o-mini", "I am ChatGPT");
        let mut second = response.choices[0].clone();
        second.index = 1;
        second.message.content = Some("Also ChatGPT".into());
        response.choices.push(second);
        response.usage.as_mut().unwrap().total_tokens = 12;

        sanitizer().sanitize(&mut response);

        assert_eq!(response.primary_content(), Some("I am Wellmed AI"));
        assert_eq!(
            response.choices[1].message.content.as_deref(),
            Some("Also ChatGPT")
        );
        assert_eq!(response.model, "gpt-4o-mini");
        assert_eq!(response.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.unwrap().total_tokens, 12);
    }

    #[test]
    fn null_content_is_left_alone() {
        let mut response = CompletionResponse::scripted("m", "x");
        response.choices[0].message.content = None;
        sanitizer().sanitize(&mut response);
        assert_eq!(response.primary_content(), None);
    }
}
