//! Topic classifier: the keyword gate.
//!
//! Looks at the most recent user message only and accepts it when any
//! domain keyword occurs in it as a case-insensitive substring.

use serde::Serialize;
use wellmed_config::TopicGateConfig;
use wellmed_core::message::{Message, last_user_content};

/// The gate's decision for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub allowed: bool,
    /// First configured keyword found in the message
    pub matched_keyword: Option<String>,
}

impl ClassificationResult {
    fn allowed(keyword: Option<&str>) -> Self {
        Self {
            allowed: true,
            matched_keyword: keyword.map(String::from),
        }
    }

    fn rejected() -> Self {
        Self {
            allowed: false,
            matched_keyword: None,
        }
    }
}

/// Immutable keyword set, built once at startup.
#[derive(Debug, Clone)]
pub struct TopicClassifier {
    /// Lowercased, trimmed, de-duplicated; configuration order kept
    keywords: Vec<String>,
    enabled: bool,
}

impl TopicClassifier {
    /// Build an enabled classifier from a keyword list.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }
        Self {
            keywords: normalized,
            enabled: true,
        }
    }

    /// A classifier that accepts everything.
    pub fn disabled() -> Self {
        Self {
            keywords: Vec::new(),
            enabled: false,
        }
    }

    pub fn from_config(config: &TopicGateConfig) -> Self {
        if config.enabled {
            Self::new(&config.keywords)
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Classify a conversation by its most recent user message.
    pub fn classify(&self, messages: &[Message]) -> ClassificationResult {
        self.classify_text(last_user_content(messages))
    }

    /// Classify a single piece of user text.
    pub fn classify_text(&self, text: &str) -> ClassificationResult {
        if !self.enabled {
            return ClassificationResult::allowed(None);
        }

        let text = text.to_lowercase();
        match self.keywords.iter().find(|k| text.contains(k.as_str())) {
            Some(keyword) => ClassificationResult::allowed(Some(keyword)),
            None => ClassificationResult::rejected(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> TopicClassifier {
        TopicClassifier::from_config(&TopicGateConfig::default())
    }

    #[test]
    fn matches_keyword_case_insensitively() {
        let result = classifier().classify(&[Message::user(
            "What is the CPT code for an office visit?",
        )]);
        assert!(result.allowed);
        assert_eq!(result.matched_keyword.as_deref(), Some("cpt"));
    }

    #[test]
    fn rejects_off_topic_question() {
        let result = classifier().classify(&[Message::user("Write me a poem about the sea")]);
        assert!(!result.allowed);
        assert!(result.matched_keyword.is_none());
    }

    #[test]
    fn only_the_latest_user_message_counts() {
        let messages = vec![
            Message::user("Which ICD-10 code fits type 2 diabetes?"),
            Message::assistant("E11.9 is commonly used."),
            Message::user("Thanks! Now tell me a joke."),
        ];
        assert!(!classifier().classify(&messages).allowed);

        let messages = vec![
            Message::user("Tell me a joke."),
            Message::assistant("No."),
            Message::user("Fine, explain modifiers 25 and 59."),
        ];
        assert!(classifier().classify(&messages).allowed);
    }

    #[test]
    fn assistant_and_system_text_is_ignored() {
        let messages = vec![
            Message::system("You help with medical billing."),
            Message::assistant("Ask me about billing."),
        ];
        assert!(!classifier().classify(&messages).allowed);
    }

    #[test]
    fn empty_conversation_is_rejected() {
        assert!(!classifier().classify(&[]).allowed);
    }

    #[test]
    fn first_configured_keyword_wins() {
        let classifier = TopicClassifier::new(["billing", "claims"]);
        let result = classifier.classify_text("claims and billing questions");
        assert_eq!(result.matched_keyword.as_deref(), Some("billing"));
    }

    #[test]
    fn keywords_are_normalized() {
        let classifier = TopicClassifier::new(["  HCPCS ", "hcpcs", "", "SOAP Note"]);
        assert_eq!(classifier.keywords(), &["hcpcs", "soap note"]);
        assert!(classifier.classify_text("Review my soap NOTE").allowed);
    }

    #[test]
    fn substring_containment_is_the_rule() {
        // "record" matches inside "recorded"; the gate is a plain substring test.
        assert!(classifier().classify_text("I recorded a podcast").allowed);
    }

    #[test]
    fn disabled_gate_accepts_everything() {
        let config = TopicGateConfig {
            enabled: false,
            ..TopicGateConfig::default()
        };
        let classifier = TopicClassifier::from_config(&config);
        assert!(!classifier.is_enabled());
        let result = classifier.classify(&[Message::user("Write me a poem")]);
        assert!(result.allowed);
        assert!(result.matched_keyword.is_none());
    }
}
