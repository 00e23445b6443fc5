//! `wellmed classify` — Run the topic gate against one message.

use std::path::Path;
use wellmed_config::AppConfig;
use wellmed_pipeline::TopicClassifier;

pub async fn run(config_path: Option<&Path>, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let classifier = TopicClassifier::from_config(&config.topic_gate);

    let result = classifier.classify_text(text);
    let outcome = match (result.allowed, config.topic_gate.mode) {
        (true, _) => "forwarded",
        (false, wellmed_config::GateMode::Hard) => "refused",
        (false, wellmed_config::GateMode::Soft) => "scripted reply",
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "allowed": result.allowed,
            "matchedKeyword": result.matched_keyword,
            "gateEnabled": classifier.is_enabled(),
            "mode": config.topic_gate.mode.to_string(),
            "outcome": outcome,
        }))?
    );

    Ok(())
}
