//! `wellmed gateway` — Start the HTTP API server.

use std::path::Path;
use wellmed_config::AppConfig;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config =
        AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🩺 {} Gateway", config.persona.name);
    println!("   Listening:   {}:{}", config.gateway.host, config.gateway.port);
    println!("   Environment: {}", config.gateway.environment);
    println!("   Origin:      {}", config.gateway.allowed_origin);
    println!(
        "   Topic gate:  {}",
        if config.topic_gate.enabled {
            config.topic_gate.mode.to_string()
        } else {
            "disabled".to_string()
        }
    );

    wellmed_gateway::start(config).await?;

    Ok(())
}
