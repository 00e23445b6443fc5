//! `wellmed doctor` — Diagnose configuration problems.

use std::path::Path;
use wellmed_config::AppConfig;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Wellmed Doctor — Configuration Diagnostics");
    println!("=============================================\n");

    let mut issues = 0;

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if path.exists() {
        println!("  ✅ Config file found: {}", path.display());
    } else {
        println!("  ℹ️  No config file at {}, using defaults", path.display());
    }

    let config = match AppConfig::load(config_path) {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration before starting the gateway.");
            return Err(format!("Invalid configuration: {e}").into());
        }
    };

    if config.has_api_key() {
        println!("  ✅ Upstream API key configured");
    } else {
        println!("  ⚠️  No API key — set OPENAI_API_KEY or api_key in config.toml");
        issues += 1;
    }

    println!("  ✅ Upstream: {}", config.upstream.base_url);
    println!(
        "  ✅ Defaults: model={} max_tokens={} temperature={}",
        config.upstream.default_model,
        config.upstream.default_max_tokens,
        config.upstream.default_temperature
    );

    if config.topic_gate.enabled {
        println!(
            "  ✅ Topic gate: {} mode, {} keywords",
            config.topic_gate.mode,
            config.topic_gate.keywords.len()
        );
    } else {
        println!("  ⚠️  Topic gate disabled — every question is forwarded upstream");
        issues += 1;
    }

    if config.persona.provider_tokens.is_empty() {
        println!("  ⚠️  No provider tokens — responses will not be sanitized");
        issues += 1;
    } else {
        println!(
            "  ✅ Sanitizer: {} provider tokens → \"{}\"",
            config.persona.provider_tokens.len(),
            config.persona.name
        );
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
