//! Configuration loading, validation, and management for the Wellmed gateway.
//!
//! Loads configuration from `~/.wellmed/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup;
//! the resulting [`AppConfig`] is immutable for the life of the process.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The root configuration structure.
///
/// Maps directly to `~/.wellmed/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream credential. Never sent to callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Upstream completion service settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// HTTP server settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Assistant identity injected into every system message
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Domain keyword gate
    #[serde(default)]
    pub topic_gate: TopicGateConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("upstream", &self.upstream)
            .field("gateway", &self.gateway)
            .field("persona", &self.persona)
            .field("topic_gate", &self.topic_gate)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout for a single upstream call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            default_model: default_model(),
            default_max_tokens: default_max_tokens(),
            default_temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// The single browser origin allowed by CORS
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// Deployment label reported by the health probe
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Largest accepted document upload, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_allowed_origin() -> String {
    "https://wellmade-ai.vercel.app".into()
}
fn default_environment() -> String {
    "development".into()
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origin: default_allowed_origin(),
            environment: default_environment(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Assistant name; also the replacement for provider tokens in replies
    #[serde(default = "default_persona_name")]
    pub name: String,

    #[serde(default = "default_developer")]
    pub developer: String,

    #[serde(default = "default_specialty")]
    pub specialty: String,

    /// Provider-identifying words scrubbed from replies (case-insensitive)
    #[serde(default = "default_provider_tokens")]
    pub provider_tokens: Vec<String>,
}

fn default_persona_name() -> String {
    "Wellmed AI".into()
}
fn default_developer() -> String {
    "Chakri".into()
}
fn default_specialty() -> String {
    "medical coding and related topics".into()
}
fn default_provider_tokens() -> Vec<String> {
    ["OpenAI", "ChatGPT", "GPT-4", "GPT"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// The first token that could overlap `name` once `name` has replaced it.
///
/// Returns a token (compared ASCII case-insensitively) that occurs inside
/// `name`, contains `name`, starts with a suffix of `name` or ends with a
/// prefix of `name`. With none of those, text that had every token replaced
/// by `name` contains no token, so a single replacement pass is idempotent.
pub fn replacement_conflict<'a>(name: &str, tokens: &'a [String]) -> Option<&'a str> {
    let name = name.to_ascii_lowercase();
    tokens.iter().map(String::as_str).find(|token| {
        let token = token.trim().to_ascii_lowercase();
        if token.is_empty() {
            return false;
        }
        name.contains(&token)
            || token.contains(&name)
            || (1..name.len()).filter(|&i| name.is_char_boundary(i)).any(|i| {
                token.starts_with(&name[i..]) || token.ends_with(&name[..i])
            })
    })
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            developer: default_developer(),
            specialty: default_specialty(),
            provider_tokens: default_provider_tokens(),
        }
    }
}

/// What the gateway does with an off-topic request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Answer with a 4xx error payload
    #[default]
    Hard,
    /// Answer with a scripted assistant reply in the normal completion shape
    Soft,
}

impl FromStr for GateMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hard" => Ok(Self::Hard),
            "soft" => Ok(Self::Soft),
            other => Err(ConfigError::ValidationError(format!(
                "unknown topic gate mode '{other}' (expected 'hard' or 'soft')"
            ))),
        }
    }
}

impl std::fmt::Display for GateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hard => write!(f, "hard"),
            Self::Soft => write!(f, "soft"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicGateConfig {
    /// When false every request is forwarded
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub mode: GateMode,

    /// Domain vocabulary; matched as lowercase substrings
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// `details` of the hard-reject error payload
    #[serde(default = "default_rejection_message")]
    pub rejection_message: String,

    /// Assistant text of the soft-reject reply
    #[serde(default = "default_scripted_reply")]
    pub scripted_reply: String,
}

fn default_true() -> bool {
    true
}
fn default_keywords() -> Vec<String> {
    [
        "icd",
        "cpt",
        "drg",
        "medical",
        "diagnosis",
        "procedure",
        "modifiers",
        "billing",
        "claims",
        "treatment",
        "hospital",
        "insurance",
        "medication",
        "chart",
        "soap note",
        "documentation",
        "patient",
        "record",
        "hba1c",
        "rbs",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_rejection_message() -> String {
    "This assistant only answers medical coding-related questions. \
     Please ask something relevant to medical coding."
        .into()
}
fn default_scripted_reply() -> String {
    "I can only help with medical coding topics such as ICD-10, CPT and DRG codes, \
     modifiers, billing, claims and clinical documentation. \
     Please ask a question related to medical coding."
        .into()
}

impl Default for TopicGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: GateMode::default(),
            keywords: default_keywords(),
            rejection_message: default_rejection_message(),
            scripted_reply: default_scripted_reply(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` (or `~/.wellmed/config.toml`), then
    /// apply environment variable overrides:
    ///
    /// - `WELLMED_API_KEY`, then `OPENAI_API_KEY`: upstream credential
    /// - `WELLMED_UPSTREAM_URL`, `WELLMED_MODEL`
    /// - `WELLMED_HOST`, `PORT`, `WELLMED_ALLOWED_ORIGIN`, `WELLMED_ENV`
    /// - `WELLMED_TOPIC_GATE` (`true`/`false`), `WELLMED_TOPIC_GATE_MODE`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Takes the lookup as a closure so tests never touch the real process
    /// environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("WELLMED_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Some(url) = lookup("WELLMED_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }
        if let Some(model) = lookup("WELLMED_MODEL") {
            self.upstream.default_model = model;
        }
        if let Some(host) = lookup("WELLMED_HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.gateway.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT must be a port number, got '{port}'"))
            })?;
        }
        if let Some(origin) = lookup("WELLMED_ALLOWED_ORIGIN") {
            self.gateway.allowed_origin = origin;
        }
        if let Some(env) = lookup("WELLMED_ENV") {
            self.gateway.environment = env;
        }
        if let Some(enabled) = lookup("WELLMED_TOPIC_GATE") {
            self.topic_gate.enabled = parse_bool(&enabled).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "WELLMED_TOPIC_GATE must be true or false, got '{enabled}'"
                ))
            })?;
        }
        if let Some(mode) = lookup("WELLMED_TOPIC_GATE_MODE") {
            self.topic_gate.mode = mode.parse()?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".wellmed")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let upstream = &self.upstream;
        if !(0.0..=2.0).contains(&upstream.default_temperature) {
            return Err(ConfigError::ValidationError(
                "upstream.default_temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if upstream.default_max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "upstream.default_max_tokens must be > 0".into(),
            ));
        }
        if upstream.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "upstream.default_model must not be empty".into(),
            ));
        }
        if !upstream.base_url.starts_with("http://") && !upstream.base_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "upstream.base_url must be an http(s) URL, got '{}'",
                upstream.base_url
            )));
        }

        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.port must be > 0".into(),
            ));
        }
        if self.gateway.max_upload_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.max_upload_bytes must be > 0".into(),
            ));
        }
        let origin = self.gateway.allowed_origin.trim();
        if origin.is_empty() || origin.chars().any(|c| c.is_control() || c == ' ') {
            return Err(ConfigError::ValidationError(format!(
                "gateway.allowed_origin is not a valid origin: '{origin}'"
            )));
        }

        let persona = &self.persona;
        if persona.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "persona.name must not be empty".into(),
            ));
        }
        if let Some(token) = replacement_conflict(&persona.name, &persona.provider_tokens) {
            return Err(ConfigError::ValidationError(format!(
                "persona.name '{}' overlaps the provider token '{token}'",
                persona.name
            )));
        }
        if persona.provider_tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "persona.provider_tokens must not contain empty entries".into(),
            ));
        }

        let gate = &self.topic_gate;
        if gate.enabled && gate.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "topic_gate.keywords must not be empty while the gate is enabled".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            upstream: UpstreamConfig::default(),
            gateway: GatewayConfig::default(),
            persona: PersonaConfig::default(),
            topic_gate: TopicGateConfig::default(),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
