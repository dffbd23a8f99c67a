use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwitchboardConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub greeting: GreetingConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub google: GoogleProviderConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GoogleProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_text_model")]
    pub classifier_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_google_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for GoogleProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("text_model", &self.text_model)
            .field("classifier_model", &self.classifier_model)
            .field("image_model", &self.image_model)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for GoogleProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            text_model: default_text_model(),
            classifier_model: default_text_model(),
            image_model: default_image_model(),
            max_tokens: default_google_max_tokens(),
            max_retries: default_max_retries(),
            base_url: None,
        }
    }
}

impl GoogleProviderConfig {
    /// Configured key, falling back to the process environment
    pub fn resolved_api_key(&self) -> Option<String> {
        Some(self.api_key.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}

fn default_text_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_image_model() -> String {
    "gemini-2.0-flash-preview-image-generation".to_string()
}
fn default_google_max_tokens() -> u32 {
    4096
}
fn default_max_retries() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_greeting_port")]
    pub greeting_port: u16,
    #[serde(default = "default_manager_port")]
    pub manager_port: u16,
    #[serde(default = "default_image_port")]
    pub image_port: u16,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            greeting_port: default_greeting_port(),
            manager_port: default_manager_port(),
            image_port: default_image_port(),
        }
    }
}

impl AgentsConfig {
    pub fn addr(&self, port: u16) -> Result<SocketAddr> {
        socket_addr(&self.host, port)
    }

    pub fn url(&self, port: u16) -> String {
        format!("http://{}:{}", self.host, port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_greeting_port() -> u16 {
    8001
}
fn default_manager_port() -> u16 {
    8002
}
fn default_image_port() -> u16 {
    8003
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingConfig {
    #[serde(default)]
    pub research_enabled: bool,
    #[serde(default = "default_max_research_loops")]
    pub max_research_loops: u32,
    #[serde(default = "default_initial_search_query_count")]
    pub initial_search_query_count: u32,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            research_enabled: false,
            max_research_loops: default_max_research_loops(),
            initial_search_query_count: default_initial_search_query_count(),
        }
    }
}

fn default_max_research_loops() -> u32 {
    switchboard_core::research::DEFAULT_MAX_RESEARCH_LOOPS
}
fn default_initial_search_query_count() -> u32 {
    switchboard_core::research::DEFAULT_INITIAL_SEARCH_QUERY_COUNT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from(switchboard_core::responders::DEFAULT_IMAGE_PATH)
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Manager address; derived from `[agents]` when unset
    #[serde(default)]
    pub manager_url: Option<String>,
    #[serde(default)]
    pub auth_token: String,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("manager_url", &self.manager_url)
            .field("auth_token", &mask_secret(&self.auth_token))
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_host(),
            port: default_gateway_port(),
            manager_url: None,
            auth_token: String::new(),
        }
    }
}

impl GatewayConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        socket_addr(&self.bind, self.port)
    }
}

fn default_gateway_port() -> u16 {
    8000
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr> {
    format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))
}

/// Mask a secret string for safe display in Debug output / logs.
/// Shows first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".switchboard")
}

impl SwitchboardConfig {
    /// Load from `custom_path` or `~/.switchboard/config.toml`. A missing
    /// default file yields the built-in defaults.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        if custom_path.is_none() && !path.exists() {
            info!(
                "No config at {}, using defaults. Run `switchboard init` to create one.",
                path.display()
            );
            return Ok(Self::default());
        }

        check_permissions(&path)?;

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `switchboard init` first.",
                path.display()
            )
        })?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        if let Some(manager_url) = &config.gateway.manager_url {
            url::Url::parse(manager_url)
                .with_context(|| format!("Invalid gateway.manager_url '{}'", manager_url))?;
        }

        if config.providers.google.api_key.starts_with("AIza") {
            warn!(
                "API key is hardcoded in config file. \
                 For security, use environment variables: api_key = \"${{{}}}\"",
                API_KEY_ENV
            );
        }

        Ok(config)
    }

    /// Parse TOML after expanding allowlisted `${VAR}` references
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        // The research graph always runs one search round before reflecting
        if self.greeting.max_research_loops == 0 {
            anyhow::bail!("greeting.max_research_loops must be at least 1");
        }
        if self.greeting.initial_search_query_count == 0 {
            anyhow::bail!("greeting.initial_search_query_count must be at least 1");
        }
        Ok(())
    }

    /// Copy safe to print: secrets replaced by their masked form
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.providers.google.api_key = mask_secret(&copy.providers.google.api_key);
        copy.gateway.auth_token = mask_secret(&copy.gateway.auth_token);
        copy
    }

    pub fn manager_url(&self) -> String {
        self.gateway
            .manager_url
            .clone()
            .unwrap_or_else(|| self.agents.url(self.agents.manager_port))
    }
}

/// Refuse config files readable by group or other (Unix only)
fn check_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.permissions().mode();
            if mode & 0o077 != 0 {
                return Err(anyhow::anyhow!(
                    "Config file {:?} has overly permissive permissions ({:o}). \
                     It may contain secrets. Fix with: chmod 600 {:?}",
                    path,
                    mode & 0o777,
                    path
                ));
            }
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Allowlist of environment variable names that may be expanded in config files.
const ALLOWED_ENV_VARS: &[&str] = &[API_KEY_ENV, "SWITCHBOARD_GATEWAY_TOKEN", "HOME", "USER"];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while let Some(start) = result[pos..].find("${") {
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            pos = abs_start + end + 1;
            continue;
        }

        let value = std::env::var(&var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}
