//! Loader for TrustCheck configuration with YAML + environment overlays.
//!
//! Sources are merged in order: inline YAML snippets and files first, then
//! `TRUSTCHECK__`-prefixed environment variables (`__` separates nesting
//! levels, so `TRUSTCHECK__SERVER__BIND` sets `server.bind`). After merging,
//! `${VAR}` placeholders are expanded recursively and the result is
//! deserialized into [`TrustCheckConfig`]. Every field has a default, so an
//! empty configuration is valid.
//!
//! Credentials get one more pass: an empty value, or one that still carries an
//! unexpanded `${...}` placeholder, counts as absent, and the legacy
//! `ASI_ONE_API_KEY` / `GOOGLE_FACT_CHECK_API_KEY` variables are consulted
//! instead.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use trustcheck_common::observability::{LogConfig, LogFormat};
use trustcheck_common::{DEFAULT_TRUSTED_DOMAINS, DomainMatch};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_CONFIG_FILE: &str = "trustcheck.yaml";
pub const ENV_PREFIX: &str = "TRUSTCHECK";
pub const ASI_ONE_KEY_ENV: &str = "ASI_ONE_API_KEY";
pub const FACT_CHECK_KEY_ENV: &str = "GOOGLE_FACT_CHECK_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrustCheckConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub fact_check: FactCheckConfig,
    pub resolver: ResolverConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Maximum accepted request body, in KiB.
    pub body_limit_kb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".into(),
            body_limit_kb: 64,
        }
    }
}

impl ServerConfig {
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_kb.saturating_mul(1024)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.asi1.ai/v1/chat/completions".into(),
            model: "asi1-mini".into(),
            api_key: None,
            timeout_secs: 20,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FactCheckConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub language_code: String,
    pub timeout_secs: u64,
}

impl Default for FactCheckConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://factchecktools.googleapis.com/v1alpha1/claims:search".into(),
            api_key: None,
            language_code: "en".into(),
            timeout_secs: 5,
        }
    }
}

impl FactCheckConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub timeout_secs: u64,
    pub domain_match: DomainMatch,
    pub trusted_domains: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            domain_match: DomainMatch::default(),
            trusted_domains: DEFAULT_TRUSTED_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub stderr: bool,
    pub filter: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            stderr: true,
            filter: "info".into(),
            dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn log_config(&self, app_name: &'static str) -> LogConfig {
        LogConfig {
            app_name,
            log_dir: self.dir.clone(),
            emit_stderr: self.stderr,
            format: self.format,
            default_filter: self.filter.clone(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => break,
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

fn usable_credential(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.contains("${"))
}

fn credential_or_env(value: Option<String>, env_name: &str) -> Option<String> {
    usable_credential(value).or_else(|| usable_credential(std::env::var(env_name).ok()))
}

impl TrustCheckConfig {
    fn normalize_credentials(&mut self) {
        self.llm.api_key = credential_or_env(self.llm.api_key.take(), ASI_ONE_KEY_ENV);
        self.fact_check.api_key =
            credential_or_env(self.fact_check.api_key.take(), FACT_CHECK_KEY_ENV);
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let zero_timeouts = [
            ("llm.timeout_secs", self.llm.timeout_secs),
            ("fact_check.timeout_secs", self.fact_check.timeout_secs),
            ("resolver.timeout_secs", self.resolver.timeout_secs),
        ];
        if let Some((key, _)) = zero_timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::Message(format!("{key} must be positive")));
        }
        if self.server.body_limit_kb == 0 {
            return Err(ConfigError::Message(
                "server.body_limit_kb must be positive".into(),
            ));
        }
        if self.llm.endpoint.trim().is_empty() || self.fact_check.endpoint.trim().is_empty() {
            return Err(ConfigError::Message("service endpoints must not be empty".into()));
        }
        Ok(())
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct TrustCheckConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for TrustCheckConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TrustCheckConfigLoader {
    /// Start from built-in defaults; environment overrides are applied last
    /// by [`load`](Self::load).
    ///
    /// ```
    /// use trustcheck_config::TrustCheckConfigLoader;
    ///
    /// let config = TrustCheckConfigLoader::new()
    ///     .with_yaml_str("server:\n  bind: 0.0.0.0:8080")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.server.bind, "0.0.0.0:8080");
    /// assert_eq!(config.llm.model, "asi1-mini");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; the `config` crate infers
    /// format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped so
    /// deployments can rely purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use trustcheck_common::DomainMatch;
    /// use trustcheck_config::TrustCheckConfigLoader;
    ///
    /// let cfg = TrustCheckConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// resolver:
    ///   domain_match: host_suffix
    ///   trusted_domains: [example.org]
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.resolver.domain_match, DomainMatch::HostSuffix);
    /// assert_eq!(cfg.resolver.trusted_domains, vec!["example.org".to_string()]);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly
    /// typed config.
    ///
    /// ```
    /// use trustcheck_config::TrustCheckConfigLoader;
    ///
    /// temp_env::with_var("ASI_TOKEN", Some("injected-from-env"), || {
    ///     let config = TrustCheckConfigLoader::new()
    ///         .with_yaml_str("llm:\n  api_key: \"${ASI_TOKEN}\"")
    ///         .load()
    ///         .expect("valid configuration");
    ///
    ///     assert_eq!(config.llm.api_key.as_deref(), Some("injected-from-env"));
    /// });
    /// ```
    pub fn load(self) -> Result<TrustCheckConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("resolver.trusted_domains"),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let mut typed: TrustCheckConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.normalize_credentials();
        typed.validate()?;

        Ok(typed)
    }
}
