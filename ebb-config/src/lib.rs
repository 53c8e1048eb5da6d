//! Loader for the pruning configuration with YAML + environment overlays.
//!
//! Precedence is file first, then `EBB__`-prefixed environment variables,
//! then `${VAR}` expansion inside the merged values. Signing credentials
//! may live in the file or fall back to the four bare environment
//! variables the deploy scripts export.
use std::fmt;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Everything one pruning run needs to know.
#[derive(Debug, Deserialize)]
pub struct EbbConfig {
    /// Screen name whose history gets pruned.
    pub account: String,
    /// Posts older than this many days are deleted.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Timeline page size per request, capped by the API at 200.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Whether retweets count as prunable history.
    #[serde(default = "default_include_retweets")]
    pub include_retweets: bool,
    /// Walk and report without deleting anything.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub log: LogSettings,
}

impl EbbConfig {
    /// File-provided credentials win; otherwise fall back to the bare
    /// `CONSUMER_KEY` family of environment variables.
    pub fn resolve_credentials(&self) -> Result<Credentials, ConfigError> {
        match &self.credentials {
            Some(credentials) => Ok(credentials.clone()),
            None => Credentials::from_env(),
        }
    }
}

/// OAuth 1.0a user-context credentials for the API.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl Credentials {
    /// Read the four signing credentials from the process environment.
    /// Empty values count as missing so a stray `EXPORT FOO=` line in an
    /// env file fails loudly instead of producing 401s later.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            consumer_key: require_env("CONSUMER_KEY")?,
            consumer_secret: require_env("CONSUMER_SECRET")?,
            access_token: require_env("ACCESS_TOKEN")?,
            access_token_secret: require_env("ACCESS_TOKEN_SECRET")?,
        })
    }
}

// Secrets must not leak through debug logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

/// Where and how the run logs. All optional; the binary supplies defaults.
#[derive(Debug, Default, Deserialize)]
pub struct LogSettings {
    #[serde(default)]
    pub dir: Option<String>,
    /// "text" or "json".
    #[serde(default)]
    pub format: Option<String>,
    /// Mirror events to stderr. The binary turns this on unless the file
    /// says otherwise.
    #[serde(default)]
    pub stderr: Option<bool>,
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_retention_days() -> u32 {
    7
}
fn default_page_size() -> u32 {
    200
}
fn default_include_retweets() -> bool {
    true
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Message(format!(
            "missing credential: set the {name} environment variable"
        ))),
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
                        Err(_) => cur.clone(),
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

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct EbbConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for EbbConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EbbConfigLoader {
    /// Start with sensible defaults: YAML file + `EBB__` env overrides
    /// (`EBB__ACCOUNT`, `EBB__LOG__DIR`, ...).
    ///
    /// ```
    /// use ebb_config::EbbConfigLoader;
    ///
    /// let config = EbbConfigLoader::new()
    ///     .with_yaml_str("account: whomever")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.account, "whomever");
    /// assert_eq!(config.retention_days, 7);
    /// assert_eq!(config.page_size, 200);
    /// assert!(config.include_retweets);
    /// assert!(!config.dry_run);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by
    /// suffix. The file must exist.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Same, but a missing file is fine. Headless deployments run from
    /// environment variables alone.
    pub fn with_file_if_present<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into the
    /// typed config, expanding `${VAR}` placeholders on the way.
    ///
    /// ```
    /// use ebb_config::EbbConfigLoader;
    ///
    /// unsafe { std::env::set_var("EBB_DOCTEST_TOKEN", "injected-from-env"); }
    ///
    /// let config = EbbConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// account: "whomever"
    /// retention_days: 14
    /// credentials:
    ///   consumer_key: "ck"
    ///   consumer_secret: "cs"
    ///   access_token: "${EBB_DOCTEST_TOKEN}"
    ///   access_token_secret: "ats"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.retention_days, 14);
    /// let credentials = config.resolve_credentials().unwrap();
    /// assert_eq!(credentials.access_token, "injected-from-env");
    ///
    /// unsafe { std::env::remove_var("EBB_DOCTEST_TOKEN"); }
    /// ```
    pub fn load(self) -> Result<EbbConfig, ConfigError> {
        // The env source goes in last: the config crate gives later
        // sources precedence, and `EBB__` overrides must beat the file.
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("EBB")
                    .prefix_separator("__")
                    .separator("__")
                    // Numbers and bools arrive as strings otherwise.
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: EbbConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
