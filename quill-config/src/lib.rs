//! Loader for `quill.yaml` with environment overlays.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults (every section may be omitted)
//! 2. the YAML/TOML/JSON file(s) passed to the loader
//! 3. `QUILL__`-prefixed environment variables, `__` separating nesting
//!    (`QUILL__PIPELINE__MAX_RETRIES=2`)
//!
//! After merging, `${VAR}` / `$VAR` placeholders inside string values are
//! expanded from the process environment (recursively, depth-capped), so API
//! keys usually live in the environment or a `.env` file:
//!
//! ```yaml
//! search:
//!   api_key: "${TAVILY_API_KEY}"
//! llm:
//!   api_key: "${GROQ_API_KEY}"
//! ```
use config::{Config, ConfigError, Environment, File, FileFormat};
use quill_common::observability::LogFormat;
use quill_llm::traits::GenerationParams;
use quill_llm::{ClientSpec, DEFAULT_DRAFT_MODEL, DEFAULT_SYNTHESIZE_MODEL, LlmProvider};
use quill_search::{SearchDepth, SearchProvider};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
pub const ENV_PREFIX: &str = "QUILL";
pub const TOPIC_PLACEHOLDER: &str = "{topic}";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error(transparent)]
    Source(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuillConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub prompts: PromptOverrides,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub provider: SearchProvider,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub depth: SearchDepth,
    /// How a topic becomes a query; must contain `{topic}`.
    #[serde(default = "default_query_template")]
    pub query_template: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProvider::default(),
            api_key: String::new(),
            max_results: default_max_results(),
            depth: SearchDepth::default(),
            query_template: default_query_template(),
            timeout_secs: None,
        }
    }
}

/// Which text-generation call site a model serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    Synthesize,
    Draft,
    Validate,
}

/// Shared provider settings plus per-role overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub synthesize: RoleConfig,
    #[serde(default)]
    pub draft: RoleConfig,
    #[serde(default)]
    pub validate: RoleConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleConfig {
    #[serde(default)]
    pub provider: Option<LlmProvider>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl LlmConfig {
    fn role(&self, role: LlmRole) -> &RoleConfig {
        match role {
            LlmRole::Synthesize => &self.synthesize,
            LlmRole::Draft => &self.draft,
            LlmRole::Validate => &self.validate,
        }
    }

    /// Client spec and sampling knobs for one call site, with role defaults:
    /// synthesis and validation sample at temperature 0, drafting uses the
    /// provider default.
    pub fn resolve(&self, role: LlmRole) -> (ClientSpec, GenerationParams) {
        let rc = self.role(role);
        let (default_model, default_temp) = match role {
            LlmRole::Synthesize => (DEFAULT_SYNTHESIZE_MODEL, Some(0.0)),
            LlmRole::Draft => (DEFAULT_DRAFT_MODEL, None),
            LlmRole::Validate => (DEFAULT_DRAFT_MODEL, Some(0.0)),
        };

        let mut spec = ClientSpec::new(
            rc.provider.unwrap_or(self.provider),
            rc.model.clone().unwrap_or_else(|| default_model.to_string()),
        );
        spec.api_key = rc.api_key.clone().or_else(|| self.api_key.clone());
        spec.endpoint = rc.endpoint.clone().or_else(|| self.endpoint.clone());
        spec.timeout = self.timeout_secs.map(Duration::from_secs);

        let params = GenerationParams {
            temperature: rc.temperature.or(default_temp),
            max_tokens: rc.max_tokens,
        };
        (spec, params)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
    #[serde(default = "default_brand_voice")]
    pub default_brand_voice: String,
    /// Drafts longer than this fail validation without a critic call.
    #[serde(default = "default_max_draft_chars")]
    pub max_draft_chars: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            stage_timeout_secs: default_stage_timeout_secs(),
            default_brand_voice: default_brand_voice(),
            max_draft_chars: default_max_draft_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub emit_stderr: bool,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            emit_stderr: false,
            dir: None,
        }
    }
}

/// Replacement prompt templates; unset entries keep the built-in text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptOverrides {
    #[serde(default)]
    pub synthesize: Option<String>,
    #[serde(default)]
    pub draft: Option<String>,
    #[serde(default)]
    pub validate: Option<String>,
}

fn default_max_results() -> u32 {
    2
}
fn default_query_template() -> String {
    TOPIC_PLACEHOLDER.into()
}
fn default_max_retries() -> u32 {
    1
}
fn default_stage_timeout_secs() -> u64 {
    60
}
fn default_brand_voice() -> String {
    "professional".into()
}
fn default_max_draft_chars() -> Option<usize> {
    Some(4000)
}
fn default_log_level() -> String {
    "info".into()
}

impl QuillConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let invalid = |msg: String| Err(ConfigLoadError::Invalid(msg));

        if !self.search.query_template.contains(TOPIC_PLACEHOLDER) {
            return invalid(format!(
                "search.query_template must contain {TOPIC_PLACEHOLDER}, got {:?}",
                self.search.query_template
            ));
        }
        if self.search.max_results == 0 {
            return invalid("search.max_results must be at least 1".into());
        }
        if self.pipeline.stage_timeout_secs == 0 {
            return invalid("pipeline.stage_timeout_secs must be at least 1".into());
        }
        if self.pipeline.default_brand_voice.trim().is_empty() {
            return invalid("pipeline.default_brand_voice must not be empty".into());
        }
        if has_placeholder(&self.search.api_key) {
            return invalid(
                "search.api_key references an unset environment variable".into(),
            );
        }
        for (name, role) in [
            ("synthesize", LlmRole::Synthesize),
            ("draft", LlmRole::Draft),
            ("validate", LlmRole::Validate),
        ] {
            let (spec, _) = self.llm.resolve(role);
            if spec.model.trim().is_empty() {
                return invalid(format!("llm.{name}.model must not be empty"));
            }
            if spec.api_key.as_deref().is_some_and(has_placeholder) {
                return invalid(format!(
                    "llm.{name}.api_key references an unset environment variable"
                ));
            }
        }
        Ok(())
    }
}

fn has_placeholder(s: &str) -> bool {
    s.contains("${")
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

/// Builder over the `config` crate wiring (files + env overrides).
pub struct QuillConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for QuillConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl QuillConfigLoader {
    /// Start with `QUILL__` env overrides only.
    ///
    /// ```
    /// use quill_config::QuillConfigLoader;
    ///
    /// let config = QuillConfigLoader::new()
    ///     .with_yaml_str("version: '1'\nsearch:\n  api_key: tvly-demo")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.pipeline.max_retries, 1);
    /// assert_eq!(config.search.max_results, 2);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, for env-only deployments.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge the sources, expand `${VAR}` placeholders and validate.
    ///
    /// ```
    /// use quill_config::{LlmRole, QuillConfigLoader};
    ///
    /// unsafe { std::env::set_var("DOC_GROQ_KEY", "gsk-from-env"); }
    ///
    /// let config = QuillConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// llm:
    ///   api_key: "${DOC_GROQ_KEY}"
    ///   draft:
    ///     model: "llama-3.3-70b-versatile"
    ///     temperature: 0.7
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// let (spec, params) = config.llm.resolve(LlmRole::Draft);
    /// assert_eq!(spec.model, "llama-3.3-70b-versatile");
    /// assert_eq!(spec.api_key.as_deref(), Some("gsk-from-env"));
    /// assert_eq!(params.temperature, Some(0.7));
    ///
    /// unsafe { std::env::remove_var("DOC_GROQ_KEY"); }
    /// ```
    pub fn load(self) -> Result<QuillConfig, ConfigLoadError> {
        let merged = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let mut v: Value = merged.try_deserialize()?;
        expand_env_in_value(&mut v);

        // Round-trip through `config` again: its deserializer coerces the
        // string values env vars produce ("3", "true") into typed fields.
        let typed: QuillConfig = Config::try_from(&v)?.try_deserialize()?;
        typed.validate()?;
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Winston")), ("STATE", Some("NC"))], || {
            let mut v = json!(["hello-$CITY", { "loc": "${CITY}-${STATE}" }, 42, true, null]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["hello-Winston", { "loc": "Winston-NC" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${QUILL_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${QUILL_DOES_NOT_EXIST}"));
    }

    #[test]
    fn role_defaults_follow_call_sites() {
        let cfg = LlmConfig {
            api_key: Some("shared".into()),
            ..Default::default()
        };

        let (spec, params) = cfg.resolve(LlmRole::Synthesize);
        assert_eq!(spec.model, DEFAULT_SYNTHESIZE_MODEL);
        assert_eq!(params.temperature, Some(0.0));
        assert_eq!(spec.api_key.as_deref(), Some("shared"));

        let (spec, params) = cfg.resolve(LlmRole::Draft);
        assert_eq!(spec.model, DEFAULT_DRAFT_MODEL);
        assert_eq!(params.temperature, None);

        let (_, params) = cfg.resolve(LlmRole::Validate);
        assert_eq!(params.temperature, Some(0.0));
    }

    #[test]
    fn role_overrides_win_over_shared_settings() {
        let cfg = LlmConfig {
            provider: LlmProvider::Groq,
            api_key: Some("shared".into()),
            validate: RoleConfig {
                provider: Some(LlmProvider::Ollama),
                model: Some("qwen2.5:7b".into()),
                api_key: Some("own".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let (spec, _) = cfg.resolve(LlmRole::Validate);
        assert_eq!(spec.provider, LlmProvider::Ollama);
        assert_eq!(spec.model, "qwen2.5:7b");
        assert_eq!(spec.api_key.as_deref(), Some("own"));
    }

    #[test]
    fn validate_rejects_template_without_topic() {
        let mut cfg = QuillConfig::default();
        cfg.search.query_template = "news about things".into();
        assert!(matches!(cfg.validate(), Err(ConfigLoadError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_unexpanded_keys() {
        let mut cfg = QuillConfig::default();
        cfg.search.api_key = "${TAVILY_API_KEY}".into();
        assert!(cfg.validate().is_err());

        let mut cfg = QuillConfig::default();
        cfg.llm.draft.api_key = Some("${GROQ_API_KEY}".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn defaults_are_valid() {
        QuillConfig::default().validate().unwrap();
    }
}
