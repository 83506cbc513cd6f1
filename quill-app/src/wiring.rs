use anyhow::{Context, Result};
use quill_common::observability::LogConfig;
use quill_config::{LlmRole, LoggingConfig, QuillConfig};
use quill_llm::ensure_llm_ready;
use quill_pipeline::prompts::PromptSet;
use quill_pipeline::query::QueryPolicy;
use quill_pipeline::{
    DraftStage, Pipeline, PipelineOptions, SearchStage, SharedLlm, SynthesizeStage, ValidateStage,
    ValidationRules,
};
use quill_search::build_search_client;
use std::time::Duration;

pub fn log_config(cfg: &LoggingConfig) -> LogConfig {
    LogConfig {
        app_name: "quill",
        log_dir: cfg.dir.clone(),
        emit_stderr: cfg.emit_stderr,
        format: cfg.format,
        default_filter: cfg.level.clone(),
    }
}

pub fn pipeline_options(cfg: &QuillConfig) -> PipelineOptions {
    PipelineOptions {
        max_retries: cfg.pipeline.max_retries,
        stage_timeout: Duration::from_secs(cfg.pipeline.stage_timeout_secs),
        default_brand_voice: cfg.pipeline.default_brand_voice.clone(),
    }
}

async fn llm_for(cfg: &QuillConfig, role: LlmRole) -> Result<SharedLlm> {
    let (spec, _) = cfg.llm.resolve(role);
    tracing::debug!(?role, provider = ?spec.provider, model = %spec.model, "building llm client");
    ensure_llm_ready(&spec)
        .await
        .with_context(|| format!("{role:?} model `{}`", spec.model))
}

/// Build every collaborator named in `cfg` and assemble the pipeline.
pub async fn build_pipeline(cfg: &QuillConfig) -> Result<Pipeline> {
    let search = build_search_client(
        cfg.search.provider,
        &cfg.search.api_key,
        cfg.search.timeout_secs.map(Duration::from_secs),
    )
    .context("search client")?;

    let prompts = PromptSet::default().with_overrides(
        cfg.prompts.synthesize.clone(),
        cfg.prompts.draft.clone(),
        cfg.prompts.validate.clone(),
    );
    let policy = QueryPolicy::new(cfg.search.query_template.clone())?;

    let search_stage = SearchStage::new(search)
        .with_policy(policy)
        .with_max_results(cfg.search.max_results)
        .with_depth(cfg.search.depth);

    let synthesize = SynthesizeStage::new(llm_for(cfg, LlmRole::Synthesize).await?)
        .with_template(prompts.synthesize)
        .with_params(cfg.llm.resolve(LlmRole::Synthesize).1);
    let draft = DraftStage::new(llm_for(cfg, LlmRole::Draft).await?)
        .with_template(prompts.draft)
        .with_params(cfg.llm.resolve(LlmRole::Draft).1);
    let validate = ValidateStage::new(llm_for(cfg, LlmRole::Validate).await?)
        .with_template(prompts.validate)
        .with_params(cfg.llm.resolve(LlmRole::Validate).1)
        .with_rules(ValidationRules {
            max_draft_chars: cfg.pipeline.max_draft_chars,
        });

    Ok(Pipeline::new(search_stage, synthesize, draft, validate).with_options(pipeline_options(cfg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_config::QuillConfigLoader;

    fn config(yaml: &str) -> QuillConfig {
        QuillConfigLoader::new().with_yaml_str(yaml).load().unwrap()
    }

    #[test]
    fn options_follow_pipeline_section() {
        let cfg = config("pipeline:\n  max_retries: 2\n  stage_timeout_secs: 5\n  default_brand_voice: bold\n");
        let o = pipeline_options(&cfg);
        assert_eq!(o.max_retries, 2);
        assert_eq!(o.stage_timeout, Duration::from_secs(5));
        assert_eq!(o.default_brand_voice, "bold");
    }

    #[test]
    fn log_config_maps_logging_section() {
        let cfg = config("logging:\n  level: debug\n  emit_stderr: true\n  dir: /tmp/quill-logs\n");
        let lc = log_config(&cfg.logging);
        assert_eq!(lc.default_filter, "debug");
        assert!(lc.emit_stderr);
        assert_eq!(lc.log_dir.as_deref(), Some(std::path::Path::new("/tmp/quill-logs")));
    }

    #[tokio::test]
    async fn hosted_clients_build_without_network() {
        let cfg = config(
            "search:\n  api_key: tvly-test\nllm:\n  api_key: gsk-test\n  draft:\n    model: custom-writer\n",
        );
        let pipeline = build_pipeline(&cfg).await.unwrap();
        assert_eq!(pipeline.options().max_retries, 1);
    }

    #[tokio::test]
    async fn missing_search_key_is_reported() {
        let cfg = config("llm:\n  api_key: gsk-test\n");
        let err = build_pipeline(&cfg).await.err().unwrap();
        assert!(format!("{err:#}").contains("search"));
    }
}
