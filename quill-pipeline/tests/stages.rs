mod common;

use common::{sample_hits, FakeSearch, ScriptedLlm, BULLETS, FAIL_TONE, PASS};
use quill_common::Stage;
use quill_llm::traits::GenerationParams;
use quill_pipeline::query::QueryPolicy;
use quill_pipeline::validation::FALLBACK_FEEDBACK;
use quill_pipeline::{
    DraftStage, PipelineStage, PipelineState, SearchStage, SynthesizeStage, ValidateStage,
    ValidationRules,
};
use quill_search::SearchDepth;

fn state_with_bullets() -> PipelineState {
    PipelineState {
        synthesized_content: BULLETS.to_string(),
        ..PipelineState::new("AI", "witty")
    }
}

#[tokio::test]
async fn search_stage_applies_query_policy_cap_and_depth() {
    let fake = FakeSearch::with_hits(sample_hits());
    let stage = SearchStage::new(fake.clone())
        .with_policy(QueryPolicy::new("{topic} Language: English").unwrap());

    let next = stage.run(PipelineState::new("AI", "witty")).await.unwrap();

    let req = &fake.requests()[0];
    assert_eq!(req.query, "AI Language: English");
    assert_eq!(req.max_results, 2);
    assert_eq!(req.depth, SearchDepth::Fast);
    assert_eq!(next.search_result.len(), 2);
    assert_eq!(next.search_result[0].url, "https://news.example/ai-chips");
    assert_eq!(stage.stage(), Stage::Search);
}

#[tokio::test]
async fn search_stage_honours_custom_cap() {
    let fake = FakeSearch::with_hits(sample_hits());
    let stage = SearchStage::new(fake.clone())
        .with_max_results(1)
        .with_depth(SearchDepth::Advanced);

    let next = stage.run(PipelineState::new("AI", "witty")).await.unwrap();

    assert_eq!(next.search_result.len(), 1);
    assert_eq!(fake.requests()[0].depth, SearchDepth::Advanced);
}

#[tokio::test]
async fn synthesize_stage_sends_every_record_at_temperature_zero() {
    let llm = ScriptedLlm::new("synth", &[BULLETS]);
    let stage = SynthesizeStage::new(llm.clone());
    let state = PipelineState {
        search_result: sample_hits().into_iter().map(Into::into).collect(),
        ..PipelineState::new("AI", "witty")
    };

    let next = stage.run(state.clone()).await.unwrap();

    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("exactly 2 bullet"));
    assert!(prompt.contains("[1] AI chip demand keeps growing"));
    assert!(prompt.contains("[2] Agents in production"));
    assert_eq!(llm.temperatures(), vec![Some(0.0)]);
    assert_eq!(next.synthesized_content, BULLETS);
    assert_eq!(next.search_result, state.search_result);
}

#[tokio::test]
async fn synthesize_keeps_raw_text_even_when_bullets_mismatch() {
    let llm = ScriptedLlm::new("synth", &["one long paragraph"]);
    let state = PipelineState {
        search_result: sample_hits().into_iter().map(Into::into).collect(),
        ..PipelineState::new("AI", "witty")
    };

    let next = SynthesizeStage::new(llm).run(state).await.unwrap();
    assert_eq!(next.synthesized_content, "one long paragraph");
}

#[tokio::test]
async fn draft_stage_overwrites_previous_draft() {
    let llm = ScriptedLlm::new("draft", &["fresh copy"]);
    let stage = DraftStage::new(llm.clone()).with_params(GenerationParams {
        temperature: Some(0.7),
        max_tokens: Some(300),
    });
    let state = PipelineState {
        draft_content: "old copy".into(),
        validation_feedback: "Shorter, please.".into(),
        ..state_with_bullets()
    };

    let next = stage.run(state).await.unwrap();

    assert_eq!(next.draft_content, "fresh copy");
    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("witty"));
    assert!(prompt.contains("Shorter, please."));
    assert!(prompt.contains(BULLETS));
    assert_eq!(llm.temperatures(), vec![Some(0.7)]);
}

#[tokio::test]
async fn draft_template_override_is_used() {
    let llm = ScriptedLlm::new("draft", &["ok"]);
    let stage = DraftStage::new(llm.clone())
        .with_template("Voice={brand_voice}; feedback={validation_feedback}; {bullet_points}");

    stage.run(state_with_bullets()).await.unwrap();

    assert_eq!(
        llm.prompts()[0],
        format!("Voice=witty; feedback=; {BULLETS}")
    );
}

#[tokio::test]
async fn validate_stage_records_critic_verdict() {
    let llm = ScriptedLlm::new("critic", &[FAIL_TONE]);
    let stage = ValidateStage::new(llm.clone());
    let state = PipelineState {
        draft_content: "Buy now!!!".into(),
        ..state_with_bullets()
    };

    let next = stage.run(state).await.unwrap();

    assert!(!next.validation_passed);
    assert_eq!(next.validation_feedback, "Too stiff for the brand voice.");
    assert!(llm.prompts()[0].contains("Buy now!!!"));
    assert_eq!(llm.temperatures(), vec![Some(0.0)]);
}

#[tokio::test]
async fn passing_verdict_clears_old_feedback() {
    let llm = ScriptedLlm::new("critic", &[PASS]);
    let state = PipelineState {
        draft_content: "Better copy".into(),
        validation_feedback: "Too stiff.".into(),
        ..state_with_bullets()
    };

    let next = ValidateStage::new(llm).run(state).await.unwrap();

    assert!(next.validation_passed);
    assert!(next.validation_feedback.is_empty());
}

#[tokio::test]
async fn unreadable_critic_reply_is_a_failed_verdict() {
    let llm = ScriptedLlm::new("critic", &[""]);
    let state = PipelineState {
        draft_content: "Some copy".into(),
        ..state_with_bullets()
    };

    let next = ValidateStage::new(llm).run(state).await.unwrap();

    assert!(!next.validation_passed);
    assert_eq!(next.validation_feedback, FALLBACK_FEEDBACK);
}

#[tokio::test]
async fn validate_is_idempotent_per_call() {
    let llm = ScriptedLlm::new("critic", &[FAIL_TONE]);
    let stage = ValidateStage::new(llm);
    let state = PipelineState {
        draft_content: "Some copy".into(),
        ..state_with_bullets()
    };

    let a = stage.run(state.clone()).await.unwrap();
    let b = stage.run(state).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn length_rule_skips_the_critic() {
    let llm = ScriptedLlm::new("critic", &[PASS]);
    let stage = ValidateStage::new(llm.clone()).with_rules(ValidationRules {
        max_draft_chars: Some(5),
    });
    let state = PipelineState {
        draft_content: "far too long".into(),
        ..state_with_bullets()
    };

    let next = stage.run(state).await.unwrap();

    assert!(!next.validation_passed);
    assert!(next.validation_feedback.contains("5 characters"));
    assert_eq!(llm.calls(), 0);
}
