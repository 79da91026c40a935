//! Debate orchestration
//!
//! A run walks `Init -> Generating -> Critiquing -> Judging -> Recorded`.
//! Calls within a stage run concurrently; stages never overlap. Provider
//! failures come back as error-flagged results and are recorded like any
//! other text, so the protocol always reaches the judge.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use amicus_core::{ContextPack, FingerprintError, Hash, PromptPack, ProviderNames, RunMode};
use amicus_llm::{GenerationMeta, GenerationRequest, GenerationResult, LlmProvider};
use amicus_persist::{NewDebateRecord, RunId, RunStore, StorageBackend, StorageError};

use crate::prompt::{critique_prompt, judge_prompt, render_prompt, Debater, JudgeInputs};
use crate::roles::{Role, StageParams, CRITIQUE_PARAMS, JUDGE_PARAMS};

/// Initial-answer temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
/// Initial-answer output budget
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1400;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebateStage {
    Init,
    Generating,
    Critiquing,
    Judging,
    Recorded,
}

/// What to do when no judge is named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JudgeFallback {
    /// Debater A judges (it has seen its own answer, so it is not neutral)
    #[default]
    DebaterA,
    /// Refuse to run without an explicit judge
    Required,
}

#[derive(Debug, Clone)]
pub struct DebateConfig {
    /// Stage-1 sampling temperature
    pub temperature: f32,
    /// Stage-1 output budget
    pub max_output_tokens: u32,
    /// Per-call timeout, every stage
    pub timeout: Duration,
    pub judge_fallback: JudgeFallback,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout: DEFAULT_CALL_TIMEOUT,
            judge_fallback: JudgeFallback::DebaterA,
        }
    }
}

/// The providers taking part in a run
#[derive(Debug, Clone)]
pub struct DebateParticipants {
    pub a: Arc<dyn LlmProvider>,
    pub b: Arc<dyn LlmProvider>,
    pub judge: Option<Arc<dyn LlmProvider>>,
}

impl DebateParticipants {
    pub fn new(a: Arc<dyn LlmProvider>, b: Arc<dyn LlmProvider>) -> Self {
        Self { a, b, judge: None }
    }

    pub fn with_judge(mut self, judge: Arc<dyn LlmProvider>) -> Self {
        self.judge = Some(judge);
        self
    }
}

/// The five texts of a run, plus per-call metadata
#[derive(Debug, Clone, PartialEq)]
pub struct DebateTranscript {
    pub model_a_output: String,
    pub model_b_output: String,
    /// A's critique of B
    pub critique_a: String,
    /// B's critique of A
    pub critique_b: String,
    pub judge_output: String,
    /// In call order: A, B, A critique, B critique, judge
    pub calls: Vec<GenerationMeta>,
}

impl DebateTranscript {
    pub fn degraded_calls(&self) -> usize {
        self.calls.iter().filter(|m| m.error).count()
    }
}

/// A recorded run
#[derive(Debug, Clone)]
pub struct DebateOutcome {
    pub run_id: RunId,
    pub inputs_hash: Hash,
    pub record_hash: Hash,
    pub transcript: DebateTranscript,
}

#[derive(Debug, Error)]
pub enum DebateError {
    #[error("No judge given and the judge fallback requires one")]
    JudgeRequired,
    #[error("Could not fingerprint inputs: {0}")]
    Fingerprint(#[from] FingerprintError),
    /// The debate finished but could not be recorded; the transcript is
    /// handed back for display
    #[error("Debate finished but was not recorded: {source}")]
    Store {
        transcript: Box<DebateTranscript>,
        source: StorageError,
    },
}

/// Runs debates and appends their records
#[derive(Debug)]
pub struct DebateOrchestrator<B: StorageBackend + ?Sized> {
    runs: Arc<RunStore<B>>,
    config: DebateConfig,
}

impl<B: StorageBackend + ?Sized> DebateOrchestrator<B> {
    pub fn new(runs: Arc<RunStore<B>>) -> Self {
        Self {
            runs,
            config: DebateConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DebateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    pub fn runs(&self) -> &Arc<RunStore<B>> {
        &self.runs
    }

    fn request(&self, role: Role, user: String, params: StageParams) -> GenerationRequest {
        GenerationRequest::new(role.system_prompt(), user)
            .with_temperature(params.temperature)
            .with_max_output_tokens(params.max_output_tokens)
            .with_timeout(self.config.timeout)
    }

    /// Run one debate
    ///
    /// `rag_snippets`, when given, take precedence over snippets already in
    /// the context pack. Empty snippets count as no grounding.
    pub async fn run_debate(
        &self,
        ctx: &ContextPack,
        mode: RunMode,
        task: &str,
        participants: &DebateParticipants,
        rag_snippets: Option<&str>,
    ) -> Result<DebateOutcome, DebateError> {
        let mut stage = DebateStage::Init;

        let judge = match (&participants.judge, self.config.judge_fallback) {
            (Some(judge), _) => judge.clone(),
            (None, JudgeFallback::DebaterA) => participants.a.clone(),
            (None, JudgeFallback::Required) => return Err(DebateError::JudgeRequired),
        };

        let snippets = rag_snippets
            .or(ctx.retrieved_snippets.as_deref())
            .filter(|s| !s.trim().is_empty());

        let pack = PromptPack::new(
            ctx,
            mode,
            task,
            snippets.is_some(),
            ProviderNames {
                a: participants.a.name().to_string(),
                b: participants.b.name().to_string(),
                judge: judge.name().to_string(),
            },
        );
        let inputs_hash = pack.fingerprint()?;
        let prompt_pack = pack.snapshot()?;

        tracing::info!(
            case_id = ctx.case_id,
            mode = %mode,
            inputs_hash = %inputs_hash.short(12),
            a = %participants.a.name(),
            b = %participants.b.name(),
            judge = %judge.name(),
            "Starting debate"
        );

        advance(&mut stage, DebateStage::Generating);
        let base = render_prompt(ctx, task, mode, snippets);
        let initial = StageParams {
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        };
        let (a0, b0) = tokio::join!(
            participants
                .a
                .generate(self.request(Role::Analyst, base.clone(), initial)),
            participants
                .b
                .generate(self.request(Role::Analyst, base.clone(), initial)),
        );

        advance(&mut stage, DebateStage::Critiquing);
        let (a1, b1) = tokio::join!(
            participants.a.generate(self.request(
                Role::Critic,
                critique_prompt(&base, Debater::B, &b0.text),
                CRITIQUE_PARAMS
            )),
            participants.b.generate(self.request(
                Role::Critic,
                critique_prompt(&base, Debater::A, &a0.text),
                CRITIQUE_PARAMS
            )),
        );

        advance(&mut stage, DebateStage::Judging);
        let verdict = judge
            .generate(self.request(
                Role::Judge,
                judge_prompt(
                    &base,
                    JudgeInputs {
                        answer_a: &a0.text,
                        answer_b: &b0.text,
                        critique_a: &a1.text,
                        critique_b: &b1.text,
                    },
                ),
                JUDGE_PARAMS,
            ))
            .await;

        let transcript = transcript([a0, b0, a1, b1, verdict]);
        let degraded = transcript.degraded_calls();
        if degraded > 0 {
            metrics::counter!("amicus_debate_degraded_calls_total").increment(degraded as u64);
            tracing::warn!(degraded, case_id = ctx.case_id, "Debate ran with degraded calls");
        }

        let record = NewDebateRecord {
            case_id: ctx.case_id,
            mode,
            inputs_hash,
            prompt_pack,
            model_a_output: transcript.model_a_output.clone(),
            model_b_output: transcript.model_b_output.clone(),
            critique_a: transcript.critique_a.clone(),
            critique_b: transcript.critique_b.clone(),
            judge_output: transcript.judge_output.clone(),
        };

        let stored = match self.runs.append(record).await {
            Ok(stored) => stored,
            Err(source) => {
                metrics::counter!("amicus_debate_record_failures_total").increment(1);
                tracing::error!(case_id = ctx.case_id, error = %source, "Failed to record debate");
                return Err(DebateError::Store {
                    transcript: Box::new(transcript),
                    source,
                });
            }
        };

        advance(&mut stage, DebateStage::Recorded);
        metrics::counter!("amicus_debate_runs_total").increment(1);

        Ok(DebateOutcome {
            run_id: stored.id,
            inputs_hash,
            record_hash: stored.record_hash,
            transcript,
        })
    }
}

fn advance(stage: &mut DebateStage, next: DebateStage) {
    tracing::debug!(from = ?*stage, to = ?next, "Debate stage");
    *stage = next;
}

fn transcript(results: [GenerationResult; 5]) -> DebateTranscript {
    let [a0, b0, a1, b1, verdict] = results;
    let calls = vec![
        a0.meta, b0.meta, a1.meta, b1.meta, verdict.meta,
    ];
    DebateTranscript {
        model_a_output: a0.text,
        model_b_output: b0.text,
        critique_a: a1.text,
        critique_b: b1.text,
        judge_output: verdict.text,
        calls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amicus_core::Memo;
    use amicus_llm::MockProvider;
    use amicus_persist::MemoryBackend;

    fn ctx() -> ContextPack {
        ContextPack {
            case_id: 1,
            case_name: "Acme".into(),
            lock_mode: false,
            memo: Memo::default(),
            evidence_summary: String::new(),
            document_text: None,
            retrieved_snippets: None,
        }
    }

    fn orchestrator() -> DebateOrchestrator<MemoryBackend> {
        DebateOrchestrator::new(Arc::new(RunStore::new(Arc::new(MemoryBackend::new()))))
    }

    #[tokio::test]
    async fn test_stage_parameters() {
        let a = Arc::new(MockProvider::constant("a").named("a"));
        let b = Arc::new(MockProvider::constant("b").named("b"));
        let participants = DebateParticipants::new(a.clone(), b.clone());

        orchestrator()
            .run_debate(&ctx(), RunMode::General, "task", &participants, None)
            .await
            .unwrap();

        let requests = a.requests().await;
        // A answers, critiques, then judges by default
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].temperature, DEFAULT_TEMPERATURE);
        assert_eq!(requests[0].max_output_tokens, DEFAULT_MAX_OUTPUT_TOKENS);
        assert_eq!(requests[0].system, Role::Analyst.system_prompt());
        assert_eq!(requests[1].temperature, 0.1);
        assert_eq!(requests[1].max_output_tokens, 900);
        assert_eq!(requests[1].system, Role::Critic.system_prompt());
        assert_eq!(requests[2].system, Role::Judge.system_prompt());
        assert_eq!(requests[2].max_output_tokens, 900);
        assert_eq!(b.call_count(), 2);
    }

    #[tokio::test]
    async fn test_context_snippets_are_used_when_no_override() {
        let a = Arc::new(MockProvider::constant("a").named("a"));
        let b = Arc::new(MockProvider::constant("b").named("b"));
        let participants = DebateParticipants::new(a.clone(), b);
        let ctx = ctx().with_snippets("[fees] USCIS Filing Fees");

        let outcome = orchestrator()
            .run_debate(&ctx, RunMode::Fees, "task", &participants, None)
            .await
            .unwrap();

        let requests = a.requests().await;
        assert!(requests[0].user.contains("=== OFFICIAL SOURCES (RAG SNIPPETS) ===\n[fees] USCIS Filing Fees"));
        assert_eq!(outcome.transcript.degraded_calls(), 0);
    }
}
