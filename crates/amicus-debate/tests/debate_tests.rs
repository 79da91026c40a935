use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use amicus_core::{ContextPack, PromptPack, ProviderNames, RunMode};
use amicus_debate::{
    CaseDesk, ContextAssembler, DebateConfig, DebateError, DebateOrchestrator,
    DebateParticipants, DeskError, JudgeFallback,
};
use amicus_llm::{Embedder, HashingEmbedder, MockProvider};
use amicus_persist::{
    CaseStore, MemoryBackend, MemoryVectorIndex, NewVersion, RunStore, StorageBackend,
    StorageError,
};
use amicus_rag::{ChunkerConfig, FetchedPage, Ingestor, Retriever};

fn orchestrator(backend: Arc<MemoryBackend>) -> DebateOrchestrator<MemoryBackend> {
    DebateOrchestrator::new(Arc::new(RunStore::new(backend)))
}

async fn acme_context(backend: Arc<MemoryBackend>) -> ContextPack {
    let cases = Arc::new(CaseStore::new(backend));
    let case = cases
        .upsert_case("Acme Researcher", json!({"en": "Field: Data Science"}), true)
        .await
        .unwrap();
    ContextAssembler::new(cases)
        .build(case.id, None, false)
        .await
        .unwrap()
}

#[tokio::test]
async fn echo_scenario_prefixes_and_recomputable_fingerprint() {
    let backend = Arc::new(MemoryBackend::new());
    let ctx = acme_context(backend.clone()).await;
    let orchestrator = orchestrator(backend);

    let participants = DebateParticipants::new(
        Arc::new(MockProvider::echo("A-said:").named("echo-a")),
        Arc::new(MockProvider::echo("B-said:").named("echo-b")),
    )
    .with_judge(Arc::new(MockProvider::echo("J-said:").named("echo-j")));

    let outcome = orchestrator
        .run_debate(&ctx, RunMode::Requirements, "List the criteria", &participants, None)
        .await
        .unwrap();
    let t = &outcome.transcript;

    assert!(t.model_a_output.starts_with("A-said:"));
    assert!(t.model_b_output.starts_with("B-said:"));
    assert!(t.critique_a.starts_with("A-said:"));
    assert!(t.critique_b.starts_with("B-said:"));
    assert!(t.judge_output.starts_with("J-said:"));
    assert!(t.model_a_output.ends_with("MODE=requirements"));
    assert!(t.critique_a.ends_with("Now critique the OTHER MODEL answer strictly."));
    assert!(t.judge_output.ends_with("Synthesize a final answer per your instructions."));

    let expected = PromptPack::new(
        &ctx,
        RunMode::Requirements,
        "List the criteria",
        false,
        ProviderNames {
            a: "echo-a".into(),
            b: "echo-b".into(),
            judge: "echo-j".into(),
        },
    )
    .fingerprint()
    .unwrap();
    assert_eq!(outcome.inputs_hash, expected);

    let record = orchestrator.runs().get(outcome.run_id).await.unwrap().unwrap();
    assert_eq!(record.content.inputs_hash, expected);
    assert_eq!(record.content.mode, RunMode::Requirements);
    assert_eq!(record.content.model_a_output, t.model_a_output);
    assert_eq!(record.content.model_b_output, t.model_b_output);
    assert_eq!(record.content.critique_a, t.critique_a);
    assert_eq!(record.content.critique_b, t.critique_b);
    assert_eq!(record.content.judge_output, t.judge_output);
    assert_eq!(record.content.prompt_pack["case_name"], "Acme Researcher");
    assert_eq!(record.content.prompt_pack["providers"]["judge"], "echo-j");
}

#[tokio::test]
async fn every_run_records_five_texts_once() {
    let backend = Arc::new(MemoryBackend::new());
    let ctx = acme_context(backend.clone()).await;
    let orchestrator = orchestrator(backend);
    let participants = DebateParticipants::new(
        Arc::new(MockProvider::constant("alpha").named("a")),
        Arc::new(MockProvider::constant("beta").named("b")),
    );

    let first = orchestrator
        .run_debate(&ctx, RunMode::General, "task", &participants, None)
        .await
        .unwrap();
    let second = orchestrator
        .run_debate(&ctx, RunMode::General, "task", &participants, None)
        .await
        .unwrap();

    assert_eq!(second.run_id, first.run_id + 1);
    // Same inputs, same fingerprint; runs are never deduplicated
    assert_eq!(first.inputs_hash, second.inputs_hash);

    let records = orchestrator.runs().list_by_case(ctx.case_id).await.unwrap();
    assert_eq!(records.len(), 2);
    for outcome in [&first, &second] {
        let record = orchestrator.runs().get(outcome.run_id).await.unwrap().unwrap();
        let (r, t) = (&record.content, &outcome.transcript);
        assert_eq!(r.model_a_output, t.model_a_output);
        assert_eq!(r.model_b_output, t.model_b_output);
        assert_eq!(r.critique_a, t.critique_a);
        assert_eq!(r.critique_b, t.critique_b);
        assert_eq!(r.judge_output, t.judge_output);
        assert_eq!(r.model_a_output, "alpha");
        assert_eq!(r.critique_b, "beta");
    }
    assert!(orchestrator.runs().verify_chain().await.unwrap());
}

#[tokio::test]
async fn critiques_see_the_other_answer() {
    let backend = Arc::new(MemoryBackend::new());
    let ctx = acme_context(backend.clone()).await;
    let a = Arc::new(MockProvider::constant("alpha answer").named("a"));
    let b = Arc::new(MockProvider::constant("beta answer").named("b"));
    let participants = DebateParticipants::new(a.clone(), b.clone());

    orchestrator(backend)
        .run_debate(&ctx, RunMode::General, "task", &participants, None)
        .await
        .unwrap();

    let a_requests = a.requests().await;
    let b_requests = b.requests().await;
    assert!(a_requests[1]
        .user
        .contains("=== OTHER MODEL ANSWER (B) ===\nbeta answer"));
    assert!(b_requests[1]
        .user
        .contains("=== OTHER MODEL ANSWER (A) ===\nalpha answer"));
    // Stage-1 prompts are identical for both debaters
    assert_eq!(a_requests[0].user, b_requests[0].user);
}

#[tokio::test]
async fn provider_failure_is_recorded_and_protocol_advances() {
    let backend = Arc::new(MemoryBackend::new());
    let ctx = acme_context(backend.clone()).await;
    let a = Arc::new(MockProvider::constant("alpha").named("a").failing_on(&[0]));
    let b = Arc::new(MockProvider::constant("beta").named("b"));
    let participants = DebateParticipants::new(a.clone(), b.clone());

    let outcome = orchestrator(backend)
        .run_debate(&ctx, RunMode::General, "task", &participants, None)
        .await
        .unwrap();
    let t = &outcome.transcript;

    assert!(t.model_a_output.starts_with("[a error]"));
    assert!(t.calls[0].error);
    assert_eq!(t.degraded_calls(), 1);
    assert_eq!(t.critique_a, "alpha");
    assert_eq!(t.judge_output, "alpha");

    // B critiques the failure text, and the judge sees it too
    let b_requests = b.requests().await;
    assert!(b_requests[1].user.contains("[a error]"));
    let a_requests = a.requests().await;
    assert!(a_requests[2].user.contains("=== MODEL A ANSWER ===\n[a error]"));
}

#[tokio::test]
async fn timeouts_degrade_instead_of_failing() {
    let backend = Arc::new(MemoryBackend::new());
    let ctx = acme_context(backend.clone()).await;
    let participants = DebateParticipants::new(
        Arc::new(MockProvider::constant("alpha").named("a")),
        Arc::new(
            MockProvider::constant("beta")
                .named("slow")
                .with_latency(Duration::from_secs(5)),
        ),
    );
    let orchestrator = orchestrator(backend).with_config(DebateConfig {
        timeout: Duration::from_millis(50),
        ..DebateConfig::default()
    });

    let outcome = orchestrator
        .run_debate(&ctx, RunMode::General, "task", &participants, None)
        .await
        .unwrap();
    assert!(outcome.transcript.model_b_output.contains("Timed out"));
    assert!(outcome.transcript.critique_b.contains("Timed out"));
    assert_eq!(outcome.transcript.degraded_calls(), 2);
    assert_eq!(outcome.transcript.judge_output, "alpha");
}

#[tokio::test]
async fn judge_defaults_to_a_unless_required() {
    let backend = Arc::new(MemoryBackend::new());
    let ctx = acme_context(backend.clone()).await;
    let a = Arc::new(MockProvider::constant("alpha").named("a"));
    let participants = DebateParticipants::new(a.clone(), Arc::new(MockProvider::constant("beta").named("b")));

    let outcome = orchestrator(backend.clone())
        .run_debate(&ctx, RunMode::General, "task", &participants, None)
        .await
        .unwrap();
    assert_eq!(a.call_count(), 3);
    assert_eq!(outcome.transcript.calls[4].provider, "a");

    let strict = orchestrator(backend).with_config(DebateConfig {
        judge_fallback: JudgeFallback::Required,
        ..DebateConfig::default()
    });
    let err = strict
        .run_debate(&ctx, RunMode::General, "task", &participants, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DebateError::JudgeRequired));
    // Nothing was called for the refused run
    assert_eq!(a.call_count(), 3);
}

#[derive(Debug)]
struct ReadOnlyBackend;

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        "read-only"
    }

    async fn is_healthy(&self) -> bool {
        false
    }

    async fn set_value(&self, _key: &str, _value: serde_json::Value) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk is read-only".into()))
    }

    async fn get_value(&self, _key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(None)
    }

    async fn delete(&self, _key: &str) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn list_keys(&self, _prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn store_failure_hands_back_the_transcript() {
    let ctx = acme_context(Arc::new(MemoryBackend::new())).await;
    let orchestrator = DebateOrchestrator::new(Arc::new(RunStore::new(Arc::new(ReadOnlyBackend))));
    let participants = DebateParticipants::new(
        Arc::new(MockProvider::constant("alpha").named("a")),
        Arc::new(MockProvider::constant("beta").named("b")),
    );

    let err = orchestrator
        .run_debate(&ctx, RunMode::General, "task", &participants, None)
        .await
        .unwrap_err();
    match err {
        DebateError::Store { transcript, source } => {
            assert_eq!(transcript.model_b_output, "beta");
            assert_eq!(transcript.judge_output, "alpha");
            assert!(matches!(source, StorageError::Connection(_)));
        }
        other => panic!("expected store failure, got {other:?}"),
    }
}

const DIM: usize = 64;

async fn desk(backend: Arc<MemoryBackend>, judge: Arc<MockProvider>) -> CaseDesk<MemoryBackend> {
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(DIM));
    let index = Arc::new(MemoryVectorIndex::new(DIM));
    let ingestor = Ingestor::new(embedder.clone(), index.clone())
        .unwrap()
        .with_chunker(ChunkerConfig::new(200, 0));
    ingestor
        .ingest_page(
            "fees",
            &FetchedPage::from_text(
                "https://www.uscis.gov/forms/filing-fees",
                "USCIS Filing Fees",
                "Use the fee calculator to verify the I-140 fee.\n\nPremium processing (I-907) has its own fee.",
            ),
        )
        .await
        .unwrap();
    ingestor
        .ingest_page(
            "filing",
            &FetchedPage::from_text(
                "https://www.uscis.gov/forms/direct-filing-addresses",
                "USCIS Direct Filing Addresses (Forms)",
                "Mail Form I-140 to the lockbox for your classification.",
            ),
        )
        .await
        .unwrap();

    let participants = DebateParticipants::new(
        Arc::new(MockProvider::constant("alpha").named("a")),
        Arc::new(MockProvider::constant("beta").named("b")),
    )
    .with_judge(judge);

    CaseDesk::new(
        backend.clone(),
        Retriever::new(embedder, index),
        DebateOrchestrator::new(Arc::new(RunStore::new(backend))),
        participants,
    )
}

#[tokio::test]
async fn desk_requires_an_active_case() {
    let backend = Arc::new(MemoryBackend::new());
    let desk = desk(backend, Arc::new(MockProvider::constant("Verdict: PASS"))).await;

    let err = desk.run_preset("chat-1", "fees").await.unwrap_err();
    assert!(matches!(err, DeskError::NoActiveCase(_)));
    assert!(matches!(
        desk.use_case("chat-1", "Nobody").await.unwrap_err(),
        DeskError::CaseNotFound(_)
    ));
}

#[tokio::test]
async fn desk_preset_is_grounded_in_its_categories() {
    let backend = Arc::new(MemoryBackend::new());
    let judge = Arc::new(MockProvider::constant("Verdict: NEEDS WORK").named("judge"));
    let desk = desk(backend, judge.clone()).await;
    desk.cases()
        .upsert_case("Acme Researcher", json!({"en": "Field: Data Science"}), true)
        .await
        .unwrap();
    desk.use_case("chat-1", "Acme Researcher").await.unwrap();

    let reply = desk.run_preset("chat-1", "fees").await.unwrap();
    assert_eq!(reply.to_string(), "Run #1\n\nVerdict: NEEDS WORK");

    let prompt = &judge.requests().await[0].user;
    assert!(prompt.contains("=== OFFICIAL SOURCES (RAG SNIPPETS) ===\n[fees] USCIS Filing Fees"));
    assert!(!prompt.contains("[filing]"));
    assert!(prompt.ends_with("Synthesize a final answer per your instructions."));

    // Another conversation has its own session
    assert!(matches!(
        desk.run_preset("chat-2", "fees").await.unwrap_err(),
        DeskError::NoActiveCase(_)
    ));
    assert!(matches!(
        desk.run_preset("chat-1", "appeal").await.unwrap_err(),
        DeskError::UnknownPreset(_)
    ));
}

#[tokio::test]
async fn desk_review_includes_document_text() {
    let backend = Arc::new(MemoryBackend::new());
    let judge = Arc::new(MockProvider::constant("Verdict: PASS").named("judge"));
    let desk = desk(backend, judge.clone()).await;
    let case = desk
        .cases()
        .upsert_case("Acme Researcher", json!({}), true)
        .await
        .unwrap();
    let doc = desk
        .cases()
        .add_document(case.id, "petition", "Petition Letter")
        .await
        .unwrap();
    desk.cases()
        .add_version(
            doc.id,
            NewVersion {
                storage_url: "file://petition.txt".into(),
                text_extract: "The beneficiary led a critical team.".into(),
                notes: String::new(),
                created_by: "tests".into(),
            },
        )
        .await
        .unwrap();
    desk.use_case("chat-1", "Acme Researcher").await.unwrap();

    assert!(matches!(
        desk.review_document("chat-1", "Resume").await.unwrap_err(),
        DeskError::DocumentNotFound(_)
    ));

    let reply = desk.review_document("chat-1", "Petition Letter").await.unwrap();
    assert!(reply.to_string().starts_with("Run #"));

    let prompt = &judge.requests().await[0].user;
    assert!(prompt.contains("=== DOCUMENT TEXT ===\nThe beneficiary led a critical team."));
    assert!(prompt.contains("MODE=review"));
    assert!(!prompt.contains("OFFICIAL SOURCES"));
}
