//! End-to-end pipeline runs against a scripted model and an in-memory deck store.

use carden::config::CardenConfig;
use carden::llm::{CannedResponse, LlmError, MockModelProvider, ModelConfig};
use carden::{GenerationOrchestrator, PersistenceCoordinator, PipelineController, PipelineOutcome, TopicValidator};
use carden_db::{CardenDb, NewDeck};
use carden_types::{CandidateCard, DeckId, Difficulty, GenerationRequest};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const OWNER: i64 = 7;

struct Harness {
    db: CardenDb,
    mock: MockModelProvider,
    controller: Arc<PipelineController>,
}

impl Harness {
    /// Controller with rule-based validation only, so every model call is a
    /// generation call.
    async fn rules_only() -> Self {
        Self::with_timeout(Duration::from_secs(5)).await
    }

    async fn with_timeout(timeout: Duration) -> Self {
        let db = CardenDb::open_in_memory().await.unwrap();
        let mock = MockModelProvider::new();
        let orchestrator = GenerationOrchestrator::new(
            TopicValidator::rules_only(),
            Arc::new(mock.clone()),
            ModelConfig::with_model("mock-test-model").json(),
            timeout,
            15,
        );
        let controller = Arc::new(PipelineController::new(Arc::new(db.clone()), orchestrator));
        Self { db, mock, controller }
    }

    /// Controller wired like production: model moderation, then generation.
    async fn from_config() -> Self {
        let db = CardenDb::open_in_memory().await.unwrap();
        let mock = MockModelProvider::new();
        let controller = Arc::new(PipelineController::from_config(
            &CardenConfig::default(),
            Arc::new(mock.clone()),
            Arc::new(db.clone()),
        ));
        Self { db, mock, controller }
    }

    async fn deck(&self, max_cards: i64) -> DeckId {
        self.db
            .create_deck(&NewDeck::new(OWNER, "Vocabulary").with_max_cards(max_cards))
            .await
            .unwrap()
    }
}

fn cards_payload(pairs: &[(&str, &str)]) -> String {
    let cards: Vec<_> = pairs
        .iter()
        .map(|(front, back)| {
            json!({
                "front": front,
                "back": back,
                "ipa_pronunciation": "/test/",
                "examples": [format!("I use the {front} every day.")],
                "tags": ["kitchen"],
                "difficulty": "EASY"
            })
        })
        .collect();
    json!({ "topic": "Kitchen Tools", "cards": cards }).to_string()
}

fn kitchen() -> Vec<(&'static str, &'static str)> {
    vec![("knife", "con dao"), ("pan", "cai chao"), ("spoon", "cai thia")]
}

fn approval(sanitized: &str) -> String {
    json!({
        "is_approved": true,
        "safety_level": "safe",
        "quality_level": "good",
        "sanitized_topic": sanitized,
        "feedback_message": "Great topic",
        "improvement_suggestions": [],
        "detected_issues": [],
        "confidence_score": 0.95
    })
    .to_string()
}

#[tokio::test]
async fn test_happy_path_saves_every_card() {
    let h = Harness::rules_only().await;
    let deck_id = h.deck(30).await;
    h.mock.queue_response(CannedResponse::text(cards_payload(&kitchen())));

    let request = GenerationRequest::new(deck_id, "  kitchen tools ", 3);
    let response = h.controller.run(&request, Some(OWNER)).await;

    assert!(response.success);
    assert_eq!(response.outcome, PipelineOutcome::Completed);
    assert_eq!(response.total_generated, 3);
    assert_eq!(response.total_saved, 3);
    assert_eq!(response.duplicates_skipped, 0);
    assert!(response.errors.is_empty());
    assert_eq!(response.generated_cards[0].difficulty, Difficulty::Easy);

    let prompts = h.mock.received_prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("- Topic: Kitchen Tools\n"));

    let stored = h.db.list_cards(deck_id).await.unwrap();
    let orders: Vec<i64> = stored.iter().map(|c| c.display_order).collect();
    assert_eq!(orders, vec![1, 2, 3]);
    assert_eq!(stored[0].tags.as_deref(), Some(&["kitchen".to_string()][..]));
    assert!(h.db.deck_counts(deck_id).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_resubmitting_same_batch_is_idempotent() {
    let h = Harness::rules_only().await;
    let deck_id = h.deck(30).await;
    h.mock.queue_responses([
        CannedResponse::text(cards_payload(&kitchen())),
        CannedResponse::text(cards_payload(&[("KNIFE", "Con  Dao"), ("pan", "cai chao"), ("spoon", "cai thia")])),
    ]);
    let request = GenerationRequest::new(deck_id, "Kitchen Tools", 3);

    let first = h.controller.run(&request, None).await;
    assert_eq!(first.total_saved, 3);

    let second = h.controller.run(&request, None).await;
    assert!(second.success);
    assert_eq!(second.outcome, PipelineOutcome::PartialSuccess);
    assert_eq!(second.total_generated, 3);
    assert_eq!(second.total_saved, 0);
    assert_eq!(second.duplicates_skipped, 3);
    assert_eq!(second.errors.len(), 3);

    let counts = h.db.deck_counts(deck_id).await.unwrap();
    assert_eq!(counts.aggregate, 3);
    assert!(counts.is_consistent());
}

#[tokio::test]
async fn test_empty_topic_is_rejected_without_model_calls() {
    let h = Harness::from_config().await;
    let deck_id = h.deck(30).await;

    let response = h.controller.run(&GenerationRequest::new(deck_id, "   ", 5), None).await;

    assert!(!response.success);
    assert_eq!(response.outcome, PipelineOutcome::PolicyRejected);
    assert!(!response.message.is_empty());
    assert!(!response.suggestions.is_empty());
    assert_eq!(h.mock.call_count(), 0);
}

#[tokio::test]
async fn test_model_outage_falls_back_to_rules() {
    let h = Harness::from_config().await;
    let deck_id = h.deck(30).await;
    h.mock
        .queue_response(CannedResponse::error(LlmError::Http("503 Service Unavailable".into())));

    let response = h
        .controller
        .run(&GenerationRequest::new(deck_id, "How to hack a bank", 5), None)
        .await;

    assert_eq!(response.outcome, PipelineOutcome::PolicyRejected);
    assert_eq!(h.mock.call_count(), 1);
    assert!(h.db.list_cards(deck_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_moderated_topic_feeds_the_generation_prompt() {
    let h = Harness::from_config().await;
    let deck_id = h.deck(30).await;
    h.mock.queue_responses([
        CannedResponse::text(format!("```json\n{}\n```", approval("Kitchen Utensils"))),
        CannedResponse::text(cards_payload(&kitchen())),
    ]);

    let response = h
        .controller
        .run(&GenerationRequest::new(deck_id, "kitchen stuff", 3), Some(OWNER))
        .await;

    assert_eq!(response.outcome, PipelineOutcome::Completed);
    assert!(response.message.contains("Kitchen Utensils"));
    let prompts = h.mock.received_prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].ends_with("'kitchen stuff'"));
    assert!(prompts[1].contains("- Topic: Kitchen Utensils\n"));
}

#[tokio::test]
async fn test_quota_checked_before_model_call() {
    let h = Harness::rules_only().await;
    let deck_id = h.deck(2).await;

    let response = h
        .controller
        .run(&GenerationRequest::new(deck_id, "Kitchen Tools", 3), None)
        .await;

    assert_eq!(response.outcome, PipelineOutcome::QuotaExceeded);
    assert!(response.message.contains("limit 2"));
    assert_eq!(response.errors, vec!["0 of 2 cards used, 2 remaining".to_string()]);
    assert_eq!(h.mock.call_count(), 0);
}

#[tokio::test]
async fn test_exact_remaining_capacity_is_accepted() {
    let h = Harness::rules_only().await;
    let deck_id = h.deck(3).await;
    h.mock.queue_response(CannedResponse::text(cards_payload(&kitchen())));

    let response = h
        .controller
        .run(&GenerationRequest::new(deck_id, "Kitchen Tools", 3), None)
        .await;
    assert_eq!(response.outcome, PipelineOutcome::Completed);

    let full = h
        .controller
        .run(&GenerationRequest::new(deck_id, "Kitchen Tools", 1), None)
        .await;
    assert_eq!(full.outcome, PipelineOutcome::QuotaExceeded);
    assert_eq!(h.mock.call_count(), 1);
}

#[tokio::test]
async fn test_batch_size_outside_bounds() {
    let h = Harness::rules_only().await;
    let deck_id = h.deck(100).await;

    for count in [0, 16] {
        let response = h
            .controller
            .run(&GenerationRequest::new(deck_id, "Kitchen Tools", count), None)
            .await;
        assert_eq!(response.outcome, PipelineOutcome::QuotaExceeded, "count {count}");
        assert!(response.message.contains("allowed: 1-15"));
    }
    assert_eq!(h.mock.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_or_foreign_deck() {
    let h = Harness::rules_only().await;
    let deck_id = h.deck(30).await;

    let foreign = h
        .controller
        .run(&GenerationRequest::new(deck_id, "Kitchen Tools", 3), Some(OWNER + 1))
        .await;
    assert_eq!(foreign.outcome, PipelineOutcome::DeckUnavailable);

    h.db.soft_delete_deck(deck_id).await.unwrap();
    let deleted = h
        .controller
        .run(&GenerationRequest::new(deck_id, "Kitchen Tools", 3), None)
        .await;
    assert_eq!(deleted.outcome, PipelineOutcome::DeckUnavailable);
    assert_eq!(h.mock.call_count(), 0);
}

#[tokio::test]
async fn test_model_timeout_is_a_generation_fault() {
    let h = Harness::with_timeout(Duration::from_millis(50)).await;
    let deck_id = h.deck(30).await;
    h.mock
        .queue_response(CannedResponse::with_delay(cards_payload(&kitchen()), 5_000));

    let response = h
        .controller
        .run(&GenerationRequest::new(deck_id, "Kitchen Tools", 3), None)
        .await;

    assert_eq!(response.outcome, PipelineOutcome::GenerationFault);
    assert!(response.errors[0].contains("timed out"));
    assert!(h.db.list_cards(deck_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unparseable_response_is_a_generation_fault() {
    let h = Harness::rules_only().await;
    let deck_id = h.deck(30).await;
    h.mock
        .queue_response(CannedResponse::text("Sure! Here are some cards: knife, pan"));

    let response = h
        .controller
        .run(&GenerationRequest::new(deck_id, "Kitchen Tools", 3), None)
        .await;

    assert!(!response.success);
    assert_eq!(response.outcome, PipelineOutcome::GenerationFault);
    assert!(response.errors[0].starts_with("Malformed model response"));
}

#[tokio::test]
async fn test_no_usable_cards_is_a_generation_fault() {
    let h = Harness::rules_only().await;
    let deck_id = h.deck(30).await;
    h.mock.queue_response(CannedResponse::text(
        json!({"cards": [{"front": "knife"}, {"back": "cai chao"}]}).to_string(),
    ));

    let response = h
        .controller
        .run(&GenerationRequest::new(deck_id, "Kitchen Tools", 2), None)
        .await;

    assert_eq!(response.outcome, PipelineOutcome::GenerationFault);
    assert_eq!(
        response.errors,
        vec![
            "card 1: missing or empty back".to_string(),
            "card 2: missing or empty front".to_string(),
        ]
    );
    assert_eq!(h.db.deck_counts(deck_id).await.unwrap().aggregate, 0);
}

#[tokio::test]
async fn test_background_submission_runs_the_same_pipeline() {
    let h = Harness::rules_only().await;
    let deck_id = h.deck(30).await;
    h.mock.queue_response(CannedResponse::text(cards_payload(&kitchen())));

    let (receipt, handle) = h
        .controller
        .submit_background(GenerationRequest::new(deck_id, "Kitchen Tools", 3), Some(OWNER));
    assert_eq!(receipt.deck_id, deck_id);
    assert_eq!(receipt.requested_count, 3);
    assert_eq!(receipt.status, "processing");

    let response = handle.await.unwrap();
    assert_eq!(response.outcome, PipelineOutcome::Completed);
    assert_eq!(h.db.list_cards(deck_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_deck_filled_during_generation_is_quota_exceeded() {
    let h = Harness::rules_only().await;
    let deck_id = h.deck(3).await;
    h.mock
        .queue_response(CannedResponse::with_delay(cards_payload(&kitchen()), 500));

    // Passes the limit check against an empty deck, then waits on the model.
    let (_, handle) = h
        .controller
        .submit_background(GenerationRequest::new(deck_id, "Kitchen Tools", 3), Some(OWNER));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let filler = vec![
        CandidateCard::new("fork", "cai nia"),
        CandidateCard::new("bowl", "cai bat"),
        CandidateCard::new("cup", "cai coc"),
    ];
    let fill = PersistenceCoordinator::new(Arc::new(h.db.clone()))
        .save(deck_id, &filler, None)
        .await;
    assert_eq!(fill.saved_count, 3);

    let response = handle.await.unwrap();
    assert!(!response.success);
    assert_eq!(response.outcome, PipelineOutcome::QuotaExceeded);
    assert_eq!(response.total_generated, 3);
    assert_eq!(response.total_saved, 0);
    assert_eq!(response.duplicates_skipped, 3);
    assert!(response.message.contains("3 of 3 cards used"));
    assert!(response.errors.iter().any(|e| e == "3 of 3 cards used, 0 remaining"));

    let stats = h.controller.stats().snapshot();
    assert_eq!(stats.quota_rejections, 1);
    assert_eq!(stats.duplicates_skipped, 0);
    assert_eq!(stats.cards_saved, 0);

    let counts = h.db.deck_counts(deck_id).await.unwrap();
    assert_eq!(counts.live, 3);
    assert!(counts.is_consistent());
}

#[tokio::test]
async fn test_stats_track_outcomes() {
    let h = Harness::rules_only().await;
    let deck_id = h.deck(30).await;
    h.mock.queue_responses([
        CannedResponse::text(cards_payload(&kitchen())),
        CannedResponse::text(cards_payload(&kitchen())),
    ]);
    let request = GenerationRequest::new(deck_id, "Kitchen Tools", 3);

    h.controller.run(&request, None).await;
    h.controller.run(&request, None).await;
    h.controller.run(&GenerationRequest::new(deck_id, "abc", 3), None).await;

    let stats = h.controller.stats().snapshot();
    assert_eq!(stats.requests, 3);
    assert_eq!(stats.cards_saved, 3);
    assert_eq!(stats.duplicates_skipped, 3);
    assert_eq!(stats.policy_rejections, 1);
    assert_eq!(stats.failures, 0);

    h.controller.stats().reset();
    assert_eq!(h.controller.stats().snapshot().requests, 0);
}
