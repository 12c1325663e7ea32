//! End-to-end request flow.
//!
//! ```text
//! deck access -> limit check -> validate + generate -> persist -> response
//! ```
//!
//! Every request ends in a [`PipelineResponse`]; nothing here returns an
//! error to the caller. The [`PipelineOutcome`] tells policy rejections,
//! system faults and partial successes apart.

use carden_db::CardStore;
use carden_types::{CandidateCard, DeckId, GenerationRequest, OwnerId};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::CardenConfig;
use crate::generation::{GenerationError, GenerationOrchestrator};
use crate::limits::DeckLimitGuard;
use crate::llm::ModelProvider;
use crate::persistence::{PersistenceCoordinator, PersistenceFault};
use crate::validation::{ModelAssessor, TopicValidator};

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Every generated card was saved.
    Completed,
    /// Cards were saved but some were skipped.
    PartialSuccess,
    /// The topic was not approved.
    PolicyRejected,
    /// The deck cannot take the batch, or the batch is larger than allowed.
    QuotaExceeded,
    /// The deck is missing, deleted or owned by someone else.
    DeckUnavailable,
    /// The model failed or produced nothing usable.
    GenerationFault,
    /// Storage failed; nothing was saved.
    PersistenceFault,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::PartialSuccess)
    }
}

/// The single response envelope returned for every request.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    pub success: bool,
    pub outcome: PipelineOutcome,
    pub message: String,
    pub deck_id: DeckId,
    pub generated_cards: Vec<CandidateCard>,
    pub total_generated: usize,
    pub total_saved: usize,
    /// `total_generated - total_saved`
    pub duplicates_skipped: usize,
    pub suggestions: Vec<String>,
    pub errors: Vec<String>,
}

impl PipelineResponse {
    fn failure(deck_id: DeckId, outcome: PipelineOutcome, message: impl Into<String>) -> Self {
        Self {
            success: false,
            outcome,
            message: message.into(),
            deck_id,
            generated_cards: Vec::new(),
            total_generated: 0,
            total_saved: 0,
            duplicates_skipped: 0,
            suggestions: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn with_errors(mut self, errors: impl IntoIterator<Item = String>) -> Self {
        self.errors.extend(errors);
        self
    }
}

/// Acknowledgement for a background submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub deck_id: DeckId,
    pub requested_count: u32,
    pub status: &'static str,
}

// ============================================================================
// Stats
// ============================================================================

/// Process-wide counters. Reset only through [`PipelineStats::reset`].
#[derive(Debug, Default)]
pub struct PipelineStats {
    requests: AtomicU64,
    policy_rejections: AtomicU64,
    quota_rejections: AtomicU64,
    failures: AtomicU64,
    cards_saved: AtomicU64,
    duplicates_skipped: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub policy_rejections: u64,
    pub quota_rejections: u64,
    pub failures: u64,
    pub cards_saved: u64,
    pub duplicates_skipped: u64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            policy_rejections: self.policy_rejections.load(Ordering::Relaxed),
            quota_rejections: self.quota_rejections.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            cards_saved: self.cards_saved.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.requests,
            &self.policy_rejections,
            &self.quota_rejections,
            &self.failures,
            &self.cards_saved,
            &self.duplicates_skipped,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn record(&self, response: &PipelineResponse, dedup_hits: usize) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        match response.outcome {
            PipelineOutcome::PolicyRejected => {
                self.policy_rejections.fetch_add(1, Ordering::Relaxed);
            }
            PipelineOutcome::QuotaExceeded => {
                self.quota_rejections.fetch_add(1, Ordering::Relaxed);
            }
            PipelineOutcome::DeckUnavailable
            | PipelineOutcome::GenerationFault
            | PipelineOutcome::PersistenceFault => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            PipelineOutcome::Completed | PipelineOutcome::PartialSuccess => {}
        }
        self.cards_saved
            .fetch_add(response.total_saved as u64, Ordering::Relaxed);
        self.duplicates_skipped
            .fetch_add(dedup_hits as u64, Ordering::Relaxed);
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Composes the pipeline stages.
pub struct PipelineController {
    store: Arc<dyn CardStore>,
    orchestrator: GenerationOrchestrator,
    limits: DeckLimitGuard,
    persistence: PersistenceCoordinator,
    stats: PipelineStats,
}

impl PipelineController {
    pub fn new(store: Arc<dyn CardStore>, orchestrator: GenerationOrchestrator) -> Self {
        Self {
            limits: DeckLimitGuard::new(Arc::clone(&store)),
            persistence: PersistenceCoordinator::new(Arc::clone(&store)),
            store,
            orchestrator,
            stats: PipelineStats::default(),
        }
    }

    /// Wire a controller from configuration: model-backed validation with
    /// rule-based fallback, and the configured generation settings.
    pub fn from_config(config: &CardenConfig, provider: Arc<dyn ModelProvider>, store: Arc<dyn CardStore>) -> Self {
        let model = &config.model;
        let timeout = model.timeout();
        if provider.is_ready() {
            info!(provider = provider.name(), model = provider.model(), ?timeout, "Pipeline wired");
        } else {
            warn!(
                provider = provider.name(),
                "Model provider not ready; topics will be judged by the built-in rules and generation will fail"
            );
        }

        let validator = TopicValidator::new(Box::new(ModelAssessor::new(
            Arc::clone(&provider),
            model.validation_config(),
            timeout,
        )));
        let orchestrator = GenerationOrchestrator::new(
            validator,
            provider,
            model.generation_config(),
            timeout,
            config.generation.max_cards_per_batch,
        );

        Self::new(store, orchestrator)
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Run one request to completion.
    pub async fn run(&self, request: &GenerationRequest, owner: Option<OwnerId>) -> PipelineResponse {
        let (response, dedup_hits) = self.execute(request, owner).await;
        self.stats.record(&response, dedup_hits);
        info!(
            deck_id = request.deck_id,
            outcome = ?response.outcome,
            generated = response.total_generated,
            saved = response.total_saved,
            "Pipeline finished"
        );
        response
    }

    /// Run the identical pipeline on the runtime and return immediately.
    pub fn submit_background(
        self: &Arc<Self>,
        request: GenerationRequest,
        owner: Option<OwnerId>,
    ) -> (SubmissionReceipt, JoinHandle<PipelineResponse>) {
        let receipt = SubmissionReceipt {
            deck_id: request.deck_id,
            requested_count: request.count,
            status: "processing",
        };
        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move { controller.run(&request, owner).await });
        info!(deck_id = receipt.deck_id, count = receipt.requested_count, "Background generation submitted");
        (receipt, handle)
    }

    /// Returns the response and the number of cards skipped as duplicates
    /// of live cards.
    async fn execute(&self, request: &GenerationRequest, owner: Option<OwnerId>) -> (PipelineResponse, usize) {
        let deck_id = request.deck_id;

        let deck = match self.store.find_deck(deck_id, owner).await {
            Ok(Some(deck)) => deck,
            Ok(None) => {
                warn!(deck_id, owner_id = ?owner, "Deck not found or access denied");
                let response = PipelineResponse::failure(
                    deck_id,
                    PipelineOutcome::DeckUnavailable,
                    "Deck not found or access denied",
                );
                return (response, 0);
            }
            Err(err) => {
                error!(deck_id, error = %err, "Deck lookup failed");
                let response =
                    PipelineResponse::failure(deck_id, PipelineOutcome::PersistenceFault, "Could not load deck")
                        .with_errors([err.to_string()]);
                return (response, 0);
            }
        };

        let limit = self
            .limits
            .check_limit(deck_id, i64::from(request.count), deck.max_cards)
            .await;
        if !limit.valid {
            let response = PipelineResponse::failure(deck_id, PipelineOutcome::QuotaExceeded, limit.message.clone())
                .with_errors([usage_line(limit.current_count, limit.max_cards)]);
            return (response, 0);
        }

        let batch = match self.orchestrator.generate(request).await {
            Ok(batch) => batch,
            Err(err) => return (Self::generation_failure(deck_id, err), 0),
        };

        let generation_skips: Vec<String> = batch.skipped.iter().map(ToString::to_string).collect();
        if batch.cards.is_empty() {
            let response = PipelineResponse::failure(
                deck_id,
                PipelineOutcome::GenerationFault,
                "No usable cards were generated",
            )
            .with_errors(generation_skips);
            return (response, 0);
        }

        let report = self.persistence.save(deck_id, &batch.cards, owner).await;
        if let Some(fault) = &report.fault {
            let outcome = match fault {
                PersistenceFault::DeckUnavailable => PipelineOutcome::DeckUnavailable,
                PersistenceFault::Storage(_) => PipelineOutcome::PersistenceFault,
            };
            let mut response = PipelineResponse::failure(deck_id, outcome, report.message);
            response.generated_cards = batch.cards;
            response.total_generated = response.generated_cards.len();
            return (response.with_errors(report.errors), 0);
        }

        let dedup_hits = report.duplicate_count;
        if report.deck_full() {
            warn!(
                deck_id,
                card_count = report.card_count,
                max_cards = report.max_cards,
                "Deck filled up before the batch was saved"
            );
            let mut response = PipelineResponse::failure(
                deck_id,
                PipelineOutcome::QuotaExceeded,
                format!(
                    "Deck limit reached while saving: {} of {} cards used, nothing saved",
                    report.card_count, report.max_cards
                ),
            );
            response.total_generated = batch.cards.len();
            response.duplicates_skipped = response.total_generated;
            response.generated_cards = batch.cards;
            let response = response
                .with_errors([usage_line(report.card_count, report.max_cards)])
                .with_errors(report.errors);
            return (response, dedup_hits);
        }

        let total_generated = batch.cards.len();
        let total_saved = report.saved_count;
        let duplicates_skipped = total_generated - total_saved;
        let outcome = if duplicates_skipped == 0 {
            PipelineOutcome::Completed
        } else {
            PipelineOutcome::PartialSuccess
        };

        let response = PipelineResponse {
            success: true,
            outcome,
            message: format!(
                "Generated {} cards for \"{}\". {}",
                total_generated, batch.sanitized_topic, report.message
            ),
            deck_id,
            generated_cards: batch.cards,
            total_generated,
            total_saved,
            duplicates_skipped,
            suggestions: Vec::new(),
            errors: generation_skips.into_iter().chain(report.errors).collect(),
        };
        (response, dedup_hits)
    }

    fn generation_failure(deck_id: DeckId, err: GenerationError) -> PipelineResponse {
        match err {
            GenerationError::PolicyRejected(outcome) => {
                let mut response =
                    PipelineResponse::failure(deck_id, PipelineOutcome::PolicyRejected, outcome.message.clone());
                response.suggestions = outcome.suggestions;
                response.with_errors(["Content not approved for card generation".to_string()])
            }
            err @ GenerationError::InvalidCount { .. } => {
                PipelineResponse::failure(deck_id, PipelineOutcome::QuotaExceeded, err.to_string())
            }
            err => {
                error!(deck_id, error = %err, "Card generation failed");
                PipelineResponse::failure(deck_id, PipelineOutcome::GenerationFault, "Card generation failed")
                    .with_errors([err.to_string()])
            }
        }
    }
}

fn usage_line(current_count: i64, max_cards: i64) -> String {
    format!(
        "{} of {} cards used, {} remaining",
        current_count,
        max_cards,
        (max_cards - current_count).max(0)
    )
}
