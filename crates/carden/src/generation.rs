//! Card generation: validate the topic, prompt the model, sanitize the cards.
//!
//! A single model call is made per request; retries belong to whoever calls
//! the orchestrator. Malformed entries are skipped one by one, but an
//! unparseable response fails the whole batch.

use carden_types::{
    CandidateCard, Difficulty, GenerationRequest, ItemSkip, ValidationOutcome, MAX_PRONUNCIATION_CHARS,
    MAX_SIDE_CHARS,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::llm::{complete_with_timeout, LlmError, ModelConfig, ModelProvider};
use crate::prompt::PromptBuilder;
use crate::validation::TopicValidator;

/// Why a batch could not be generated.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The topic was not approved. Not a system fault.
    #[error("{}", .0.message)]
    PolicyRejected(Box<ValidationOutcome>),

    #[error("Cannot generate {requested} cards at once (allowed: 1-{max})")]
    InvalidCount { requested: u32, max: u32 },

    #[error("Model call failed: {0}")]
    Model(#[from] LlmError),

    /// The response was not the expected JSON shape. The raw text is logged,
    /// not carried here.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    /// True for content gating, false for system faults.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(self, Self::PolicyRejected(_))
    }

    /// Suggestions to show the user, if any.
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::PolicyRejected(outcome) => &outcome.suggestions,
            _ => &[],
        }
    }
}

/// Sanitized cards plus what happened along the way.
#[derive(Debug, Clone)]
pub struct GeneratedBatch {
    pub cards: Vec<CandidateCard>,
    pub sanitized_topic: String,
    /// Warnings from topic validation.
    pub warnings: Vec<String>,
    /// Entries dropped during sanitizing.
    pub skipped: Vec<ItemSkip>,
    /// Model id that produced the cards.
    pub model: String,
}

/// Runs validation, prompting and sanitizing for one request.
pub struct GenerationOrchestrator {
    validator: TopicValidator,
    provider: Arc<dyn ModelProvider>,
    config: ModelConfig,
    timeout: Duration,
    max_cards_per_batch: u32,
}

impl GenerationOrchestrator {
    pub fn new(
        validator: TopicValidator,
        provider: Arc<dyn ModelProvider>,
        config: ModelConfig,
        timeout: Duration,
        max_cards_per_batch: u32,
    ) -> Self {
        Self {
            validator,
            provider,
            config,
            timeout,
            max_cards_per_batch,
        }
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedBatch, GenerationError> {
        let outcome = self.validator.validate(&request.topic).await;
        if !outcome.approved {
            return Err(GenerationError::PolicyRejected(Box::new(outcome)));
        }

        if request.count == 0 || request.count > self.max_cards_per_batch {
            return Err(GenerationError::InvalidCount {
                requested: request.count,
                max: self.max_cards_per_batch,
            });
        }

        let validated = request.with_topic(outcome.sanitized_topic.clone());
        let prompt = PromptBuilder::build(&validated);
        info!(
            deck_id = request.deck_id,
            count = request.count,
            topic = %validated.topic,
            "Generating cards"
        );

        let text = complete_with_timeout(self.provider.as_ref(), &prompt, &self.config, self.timeout).await?;
        if text.trim().is_empty() {
            return Err(GenerationError::Model(LlmError::EmptyResponse));
        }

        let entries = parse_cards_payload(&text).map_err(|reason| {
            error!(deck_id = request.deck_id, reason = %reason, raw = %text, "Unparseable card payload");
            GenerationError::MalformedResponse(reason)
        })?;

        let (cards, skipped) = sanitize_entries(&entries, request.count as usize);
        for skip in &skipped {
            warn!(deck_id = request.deck_id, "Skipped generated {}", skip);
        }
        info!(
            deck_id = request.deck_id,
            accepted = cards.len(),
            skipped = skipped.len(),
            "Cards generated"
        );

        Ok(GeneratedBatch {
            cards,
            sanitized_topic: validated.topic,
            warnings: outcome.warnings,
            skipped,
            model: self.config.model.clone(),
        })
    }
}

/// Remove a surrounding Markdown code fence (```` ```json ```` or bare
/// ```` ``` ````) if present.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Parse the response and return the entries of its top-level `cards` list.
pub fn parse_cards_payload(text: &str) -> Result<Vec<Value>, String> {
    let value: Value = serde_json::from_str(strip_code_fences(text)).map_err(|e| e.to_string())?;
    let object = value
        .as_object()
        .ok_or_else(|| "top-level value is not an object".to_string())?;
    match object.get("cards") {
        Some(Value::Array(entries)) => Ok(entries.clone()),
        Some(_) => Err("field 'cards' is not a list".to_string()),
        None => Err("missing field 'cards'".to_string()),
    }
}

/// Turn raw entries into at most `limit` cards, skipping unusable ones.
///
/// Display order is the position among accepted cards, so skipped entries
/// leave no gaps.
pub fn sanitize_entries(entries: &[Value], limit: usize) -> (Vec<CandidateCard>, Vec<ItemSkip>) {
    let mut cards = Vec::with_capacity(limit.min(entries.len()));
    let mut skipped = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        if cards.len() >= limit {
            break;
        }
        match sanitize_entry(entry) {
            Ok(card) => {
                let order = cards.len() as u32;
                cards.push(card.with_display_order(order));
            }
            Err(reason) => skipped.push(ItemSkip::new(index, reason)),
        }
    }

    (cards, skipped)
}

fn sanitize_entry(entry: &Value) -> Result<CandidateCard, &'static str> {
    let fields = entry.as_object().ok_or("entry is not an object")?;
    let front = capped_text(fields, "front", MAX_SIDE_CHARS).ok_or("missing or empty front")?;
    let back = capped_text(fields, "back", MAX_SIDE_CHARS).ok_or("missing or empty back")?;

    let difficulty = fields
        .get("difficulty")
        .and_then(scalar_text)
        .map(|d| Difficulty::parse_or_default(&d))
        .unwrap_or_default();

    Ok(CandidateCard {
        front,
        back,
        ipa_pronunciation: capped_text(fields, "ipa_pronunciation", MAX_PRONUNCIATION_CHARS),
        examples: text_list(fields.get("examples")),
        synonyms: text_list(fields.get("synonyms")),
        antonyms: text_list(fields.get("antonyms")),
        tags: text_list(fields.get("tags")),
        difficulty,
        display_order: 0,
    })
}

/// Stringify a scalar JSON value; arrays, objects and null yield nothing.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn capped_text(fields: &Map<String, Value>, key: &str, max_chars: usize) -> Option<String> {
    let text = fields.get(key).and_then(scalar_text)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_chars).collect())
}

fn text_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items: Vec<String> = value?
        .as_array()?
        .iter()
        .filter_map(scalar_text)
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CannedResponse, MockModelProvider};
    use serde_json::json;

    fn orchestrator(provider: &MockModelProvider) -> GenerationOrchestrator {
        GenerationOrchestrator::new(
            TopicValidator::rules_only(),
            Arc::new(provider.clone()),
            ModelConfig::with_model("test-model"),
            Duration::from_secs(5),
            15,
        )
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"cards\": []}  "), "{\"cards\": []}");
    }

    #[test]
    fn test_parse_requires_cards_list() {
        assert!(parse_cards_payload(r#"{"cards": []}"#).unwrap().is_empty());
        assert!(parse_cards_payload(r#"{"items": []}"#).is_err());
        assert!(parse_cards_payload(r#"{"cards": "none"}"#).is_err());
        assert!(parse_cards_payload(r#"[{"front": "a"}]"#).is_err());
        assert!(parse_cards_payload("{\"cards\": [").is_err());
    }

    #[test]
    fn test_sanitize_trims_caps_and_stringifies() {
        let long = "x".repeat(MAX_SIDE_CHARS + 20);
        let entries = vec![json!({
            "front": format!("  {}  ", long),
            "back": 42,
            "ipa_pronunciation": "é".repeat(MAX_PRONUNCIATION_CHARS + 1),
            "examples": ["  one ", "", null, 7, ["nested"]],
            "synonyms": [],
            "antonyms": "not a list",
            "tags": [true],
            "difficulty": "hard"
        })];

        let (cards, skipped) = sanitize_entries(&entries, 10);
        assert!(skipped.is_empty());
        let card = &cards[0];
        assert_eq!(card.front.chars().count(), MAX_SIDE_CHARS);
        assert_eq!(card.back, "42");
        assert_eq!(card.ipa_pronunciation.as_ref().unwrap().chars().count(), MAX_PRONUNCIATION_CHARS);
        assert_eq!(card.examples, Some(vec!["one".to_string(), "7".to_string()]));
        assert_eq!(card.synonyms, None);
        assert_eq!(card.antonyms, None);
        assert_eq!(card.tags, Some(vec!["true".to_string()]));
        assert_eq!(card.difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_unknown_difficulty_defaults_to_normal() {
        let entries = vec![
            json!({"front": "a", "back": "b", "difficulty": "impossible"}),
            json!({"front": "c", "back": "d", "difficulty": null}),
        ];
        let (cards, _) = sanitize_entries(&entries, 10);
        assert!(cards.iter().all(|c| c.difficulty == Difficulty::Normal));
    }

    #[test]
    fn test_skips_malformed_entries_and_orders_accepted() {
        let entries = vec![
            json!({"front": "one", "back": "một"}),
            json!({"front": "two"}),
            json!("just text"),
            json!({"front": "  ", "back": "ba"}),
            json!({"front": {"nested": 1}, "back": "bốn"}),
            json!({"front": "five", "back": "năm"}),
        ];

        let (cards, skipped) = sanitize_entries(&entries, 10);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].front, "five");
        assert_eq!(cards[1].display_order, 1);
        let skipped_indexes: Vec<usize> = skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped_indexes, vec![1, 2, 3, 4]);
        assert_eq!(skipped[0].reason, "missing or empty back");
    }

    #[test]
    fn test_cap_applies_after_skipping() {
        let mut entries: Vec<Value> = (0..12)
            .map(|i| json!({"front": format!("word {i}"), "back": format!("từ {i}")}))
            .collect();
        entries[2] = json!({"front": "broken"});
        entries[5] = json!({"front": "also broken", "back": null});

        let (cards, skipped) = sanitize_entries(&entries, 10);
        assert_eq!(cards.len(), 10);
        assert_eq!(skipped.len(), 2);
        assert_eq!(cards.last().unwrap().front, "word 11");
        let orders: Vec<u32> = cards.iter().map(|c| c.display_order).collect();
        assert_eq!(orders, (0..10).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_fenced_single_card() {
        let provider = MockModelProvider::new();
        provider.queue_response(CannedResponse::text(
            "```json\n{\"cards\":[{\"front\":\"cat\",\"back\":\"con mèo\"}]}\n```",
        ));

        let batch = orchestrator(&provider)
            .generate(&GenerationRequest::new(1, "pets", 5))
            .await
            .unwrap();

        assert_eq!(batch.cards.len(), 1);
        let card = &batch.cards[0];
        assert_eq!(card.front, "cat");
        assert_eq!(card.back, "con mèo");
        assert_eq!(card.difficulty, Difficulty::Normal);
        assert_eq!(card.display_order, 0);
        assert_eq!(batch.sanitized_topic, "Pets");
        assert_eq!(batch.model, "test-model");
    }

    #[tokio::test]
    async fn test_prompt_uses_sanitized_topic() {
        let provider = MockModelProvider::new();
        provider.queue_response(CannedResponse::text(r#"{"cards": []}"#));

        orchestrator(&provider)
            .generate(&GenerationRequest::new(1, "  farm animals ", 3))
            .await
            .unwrap();

        let prompts = provider.received_prompts();
        assert!(prompts[0].contains("- Topic: Farm Animals\n"));
    }

    #[tokio::test]
    async fn test_policy_rejection_is_distinguishable() {
        let provider = MockModelProvider::new();
        let err = orchestrator(&provider)
            .generate(&GenerationRequest::new(1, "jailbreak tricks", 3))
            .await
            .unwrap_err();

        assert!(err.is_policy_rejection());
        assert_eq!(err.suggestions().len(), 3);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_count_bounds() {
        let provider = MockModelProvider::new();
        let orchestrator = orchestrator(&provider);

        for count in [0, 16] {
            let err = orchestrator
                .generate(&GenerationRequest::new(1, "animals", count))
                .await
                .unwrap_err();
            assert!(matches!(err, GenerationError::InvalidCount { max: 15, .. }));
            assert!(!err.is_policy_rejection());
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_and_parse_failures_are_system_faults() {
        let provider = MockModelProvider::new();
        provider.queue_responses([
            CannedResponse::error(LlmError::Truncated("MAX_TOKENS".to_string())),
            CannedResponse::text("   "),
            CannedResponse::text("Sure! Here are your cards: cat, dog"),
        ]);
        let orchestrator = orchestrator(&provider);
        let request = GenerationRequest::new(1, "animals", 3);

        let err = orchestrator.generate(&request).await.unwrap_err();
        assert!(matches!(err, GenerationError::Model(LlmError::Truncated(_))));

        let err = orchestrator.generate(&request).await.unwrap_err();
        assert!(matches!(err, GenerationError::Model(LlmError::EmptyResponse)));

        let err = orchestrator.generate(&request).await.unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
        assert!(!err.to_string().contains("cat, dog"));
    }
}
