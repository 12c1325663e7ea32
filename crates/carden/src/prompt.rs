//! Generation prompt construction.
//!
//! Pure: the same request always renders the same text.

use carden_types::{language_name, GenerationRequest};

/// Label used when the request carries no CEFR level.
pub const DEFAULT_LEVEL_LABEL: &str = "intermediate (B1-B2)";

/// Fixed instructions describing the card format the model must return.
pub const CARD_FORMAT_INSTRUCTIONS: &str = r#"You are an experienced language teacher who writes effective study material.

## Vocabulary selection
1. Prefer core vocabulary: the most important and frequently used words and phrases for the topic
2. Mix parts of speech: nouns, verbs, adjectives and common phrases
3. Match the requested level; default to intermediate (B1-B2)
4. Choose words learners actually meet in everyday life

## Each card
- front: the word or phrase in the source language, without unnecessary capitals
- back: the most accurate, natural translation in the target language
- ipa_pronunciation: standard IPA transcription (Cambridge or Oxford style)
- examples: 2 realistic example sentences with clear context (8-15 words each)
- synonyms / antonyms: only when genuinely useful
- tags: short labels such as "family", "relationships", "basic_vocabulary"
- difficulty: EASY (A1-A2), NORMAL (B1-B2) or HARD (C1-C2)

## Response format
Return only a JSON object:
{
  "topic": "<the topic>",
  "target_level": "<level>",
  "cards": [
    {
      "front": "word or phrase",
      "back": "translation",
      "ipa_pronunciation": "/aɪˈpiːeɪ/",
      "examples": ["Example one.", "Example two."],
      "synonyms": [],
      "antonyms": [],
      "tags": ["topic_tag"],
      "difficulty": "NORMAL"
    }
  ]
}"#;

/// Renders generation prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the prompt for a request whose topic has already been sanitized.
    pub fn build(request: &GenerationRequest) -> String {
        let level = match request.cefr_level {
            Some(level) => format!("CEFR {}", level),
            None => DEFAULT_LEVEL_LABEL.to_string(),
        };

        let mut lines = vec![
            format!(
                "Create {} language learning flashcards with the following details:",
                request.count
            ),
            format!("- Topic: {}", request.topic),
            format!(
                "- Source language: {} ({})",
                language_name(&request.source_language),
                request.source_language
            ),
            format!(
                "- Target language: {} ({})",
                language_name(&request.target_language),
                request.target_language
            ),
            format!("- Proficiency level: {}", level),
        ];
        if let Some(keywords) = request.effective_keywords() {
            lines.push(format!("- Keywords: {}", keywords.join(", ")));
        }
        lines.push(format!("- Include examples: {}", yes_no(request.include_examples)));
        lines.push(format!(
            "- Include pronunciation: {}",
            yes_no(request.include_pronunciation)
        ));
        lines.push(String::new());
        lines.push(format!(
            "Create {} varied cards that fit the topic \"{}\". Make every card rich and useful for study.",
            request.count, request.topic
        ));

        format!("{}\n\n{}\n", CARD_FORMAT_INSTRUCTIONS, lines.join("\n"))
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carden_types::CefrLevel;

    #[test]
    fn test_golden_prompt_with_defaults() {
        let request = GenerationRequest::new(1, "Kitchen Tools", 5);
        let expected = format!(
            "{}\n\n{}\n",
            CARD_FORMAT_INSTRUCTIONS,
            [
                "Create 5 language learning flashcards with the following details:",
                "- Topic: Kitchen Tools",
                "- Source language: English (en)",
                "- Target language: Vietnamese (vi)",
                "- Proficiency level: intermediate (B1-B2)",
                "- Include examples: yes",
                "- Include pronunciation: yes",
                "",
                "Create 5 varied cards that fit the topic \"Kitchen Tools\". Make every card rich and useful for study.",
            ]
            .join("\n")
        );
        assert_eq!(PromptBuilder::build(&request), expected);
    }

    #[test]
    fn test_prompt_with_level_keywords_and_flags() {
        let mut request = GenerationRequest::new(1, "Travel", 3);
        request.source_language = "fr".to_string();
        request.target_language = "pt".to_string();
        request.cefr_level = Some(CefrLevel::C1);
        request.keywords = Some(vec!["airport".to_string(), " ".to_string(), "visa".to_string()]);
        request.include_examples = false;
        request.include_pronunciation = false;

        let prompt = PromptBuilder::build(&request);
        assert!(prompt.contains("- Source language: French (fr)\n"));
        assert!(prompt.contains("- Target language: pt (pt)\n"));
        assert!(prompt.contains("- Proficiency level: CEFR C1\n"));
        assert!(prompt.contains("- Keywords: airport, visa\n"));
        assert!(prompt.contains("- Include examples: no\n"));
        assert!(prompt.contains("- Include pronunciation: no\n"));
    }

    #[test]
    fn test_blank_keywords_omit_section() {
        let mut request = GenerationRequest::new(1, "Travel", 3);
        request.keywords = Some(vec![String::new()]);
        assert!(!PromptBuilder::build(&request).contains("Keywords"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let request = GenerationRequest::new(9, "Weather", 10);
        assert_eq!(PromptBuilder::build(&request), PromptBuilder::build(&request));
    }
}
