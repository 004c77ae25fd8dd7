//! Parsing of model output into question/answer pairs

use crate::errors::{AppError, Result};
use regex_lite::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// A question/answer pair extracted from model output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedCard {
    pub front: String,
    pub back: String,
}

const FRONT_KEYS: &[&str] = &["front", "front_content"];
const BACK_KEYS: &[&str] = &["back", "back_content"];

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)\s*```").ok())
        .as_ref()
}

/// Body of the first Markdown code fence, or the trimmed input when unfenced
fn strip_code_fence(content: &str) -> &str {
    fence_regex()
        .and_then(|re| re.captures(content))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_else(|| content.trim())
}

fn parse_error(message: impl Into<String>) -> AppError {
    AppError::GenerationParse {
        message: message.into(),
    }
}

fn text_field(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| item.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// Parse `{"flashcards": [{"front": .., "back": ..}]}`, keeping at most `max` cards.
///
/// Fails with a message naming the first structural defect found.
pub fn parse_flashcards(content: &str, max: usize) -> Result<Vec<ProposedCard>> {
    let body = strip_code_fence(content);
    if body.is_empty() {
        return Err(parse_error("response is empty"));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| parse_error(format!("response is not valid JSON: {}", e)))?;

    let items = value
        .get("flashcards")
        .ok_or_else(|| parse_error("response is missing the \"flashcards\" array"))?
        .as_array()
        .ok_or_else(|| parse_error("\"flashcards\" is not an array"))?;

    let mut cards = Vec::with_capacity(items.len().min(max));
    for (index, item) in items.iter().take(max).enumerate() {
        if !item.is_object() {
            return Err(parse_error(format!("flashcards[{}] is not an object", index)));
        }

        let front = text_field(item, FRONT_KEYS)
            .ok_or_else(|| parse_error(format!("flashcards[{}] has no front text", index)))?;
        let back = text_field(item, BACK_KEYS)
            .ok_or_else(|| parse_error(format!("flashcards[{}] has no back text", index)))?;

        cards.push(ProposedCard { front, back });
    }

    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: AppError) -> String {
        match err {
            AppError::GenerationParse { message } => message,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bare_object() {
        let cards = parse_flashcards(
            r#"{"flashcards": [{"front": "What is DNA?", "back": "Genetic material"}]}"#,
            10,
        )
        .unwrap();
        assert_eq!(
            cards,
            vec![ProposedCard {
                front: "What is DNA?".into(),
                back: "Genetic material".into()
            }]
        );
    }

    #[test]
    fn test_fenced_object_with_long_keys() {
        let content = "Here you go:\n```json\n{\"flashcards\": [\
            {\"front_content\": \"Q1\", \"back_content\": \"A1\"},\
            {\"front\": \"Q2\", \"back\": \"A2\"}]}\n```\nEnjoy!";
        let cards = parse_flashcards(content, 10).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].front, "Q1");
        assert_eq!(cards[1].back, "A2");
    }

    #[test]
    fn test_extra_items_dropped() {
        let items: Vec<String> = (0..5)
            .map(|i| format!(r#"{{"front": "Q{i}", "back": "A{i}"}}"#))
            .collect();
        let content = format!(r#"{{"flashcards": [{}]}}"#, items.join(","));

        let cards = parse_flashcards(&content, 3).unwrap();
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[2].front, "Q2");
    }

    #[test]
    fn test_structural_defects_are_named() {
        let err = parse_flashcards(r#"{"cards": []}"#, 10).unwrap_err();
        assert!(message(err).contains("missing the \"flashcards\" array"));

        let err = parse_flashcards(r#"{"flashcards": {}}"#, 10).unwrap_err();
        assert!(message(err).contains("not an array"));

        let err = parse_flashcards(
            r#"{"flashcards": [{"front": "Q", "back": "A"}, {"front": "Q2", "back": "  "}]}"#,
            10,
        )
        .unwrap_err();
        assert_eq!(message(err), "flashcards[1] has no back text");

        let err = parse_flashcards("not json at all", 10).unwrap_err();
        assert!(message(err).starts_with("response is not valid JSON"));

        let err = parse_flashcards("   ", 10).unwrap_err();
        assert_eq!(message(err), "response is empty");
    }
}
