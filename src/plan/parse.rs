//! Recovering the plan payload from a free-text model reply.
//!
//! Search grounding cannot be combined with a JSON response schema, so the
//! reply is plain text that is expected to carry one fenced JSON block.

use crate::error::{Result, StoryError};
use crate::plan::types::{ContentPlan, GroundingUrl};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_+-]*)[ \t]*\r?\n(.*?)\r?\n[ \t]*```").expect("valid regex")
});

pub(crate) const DEFAULT_HISTORY_FACTS: &str = "역사적 정보를 찾을 수 없습니다.";
pub(crate) const DEFAULT_SYNOPSIS: &str = "줄거리를 생성할 수 없습니다.";
pub(crate) const DEFAULT_KEY_MESSAGE: &str = "메시지 없음";
pub(crate) const DEFAULT_TARGET_AUDIENCE: &str = "모두";
pub(crate) const DEFAULT_SOCIAL_CAPTION: &str = "콘텐츠를 확인해보세요!";

/// Extracts the JSON object from a reply.
///
/// Tries the first ```json block, then the first untagged ``` block, then
/// the whole text. The first candidate that parses as a JSON object wins.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>> {
    let blocks: Vec<(&str, &str)> = FENCE
        .captures_iter(text)
        .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
        .collect();
    let tagged = blocks
        .iter()
        .find(|(tag, _)| tag.eq_ignore_ascii_case("json"))
        .map(|(_, body)| *body);
    let untagged = blocks
        .iter()
        .find(|(tag, _)| tag.is_empty())
        .map(|(_, body)| *body);

    let attempts = [tagged, untagged]
        .into_iter()
        .flatten()
        .chain(std::iter::once(text));

    for (idx, candidate) in attempts.enumerate() {
        match serde_json::from_str::<Value>(candidate.trim()) {
            Ok(Value::Object(map)) => return Ok(map),
            Ok(other) => {
                tracing::debug!(attempt = idx, kind = json_kind(&other), "reply JSON is not an object");
            }
            Err(e) => {
                tracing::debug!(attempt = idx, "reply candidate is not JSON: {e}");
            }
        }
    }

    Err(StoryError::Generation(
        "Failed to generate a valid plan format.".into(),
    ))
}

/// Builds a complete plan from the parsed payload, filling gaps with defaults.
pub fn normalize_plan(
    place: &str,
    emotion: &str,
    content_type: &str,
    payload: &Map<String, Value>,
    grounding_urls: Vec<GroundingUrl>,
) -> ContentPlan {
    let field = |key: &str, default: String| field_text(payload.get(key)).unwrap_or(default);

    ContentPlan {
        place: place.to_string(),
        emotion: emotion.to_string(),
        history_facts: field("historyFacts", DEFAULT_HISTORY_FACTS.into()),
        synopsis: field("synopsis", DEFAULT_SYNOPSIS.into()),
        content_type: field("contentType", content_type.to_string()),
        key_message: field("keyMessage", DEFAULT_KEY_MESSAGE.into()),
        target_audience: field("targetAudience", DEFAULT_TARGET_AUDIENCE.into()),
        visual_prompt: field("visualPrompt", default_visual_prompt(place, emotion)),
        social_caption: field("socialCaption", DEFAULT_SOCIAL_CAPTION.into()),
        grounding_urls,
    }
}

/// Poster prompt used when the model did not provide one.
pub fn default_visual_prompt(place: &str, emotion: &str) -> String {
    format!(
        "A trendy, cinematic poster of {place} in Busan with a mood of {emotion}, \
         featuring a beautiful female protagonist, high quality, 8k, aesthetic"
    )
}

/// Text of a payload field; `None` for absent, null or blank values.
///
/// Arrays of strings are joined line by line; other scalars are stringified.
fn field_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PAYLOAD: &str = r#"{
  "historyFacts": "한국전쟁 당시 피란민들이 모이던 계단",
  "synopsis": "헤어진 가족을 기다리는 소녀의 이야기",
  "contentType": "단편 영화",
  "keyMessage": "기다림은 희망이다",
  "targetAudience": "20-30대",
  "visualPrompt": "A young woman on old stone stairs at golden hour",
  "socialCaption": "40계단 감성 폼 미쳤다 🍀 #부산"
}"#;

    #[test]
    fn test_extracts_tagged_fence() {
        let text = format!("여기 기획안입니다.\n```json\n{FULL_PAYLOAD}\n```\n감사합니다.");
        let map = extract_json_object(&text).unwrap();
        assert_eq!(map["contentType"], "단편 영화");
    }

    #[test]
    fn test_extracts_untagged_fence() {
        let text = format!("```\n{FULL_PAYLOAD}\n```");
        let map = extract_json_object(&text).unwrap();
        assert_eq!(map["keyMessage"], "기다림은 희망이다");
    }

    #[test]
    fn test_extracts_raw_json() {
        let map = extract_json_object(&format!("  {FULL_PAYLOAD}\n")).unwrap();
        assert_eq!(map["targetAudience"], "20-30대");
    }

    #[test]
    fn test_tagged_fence_preferred_over_untagged() {
        let text = "```\n{\"synopsis\": \"plain\"}\n```\n\n```json\n{\"synopsis\": \"tagged\"}\n```";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["synopsis"], "tagged");
    }

    #[test]
    fn test_broken_tagged_fence_falls_back_to_untagged() {
        let text = "```json\n{ not json\n```\n\n```\n{\"synopsis\": \"second\"}\n```";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["synopsis"], "second");
    }

    #[test]
    fn test_crlf_fence() {
        let text = "```json\r\n{\"synopsis\": \"windows\"}\r\n```";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["synopsis"], "windows");
    }

    #[test]
    fn test_no_json_anywhere_fails() {
        let err = extract_json_object("죄송합니다, 기획안을 만들 수 없습니다.").unwrap_err();
        assert!(matches!(err, StoryError::Generation(_)));
    }

    #[test]
    fn test_non_object_json_fails() {
        assert!(extract_json_object("[1, 2, 3]").is_err());
        assert!(extract_json_object("```json\n\"just a string\"\n```").is_err());
    }

    #[test]
    fn test_normalize_uses_parsed_values() {
        let map = extract_json_object(FULL_PAYLOAD).unwrap();
        let plan = normalize_plan("40계단", "그리움", "단편 영화", &map, vec![]);
        assert_eq!(plan.place, "40계단");
        assert_eq!(plan.emotion, "그리움");
        assert_eq!(plan.history_facts, "한국전쟁 당시 피란민들이 모이던 계단");
        assert_eq!(plan.synopsis, "헤어진 가족을 기다리는 소녀의 이야기");
        assert_eq!(plan.content_type, "단편 영화");
        assert_eq!(plan.key_message, "기다림은 희망이다");
        assert_eq!(plan.target_audience, "20-30대");
        assert_eq!(
            plan.visual_prompt,
            "A young woman on old stone stairs at golden hour"
        );
        assert_eq!(plan.social_caption, "40계단 감성 폼 미쳤다 🍀 #부산");
    }

    #[test]
    fn test_normalize_fills_defaults() {
        let plan = normalize_plan("영도다리", "희망", "전시회", &Map::new(), vec![]);
        assert_eq!(plan.history_facts, DEFAULT_HISTORY_FACTS);
        assert_eq!(plan.synopsis, DEFAULT_SYNOPSIS);
        assert_eq!(plan.content_type, "전시회");
        assert_eq!(plan.key_message, DEFAULT_KEY_MESSAGE);
        assert_eq!(plan.target_audience, DEFAULT_TARGET_AUDIENCE);
        assert_eq!(plan.visual_prompt, default_visual_prompt("영도다리", "희망"));
        assert_eq!(plan.social_caption, DEFAULT_SOCIAL_CAPTION);
        assert!(plan.grounding_urls.is_empty());
    }

    #[test]
    fn test_normalize_treats_blank_and_null_as_missing() {
        let map = extract_json_object(r#"{"synopsis": "  ", "keyMessage": null}"#).unwrap();
        let plan = normalize_plan("p", "e", "c", &map, vec![]);
        assert_eq!(plan.synopsis, DEFAULT_SYNOPSIS);
        assert_eq!(plan.key_message, DEFAULT_KEY_MESSAGE);
    }

    #[test]
    fn test_normalize_joins_string_arrays() {
        let map = extract_json_object(r#"{"historyFacts": ["1953년 화재", "피란민의 약속 장소"]}"#)
            .unwrap();
        let plan = normalize_plan("p", "e", "c", &map, vec![]);
        assert_eq!(plan.history_facts, "1953년 화재\n피란민의 약속 장소");
    }
}
