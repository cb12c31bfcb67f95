// src/llm/json_loose.rs
// Tolerant projection of a model's interpret-response content into typed
// fields (§4.3 step 5, §9 "ambient dynamic typing" design note).
//
// Grounded on llm/structured/processor.rs's .get(...).and_then(...) Value
// navigation idiom and llm/provider/deepseek.rs's defensive response
// unpacking, generalized to the fields this spec's interpret response uses.

use serde_json::Value;

use crate::errors::{Result, WorkbenchError};

#[derive(Debug, Clone)]
pub struct RawKeyword {
    pub word: String,
    pub weight: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct InterpretResult {
    pub topic: String,
    pub positive_keywords: Vec<RawKeyword>,
    pub negative_keywords: Vec<RawKeyword>,
    pub confidence: Option<f64>,
    pub instructions: Option<String>,
    pub tags: Vec<String>,
}

/// Finds the first `{...}` span in `raw` and parses it as JSON, tolerating
/// extraneous text (preambles, trailing commentary) around the object.
pub fn extract_json_object(raw: &str) -> Result<Value> {
    let start = raw
        .find('{')
        .ok_or_else(|| WorkbenchError::ModelInvocationFailed("no JSON object in model response".into()))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| WorkbenchError::ModelInvocationFailed("unterminated JSON object in model response".into()))?;
    if end < start {
        return Err(WorkbenchError::ModelInvocationFailed(
            "malformed JSON object in model response".into(),
        ));
    }
    serde_json::from_str(&raw[start..=end])
        .map_err(|e| WorkbenchError::ModelInvocationFailed(format!("invalid JSON in model response: {e}")))
}

fn parse_keyword_list(value: Option<&Value>) -> Vec<RawKeyword> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let word = item.get("word").and_then(|w| w.as_str())?.to_string();
                    let weight = item
                        .get("weight")
                        .and_then(|w| w.as_i64().or_else(|| w.as_f64().map(|f| f.round() as i64)));
                    Some(RawKeyword { word, weight })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `instructions` may be a plain string or an array of strings (joined with
/// "; "); non-string array elements are dropped.
fn parse_instructions(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Array(items)) => {
            let joined = items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            if joined.is_empty() {
                None
            } else {
                Some(joined)
            }
        }
        _ => None,
    }
}

fn parse_tags(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

pub fn parse_interpret_result(raw: &str) -> Result<InterpretResult> {
    let value = extract_json_object(raw)?;

    Ok(InterpretResult {
        topic: value.get("topic").and_then(|t| t.as_str()).unwrap_or("").to_string(),
        positive_keywords: parse_keyword_list(value.get("positive_keywords")),
        negative_keywords: parse_keyword_list(value.get("negative_keywords")),
        confidence: value.get("confidence").and_then(|c| c.as_f64()),
        instructions: parse_instructions(value.get("instructions")),
        tags: parse_tags(value.get("tags")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_preamble_and_trailing_text() {
        let raw = "Sure, here you go:\n{\"topic\": \"rust\", \"positive_keywords\": [], \"negative_keywords\": [], \"tags\": []}\nHope that helps!";
        let result = parse_interpret_result(raw).unwrap();
        assert_eq!(result.topic, "rust");
    }

    #[test]
    fn instructions_array_is_joined_with_semicolons() {
        let raw = r#"{"topic": "t", "positive_keywords": [], "negative_keywords": [], "tags": [], "instructions": ["be concise", "use active voice"]}"#;
        let result = parse_interpret_result(raw).unwrap();
        assert_eq!(result.instructions.as_deref(), Some("be concise; use active voice"));
    }

    #[test]
    fn instructions_non_string_elements_are_dropped() {
        let raw = r#"{"topic": "t", "positive_keywords": [], "negative_keywords": [], "tags": [], "instructions": ["ok", 5, null]}"#;
        let result = parse_interpret_result(raw).unwrap();
        assert_eq!(result.instructions.as_deref(), Some("ok"));
    }

    #[test]
    fn keyword_weight_accepts_float_or_missing() {
        let raw = r#"{"topic": "t", "positive_keywords": [{"word": "a", "weight": 4.6}, {"word": "b"}], "negative_keywords": [], "tags": []}"#;
        let result = parse_interpret_result(raw).unwrap();
        assert_eq!(result.positive_keywords[0].weight, Some(5));
        assert_eq!(result.positive_keywords[1].weight, None);
    }

    #[test]
    fn missing_json_object_errors() {
        let err = parse_interpret_result("no json here").unwrap_err();
        assert!(matches!(err, WorkbenchError::ModelInvocationFailed(_)));
    }
}
