//! 回复片段解析 - 业务能力层
//!
//! 把模型回复中的一个片段还原为完整的标注结果，解析失败时退化为全空结果

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::warn;

use crate::models::AnnotationResult;
use crate::utils::logging::truncate_text;

/// 单个片段的解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFragment {
    /// 成功解析为 JSON 对象
    Decoded(Map<String, Value>),
    /// 无法解析
    Malformed(Diagnostic),
}

/// 解析失败的诊断信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub fragment: String,
    pub reason: String,
}

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"^```[A-Za-z]*\s*").expect("code fence pattern is valid")
    })
}

/// 去掉首尾空白和 Markdown 代码围栏
pub fn clean_fragment(fragment: &str) -> &str {
    let mut cleaned = fragment.trim();
    if let Some(m) = code_fence().find(cleaned) {
        cleaned = cleaned[m.end()..].trim();
    }
    if let Some(stripped) = cleaned.strip_suffix("```") {
        cleaned = stripped.trim();
    }
    cleaned
}

/// 尝试把片段解码为 JSON 对象
pub fn decode(fragment: &str) -> ParsedFragment {
    let cleaned = clean_fragment(fragment);
    match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(map)) => ParsedFragment::Decoded(map),
        Ok(other) => ParsedFragment::Malformed(Diagnostic {
            fragment: fragment.to_string(),
            reason: format!("期望 JSON 对象，实际为 {}", json_kind(&other)),
        }),
        Err(e) => ParsedFragment::Malformed(Diagnostic {
            fragment: fragment.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// 解析一个片段，永远返回包含全部标注项的结果
pub fn parse_response(fragment: &str) -> AnnotationResult {
    match decode(fragment) {
        ParsedFragment::Decoded(map) => AnnotationResult::from_pairs(
            map.into_iter().map(|(key, value)| (key, value_to_string(value))),
        ),
        ParsedFragment::Malformed(diagnostic) => {
            warn!("解析 JSON 失败：{}", diagnostic.reason);
            warn!("原始回传内容：{}", truncate_text(&diagnostic.fragment, 200));
            AnnotationResult::empty()
        }
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "布尔值",
        Value::Number(_) => "数字",
        Value::String(_) => "字符串",
        Value::Array(_) => "数组",
        Value::Object(_) => "对象",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::fields;
    use crate::models::AnnotationItem;

    #[test]
    fn test_complete_object_round_trips() {
        let fragment = r#"
            {"情感正向": "1", "情感負向": "", "情感中立": "", "積極行為": "1",
             "消極行為": "", "反思": "1", "目標設置": ""}
        "#;
        let result = parse_response(fragment);

        let expected = AnnotationResult::from_pairs([
            ("情感正向".to_string(), "1".to_string()),
            ("積極行為".to_string(), "1".to_string()),
            ("反思".to_string(), "1".to_string()),
        ]);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let result = parse_response(r#"{"情感負向": "1"}"#);
        assert_eq!(result.get(AnnotationItem::NegativeEmotion), "1");
        assert!(fields().all(|name| result.get_by_name(name).is_some()));
    }

    #[test]
    fn test_truncated_json_degrades_to_defaults() {
        let result = parse_response(r#"{"情感正向": "1", "情感負"#);
        assert_eq!(result, AnnotationResult::empty());
    }

    #[test]
    fn test_plain_text_degrades_to_defaults() {
        let result = parse_response("这篇日记看起来很开心");
        assert!(result.is_blank());
        assert_eq!(result.keys().count(), 7);
    }

    #[test]
    fn test_non_object_json_is_malformed() {
        match decode("[1, 2]") {
            ParsedFragment::Malformed(d) => assert!(d.reason.contains("数组")),
            ParsedFragment::Decoded(_) => panic!("数组不应被当作标注对象"),
        }
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let fragment = "```json\n{\"反思\": \"1\"}\n";
        assert_eq!(parse_response(fragment).get(AnnotationItem::Reflection), "1");

        let closing = "{\"目標設置\": \"1\"}\n```";
        assert_eq!(parse_response(closing).get(AnnotationItem::GoalSetting), "1");
    }

    #[test]
    fn test_non_string_values_are_stringified() {
        let result = parse_response(r#"{"情感正向": 1, "情感中立": null}"#);
        assert_eq!(result.get(AnnotationItem::PositiveEmotion), "1");
        assert_eq!(result.get(AnnotationItem::NeutralEmotion), "");
    }

    #[test]
    fn test_extra_keys_are_kept() {
        let result = parse_response(r#"{"說明": "跑步"}"#);
        assert_eq!(result.get_by_name("說明"), Some("跑步"));
        assert!(result.is_blank());
    }
}
