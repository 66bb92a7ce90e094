//! 批量提示词构建 - 业务能力层
//!
//! 提示词中要求模型使用的分隔线，必须与拼接日记时使用的分隔线完全相同，
//! 因为 [`crate::workflow::BatchProcessor`] 会用同一个字面量切分回复。

use crate::models::schema::fields;

/// 默认分隔线
pub const DEFAULT_DELIMITER: &str = "-----";

/// 批量提示词构建器
#[derive(Debug, Clone)]
pub struct BatchPromptBuilder {
    delimiter: String,
}

impl BatchPromptBuilder {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// 选出一个不会出现在任何日记中的分隔线
    ///
    /// 从配置的分隔线开始，不断在末尾追加 `-`，直到没有任何日记包含它。
    pub fn delimiter_for<S: AsRef<str>>(&self, records: &[S]) -> String {
        let mut delimiter = self.delimiter.clone();
        while records.iter().any(|r| r.as_ref().contains(&delimiter)) {
            delimiter.push('-');
        }
        delimiter
    }

    /// 构建一次批量请求的完整内容，返回（提示词, 实际使用的分隔线）
    pub fn build<S: AsRef<str>>(&self, records: &[S]) -> (String, String) {
        let delimiter = self.delimiter_for(records);
        let payload = format!(
            "{}\n\n{}",
            instruction(&delimiter),
            join_records(records, &delimiter)
        );
        (payload, delimiter)
    }
}

impl Default for BatchPromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

/// 指令部分：标注项、标记规则、分隔约定和示例
fn instruction(delimiter: &str) -> String {
    let items = fields().collect::<Vec<_>>().join("\n");
    let example = fields()
        .enumerate()
        .map(|(i, name)| {
            let value = if i == 0 { "1" } else { "" };
            format!("  \"{}\": \"{}\"", name, value)
        })
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "你是一位情感分析專家，請根據以下編碼規則評估每篇日記的情感，\n\
         {items}\n\n\
         請依據評估結果，對每個項目：若觸及則標記為 1，否則留空。 \
         請對每篇日記產生 JSON 格式回覆，並在各筆結果間用下列分隔線隔開：\n\
         {delimiter}\n\
         例如：\n\
         ```json\n\
         {{\n{example}\n}}\n\
         {delimiter}\n\
         {{...}}\n\
         ```"
    )
}

fn join_records<S: AsRef<str>>(records: &[S], delimiter: &str) -> String {
    records
        .iter()
        .map(|r| r.as_ref())
        .collect::<Vec<_>>()
        .join(&format!("\n{}\n", delimiter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_lists_every_field_and_record() {
        let builder = BatchPromptBuilder::default();
        let (payload, delimiter) = builder.build(&["今天跑了五公里。", "對工作感到焦慮。"]);

        assert_eq!(delimiter, DEFAULT_DELIMITER);
        for name in fields() {
            assert!(payload.contains(name), "缺少标注项 {}", name);
        }
        assert!(payload.ends_with("今天跑了五公里。\n-----\n對工作感到焦慮。"));
    }

    #[test]
    fn test_instruction_and_join_use_same_delimiter() {
        let builder = BatchPromptBuilder::new("#####");
        let (payload, delimiter) = builder.build(&["a", "b"]);

        assert_eq!(delimiter, "#####");
        assert!(payload.contains("用下列分隔線隔開：\n#####\n"));
        assert!(payload.contains("a\n#####\nb"));
        assert!(!payload.contains("-----"));
    }

    #[test]
    fn test_delimiter_collision_picks_longer_delimiter() {
        let builder = BatchPromptBuilder::default();
        let records = ["第一段\n-----\n第二段", "普通日記", "還有 ------ 六個"];

        let delimiter = builder.delimiter_for(&records);
        assert_eq!(delimiter, "-------");
        assert!(records.iter().all(|r| !r.contains(&delimiter)));

        let (payload, used) = builder.build(&records);
        assert_eq!(used, delimiter);
        assert!(payload.contains("普通日記\n-------\n還有"));
    }

    #[test]
    fn test_single_record_has_no_join_delimiter() {
        let (payload, _) = BatchPromptBuilder::default().build(&["只有一篇"]);
        assert!(payload.ends_with("\n\n只有一篇"));
    }
}
