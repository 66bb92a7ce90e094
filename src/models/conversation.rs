use serde::{Deserialize, Serialize};

/// 模型调用的 token 用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// 对话中的一条消息
///
/// 字段顺序即对话记录 CSV 的列顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// 本块第一行的序号
    pub batch_start: usize,
    /// 本块最后一行的序号
    pub batch_end: usize,
    /// 发言者
    pub source: String,
    pub content: String,
    /// 消息类型
    #[serde(rename = "type")]
    pub kind: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// 文本消息类型名
pub const TEXT_MESSAGE: &str = "TextMessage";

/// 消息所属的行范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub start: usize,
    pub end: usize,
}

impl BatchRange {
    /// 从起始序号和行数构建（`len` 为 0 时 end 等于 start）
    pub fn new(start: usize, len: usize) -> Self {
        Self {
            start,
            end: start + len.saturating_sub(1),
        }
    }
}

impl ConversationMessage {
    /// 创建文本消息
    pub fn text(
        range: BatchRange,
        source: impl Into<String>,
        content: impl Into<String>,
        usage: Option<TokenUsage>,
    ) -> Self {
        Self {
            batch_start: range.start,
            batch_end: range.end,
            source: source.into(),
            content: content.into(),
            kind: TEXT_MESSAGE.to_string(),
            prompt_tokens: usage.map(|u| u.prompt_tokens),
            completion_tokens: usage.map(|u| u.completion_tokens),
        }
    }
}
