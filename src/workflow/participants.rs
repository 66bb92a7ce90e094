//! 对话参与者 - 流程层
//!
//! 每个参与者在轮到自己时读取完整的对话上下文，产生零到多条消息。
//! 模型暂时不可用时本轮不发言，会话继续由下一位参与者接手。

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clients::web_search::format_hits;
use crate::clients::{ChatRequest, ChatRole, ModelReply, ModelTransport, TransportError, WebSearch};
use crate::error::{AppError, AppResult, LlmError};
use crate::models::{ConversationMessage, TokenUsage};
use crate::services::HumanInput;

/// 参与者的一条发言
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantReply {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

impl ParticipantReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }
}

impl From<ModelReply> for ParticipantReply {
    fn from(reply: ModelReply) -> Self {
        Self {
            content: reply.text,
            usage: reply.usage,
        }
    }
}

#[async_trait]
pub trait Participant: Send {
    fn name(&self) -> &str;

    /// 轮到自己发言
    async fn respond(&mut self, context: &[ConversationMessage])
        -> AppResult<Vec<ParticipantReply>>;
}

/// 把对话上下文转换为模型请求：自己的发言作为 assistant，其他人的作为 user
fn context_request(own_name: &str, system: &str, context: &[ConversationMessage]) -> ChatRequest {
    context.iter().fold(
        ChatRequest::default().push(ChatRole::System, system),
        |request, message| {
            if message.source == own_name {
                request.push(ChatRole::Assistant, message.content.as_str())
            } else {
                request.push(
                    ChatRole::User,
                    format!("[{}] {}", message.source, message.content),
                )
            }
        },
    )
}

/// 调用模型；暂时性失败返回 `None`，请求被拒绝返回错误
async fn complete_or_skip(
    transport: &dyn ModelTransport,
    speaker: &str,
    request: ChatRequest,
) -> AppResult<Option<ModelReply>> {
    match transport.complete(request).await {
        Ok(reply) => Ok(Some(reply)),
        Err(TransportError::Rejected(message)) => Err(AppError::Llm(LlmError::Rejected {
            model: transport.model_name().to_string(),
            message,
        })),
        Err(err) => {
            warn!("[{}] 模型调用失败，本轮跳过: {}", speaker, err);
            Ok(None)
        }
    }
}

/// 由模型驱动、带固定角色设定的参与者
pub struct AssistantParticipant {
    name: String,
    system_message: String,
    transport: Arc<dyn ModelTransport>,
}

impl AssistantParticipant {
    pub fn new(
        name: impl Into<String>,
        system_message: impl Into<String>,
        transport: Arc<dyn ModelTransport>,
    ) -> Self {
        Self {
            name: name.into(),
            system_message: system_message.into(),
            transport,
        }
    }
}

#[async_trait]
impl Participant for AssistantParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(
        &mut self,
        context: &[ConversationMessage],
    ) -> AppResult<Vec<ParticipantReply>> {
        let request = context_request(&self.name, &self.system_message, context);
        let reply = complete_or_skip(self.transport.as_ref(), &self.name, request).await?;
        Ok(reply.into_iter().map(ParticipantReply::from).collect())
    }
}

const QUERY_SYSTEM_MESSAGE: &str = "你負責上網搜尋資料。根據對話內容，只輸出一行最適合的搜尋關鍵字，不要輸出其他內容。";
const SURFER_SYSTEM_MESSAGE: &str = "你是一位會上網搜尋的助理，負責把最新的時間管理與工作效率技巧整合進團隊的建議中，並註明資料來源。";

/// 会先搜索再发言的参与者
pub struct WebSurferParticipant {
    name: String,
    transport: Arc<dyn ModelTransport>,
    search: Arc<dyn WebSearch>,
}

impl WebSurferParticipant {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn ModelTransport>,
        search: Arc<dyn WebSearch>,
    ) -> Self {
        Self {
            name: name.into(),
            transport,
            search,
        }
    }

    async fn search_text(&self, query: &str) -> String {
        match self.search.search(query).await {
            Ok(hits) => format_hits(&hits),
            Err(e) => {
                warn!("[{}] 搜索失败: {}", self.name, e);
                format!("（搜尋失敗：{}）", e)
            }
        }
    }
}

#[async_trait]
impl Participant for WebSurferParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(
        &mut self,
        context: &[ConversationMessage],
    ) -> AppResult<Vec<ParticipantReply>> {
        let query_request = context_request(&self.name, QUERY_SYSTEM_MESSAGE, context);
        let Some(query_reply) =
            complete_or_skip(self.transport.as_ref(), &self.name, query_request).await?
        else {
            return Ok(Vec::new());
        };

        let query = query_reply.text.lines().next().unwrap_or_default().trim().to_string();
        debug!("[{}] 搜索关键词: {}", self.name, query);
        let results = self.search_text(&query).await;

        let answer_request = context_request(&self.name, SURFER_SYSTEM_MESSAGE, context).push(
            ChatRole::User,
            format!("以下是搜尋「{}」的結果：\n{}\n\n請把有用的內容整合進你的回覆。", query, results),
        );
        let Some(answer) =
            complete_or_skip(self.transport.as_ref(), &self.name, answer_request).await?
        else {
            return Ok(Vec::new());
        };

        let usage = match (query_reply.usage, answer.usage) {
            (Some(a), Some(b)) => Some(TokenUsage {
                prompt_tokens: a.prompt_tokens + b.prompt_tokens,
                completion_tokens: a.completion_tokens + b.completion_tokens,
            }),
            (a, b) => a.or(b),
        };
        Ok(vec![ParticipantReply {
            content: answer.text,
            usage,
        }])
    }
}

/// 代表人类的参与者，可以输入终止词结束会话
pub struct UserProxyParticipant {
    name: String,
    input: Arc<dyn HumanInput>,
}

impl UserProxyParticipant {
    pub fn new(name: impl Into<String>, input: Arc<dyn HumanInput>) -> Self {
        Self {
            name: name.into(),
            input,
        }
    }
}

#[async_trait]
impl Participant for UserProxyParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(
        &mut self,
        context: &[ConversationMessage],
    ) -> AppResult<Vec<ParticipantReply>> {
        let prompt = match context.last() {
            Some(last) => format!("[{}] => {}\n請輸入回覆：", last.source, last.content),
            None => "請輸入回覆：".to_string(),
        };
        let reply = self.input.ask(&prompt).await?;
        Ok(vec![ParticipantReply::text(reply)])
    }
}
