//! LLM 传输层
//!
//! 核心逻辑只依赖 [`ModelTransport`]，具体的 HTTP 客户端在启动时构建一次并显式传入。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - Gemini 通过其 OpenAI 兼容端点接入

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::TokenUsage;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// 请求中的一条消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// 一次模型请求
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
}

impl ChatRequest {
    /// 只含一条用户消息的请求
    pub fn user(content: impl Into<String>) -> Self {
        Self::default().push(ChatRole::User, content)
    }

    pub fn push(mut self, role: ChatRole, content: impl Into<String>) -> Self {
        self.messages.push(ChatTurn {
            role,
            content: content.into(),
        });
        self
    }

    /// 最后一条消息的内容
    pub fn last_content(&self) -> &str {
        self.messages.last().map(|m| m.content.as_str()).unwrap_or_default()
    }
}

/// 模型回复
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// 传输层错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// 服务端暂时不可用（过载、5xx、网络中断）
    #[error("服务暂时不可用: {0}")]
    ServiceUnavailable(String),
    /// 调用超时
    #[error("调用超时 ({0:?})")]
    Timeout(Duration),
    /// 请求被拒绝（凭证、权限、请求格式）
    #[error("请求被拒绝: {0}")]
    Rejected(String),
}

impl TransportError {
    /// 是否为可重试的暂时性失败
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::ServiceUnavailable(_) | TransportError::Timeout(_)
        )
    }
}

/// 模型调用边界
#[async_trait]
pub trait ModelTransport: Send + Sync {
    /// 模型名称（用于日志和错误信息）
    fn model_name(&self) -> &str;

    /// 发送一次请求，返回完整回复
    async fn complete(&self, request: ChatRequest) -> Result<ModelReply, TransportError>;
}

/// 基于 OpenAI 兼容接口的传输实现
pub struct OpenAiTransport {
    client: Client<OpenAIConfig>,
    model_name: String,
    timeout: Duration,
}

impl OpenAiTransport {
    /// 创建新的传输实例
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            timeout: config.request_timeout(),
        }
    }

    fn build_messages(
        request: ChatRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let mut messages = Vec::with_capacity(request.messages.len());
        for turn in request.messages {
            let message = match turn.role {
                ChatRole::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(turn.content)
                        .build()?,
                ),
                ChatRole::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(turn.content)
                        .build()?,
                ),
                ChatRole::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(turn.content)
                        .build()?,
                ),
            };
            messages.push(message);
        }
        Ok(messages)
    }
}

#[async_trait]
impl ModelTransport for OpenAiTransport {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: ChatRequest) -> Result<ModelReply, TransportError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("消息数: {}, 最后一条长度: {} 字符", request.messages.len(), request.last_content().len());

        let messages = Self::build_messages(request).map_err(classify)?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .build()
            .map_err(classify)?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                warn!("LLM API 调用超时 ({:?})", self.timeout);
                TransportError::Timeout(self.timeout)
            })?
            .map_err(|e| {
                warn!("LLM API 调用失败: {}", e);
                classify(e)
            })?;

        debug!("LLM API 调用成功");

        let usage = response.usage.as_ref().map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        });

        // 空内容视为服务端异常，按暂时性失败处理
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| TransportError::ServiceUnavailable("LLM 返回内容为空".to_string()))?;

        Ok(ModelReply { text, usage })
    }
}

/// 把 async-openai 的错误归类为传输层错误
fn classify(err: OpenAIError) -> TransportError {
    match err {
        OpenAIError::ApiError(api) => classify_api_message(&api.to_string()),
        OpenAIError::InvalidArgument(message) => TransportError::Rejected(message),
        other => TransportError::ServiceUnavailable(other.to_string()),
    }
}

const REJECTION_MARKERS: [&str; 7] = [
    "api key",
    "api_key",
    "unauthorized",
    "permission",
    "invalid_argument",
    "invalid argument",
    "not found",
];

fn classify_api_message(message: &str) -> TransportError {
    let lower = message.to_lowercase();
    if REJECTION_MARKERS.iter().any(|marker| lower.contains(marker)) {
        TransportError::Rejected(message.to_string())
    } else {
        TransportError::ServiceUnavailable(message.to_string())
    }
}
