//! 标注请求客户端 - 业务能力层
//!
//! 只负责"发送一次请求"能力：不重试、不退避，失败分类后交给调用方处理

use std::sync::Arc;
use tracing::{debug, warn};

use crate::clients::{ChatRequest, ModelTransport, TransportError};
use crate::error::{AppError, AppResult, LlmError};

/// 一次调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// 原样返回的回复文本
    Reply(String),
    /// 暂时性失败（服务过载、超时），由调用方改用默认结果
    TransientFailure(String),
}

/// 标注请求客户端
#[derive(Clone)]
pub struct AnnotationClient {
    transport: Arc<dyn ModelTransport>,
}

impl AnnotationClient {
    pub fn new(transport: Arc<dyn ModelTransport>) -> Self {
        Self { transport }
    }

    pub fn model_name(&self) -> &str {
        self.transport.model_name()
    }

    /// 发送一次请求
    ///
    /// 暂时性失败以 [`CallOutcome::TransientFailure`] 返回；
    /// 请求被拒绝属于致命错误，以 `Err` 返回。
    pub async fn send(&self, payload: &str) -> AppResult<CallOutcome> {
        debug!("发送标注请求，长度: {} 字符", payload.chars().count());

        match self.transport.complete(ChatRequest::user(payload)).await {
            Ok(reply) => Ok(CallOutcome::Reply(reply.text)),
            Err(err) if err.is_transient() => {
                warn!("API 呼叫失败：{}", err);
                Ok(CallOutcome::TransientFailure(err.to_string()))
            }
            Err(TransportError::Rejected(message)) => Err(AppError::Llm(LlmError::Rejected {
                model: self.model_name().to_string(),
                message,
            })),
            Err(other) => Ok(CallOutcome::TransientFailure(other.to_string())),
        }
    }
}
