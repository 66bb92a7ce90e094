#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use diary_agents::clients::{
    ChatRequest, ModelReply, ModelTransport, SearchError, SearchHit, TransportError, WebSearch,
};
use diary_agents::models::TokenUsage;

/// 按顺序返回预设结果的传输实现，脚本用完后返回 `fallback`
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<ModelReply, TransportError>>>,
    fallback: Result<ModelReply, TransportError>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<&str, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(ModelReply::text))
                    .collect(),
            ),
            fallback: Err(TransportError::ServiceUnavailable("script exhausted".into())),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// 收到的全部请求
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelTransport for ScriptedTransport {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ModelReply, TransportError> {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// 根据任务提示词决定回复的传输实现
///
/// 每条规则为（提示词片段, 延迟, 结果）；第一条消息包含该片段时使用该规则
pub struct RoutedTransport {
    routes: Vec<(String, Duration, Result<String, TransportError>)>,
    default_reply: String,
}

impl RoutedTransport {
    pub fn new(default_reply: &str) -> Self {
        Self {
            routes: Vec::new(),
            default_reply: default_reply.to_string(),
        }
    }

    pub fn route(
        mut self,
        needle: &str,
        delay: Duration,
        result: Result<&str, TransportError>,
    ) -> Self {
        self.routes
            .push((needle.to_string(), delay, result.map(str::to_string)));
        self
    }
}

#[async_trait]
impl ModelTransport for RoutedTransport {
    fn model_name(&self) -> &str {
        "routed"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ModelReply, TransportError> {
        let task = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .find(|c| c.contains("待辦事項（共"))
            .unwrap_or_default()
            .to_string();

        for (needle, delay, result) in &self.routes {
            if task.contains(needle.as_str()) {
                tokio::time::sleep(*delay).await;
                return result.clone().map(|text| ModelReply {
                    text,
                    usage: Some(TokenUsage {
                        prompt_tokens: 10,
                        completion_tokens: 2,
                    }),
                });
            }
        }
        Ok(ModelReply::text(self.default_reply.clone()))
    }
}

/// 永远不返回的传输实现
pub struct StalledTransport;

#[async_trait]
impl ModelTransport for StalledTransport {
    fn model_name(&self) -> &str {
        "stalled"
    }

    async fn complete(&self, _request: ChatRequest) -> Result<ModelReply, TransportError> {
        std::future::pending().await
    }
}

/// 不联网的搜索实现
pub struct NoSearch;

#[async_trait]
impl WebSearch for NoSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, SearchError> {
        Ok(Vec::new())
    }
}

/// 读取 CSV（去掉 BOM），返回全部行（含表头）
pub fn read_csv_rows(path: &std::path::Path) -> Vec<Vec<String>> {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"), "输出文件应以 BOM 开头");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(&bytes[3..]);
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}
