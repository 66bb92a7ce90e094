//! 人工输入 - 业务能力层
//!
//! `user_proxy` 参与者通过它获取人类的回复；回复中包含终止词即可结束会话

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::error::AppResult;

#[async_trait]
pub trait HumanInput: Send + Sync {
    /// 展示提示并等待一行回复
    async fn ask(&self, prompt: &str) -> AppResult<String>;
}

/// 从终端读取
///
/// 多个会话并发运行时共用同一个终端，提问与读取在锁内完成，避免输出交错
#[derive(Clone)]
pub struct StdinInput {
    reader: Arc<Mutex<BufReader<Stdin>>>,
}

impl StdinInput {
    pub fn new() -> Self {
        Self {
            reader: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()))),
        }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HumanInput for StdinInput {
    async fn ask(&self, prompt: &str) -> AppResult<String> {
        let mut reader = self.reader.lock().await;
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.write_all("\n> ".as_bytes()).await?;
        stdout.flush().await?;

        let mut line = String::new();
        reader.read_line(&mut line).await?;
        Ok(line.trim().to_string())
    }
}

/// 固定回复，用于无人值守运行
#[derive(Debug, Clone)]
pub struct AutoReply {
    reply: String,
}

impl AutoReply {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl HumanInput for AutoReply {
    async fn ask(&self, _prompt: &str) -> AppResult<String> {
        Ok(self.reply.clone())
    }
}
