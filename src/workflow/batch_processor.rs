//! 单批日记处理流程 - 流程层
//!
//! 流程顺序：
//! 1. 构建提示词
//! 2. 调用模型
//! 3. 成功 → 按分隔线切分并逐段解析；暂时性失败 → 整批填充默认结果
//!
//! 输出长度始终等于输入长度：片段不足时补默认结果，片段过多时截断

use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::models::AnnotationResult;
use crate::services::response_parser::{clean_fragment, parse_response};
use crate::services::{AnnotationClient, BatchPromptBuilder, CallOutcome};

/// 结果是如何得到的
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// 片段数与日记数一致
    Annotated,
    /// 调用失败，整批使用默认结果
    DefaultFilled,
    /// 片段数不一致，已补齐或截断
    Realigned { fragments: usize },
}

/// 单批处理结果
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub results: Vec<AnnotationResult>,
    pub outcome: BatchOutcome,
}

/// 单批日记处理器
///
/// 不持有任何持久状态，只依赖客户端与提示词构建器
pub struct BatchProcessor {
    client: AnnotationClient,
    builder: BatchPromptBuilder,
}

impl BatchProcessor {
    pub fn new(client: AnnotationClient, builder: BatchPromptBuilder) -> Self {
        Self { client, builder }
    }

    /// 处理一批日记，返回与输入等长、同序的结果
    pub async fn process<S: AsRef<str>>(&self, batch: &[S]) -> AppResult<BatchResult> {
        let (payload, delimiter) = self.builder.build(batch);
        if delimiter != self.builder.delimiter() {
            info!("日记中出现分隔线，本批改用 {}", delimiter);
        }

        let reply = match self.client.send(&payload).await? {
            CallOutcome::Reply(text) => text,
            CallOutcome::TransientFailure(reason) => {
                warn!("本批 {} 篇日记使用默认结果: {}", batch.len(), reason);
                return Ok(BatchResult {
                    results: default_results(batch.len()),
                    outcome: BatchOutcome::DefaultFilled,
                });
            }
        };

        debug!("批次 API 回传内容：{}", reply);
        Ok(split_and_parse(&reply, &delimiter, batch.len()))
    }
}

/// 按分隔线切分回复并逐段解析，再把结果对齐到 `expected` 条
///
/// 去掉代码围栏后为空的片段不计数
pub fn split_and_parse(reply: &str, delimiter: &str, expected: usize) -> BatchResult {
    let mut results: Vec<AnnotationResult> = reply
        .split(delimiter)
        .filter(|part| !clean_fragment(part).is_empty())
        .map(parse_response)
        .collect();

    let fragments = results.len();
    let outcome = if fragments == expected {
        BatchOutcome::Annotated
    } else {
        warn!(
            "回复片段数 {} 与日记数 {} 不一致，已{}",
            fragments,
            expected,
            if fragments < expected { "补齐默认结果" } else { "截断多余片段" }
        );
        results.resize_with(expected, AnnotationResult::empty);
        BatchOutcome::Realigned { fragments }
    };

    BatchResult { results, outcome }
}

fn default_results(len: usize) -> Vec<AnnotationResult> {
    (0..len).map(|_| AnnotationResult::empty()).collect()
}
