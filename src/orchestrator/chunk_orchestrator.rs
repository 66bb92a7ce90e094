//! 待办事项分块协作 - 编排层
//!
//! ## 职责
//!
//! 1. **加载**：读取待办事项 CSV，不存在时先建立只有表头的空文件
//! 2. **分块**：按固定行数切块，每块组建一份独立的参与者名单与会话
//! 3. **并发**：所有会话放入同一个 `JoinSet` 并行运行
//! 4. **合并**：等待全部结束后按块序号合并对话记录，只写一次输出文件
//!
//! 单个块失败只记录在报告里，不影响其他块的记录；取消时中止全部会话且不写文件。

use std::path::Path;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, LlmError};
use crate::models::{BatchRange, ConversationMessage, TodoRow};
use crate::services::csv_sink::{initialize_todo_list, read_todo_rows, write_transcript};
use crate::utils::logging::log_chunks_loaded;
use crate::workflow::{RosterFactory, RoundRobinSession, SessionOutcome, SessionTranscript};

/// 单个块的执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStatus {
    Completed(SessionOutcome),
    Failed(String),
}

/// 一次协作运行的报告
#[derive(Debug, Clone, Default)]
pub struct OrchestrationReport {
    /// 待办事项总行数
    pub rows: usize,
    /// 按块序号排列
    pub chunks: Vec<ChunkStatus>,
    /// 合并后的消息条数
    pub messages: usize,
}

impl OrchestrationReport {
    pub fn failed(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| matches!(c, ChunkStatus::Failed(_)))
            .count()
    }
}

/// 分块协作编排器
pub struct ChunkOrchestrator {
    factory: RosterFactory,
    chunk_size: usize,
    sentinel: String,
    max_turns: usize,
}

impl ChunkOrchestrator {
    pub fn new(
        factory: RosterFactory,
        chunk_size: usize,
        sentinel: impl Into<String>,
        max_turns: usize,
    ) -> Self {
        Self {
            factory,
            chunk_size: chunk_size.max(1),
            sentinel: sentinel.into(),
            max_turns,
        }
    }

    /// 读取待办事项、运行全部会话，并把合并后的记录写入 `output`
    pub async fn run_file(
        &self,
        todo_path: impl AsRef<Path>,
        output: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> AppResult<OrchestrationReport> {
        let todo_path = todo_path.as_ref();
        initialize_todo_list(todo_path)?;
        let rows = read_todo_rows(todo_path)?;

        let (transcript, report) = self.run(rows, cancel).await?;
        write_transcript(output, &transcript)?;
        Ok(report)
    }

    /// 运行全部会话，返回按块序号合并的对话记录
    pub async fn run(
        &self,
        rows: Vec<TodoRow>,
        cancel: &CancellationToken,
    ) -> AppResult<(Vec<ConversationMessage>, OrchestrationReport)> {
        let total = rows.len();
        let chunks: Vec<&[TodoRow]> = rows.chunks(self.chunk_size).collect();
        log_chunks_loaded(total, chunks.len(), self.chunk_size);

        let mut set: JoinSet<(usize, AppResult<SessionTranscript>)> = JoinSet::new();
        for (index, chunk) in chunks.iter().enumerate() {
            let range = BatchRange::new(index * self.chunk_size, chunk.len());
            let task = task_prompt(chunk, range, total);
            let session = RoundRobinSession::new(
                self.factory.build(),
                range,
                self.sentinel.clone(),
                self.max_turns,
            );
            let session_cancel = cancel.child_token();
            set.spawn(async move { (index, session.run(task, &session_cancel).await) });
        }

        let mut slots: Vec<Option<AppResult<SessionTranscript>>> =
            (0..chunks.len()).map(|_| None).collect();
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    set.abort_all();
                    while set.join_next().await.is_some() {}
                    warn!("⚠️ 已取消，全部会话中止，不写入对话记录");
                    return Err(AppError::Cancelled);
                }
                joined = set.join_next() => joined,
            };
            match joined {
                None => break,
                Some(Ok((index, result))) => slots[index] = Some(result),
                Some(Err(e)) => error!("❌ 会话任务异常结束: {}", e),
            }
        }

        let mut transcript = Vec::new();
        let mut report = OrchestrationReport {
            rows: total,
            ..Default::default()
        };
        for (index, slot) in slots.into_iter().enumerate() {
            // 任务 panic 时拿不到块序号，对应的槽位为空
            let result = slot.unwrap_or_else(|| {
                Err(AppError::Llm(LlmError::SessionPanicked {
                    chunk_index: index,
                    message: "任务未返回结果".to_string(),
                }))
            });
            match result {
                Ok(session) => {
                    info!(
                        "✓ 第 {} 块完成: {:?}，{} 轮，{} 条消息",
                        index + 1,
                        session.outcome,
                        session.turns,
                        session.messages.len()
                    );
                    report.chunks.push(ChunkStatus::Completed(session.outcome));
                    transcript.extend(session.messages);
                }
                Err(e) => {
                    error!("❌ 第 {} 块失败: {}", index + 1, e);
                    report.chunks.push(ChunkStatus::Failed(e.to_string()));
                }
            }
        }
        report.messages = transcript.len();
        Ok((transcript, report))
    }
}

/// 组建一个块的任务提示词
fn task_prompt(chunk: &[TodoRow], range: BatchRange, total: usize) -> String {
    let data: Vec<serde_json::Value> = chunk.iter().map(TodoRow::to_json).collect();
    let data = serde_json::Value::Array(data).to_string();
    format!(
        "目前正在處理第 {} 至 {} 筆待辦事項（共 {} 筆）。\n\
         以下為該批次資料:\n{}\n\n\
         請根據以上待辦事項，進行以下分析與建議：\n\
         \u{20}\u{20}1. 排定優先順序，確保重要且緊急的任務被優先完成；\n\
         \u{20}\u{20}2. 利用 web_surfer 搜尋最新的時間管理與工作效率提升技巧，\n\
         \u{20}\u{20}\u{20}\u{20}\u{20}並將搜尋結果整合進回覆中；\n\
         \u{20}\u{20}3. 提供最佳執行策略，幫助使用者更高效完成待辦事項。\n\
         請各代理人協同合作，提供完整且有幫助的建議。",
        range.start, range.end, total, data
    )
}
