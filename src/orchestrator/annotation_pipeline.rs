//! 日记标注流水线 - 编排层
//!
//! ## 职责
//!
//! 把全部日记切成固定大小的批次，按顺序逐批处理：
//!
//! 1. **单批处理**：委托 [`BatchProcessor`] 得到与输入等长的结果
//! 2. **增量落盘**：每批结果立即追加到输出文件并 flush
//! 3. **进度与节流**：记录进度，批次之间等待固定间隔（最后一批之后不等待）
//! 4. **可取消**：取消信号与模型调用、节流等待同时竞争，取消后停在最后一个已落盘的批次
//!
//! 批次之间严格串行，输出顺序与输入顺序一致。

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::services::AnnotationSink;
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{BatchOutcome, BatchProcessor};

/// 流水线统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    /// 日记总数
    pub total: usize,
    /// 已写入的行数
    pub written: usize,
    pub batches: usize,
    /// 因调用失败整批使用默认结果的批次数
    pub default_filled: usize,
    /// 片段数不一致而补齐或截断的批次数
    pub realigned: usize,
    /// 所有栏位都为空的行数
    pub blank_rows: usize,
    pub cancelled: bool,
}

/// 日记标注流水线
pub struct AnnotationPipeline {
    processor: BatchProcessor,
    batch_size: usize,
    pacing: Duration,
}

impl AnnotationPipeline {
    pub fn new(processor: BatchProcessor, batch_size: usize, pacing: Duration) -> Self {
        Self {
            processor,
            batch_size: batch_size.max(1),
            pacing,
        }
    }

    /// 处理全部日记，结果写入 `sink`
    ///
    /// 流水线在运行期间独占 `sink`；请求被拒绝等致命错误会中止运行，
    /// 此前的批次已经落盘。
    pub async fn run<S: AsRef<str>>(
        &self,
        records: &[S],
        mut sink: AnnotationSink,
        cancel: &CancellationToken,
    ) -> AppResult<PipelineStats> {
        let total = records.len();
        let total_batches = total.div_ceil(self.batch_size);
        let mut stats = PipelineStats {
            total,
            ..Default::default()
        };

        for (batch_index, batch) in records.chunks(self.batch_size).enumerate() {
            let start = batch_index * self.batch_size;
            let end = start + batch.len();

            if cancel.is_cancelled() {
                stats.cancelled = true;
                break;
            }
            log_batch_start(batch_index + 1, total_batches, start + 1, end, total);

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                outcome = self.processor.process(batch) => Some(outcome),
            };
            let Some(outcome) = outcome else {
                warn!("⚠️ 已取消，第 {}-{} 篇未写入", start + 1, end);
                stats.cancelled = true;
                break;
            };
            let batch_result = outcome?;

            stats.written += sink.append_batch(
                batch
                    .iter()
                    .map(AsRef::as_ref)
                    .zip(batch_result.results.iter()),
            )?;
            stats.batches += 1;
            stats.blank_rows += batch_result.results.iter().filter(|r| r.is_blank()).count();
            match batch_result.outcome {
                BatchOutcome::Annotated => {}
                BatchOutcome::DefaultFilled => stats.default_filled += 1,
                BatchOutcome::Realigned { .. } => stats.realigned += 1,
            }
            log_batch_complete(end, total);

            if end < total && !self.pacing.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        stats.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.pacing) => {}
                }
            }
        }

        if stats.cancelled {
            warn!("⚠️ 处理被取消，已写入 {}/{} 篇", stats.written, total);
        } else {
            info!("✅ 全部 {} 篇日记处理完成", total);
        }
        Ok(stats)
    }
}
