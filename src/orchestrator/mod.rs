//! 编排层
//!
//! - `annotation_pipeline`：日记逐批标注、增量落盘
//! - `chunk_orchestrator`：待办事项分块并行协作

pub mod annotation_pipeline;
pub mod chunk_orchestrator;

pub use annotation_pipeline::{AnnotationPipeline, PipelineStats};
pub use chunk_orchestrator::{ChunkOrchestrator, ChunkStatus, OrchestrationReport};
