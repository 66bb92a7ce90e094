//! # Diary Agents
//!
//! 用 LLM 批量标注日记，以及用多个代理轮流讨论待办事项的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 持有外部连接，只暴露能力
//! - `ModelTransport` - 模型调用边界，`OpenAiTransport` 为具体实现
//! - `WebSearch` - 网络搜索边界，`DuckDuckGoSearch` 为具体实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个请求或单批数据
//! - `BatchPromptBuilder` - 组建批次提示词
//! - `AnnotationClient` - 发送一次标注请求
//! - `response_parser` - 解析单段 JSON 回复
//! - `AnnotationSink` - 增量写入 CSV
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一批日记"和"一个会话"的完整流程
//! - `BatchProcessor` - 提示词 → 调用 → 切分解析
//! - `RoundRobinSession` - 轮流发言直到终止词或最大轮数
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/annotation_pipeline` - 逐批标注、节流、进度
//! - `orchestrator/chunk_orchestrator` - 分块并行运行会话、合并记录
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{ModelTransport, OpenAiTransport, WebSearch};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AnnotationResult, ConversationMessage, TodoRow};
pub use orchestrator::{AnnotationPipeline, ChunkOrchestrator};
pub use workflow::{BatchProcessor, RoundRobinSession};
