use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use diary_agents::clients::{DuckDuckGoSearch, ModelTransport, OpenAiTransport};
use diary_agents::config::{Config, HumanInputMode};
use diary_agents::error::AppError;
use diary_agents::orchestrator::{AnnotationPipeline, ChunkOrchestrator};
use diary_agents::services::csv_sink::read_diary_lines;
use diary_agents::services::{
    AnnotationClient, AnnotationSink, AutoReply, BatchPromptBuilder, HumanInput, StdinInput,
};
use diary_agents::utils::logging;
use diary_agents::workflow::{BatchProcessor, RosterFactory};

#[derive(Parser)]
#[command(
    name = "diary_agents",
    version,
    about = "日记批量标注与待办事项多代理协作"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 批量标注日记，结果写入 CSV
    Annotate {
        /// 日记文件路径（每行一篇），省略时在终端询问
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// 多代理轮流讨论待办事项
    Agents {
        /// 待办事项 CSV，默认使用配置中的路径
        #[arg(short, long)]
        todo: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env（不存在时忽略）
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // 加载配置
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            logging::init(false);
            error!("❌ {}", e);
            if e.is_missing_env_var() {
                error!("請檢查 .env 檔案中的 GEMINI_API_KEY。");
            }
            return Err(e.into());
        }
    };
    logging::init(config.verbose_logging);

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    match cli.command {
        Command::Annotate { input } => annotate(&config, input, &cancel).await,
        Command::Agents { todo } => agents(&config, todo, &cancel).await,
    }
}

async fn annotate(
    config: &Config,
    input: Option<PathBuf>,
    cancel: &CancellationToken,
) -> Result<()> {
    let input = match input {
        Some(path) => path,
        None => prompt_path("請輸入日記檔案路徑: ").await?,
    };
    let records = match read_diary_lines(&input) {
        Ok(records) => records,
        Err(e) => {
            error!("找不到檔案，請確認檔案路徑: {}", input.display());
            return Err(e.into());
        }
    };

    logging::log_startup("日记批量标注", &config.llm_model_name);
    let transport: Arc<dyn ModelTransport> = Arc::new(OpenAiTransport::new(config));
    let processor = BatchProcessor::new(
        AnnotationClient::new(transport),
        BatchPromptBuilder::new(config.delimiter.clone()),
    );
    let pipeline =
        AnnotationPipeline::new(processor, config.batch_size, config.pacing_delay());
    let sink = AnnotationSink::create(&config.annotation_output_file)?;

    let stats = pipeline.run(&records, sink, cancel).await?;
    logging::print_final_stats(
        if stats.cancelled { "处理已取消" } else { "全部處理完成" },
        &[
            ("日记总数", stats.total),
            ("已写入", stats.written),
            ("批次数", stats.batches),
            ("默认结果批次", stats.default_filled),
            ("补齐/截断批次", stats.realigned),
            ("全空行", stats.blank_rows),
        ],
        &config.annotation_output_file,
    );
    Ok(())
}

async fn agents(
    config: &Config,
    todo: Option<PathBuf>,
    cancel: &CancellationToken,
) -> Result<()> {
    logging::log_startup("待办事项多代理协作", &config.llm_model_name);

    let transport: Arc<dyn ModelTransport> = Arc::new(OpenAiTransport::new(config));
    let human: Arc<dyn HumanInput> = match config.human_input_mode {
        HumanInputMode::Stdin => Arc::new(StdinInput::new()),
        HumanInputMode::Auto => Arc::new(AutoReply::new(config.sentinel.clone())),
    };
    let factory = RosterFactory::new(transport, Arc::new(DuckDuckGoSearch::new()), human);
    let orchestrator = ChunkOrchestrator::new(
        factory,
        config.chunk_size,
        config.sentinel.clone(),
        config.max_turns,
    );

    let todo = todo.unwrap_or_else(|| PathBuf::from(&config.todo_file));
    let report = match orchestrator
        .run_file(&todo, &config.conversation_log_file, cancel)
        .await
    {
        Ok(report) => report,
        Err(AppError::Cancelled) => {
            warn!("⚠️ 运行已取消，未写入对话记录");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    logging::print_final_stats(
        "全部对话完成",
        &[
            ("待办事项", report.rows),
            ("块数", report.chunks.len()),
            ("失败块数", report.failed()),
            ("消息数", report.messages),
        ],
        &config.conversation_log_file,
    );
    Ok(())
}

/// 在终端询问文件路径
async fn prompt_path(prompt: &str) -> Result<PathBuf> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("读取文件路径失败")?;
    Ok(PathBuf::from(line.trim()))
}

fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("收到中断信号，正在停止...");
            cancel.cancel();
        }
    });
}
