/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`；否则默认 `info`，`verbose` 时为 `debug`
///
/// # 参数
/// - `verbose`: 是否显示详细日志
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `mode`: 运行模式名称
/// - `model`: 模型名称
pub fn log_startup(mode: &str, model: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", mode);
    info!("🤖 模型: {}", model);
    info!(
        "🕒 启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始日记编号
/// - `end`: 结束日记编号
/// - `total`: 日记总数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批日记: {}-{} / 共 {} 篇", start, end, total);
}

/// 记录批次完成信息
///
/// # 参数
/// - `processed`: 已处理的日记数
/// - `total`: 日记总数
pub fn log_batch_complete(processed: usize, total: usize) {
    info!("已處理 {} 筆 / {}", processed, total);
}

/// 记录待办事项分块信息
///
/// # 参数
/// - `rows`: 待办事项总数
/// - `chunks`: 块数
/// - `chunk_size`: 每块最多行数
pub fn log_chunks_loaded(rows: usize, chunks: usize, chunk_size: usize) {
    info!("✓ 找到 {} 筆待辦事項", rows);
    info!("📋 分為 {} 塊並行處理（每塊最多 {} 筆）", chunks, chunk_size);
}

/// 打印最终统计信息
///
/// # 参数
/// - `title`: 统计标题
/// - `lines`: （名称, 数值）列表
/// - `output_path`: 结果文件路径
pub fn print_final_stats(title: &str, lines: &[(&str, usize)], output_path: &str) {
    info!("{}", "=".repeat(60));
    info!("📊 {}", title);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    for (label, value) in lines {
        info!("{}: {}", label, value);
    }
    info!("{}", "=".repeat(60));
    info!("最终结果已写入：{}", output_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原文
/// - `max_len`: 最多保留的字符数
///
/// # 返回
/// 超长时返回截断后加 `...` 的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
