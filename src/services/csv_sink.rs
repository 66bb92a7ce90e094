//! CSV 读写服务 - 业务能力层
//!
//! 输出文件统一使用带 BOM 的 UTF-8，方便表格软件直接打开

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, AppResult, FileError};
use crate::models::schema::fields;
use crate::models::todo::TODO_HEADERS;
use crate::models::{AnnotationResult, ConversationMessage, TodoRow};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 标注结果输出的首列表头
pub const RECORD_COLUMN: &str = "日記";

/// 标注结果写入器
///
/// 只追加：每批结果写完立即 flush，之前的批次不会因后续失败而丢失
pub struct AnnotationSink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl AnnotationSink {
    /// 创建新的输出文件（已存在则先删除）
    pub fn create(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| {
                AppError::File(FileError::DeleteFailed {
                    path: path.display().to_string(),
                    source: Box::new(e),
                })
            })?;
            debug!("已删除旧的输出文件: {}", path.display());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        file.write_all(UTF8_BOM)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        let mut sink = Self {
            writer: csv::WriterBuilder::new().flexible(false).from_writer(file),
            path,
        };
        let header: Vec<&str> = std::iter::once(RECORD_COLUMN).chain(fields()).collect();
        sink.write_row(&header)?;
        sink.flush()?;
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一批（原文, 标注结果）并落盘
    pub fn append_batch<'a>(
        &mut self,
        rows: impl IntoIterator<Item = (&'a str, &'a AnnotationResult)>,
    ) -> AppResult<usize> {
        let mut written = 0;
        for (record, result) in rows {
            let row: Vec<&str> = std::iter::once(record.trim())
                .chain(result.row())
                .collect();
            self.write_row(&row)?;
            written += 1;
        }
        self.flush()?;
        Ok(written)
    }

    fn write_row(&mut self, row: &[&str]) -> AppResult<()> {
        self.writer
            .write_record(row)
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))
    }

    fn flush(&mut self) -> AppResult<()> {
        self.writer
            .flush()
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))
    }
}

/// 一次性写出全部对话记录
pub fn write_transcript(path: impl AsRef<Path>, messages: &[ConversationMessage]) -> AppResult<()> {
    let path = path.as_ref();
    let path_str = path.display().to_string();

    let mut file = File::create(path).map_err(|e| AppError::file_write_failed(&path_str, e))?;
    file.write_all(UTF8_BOM)
        .map_err(|e| AppError::file_write_failed(&path_str, e))?;

    let mut writer = csv::Writer::from_writer(file);
    for message in messages {
        writer
            .serialize(message)
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;
    }
    // 没有任何消息时也写出表头
    if messages.is_empty() {
        writer
            .write_record([
                "batch_start",
                "batch_end",
                "source",
                "content",
                "type",
                "prompt_tokens",
                "completion_tokens",
            ])
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::file_write_failed(&path_str, e))?;

    info!("已將所有對話紀錄輸出為 {}", path_str);
    Ok(())
}

/// 确保待办事项文件存在，不存在时创建只含表头的空文件
///
/// 返回是否新建了文件
pub fn initialize_todo_list(path: impl AsRef<Path>) -> AppResult<bool> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(false);
    }
    let path_str = path.display().to_string();
    let mut file = File::create(path).map_err(|e| AppError::file_write_failed(&path_str, e))?;
    file.write_all(UTF8_BOM)
        .map_err(|e| AppError::file_write_failed(&path_str, e))?;
    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(TODO_HEADERS)
        .map_err(|e| AppError::file_write_failed(&path_str, e))?;
    writer
        .flush()
        .map_err(|e| AppError::file_write_failed(&path_str, e))?;

    info!("已建立 {}，請新增待辦事項。", path_str);
    Ok(true)
}

/// 读取待办事项文件
pub fn read_todo_rows(path: impl AsRef<Path>) -> AppResult<Vec<TodoRow>> {
    let path = path.as_ref();
    let path_str = path.display().to_string();
    if !path.exists() {
        return Err(AppError::file_not_found(path_str));
    }

    let content =
        std::fs::read_to_string(path).map_err(|e| AppError::file_read_failed(&path_str, e))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    reader
        .deserialize()
        .collect::<Result<Vec<TodoRow>, _>>()
        .map_err(|e| AppError::csv_parse_failed(path_str, e))
}

/// 读取日记文件，每行一篇（保留空行，以保证行号与结果一一对应）
pub fn read_diary_lines(path: impl AsRef<Path>) -> AppResult<Vec<String>> {
    let path = path.as_ref();
    let path_str = path.display().to_string();
    if !path.exists() {
        return Err(AppError::file_not_found(path_str));
    }
    let content =
        std::fs::read_to_string(path).map_err(|e| AppError::file_read_failed(&path_str, e))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    Ok(content.lines().map(str::to_string).collect())
}
