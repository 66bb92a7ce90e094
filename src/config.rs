use crate::error::{AppError, AppResult, ConfigError, FileError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 配置文件路径的环境变量
pub const CONFIG_FILE_ENV: &str = "DIARY_AGENTS_CONFIG";
/// 默认配置文件路径
pub const DEFAULT_CONFIG_FILE: &str = "diary_agents.toml";
/// 凭证环境变量
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// 人工代理的输入方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HumanInputMode {
    /// 从终端读取
    Stdin,
    /// 自动回复终止词
    Auto,
}

impl std::str::FromStr for HumanInputMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdin" => Ok(Self::Stdin),
            "auto" => Ok(Self::Auto),
            _ => Err(()),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单次模型调用超时（秒）
    pub request_timeout_secs: u64,
    // --- 日记标注 ---
    /// 每批日记条数
    pub batch_size: usize,
    /// 两批之间的间隔（毫秒）
    pub pacing_delay_ms: u64,
    /// 批次分隔线
    pub delimiter: String,
    /// 标注结果输出文件
    pub annotation_output_file: String,
    // --- 多代理对话 ---
    /// 每块待办事项行数
    pub chunk_size: usize,
    /// 终止词
    pub sentinel: String,
    /// 每个会话最多轮数
    pub max_turns: usize,
    pub human_input_mode: HumanInputMode,
    /// 待办事项文件
    pub todo_file: String,
    /// 对话记录输出文件
    pub conversation_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai/"
                .to_string(),
            llm_model_name: "gemini-2.0-flash".to_string(),
            request_timeout_secs: 120,
            batch_size: 5,
            pacing_delay_ms: 1000,
            delimiter: "-----".to_string(),
            annotation_output_file: "processed_diary.csv".to_string(),
            chunk_size: 1000,
            sentinel: "exit".to_string(),
            max_turns: 12,
            human_input_mode: HumanInputMode::Stdin,
            todo_file: "todo_list.csv".to_string(),
            conversation_log_file: "all_conversation_log.csv".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件（可选）→ 环境变量
    pub fn load() -> AppResult<Self> {
        let path = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        let base = if Path::new(&path).exists() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };
        let config = base.overlay_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置，缺省项使用默认值
    pub fn from_toml_file(path: &str) -> AppResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| AppError::file_read_failed(path, e))?;
        toml::from_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.to_string(),
                source: Box::new(e),
            })
        })
    }

    /// 用环境变量覆盖配置
    ///
    /// `lookup` 便于在测试中替换真实环境
    pub fn overlay_env(self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let c = self;
        Ok(Self {
            llm_api_key: lookup(API_KEY_ENV).unwrap_or(c.llm_api_key),
            llm_api_base_url: lookup("LLM_API_BASE_URL").unwrap_or(c.llm_api_base_url),
            llm_model_name: lookup("LLM_MODEL_NAME").unwrap_or(c.llm_model_name),
            request_timeout_secs: parse_var(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                c.request_timeout_secs,
            )?,
            batch_size: parse_var(&lookup, "BATCH_SIZE", c.batch_size)?,
            pacing_delay_ms: parse_var(&lookup, "PACING_DELAY_MS", c.pacing_delay_ms)?,
            delimiter: lookup("BATCH_DELIMITER").unwrap_or(c.delimiter),
            annotation_output_file: lookup("ANNOTATION_OUTPUT_FILE")
                .unwrap_or(c.annotation_output_file),
            chunk_size: parse_var(&lookup, "CHUNK_SIZE", c.chunk_size)?,
            sentinel: lookup("SENTINEL").unwrap_or(c.sentinel),
            max_turns: parse_var(&lookup, "MAX_TURNS", c.max_turns)?,
            human_input_mode: parse_var(&lookup, "HUMAN_INPUT_MODE", c.human_input_mode)?,
            todo_file: lookup("TODO_FILE").unwrap_or(c.todo_file),
            conversation_log_file: lookup("CONVERSATION_LOG_FILE")
                .unwrap_or(c.conversation_log_file),
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING", c.verbose_logging)?,
        })
    }

    /// 检查配置，缺少凭证时直接失败
    pub fn validate(&self) -> AppResult<()> {
        if self.llm_api_key.trim().is_empty() {
            return Err(AppError::env_var_not_found(API_KEY_ENV));
        }
        for (key, value) in [
            ("batch_size", self.batch_size),
            ("chunk_size", self.chunk_size),
            ("max_turns", self.max_turns),
        ] {
            if value == 0 {
                return Err(invalid(key, "必须大于 0"));
            }
        }
        if self.delimiter.trim().is_empty() {
            return Err(invalid("delimiter", "不能为空"));
        }
        if self.sentinel.is_empty() {
            return Err(invalid("sentinel", "不能为空"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
    default: T,
) -> AppResult<T> {
    match lookup(var_name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| {
            AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                expected_type: std::any::type_name::<T>()
                    .rsplit("::")
                    .next()
                    .unwrap_or_default()
                    .to_string(),
                value,
            })
        }),
    }
}

fn invalid(key: &str, reason: &str) -> AppError {
    AppError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    })
}
