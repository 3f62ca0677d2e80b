//! 配置管理
//!
//! 默认值、可选配置文件与 `CASEFLOW_` 前缀环境变量三层合并，
//! 嵌套字段用 `__` 分隔，例如 `CASEFLOW_WORKLIST__PAGE_SIZE=20`

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaseflowConfig {
    /// 工作列表配置
    pub worklist: WorklistConfig,
    /// 本地草稿配置
    pub drafts: DraftsConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 工作列表配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorklistConfig {
    /// 每页病例数
    pub page_size: usize,
    /// 页码按钮窗口宽度
    pub page_window: usize,
    /// 默认时间窗口: hour/day/week/month/year
    pub default_timeframe: String,
    /// 默认排序: newest/oldest/status/priority
    pub default_sort: String,
}

/// 草稿存储后端
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DraftBackend {
    #[default]
    Memory,
    File,
}

/// 本地草稿配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DraftsConfig {
    pub backend: DraftBackend,
    /// file 后端的草稿目录
    pub directory: Option<PathBuf>,
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Pretty,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别或 EnvFilter 指令
    pub level: String,
    pub format: LogFormat,
}

impl CaseflowConfig {
    /// 加载并验证配置，`path` 为空时只使用默认值和环境变量
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("CASEFLOW")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: CaseflowConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        ConfigValidator::new().validate(&config)?;

        match path {
            Some(path) => info!("Configuration loaded from: {}", path.display()),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 渲染为 TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    validator: fn(&CaseflowConfig) -> Result<()>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "worklist.page_size",
                validator: |config| {
                    if config.worklist.page_size == 0 {
                        Err(anyhow::anyhow!("page size cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "worklist.page_window",
                validator: |config| {
                    if config.worklist.page_window == 0 {
                        Err(anyhow::anyhow!("page window cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "drafts.directory",
                validator: |config| match (config.drafts.backend, &config.drafts.directory) {
                    (DraftBackend::File, None) => {
                        Err(anyhow::anyhow!("file draft backend requires a directory"))
                    }
                    _ => Ok(()),
                },
            },
            ValidationRule {
                field_path: "logging.level",
                validator: |config| {
                    EnvFilter::try_new(&config.logging.level)
                        .map(|_| ())
                        .map_err(|e| anyhow::anyhow!("invalid log level {:?}: {}", config.logging.level, e))
                },
            },
        ];

        Self { validation_rules }
    }

    pub fn validate(&self, config: &CaseflowConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(e.context(format!("Invalid configuration value: {}", rule.field_path)));
            }
        }
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for WorklistConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            page_window: 5,
            default_timeframe: "week".to_string(),
            default_sort: "newest".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
        }
    }
}
