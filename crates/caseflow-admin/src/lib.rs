//! # Caseflow 管理模块
//!
//! 配置加载与验证、日志订阅者初始化

pub mod config;
pub mod logging;

pub use config::{CaseflowConfig, ConfigValidator, DraftBackend, DraftsConfig, LogFormat, LoggingConfig, WorklistConfig};
pub use logging::init_tracing;
