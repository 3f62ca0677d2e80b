//! 错误定义模块

use thiserror::Error;

/// 病例工作流统一错误类型
#[derive(Error, Debug)]
pub enum CaseflowError {
    #[error("未找到登录会话: 请先登录")]
    AuthenticationMissing,

    #[error("数据网关错误: {0}")]
    Gateway(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("验证错误: {0}")]
    Validation(String),

    /// 状态已写入为 Active，但诊断未保存
    #[error("病例 {case_id} 已转为处理中，但诊断未保存: {reason}")]
    PartialSave { case_id: String, reason: String },

    #[error("无效状态转换: 从 {from} 经 {event}")]
    InvalidStateTransition { from: String, event: String },

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    Config(String),
}

impl CaseflowError {
    /// 是否为部分失败（状态已更新，诊断未写入）
    pub fn is_partial(&self) -> bool {
        matches!(self, CaseflowError::PartialSave { .. })
    }
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, CaseflowError>;
