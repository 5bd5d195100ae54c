//! 错误定义模块

use thiserror::Error;

/// 住院管理统一错误类型
#[derive(Error, Debug)]
pub enum InpatientError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("缺少必填字段: {0}")]
    MissingField(&'static str),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("账务错误: {0}")]
    Billing(String),

    #[error("住院记录 {0} 已开具发票")]
    AlreadyInvoiced(String),
}

/// 住院管理统一结果类型
pub type Result<T> = std::result::Result<T, InpatientError>;
