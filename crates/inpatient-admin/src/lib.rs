//! # 住院管理运维模块
//!
//! 提供配置管理和日志初始化

pub mod config;
pub mod logging;

pub use config::{
    BillingConfig, ConfigManager, ConfigValidator, InpatientConfig, LoggingConfig, SequenceConfig, StoreConfig,
    ENV_PREFIX,
};
pub use logging::{init_logging, LogFormat};
