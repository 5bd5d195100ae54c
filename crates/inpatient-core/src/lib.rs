//! # Inpatient Core
//!
//! 住院管理系统的核心模块，提供基础数据结构、错误定义、外部协作接口和通用工具。

pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{InpatientError, Result};
pub use models::*;
pub use services::{BillingLedger, Clock, FixedClock, SequenceGenerator, SystemClock, SystemScope};
