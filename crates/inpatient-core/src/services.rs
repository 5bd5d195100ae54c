//! 外部协作接口
//!
//! 账务服务、序列号生成器、时钟以及系统权限令牌

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{BillingDocument, DraftLine, NewBillingDocument};

/// 系统权限令牌
///
/// 床位/病房状态写入和草稿账单作废都以系统身份执行，
/// 调用方必须显式持有该令牌。
#[derive(Debug, Clone, Copy)]
pub struct SystemScope {
    reason: &'static str,
}

impl SystemScope {
    /// 以系统身份执行，`reason` 写入审计日志
    ///
    /// 只在工作流引擎的状态迁移和草稿作废处构造；普通记录更新不需要。
    pub fn elevate(reason: &'static str) -> Self {
        tracing::debug!("Elevated to system scope: {}", reason);
        Self { reason }
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

/// 账务服务
pub trait BillingLedger {
    /// 创建一张客户发票，返回账单ID
    fn create_document(&mut self, document: NewBillingDocument) -> Result<Uuid>;

    /// 查找该患者可合并的草稿账单行
    ///
    /// 仅包含客户发票类型、无税组、无到期日的行。
    fn draft_lines_for_patient(&self, patient_id: Uuid) -> Vec<DraftLine>;

    /// 作废账单
    fn cancel_document(&mut self, scope: &SystemScope, document_id: Uuid) -> Result<()>;

    /// 按住院序列号查找账单
    fn documents_by_reference(&self, reference: &str) -> Vec<&BillingDocument>;
}

/// 序列号生成器
pub trait SequenceGenerator {
    fn next_code(&mut self) -> String;
}

/// 时钟
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// 系统本地时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// 固定日期时钟，用于测试和回放
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
