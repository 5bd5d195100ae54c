//! # 住院工作流模块
//!
//! 提供住院管理的业务流程，包括：
//! - 住院状态机：登记、预留、入院、开票、出院的生命周期及床位/病房副作用
//! - 账单汇总：将住院费、收费、化验、处方、手术和草稿发票合并为一张发票
//! - 手术管理：排期、术前核查、团队与耗材、术后记录
//! - 看板查询：住院检索、在院列表和医生看板

pub mod admission;
pub mod billing;
pub mod dashboard;
pub mod engine;
pub mod state_machine;
pub mod surgery;

// 重新导出主要类型
pub use admission::{AdmissionRequest, PrescriptionPrint, PrescriptionPrintLine, RegistrationOutcome, NEW_CODE};
pub use billing::{assemble_invoice_lines, drafts_to_cancel, InvoiceInput, InvoiceSummary};
pub use dashboard::{Caller, DoctorDashboard, InpatientListRow, InpatientRow, InpatientSearch, SurgerySlot};
pub use engine::{AvailablePlacements, InpatientEngine, WorkflowSettings};
pub use state_machine::{AdmissionEvent, AdmissionStateMachine, SurgeryEvent, SurgeryStateMachine};
pub use surgery::{OperativeNotes, SurgeryRequest};
