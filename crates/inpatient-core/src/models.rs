//! 核心数据模型定义

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::{admit_days, rent_amount};

/// 患者引用
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRef {
    pub id: Uuid,
    pub name: String,
}

/// 医护人员引用
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffRef {
    pub id: Uuid,
    pub name: String,
    pub user_id: Option<Uuid>, // 关联的登录用户
}

/// 产品引用（药品、手术项目、耗材）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRef {
    pub id: Uuid,
    pub name: String,
    pub list_price: Decimal,
}

/// 住院状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    Draft,      // 草稿
    Reserved,   // 已预留
    Admitted,   // 已入院
    Invoiced,   // 已开票
    Discharged, // 已出院
}

impl AdmissionStatus {
    /// 状态键，用于文本检索
    pub fn key(&self) -> &'static str {
        match self {
            AdmissionStatus::Draft => "draft",
            AdmissionStatus::Reserved => "reserve",
            AdmissionStatus::Admitted => "admit",
            AdmissionStatus::Invoiced => "invoice",
            AdmissionStatus::Discharged => "dis",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdmissionStatus::Draft => "Draft",
            AdmissionStatus::Reserved => "Reserved",
            AdmissionStatus::Admitted => "Admitted",
            AdmissionStatus::Invoiced => "Invoiced",
            AdmissionStatus::Discharged => "Discharged",
        }
    }
}

/// 入院类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionType {
    Emergency, // 急诊入院
    Routine,   // 常规入院
}

impl AdmissionType {
    pub fn label(&self) -> &'static str {
        match self {
            AdmissionType::Emergency => "Emergency Admission",
            AdmissionType::Routine => "Routine Admission",
        }
    }
}

/// 床位类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BedType {
    Gatch,
    Electric,
    Stretcher,
    Low,
    Air,
    Circo,
    Clinitron,
}

/// 床位/病房分配，最多二选一
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Placement {
    #[default]
    Unassigned,
    Bed(Uuid),
    Room(Uuid),
}

impl Placement {
    pub fn bed_id(&self) -> Option<Uuid> {
        match self {
            Placement::Bed(id) => Some(*id),
            _ => None,
        }
    }

    pub fn room_id(&self) -> Option<Uuid> {
        match self {
            Placement::Room(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        !matches!(self, Placement::Unassigned)
    }
}

/// 床位状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    Available,    // 可用
    NotAvailable, // 不可用
}

/// 病房状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,    // 可用
    Reserved,     // 已预留
    NotAvailable, // 不可用
}

/// 手术室状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TheaterStatus {
    Waiting,
    Preparation,
    InProgress,
    Cleaning,
    Available,
}

/// 病区
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ward {
    pub id: Uuid,
    pub ward_no: String,
}

/// 楼栋
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Building {
    pub id: Uuid,
    pub name: String,
}

/// 床位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bed {
    pub id: Uuid,
    pub name: String,
    pub ward: Option<Ward>,
    pub bed_type: Option<BedType>,
    pub daily_rent: Decimal,
    pub status: BedStatus,
}

/// 病房
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub building: Option<Building>,
    pub bed_type: Option<BedType>,
    pub daily_rent: Decimal,
    pub status: RoomStatus,
}

/// 手术室
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationTheater {
    pub id: Uuid,
    pub name: String,
    pub building: Option<Building>,
    pub ward: Option<Ward>,
    pub capacity: u32, // 可同时进行的手术数
    pub status: TheaterStatus,
    pub active: bool,
}

/// 临时收费项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLine {
    pub name: String,
    pub subtotal: Decimal,
    pub tax_ids: Vec<String>,
}

/// 化验项目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabTest {
    pub id: Uuid,
    pub name: String,
    pub total_price: Decimal,
    pub invoice_id: Option<Uuid>, // 已单独开票时有值
}

/// 处方行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionLine {
    pub medicine: ProductRef,
    pub quantity: Decimal,
    pub intakes: u32,
    pub time: Option<String>,
    pub note: Option<String>,
}

/// 住院记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admission {
    pub id: Uuid,
    pub code: String, // 住院序列号
    pub patient: PatientRef,
    pub reason: Option<String>,
    pub admission_type: AdmissionType,
    pub attending_doctor: StaffRef,
    pub operating_doctor: Option<StaffRef>,
    pub placement: Placement,
    pub bed_type: Option<BedType>,
    pub hosp_date: Option<NaiveDate>,
    pub discharge_date: Option<NaiveDate>,
    pub condition: Option<String>,
    pub discharge_plan: Option<String>,
    pub notes: Option<String>,
    pub status: AdmissionStatus,
    pub active: bool,
    pub is_invoice: bool,
    pub invoice_id: Option<Uuid>,
    pub enable_outpatient: bool,
    pub payments: Vec<PaymentLine>,
    pub lab_tests: Vec<LabTest>,
    pub prescriptions: Vec<PrescriptionLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Admission {
    /// 住院天数（含首尾两天），未出院时计算到 `today`
    pub fn admit_days(&self, today: NaiveDate) -> i64 {
        admit_days(self.hosp_date, self.discharge_date, today)
    }

    /// 按分配的床位或病房计算住院费用
    pub fn rent(&self, rates: PlacementRate, today: NaiveDate) -> RentBreakdown {
        RentBreakdown::compute(self, rates, today)
    }
}

/// 分配资源的日租金
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlacementRate {
    pub bed: Option<Decimal>,
    pub room: Option<Decimal>,
}

/// 住院费用明细
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RentBreakdown {
    pub admit_days: i64,
    pub daily_rate: Decimal,
    pub bed_rent_amount: Decimal,
    pub room_rent_amount: Decimal,
}

impl RentBreakdown {
    /// 纯函数：仅依赖入院日期、出院日期和分配资源
    pub fn compute(admission: &Admission, rates: PlacementRate, today: NaiveDate) -> Self {
        let days = admission.admit_days(today);
        let bed_rate = admission.placement.bed_id().and(rates.bed);
        let room_rate = admission.placement.room_id().and(rates.room);

        Self {
            admit_days: days,
            daily_rate: bed_rate.or(room_rate).unwrap_or(Decimal::ZERO),
            bed_rent_amount: bed_rate.map(|r| rent_amount(days, r)).unwrap_or(Decimal::ZERO),
            room_rent_amount: room_rate.map(|r| rent_amount(days, r)).unwrap_or(Decimal::ZERO),
        }
    }

    pub fn total(&self) -> Decimal {
        self.bed_rent_amount + self.room_rent_amount
    }
}

/// 手术状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SurgeryStatus {
    Draft,     // 草稿
    Confirmed, // 已确认
    Done,      // 已完成
    Cancelled, // 已取消
}

impl SurgeryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SurgeryStatus::Draft => "Draft",
            SurgeryStatus::Confirmed => "Confirmed",
            SurgeryStatus::Done => "Done",
            SurgeryStatus::Cancelled => "Cancel",
        }
    }
}

/// ASA麻醉分级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AsaScore {
    I,
    II,
    III,
    IV,
    V,
}

/// 术前核查项
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistItem {
    Identity, // 身份核对
    Site,     // 手术部位确认
    Allergy,  // 过敏史核查
    Consent,  // 知情同意书
}

/// 术前安全核查表
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreopChecklist {
    pub identity_ok: bool,
    pub site_ok: bool,
    pub allergy_ok: bool,
    pub consent_ok: bool,
}

impl PreopChecklist {
    pub fn set(&mut self, item: ChecklistItem, value: bool) {
        match item {
            ChecklistItem::Identity => self.identity_ok = value,
            ChecklistItem::Site => self.site_ok = value,
            ChecklistItem::Allergy => self.allergy_ok = value,
            ChecklistItem::Consent => self.consent_ok = value,
        }
    }

    pub fn get(&self, item: ChecklistItem) -> bool {
        match item {
            ChecklistItem::Identity => self.identity_ok,
            ChecklistItem::Site => self.site_ok,
            ChecklistItem::Allergy => self.allergy_ok,
            ChecklistItem::Consent => self.consent_ok,
        }
    }

    /// 四项全部通过
    pub fn is_complete(&self) -> bool {
        self.identity_ok && self.site_ok && self.allergy_ok && self.consent_ok
    }
}

/// 手术团队角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Surgeon,
    Assistant,
    Anesthetist,
    Iade,  // 麻醉护士
    Ibode, // 手术室护士
    Porter,
}

/// 手术团队成员
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub employee: StaffRef,
    pub role: TeamRole,
}

/// 手术耗材
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consumable {
    pub product: ProductRef,
    pub quantity: Decimal,
    pub lot: Option<String>,
    pub is_implant: bool,
}

/// 手术记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Surgery {
    pub id: Uuid,
    pub name: String,
    pub admission_id: Uuid,
    pub date: Option<NaiveDate>,
    pub planned_date: NaiveDateTime,
    pub doctor: StaffRef,
    pub theater_id: Option<Uuid>,
    pub hours_to_take: f64,
    pub asa_score: Option<AsaScore>,
    pub fasting_hours: Option<u32>,
    pub anesthesia_risks: Option<String>,
    pub checklist: PreopChecklist,
    pub anesthetist: Option<StaffRef>,
    pub anesthesia_sheet: Option<String>,
    pub protocol: Option<String>,
    pub team: Vec<TeamMember>,
    pub consumables: Vec<Consumable>,
    pub sspi_score: Option<String>,
    pub postop_note: Option<String>,
    pub surgery_product: Option<ProductRef>, // 计费用的手术项目
    pub procedure_code: Option<String>,
    pub status: SurgeryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Surgery {
    pub fn checklist_complete(&self) -> bool {
        self.checklist.is_complete()
    }
}

/// 账单类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    CustomerInvoice,
    CustomerRefund,
    VendorBill,
}

/// 账单状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Posted,
    Cancelled,
}

/// 账单行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceLine {
    pub description: String,
    pub product_id: Option<Uuid>,
    pub unit_price: Decimal,
    pub quantity: Decimal,
    pub tax_ids: Vec<String>,
    pub tax_group: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl InvoiceLine {
    pub fn new(description: impl Into<String>, unit_price: Decimal, quantity: Decimal) -> Self {
        Self {
            description: description.into(),
            product_id: None,
            unit_price,
            quantity,
            tax_ids: Vec::new(),
            tax_group: None,
            due_date: None,
        }
    }

    pub fn with_product(mut self, product_id: Uuid) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_taxes(mut self, tax_ids: Vec<String>) -> Self {
        self.tax_ids = tax_ids;
        self
    }

    pub fn subtotal(&self) -> Decimal {
        self.unit_price * self.quantity
    }
}

/// 账单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingDocument {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub status: DocumentStatus,
    pub patient_id: Uuid,
    pub reference: Option<String>, // 住院序列号
    pub date: NaiveDate,
    pub invoice_date: Option<NaiveDate>,
    pub currency: String,
    pub lines: Vec<InvoiceLine>,
}

impl BillingDocument {
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(InvoiceLine::subtotal).sum()
    }
}

/// 新建账单请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBillingDocument {
    pub patient_id: Uuid,
    pub reference: String,
    pub date: NaiveDate,
    pub lines: Vec<InvoiceLine>,
}

/// 草稿账单中的可合并行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftLine {
    pub document_id: Uuid,
    pub line: InvoiceLine,
}
