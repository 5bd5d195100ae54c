//! 住院登记请求与处方打印数据

use chrono::{DateTime, NaiveDate, Utc};
use inpatient_core::{
    Admission, AdmissionStatus, AdmissionType, BedType, InpatientError, PatientRef, Placement, Result,
    StaffRef,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 住院登记请求
///
/// 来自前台登记表单，必填项以 `Option` 形式到达，校验后才生成记录。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmissionRequest {
    pub code: Option<String>,
    pub patient: Option<PatientRef>,
    pub reason: Option<String>,
    pub admission_type: Option<AdmissionType>,
    pub attending_doctor: Option<StaffRef>,
    pub operating_doctor: Option<StaffRef>,
    #[serde(default)]
    pub placement: Placement,
    pub bed_type: Option<BedType>,
    pub hosp_date: Option<NaiveDate>,
    pub condition: Option<String>,
    pub notes: Option<String>,
}

/// 未分配序列号的占位值
pub const NEW_CODE: &str = "New";

impl AdmissionRequest {
    /// 序列号需要由生成器分配
    pub fn needs_code(&self) -> bool {
        match self.code.as_deref() {
            None => true,
            Some(code) => code.is_empty() || code == NEW_CODE,
        }
    }

    /// 校验必填字段并生成草稿状态的住院记录
    pub fn into_admission(self, code: String, today: NaiveDate, now: DateTime<Utc>) -> Result<Admission> {
        let patient = self.patient.ok_or(InpatientError::MissingField("patient"))?;
        let admission_type = self.admission_type.ok_or(InpatientError::MissingField("admission_type"))?;
        let attending_doctor = self
            .attending_doctor
            .ok_or(InpatientError::MissingField("attending_doctor"))?;

        Ok(Admission {
            id: Uuid::new_v4(),
            code,
            patient,
            reason: self.reason,
            admission_type,
            attending_doctor,
            operating_doctor: self.operating_doctor,
            placement: self.placement,
            bed_type: self.bed_type,
            hosp_date: Some(self.hosp_date.unwrap_or(today)),
            discharge_date: None,
            condition: self.condition,
            discharge_plan: None,
            notes: self.notes,
            status: AdmissionStatus::Draft,
            active: true,
            is_invoice: false,
            invoice_id: None,
            enable_outpatient: false,
            payments: Vec::new(),
            lab_tests: Vec::new(),
            prescriptions: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// 登记结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegistrationOutcome {
    Created { admission: Box<Admission> },
    /// 患者已有在院记录，未写入任何数据
    AlreadyAdmitted { existing_code: String },
}

impl RegistrationOutcome {
    pub fn message(&self) -> String {
        match self {
            RegistrationOutcome::Created { admission } => format!("Admission {} created", admission.code),
            RegistrationOutcome::AlreadyAdmitted { .. } => "Patient already exists".to_string(),
        }
    }

    pub fn admission(&self) -> Option<&Admission> {
        match self {
            RegistrationOutcome::Created { admission } => Some(admission.as_ref()),
            RegistrationOutcome::AlreadyAdmitted { .. } => None,
        }
    }
}

/// 处方打印行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionPrintLine {
    pub medicine: String,
    pub intakes: u32,
    pub time: String,
    pub quantity: Decimal,
    pub note: String,
}

/// 处方打印数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionPrint {
    pub lines: Vec<PrescriptionPrintLine>,
    pub date: NaiveDate,
    pub patient_name: String,
    pub doctor_name: String,
}

/// 首字母大写，其余小写
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => {
            let rest = chars.as_str().to_lowercase();
            first.to_uppercase().chain(rest.chars()).collect()
        }
        None => String::new(),
    }
}

impl PrescriptionPrint {
    /// 无处方时返回 `None`
    pub fn from_admission(admission: &Admission, today: NaiveDate) -> Option<Self> {
        if admission.prescriptions.is_empty() {
            return None;
        }

        let lines = admission
            .prescriptions
            .iter()
            .map(|p| PrescriptionPrintLine {
                medicine: p.medicine.name.clone(),
                intakes: p.intakes,
                time: capitalize(p.time.as_deref().unwrap_or_default()),
                quantity: p.quantity,
                note: capitalize(p.note.as_deref().unwrap_or_default()),
            })
            .collect();

        Some(Self {
            lines,
            date: today,
            patient_name: admission.patient.name.clone(),
            doctor_name: admission.attending_doctor.name.clone(),
        })
    }
}
