//! 手术排期请求

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use inpatient_core::{
    AsaScore, InpatientError, PreopChecklist, ProductRef, Result, StaffRef, Surgery, SurgeryStatus,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 手术排期请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurgeryRequest {
    pub name: Option<String>,
    pub admission_id: Option<Uuid>,
    pub planned_date: Option<NaiveDateTime>,
    pub doctor: Option<StaffRef>,
    pub theater_id: Option<Uuid>,
    #[serde(default)]
    pub hours_to_take: f64,
    pub asa_score: Option<AsaScore>,
    pub fasting_hours: Option<u32>,
    pub anesthesia_risks: Option<String>,
    pub anesthetist: Option<StaffRef>,
    pub surgery_product: Option<ProductRef>,
    pub procedure_code: Option<String>,
}

impl SurgeryRequest {
    /// 校验必填字段，生成草稿状态的手术记录
    pub fn into_surgery(self, today: NaiveDate, now: DateTime<Utc>) -> Result<Surgery> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(InpatientError::MissingField("name"))?;
        let admission_id = self.admission_id.ok_or(InpatientError::MissingField("admission"))?;
        let planned_date = self.planned_date.ok_or(InpatientError::MissingField("planned_date"))?;
        let doctor = self.doctor.ok_or(InpatientError::MissingField("doctor"))?;

        Ok(Surgery {
            id: Uuid::new_v4(),
            name,
            admission_id,
            date: Some(today),
            planned_date,
            doctor,
            theater_id: self.theater_id,
            hours_to_take: self.hours_to_take,
            asa_score: self.asa_score,
            fasting_hours: self.fasting_hours,
            anesthesia_risks: self.anesthesia_risks,
            checklist: PreopChecklist::default(),
            anesthetist: self.anesthetist,
            anesthesia_sheet: None,
            protocol: None,
            team: Vec::new(),
            consumables: Vec::new(),
            sspi_score: None,
            postop_note: None,
            surgery_product: self.surgery_product,
            procedure_code: self.procedure_code,
            status: SurgeryStatus::Draft,
            created_at: now,
            updated_at: now,
        })
    }
}

/// 术中及术后记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperativeNotes {
    pub anesthesia_sheet: Option<String>,
    pub protocol: Option<String>,
    pub sspi_score: Option<String>,
    pub postop_note: Option<String>,
}

impl OperativeNotes {
    /// 只覆盖提供了的字段
    pub fn apply_to(self, surgery: &mut Surgery) {
        if self.anesthesia_sheet.is_some() {
            surgery.anesthesia_sheet = self.anesthesia_sheet;
        }
        if self.protocol.is_some() {
            surgery.protocol = self.protocol;
        }
        if self.sspi_score.is_some() {
            surgery.sspi_score = self.sspi_score;
        }
        if self.postop_note.is_some() {
            surgery.postop_note = self.postop_note;
        }
    }
}
