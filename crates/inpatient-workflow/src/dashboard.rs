//! 看板查询
//!
//! 只读投影，不修改任何记录

use chrono::{NaiveDate, NaiveDateTime};
use inpatient_core::utils::ilike;
use inpatient_core::{Admission, AdmissionStatus, Surgery};
use inpatient_store::WardStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 当前调用者
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: Uuid,
    pub employee_id: Option<Uuid>, // 对应的医护人员
}

/// 住院检索过滤器
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InpatientSearch {
    pub text: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
}

/// 住院检索结果行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InpatientRow {
    pub id: Uuid,
    pub code: String,
    pub patient_name: String,
    pub ward_no: Option<String>,
    pub bed_name: Option<String>,
    pub building: Option<String>, // 病房所在楼栋
    pub hosp_date: Option<NaiveDate>,
    pub discharge_date: Option<NaiveDate>,
    pub admission_type: String,
    pub attending_doctor: String,
    pub status: AdmissionStatus,
}

/// 医生看板中的住院列表行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InpatientListRow {
    pub id: Uuid,
    pub code: String,
    pub patient_name: String,
    pub bed_name: Option<String>,
    pub ward_no: Option<String>,
    pub room_name: Option<String>,
    pub building: Option<String>,
    pub hosp_date: Option<NaiveDate>,
    pub attending_doctor: String,
    pub admission_type: String,
    pub discharge_date: Option<NaiveDate>,
}

/// 医生手术排期行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurgerySlot {
    pub id: Uuid,
    pub planned_date: NaiveDateTime,
    pub patient_name: Option<String>,
    pub surgery_name: String,
    pub state: String,
}

fn matches_text(admission: &Admission, needle: &str) -> bool {
    ilike(&admission.code, needle)
        || ilike(&admission.patient.name, needle)
        || admission.hosp_date.is_some_and(|d| ilike(&d.to_string(), needle))
        || admission.discharge_date.is_some_and(|d| ilike(&d.to_string(), needle))
        || ilike(admission.status.key(), needle)
}

fn building_name(store: &WardStore, admission: &Admission) -> Option<String> {
    store.resources().building_of(admission.placement).map(|b| b.name.clone())
}

/// 按文本检索住院记录
///
/// 匹配序列号、患者姓名、入院/出院日期和状态；过滤文本为空时返回全部。
/// 默认不包含已出院归档的记录。
pub fn search_inpatients(store: &WardStore, search: &InpatientSearch) -> Vec<InpatientRow> {
    let needle = search.text.as_deref().map(str::trim).filter(|t| !t.is_empty());

    store
        .admissions()
        .into_iter()
        .filter(|a| search.include_archived || a.active)
        .filter(|a| needle.map_or(true, |n| matches_text(a, n)))
        .map(|a| {
            let bed = a.placement.bed_id().and_then(|id| store.resources().bed(id));
            InpatientRow {
                id: a.id,
                code: a.code.clone(),
                patient_name: a.patient.name.clone(),
                ward_no: store.resources().ward_of(a.placement).map(|w| w.ward_no.clone()),
                bed_name: bed.map(|b| b.name.clone()),
                building: building_name(store, a),
                hosp_date: a.hosp_date,
                discharge_date: a.discharge_date,
                admission_type: a.admission_type.label().to_string(),
                attending_doctor: a.attending_doctor.name.clone(),
                status: a.status,
            }
        })
        .collect()
}

/// 在院患者列表
pub fn inpatient_list(store: &WardStore) -> Vec<InpatientListRow> {
    store
        .admissions()
        .into_iter()
        .filter(|a| a.active)
        .map(|a| InpatientListRow {
            id: a.id,
            code: a.code.clone(),
            patient_name: a.patient.name.clone(),
            bed_name: a
                .placement
                .bed_id()
                .and_then(|id| store.resources().bed(id))
                .map(|b| b.name.clone()),
            ward_no: store.resources().ward_of(a.placement).map(|w| w.ward_no.clone()),
            room_name: a
                .placement
                .room_id()
                .and_then(|id| store.resources().room(id))
                .map(|r| r.name.clone()),
            building: building_name(store, a),
            hosp_date: a.hosp_date,
            attending_doctor: a.attending_doctor.name.clone(),
            admission_type: a.admission_type.label().to_string(),
            discharge_date: a.discharge_date,
        })
        .collect()
}

fn surgery_slot(store: &WardStore, surgery: &Surgery) -> SurgerySlot {
    SurgerySlot {
        id: surgery.id,
        planned_date: surgery.planned_date,
        patient_name: store.admission(surgery.admission_id).map(|a| a.patient.name.clone()),
        surgery_name: surgery.name.clone(),
        state: surgery.status.label().to_string(),
    }
}

/// 当前医生主刀的手术
pub fn doctor_surgeries(store: &WardStore, caller: &Caller) -> Vec<SurgerySlot> {
    store
        .surgeries()
        .into_iter()
        .filter(|s| s.doctor.user_id == Some(caller.user_id))
        .map(|s| surgery_slot(store, s))
        .collect()
}

/// 当天及以后的手术，按计划时间升序，最多 `limit` 条
pub fn upcoming_surgeries(slots: &[SurgerySlot], today: NaiveDate, limit: usize) -> Vec<SurgerySlot> {
    let mut upcoming: Vec<SurgerySlot> = slots
        .iter()
        .filter(|s| s.planned_date.date() >= today)
        .cloned()
        .collect();
    upcoming.sort_by(|a, b| a.planned_date.cmp(&b.planned_date));
    upcoming.truncate(limit);
    upcoming
}

/// 该医生名下已入院的患者数
pub fn admitted_patient_count(store: &WardStore, caller: &Caller) -> usize {
    let Some(employee_id) = caller.employee_id else {
        return 0;
    };

    store
        .admissions()
        .into_iter()
        .filter(|a| a.attending_doctor.id == employee_id && a.status == AdmissionStatus::Admitted)
        .count()
}

/// 医生看板汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorDashboard {
    pub surgeries_count: usize,
    pub upcoming: Vec<SurgerySlot>,
    pub admitted_patients: usize,
}

pub fn doctor_dashboard(store: &WardStore, caller: &Caller, today: NaiveDate) -> DoctorDashboard {
    let slots = if caller.employee_id.is_some() {
        doctor_surgeries(store, caller)
    } else {
        Vec::new()
    };
    let all_upcoming = upcoming_surgeries(&slots, today, usize::MAX);

    DoctorDashboard {
        surgeries_count: all_upcoming.len(),
        upcoming: all_upcoming.into_iter().take(5).collect(),
        admitted_patients: admitted_patient_count(store, caller),
    }
}
