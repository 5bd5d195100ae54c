//! 住院与手术记录存储

use crate::{ledger::MemoryLedger, resources::{PlacementDirectory, ResourceEffect}, sequence::PrefixedSequence};
use inpatient_core::{Admission, InpatientError, Result, Surgery, SystemScope};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 病区数据存储
///
/// 记录表、资源目录、账务和序列号放在一起，便于整体快照。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardStore {
    admissions: HashMap<Uuid, Admission>,
    surgeries: HashMap<Uuid, Surgery>,
    resources: PlacementDirectory,
    ledger: MemoryLedger,
    sequence: PrefixedSequence,
}

impl WardStore {
    pub fn new(resources: PlacementDirectory, ledger: MemoryLedger, sequence: PrefixedSequence) -> Self {
        Self {
            admissions: HashMap::new(),
            surgeries: HashMap::new(),
            resources,
            ledger,
            sequence,
        }
    }

    // ========== 资源、账务、序列号 ==========

    pub fn resources(&self) -> &PlacementDirectory {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut PlacementDirectory {
        &mut self.resources
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut MemoryLedger {
        &mut self.ledger
    }

    pub fn sequence_mut(&mut self) -> &mut PrefixedSequence {
        &mut self.sequence
    }

    // ========== 住院记录 ==========

    pub fn admission(&self, id: Uuid) -> Option<&Admission> {
        self.admissions.get(&id)
    }

    pub fn admission_by_code(&self, code: &str) -> Option<&Admission> {
        self.admissions.values().find(|a| a.code == code)
    }

    /// 按序列号排序的全部住院记录
    pub fn admissions(&self) -> Vec<&Admission> {
        let mut admissions: Vec<&Admission> = self.admissions.values().collect();
        admissions.sort_by(|a, b| a.code.cmp(&b.code));
        admissions
    }

    /// 患者当前在院（未归档）的住院记录
    pub fn active_admission_for_patient(&self, patient_id: Uuid) -> Option<&Admission> {
        self.admissions
            .values()
            .find(|a| a.active && a.patient.id == patient_id)
    }

    pub fn insert_admission(&mut self, admission: Admission) -> Result<()> {
        self.resources.ensure_exists(admission.placement)?;
        if self.admission_by_code(&admission.code).is_some() {
            return Err(InpatientError::Validation(format!(
                "Admission code {} already in use",
                admission.code
            )));
        }

        tracing::debug!("Stored admission {} ({})", admission.code, admission.id);
        self.admissions.insert(admission.id, admission);
        Ok(())
    }

    /// 覆盖住院记录
    ///
    /// 以调用方身份写入，不改动任何资源状态；需要改床位/病房状态时走 [`Self::commit_transition`]。
    pub fn update_admission(&mut self, admission: Admission) -> Result<()> {
        if !self.admissions.contains_key(&admission.id) {
            return Err(InpatientError::NotFound(format!("Admission {} not found", admission.id)));
        }
        self.resources.ensure_exists(admission.placement)?;

        self.admissions.insert(admission.id, admission);
        Ok(())
    }

    /// 原子提交：先校验全部引用，再同时写入记录和资源状态
    pub fn commit_transition(
        &mut self,
        scope: &SystemScope,
        admission: Admission,
        effects: &[ResourceEffect],
    ) -> Result<()> {
        if !self.admissions.contains_key(&admission.id) {
            return Err(InpatientError::NotFound(format!("Admission {} not found", admission.id)));
        }
        self.resources.ensure_exists(admission.placement)?;
        self.resources.check_effects(effects)?;

        self.resources.apply(scope, effects)?;
        self.admissions.insert(admission.id, admission);
        Ok(())
    }

    // ========== 手术记录 ==========

    pub fn surgery(&self, id: Uuid) -> Option<&Surgery> {
        self.surgeries.get(&id)
    }

    /// 按计划时间排序的全部手术
    pub fn surgeries(&self) -> Vec<&Surgery> {
        let mut surgeries: Vec<&Surgery> = self.surgeries.values().collect();
        surgeries.sort_by(|a, b| a.planned_date.cmp(&b.planned_date).then(a.created_at.cmp(&b.created_at)));
        surgeries
    }

    /// 某次住院下的手术，按创建顺序
    pub fn surgeries_for_admission(&self, admission_id: Uuid) -> Vec<&Surgery> {
        let mut surgeries: Vec<&Surgery> = self
            .surgeries
            .values()
            .filter(|s| s.admission_id == admission_id)
            .collect();
        surgeries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        surgeries
    }

    /// 某手术室安排的手术
    pub fn surgeries_in_theater(&self, theater_id: Uuid) -> Vec<&Surgery> {
        self.surgeries()
            .into_iter()
            .filter(|s| s.theater_id == Some(theater_id))
            .collect()
    }

    pub fn insert_surgery(&mut self, surgery: Surgery) -> Result<()> {
        if !self.admissions.contains_key(&surgery.admission_id) {
            return Err(InpatientError::NotFound(format!(
                "Admission {} not found",
                surgery.admission_id
            )));
        }
        if let Some(theater_id) = surgery.theater_id {
            if self.resources.theater(theater_id).is_none() {
                return Err(InpatientError::NotFound(format!("Operation theater {} not found", theater_id)));
            }
        }

        self.surgeries.insert(surgery.id, surgery);
        Ok(())
    }

    pub fn update_surgery(&mut self, surgery: Surgery) -> Result<()> {
        if !self.surgeries.contains_key(&surgery.id) {
            return Err(InpatientError::NotFound(format!("Surgery {} not found", surgery.id)));
        }
        self.surgeries.insert(surgery.id, surgery);
        Ok(())
    }

    /// 删除手术，团队和耗材随之删除
    pub fn remove_surgery(&mut self, id: Uuid) -> Result<Surgery> {
        let surgery = self
            .surgeries
            .remove(&id)
            .ok_or_else(|| InpatientError::NotFound(format!("Surgery {} not found", id)))?;

        tracing::info!(
            "Removed surgery {} with {} team members and {} consumables",
            id,
            surgery.team.len(),
            surgery.consumables.len()
        );
        Ok(surgery)
    }
}
