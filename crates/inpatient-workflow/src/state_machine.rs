//! 住院与手术状态机
//!
//! 转换表只描述常规流程。表外的转换同样会执行，只记录告警：
//! 例如未经预留直接入院，或已完成的手术重新确认。

use inpatient_core::{AdmissionStatus, BedStatus, Placement, RoomStatus, SurgeryStatus};
use inpatient_store::ResourceEffect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 住院状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AdmissionEvent {
    Reserve,
    Admit,
    Invoice,
    Discharge,
}

impl AdmissionEvent {
    /// 事件的目标状态，与当前状态无关
    pub fn target(&self) -> AdmissionStatus {
        match self {
            AdmissionEvent::Reserve => AdmissionStatus::Reserved,
            AdmissionEvent::Admit => AdmissionStatus::Admitted,
            AdmissionEvent::Invoice => AdmissionStatus::Invoiced,
            AdmissionEvent::Discharge => AdmissionStatus::Discharged,
        }
    }

    /// 事件对床位/病房状态的副作用
    pub fn resource_effects(&self, placement: Placement) -> Vec<ResourceEffect> {
        let (bed_status, room_status) = match self {
            AdmissionEvent::Reserve => (BedStatus::NotAvailable, RoomStatus::Reserved),
            AdmissionEvent::Admit => (BedStatus::NotAvailable, RoomStatus::NotAvailable),
            AdmissionEvent::Discharge => (BedStatus::Available, RoomStatus::Available),
            AdmissionEvent::Invoice => return Vec::new(),
        };

        match placement {
            Placement::Bed(id) => vec![ResourceEffect::Bed(id, bed_status)],
            Placement::Room(id) => vec![ResourceEffect::Room(id, room_status)],
            Placement::Unassigned => Vec::new(),
        }
    }
}

/// 住院状态机
#[derive(Debug)]
pub struct AdmissionStateMachine {
    documented: HashMap<(AdmissionStatus, AdmissionEvent), AdmissionStatus>,
}

impl AdmissionStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut documented = HashMap::new();

        // 常规流程：草稿 → 预留 → 入院 → 开票 → 出院
        documented.insert((AdmissionStatus::Draft, AdmissionEvent::Reserve), AdmissionStatus::Reserved);
        documented.insert((AdmissionStatus::Reserved, AdmissionEvent::Admit), AdmissionStatus::Admitted);
        documented.insert((AdmissionStatus::Admitted, AdmissionEvent::Invoice), AdmissionStatus::Invoiced);
        documented.insert((AdmissionStatus::Invoiced, AdmissionEvent::Discharge), AdmissionStatus::Discharged);

        Self { documented }
    }

    /// 是否属于常规流程
    pub fn is_documented(&self, from: AdmissionStatus, event: AdmissionEvent) -> bool {
        self.documented.contains_key(&(from, event))
    }

    /// 执行状态转换，总是成功
    pub fn transition(&self, from: AdmissionStatus, event: AdmissionEvent) -> AdmissionStatus {
        if !self.is_documented(from, event) {
            tracing::warn!("Admission transition {:?} applied from off-path status {:?}", event, from);
        }
        event.target()
    }

    /// 当前状态下常规流程的下一步
    pub fn get_documented_events(&self, current: AdmissionStatus) -> Vec<AdmissionEvent> {
        self.documented
            .keys()
            .filter(|(state, _)| *state == current)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for AdmissionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// 手术状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SurgeryEvent {
    Confirm,
    Done,
    Cancel,
}

impl SurgeryEvent {
    pub fn target(&self) -> SurgeryStatus {
        match self {
            SurgeryEvent::Confirm => SurgeryStatus::Confirmed,
            SurgeryEvent::Done => SurgeryStatus::Done,
            SurgeryEvent::Cancel => SurgeryStatus::Cancelled,
        }
    }
}

/// 手术状态机
#[derive(Debug)]
pub struct SurgeryStateMachine {
    documented: HashMap<(SurgeryStatus, SurgeryEvent), SurgeryStatus>,
}

impl SurgeryStateMachine {
    pub fn new() -> Self {
        let mut documented = HashMap::new();

        documented.insert((SurgeryStatus::Draft, SurgeryEvent::Confirm), SurgeryStatus::Confirmed);
        documented.insert((SurgeryStatus::Confirmed, SurgeryEvent::Done), SurgeryStatus::Done);
        documented.insert((SurgeryStatus::Draft, SurgeryEvent::Cancel), SurgeryStatus::Cancelled);
        documented.insert((SurgeryStatus::Confirmed, SurgeryEvent::Cancel), SurgeryStatus::Cancelled);

        Self { documented }
    }

    pub fn is_documented(&self, from: SurgeryStatus, event: SurgeryEvent) -> bool {
        self.documented.contains_key(&(from, event))
    }

    /// 直接覆盖状态，不受核查表影响
    pub fn transition(&self, from: SurgeryStatus, event: SurgeryEvent) -> SurgeryStatus {
        if !self.is_documented(from, event) {
            tracing::warn!("Surgery transition {:?} applied from off-path status {:?}", event, from);
        }
        event.target()
    }
}

impl Default for SurgeryStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
