//! 住院工作流引擎
//!
//! 协调住院状态机、手术状态机、账单汇总和资源副作用的核心引擎

use crate::{
    admission::{AdmissionRequest, PrescriptionPrint, RegistrationOutcome},
    billing::{assemble_invoice_lines, drafts_to_cancel, InvoiceInput, InvoiceSummary},
    dashboard::{self, Caller, DoctorDashboard, InpatientListRow, InpatientRow, InpatientSearch, SurgerySlot},
    state_machine::{AdmissionEvent, AdmissionStateMachine, SurgeryEvent, SurgeryStateMachine},
    surgery::{OperativeNotes, SurgeryRequest},
};
use chrono::{NaiveDate, Utc};
use inpatient_core::{
    Admission, Bed, BedType, BillingDocument, BillingLedger, ChecklistItem, Clock, Consumable, InpatientError, LabTest,
    NewBillingDocument, PaymentLine, Placement, PrescriptionLine, RentBreakdown, Result, Room, SequenceGenerator,
    Surgery, SystemClock, SystemScope, TeamMember,
};
use inpatient_store::WardStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 工作流设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// 住院费账单行名称
    pub rent_line_label: String,
    /// 已开票的住院记录再次开票时报错
    pub reject_reinvoice: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            rent_line_label: "Room/Bed Rent Amount".to_string(),
            reject_reinvoice: false,
        }
    }
}

/// 可分配的床位和病房
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailablePlacements {
    pub beds: Vec<Bed>,
    pub rooms: Vec<Room>,
}

/// 住院工作流引擎
#[derive(Debug)]
pub struct InpatientEngine {
    store: WardStore,
    admission_sm: AdmissionStateMachine,
    surgery_sm: SurgeryStateMachine,
    settings: WorkflowSettings,
    clock: Box<dyn Clock>,
}

impl InpatientEngine {
    /// 创建新的工作流引擎
    pub fn new(store: WardStore, settings: WorkflowSettings) -> Self {
        Self {
            store,
            admission_sm: AdmissionStateMachine::new(),
            surgery_sm: SurgeryStateMachine::new(),
            settings,
            clock: Box::new(SystemClock),
        }
    }

    /// 替换时钟
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn store(&self) -> &WardStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut WardStore {
        &mut self.store
    }

    pub fn into_store(self) -> WardStore {
        self.store
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    fn load_admission(&self, id: Uuid) -> Result<Admission> {
        self.store
            .admission(id)
            .cloned()
            .ok_or_else(|| InpatientError::NotFound(format!("Admission {} not found", id)))
    }

    fn load_surgery(&self, id: Uuid) -> Result<Surgery> {
        self.store
            .surgery(id)
            .cloned()
            .ok_or_else(|| InpatientError::NotFound(format!("Surgery {} not found", id)))
    }

    /// 修改住院记录并保存，不涉及资源状态
    fn modify_admission<F>(&mut self, id: Uuid, change: F) -> Result<Admission>
    where
        F: FnOnce(&mut Admission) -> Result<()>,
    {
        let mut admission = self.load_admission(id)?;
        change(&mut admission)?;
        admission.updated_at = Utc::now();
        self.store.update_admission(admission.clone())?;
        Ok(admission)
    }

    fn modify_surgery<F>(&mut self, id: Uuid, change: F) -> Result<Surgery>
    where
        F: FnOnce(&mut Surgery),
    {
        let mut surgery = self.load_surgery(id)?;
        change(&mut surgery);
        surgery.updated_at = Utc::now();
        self.store.update_surgery(surgery.clone())?;
        Ok(surgery)
    }

    // ========== 住院登记 ==========

    /// 登记新的住院记录
    ///
    /// 患者已有在院记录时返回 [`RegistrationOutcome::AlreadyAdmitted`]，不做任何写入。
    pub fn register_admission(&mut self, request: AdmissionRequest) -> Result<RegistrationOutcome> {
        if let Some(patient) = &request.patient {
            if let Some(existing) = self.store.active_admission_for_patient(patient.id) {
                tracing::info!("Patient {} already has admission {}", patient.id, existing.code);
                return Ok(RegistrationOutcome::AlreadyAdmitted {
                    existing_code: existing.code.clone(),
                });
            }
        }
        self.store.resources().ensure_exists(request.placement)?;

        let today = self.today();
        // 校验通过后才消耗序列号
        let provided = if request.needs_code() { None } else { request.code.clone() };
        let draft = request.into_admission(String::new(), today, Utc::now())?;
        let code = match provided {
            Some(code) => code,
            None => self.store.sequence_mut().next_code(),
        };
        let admission = Admission { code, ..draft };

        self.store.insert_admission(admission.clone())?;
        tracing::info!("Registered admission {} for patient {}", admission.code, admission.patient.name);

        Ok(RegistrationOutcome::Created {
            admission: Box::new(admission),
        })
    }

    /// 分配床位或病房
    pub fn assign_placement(&mut self, id: Uuid, placement: Placement) -> Result<Admission> {
        self.store.resources().ensure_exists(placement)?;
        let admission = self.modify_admission(id, |a| {
            a.placement = placement;
            Ok(())
        })?;
        tracing::info!("Admission {} placement set to {:?}", admission.code, placement);
        Ok(admission)
    }

    pub fn set_bed_type(&mut self, id: Uuid, bed_type: Option<BedType>) -> Result<Admission> {
        self.modify_admission(id, |a| {
            a.bed_type = bed_type;
            Ok(())
        })
    }

    pub fn set_admission_date(&mut self, id: Uuid, hosp_date: Option<NaiveDate>) -> Result<Admission> {
        self.modify_admission(id, |a| {
            a.hosp_date = hosp_date;
            Ok(())
        })
    }

    /// 设置出院日期，不校验与入院日期的先后
    pub fn set_discharge_date(&mut self, id: Uuid, discharge_date: Option<NaiveDate>) -> Result<Admission> {
        self.modify_admission(id, |a| {
            a.discharge_date = discharge_date;
            Ok(())
        })
    }

    pub fn set_discharge_plan(&mut self, id: Uuid, plan: Option<String>) -> Result<Admission> {
        self.modify_admission(id, |a| {
            a.discharge_plan = plan;
            Ok(())
        })
    }

    pub fn add_payment(&mut self, id: Uuid, payment: PaymentLine) -> Result<Admission> {
        self.modify_admission(id, |a| {
            a.payments.push(payment);
            Ok(())
        })
    }

    pub fn add_lab_test(&mut self, id: Uuid, test: LabTest) -> Result<Admission> {
        self.modify_admission(id, |a| {
            a.lab_tests.push(test);
            Ok(())
        })
    }

    pub fn add_prescription(&mut self, id: Uuid, line: PrescriptionLine) -> Result<Admission> {
        self.modify_admission(id, |a| {
            a.prescriptions.push(line);
            Ok(())
        })
    }

    /// 切换门诊处方历史
    ///
    /// 总是先清空现有处方行；开启时复制门诊处方。
    pub fn set_outpatient_history(
        &mut self,
        id: Uuid,
        enable: bool,
        outpatient_prescriptions: &[PrescriptionLine],
    ) -> Result<Admission> {
        self.modify_admission(id, |a| {
            a.enable_outpatient = enable;
            a.prescriptions = if enable { outpatient_prescriptions.to_vec() } else { Vec::new() };
            Ok(())
        })
    }

    // ========== 派生字段 ==========

    pub fn admit_days(&self, id: Uuid) -> Result<i64> {
        Ok(self.load_admission(id)?.admit_days(self.today()))
    }

    /// 每次调用都按当前日期和分配资源重新计算
    pub fn rent(&self, id: Uuid) -> Result<RentBreakdown> {
        let admission = self.load_admission(id)?;
        let rates = self.store.resources().rates_for(admission.placement);
        Ok(admission.rent(rates, self.today()))
    }

    pub fn lab_test_count(&self, id: Uuid) -> Result<usize> {
        Ok(self.load_admission(id)?.lab_tests.len())
    }

    pub fn print_prescription(&self, id: Uuid) -> Result<Option<PrescriptionPrint>> {
        let admission = self.load_admission(id)?;
        Ok(PrescriptionPrint::from_admission(&admission, self.today()))
    }

    /// 与住院记录床型一致的可用床位和病房
    pub fn available_placements(&self, bed_type: Option<BedType>) -> AvailablePlacements {
        let resources = self.store.resources();
        AvailablePlacements {
            beds: resources.available_beds(bed_type).into_iter().cloned().collect(),
            rooms: resources.available_rooms(bed_type).into_iter().cloned().collect(),
        }
    }

    // ========== 住院状态转换 ==========

    /// 执行带资源副作用的状态转换，记录与资源状态一起提交
    fn apply_admission_event(&mut self, id: Uuid, event: AdmissionEvent) -> Result<Admission> {
        let mut admission = self.load_admission(id)?;
        let from = admission.status;
        let effects = event.resource_effects(admission.placement);

        admission.status = self.admission_sm.transition(from, event);
        if event == AdmissionEvent::Discharge {
            admission.active = false;
        }
        admission.updated_at = Utc::now();

        let scope = SystemScope::elevate("admission transition");
        self.store.commit_transition(&scope, admission.clone(), &effects)?;

        tracing::info!(
            "Admission {} status updated from {:?} to {:?}",
            admission.code,
            from,
            admission.status
        );
        Ok(admission)
    }

    /// 预留床位/病房，必须已分配资源
    pub fn reserve(&mut self, id: Uuid) -> Result<Admission> {
        let admission = self.load_admission(id)?;
        if !admission.placement.is_assigned() {
            return Err(InpatientError::Validation(format!(
                "Admission {} has no bed or room to reserve",
                admission.code
            )));
        }
        self.apply_admission_event(id, AdmissionEvent::Reserve)
    }

    /// 入院，不检查是否经过预留
    pub fn admit(&mut self, id: Uuid) -> Result<Admission> {
        self.apply_admission_event(id, AdmissionEvent::Admit)
    }

    /// 出院：释放资源并归档记录
    pub fn discharge(&mut self, id: Uuid) -> Result<Admission> {
        self.apply_admission_event(id, AdmissionEvent::Discharge)
    }

    /// 开具住院发票
    ///
    /// 默认不阻止重复开票；账单先于住院记录创建，账务失败时记录保持不变。
    pub fn invoice(&mut self, id: Uuid) -> Result<InvoiceSummary> {
        let mut admission = self.load_admission(id)?;
        if self.settings.reject_reinvoice && admission.is_invoice {
            return Err(InpatientError::AlreadyInvoiced(admission.code));
        }

        let today = self.today();
        let rates = self.store.resources().rates_for(admission.placement);
        let rent = admission.rent(rates, today);
        let draft_lines = self.store.ledger().draft_lines_for_patient(admission.patient.id);

        let lines = {
            let surgeries = self.store.surgeries_for_admission(admission.id);
            assemble_invoice_lines(&InvoiceInput {
                admission: &admission,
                rent,
                surgeries: &surgeries,
                draft_lines: &draft_lines,
                rent_line_label: &self.settings.rent_line_label,
            })
        };
        let line_count = lines.len();
        let total: Decimal = lines.iter().map(|l| l.subtotal()).sum();

        let document_id = self.store.ledger_mut().create_document(NewBillingDocument {
            patient_id: admission.patient.id,
            reference: admission.code.clone(),
            date: today,
            lines,
        })?;

        let cancelled_drafts = drafts_to_cancel(&draft_lines);
        let scope = SystemScope::elevate("merge draft invoices");
        for draft_id in &cancelled_drafts {
            self.store.ledger_mut().cancel_document(&scope, *draft_id)?;
        }

        let from = admission.status;
        admission.status = self.admission_sm.transition(from, AdmissionEvent::Invoice);
        admission.is_invoice = true;
        admission.invoice_id = Some(document_id);
        admission.updated_at = Utc::now();
        self.store.update_admission(admission.clone())?;

        tracing::info!(
            "Invoiced admission {} with {} lines, merged {} draft documents",
            admission.code,
            line_count,
            cancelled_drafts.len()
        );

        Ok(InvoiceSummary {
            document_id,
            reference: admission.code,
            line_count,
            total,
            cancelled_drafts,
        })
    }

    /// 引用该住院序列号的账单
    pub fn invoices_for(&self, id: Uuid) -> Result<Vec<&BillingDocument>> {
        let admission = self
            .store
            .admission(id)
            .ok_or_else(|| InpatientError::NotFound(format!("Admission {} not found", id)))?;
        Ok(self.store.ledger().documents_by_reference(&admission.code))
    }

    // ========== 手术 ==========

    /// 安排手术
    pub fn schedule_surgery(&mut self, request: SurgeryRequest) -> Result<Surgery> {
        let surgery = request.into_surgery(self.today(), Utc::now())?;
        self.store.insert_surgery(surgery.clone())?;
        tracing::info!("Scheduled surgery {} ({}) at {}", surgery.name, surgery.id, surgery.planned_date);
        Ok(surgery)
    }

    /// 设置术前核查项，返回核查是否全部完成
    pub fn set_checklist_item(&mut self, id: Uuid, item: ChecklistItem, value: bool) -> Result<bool> {
        let surgery = self.modify_surgery(id, |s| s.checklist.set(item, value))?;
        tracing::debug!(
            "Surgery {} checklist {:?} = {}, complete = {}",
            id,
            item,
            value,
            surgery.checklist_complete()
        );
        Ok(surgery.checklist_complete())
    }

    fn apply_surgery_event(&mut self, id: Uuid, event: SurgeryEvent) -> Result<Surgery> {
        let current = self.load_surgery(id)?;
        if !current.checklist_complete() && event != SurgeryEvent::Cancel {
            tracing::debug!("Surgery {} moving to {:?} with incomplete checklist", id, event);
        }
        let status = self.surgery_sm.transition(current.status, event);
        let surgery = self.modify_surgery(id, |s| s.status = status)?;
        tracing::info!("Surgery {} status updated from {:?} to {:?}", id, current.status, surgery.status);
        Ok(surgery)
    }

    pub fn confirm_surgery(&mut self, id: Uuid) -> Result<Surgery> {
        self.apply_surgery_event(id, SurgeryEvent::Confirm)
    }

    pub fn complete_surgery(&mut self, id: Uuid) -> Result<Surgery> {
        self.apply_surgery_event(id, SurgeryEvent::Done)
    }

    pub fn cancel_surgery(&mut self, id: Uuid) -> Result<Surgery> {
        self.apply_surgery_event(id, SurgeryEvent::Cancel)
    }

    pub fn add_team_member(&mut self, id: Uuid, member: TeamMember) -> Result<Surgery> {
        self.modify_surgery(id, |s| s.team.push(member))
    }

    pub fn add_consumable(&mut self, id: Uuid, consumable: Consumable) -> Result<Surgery> {
        self.modify_surgery(id, |s| s.consumables.push(consumable))
    }

    pub fn record_operative_notes(&mut self, id: Uuid, notes: OperativeNotes) -> Result<Surgery> {
        self.modify_surgery(id, |s| notes.apply_to(s))
    }

    pub fn remove_surgery(&mut self, id: Uuid) -> Result<Surgery> {
        self.store.remove_surgery(id)
    }

    // ========== 看板 ==========

    pub fn search_inpatients(&self, search: &InpatientSearch) -> Vec<InpatientRow> {
        dashboard::search_inpatients(&self.store, search)
    }

    pub fn inpatient_list(&self) -> Vec<InpatientListRow> {
        dashboard::inpatient_list(&self.store)
    }

    pub fn doctor_surgeries(&self, caller: &Caller) -> Vec<SurgerySlot> {
        dashboard::doctor_surgeries(&self.store, caller)
    }

    pub fn doctor_dashboard(&self, caller: &Caller) -> DoctorDashboard {
        dashboard::doctor_dashboard(&self.store, caller, self.today())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inpatient_core::*;
    use inpatient_store::{MemoryLedger, PlacementDirectory, PrefixedSequence};
    use rust_decimal::Decimal;

    struct Fixture {
        engine: InpatientEngine,
        bed_id: Uuid,
        room_id: Uuid,
        doctor: StaffRef,
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn fixture() -> Fixture {
        let mut resources = PlacementDirectory::new();
        let bed_id = Uuid::new_v4();
        let room_id = Uuid::new_v4();
        resources.add_bed(Bed {
            id: bed_id,
            name: "B-07".to_string(),
            ward: Some(Ward { id: Uuid::new_v4(), ward_no: "W3".to_string() }),
            bed_type: Some(BedType::Electric),
            daily_rent: Decimal::from(50),
            status: BedStatus::Available,
        });
        resources.add_room(Room {
            id: room_id,
            name: "R-204".to_string(),
            building: Some(Building { id: Uuid::new_v4(), name: "Bloc B".to_string() }),
            bed_type: Some(BedType::Electric),
            daily_rent: Decimal::from(120),
            status: RoomStatus::Available,
        });

        let store = WardStore::new(resources, MemoryLedger::default(), PrefixedSequence::default());
        let engine = InpatientEngine::new(store, WorkflowSettings::default()).with_clock(FixedClock(date("2025-01-10")));

        Fixture {
            engine,
            bed_id,
            room_id,
            doctor: StaffRef { id: Uuid::new_v4(), name: "Dr. Lefebvre".to_string(), user_id: Some(Uuid::new_v4()) },
        }
    }

    fn patient(name: &str) -> PatientRef {
        PatientRef { id: Uuid::new_v4(), name: name.to_string() }
    }

    fn register(fx: &mut Fixture, patient: PatientRef, placement: Placement) -> Admission {
        let outcome = fx
            .engine
            .register_admission(AdmissionRequest {
                patient: Some(patient),
                admission_type: Some(AdmissionType::Emergency),
                attending_doctor: Some(fx.doctor.clone()),
                placement,
                hosp_date: Some(date("2025-01-08")),
                ..Default::default()
            })
            .unwrap();
        outcome.admission().cloned().unwrap()
    }

    fn product(name: &str, price: i64) -> ProductRef {
        ProductRef { id: Uuid::new_v4(), name: name.to_string(), list_price: Decimal::from(price) }
    }

    #[test]
    fn test_register_assigns_sequence() {
        let mut fx = fixture();
        let first = register(&mut fx, patient("A"), Placement::Unassigned);
        let second = register(&mut fx, patient("B"), Placement::Unassigned);

        assert_eq!(first.code, "IP00001");
        assert_eq!(second.code, "IP00002");
        assert_eq!(first.status, AdmissionStatus::Draft);
    }

    #[test]
    fn test_register_conflict_performs_no_write() {
        let mut fx = fixture();
        let p = patient("Camille Bernard");
        let first = register(&mut fx, p.clone(), Placement::Unassigned);

        let outcome = fx
            .engine
            .register_admission(AdmissionRequest {
                patient: Some(p),
                admission_type: Some(AdmissionType::Routine),
                attending_doctor: Some(fx.doctor.clone()),
                ..Default::default()
            })
            .unwrap();

        match &outcome {
            RegistrationOutcome::AlreadyAdmitted { existing_code } => assert_eq!(existing_code, &first.code),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(outcome.message(), "Patient already exists");
        assert_eq!(fx.engine.store().admissions().len(), 1);
        assert_eq!(fx.engine.store_mut().sequence_mut().peek_number(), 2);
    }

    #[test]
    fn test_register_after_discharge_is_allowed() {
        let mut fx = fixture();
        let p = patient("Camille Bernard");
        let first = register(&mut fx, p.clone(), Placement::Unassigned);
        fx.engine.discharge(first.id).unwrap();

        let second = register(&mut fx, p, Placement::Unassigned);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_register_missing_field_does_not_consume_sequence() {
        let mut fx = fixture();
        let result = fx.engine.register_admission(AdmissionRequest {
            patient: Some(patient("X")),
            admission_type: Some(AdmissionType::Routine),
            ..Default::default()
        });

        assert!(matches!(result, Err(InpatientError::MissingField("attending_doctor"))));
        assert!(fx.engine.store().admissions().is_empty());
        assert_eq!(fx.engine.store_mut().sequence_mut().peek_number(), 1);
    }

    #[test]
    fn test_reserve_admit_discharge_with_bed() {
        let mut fx = fixture();
        let bed_id = fx.bed_id;
        let adm = register(&mut fx, patient("D"), Placement::Bed(bed_id));

        let reserved = fx.engine.reserve(adm.id).unwrap();
        assert_eq!(reserved.status, AdmissionStatus::Reserved);
        assert_eq!(fx.engine.store().resources().bed(fx.bed_id).unwrap().status, BedStatus::NotAvailable);

        let admitted = fx.engine.admit(adm.id).unwrap();
        assert_eq!(admitted.status, AdmissionStatus::Admitted);
        assert_eq!(fx.engine.store().resources().bed(fx.bed_id).unwrap().status, BedStatus::NotAvailable);

        let discharged = fx.engine.discharge(adm.id).unwrap();
        assert_eq!(discharged.status, AdmissionStatus::Discharged);
        assert!(!discharged.active);
        assert_eq!(fx.engine.store().resources().bed(fx.bed_id).unwrap().status, BedStatus::Available);
    }

    #[test]
    fn test_reserve_admit_discharge_with_room() {
        let mut fx = fixture();
        let room_id = fx.room_id;
        let adm = register(&mut fx, patient("E"), Placement::Room(room_id));

        fx.engine.reserve(adm.id).unwrap();
        assert_eq!(fx.engine.store().resources().room(fx.room_id).unwrap().status, RoomStatus::Reserved);

        fx.engine.admit(adm.id).unwrap();
        assert_eq!(fx.engine.store().resources().room(fx.room_id).unwrap().status, RoomStatus::NotAvailable);

        fx.engine.discharge(adm.id).unwrap();
        assert_eq!(fx.engine.store().resources().room(fx.room_id).unwrap().status, RoomStatus::Available);
    }

    #[test]
    fn test_reserve_requires_placement() {
        let mut fx = fixture();
        let adm = register(&mut fx, patient("F"), Placement::Unassigned);

        assert!(matches!(fx.engine.reserve(adm.id), Err(InpatientError::Validation(_))));
        assert_eq!(fx.engine.store().admission(adm.id).unwrap().status, AdmissionStatus::Draft);
    }

    #[test]
    fn test_admit_without_reserve_and_no_resource_check() {
        let mut fx = fixture();
        let bed_id = fx.bed_id;
        let adm = register(&mut fx, patient("G"), Placement::Bed(bed_id));

        // 另一位患者占用同一床位也不会被拦截
        let other = register(&mut fx, patient("H"), Placement::Bed(bed_id));
        fx.engine.admit(other.id).unwrap();

        let admitted = fx.engine.admit(adm.id).unwrap();
        assert_eq!(admitted.status, AdmissionStatus::Admitted);
    }

    #[test]
    fn test_rent_is_recomputed_from_inputs() {
        let mut fx = fixture();
        let bed_id = fx.bed_id;
        let adm = register(&mut fx, patient("I"), Placement::Bed(bed_id));

        // 2025-01-08 至今天 2025-01-10
        assert_eq!(fx.engine.admit_days(adm.id).unwrap(), 3);
        assert_eq!(fx.engine.rent(adm.id).unwrap().bed_rent_amount, Decimal::from(150));

        fx.engine.set_discharge_date(adm.id, Some(date("2025-01-08"))).unwrap();
        assert_eq!(fx.engine.admit_days(adm.id).unwrap(), 1);
        assert_eq!(fx.engine.rent(adm.id).unwrap().total(), Decimal::from(50));

        fx.engine.assign_placement(adm.id, Placement::Room(fx.room_id)).unwrap();
        let rent = fx.engine.rent(adm.id).unwrap();
        assert_eq!(rent.bed_rent_amount, Decimal::ZERO);
        assert_eq!(rent.room_rent_amount, Decimal::from(120));

        fx.engine.assign_placement(adm.id, Placement::Unassigned).unwrap();
        assert_eq!(fx.engine.rent(adm.id).unwrap().total(), Decimal::ZERO);
    }

    #[test]
    fn test_admission_date_drives_rent() {
        let mut fx = fixture();
        let bed_id = fx.bed_id;
        let adm = register(&mut fx, patient("Q"), Placement::Bed(bed_id));

        fx.engine.set_admission_date(adm.id, Some(date("2025-01-10"))).unwrap();
        assert_eq!(fx.engine.admit_days(adm.id).unwrap(), 1);
        assert_eq!(fx.engine.rent(adm.id).unwrap().bed_rent_amount, Decimal::from(50));

        fx.engine.set_admission_date(adm.id, Some(date("2025-01-01"))).unwrap();
        assert_eq!(fx.engine.admit_days(adm.id).unwrap(), 10);
        assert_eq!(fx.engine.rent(adm.id).unwrap().total(), Decimal::from(500));

        // 没有入院日期时天数和费用都为零
        fx.engine.set_admission_date(adm.id, None).unwrap();
        assert_eq!(fx.engine.admit_days(adm.id).unwrap(), 0);
        assert_eq!(fx.engine.rent(adm.id).unwrap().total(), Decimal::ZERO);
    }

    #[test]
    fn test_detail_setters_and_lab_test_count() {
        let mut fx = fixture();
        let adm = register(&mut fx, patient("R"), Placement::Unassigned);
        assert_eq!(fx.engine.lab_test_count(adm.id).unwrap(), 0);

        let updated = fx.engine.set_bed_type(adm.id, Some(BedType::Clinitron)).unwrap();
        assert_eq!(updated.bed_type, Some(BedType::Clinitron));
        let updated = fx.engine.set_discharge_plan(adm.id, Some("Home with nurse visits".to_string())).unwrap();
        assert_eq!(updated.discharge_plan.as_deref(), Some("Home with nurse visits"));

        let stored = fx.engine.store().admission(adm.id).unwrap();
        assert_eq!(stored.bed_type, Some(BedType::Clinitron));
        assert_eq!(stored.discharge_plan.as_deref(), Some("Home with nurse visits"));

        fx.engine
            .add_lab_test(adm.id, LabTest {
                id: Uuid::new_v4(),
                name: "Ferritin".to_string(),
                total_price: Decimal::from(22),
                invoice_id: None,
            })
            .unwrap();
        fx.engine
            .add_lab_test(adm.id, LabTest {
                id: Uuid::new_v4(),
                name: "TSH".to_string(),
                total_price: Decimal::from(16),
                invoice_id: Some(Uuid::new_v4()),
            })
            .unwrap();
        // 已开票的化验也计入
        assert_eq!(fx.engine.lab_test_count(adm.id).unwrap(), 2);

        assert!(matches!(fx.engine.lab_test_count(Uuid::new_v4()), Err(InpatientError::NotFound(_))));
    }

    #[test]
    fn test_invoice_room_placement() {
        let mut fx = fixture();
        let room_id = fx.room_id;
        let adm = register(&mut fx, patient("Sacha Giraud"), Placement::Room(room_id));
        fx.engine.admit(adm.id).unwrap();

        let summary = fx.engine.invoice(adm.id).unwrap();
        assert_eq!(summary.line_count, 1);
        // 3 天 × 120
        assert_eq!(summary.total, Decimal::from(360));
        assert!(summary.cancelled_drafts.is_empty());

        let doc = fx.engine.store().ledger().document(summary.document_id).unwrap();
        assert_eq!(doc.lines[0].description, "Room/Bed Rent Amount");
        assert_eq!(doc.lines[0].unit_price, Decimal::from(120));
        assert_eq!(doc.lines[0].quantity, Decimal::from(3));
        assert_eq!(fx.engine.store().resources().room(room_id).unwrap().status, RoomStatus::NotAvailable);
    }

    #[test]
    fn test_projections_expose_ward_and_building() {
        let mut fx = fixture();
        let bed_id = fx.bed_id;
        let room_id = fx.room_id;
        let by_bed = register(&mut fx, patient("Tom Perrin"), Placement::Bed(bed_id));
        let by_room = register(&mut fx, patient("Ugo Marchand"), Placement::Room(room_id));

        let list = fx.engine.inpatient_list();
        let bed_row = list.iter().find(|r| r.id == by_bed.id).unwrap();
        assert_eq!(bed_row.ward_no.as_deref(), Some("W3"));
        assert_eq!(bed_row.building, None);
        let room_row = list.iter().find(|r| r.id == by_room.id).unwrap();
        assert_eq!(room_row.room_name.as_deref(), Some("R-204"));
        assert_eq!(room_row.building.as_deref(), Some("Bloc B"));
        assert_eq!(room_row.ward_no, None);

        let rows = fx.engine.search_inpatients(&InpatientSearch {
            text: Some("marchand".to_string()),
            include_archived: false,
        });
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].building.as_deref(), Some("Bloc B"));
    }

    #[test]
    fn test_available_placements_follow_status() {
        let mut fx = fixture();
        assert_eq!(fx.engine.available_placements(Some(BedType::Electric)).beds.len(), 1);
        assert!(fx.engine.available_placements(Some(BedType::Gatch)).beds.is_empty());

        let bed_id = fx.bed_id;
        let adm = register(&mut fx, patient("P"), Placement::Bed(bed_id));
        fx.engine.reserve(adm.id).unwrap();

        let available = fx.engine.available_placements(Some(BedType::Electric));
        assert!(available.beds.is_empty());
        assert_eq!(available.rooms.len(), 1);
    }

    #[test]
    fn test_discharge_date_before_admission_counts_one_day() {
        let mut fx = fixture();
        let bed_id = fx.bed_id;
        let adm = register(&mut fx, patient("J"), Placement::Bed(bed_id));

        fx.engine.set_discharge_date(adm.id, Some(date("2025-01-01"))).unwrap();
        assert_eq!(fx.engine.admit_days(adm.id).unwrap(), 1);
        assert_eq!(fx.engine.rent(adm.id).unwrap().total(), Decimal::from(50));
    }

    #[test]
    fn test_assign_unknown_placement_rejected() {
        let mut fx = fixture();
        let adm = register(&mut fx, patient("K"), Placement::Unassigned);

        assert!(matches!(
            fx.engine.assign_placement(adm.id, Placement::Bed(Uuid::new_v4())),
            Err(InpatientError::NotFound(_))
        ));
    }

    fn billable_admission(fx: &mut Fixture) -> Admission {
        let bed_id = fx.bed_id;
        let adm = register(fx, patient("Lucie Moreau"), Placement::Bed(bed_id));
        fx.engine
            .add_payment(adm.id, PaymentLine {
                name: "Television".to_string(),
                subtotal: Decimal::from(12),
                tax_ids: vec!["VAT20".to_string()],
            })
            .unwrap();
        fx.engine
            .add_lab_test(adm.id, LabTest {
                id: Uuid::new_v4(),
                name: "CRP".to_string(),
                total_price: Decimal::from(18),
                invoice_id: None,
            })
            .unwrap();
        fx.engine
            .add_lab_test(adm.id, LabTest {
                id: Uuid::new_v4(),
                name: "Blood culture".to_string(),
                total_price: Decimal::from(40),
                invoice_id: Some(Uuid::new_v4()),
            })
            .unwrap();
        fx.engine
            .add_prescription(adm.id, PrescriptionLine {
                medicine: product("Paracetamol", 2),
                quantity: Decimal::from(6),
                intakes: 3,
                time: None,
                note: None,
            })
            .unwrap();

        let surgery = fx
            .engine
            .schedule_surgery(SurgeryRequest {
                name: Some("Hip replacement".to_string()),
                admission_id: Some(adm.id),
                planned_date: Some("2025-01-09T08:00:00".parse().unwrap()),
                doctor: Some(fx.doctor.clone()),
                surgery_product: Some(product("Hip replacement act", 2000)),
                ..Default::default()
            })
            .unwrap();
        fx.engine
            .add_consumable(surgery.id, Consumable {
                product: product("Hip implant", 900),
                quantity: Decimal::ONE,
                lot: Some("LOT-77".to_string()),
                is_implant: true,
            })
            .unwrap();
        fx.engine
            .add_consumable(surgery.id, Consumable {
                product: product("Gauze", 1),
                quantity: Decimal::from(10),
                lot: None,
                is_implant: false,
            })
            .unwrap();

        fx.engine.admit(adm.id).unwrap()
    }

    #[test]
    fn test_invoice_aggregates_lines_and_merges_drafts() {
        let mut fx = fixture();
        let adm = billable_admission(&mut fx);

        let draft_id = Uuid::new_v4();
        fx.engine.store_mut().ledger_mut().insert_document(BillingDocument {
            id: draft_id,
            kind: DocumentKind::CustomerInvoice,
            status: DocumentStatus::Draft,
            patient_id: adm.patient.id,
            reference: None,
            date: date("2025-01-05"),
            invoice_date: None,
            currency: "EUR".to_string(),
            lines: vec![InvoiceLine::new("Outpatient consultation", Decimal::from(30), Decimal::ONE)],
        });

        let summary = fx.engine.invoice(adm.id).unwrap();

        // 住院费 + 收费 + 1 化验 + 处方 + 手术 + 2 耗材 + 1 草稿行
        assert_eq!(summary.line_count, 8);
        assert_eq!(summary.cancelled_drafts, vec![draft_id]);
        // 150 + 12 + 18 + 12 + 2000 + 900 + 10 + 30
        assert_eq!(summary.total, Decimal::from(3132));

        let ledger = fx.engine.store().ledger();
        assert_eq!(ledger.document(draft_id).unwrap().status, DocumentStatus::Cancelled);
        let doc = ledger.document(summary.document_id).unwrap();
        assert_eq!(doc.reference.as_deref(), Some(adm.code.as_str()));
        assert_eq!(doc.date, date("2025-01-10"));
        assert_eq!(doc.lines[0].description, "Room/Bed Rent Amount");
        assert_eq!(doc.lines[0].quantity, Decimal::from(3));

        let stored = fx.engine.store().admission(adm.id).unwrap();
        assert_eq!(stored.status, AdmissionStatus::Invoiced);
        assert!(stored.is_invoice);
        assert_eq!(stored.invoice_id, Some(summary.document_id));
        assert_eq!(fx.engine.invoices_for(adm.id).unwrap().len(), 1);
    }

    #[test]
    fn test_reinvoice_duplicates_by_default() {
        let mut fx = fixture();
        let adm = billable_admission(&mut fx);

        let first = fx.engine.invoice(adm.id).unwrap();
        let second = fx.engine.invoice(adm.id).unwrap();

        // 第一张发票仍是草稿，会被并入第二张并作废
        assert_eq!(second.cancelled_drafts, vec![first.document_id]);
        assert_eq!(second.line_count, first.line_count * 2);
        assert_eq!(fx.engine.invoices_for(adm.id).unwrap().len(), 2);
    }

    #[test]
    fn test_reinvoice_guard_when_enabled() {
        let mut fx = fixture();
        fx.engine.settings.reject_reinvoice = true;
        let adm = billable_admission(&mut fx);

        fx.engine.invoice(adm.id).unwrap();
        assert!(matches!(fx.engine.invoice(adm.id), Err(InpatientError::AlreadyInvoiced(_))));
        assert_eq!(fx.engine.invoices_for(adm.id).unwrap().len(), 1);
    }

    #[test]
    fn test_surgery_checklist_and_lifecycle() {
        let mut fx = fixture();
        let adm = register(&mut fx, patient("M"), Placement::Unassigned);
        let surgery = fx
            .engine
            .schedule_surgery(SurgeryRequest {
                name: Some("Arthroscopy".to_string()),
                admission_id: Some(adm.id),
                planned_date: Some("2025-01-12T14:00:00".parse().unwrap()),
                doctor: Some(fx.doctor.clone()),
                ..Default::default()
            })
            .unwrap();

        // 核查表不影响确认
        let confirmed = fx.engine.confirm_surgery(surgery.id).unwrap();
        assert_eq!(confirmed.status, SurgeryStatus::Confirmed);
        assert!(!confirmed.checklist_complete());

        for item in [ChecklistItem::Identity, ChecklistItem::Site, ChecklistItem::Allergy] {
            assert!(!fx.engine.set_checklist_item(surgery.id, item, true).unwrap());
        }
        assert!(fx.engine.set_checklist_item(surgery.id, ChecklistItem::Consent, true).unwrap());
        assert!(!fx.engine.set_checklist_item(surgery.id, ChecklistItem::Allergy, false).unwrap());

        assert_eq!(fx.engine.complete_surgery(surgery.id).unwrap().status, SurgeryStatus::Done);
        // 已完成的手术可被重新确认
        assert_eq!(fx.engine.confirm_surgery(surgery.id).unwrap().status, SurgeryStatus::Confirmed);
        assert_eq!(fx.engine.cancel_surgery(surgery.id).unwrap().status, SurgeryStatus::Cancelled);
    }

    #[test]
    fn test_surgery_requires_existing_admission() {
        let mut fx = fixture();
        let result = fx.engine.schedule_surgery(SurgeryRequest {
            name: Some("Biopsy".to_string()),
            admission_id: Some(Uuid::new_v4()),
            planned_date: Some("2025-01-12T14:00:00".parse().unwrap()),
            doctor: Some(fx.doctor.clone()),
            ..Default::default()
        });
        assert!(matches!(result, Err(InpatientError::NotFound(_))));
    }

    #[test]
    fn test_remove_surgery_cascades() {
        let mut fx = fixture();
        let adm = register(&mut fx, patient("N"), Placement::Unassigned);
        let surgery = fx
            .engine
            .schedule_surgery(SurgeryRequest {
                name: Some("Biopsy".to_string()),
                admission_id: Some(adm.id),
                planned_date: Some("2025-01-12T14:00:00".parse().unwrap()),
                doctor: Some(fx.doctor.clone()),
                ..Default::default()
            })
            .unwrap();
        fx.engine
            .add_team_member(surgery.id, TeamMember { employee: fx.doctor.clone(), role: TeamRole::Surgeon })
            .unwrap();

        let removed = fx.engine.remove_surgery(surgery.id).unwrap();
        assert_eq!(removed.team.len(), 1);
        assert!(fx.engine.store().surgery(surgery.id).is_none());
        assert!(fx.engine.store().surgeries_for_admission(adm.id).is_empty());
    }

    #[test]
    fn test_outpatient_history_toggle() {
        let mut fx = fixture();
        let adm = register(&mut fx, patient("O"), Placement::Unassigned);
        fx.engine
            .add_prescription(adm.id, PrescriptionLine {
                medicine: product("Old line", 1),
                quantity: Decimal::ONE,
                intakes: 1,
                time: None,
                note: None,
            })
            .unwrap();

        let history = vec![PrescriptionLine {
            medicine: product("Metformin", 5),
            quantity: Decimal::from(30),
            intakes: 2,
            time: Some("morning".to_string()),
            note: None,
        }];

        let updated = fx.engine.set_outpatient_history(adm.id, true, &history).unwrap();
        assert_eq!(updated.prescriptions.len(), 1);
        assert_eq!(updated.prescriptions[0].medicine.name, "Metformin");

        let updated = fx.engine.set_outpatient_history(adm.id, false, &history).unwrap();
        assert!(updated.prescriptions.is_empty());
    }

    #[test]
    fn test_search_and_doctor_dashboard() {
        let mut fx = fixture();
        let bed_id = fx.bed_id;
        let a = register(&mut fx, patient("Hugo Lambert"), Placement::Bed(bed_id));
        let room_id = fx.room_id;
        let b = register(&mut fx, patient("Ines Fontaine"), Placement::Room(room_id));
        fx.engine.admit(a.id).unwrap();
        fx.engine.discharge(b.id).unwrap();

        let all = fx.engine.search_inpatients(&InpatientSearch::default());
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].ward_no.as_deref(), Some("W3"));
        assert_eq!(all[0].bed_name.as_deref(), Some("B-07"));

        let archived = fx.engine.search_inpatients(&InpatientSearch { text: None, include_archived: true });
        assert_eq!(archived.len(), 2);

        let by_name = fx.engine.search_inpatients(&InpatientSearch {
            text: Some("lambert".to_string()),
            include_archived: true,
        });
        assert_eq!(by_name.len(), 1);
        let by_status = fx.engine.search_inpatients(&InpatientSearch {
            text: Some("dis".to_string()),
            include_archived: true,
        });
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].code, b.code);
        let by_date = fx.engine.search_inpatients(&InpatientSearch {
            text: Some("2025-01-08".to_string()),
            include_archived: false,
        });
        assert_eq!(by_date.len(), 1);

        let list = fx.engine.inpatient_list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].admission_type, "Emergency Admission");

        fx.engine
            .schedule_surgery(SurgeryRequest {
                name: Some("Knee".to_string()),
                admission_id: Some(a.id),
                planned_date: Some("2025-01-11T09:00:00".parse().unwrap()),
                doctor: Some(fx.doctor.clone()),
                ..Default::default()
            })
            .unwrap();
        fx.engine
            .schedule_surgery(SurgeryRequest {
                name: Some("Past".to_string()),
                admission_id: Some(a.id),
                planned_date: Some("2025-01-02T09:00:00".parse().unwrap()),
                doctor: Some(fx.doctor.clone()),
                ..Default::default()
            })
            .unwrap();

        let caller = Caller { user_id: fx.doctor.user_id.unwrap(), employee_id: Some(fx.doctor.id) };
        let slots = fx.engine.doctor_surgeries(&caller);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].patient_name.as_deref(), Some("Hugo Lambert"));
        assert_eq!(slots[0].state, "Draft");

        let dashboard = fx.engine.doctor_dashboard(&caller);
        assert_eq!(dashboard.surgeries_count, 1);
        assert_eq!(dashboard.upcoming[0].surgery_name, "Knee");
        assert_eq!(dashboard.admitted_patients, 1);

        let stranger = Caller { user_id: Uuid::new_v4(), employee_id: Some(Uuid::new_v4()) };
        assert!(fx.engine.doctor_surgeries(&stranger).is_empty());
    }
}
