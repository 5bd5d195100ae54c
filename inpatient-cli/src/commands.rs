//! 子命令定义与执行

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Subcommand};
use inpatient_core::{
    Bed, BedType, ChecklistItem, Consumable, LabTest, OperationTheater, PaymentLine, Placement, PrescriptionLine, Room,
    TeamMember,
};
use inpatient_workflow::{AdmissionRequest, Caller, InpatientEngine, InpatientSearch, OperativeNotes, SurgeryRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// 住院命令
#[derive(Subcommand, Debug)]
pub enum Command {
    /// 登记住院（JSON 格式的登记请求）
    Register {
        #[arg(long)]
        request: String,
    },
    /// 添加床位（JSON）
    AddBed {
        #[arg(long)]
        bed: String,
    },
    /// 添加病房（JSON）
    AddRoom {
        #[arg(long)]
        room: String,
    },
    /// 添加手术室（JSON）
    AddTheater {
        #[arg(long)]
        theater: String,
    },
    /// 分配床位或病房，都不指定时取消分配
    Assign {
        /// 住院序列号或ID
        admission: String,
        #[arg(long, conflicts_with = "room")]
        bed: Option<Uuid>,
        #[arg(long)]
        room: Option<Uuid>,
    },
    /// 预留床位/病房
    Reserve { admission: String },
    /// 入院
    Admit { admission: String },
    /// 开票
    Invoice { admission: String },
    /// 出院
    Discharge { admission: String },
    /// 设置出院日期（YYYY-MM-DD）
    SetDischargeDate { admission: String, date: NaiveDate },
    /// 添加临时收费（JSON）
    AddPayment {
        admission: String,
        #[arg(long)]
        payment: String,
    },
    /// 添加化验项目（JSON）
    AddLabTest {
        admission: String,
        #[arg(long)]
        test: String,
    },
    /// 添加处方行（JSON）
    AddPrescription {
        admission: String,
        #[arg(long)]
        line: String,
    },
    /// 导入或清除门诊处方历史（JSON 数组）
    OutpatientHistory {
        admission: String,
        #[arg(long, action = ArgAction::Set)]
        enable: bool,
        #[arg(long, default_value = "[]")]
        lines: String,
    },
    /// 住院天数与住院费
    Rent { admission: String },
    /// 处方打印数据
    PrintPrescription { admission: String },
    /// 该住院记录的账单
    Invoices { admission: String },
    /// 指定床型下的可用床位和病房
    Beds {
        #[arg(long)]
        bed_type: Option<String>,
    },
    /// 检索住院记录
    Search {
        text: Option<String>,
        /// 包含已出院归档的记录
        #[arg(long)]
        archived: bool,
    },
    /// 在院患者列表
    List,
    /// 手术管理
    #[command(subcommand)]
    Surgery(SurgeryCommand),
    /// 医生看板
    Dashboard {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        employee: Option<Uuid>,
    },
}

/// 手术命令
#[derive(Subcommand, Debug)]
pub enum SurgeryCommand {
    /// 安排手术（JSON 格式的排期请求）
    Schedule {
        #[arg(long)]
        request: String,
    },
    /// 设置术前核查项：identity、site、allergy、consent
    Check {
        surgery: Uuid,
        item: String,
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        value: bool,
    },
    Confirm { surgery: Uuid },
    Done { surgery: Uuid },
    Cancel { surgery: Uuid },
    Remove { surgery: Uuid },
    /// 添加团队成员（JSON）
    AddMember {
        surgery: Uuid,
        #[arg(long)]
        member: String,
    },
    /// 添加耗材（JSON）
    AddConsumable {
        surgery: Uuid,
        #[arg(long)]
        consumable: String,
    },
    /// 术中及术后记录（JSON）
    Notes {
        surgery: Uuid,
        #[arg(long)]
        notes: String,
    },
    /// 手术室排期
    Theater { theater: Uuid },
}

/// 命令执行结果
#[derive(Debug)]
pub struct Output {
    pub value: Value,
    /// 是否需要写回快照
    pub mutated: bool,
}

impl Output {
    fn read<T: Serialize>(value: T) -> Result<Self> {
        Ok(Self {
            value: serde_json::to_value(value).context("Failed to serialize output")?,
            mutated: false,
        })
    }

    fn write<T: Serialize>(value: T) -> Result<Self> {
        Ok(Self {
            value: serde_json::to_value(value).context("Failed to serialize output")?,
            mutated: true,
        })
    }
}

fn parse_json<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("Invalid {} JSON", what))
}

/// 按枚举的序列化名称解析
fn parse_name<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
    serde_json::from_value(Value::String(raw.to_string())).with_context(|| format!("Unknown {}: {}", what, raw))
}

/// 住院序列号优先，其次按ID解析
fn resolve_admission(engine: &InpatientEngine, key: &str) -> Result<Uuid> {
    if let Some(admission) = engine.store().admission_by_code(key) {
        return Ok(admission.id);
    }
    Uuid::parse_str(key).with_context(|| format!("No admission with code or id {}", key))
}

/// 执行命令
pub fn run(engine: &mut InpatientEngine, command: Command) -> Result<Output> {
    match command {
        Command::Register { request } => {
            let request: AdmissionRequest = parse_json(&request, "admission request")?;
            let outcome = engine.register_admission(request)?;
            Output::write(outcome)
        }
        Command::AddBed { bed } => {
            let bed: Bed = parse_json(&bed, "bed")?;
            engine.store_mut().resources_mut().add_bed(bed.clone());
            Output::write(bed)
        }
        Command::AddRoom { room } => {
            let room: Room = parse_json(&room, "room")?;
            engine.store_mut().resources_mut().add_room(room.clone());
            Output::write(room)
        }
        Command::AddTheater { theater } => {
            let theater: OperationTheater = parse_json(&theater, "operation theater")?;
            engine.store_mut().resources_mut().add_theater(theater.clone());
            Output::write(theater)
        }
        Command::Assign { admission, bed, room } => {
            let id = resolve_admission(engine, &admission)?;
            let placement = match (bed, room) {
                (Some(bed), _) => Placement::Bed(bed),
                (None, Some(room)) => Placement::Room(room),
                (None, None) => Placement::Unassigned,
            };
            Output::write(engine.assign_placement(id, placement)?)
        }
        Command::Reserve { admission } => {
            let id = resolve_admission(engine, &admission)?;
            Output::write(engine.reserve(id)?)
        }
        Command::Admit { admission } => {
            let id = resolve_admission(engine, &admission)?;
            Output::write(engine.admit(id)?)
        }
        Command::Invoice { admission } => {
            let id = resolve_admission(engine, &admission)?;
            Output::write(engine.invoice(id)?)
        }
        Command::Discharge { admission } => {
            let id = resolve_admission(engine, &admission)?;
            Output::write(engine.discharge(id)?)
        }
        Command::SetDischargeDate { admission, date } => {
            let id = resolve_admission(engine, &admission)?;
            Output::write(engine.set_discharge_date(id, Some(date))?)
        }
        Command::AddPayment { admission, payment } => {
            let id = resolve_admission(engine, &admission)?;
            let payment: PaymentLine = parse_json(&payment, "payment")?;
            Output::write(engine.add_payment(id, payment)?)
        }
        Command::AddLabTest { admission, test } => {
            let id = resolve_admission(engine, &admission)?;
            let test: LabTest = parse_json(&test, "lab test")?;
            Output::write(engine.add_lab_test(id, test)?)
        }
        Command::AddPrescription { admission, line } => {
            let id = resolve_admission(engine, &admission)?;
            let line: PrescriptionLine = parse_json(&line, "prescription line")?;
            Output::write(engine.add_prescription(id, line)?)
        }
        Command::OutpatientHistory { admission, enable, lines } => {
            let id = resolve_admission(engine, &admission)?;
            let lines: Vec<PrescriptionLine> = parse_json(&lines, "prescription history")?;
            Output::write(engine.set_outpatient_history(id, enable, &lines)?)
        }
        Command::Rent { admission } => {
            let id = resolve_admission(engine, &admission)?;
            Output::read(engine.rent(id)?)
        }
        Command::PrintPrescription { admission } => {
            let id = resolve_admission(engine, &admission)?;
            Output::read(engine.print_prescription(id)?)
        }
        Command::Invoices { admission } => {
            let id = resolve_admission(engine, &admission)?;
            Output::read(engine.invoices_for(id)?)
        }
        Command::Beds { bed_type } => {
            let bed_type: Option<BedType> = bed_type.map(|t| parse_name(&t, "bed type")).transpose()?;
            Output::read(engine.available_placements(bed_type))
        }
        Command::Search { text, archived } => Output::read(engine.search_inpatients(&InpatientSearch {
            text,
            include_archived: archived,
        })),
        Command::List => Output::read(engine.inpatient_list()),
        Command::Surgery(command) => run_surgery(engine, command),
        Command::Dashboard { user, employee } => Output::read(engine.doctor_dashboard(&Caller {
            user_id: user,
            employee_id: employee,
        })),
    }
}

fn run_surgery(engine: &mut InpatientEngine, command: SurgeryCommand) -> Result<Output> {
    match command {
        SurgeryCommand::Schedule { request } => {
            let request: SurgeryRequest = parse_json(&request, "surgery request")?;
            Output::write(engine.schedule_surgery(request)?)
        }
        SurgeryCommand::Check { surgery, item, value } => {
            let item: ChecklistItem = parse_name(&item, "checklist item")?;
            let complete = engine.set_checklist_item(surgery, item, value)?;
            Output::write(serde_json::json!({ "surgery": surgery, "checklist_complete": complete }))
        }
        SurgeryCommand::Confirm { surgery } => Output::write(engine.confirm_surgery(surgery)?),
        SurgeryCommand::Done { surgery } => Output::write(engine.complete_surgery(surgery)?),
        SurgeryCommand::Cancel { surgery } => Output::write(engine.cancel_surgery(surgery)?),
        SurgeryCommand::Remove { surgery } => Output::write(engine.remove_surgery(surgery)?),
        SurgeryCommand::AddMember { surgery, member } => {
            let member: TeamMember = parse_json(&member, "team member")?;
            Output::write(engine.add_team_member(surgery, member)?)
        }
        SurgeryCommand::AddConsumable { surgery, consumable } => {
            let consumable: Consumable = parse_json(&consumable, "consumable")?;
            Output::write(engine.add_consumable(surgery, consumable)?)
        }
        SurgeryCommand::Notes { surgery, notes } => {
            let notes: OperativeNotes = parse_json(&notes, "operative notes")?;
            Output::write(engine.record_operative_notes(surgery, notes)?)
        }
        SurgeryCommand::Theater { theater } => Output::read(engine.store().surgeries_in_theater(theater)),
    }
}
