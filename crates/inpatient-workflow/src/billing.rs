//! 住院账单行汇总
//!
//! 顺序：住院费、临时收费、未开票化验、处方药品、手术项目及耗材、
//! 该患者草稿发票中的可合并行。

use inpatient_core::{Admission, DraftLine, InvoiceLine, RentBreakdown, Surgery};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// 汇总输入
#[derive(Debug)]
pub struct InvoiceInput<'a> {
    pub admission: &'a Admission,
    pub rent: RentBreakdown,
    pub surgeries: &'a [&'a Surgery],
    pub draft_lines: &'a [DraftLine],
    pub rent_line_label: &'a str,
}

/// 开票结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub document_id: Uuid,
    pub reference: String,
    pub line_count: usize,
    pub total: Decimal,
    pub cancelled_drafts: Vec<Uuid>,
}

/// 汇总账单行
pub fn assemble_invoice_lines(input: &InvoiceInput<'_>) -> Vec<InvoiceLine> {
    let mut lines = Vec::new();
    let admission = input.admission;
    let days = Decimal::from(input.rent.admit_days);

    // 床位费优先，其次病房费
    // 单价取日租金、数量取住院天数；单价不能用租金总额，否则天数被重复计算
    if !input.rent.bed_rent_amount.is_zero() || !input.rent.room_rent_amount.is_zero() {
        lines.push(InvoiceLine::new(input.rent_line_label, input.rent.daily_rate, days));
    }

    for payment in &admission.payments {
        lines.push(
            InvoiceLine::new(payment.name.clone(), payment.subtotal, Decimal::ONE)
                .with_taxes(payment.tax_ids.clone()),
        );
    }

    for test in admission.lab_tests.iter().filter(|t| t.invoice_id.is_none()) {
        lines.push(InvoiceLine::new(test.name.clone(), test.total_price, Decimal::ONE));
    }

    for line in &admission.prescriptions {
        lines.push(
            InvoiceLine::new(line.medicine.name.clone(), line.medicine.list_price, line.quantity)
                .with_product(line.medicine.id),
        );
    }

    for surgery in input.surgeries {
        if let Some(act) = &surgery.surgery_product {
            let name = if act.name.is_empty() { surgery.name.clone() } else { act.name.clone() };
            lines.push(InvoiceLine::new(name, act.list_price, Decimal::ONE).with_product(act.id));
        }
        for consumable in &surgery.consumables {
            lines.push(
                InvoiceLine::new(consumable.product.name.clone(), consumable.product.list_price, consumable.quantity)
                    .with_product(consumable.product.id),
            );
        }
    }

    for draft in input.draft_lines {
        lines.push(InvoiceLine::new(
            draft.line.description.clone(),
            draft.line.unit_price,
            draft.line.quantity,
        ));
    }

    lines
}

/// 需要作废的草稿账单，按首次出现顺序去重
pub fn drafts_to_cancel(draft_lines: &[DraftLine]) -> Vec<Uuid> {
    let mut seen = BTreeSet::new();
    draft_lines
        .iter()
        .filter(|d| seen.insert(d.document_id))
        .map(|d| d.document_id)
        .collect()
}
