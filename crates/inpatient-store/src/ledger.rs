//! 进程内账务服务

use inpatient_core::{
    BillingDocument, BillingLedger, DocumentKind, DocumentStatus, DraftLine, InpatientError,
    NewBillingDocument, Result, SystemScope,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 按创建顺序保存账单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryLedger {
    currency: String,
    documents: Vec<BillingDocument>,
}

impl MemoryLedger {
    pub fn new(currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            documents: Vec::new(),
        }
    }

    pub fn set_currency(&mut self, currency: &str) {
        self.currency = currency.to_string();
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// 导入外部已有账单（如门诊草稿发票）
    pub fn insert_document(&mut self, document: BillingDocument) {
        self.documents.push(document);
    }

    pub fn document(&self, id: Uuid) -> Option<&BillingDocument> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn documents(&self) -> &[BillingDocument] {
        &self.documents
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new("EUR")
    }
}

impl BillingLedger for MemoryLedger {
    fn create_document(&mut self, document: NewBillingDocument) -> Result<Uuid> {
        if document.lines.is_empty() {
            tracing::warn!("Creating billing document {} without lines", document.reference);
        }

        let id = Uuid::new_v4();
        self.documents.push(BillingDocument {
            id,
            kind: DocumentKind::CustomerInvoice,
            status: DocumentStatus::Draft,
            patient_id: document.patient_id,
            reference: Some(document.reference.clone()),
            date: document.date,
            invoice_date: Some(document.date),
            currency: self.currency.clone(),
            lines: document.lines,
        });

        tracing::info!("Created billing document {} for reference {}", id, document.reference);
        Ok(id)
    }

    fn draft_lines_for_patient(&self, patient_id: Uuid) -> Vec<DraftLine> {
        self.documents
            .iter()
            .filter(|d| {
                d.patient_id == patient_id
                    && d.status == DocumentStatus::Draft
                    && d.kind == DocumentKind::CustomerInvoice
            })
            .flat_map(|d| {
                d.lines
                    .iter()
                    .filter(|l| l.tax_group.is_none() && l.due_date.is_none())
                    .map(move |l| DraftLine {
                        document_id: d.id,
                        line: l.clone(),
                    })
            })
            .collect()
    }

    fn cancel_document(&mut self, scope: &SystemScope, document_id: Uuid) -> Result<()> {
        let document = self
            .documents
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| InpatientError::NotFound(format!("Billing document {} not found", document_id)))?;

        document.status = DocumentStatus::Cancelled;
        tracing::info!("Cancelled billing document {} ({})", document_id, scope.reason());
        Ok(())
    }

    fn documents_by_reference(&self, reference: &str) -> Vec<&BillingDocument> {
        self.documents
            .iter()
            .filter(|d| d.reference.as_deref() == Some(reference))
            .collect()
    }
}
