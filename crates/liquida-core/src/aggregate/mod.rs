pub mod ledger;

use crate::error::LiquidaError;
use crate::model::{
    CpnRecord, ExpenseRecord, LinkedLedger, NormalizedDocument, SaleRecord, SettlementLink,
};
use ledger::Ledger;
use serde::Serialize;
use std::fmt;

/// Why a document contributed nothing to the ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    UnreadableDocument { detail: String },
    UnclassifiedDocument,
    ExtractionRuleMissing { variant: String },
    IncompleteRecord { missing: Vec<String> },
    Timeout { seconds: u64 },
    /// The worker processing the document crashed; an internal defect.
    WorkerFailed { detail: String },
}

impl SkipReason {
    /// Per-document errors become skip reasons. An empty batch or a contract
    /// violation is returned unchanged: those abort the run.
    pub fn from_error(err: LiquidaError) -> Result<SkipReason, LiquidaError> {
        Ok(match err {
            LiquidaError::EmptyBatch | LiquidaError::ContractViolation(_) => return Err(err),
            LiquidaError::UnreadableDocument(detail) => SkipReason::UnreadableDocument { detail },
            LiquidaError::UnclassifiedDocument => SkipReason::UnclassifiedDocument,
            LiquidaError::ExtractionRuleMissing { variant } => {
                SkipReason::ExtractionRuleMissing { variant }
            }
            LiquidaError::IncompleteRecord { missing } => SkipReason::IncompleteRecord { missing },
            LiquidaError::Timeout { seconds } => SkipReason::Timeout { seconds },
            LiquidaError::WorkerFailed(detail) => SkipReason::WorkerFailed { detail },
            other => SkipReason::UnreadableDocument {
                detail: other.to_string(),
            },
        })
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnreadableDocument { detail } => write!(f, "unreadable: {detail}"),
            SkipReason::UnclassifiedDocument => write!(f, "unrecognised document layout"),
            SkipReason::ExtractionRuleMissing { variant } => {
                write!(f, "no extraction rules for layout '{variant}'")
            }
            SkipReason::IncompleteRecord { missing } => {
                write!(f, "missing or invalid: {}", missing.join(", "))
            }
            SkipReason::Timeout { seconds } => write!(f, "timed out after {seconds}s"),
            SkipReason::WorkerFailed { detail } => write!(f, "internal error: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub filename: String,
    pub reason: SkipReason,
}

/// The three ledgers of a batch plus the documents that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    pub sales: Ledger<SaleRecord>,
    pub cpn: Ledger<CpnRecord>,
    pub expenses: Ledger<ExpenseRecord>,
    pub skipped: Vec<SkippedDocument>,
}

/// Accumulates per-document outcomes across a batch, in submission order.
#[derive(Debug, Default)]
pub struct Aggregator {
    result: BatchResult,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one document's outcome. Fails only on a fatal error.
    pub fn accept(
        &mut self,
        filename: &str,
        outcome: Result<NormalizedDocument, LiquidaError>,
    ) -> Result<(), LiquidaError> {
        match outcome {
            Ok(doc) => {
                if let Some(sale) = doc.sale {
                    self.result.sales.upsert(sale);
                }
                if let Some(cpn) = doc.cpn {
                    self.result.cpn.upsert(cpn);
                }
                if let Some(expense) = doc.expense {
                    self.result.expenses.upsert(expense);
                }
                Ok(())
            }
            Err(err) => {
                let reason = SkipReason::from_error(err)?;
                match &reason {
                    SkipReason::ExtractionRuleMissing { .. } | SkipReason::WorkerFailed { .. } => {
                        tracing::error!(file = filename, %reason, "skipped document")
                    }
                    _ => tracing::warn!(file = filename, %reason, "skipped document"),
                }
                self.result.skipped.push(SkippedDocument {
                    filename: filename.to_string(),
                    reason,
                });
                Ok(())
            }
        }
    }

    /// Close the batch: link every expense to the sale or CPN with its
    /// settlement COE, now that all documents are in.
    pub fn finish(mut self) -> BatchResult {
        let BatchResult {
            sales,
            cpn,
            expenses,
            ..
        } = &mut self.result;

        for expense in expenses.iter_mut() {
            let Some(coe) = expense.settlement_coe.as_deref() else {
                continue;
            };
            expense.link = sales
                .iter()
                .find(|s| s.coe == coe)
                .map(|s| SettlementLink {
                    ledger: LinkedLedger::Sales,
                    source_id: s.source_id.clone(),
                    coe: s.coe.clone(),
                })
                .or_else(|| {
                    cpn.iter().find(|c| c.coe == coe).map(|c| SettlementLink {
                        ledger: LinkedLedger::Cpn,
                        source_id: c.source_id.clone(),
                        coe: c.coe.clone(),
                    })
                });
        }

        tracing::info!(
            sales = self.result.sales.len(),
            cpn = self.result.cpn.len(),
            expenses = self.result.expenses.len(),
            skipped = self.result.skipped.len(),
            "batch aggregated"
        );
        self.result
    }
}
