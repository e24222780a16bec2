// 🔗 Month Linker - attach each transaction to its Month page
//
// Join: Transaction."Month Text" == Month."Month Text" (exact string match)
//
// Write-if-empty: the transaction is re-read right before the update and
// left alone if its Month relation was filled in the meantime. Together
// with the "relation is empty" query this makes the pass idempotent, so a
// failed pass can simply be run again from the start.

use crate::error::SyncResult;
use crate::records::{MonthRecord, TransactionRecord, MONTH_PROPERTY, MONTH_TEXT_PROPERTY};
use crate::report::PassReport;
use crate::scheduler::SyncPass;
use crate::store::{FieldAssignment, Filter, RecordStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub const MONTHS_PASS: &str = "months";

pub struct MonthLinker {
    store: Arc<dyn RecordStore>,
    transactions_database_id: String,
    months_database_id: String,
}

impl MonthLinker {
    pub fn new(store: Arc<dyn RecordStore>, transactions_database_id: &str, months_database_id: &str) -> Self {
        MonthLinker {
            store,
            transactions_database_id: transactions_database_id.to_string(),
            months_database_id: months_database_id.to_string(),
        }
    }

    /// Link every unlinked transaction to the first Month page with the same
    /// month text. Any store failure aborts the remaining records.
    pub async fn link_months(&self, attempt: u32) -> SyncResult<PassReport> {
        info!(attempt, "Watching \"Transactions\" database for unlinked months");
        let mut report = PassReport::start(MONTHS_PASS, attempt);

        let unlinked = self
            .store
            .query_records(&self.transactions_database_id, &Filter::relation_is_empty(MONTH_PROPERTY))
            .await?;
        report.examined = unlinked.len();
        info!(count = unlinked.len(), "Found transactions without a Month");

        for record in &unlinked {
            let tx = TransactionRecord::from(record);

            let Some(month_text) = tx.month_text.as_deref() else {
                debug!(transaction = %tx.id, "No month text, nothing to match");
                report.no_match += 1;
                continue;
            };

            debug!(transaction = %tx.id, month_text, "Checking for matching month");
            let matches = self
                .store
                .query_records(
                    &self.months_database_id,
                    &Filter::formula_text_equals(MONTH_TEXT_PROPERTY, month_text),
                )
                .await?;

            // Store order decides between duplicates.
            let Some(month) = matches.first().map(MonthRecord::from) else {
                info!(transaction = %tx.id, month_text, "No matching month found");
                report.no_match += 1;
                continue;
            };

            if self.link_if_empty(&tx.id, &month.id).await? {
                info!(transaction = %tx.id, month = %month.id, "Linked transaction to month");
                report.linked += 1;
            } else {
                info!(transaction = %tx.id, "Month was set concurrently, leaving it");
                report.already_linked += 1;
            }
        }

        let report = report.finish();
        info!("{}", report.summary());
        Ok(report)
    }

    /// Re-read the transaction and write the relation only if still empty.
    async fn link_if_empty(&self, transaction_id: &str, month_id: &str) -> SyncResult<bool> {
        let current = self.store.retrieve_record(transaction_id).await?;
        if !current.relation_is_empty(MONTH_PROPERTY) {
            return Ok(false);
        }

        self.store
            .update_record(transaction_id, &[FieldAssignment::relation(MONTH_PROPERTY, month_id)])
            .await?;
        Ok(true)
    }
}

#[async_trait]
impl SyncPass for MonthLinker {
    fn name(&self) -> &str {
        MONTHS_PASS
    }

    async fn run(&self, attempt: u32) -> SyncResult<PassReport> {
        self.link_months(attempt).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
