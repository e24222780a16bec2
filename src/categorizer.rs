// 🏷️ Category Linker - attach transactions to their Category page
//
// Join: Transaction.Name == Category.Name (exact title match), but only for
// names the CategoryNameRegistry knows. Anything else is skipped silently.
//
// Unlike the Month Linker this writes straight after the lookup. Setting
// `recheck_before_write` adds the same re-read guard; see DESIGN.md for why
// it is off by default.

use crate::error::SyncResult;
use crate::records::{CategoryRecord, TransactionRecord, CATEGORY_PROPERTY, NAME_PROPERTY};
use crate::registry::CategoryNameRegistry;
use crate::report::PassReport;
use crate::scheduler::SyncPass;
use crate::store::{FieldAssignment, Filter, RecordStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub const CATEGORIES_PASS: &str = "categories";

pub struct CategoryLinker {
    store: Arc<dyn RecordStore>,
    registry: CategoryNameRegistry,
    transactions_database_id: String,
    categories_database_id: String,
    recheck_before_write: bool,
}

impl CategoryLinker {
    pub fn new(
        store: Arc<dyn RecordStore>,
        registry: CategoryNameRegistry,
        transactions_database_id: &str,
        categories_database_id: &str,
    ) -> Self {
        CategoryLinker {
            store,
            registry,
            transactions_database_id: transactions_database_id.to_string(),
            categories_database_id: categories_database_id.to_string(),
            recheck_before_write: false,
        }
    }

    /// Re-read each transaction before writing, like the Month Linker does
    pub fn with_recheck(mut self, recheck: bool) -> Self {
        self.recheck_before_write = recheck;
        self
    }

    pub fn registry(&self) -> &CategoryNameRegistry {
        &self.registry
    }

    /// Link every uncategorized transaction whose name is a registered
    /// category to the first Category page with that exact title.
    pub async fn link_categories(&self, attempt: u32) -> SyncResult<PassReport> {
        info!(attempt, "Linking categories to \"Transactions\" database");
        let mut report = PassReport::start(CATEGORIES_PASS, attempt);

        let uncategorized = self
            .store
            .query_records(&self.transactions_database_id, &Filter::relation_is_empty(CATEGORY_PROPERTY))
            .await?;
        report.examined = uncategorized.len();
        info!(count = uncategorized.len(), "Found transactions without a Category");

        for record in &uncategorized {
            let tx = TransactionRecord::from(record);

            let name = match tx.name.as_deref() {
                Some(name) if self.registry.contains(name) => name,
                _ => {
                    debug!(transaction = %tx.id, category_name = ?tx.name, "Name is not a known category");
                    report.unregistered += 1;
                    continue;
                }
            };

            let matches = self
                .store
                .query_records(&self.categories_database_id, &Filter::title_equals(NAME_PROPERTY, name))
                .await?;

            let Some(category) = matches.first().map(CategoryRecord::from) else {
                info!(transaction = %tx.id, category_name = name, "Registered category has no page");
                report.no_match += 1;
                continue;
            };

            if self.recheck_before_write {
                let current = self.store.retrieve_record(&tx.id).await?;
                if !current.relation_is_empty(CATEGORY_PROPERTY) {
                    info!(transaction = %tx.id, "Category was set concurrently, leaving it");
                    report.already_linked += 1;
                    continue;
                }
            }

            self.store
                .update_record(&tx.id, &[FieldAssignment::relation(CATEGORY_PROPERTY, &category.id)])
                .await?;
            info!(transaction = %tx.id, category = %category.id, category_name = name, "Linked transaction to category");
            report.linked += 1;
        }

        let report = report.finish();
        info!("{}", report.summary());
        Ok(report)
    }
}

#[async_trait]
impl SyncPass for CategoryLinker {
    fn name(&self) -> &str {
        CATEGORIES_PASS
    }

    async fn run(&self, attempt: u32) -> SyncResult<PassReport> {
        self.link_categories(attempt).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
