// 📄 Typed views over store records
//
// Transactions carry two relation slots (Month, Category) and two join keys
// (Month Text formula, Name title). Months and Categories are only ever
// matched against, never written.

use crate::store::Record;
use serde::Serialize;

pub const MONTH_PROPERTY: &str = "Month";
pub const MONTH_TEXT_PROPERTY: &str = "Month Text";
pub const CATEGORY_PROPERTY: &str = "Category";
pub const NAME_PROPERTY: &str = "Name";

// ============================================================================
// TRANSACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub id: String,
    /// Linked Month ids (empty = unlinked)
    pub month: Vec<String>,
    /// Join key against MonthRecord::month_text
    pub month_text: Option<String>,
    /// Linked Category ids (empty = uncategorized)
    pub category: Vec<String>,
    /// Join key against CategoryRecord::name
    pub name: Option<String>,
}

impl TransactionRecord {
    pub fn is_month_linked(&self) -> bool {
        !self.month.is_empty()
    }

    pub fn is_categorized(&self) -> bool {
        !self.category.is_empty()
    }
}

impl From<&Record> for TransactionRecord {
    fn from(record: &Record) -> Self {
        TransactionRecord {
            id: record.id.clone(),
            month: record.relation_ids(MONTH_PROPERTY),
            month_text: non_empty(record.text(MONTH_TEXT_PROPERTY)),
            category: record.relation_ids(CATEGORY_PROPERTY),
            name: non_empty(record.text(NAME_PROPERTY)),
        }
    }
}

// ============================================================================
// MONTH / CATEGORY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthRecord {
    pub id: String,
    pub month_text: Option<String>,
}

impl From<&Record> for MonthRecord {
    fn from(record: &Record) -> Self {
        MonthRecord {
            id: record.id.clone(),
            month_text: non_empty(record.text(MONTH_TEXT_PROPERTY)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRecord {
    pub id: String,
    pub name: Option<String>,
}

impl From<&Record> for CategoryRecord {
    fn from(record: &Record) -> Self {
        CategoryRecord {
            id: record.id.clone(),
            name: non_empty(record.text(NAME_PROPERTY)),
        }
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.is_empty())
}
