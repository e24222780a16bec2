// 🧪 In-memory record store
//
// Keeps databases as ordered lists of page ids so queries return records in
// insertion order, the way a remote store returns its default ordering.
// Supports injecting failures to drive the retry paths.

use super::{FieldAssignment, Filter, Record, RecordStore};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    /// database id -> record ids in store order
    databases: HashMap<String, Vec<String>>,
    records: HashMap<String, Record>,
    /// Remaining calls that should fail before calls succeed again
    failures_pending: usize,
    updates: Vec<(String, Vec<FieldAssignment>)>,
    calls: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to a database (later inserts sort after earlier ones)
    pub async fn insert(&self, database_id: &str, record: Record) {
        let mut state = self.state.lock().await;
        state
            .databases
            .entry(database_id.to_string())
            .or_default()
            .push(record.id.clone());
        state.records.insert(record.id.clone(), record);
    }

    pub async fn get(&self, record_id: &str) -> Option<Record> {
        self.state.lock().await.records.get(record_id).cloned()
    }

    /// Overwrite a record in place, as a concurrent writer would
    pub async fn replace(&self, record: Record) {
        self.state.lock().await.records.insert(record.id.clone(), record);
    }

    /// Make the next `count` store calls fail with a remote error
    pub async fn fail_next(&self, count: usize) {
        self.state.lock().await.failures_pending = count;
    }

    /// Every successful update, in call order
    pub async fn updates(&self) -> Vec<(String, Vec<FieldAssignment>)> {
        self.state.lock().await.updates.clone()
    }

    /// Number of store calls made so far, failed ones included
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls
    }

    fn begin_call(state: &mut State, operation: &'static str) -> SyncResult<()> {
        state.calls += 1;
        if state.failures_pending > 0 {
            state.failures_pending -= 1;
            return Err(SyncError::Remote {
                operation,
                status: Some(503),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn retrieve_record(&self, record_id: &str) -> SyncResult<Record> {
        let mut state = self.state.lock().await;
        Self::begin_call(&mut state, "retrieve page")?;

        state.records.get(record_id).cloned().ok_or_else(|| SyncError::Remote {
            operation: "retrieve page",
            status: Some(404),
            message: format!("Could not find page with ID: {record_id}"),
        })
    }

    async fn query_records(&self, database_id: &str, filter: &Filter) -> SyncResult<Vec<Record>> {
        let mut state = self.state.lock().await;
        Self::begin_call(&mut state, "query database")?;

        let ids = state.databases.get(database_id).ok_or_else(|| SyncError::Remote {
            operation: "query database",
            status: Some(404),
            message: format!("Could not find database with ID: {database_id}"),
        })?;

        Ok(ids
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn update_record(&self, record_id: &str, assignments: &[FieldAssignment]) -> SyncResult<()> {
        let mut state = self.state.lock().await;
        Self::begin_call(&mut state, "update page")?;

        let record = state.records.get_mut(record_id).ok_or_else(|| SyncError::Remote {
            operation: "update page",
            status: Some(404),
            message: format!("Could not find page with ID: {record_id}"),
        })?;
        for assignment in assignments {
            record
                .properties
                .insert(assignment.property().to_string(), assignment.to_property_value());
        }

        state.updates.push((record_id.to_string(), assignments.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PropertyValue;

    #[tokio::test]
    async fn test_query_preserves_insert_order() {
        let store = InMemoryStore::new();
        for id in ["b", "a", "c"] {
            store
                .insert("db", Record::new(id).with_property("Month", PropertyValue::relation(&[])))
                .await;
        }

        let records = store
            .query_records("db", &Filter::relation_is_empty("Month"))
            .await
            .unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let store = InMemoryStore::new();
        store
            .insert(
                "db",
                Record::new("tx")
                    .with_property("Name", PropertyValue::title("Salary"))
                    .with_property("Category", PropertyValue::relation(&[])),
            )
            .await;

        store
            .update_record("tx", &[FieldAssignment::relation("Category", "c-1")])
            .await
            .unwrap();

        let record = store.get("tx").await.unwrap();
        assert_eq!(record.text("Name"), Some("Salary".to_string()));
        assert_eq!(record.relation_ids("Category"), vec!["c-1".to_string()]);
        assert_eq!(store.updates().await.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures_then_recovery() {
        let store = InMemoryStore::new();
        store.insert("db", Record::new("tx")).await;
        store.fail_next(2).await;

        assert!(store.retrieve_record("tx").await.is_err());
        assert!(store.retrieve_record("tx").await.is_err());
        assert!(store.retrieve_record("tx").await.is_ok());
        assert_eq!(store.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_unknown_database_is_remote_error() {
        let store = InMemoryStore::new();
        let err = store
            .query_records("nope", &Filter::relation_is_empty("Month"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
