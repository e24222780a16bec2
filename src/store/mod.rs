// 🗃️ Remote Record Store - the seam between linking logic and Notion
//
// Three operations are all the linking passes need:
//   retrieve_record(id)              -> one page's current properties
//   query_records(database, filter)  -> pages matching a filter, store order
//   update_record(id, assignments)   -> partial update of named properties
//
// NotionClient talks to the real API; InMemoryStore backs the tests.

#[cfg(test)]
pub mod memory;
pub mod notion;

#[cfg(test)]
pub use memory::InMemoryStore;
pub use notion::NotionClient;

use crate::error::SyncResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

// ============================================================================
// PROPERTY VALUES
// ============================================================================

/// Reference to another page inside a relation property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    pub plain_text: String,
}

/// Computed formula result. Only the string form is used as a join key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormulaValue {
    String { string: Option<String> },
    Number { number: Option<f64> },
    Boolean { boolean: Option<bool> },
    #[serde(other)]
    Other,
}

/// One page property, tagged by its Notion type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Relation { relation: Vec<RelationRef> },
    Title { title: Vec<RichText> },
    RichText { rich_text: Vec<RichText> },
    Formula { formula: FormulaValue },
    #[serde(other)]
    Unsupported,
}

impl PropertyValue {
    pub fn relation(ids: &[&str]) -> Self {
        PropertyValue::Relation {
            relation: ids.iter().map(|id| RelationRef { id: id.to_string() }).collect(),
        }
    }

    pub fn title(text: &str) -> Self {
        PropertyValue::Title {
            title: vec![RichText { plain_text: text.to_string() }],
        }
    }

    pub fn formula_text(text: &str) -> Self {
        PropertyValue::Formula {
            formula: FormulaValue::String { string: Some(text.to_string()) },
        }
    }

    /// Text content of title, rich text and string formula properties.
    /// Title fragments are concatenated the way Notion renders them.
    pub fn as_text(&self) -> Option<String> {
        match self {
            PropertyValue::Title { title: parts } | PropertyValue::RichText { rich_text: parts } => {
                Some(parts.iter().map(|p| p.plain_text.as_str()).collect())
            }
            PropertyValue::Formula {
                formula: FormulaValue::String { string },
            } => string.clone(),
            _ => None,
        }
    }

    pub fn relation_ids(&self) -> Option<Vec<String>> {
        match self {
            PropertyValue::Relation { relation } => {
                Some(relation.iter().map(|r| r.id.clone()).collect())
            }
            _ => None,
        }
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// A page as returned by the store; unknown top-level fields are ignored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
}

impl Record {
    pub fn new(id: &str) -> Self {
        Record {
            id: id.to_string(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, name: &str, value: PropertyValue) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }

    pub fn text(&self, property: &str) -> Option<String> {
        self.properties.get(property).and_then(PropertyValue::as_text)
    }

    /// Related ids; a missing property reads as an empty relation
    pub fn relation_ids(&self, property: &str) -> Vec<String> {
        self.properties
            .get(property)
            .and_then(PropertyValue::relation_ids)
            .unwrap_or_default()
    }

    pub fn relation_is_empty(&self, property: &str) -> bool {
        self.relation_ids(property).is_empty()
    }
}

// ============================================================================
// FILTERS
// ============================================================================

/// Query filter. Built fresh for every call, never shared or mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    RelationIsEmpty { property: String },
    FormulaTextEquals { property: String, value: String },
    TitleEquals { property: String, value: String },
}

impl Filter {
    pub fn relation_is_empty(property: &str) -> Self {
        Filter::RelationIsEmpty {
            property: property.to_string(),
        }
    }

    pub fn formula_text_equals(property: &str, value: &str) -> Self {
        Filter::FormulaTextEquals {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    pub fn title_equals(property: &str, value: &str) -> Self {
        Filter::TitleEquals {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    /// Notion database-query filter object
    pub fn to_json(&self) -> Value {
        match self {
            Filter::RelationIsEmpty { property } => json!({
                "property": property,
                "relation": { "is_empty": true },
            }),
            Filter::FormulaTextEquals { property, value } => json!({
                "property": property,
                "formula": { "string": { "equals": value } },
            }),
            Filter::TitleEquals { property, value } => json!({
                "property": property,
                "title": { "equals": value },
            }),
        }
    }

    /// Local evaluation with the same semantics the remote store applies:
    /// exact, case-sensitive equality; missing relation means empty.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::RelationIsEmpty { property } => record.relation_is_empty(property),
            Filter::FormulaTextEquals { property, value } => match record.properties.get(property) {
                Some(PropertyValue::Formula {
                    formula: FormulaValue::String { string: Some(s) },
                }) => s == value,
                _ => false,
            },
            Filter::TitleEquals { property, value } => match record.properties.get(property) {
                Some(prop @ PropertyValue::Title { .. }) => prop.as_text().as_deref() == Some(value.as_str()),
                _ => false,
            },
        }
    }
}

// ============================================================================
// UPDATES
// ============================================================================

/// One named property to overwrite in a partial update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAssignment {
    Relation { property: String, targets: Vec<String> },
}

impl FieldAssignment {
    pub fn relation(property: &str, target: &str) -> Self {
        FieldAssignment::Relation {
            property: property.to_string(),
            targets: vec![target.to_string()],
        }
    }

    pub fn property(&self) -> &str {
        match self {
            FieldAssignment::Relation { property, .. } => property,
        }
    }

    pub fn to_property_value(&self) -> PropertyValue {
        match self {
            FieldAssignment::Relation { targets, .. } => PropertyValue::Relation {
                relation: targets.iter().map(|id| RelationRef { id: id.clone() }).collect(),
            },
        }
    }

    /// Body fragment for a page PATCH
    pub fn to_json(&self) -> Value {
        match self {
            FieldAssignment::Relation { targets, .. } => json!({
                "type": "relation",
                "relation": targets.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>(),
            }),
        }
    }
}

// ============================================================================
// STORE TRAIT
// ============================================================================

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read one record's current property values
    async fn retrieve_record(&self, record_id: &str) -> SyncResult<Record>;

    /// All records of a database matching `filter`, in the store's order
    async fn query_records(&self, database_id: &str, filter: &Filter) -> SyncResult<Vec<Record>>;

    /// Overwrite only the named properties of a record
    async fn update_record(&self, record_id: &str, assignments: &[FieldAssignment]) -> SyncResult<()>;
}

// ============================================================================
// TESTS
// ============================================================================
