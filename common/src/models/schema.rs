//! Schema graph models.
//!
//! Normalized workspace/database/table records plus the relationship edges
//! derived from `link_row` fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::utils::coerce_id;

/// Field type that links rows of one table to rows of another.
pub const LINK_ROW_FIELD: &str = "link_row";

/// Target name used when a link field carries no nested table descriptor.
pub const UNKNOWN_TABLE_NAME: &str = "Unknown";

/// A Baserow workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Workspace {
    pub id: i64,
    pub name: String,
}

/// Summary of a database application inside a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Database {
    pub id: i64,
    pub name: String,
    pub workspace_id: i64,
    pub workspace_name: String,
    /// False when the table listing failed or returned nothing.
    pub has_tables: bool,
    pub table_count: usize,
}

/// A table annotated with its owning database and workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Table {
    pub id: i64,
    pub name: String,
    pub database_id: i64,
    pub database_name: String,
    pub workspace_id: i64,
    pub workspace_name: String,
    #[schema(value_type = Vec<Object>)]
    pub fields: Vec<Field>,
}

/// A field record as returned by Baserow.
///
/// Fields are kept opaque and serialized back unchanged; only the handful of
/// keys needed to derive relationships are interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Field(pub Map<String, Value>);

impl Field {
    /// Wraps a JSON value, returning `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(coerce_id)
    }

    pub fn name(&self) -> &str {
        self.0.get("name").and_then(Value::as_str).unwrap_or_default()
    }

    /// The field type, e.g. `text` or `link_row`.
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn is_link_row(&self) -> bool {
        self.kind() == Some(LINK_ROW_FIELD)
    }

    /// Id of the table a link field points at.
    pub fn link_row_table_id(&self) -> Option<i64> {
        self.0.get("link_row_table_id").and_then(coerce_id)
    }

    /// Name of the linked table from the nested `link_row_table` descriptor.
    pub fn link_row_table_name(&self) -> Option<&str> {
        self.0
            .get("link_row_table")
            .and_then(|t| t.get("name"))
            .and_then(Value::as_str)
    }
}

/// A directed edge from the table owning a link field to the linked table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Relationship {
    pub source_table_id: i64,
    pub source_table_name: String,
    pub target_table_id: i64,
    pub target_table_name: String,
    pub field_id: i64,
    pub field_name: String,
}

impl Relationship {
    /// Derives the edge for a link field of `table`.
    ///
    /// Returns `None` for non-link fields and for link fields missing either
    /// their own id or the target table id.
    pub fn from_link_field(table: &Table, field: &Field) -> Option<Self> {
        if !field.is_link_row() {
            return None;
        }

        Some(Self {
            source_table_id: table.id,
            source_table_name: table.name.clone(),
            target_table_id: field.link_row_table_id()?,
            target_table_name: field
                .link_row_table_name()
                .unwrap_or(UNKNOWN_TABLE_NAME)
                .to_string(),
            field_id: field.id()?,
            field_name: field.name().to_string(),
        })
    }
}

/// The consolidated graph returned by `/api/erd`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErdGraph {
    pub workspaces: Vec<Workspace>,
    pub databases: Vec<Database>,
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}
