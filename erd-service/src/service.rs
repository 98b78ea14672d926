//! Schema aggregation.
//!
//! Walks workspaces → databases → tables → fields and folds the results into
//! an [`ErdGraph`]. Only the workspace listing is fatal; every deeper level
//! that fails is logged and treated as empty for that branch.

use async_trait::async_trait;
use common::errors::AppResult;
use common::models::{Database, ErdGraph, Field, Relationship, Table, Workspace};
use common::utils::id_field;
use serde_json::Value;
use tracing::{info, warn};

/// Read access to the remote schema hierarchy.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Raw workspace records.
    async fn list_workspaces(&self) -> AppResult<Vec<Value>>;

    /// Raw database application records of a workspace.
    async fn list_databases(&self, workspace_id: i64) -> AppResult<Vec<Value>>;

    /// Raw table records of a database.
    async fn list_tables(&self, database_id: i64) -> AppResult<Vec<Value>>;

    /// Field records of a table.
    async fn list_fields(&self, table_id: i64) -> AppResult<Vec<Field>>;

    /// Best-effort display name of a database.
    async fn database_name(&self, database_id: i64) -> String;
}

/// Builds ERD payloads from a [`SchemaSource`].
pub struct ErdService<S> {
    source: S,
}

impl<S: SchemaSource> ErdService<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Walks the whole hierarchy and returns the consolidated graph.
    ///
    /// Output order follows discovery order; relationships are not deduplicated.
    pub async fn build_graph(&self) -> AppResult<ErdGraph> {
        info!("starting ERD data collection");
        let mut graph = ErdGraph::default();

        for raw in self.source.list_workspaces().await? {
            let Some(workspace) = parse_workspace(&raw) else {
                warn!(record = %raw, "skipping workspace without a usable id");
                continue;
            };

            for database in self.databases_of(&workspace).await {
                self.collect_database(&workspace, &database, &mut graph).await;
            }
            graph.workspaces.push(workspace);
        }

        info!(
            workspaces = graph.workspaces.len(),
            databases = graph.databases.len(),
            tables = graph.tables.len(),
            relationships = graph.relationships.len(),
            "finished collecting ERD data"
        );
        Ok(graph)
    }

    /// Raw table records of every database in every workspace.
    pub async fn all_tables(&self) -> AppResult<Vec<Value>> {
        let mut tables = Vec::new();

        for raw in self.source.list_workspaces().await? {
            let Some(workspace) = parse_workspace(&raw) else {
                continue;
            };
            for database in self.databases_of(&workspace).await {
                let Some(database_id) = id_field(&database, "id") else {
                    continue;
                };
                match self.source.list_tables(database_id).await {
                    Ok(found) => tables.extend(found),
                    Err(e) => warn!(database_id, error = %e, "failed to list tables"),
                }
            }
        }

        Ok(tables)
    }

    /// Fields of a single table.
    pub async fn fields(&self, table_id: i64) -> AppResult<Vec<Field>> {
        self.source.list_fields(table_id).await
    }

    async fn databases_of(&self, workspace: &Workspace) -> Vec<Value> {
        match self.source.list_databases(workspace.id).await {
            Ok(databases) => databases,
            Err(e) => {
                warn!(workspace_id = workspace.id, error = %e, "failed to list databases");
                Vec::new()
            }
        }
    }

    async fn collect_database(&self, workspace: &Workspace, raw: &Value, graph: &mut ErdGraph) {
        let Some(database_id) = id_field(raw, "id") else {
            warn!(workspace_id = workspace.id, record = %raw, "skipping database without a usable id");
            return;
        };

        let database_name = match raw.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.source.database_name(database_id).await,
        };

        let mut summary = Database {
            id: database_id,
            name: database_name,
            workspace_id: workspace.id,
            workspace_name: workspace.name.clone(),
            has_tables: false,
            table_count: 0,
        };

        let raw_tables = match self.source.list_tables(database_id).await {
            Ok(tables) => tables,
            Err(e) => {
                warn!(database_id, error = %e, "failed to list tables, recording database without tables");
                graph.databases.push(summary);
                return;
            }
        };

        for raw_table in &raw_tables {
            let Some(table) = self.collect_table(&summary, raw_table).await else {
                continue;
            };

            for field in &table.fields {
                match Relationship::from_link_field(&table, field) {
                    Some(relationship) => graph.relationships.push(relationship),
                    None if field.is_link_row() => warn!(
                        table_id = table.id,
                        field = %field.name(),
                        "skipping link field without id or target table"
                    ),
                    None => {}
                }
            }

            graph.tables.push(table);
            summary.table_count += 1;
        }

        summary.has_tables = summary.table_count > 0;
        graph.databases.push(summary);
    }

    async fn collect_table(&self, database: &Database, raw: &Value) -> Option<Table> {
        let Some(table_id) = id_field(raw, "id") else {
            warn!(database_id = database.id, record = %raw, "skipping table without a usable id");
            return None;
        };

        let fields = match self.source.list_fields(table_id).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(table_id, error = %e, "failed to list fields, keeping table without fields");
                Vec::new()
            }
        };

        Some(Table {
            id: table_id,
            name: string_field(raw, "name").unwrap_or_else(|| format!("Table {}", table_id)),
            database_id: database.id,
            database_name: database.name.clone(),
            workspace_id: database.workspace_id,
            workspace_name: database.workspace_name.clone(),
            fields,
        })
    }
}

fn parse_workspace(raw: &Value) -> Option<Workspace> {
    let id = id_field(raw, "id")?;
    Some(Workspace {
        id,
        name: string_field(raw, "name").unwrap_or_else(|| format!("Workspace {}", id)),
    })
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(String::from)
}
