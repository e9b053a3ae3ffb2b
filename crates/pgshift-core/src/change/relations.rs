//! Table and column changes.
//!
//! Column-level changes are shared between ordinary and foreign tables
//! through [`RelationRef`], which picks the right `ALTER TABLE` /
//! `ALTER FOREIGN TABLE` head.

use serde::{Deserialize, Serialize};

use super::{push_role, Operation, OptionDelta};
use crate::catalog::{Column, ColumnIdentity, ColumnStorage, Persistence, Table};
use crate::error::Result;
use crate::ident::{ObjectId, ObjectType};
use crate::render::{quote_ident, quote_qualified, RenderOptions};

/// Which flavor of relation a column-level change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Ordinary table.
    Table,
    /// Foreign table.
    ForeignTable,
}

/// A reference to the relation owning a column-level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRef {
    /// Table vs. foreign table.
    pub kind: RelationKind,
    /// Schema.
    pub schema: String,
    /// Relation name.
    pub name: String,
}

impl RelationRef {
    /// Reference to an ordinary table.
    #[must_use]
    pub fn table(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::Table,
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Reference to a foreign table.
    #[must_use]
    pub fn foreign_table(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::ForeignTable,
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Stable identifier of the relation.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self.kind {
            RelationKind::Table => ObjectId::table(&self.schema, &self.name),
            RelationKind::ForeignTable => ObjectId::foreign_table(&self.schema, &self.name),
        }
    }

    /// Kind tag.
    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        match self.kind {
            RelationKind::Table => ObjectType::Table,
            RelationKind::ForeignTable => ObjectType::ForeignTable,
        }
    }

    /// `ALTER <keyword> schema.name` head of a statement.
    #[must_use]
    pub fn alter_head(&self, opts: &RenderOptions) -> String {
        let keyword = match self.kind {
            RelationKind::Table => "ALTER TABLE",
            RelationKind::ForeignTable => "ALTER FOREIGN TABLE",
        };
        format!(
            "{} {}",
            opts.kw(keyword),
            quote_qualified(&self.schema, &self.name)
        )
    }

    /// Stable identifier of one of the relation's columns.
    #[must_use]
    pub fn column_id(&self, column: &str) -> ObjectId {
        ObjectId::column(&self.schema, &self.name, column)
    }
}

/// In-place alteration of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnAction {
    /// ALTER COLUMN … TYPE.
    SetType {
        /// New type name.
        type_name: String,
        /// New collation, if it changes with the type.
        collation: Option<String>,
    },
    /// SET NOT NULL.
    SetNotNull,
    /// DROP NOT NULL.
    DropNotNull,
    /// SET DEFAULT expr.
    SetDefault(String),
    /// DROP DEFAULT.
    DropDefault,
    /// SET STATISTICS n (-1 resets to the default target).
    SetStatistics(i32),
    /// SET STORAGE.
    SetStorage(ColumnStorage),
    /// ADD GENERATED … AS IDENTITY.
    AddIdentity(ColumnIdentity),
    /// SET GENERATED ALWAYS / BY DEFAULT.
    SetIdentity(ColumnIdentity),
    /// DROP IDENTITY.
    DropIdentity,
}

/// Row-level security toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSecurityAction {
    /// ENABLE ROW LEVEL SECURITY.
    Enable,
    /// DISABLE ROW LEVEL SECURITY.
    Disable,
    /// FORCE ROW LEVEL SECURITY.
    Force,
    /// NO FORCE ROW LEVEL SECURITY.
    NoForce,
}

/// Table and column changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationChange {
    /// CREATE TABLE, bare: columns only. Constraints are always
    /// separate changes so circular references can be linearized.
    CreateTable {
        /// The table to create.
        table: Table,
        /// Types referenced by column definitions that are part of
        /// this change set.
        type_deps: Vec<ObjectId>,
    },
    /// DROP TABLE.
    DropTable {
        /// The dropped table as it existed in main.
        table: Table,
        /// Tables referenced by this table's foreign keys; the drop
        /// must run while they still exist.
        fk_targets: Vec<ObjectId>,
    },
    /// ALTER TABLE … SET LOGGED / SET UNLOGGED.
    SetLogged {
        /// Schema.
        schema: String,
        /// Table name.
        name: String,
        /// Target persistence.
        persistence: Persistence,
    },
    /// ALTER TABLE … SET (…) / RESET (…) storage parameters.
    SetOptions {
        /// Schema.
        schema: String,
        /// Table name.
        name: String,
        /// Minimal delta.
        delta: OptionDelta,
    },
    /// ALTER TABLE … SET TABLESPACE.
    SetTablespace {
        /// Schema.
        schema: String,
        /// Table name.
        name: String,
        /// Target tablespace; `None` moves back to the default.
        tablespace: Option<String>,
    },
    /// Row-level security toggle.
    RowSecurity {
        /// Schema.
        schema: String,
        /// Table name.
        name: String,
        /// The toggle.
        action: RowSecurityAction,
    },
    /// ALTER TABLE … ADD COLUMN.
    AddColumn {
        /// The owning relation.
        relation: RelationRef,
        /// The new column.
        column: Column,
        /// Types referenced by the column that are part of this
        /// change set.
        type_deps: Vec<ObjectId>,
    },
    /// ALTER TABLE … DROP COLUMN.
    DropColumn {
        /// The owning relation.
        relation: RelationRef,
        /// Column name.
        column: String,
    },
    /// ALTER TABLE … ALTER COLUMN ….
    AlterColumn {
        /// The owning relation.
        relation: RelationRef,
        /// Column name.
        column: String,
        /// The alteration.
        action: ColumnAction,
        /// Types referenced by a `SetType`, if part of this set.
        type_deps: Vec<ObjectId>,
    },
}

impl RelationChange {
    pub(crate) fn object_type(&self) -> ObjectType {
        match self {
            Self::CreateTable { .. }
            | Self::DropTable { .. }
            | Self::SetLogged { .. }
            | Self::SetOptions { .. }
            | Self::SetTablespace { .. }
            | Self::RowSecurity { .. } => ObjectType::Table,
            Self::AddColumn { relation, .. }
            | Self::DropColumn { relation, .. }
            | Self::AlterColumn { relation, .. } => relation.object_type(),
        }
    }

    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::CreateTable { .. } => Operation::Create,
            Self::DropTable { .. } => Operation::Drop,
            _ => Operation::Alter,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::CreateTable { table, .. } | Self::DropTable { table, .. } => table.stable_id(),
            Self::SetLogged { schema, name, .. }
            | Self::SetOptions { schema, name, .. }
            | Self::SetTablespace { schema, name, .. }
            | Self::RowSecurity { schema, name, .. } => ObjectId::table(schema, name),
            Self::AddColumn {
                relation, column, ..
            } => relation.column_id(&column.name),
            Self::DropColumn { relation, column } | Self::AlterColumn { relation, column, .. } => {
                relation.column_id(column)
            }
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::CreateTable { table, .. } => {
                let mut ids = vec![table.stable_id()];
                ids.extend(table.column_ids());
                ids
            }
            Self::AddColumn {
                relation, column, ..
            } => vec![relation.column_id(&column.name)],
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::DropTable { table, .. } => {
                let mut ids = vec![table.stable_id()];
                ids.extend(table.column_ids());
                ids
            }
            Self::DropColumn { relation, column } => vec![relation.column_id(column)],
            _ => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::CreateTable { table, type_deps } => {
                let mut ids = vec![ObjectId::schema(&table.schema)];
                push_role(&mut ids, &table.owner);
                ids.extend(type_deps.iter().cloned());
                ids
            }
            Self::DropTable { table, fk_targets } => {
                let mut ids = vec![ObjectId::schema(&table.schema)];
                push_role(&mut ids, &table.owner);
                ids.extend(fk_targets.iter().cloned());
                for column in &table.columns {
                    ids.extend(super::qualified_type_id(&column.type_name));
                }
                ids
            }
            Self::SetLogged { schema, name, .. }
            | Self::SetOptions { schema, name, .. }
            | Self::SetTablespace { schema, name, .. }
            | Self::RowSecurity { schema, name, .. } => vec![ObjectId::table(schema, name)],
            Self::AddColumn {
                relation,
                type_deps,
                ..
            } => {
                let mut ids = vec![relation.id()];
                ids.extend(type_deps.iter().cloned());
                ids
            }
            Self::DropColumn { relation, .. } => vec![relation.id()],
            Self::AlterColumn {
                relation,
                column,
                type_deps,
                ..
            } => {
                let mut ids = vec![relation.id(), relation.column_id(column)];
                ids.extend(type_deps.iter().cloned());
                ids
            }
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::CreateTable { table, .. } => Ok(render_create_table(table, opts)),
            Self::DropTable { table, .. } => Ok(format!(
                "{} {}",
                opts.kw("DROP TABLE"),
                quote_qualified(&table.schema, &table.name)
            )),
            Self::SetLogged {
                schema,
                name,
                persistence,
            } => {
                let keyword = match persistence {
                    Persistence::Permanent => "SET LOGGED",
                    Persistence::Unlogged => "SET UNLOGGED",
                };
                Ok(format!(
                    "{} {} {}",
                    opts.kw("ALTER TABLE"),
                    quote_qualified(schema, name),
                    opts.kw(keyword)
                ))
            }
            Self::SetOptions {
                schema,
                name,
                delta,
            } => Ok(render_set_options(
                &format!("{} {}", opts.kw("ALTER TABLE"), quote_qualified(schema, name)),
                delta,
                opts,
            )),
            Self::SetTablespace {
                schema,
                name,
                tablespace,
            } => Ok(format!(
                "{} {} {} {}",
                opts.kw("ALTER TABLE"),
                quote_qualified(schema, name),
                opts.kw("SET TABLESPACE"),
                quote_ident(tablespace.as_deref().unwrap_or("pg_default"))
            )),
            Self::RowSecurity {
                schema,
                name,
                action,
            } => {
                let keyword = match action {
                    RowSecurityAction::Enable => "ENABLE ROW LEVEL SECURITY",
                    RowSecurityAction::Disable => "DISABLE ROW LEVEL SECURITY",
                    RowSecurityAction::Force => "FORCE ROW LEVEL SECURITY",
                    RowSecurityAction::NoForce => "NO FORCE ROW LEVEL SECURITY",
                };
                Ok(format!(
                    "{} {} {}",
                    opts.kw("ALTER TABLE"),
                    quote_qualified(schema, name),
                    opts.kw(keyword)
                ))
            }
            Self::AddColumn {
                relation, column, ..
            } => Ok(format!(
                "{} {} {}",
                relation.alter_head(opts),
                opts.kw("ADD COLUMN"),
                render_column(column, 0, opts)
            )),
            Self::DropColumn { relation, column } => Ok(format!(
                "{} {} {}",
                relation.alter_head(opts),
                opts.kw("DROP COLUMN"),
                quote_ident(column)
            )),
            Self::AlterColumn {
                relation,
                column,
                action,
                ..
            } => {
                let head = format!(
                    "{} {} {}",
                    relation.alter_head(opts),
                    opts.kw("ALTER COLUMN"),
                    quote_ident(column)
                );
                Ok(match action {
                    ColumnAction::SetType {
                        type_name,
                        collation,
                    } => {
                        let mut sql = format!("{head} {} {type_name}", opts.kw("TYPE"));
                        if let Some(collation) = collation {
                            sql.push_str(&format!(" {} {}", opts.kw("COLLATE"), quote_ident(collation)));
                        }
                        sql
                    }
                    ColumnAction::SetNotNull => format!("{head} {}", opts.kw("SET NOT NULL")),
                    ColumnAction::DropNotNull => format!("{head} {}", opts.kw("DROP NOT NULL")),
                    ColumnAction::SetDefault(expr) => {
                        format!("{head} {} {expr}", opts.kw("SET DEFAULT"))
                    }
                    ColumnAction::DropDefault => format!("{head} {}", opts.kw("DROP DEFAULT")),
                    ColumnAction::SetStatistics(target) => {
                        format!("{head} {} {target}", opts.kw("SET STATISTICS"))
                    }
                    ColumnAction::SetStorage(storage) => {
                        format!("{head} {} {}", opts.kw("SET STORAGE"), opts.kw(storage.as_sql()))
                    }
                    ColumnAction::AddIdentity(identity) => {
                        format!("{head} {} {}", opts.kw("ADD"), opts.kw(identity.as_sql()))
                    }
                    ColumnAction::SetIdentity(identity) => {
                        let keyword = match identity {
                            ColumnIdentity::Always => "SET GENERATED ALWAYS",
                            ColumnIdentity::ByDefault => "SET GENERATED BY DEFAULT",
                        };
                        format!("{head} {}", opts.kw(keyword))
                    }
                    ColumnAction::DropIdentity => format!("{head} {}", opts.kw("DROP IDENTITY")),
                })
            }
        }
    }
}

/// Renders a column definition as used in `CREATE TABLE` bodies and
/// `ADD COLUMN`. `name_width` pads the name for aligned column lists;
/// zero disables padding.
pub(crate) fn render_column(column: &Column, name_width: usize, opts: &RenderOptions) -> String {
    let name = quote_ident(&column.name);
    let mut sql = if name_width > name.len() {
        format!("{name:<name_width$} {}", column.type_name)
    } else {
        format!("{name} {}", column.type_name)
    };
    if let Some(collation) = &column.collation {
        sql.push_str(&format!(" {} {}", opts.kw("COLLATE"), quote_ident(collation)));
    }
    if column.not_null {
        sql.push_str(&format!(" {}", opts.kw("NOT NULL")));
    }
    if let Some(default) = &column.default {
        sql.push_str(&format!(" {} {default}", opts.kw("DEFAULT")));
    }
    if let Some(identity) = column.identity {
        sql.push_str(&format!(" {}", opts.kw(identity.as_sql())));
    }
    if let Some(generated) = &column.generated {
        sql.push_str(&format!(
            " {} ({generated}) {}",
            opts.kw("GENERATED ALWAYS AS"),
            opts.kw("STORED")
        ));
    }
    sql
}

/// Renders a full column list block, honoring `align_types`.
pub(crate) fn render_column_block(columns: &[Column], opts: &RenderOptions) -> String {
    let name_width = if opts.align_types {
        columns
            .iter()
            .map(|c| quote_ident(&c.name).len())
            .max()
            .unwrap_or(0)
    } else {
        0
    };
    let rendered: Vec<String> = columns
        .iter()
        .map(|c| render_column(c, name_width, opts))
        .collect();
    opts.block(&rendered)
}

/// Renders a `SET (…)` / `RESET (…)` pair after the given statement
/// head. Set keys come first, reset keys second; both are already
/// sorted by the diff.
pub(crate) fn render_set_options(head: &str, delta: &OptionDelta, opts: &RenderOptions) -> String {
    let mut clauses = Vec::new();
    if !delta.set.is_empty() {
        let pairs: Vec<String> = delta
            .set
            .iter()
            .map(|(key, value)| format!("{key} = {value}"))
            .collect();
        clauses.push(format!("{} ({})", opts.kw("SET"), pairs.join(", ")));
    }
    if !delta.reset.is_empty() {
        clauses.push(format!("{} ({})", opts.kw("RESET"), delta.reset.join(", ")));
    }
    format!("{head} {}", clauses.join(" "))
}

fn render_create_table(table: &Table, opts: &RenderOptions) -> String {
    let keyword = match table.persistence {
        Persistence::Permanent => "CREATE TABLE",
        Persistence::Unlogged => "CREATE UNLOGGED TABLE",
    };
    let mut sql = format!(
        "{} {} {}",
        opts.kw(keyword),
        quote_qualified(&table.schema, &table.name),
        render_column_block(&table.columns, opts)
    );
    if let Some(partition_by) = &table.partition_by {
        sql.push_str(&format!(" {} {partition_by}", opts.kw("PARTITION BY")));
    }
    if !table.options.is_empty() {
        let map = crate::catalog::options_map(&table.options);
        let pairs: Vec<String> = map
            .iter()
            .map(|(key, value)| format!("{key} = {value}"))
            .collect();
        sql.push_str(&format!(" {} ({})", opts.kw("WITH"), pairs.join(", ")));
    }
    if let Some(tablespace) = &table.tablespace {
        sql.push_str(&format!(" {} {}", opts.kw("TABLESPACE"), quote_ident(tablespace)));
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_table() -> Table {
        Table::new("public", "users", "postgres")
            .column(Column::new("id", "bigint").not_null())
            .column(Column::new("email", "text"))
    }

    #[test]
    fn create_table_renders_bare_columns() {
        let change = RelationChange::CreateTable {
            table: users_table(),
            type_deps: Vec::new(),
        };
        let sql = change.to_sql(&RenderOptions::default()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE public.users (\n    id bigint NOT NULL,\n    email text\n)"
        );
    }

    #[test]
    fn create_table_aligned_types() {
        let opts = RenderOptions {
            align_types: true,
            ..RenderOptions::default()
        };
        let change = RelationChange::CreateTable {
            table: users_table(),
            type_deps: Vec::new(),
        };
        let sql = change.to_sql(&opts).unwrap();
        assert!(sql.contains("id    bigint"));
        assert!(sql.contains("email text"));
    }

    #[test]
    fn add_column_literal() {
        let change = RelationChange::AddColumn {
            relation: RelationRef::table("public", "t"),
            column: Column::new("name", "text").not_null().default_expr("'x'"),
            type_deps: Vec::new(),
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "ALTER TABLE public.t ADD COLUMN name text NOT NULL DEFAULT 'x'"
        );
    }

    #[test]
    fn add_column_on_foreign_table() {
        let change = RelationChange::AddColumn {
            relation: RelationRef::foreign_table("public", "remote_t"),
            column: Column::new("name", "text").not_null().default_expr("'x'"),
            type_deps: Vec::new(),
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "ALTER FOREIGN TABLE public.remote_t ADD COLUMN name text NOT NULL DEFAULT 'x'"
        );
    }

    #[test]
    fn create_table_edges() {
        let change = RelationChange::CreateTable {
            table: users_table(),
            type_deps: Vec::new(),
        };
        let creates = change.creates();
        assert!(creates.contains(&ObjectId::table("public", "users")));
        assert!(creates.contains(&ObjectId::column("public", "users", "id")));
        assert!(creates.contains(&ObjectId::column("public", "users", "email")));
        assert_eq!(
            change.requires(),
            vec![ObjectId::schema("public"), ObjectId::role("postgres")]
        );
    }

    #[test]
    fn storage_parameter_delta() {
        let change = RelationChange::SetOptions {
            schema: "public".into(),
            name: "t".into(),
            delta: OptionDelta {
                set: vec![("fillfactor".into(), "70".into())],
                reset: vec!["autovacuum_enabled".into()],
            },
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "ALTER TABLE public.t SET (fillfactor = 70) RESET (autovacuum_enabled)"
        );
    }
}
