//! Tables, columns, constraints, and indexes.

use serde::{Deserialize, Serialize};

use super::OptionList;
use crate::ident::ObjectId;

/// Table persistence. Alterable both ways via
/// `ALTER TABLE … SET {LOGGED | UNLOGGED}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persistence {
    /// Ordinary logged table.
    #[default]
    Permanent,
    /// Unlogged table.
    Unlogged,
}

/// Identity column generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnIdentity {
    /// GENERATED ALWAYS AS IDENTITY.
    Always,
    /// GENERATED BY DEFAULT AS IDENTITY.
    ByDefault,
}

impl ColumnIdentity {
    /// SQL clause fragment.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Always => "GENERATED ALWAYS AS IDENTITY",
            Self::ByDefault => "GENERATED BY DEFAULT AS IDENTITY",
        }
    }
}

/// Column storage strategy (`ALTER COLUMN … SET STORAGE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnStorage {
    /// PLAIN.
    Plain,
    /// EXTERNAL.
    External,
    /// EXTENDED.
    Extended,
    /// MAIN.
    Main,
}

impl ColumnStorage {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::External => "EXTERNAL",
            Self::Extended => "EXTENDED",
            Self::Main => "MAIN",
        }
    }
}

/// A column of a table or foreign table.
///
/// Columns are sub-objects: their identity is
/// `(schema, relation, name)` and their stable ids are produced by the
/// owning relation's diff. A changed generated expression has no alter
/// form and forces a drop-and-re-add of the column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Type name as rendered (e.g. `text`, `numeric(10,2)`,
    /// `public.status[]`).
    pub type_name: String,
    /// NOT NULL flag.
    pub not_null: bool,
    /// Default expression, if any.
    pub default: Option<String>,
    /// Generation expression for generated columns
    /// (`GENERATED ALWAYS AS (…) STORED`).
    pub generated: Option<String>,
    /// Identity column mode, if any.
    pub identity: Option<ColumnIdentity>,
    /// Explicit collation, if any.
    pub collation: Option<String>,
    /// Statistics target, if set (`ALTER COLUMN … SET STATISTICS`).
    pub statistics: Option<i32>,
    /// Storage strategy, if it differs from the type default.
    pub storage: Option<ColumnStorage>,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Column {
    /// Creates a column with the given name and type; all other data
    /// fields at their `CREATE TABLE` defaults.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            not_null: false,
            default: None,
            generated: None,
            identity: None,
            collation: None,
            statistics: None,
            storage: None,
            comment: None,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }
}

/// A table.
///
/// Identity: `(schema, name)`. The partition strategy is the only
/// non-alterable data field; persistence flips via `SET LOGGED` /
/// `SET UNLOGGED`, storage parameters via `SET (…)` / `RESET (…)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Schema.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Persistence.
    pub persistence: Persistence,
    /// `PARTITION BY` clause body, if the table is partitioned.
    pub partition_by: Option<String>,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Storage parameters as a flat `[key, value, …]` list.
    pub options: OptionList,
    /// Tablespace, if not the database default.
    pub tablespace: Option<String>,
    /// Owning role.
    pub owner: String,
    /// Row-level security enabled.
    pub row_security: bool,
    /// Row-level security forced for the owner.
    pub force_row_security: bool,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Table {
    /// Creates a table with no columns.
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            persistence: Persistence::Permanent,
            partition_by: None,
            columns: Vec::new(),
            options: Vec::new(),
            tablespace: None,
            owner: owner.into(),
            row_security: false,
            force_row_security: false,
            comment: None,
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::table(&self.schema, &self.name)
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Stable identifiers of all columns.
    #[must_use]
    pub fn column_ids(&self) -> Vec<ObjectId> {
        self.columns
            .iter()
            .map(|c| ObjectId::column(&self.schema, &self.name, &c.name))
            .collect()
    }
}

/// Referential action for foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FkAction {
    /// NO ACTION (the default).
    #[default]
    NoAction,
    /// RESTRICT.
    Restrict,
    /// CASCADE.
    Cascade,
    /// SET NULL.
    SetNull,
    /// SET DEFAULT.
    SetDefault,
}

impl FkAction {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// Constraint shape and shape-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// PRIMARY KEY.
    PrimaryKey {
        /// Key columns.
        columns: Vec<String>,
    },
    /// UNIQUE.
    Unique {
        /// Key columns.
        columns: Vec<String>,
        /// NULLS NOT DISTINCT flag.
        nulls_not_distinct: bool,
    },
    /// FOREIGN KEY.
    ForeignKey {
        /// Local columns.
        columns: Vec<String>,
        /// Referenced schema.
        ref_schema: String,
        /// Referenced table.
        ref_table: String,
        /// Referenced columns.
        ref_columns: Vec<String>,
        /// ON DELETE action.
        on_delete: FkAction,
        /// ON UPDATE action.
        on_update: FkAction,
    },
    /// CHECK.
    Check {
        /// Check expression (without the `CHECK` keyword).
        expression: String,
        /// NO INHERIT flag.
        no_inherit: bool,
    },
    /// EXCLUDE, kept as its rendered definition tail.
    Exclusion {
        /// Everything after `EXCLUDE `, e.g.
        /// `USING gist (room WITH =, during WITH &&)`.
        definition: String,
    },
}

/// A table constraint.
///
/// Identity: `(schema, table, name)`. Only the validation state and
/// the comment are alterable; any other difference forces a replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Schema of the owning table.
    pub schema: String,
    /// Owning table.
    pub table: String,
    /// Constraint name.
    pub name: String,
    /// Shape and shape-specific data.
    pub kind: ConstraintKind,
    /// DEFERRABLE flag.
    pub deferrable: bool,
    /// INITIALLY DEFERRED flag.
    pub initially_deferred: bool,
    /// Whether the constraint has been validated (`NOT VALID`
    /// constraints have not).
    pub validated: bool,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Constraint {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::constraint(&self.schema, &self.table, &self.name)
    }

    /// Stable identifier of the owning table.
    #[must_use]
    pub fn table_id(&self) -> ObjectId {
        ObjectId::table(&self.schema, &self.table)
    }
}

/// Index access method. Part of the non-alterable set: changing it
/// means a drop-and-create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMethod {
    /// btree (the default).
    #[default]
    BTree,
    /// hash.
    Hash,
    /// gist.
    Gist,
    /// gin.
    Gin,
    /// spgist.
    SpGist,
    /// brin.
    Brin,
}

impl IndexMethod {
    /// SQL name.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::BTree => "btree",
            Self::Hash => "hash",
            Self::Gist => "gist",
            Self::Gin => "gin",
            Self::SpGist => "spgist",
            Self::Brin => "brin",
        }
    }
}

/// An index.
///
/// Identity: `(schema, name)`. Method, uniqueness, key columns, and
/// the predicate are non-alterable; storage parameters and the
/// tablespace are alterable. Indexes backing a constraint, and
/// partition children of a partitioned index, are created and dropped
/// by their owner and are skipped by the diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Schema (always the owning table's schema).
    pub schema: String,
    /// Index name.
    pub name: String,
    /// Owning table (or materialized view).
    pub table: String,
    /// Access method.
    pub method: IndexMethod,
    /// UNIQUE flag.
    pub unique: bool,
    /// Key columns or expressions, in order, as rendered.
    pub columns: Vec<String>,
    /// INCLUDE columns.
    pub include: Vec<String>,
    /// Partial-index predicate (without the `WHERE` keyword).
    pub predicate: Option<String>,
    /// Storage parameters as a flat `[key, value, …]` list.
    pub options: OptionList,
    /// Tablespace, if not the database default.
    pub tablespace: Option<String>,
    /// Whether the index is owned by a constraint (primary key or
    /// unique) and therefore managed through it.
    pub owned_by_constraint: bool,
    /// Whether the index is a partition child of a partitioned index.
    pub is_partition_child: bool,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Index {
    /// Creates a plain btree index on the given columns.
    #[must_use]
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            table: table.into(),
            method: IndexMethod::BTree,
            unique: false,
            columns,
            include: Vec::new(),
            predicate: None,
            options: Vec::new(),
            tablespace: None,
            owned_by_constraint: false,
            is_partition_child: false,
            comment: None,
        }
    }

    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::index(&self.schema, &self.name)
    }

    /// Stable identifier of the owning table.
    #[must_use]
    pub fn table_id(&self) -> ObjectId {
        ObjectId::table(&self.schema, &self.table)
    }
}
