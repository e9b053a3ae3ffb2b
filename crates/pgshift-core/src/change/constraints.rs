//! Constraint and index changes.
//!
//! Constraints are always emitted as standalone `ALTER TABLE … ADD
//! CONSTRAINT` statements, never inline in `CREATE TABLE`: the
//! constraint's `requires` edges, not the table's, carry referential
//! dependencies, which is what lets the planner linearize mutually
//! referencing tables.

use serde::{Deserialize, Serialize};

use super::{is_bare_ident, Operation, OptionDelta};
use crate::catalog::{Constraint, ConstraintKind, Index};
use crate::error::Result;
use crate::ident::ObjectId;
use crate::render::{quote_ident, quote_qualified, RenderOptions};

/// Constraint changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintChange {
    /// ALTER TABLE … ADD CONSTRAINT.
    Add(Constraint),
    /// ALTER TABLE … VALIDATE CONSTRAINT.
    Validate {
        /// Schema.
        schema: String,
        /// Owning table.
        table: String,
        /// Constraint name.
        name: String,
    },
    /// ALTER TABLE … DROP CONSTRAINT.
    Drop(Constraint),
}

impl ConstraintChange {
    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::Add(_) => Operation::Create,
            Self::Validate { .. } => Operation::Alter,
            Self::Drop(_) => Operation::Drop,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::Add(c) | Self::Drop(c) => c.stable_id(),
            Self::Validate {
                schema,
                table,
                name,
            } => ObjectId::constraint(schema, table, name),
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::Add(c) => vec![c.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::Drop(c) => vec![c.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::Add(c) | Self::Drop(c) => {
                let mut ids = vec![c.table_id()];
                match &c.kind {
                    ConstraintKind::PrimaryKey { columns }
                    | ConstraintKind::Unique { columns, .. } => {
                        for column in columns {
                            ids.push(ObjectId::column(&c.schema, &c.table, column));
                        }
                    }
                    ConstraintKind::ForeignKey {
                        columns,
                        ref_schema,
                        ref_table,
                        ref_columns,
                        ..
                    } => {
                        for column in columns {
                            ids.push(ObjectId::column(&c.schema, &c.table, column));
                        }
                        ids.push(ObjectId::table(ref_schema, ref_table));
                        for column in ref_columns {
                            ids.push(ObjectId::column(ref_schema, ref_table, column));
                        }
                    }
                    ConstraintKind::Check { .. } | ConstraintKind::Exclusion { .. } => {}
                }
                ids
            }
            Self::Validate {
                schema,
                table,
                name,
            } => vec![
                ObjectId::constraint(schema, table, name),
                ObjectId::table(schema, table),
            ],
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::Add(c) => {
                let mut sql = format!(
                    "{} {} {} {} {}",
                    opts.kw("ALTER TABLE"),
                    quote_qualified(&c.schema, &c.table),
                    opts.kw("ADD CONSTRAINT"),
                    quote_ident(&c.name),
                    render_constraint_body(c, opts)
                );
                if c.deferrable {
                    sql.push_str(&format!(" {}", opts.kw("DEFERRABLE")));
                    if c.initially_deferred {
                        sql.push_str(&format!(" {}", opts.kw("INITIALLY DEFERRED")));
                    }
                }
                if !c.validated {
                    sql.push_str(&format!(" {}", opts.kw("NOT VALID")));
                }
                Ok(sql)
            }
            Self::Validate {
                schema,
                table,
                name,
            } => Ok(format!(
                "{} {} {} {}",
                opts.kw("ALTER TABLE"),
                quote_qualified(schema, table),
                opts.kw("VALIDATE CONSTRAINT"),
                quote_ident(name)
            )),
            Self::Drop(c) => Ok(format!(
                "{} {} {} {}",
                opts.kw("ALTER TABLE"),
                quote_qualified(&c.schema, &c.table),
                opts.kw("DROP CONSTRAINT"),
                quote_ident(&c.name)
            )),
        }
    }
}

fn render_constraint_body(c: &Constraint, opts: &RenderOptions) -> String {
    let column_list = |columns: &[String]| -> String {
        columns
            .iter()
            .map(|name| quote_ident(name))
            .collect::<Vec<_>>()
            .join(", ")
    };
    match &c.kind {
        ConstraintKind::PrimaryKey { columns } => {
            format!("{} ({})", opts.kw("PRIMARY KEY"), column_list(columns))
        }
        ConstraintKind::Unique {
            columns,
            nulls_not_distinct,
        } => {
            let mut sql = opts.kw("UNIQUE");
            if *nulls_not_distinct {
                sql.push_str(&format!(" {}", opts.kw("NULLS NOT DISTINCT")));
            }
            sql.push_str(&format!(" ({})", column_list(columns)));
            sql
        }
        ConstraintKind::ForeignKey {
            columns,
            ref_schema,
            ref_table,
            ref_columns,
            on_delete,
            on_update,
        } => {
            let mut sql = format!(
                "{} ({}) {} {} ({})",
                opts.kw("FOREIGN KEY"),
                column_list(columns),
                opts.kw("REFERENCES"),
                quote_qualified(ref_schema, ref_table),
                column_list(ref_columns)
            );
            if *on_delete != crate::catalog::FkAction::NoAction {
                sql.push_str(&format!(" {} {}", opts.kw("ON DELETE"), opts.kw(on_delete.as_sql())));
            }
            if *on_update != crate::catalog::FkAction::NoAction {
                sql.push_str(&format!(" {} {}", opts.kw("ON UPDATE"), opts.kw(on_update.as_sql())));
            }
            sql
        }
        ConstraintKind::Check {
            expression,
            no_inherit,
        } => {
            let mut sql = format!("{} ({expression})", opts.kw("CHECK"));
            if *no_inherit {
                sql.push_str(&format!(" {}", opts.kw("NO INHERIT")));
            }
            sql
        }
        ConstraintKind::Exclusion { definition } => {
            format!("{} {definition}", opts.kw("EXCLUDE"))
        }
    }
}

/// Index changes. The method, uniqueness, key list, and predicate are
/// non-alterable, so the only alter forms are storage parameters and
/// the tablespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexChange {
    /// CREATE INDEX.
    Create(Index),
    /// ALTER INDEX … SET (…) / RESET (…).
    SetOptions {
        /// Schema.
        schema: String,
        /// Index name.
        name: String,
        /// Minimal delta.
        delta: OptionDelta,
    },
    /// ALTER INDEX … SET TABLESPACE.
    SetTablespace {
        /// Schema.
        schema: String,
        /// Index name.
        name: String,
        /// Target tablespace; `None` moves back to the default.
        tablespace: Option<String>,
    },
    /// DROP INDEX.
    Drop(Index),
}

impl IndexChange {
    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::Create(_) => Operation::Create,
            Self::SetOptions { .. } | Self::SetTablespace { .. } => Operation::Alter,
            Self::Drop(_) => Operation::Drop,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::Create(i) | Self::Drop(i) => i.stable_id(),
            Self::SetOptions { schema, name, .. } | Self::SetTablespace { schema, name, .. } => {
                ObjectId::index(schema, name)
            }
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(i) => vec![i.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::Drop(i) => vec![i.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(i) | Self::Drop(i) => {
                let mut ids = vec![i.table_id()];
                for entry in &i.columns {
                    if is_bare_ident(entry) {
                        ids.push(ObjectId::column(&i.schema, &i.table, entry));
                    }
                }
                ids
            }
            Self::SetOptions { schema, name, .. } | Self::SetTablespace { schema, name, .. } => {
                vec![ObjectId::index(schema, name)]
            }
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::Create(i) => {
                let head = if i.unique {
                    opts.kw("CREATE UNIQUE INDEX")
                } else {
                    opts.kw("CREATE INDEX")
                };
                let mut sql = format!(
                    "{} {} {} {} {} ({})",
                    head,
                    quote_ident(&i.name),
                    opts.kw("ON"),
                    quote_qualified(&i.schema, &i.table),
                    opts.kw(&format!("USING {}", i.method.as_sql())),
                    i.columns.join(", ")
                );
                if !i.include.is_empty() {
                    let cols: Vec<String> = i.include.iter().map(|c| quote_ident(c)).collect();
                    sql.push_str(&format!(" {} ({})", opts.kw("INCLUDE"), cols.join(", ")));
                }
                if !i.options.is_empty() {
                    let map = crate::catalog::options_map(&i.options);
                    let pairs: Vec<String> = map
                        .iter()
                        .map(|(key, value)| format!("{key} = {value}"))
                        .collect();
                    sql.push_str(&format!(" {} ({})", opts.kw("WITH"), pairs.join(", ")));
                }
                if let Some(tablespace) = &i.tablespace {
                    sql.push_str(&format!(" {} {}", opts.kw("TABLESPACE"), quote_ident(tablespace)));
                }
                if let Some(predicate) = &i.predicate {
                    sql.push_str(&format!(" {} {predicate}", opts.kw("WHERE")));
                }
                Ok(sql)
            }
            Self::SetOptions {
                schema,
                name,
                delta,
            } => Ok(super::relations::render_set_options(
                &format!("{} {}", opts.kw("ALTER INDEX"), quote_qualified(schema, name)),
                delta,
                opts,
            )),
            Self::SetTablespace {
                schema,
                name,
                tablespace,
            } => Ok(format!(
                "{} {} {} {}",
                opts.kw("ALTER INDEX"),
                quote_qualified(schema, name),
                opts.kw("SET TABLESPACE"),
                quote_ident(tablespace.as_deref().unwrap_or("pg_default"))
            )),
            Self::Drop(i) => Ok(format!(
                "{} {}",
                opts.kw("DROP INDEX"),
                quote_qualified(&i.schema, &i.name)
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FkAction, IndexMethod};

    fn fk_constraint() -> Constraint {
        Constraint {
            schema: "public".into(),
            table: "orders".into(),
            name: "orders_user_fk".into(),
            kind: ConstraintKind::ForeignKey {
                columns: vec!["user_id".into()],
                ref_schema: "public".into(),
                ref_table: "users".into(),
                ref_columns: vec!["id".into()],
                on_delete: FkAction::Cascade,
                on_update: FkAction::NoAction,
            },
            deferrable: false,
            initially_deferred: false,
            validated: true,
            comment: None,
        }
    }

    #[test]
    fn add_foreign_key_sql() {
        let sql = ConstraintChange::Add(fk_constraint())
            .to_sql(&RenderOptions::default())
            .unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE public.orders ADD CONSTRAINT orders_user_fk FOREIGN KEY (user_id) \
             REFERENCES public.users (id) ON DELETE CASCADE"
        );
    }

    #[test]
    fn foreign_key_requires_referenced_table() {
        let change = ConstraintChange::Add(fk_constraint());
        let requires = change.requires();
        assert!(requires.contains(&ObjectId::table("public", "orders")));
        assert!(requires.contains(&ObjectId::table("public", "users")));
        assert!(requires.contains(&ObjectId::column("public", "users", "id")));
    }

    #[test]
    fn not_valid_constraint() {
        let mut c = fk_constraint();
        c.validated = false;
        let sql = ConstraintChange::Add(c).to_sql(&RenderOptions::default()).unwrap();
        assert!(sql.ends_with("NOT VALID"));
    }

    #[test]
    fn create_index_sql() {
        let mut index = Index::new(
            "public",
            "users_email_idx",
            "users",
            vec!["email".into()],
        );
        index.unique = true;
        index.predicate = Some("deleted_at IS NULL".into());
        let sql = IndexChange::Create(index).to_sql(&RenderOptions::default()).unwrap();
        assert_eq!(
            sql,
            "CREATE UNIQUE INDEX users_email_idx ON public.users USING btree (email) \
             WHERE deleted_at IS NULL"
        );
    }

    #[test]
    fn gin_index_method() {
        let mut index = Index::new("public", "docs_idx", "docs", vec!["body".into()]);
        index.method = IndexMethod::Gin;
        let sql = IndexChange::Create(index).to_sql(&RenderOptions::default()).unwrap();
        assert!(sql.contains("USING gin"));
    }

    #[test]
    fn drop_index_sql() {
        let index = Index::new("public", "users_email_idx", "users", vec!["email".into()]);
        let sql = IndexChange::Drop(index).to_sql(&RenderOptions::default()).unwrap();
        assert_eq!(sql, "DROP INDEX public.users_email_idx");
    }
}
