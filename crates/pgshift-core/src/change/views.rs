//! View and materialized-view changes.

use serde::{Deserialize, Serialize};

use super::{push_role, Operation, OptionDelta};
use crate::catalog::{MaterializedView, View};
use crate::error::Result;
use crate::ident::{ObjectId, ObjectType};
use crate::render::{quote_ident, quote_qualified, RenderOptions};

/// View and materialized-view changes. Definitions are non-alterable,
/// so a changed body always shows up as a drop-and-create pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewChange {
    /// CREATE VIEW.
    Create(View),
    /// ALTER VIEW … SET (…) / RESET (…).
    SetOptions {
        /// Schema.
        schema: String,
        /// View name.
        name: String,
        /// Minimal delta.
        delta: OptionDelta,
    },
    /// DROP VIEW.
    Drop(View),
    /// CREATE MATERIALIZED VIEW.
    CreateMaterialized(MaterializedView),
    /// ALTER MATERIALIZED VIEW … SET (…) / RESET (…).
    SetMaterializedOptions {
        /// Schema.
        schema: String,
        /// Materialized view name.
        name: String,
        /// Minimal delta.
        delta: OptionDelta,
    },
    /// ALTER MATERIALIZED VIEW … SET TABLESPACE.
    SetMaterializedTablespace {
        /// Schema.
        schema: String,
        /// Materialized view name.
        name: String,
        /// Target tablespace; `None` moves back to the default.
        tablespace: Option<String>,
    },
    /// DROP MATERIALIZED VIEW.
    DropMaterialized(MaterializedView),
}

impl ViewChange {
    pub(crate) fn object_type(&self) -> ObjectType {
        match self {
            Self::Create(_) | Self::SetOptions { .. } | Self::Drop(_) => ObjectType::View,
            _ => ObjectType::MaterializedView,
        }
    }

    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::Create(_) | Self::CreateMaterialized(_) => Operation::Create,
            Self::Drop(_) | Self::DropMaterialized(_) => Operation::Drop,
            _ => Operation::Alter,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::Create(v) | Self::Drop(v) => v.stable_id(),
            Self::SetOptions { schema, name, .. } => ObjectId::view(schema, name),
            Self::CreateMaterialized(mv) | Self::DropMaterialized(mv) => mv.stable_id(),
            Self::SetMaterializedOptions { schema, name, .. }
            | Self::SetMaterializedTablespace { schema, name, .. } => {
                ObjectId::materialized_view(schema, name)
            }
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(v) => vec![v.stable_id()],
            Self::CreateMaterialized(mv) => vec![mv.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::Drop(v) => vec![v.stable_id()],
            Self::DropMaterialized(mv) => vec![mv.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(v) | Self::Drop(v) => {
                let mut ids = vec![ObjectId::schema(&v.schema)];
                push_role(&mut ids, &v.owner);
                ids.extend(v.depends_on.iter().cloned());
                ids
            }
            Self::CreateMaterialized(mv) | Self::DropMaterialized(mv) => {
                let mut ids = vec![ObjectId::schema(&mv.schema)];
                push_role(&mut ids, &mv.owner);
                ids.extend(mv.depends_on.iter().cloned());
                ids
            }
            Self::SetOptions { schema, name, .. } => vec![ObjectId::view(schema, name)],
            Self::SetMaterializedOptions { schema, name, .. }
            | Self::SetMaterializedTablespace { schema, name, .. } => {
                vec![ObjectId::materialized_view(schema, name)]
            }
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::Create(v) => {
                let mut sql = format!(
                    "{} {}",
                    opts.kw("CREATE VIEW"),
                    quote_qualified(&v.schema, &v.name)
                );
                if !v.options.is_empty() {
                    let map = crate::catalog::options_map(&v.options);
                    let pairs: Vec<String> = map
                        .iter()
                        .map(|(key, value)| format!("{key} = {value}"))
                        .collect();
                    sql.push_str(&format!(" {} ({})", opts.kw("WITH"), pairs.join(", ")));
                }
                sql.push_str(&format!(" {}\n{}", opts.kw("AS"), v.definition));
                Ok(sql)
            }
            Self::SetOptions {
                schema,
                name,
                delta,
            } => Ok(super::relations::render_set_options(
                &format!("{} {}", opts.kw("ALTER VIEW"), quote_qualified(schema, name)),
                delta,
                opts,
            )),
            Self::Drop(v) => Ok(format!(
                "{} {}",
                opts.kw("DROP VIEW"),
                quote_qualified(&v.schema, &v.name)
            )),
            Self::CreateMaterialized(mv) => {
                let mut sql = format!(
                    "{} {}",
                    opts.kw("CREATE MATERIALIZED VIEW"),
                    quote_qualified(&mv.schema, &mv.name)
                );
                if !mv.options.is_empty() {
                    let map = crate::catalog::options_map(&mv.options);
                    let pairs: Vec<String> = map
                        .iter()
                        .map(|(key, value)| format!("{key} = {value}"))
                        .collect();
                    sql.push_str(&format!(" {} ({})", opts.kw("WITH"), pairs.join(", ")));
                }
                if let Some(tablespace) = &mv.tablespace {
                    sql.push_str(&format!(" {} {}", opts.kw("TABLESPACE"), quote_ident(tablespace)));
                }
                sql.push_str(&format!(" {}\n{}", opts.kw("AS"), mv.definition));
                if !mv.with_data {
                    sql.push_str(&format!("\n{}", opts.kw("WITH NO DATA")));
                }
                Ok(sql)
            }
            Self::SetMaterializedOptions {
                schema,
                name,
                delta,
            } => Ok(super::relations::render_set_options(
                &format!(
                    "{} {}",
                    opts.kw("ALTER MATERIALIZED VIEW"),
                    quote_qualified(schema, name)
                ),
                delta,
                opts,
            )),
            Self::SetMaterializedTablespace {
                schema,
                name,
                tablespace,
            } => Ok(format!(
                "{} {} {} {}",
                opts.kw("ALTER MATERIALIZED VIEW"),
                quote_qualified(schema, name),
                opts.kw("SET TABLESPACE"),
                quote_ident(tablespace.as_deref().unwrap_or("pg_default"))
            )),
            Self::DropMaterialized(mv) => Ok(format!(
                "{} {}",
                opts.kw("DROP MATERIALIZED VIEW"),
                quote_qualified(&mv.schema, &mv.name)
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_users() -> View {
        View {
            schema: "public".into(),
            name: "active_users".into(),
            definition: "SELECT id, email FROM public.users WHERE active".into(),
            options: Vec::new(),
            owner: "postgres".into(),
            depends_on: vec![ObjectId::table("public", "users")],
            comment: None,
        }
    }

    #[test]
    fn create_view_sql() {
        let sql = ViewChange::Create(active_users())
            .to_sql(&RenderOptions::default())
            .unwrap();
        assert_eq!(
            sql,
            "CREATE VIEW public.active_users AS\nSELECT id, email FROM public.users WHERE active"
        );
    }

    #[test]
    fn view_requires_its_dependencies() {
        let change = ViewChange::Create(active_users());
        assert!(change.requires().contains(&ObjectId::table("public", "users")));
        // The drop requires them too: a dependent view must be gone
        // before the table it reads from.
        let drop = ViewChange::Drop(active_users());
        assert!(drop.requires().contains(&ObjectId::table("public", "users")));
    }

    #[test]
    fn create_materialized_without_data() {
        let mv = MaterializedView {
            schema: "public".into(),
            name: "stats".into(),
            definition: "SELECT count(*) FROM public.users".into(),
            options: Vec::new(),
            tablespace: None,
            with_data: false,
            owner: "postgres".into(),
            depends_on: Vec::new(),
            comment: None,
        };
        let sql = ViewChange::CreateMaterialized(mv)
            .to_sql(&RenderOptions::default())
            .unwrap();
        assert!(sql.ends_with("WITH NO DATA"));
    }
}
