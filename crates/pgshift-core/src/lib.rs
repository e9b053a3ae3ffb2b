//! Schema diff and DDL planning engine for PostgreSQL.
//!
//! `pgshift-core` computes the DDL statements that transform one
//! schema snapshot ("main") into another ("branch") and renders them
//! as an executable SQL script. The pipeline:
//!
//! - **Catalog model** — one immutable record per object across ~25
//!   kinds, split into identity fields (the stable identifier) and
//!   data fields (compared to detect alterations).
//! - **Diff** — per-kind comparison deciding create / drop / alter,
//!   including which changed properties force a drop-and-create
//!   because SQL has no `ALTER` form for them.
//! - **Change set** — a typed value per statement, each declaring
//!   `creates`/`drops`/`requires` identifier edges.
//! - **Plan** — a deterministic topological order over those edges:
//!   creates in dependency order, drops in reverse, replaces drop
//!   before create, foreign keys split out so mutually referencing
//!   tables linearize.
//! - **Render** — layout-only options plus filter/mask hooks applied
//!   after ordering.
//!
//! Catalog extraction (reading `pg_catalog`) and executing the script
//! against a database are deliberately outside this crate: input is a
//! pair of already-validated [`Catalog`] values, output is text.
//!
//! # Example
//!
//! ```rust
//! use pgshift_core::prelude::*;
//!
//! let main = Catalog::new();
//! let mut branch = Catalog::new();
//! branch.add_role(Role::new("owner"));
//! branch.add_schema(Schema {
//!     name: "app".into(),
//!     owner: "owner".into(),
//!     comment: None,
//! });
//! branch.add_table(
//!     Table::new("app", "users", "owner")
//!         .column(Column::new("id", "bigint").not_null()),
//! );
//!
//! let statements = generate_script(
//!     &main,
//!     &branch,
//!     ServerVersion::default(),
//!     &RenderOptions::default(),
//!     &[],
//! )
//! .unwrap();
//! assert_eq!(statements.len(), 3);
//! assert!(statements[2].starts_with("CREATE TABLE app.users"));
//! ```

pub mod catalog;
pub mod change;
pub mod diff;
pub mod error;
pub mod hooks;
pub mod ident;
pub mod plan;
pub mod render;

pub use catalog::{Catalog, ServerVersion};
pub use change::Change;
pub use diff::diff_catalogs;
pub use error::{PlanError, Result};
pub use hooks::{ChangeHook, HookContext, MaskSecrets};
pub use ident::{ObjectId, ObjectType};
pub use plan::plan;
pub use render::{KeywordCase, RenderOptions};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::catalog::{
        Catalog, Column, Constraint, ConstraintKind, Grant, Index, Role, Schema, Sequence,
        ServerVersion, Table, TypeDef, TypeKind, View,
    };
    pub use crate::change::{Change, Operation, Scope};
    pub use crate::error::{PlanError, Result};
    pub use crate::hooks::{ChangeHook, HookContext, MaskSecrets};
    pub use crate::ident::{ObjectId, ObjectType};
    pub use crate::render::{KeywordCase, RenderOptions};
    pub use crate::{diff_catalogs, generate_script, plan};
}

/// Diffs two snapshots, orders the changes, and renders the script in
/// one call.
///
/// # Errors
///
/// Fails on unresolvable dependency cycles and on changes whose
/// construction cannot be expressed as a single SQL statement.
pub fn generate_script(
    main: &Catalog,
    branch: &Catalog,
    version: ServerVersion,
    opts: &RenderOptions,
    extra_hooks: &[&dyn ChangeHook],
) -> Result<Vec<String>> {
    let changes = diff_catalogs(main, branch, version);
    let ordered = plan(changes)?;
    let ctx = HookContext { main, branch };
    hooks::render_script(&ordered, opts, extra_hooks, &ctx)
}
