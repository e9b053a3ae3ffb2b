//! Views, materialized views, routines, triggers, and rewrite rules.
//!
//! These kinds carry a `depends_on` list of stable identifiers,
//! resolved by the extraction layer from `pg_depend`, because their
//! definitions reference other objects by SQL text the diff engine
//! does not parse.

use serde::{Deserialize, Serialize};

use super::OptionList;
use crate::ident::ObjectId;

/// A view.
///
/// Identity: `(schema, name)`. The definition is treated as
/// non-alterable: `CREATE OR REPLACE VIEW` cannot shrink or reorder
/// the column list, so a changed definition is a replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// Schema.
    pub schema: String,
    /// View name.
    pub name: String,
    /// The `SELECT` body.
    pub definition: String,
    /// View options as a flat `[key, value, …]` list
    /// (`check_option`, `security_barrier`, …).
    pub options: OptionList,
    /// Owning role.
    pub owner: String,
    /// Objects the definition references.
    pub depends_on: Vec<ObjectId>,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl View {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::view(&self.schema, &self.name)
    }
}

/// A materialized view.
///
/// Identity: `(schema, name)`. Like views the definition forces a
/// replace; storage parameters and the tablespace are alterable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedView {
    /// Schema.
    pub schema: String,
    /// Materialized view name.
    pub name: String,
    /// The `SELECT` body.
    pub definition: String,
    /// Storage parameters as a flat `[key, value, …]` list.
    pub options: OptionList,
    /// Tablespace, if not the database default.
    pub tablespace: Option<String>,
    /// Whether the view is populated (`WITH DATA`).
    pub with_data: bool,
    /// Owning role.
    pub owner: String,
    /// Objects the definition references.
    pub depends_on: Vec<ObjectId>,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl MaterializedView {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::materialized_view(&self.schema, &self.name)
    }
}

/// Function vs. procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineKind {
    /// CREATE FUNCTION.
    Function,
    /// CREATE PROCEDURE.
    Procedure,
}

/// A function or procedure.
///
/// Identity: `(schema, name, argument signature)` — overloads are
/// distinct objects. A changed body or language is replaceable in
/// place via `CREATE OR REPLACE`; a changed return type is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Schema.
    pub schema: String,
    /// Routine name.
    pub name: String,
    /// Normalized argument-type signature (e.g. `integer,text`),
    /// empty for zero-argument routines.
    pub arguments: String,
    /// Function or procedure.
    pub kind: RoutineKind,
    /// Return type as rendered; empty for procedures.
    pub returns: String,
    /// Implementation language.
    pub language: String,
    /// Full argument list as rendered in the header, including names
    /// and defaults (e.g. `a integer, b text DEFAULT 'x'`).
    pub signature: String,
    /// Body source.
    pub body: String,
    /// Owning role.
    pub owner: String,
    /// Objects the body references.
    pub depends_on: Vec<ObjectId>,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Function {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::function(&self.schema, &self.name, &self.arguments)
    }
}

/// A trigger.
///
/// Identity: `(schema, table, name)`. Nothing about a trigger's firing
/// definition is alterable; only the comment is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Schema of the owning table.
    pub schema: String,
    /// Owning table.
    pub table: String,
    /// Trigger name.
    pub name: String,
    /// Timing keyword: `BEFORE`, `AFTER`, or `INSTEAD OF`.
    pub timing: String,
    /// Events, e.g. `["INSERT", "UPDATE OF status"]`.
    pub events: Vec<String>,
    /// FOR EACH ROW (true) vs. FOR EACH STATEMENT (false).
    pub for_each_row: bool,
    /// WHEN condition, if any.
    pub when_clause: Option<String>,
    /// Schema of the trigger function.
    pub function_schema: String,
    /// Name of the trigger function.
    pub function_name: String,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Trigger {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::trigger(&self.schema, &self.table, &self.name)
    }

    /// Stable identifier of the trigger function (trigger functions
    /// take no declared arguments).
    #[must_use]
    pub fn function_id(&self) -> ObjectId {
        ObjectId::function(&self.function_schema, &self.function_name, "")
    }
}

/// A rewrite rule.
///
/// Identity: `(schema, table, name)`. The definition is kept as the
/// full `CREATE RULE` statement; any difference is a replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Schema of the owning relation.
    pub schema: String,
    /// Owning relation.
    pub table: String,
    /// Rule name.
    pub name: String,
    /// Full `CREATE RULE` statement as extracted.
    pub definition: String,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Rule {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::rule(&self.schema, &self.table, &self.name)
    }
}
