//! The change model: one typed value per DDL statement.
//!
//! Every change declares three edge sets consumed by the planner:
//! `creates` (identifiers that exist only after the statement runs),
//! `drops` (identifiers gone after it runs), and `requires`
//! (identifiers that must exist when it runs). Edges are derived from
//! the change's own data, never stored redundantly, and changes are
//! immutable values: hooks that want a different change build a new
//! one.

mod constraints;
mod fdw;
mod privileges;
mod relations;
mod replication;
mod roles;
mod routines;
mod schemas;
mod types;
mod views;

pub use constraints::{ConstraintChange, IndexChange};
pub use fdw::FdwChange;
pub use privileges::PrivilegeChange;
pub use relations::{ColumnAction, RelationChange, RelationKind, RelationRef, RowSecurityAction};
pub use replication::ReplicationChange;
pub use roles::{RoleChange, RoleDelta};
pub use routines::{PolicyChange, RoutineChange, RuleChange, TriggerChange};
pub use schemas::NamespaceChange;
pub use types::{DomainAction, SequenceChange, SequenceDelta, TypeChange};
pub use views::ViewChange;

use serde::{Deserialize, Serialize};

use crate::catalog::RoutineKind;
use crate::error::Result;
use crate::ident::{ObjectId, ObjectType};
use crate::render::{quote_ident, quote_qualified, RenderOptions};

/// The DDL operation class of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// The statement brings an object into existence.
    Create,
    /// The statement modifies an existing object in place.
    Alter,
    /// The statement removes an object.
    Drop,
}

impl Operation {
    /// Rank used by the deterministic tie-break: drops first, then
    /// creates, then alters.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Drop => 0,
            Self::Create => 1,
            Self::Alter => 2,
        }
    }
}

/// What part of an object a change touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The object itself.
    Object,
    /// Its comment.
    Comment,
    /// An ACL entry on it.
    Privilege,
    /// A role membership.
    Membership,
    /// A default-privilege entry.
    DefaultPrivilege,
}

/// A reference to a nameable object, used by the generic owner and
/// comment changes to render the right `ALTER <KIND>` / `COMMENT ON
/// <KIND>` syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ObjectRef {
    Role { name: String },
    Schema { name: String },
    Extension { name: String },
    Collation { schema: String, name: String },
    Type { schema: String, name: String },
    Domain { schema: String, name: String },
    Sequence { schema: String, name: String },
    Function { schema: String, name: String, args: String },
    Procedure { schema: String, name: String, args: String },
    Table { schema: String, name: String },
    Column { schema: String, table: String, name: String },
    Constraint { schema: String, table: String, name: String },
    Index { schema: String, name: String },
    View { schema: String, name: String },
    MaterializedView { schema: String, name: String },
    Trigger { schema: String, table: String, name: String },
    Rule { schema: String, table: String, name: String },
    Policy { schema: String, table: String, name: String },
    ForeignDataWrapper { name: String },
    ForeignServer { name: String },
    ForeignTable { schema: String, name: String },
    Publication { name: String },
    Subscription { name: String },
    EventTrigger { name: String },
}

impl ObjectRef {
    /// Builds the reference for a routine, picking the function or
    /// procedure variant.
    #[must_use]
    pub fn routine(kind: RoutineKind, schema: &str, name: &str, args: &str) -> Self {
        match kind {
            RoutineKind::Function => Self::Function {
                schema: schema.into(),
                name: name.into(),
                args: args.into(),
            },
            RoutineKind::Procedure => Self::Procedure {
                schema: schema.into(),
                name: name.into(),
                args: args.into(),
            },
        }
    }

    /// Stable identifier of the referenced object.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Role { name } => ObjectId::role(name),
            Self::Schema { name } => ObjectId::schema(name),
            Self::Extension { name } => ObjectId::extension(name),
            Self::Collation { schema, name } => ObjectId::collation(schema, name),
            Self::Type { schema, name } | Self::Domain { schema, name } => {
                ObjectId::type_(schema, name)
            }
            Self::Sequence { schema, name } => ObjectId::sequence(schema, name),
            Self::Function { schema, name, args } | Self::Procedure { schema, name, args } => {
                ObjectId::function(schema, name, args)
            }
            Self::Table { schema, name } => ObjectId::table(schema, name),
            Self::Column {
                schema,
                table,
                name,
            } => ObjectId::column(schema, table, name),
            Self::Constraint {
                schema,
                table,
                name,
            } => ObjectId::constraint(schema, table, name),
            Self::Index { schema, name } => ObjectId::index(schema, name),
            Self::View { schema, name } => ObjectId::view(schema, name),
            Self::MaterializedView { schema, name } => ObjectId::materialized_view(schema, name),
            Self::Trigger {
                schema,
                table,
                name,
            } => ObjectId::trigger(schema, table, name),
            Self::Rule {
                schema,
                table,
                name,
            } => ObjectId::rule(schema, table, name),
            Self::Policy {
                schema,
                table,
                name,
            } => ObjectId::policy(schema, table, name),
            Self::ForeignDataWrapper { name } => ObjectId::foreign_data_wrapper(name),
            Self::ForeignServer { name } => ObjectId::foreign_server(name),
            Self::ForeignTable { schema, name } => ObjectId::foreign_table(schema, name),
            Self::Publication { name } => ObjectId::publication(name),
            Self::Subscription { name } => ObjectId::subscription(name),
            Self::EventTrigger { name } => ObjectId::event_trigger(name),
        }
    }

    /// Kind tag of the referenced object. Sub-objects report their
    /// parent kind.
    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        match self {
            Self::Role { .. } => ObjectType::Role,
            Self::Schema { .. } => ObjectType::Schema,
            Self::Extension { .. } => ObjectType::Extension,
            Self::Collation { .. } => ObjectType::Collation,
            Self::Type { .. } | Self::Domain { .. } => ObjectType::Type,
            Self::Sequence { .. } => ObjectType::Sequence,
            Self::Function { .. } | Self::Procedure { .. } => ObjectType::Function,
            Self::Table { .. } | Self::Column { .. } => ObjectType::Table,
            Self::Constraint { .. } => ObjectType::Constraint,
            Self::Index { .. } => ObjectType::Index,
            Self::View { .. } => ObjectType::View,
            Self::MaterializedView { .. } => ObjectType::MaterializedView,
            Self::Trigger { .. } => ObjectType::Trigger,
            Self::Rule { .. } => ObjectType::Rule,
            Self::Policy { .. } => ObjectType::Policy,
            Self::ForeignDataWrapper { .. } => ObjectType::ForeignDataWrapper,
            Self::ForeignServer { .. } => ObjectType::ForeignServer,
            Self::ForeignTable { .. } => ObjectType::ForeignTable,
            Self::Publication { .. } => ObjectType::Publication,
            Self::Subscription { .. } => ObjectType::Subscription,
            Self::EventTrigger { .. } => ObjectType::EventTrigger,
        }
    }

    /// The `<KIND>` keyword used in `ALTER <KIND>` and
    /// `COMMENT ON <KIND>`.
    #[must_use]
    pub const fn kind_keyword(&self) -> &'static str {
        match self {
            Self::Role { .. } => "ROLE",
            Self::Schema { .. } => "SCHEMA",
            Self::Extension { .. } => "EXTENSION",
            Self::Collation { .. } => "COLLATION",
            Self::Type { .. } => "TYPE",
            Self::Domain { .. } => "DOMAIN",
            Self::Sequence { .. } => "SEQUENCE",
            Self::Function { .. } => "FUNCTION",
            Self::Procedure { .. } => "PROCEDURE",
            Self::Table { .. } => "TABLE",
            Self::Column { .. } => "COLUMN",
            Self::Constraint { .. } => "CONSTRAINT",
            Self::Index { .. } => "INDEX",
            Self::View { .. } => "VIEW",
            Self::MaterializedView { .. } => "MATERIALIZED VIEW",
            Self::Trigger { .. } => "TRIGGER",
            Self::Rule { .. } => "RULE",
            Self::Policy { .. } => "POLICY",
            Self::ForeignDataWrapper { .. } => "FOREIGN DATA WRAPPER",
            Self::ForeignServer { .. } => "SERVER",
            Self::ForeignTable { .. } => "FOREIGN TABLE",
            Self::Publication { .. } => "PUBLICATION",
            Self::Subscription { .. } => "SUBSCRIPTION",
            Self::EventTrigger { .. } => "EVENT TRIGGER",
        }
    }

    /// The object name as it appears after the kind keyword. For
    /// sub-objects attached to a relation (`CONSTRAINT`, `TRIGGER`,
    /// `RULE`, `POLICY`) this is `name ON schema.table`.
    #[must_use]
    pub fn sql_name(&self) -> String {
        match self {
            Self::Role { name }
            | Self::Extension { name }
            | Self::ForeignDataWrapper { name }
            | Self::ForeignServer { name }
            | Self::Publication { name }
            | Self::Subscription { name }
            | Self::EventTrigger { name }
            | Self::Schema { name } => quote_ident(name),
            Self::Collation { schema, name }
            | Self::Type { schema, name }
            | Self::Domain { schema, name }
            | Self::Sequence { schema, name }
            | Self::Table { schema, name }
            | Self::Index { schema, name }
            | Self::View { schema, name }
            | Self::MaterializedView { schema, name }
            | Self::ForeignTable { schema, name } => quote_qualified(schema, name),
            Self::Function { schema, name, args } | Self::Procedure { schema, name, args } => {
                format!("{}({args})", quote_qualified(schema, name))
            }
            Self::Column {
                schema,
                table,
                name,
            } => format!("{}.{}", quote_qualified(schema, table), quote_ident(name)),
            Self::Constraint {
                schema,
                table,
                name,
            }
            | Self::Trigger {
                schema,
                table,
                name,
            }
            | Self::Rule {
                schema,
                table,
                name,
            }
            | Self::Policy {
                schema,
                table,
                name,
            } => format!("{} ON {}", quote_ident(name), quote_qualified(schema, table)),
        }
    }
}

/// Minimal delta for a `SET (…)` / `RESET (…)` storage-parameter
/// style option list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OptionDelta {
    /// Keys to set, with their new values, sorted by key.
    pub set: Vec<(String, String)>,
    /// Keys to reset, sorted.
    pub reset: Vec<String>,
}

impl OptionDelta {
    /// True when nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.reset.is_empty()
    }
}

/// Minimal delta for an `OPTIONS (ADD …, SET …, DROP …)` style option
/// list (foreign data wrappers, servers, user mappings, foreign
/// tables).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OptionActions {
    /// Keys only in the branch side.
    pub add: Vec<(String, String)>,
    /// Keys on both sides with a different value.
    pub set: Vec<(String, String)>,
    /// Keys only in the main side.
    pub drop: Vec<String>,
}

impl OptionActions {
    /// True when nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.set.is_empty() && self.drop.is_empty()
    }

    /// Renders the `OPTIONS (…)` clause body.
    #[must_use]
    pub fn to_sql(&self, opts: &RenderOptions) -> String {
        let mut parts = Vec::new();
        for (key, value) in &self.add {
            parts.push(format!(
                "{} {} {}",
                opts.kw("ADD"),
                quote_ident(key),
                crate::render::quote_literal(value)
            ));
        }
        for (key, value) in &self.set {
            parts.push(format!(
                "{} {} {}",
                opts.kw("SET"),
                quote_ident(key),
                crate::render::quote_literal(value)
            ));
        }
        for key in &self.drop {
            parts.push(format!("{} {}", opts.kw("DROP"), quote_ident(key)));
        }
        format!("{} ({})", opts.kw("OPTIONS"), parts.join(", "))
    }
}

/// Changes the owner of any ownable object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOwner {
    /// The object.
    pub target: ObjectRef,
    /// The new owner.
    pub owner: String,
}

/// Sets, changes, or removes the comment on an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetComment {
    /// The object.
    pub target: ObjectRef,
    /// The new comment; `None` removes it.
    pub comment: Option<String>,
    /// Whether the object had a comment before this change.
    pub had_comment: bool,
}

/// One unit of DDL: a typed statement with dependency edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    /// Role and membership changes.
    Role(RoleChange),
    /// Schema, extension, and collation changes.
    Namespace(NamespaceChange),
    /// Type changes.
    Type(TypeChange),
    /// Sequence changes.
    Sequence(SequenceChange),
    /// Table and column changes.
    Relation(RelationChange),
    /// Constraint changes.
    Constraint(ConstraintChange),
    /// Index changes.
    Index(IndexChange),
    /// View and materialized-view changes.
    View(ViewChange),
    /// Function and procedure changes.
    Routine(RoutineChange),
    /// Trigger changes.
    Trigger(TriggerChange),
    /// Rewrite-rule changes.
    Rule(RuleChange),
    /// Policy changes.
    Policy(PolicyChange),
    /// Foreign-data changes (wrappers, servers, mappings, tables).
    Fdw(FdwChange),
    /// Publication, subscription, and event-trigger changes.
    Replication(ReplicationChange),
    /// GRANT/REVOKE and default-privilege changes.
    Privilege(PrivilegeChange),
    /// Ownership change on any object.
    Owner(ChangeOwner),
    /// Comment change on any object.
    Comment(SetComment),
}

impl Change {
    /// Kind tag of the object this change is about.
    #[must_use]
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Role(c) => c.object_type(),
            Self::Namespace(c) => c.object_type(),
            Self::Type(_) => ObjectType::Type,
            Self::Sequence(_) => ObjectType::Sequence,
            Self::Relation(c) => c.object_type(),
            Self::Constraint(_) => ObjectType::Constraint,
            Self::Index(_) => ObjectType::Index,
            Self::View(c) => c.object_type(),
            Self::Routine(_) => ObjectType::Function,
            Self::Trigger(_) => ObjectType::Trigger,
            Self::Rule(_) => ObjectType::Rule,
            Self::Policy(_) => ObjectType::Policy,
            Self::Fdw(c) => c.object_type(),
            Self::Replication(c) => c.object_type(),
            Self::Privilege(c) => c.object_type(),
            Self::Owner(c) => c.target.object_type(),
            Self::Comment(c) => c.target.object_type(),
        }
    }

    /// Operation class.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Role(c) => c.operation(),
            Self::Namespace(c) => c.operation(),
            Self::Type(c) => c.operation(),
            Self::Sequence(c) => c.operation(),
            Self::Relation(c) => c.operation(),
            Self::Constraint(c) => c.operation(),
            Self::Index(c) => c.operation(),
            Self::View(c) => c.operation(),
            Self::Routine(c) => c.operation(),
            Self::Trigger(c) => c.operation(),
            Self::Rule(c) => c.operation(),
            Self::Policy(c) => c.operation(),
            Self::Fdw(c) => c.operation(),
            Self::Replication(c) => c.operation(),
            Self::Privilege(c) => c.operation(),
            Self::Owner(_) => Operation::Alter,
            Self::Comment(c) => match (c.had_comment, c.comment.is_some()) {
                (false, _) => Operation::Create,
                (true, true) => Operation::Alter,
                (true, false) => Operation::Drop,
            },
        }
    }

    /// Scope discriminant.
    #[must_use]
    pub fn scope(&self) -> Scope {
        match self {
            Self::Role(c) => c.scope(),
            Self::Privilege(c) => c.scope(),
            Self::Comment(_) => Scope::Comment,
            _ => Scope::Object,
        }
    }

    /// The stable identifier of the object this change targets, used
    /// for deterministic tie-breaks and hook contexts.
    #[must_use]
    pub fn target_id(&self) -> ObjectId {
        match self {
            Self::Role(c) => c.target_id(),
            Self::Namespace(c) => c.target_id(),
            Self::Type(c) => c.target_id(),
            Self::Sequence(c) => c.target_id(),
            Self::Relation(c) => c.target_id(),
            Self::Constraint(c) => c.target_id(),
            Self::Index(c) => c.target_id(),
            Self::View(c) => c.target_id(),
            Self::Routine(c) => c.target_id(),
            Self::Trigger(c) => c.target_id(),
            Self::Rule(c) => c.target_id(),
            Self::Policy(c) => c.target_id(),
            Self::Fdw(c) => c.target_id(),
            Self::Replication(c) => c.target_id(),
            Self::Privilege(c) => c.target_id(),
            Self::Owner(c) => c.target.id(),
            Self::Comment(c) => ObjectId::comment_on(&c.target.id()),
        }
    }

    /// Identifiers that exist only after this change runs.
    #[must_use]
    pub fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::Role(c) => c.creates(),
            Self::Namespace(c) => c.creates(),
            Self::Type(c) => c.creates(),
            Self::Sequence(c) => c.creates(),
            Self::Relation(c) => c.creates(),
            Self::Constraint(c) => c.creates(),
            Self::Index(c) => c.creates(),
            Self::View(c) => c.creates(),
            Self::Routine(c) => c.creates(),
            Self::Trigger(c) => c.creates(),
            Self::Rule(c) => c.creates(),
            Self::Policy(c) => c.creates(),
            Self::Fdw(c) => c.creates(),
            Self::Replication(c) => c.creates(),
            Self::Privilege(c) => c.creates(),
            Self::Owner(_) => Vec::new(),
            Self::Comment(c) => {
                if !c.had_comment && c.comment.is_some() {
                    vec![ObjectId::comment_on(&c.target.id())]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Identifiers gone after this change runs.
    #[must_use]
    pub fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::Role(c) => c.drops(),
            Self::Namespace(c) => c.drops(),
            Self::Type(c) => c.drops(),
            Self::Sequence(c) => c.drops(),
            Self::Relation(c) => c.drops(),
            Self::Constraint(c) => c.drops(),
            Self::Index(c) => c.drops(),
            Self::View(c) => c.drops(),
            Self::Routine(c) => c.drops(),
            Self::Trigger(c) => c.drops(),
            Self::Rule(c) => c.drops(),
            Self::Policy(c) => c.drops(),
            Self::Fdw(c) => c.drops(),
            Self::Replication(c) => c.drops(),
            Self::Privilege(c) => c.drops(),
            Self::Owner(_) => Vec::new(),
            Self::Comment(c) => {
                if c.had_comment && c.comment.is_none() {
                    vec![ObjectId::comment_on(&c.target.id())]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Identifiers that must exist when this change runs.
    #[must_use]
    pub fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::Role(c) => c.requires(),
            Self::Namespace(c) => c.requires(),
            Self::Type(c) => c.requires(),
            Self::Sequence(c) => c.requires(),
            Self::Relation(c) => c.requires(),
            Self::Constraint(c) => c.requires(),
            Self::Index(c) => c.requires(),
            Self::View(c) => c.requires(),
            Self::Routine(c) => c.requires(),
            Self::Trigger(c) => c.requires(),
            Self::Rule(c) => c.requires(),
            Self::Policy(c) => c.requires(),
            Self::Fdw(c) => c.requires(),
            Self::Replication(c) => c.requires(),
            Self::Privilege(c) => c.requires(),
            Self::Owner(c) => {
                let mut ids = vec![c.target.id()];
                push_role(&mut ids, &c.owner);
                ids
            }
            Self::Comment(c) => vec![c.target.id()],
        }
    }

    /// Renders the statement. Layout is controlled by `opts`; content
    /// never is. Fails fast on SQL-inexpressible combinations.
    pub fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::Role(c) => c.to_sql(opts),
            Self::Namespace(c) => c.to_sql(opts),
            Self::Type(c) => c.to_sql(opts),
            Self::Sequence(c) => c.to_sql(opts),
            Self::Relation(c) => c.to_sql(opts),
            Self::Constraint(c) => c.to_sql(opts),
            Self::Index(c) => c.to_sql(opts),
            Self::View(c) => c.to_sql(opts),
            Self::Routine(c) => c.to_sql(opts),
            Self::Trigger(c) => c.to_sql(opts),
            Self::Rule(c) => c.to_sql(opts),
            Self::Policy(c) => c.to_sql(opts),
            Self::Fdw(c) => c.to_sql(opts),
            Self::Replication(c) => c.to_sql(opts),
            Self::Privilege(c) => c.to_sql(opts),
            Self::Owner(c) => Ok(format!(
                "{} {} {} {} {}",
                opts.kw("ALTER"),
                opts.kw(c.target.kind_keyword()),
                c.target.sql_name(),
                opts.kw("OWNER TO"),
                quote_ident(&c.owner)
            )),
            Self::Comment(c) => {
                let value = c.comment.as_ref().map_or_else(
                    || opts.kw("NULL"),
                    |text| crate::render::quote_literal(text),
                );
                Ok(format!(
                    "{} {} {} {} {}",
                    opts.kw("COMMENT ON"),
                    opts.kw(c.target.kind_keyword()),
                    c.target.sql_name(),
                    opts.kw("IS"),
                    value
                ))
            }
        }
    }

    /// The deterministic secondary sort key: operation rank, kind rank
    /// (reversed for drops so dependents sort first), then the target
    /// identifier.
    #[must_use]
    pub fn sort_key(&self) -> (u8, u8, ObjectId) {
        let op = self.operation();
        let kind = self.object_type().rank();
        let kind = if matches!(op, Operation::Drop) {
            u8::MAX - kind
        } else {
            kind
        };
        (op.rank(), kind, self.target_id())
    }
}

/// Pushes `role:<name>` unless the grantee is the PUBLIC pseudo-role.
pub(crate) fn push_role(ids: &mut Vec<ObjectId>, role: &str) {
    if !role.eq_ignore_ascii_case("public") {
        ids.push(ObjectId::role(role));
    }
}

/// Parses a `schema.name` qualified function reference into its stable
/// identifier (zero-argument form), as used for FDW handlers and
/// validators.
pub(crate) fn qualified_function_id(qualified: &str) -> Option<ObjectId> {
    let (schema, name) = qualified.split_once('.')?;
    let name = name.strip_suffix("()").unwrap_or(name);
    Some(ObjectId::function(schema, name, ""))
}

/// Parses a schema-qualified type name (array suffix stripped) into
/// its stable identifier. Unqualified names are built-in types and
/// resolve to nothing. Used by drop changes, whose edges point at
/// droppers: a spurious identifier that nothing in the set touches
/// produces no edge.
pub(crate) fn qualified_type_id(type_name: &str) -> Option<ObjectId> {
    let base = type_name.trim_end_matches("[]");
    let (schema, name) = base.split_once('.')?;
    Some(ObjectId::type_(schema, name))
}

/// True when an index key entry is a bare column name rather than an
/// expression, so a column-level dependency edge can be derived.
pub(crate) fn is_bare_ident(entry: &str) -> bool {
    !entry.is_empty()
        && entry
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && entry
            .chars()
            .next()
            .is_some_and(|c| !c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ref_sql_names() {
        let table = ObjectRef::Table {
            schema: "public".into(),
            name: "users".into(),
        };
        assert_eq!(table.sql_name(), "public.users");
        assert_eq!(table.kind_keyword(), "TABLE");

        let constraint = ObjectRef::Constraint {
            schema: "public".into(),
            table: "users".into(),
            name: "users_pkey".into(),
        };
        assert_eq!(constraint.sql_name(), "users_pkey ON public.users");

        let func = ObjectRef::Function {
            schema: "public".into(),
            name: "f".into(),
            args: "integer".into(),
        };
        assert_eq!(func.sql_name(), "public.f(integer)");
    }

    #[test]
    fn owner_change_sql_and_edges() {
        let change = Change::Owner(ChangeOwner {
            target: ObjectRef::Table {
                schema: "public".into(),
                name: "t".into(),
            },
            owner: "alice".into(),
        });
        let sql = change.to_sql(&RenderOptions::default()).unwrap();
        assert_eq!(sql, "ALTER TABLE public.t OWNER TO alice");
        assert!(change.creates().is_empty());
        assert!(change.drops().is_empty());
        assert_eq!(
            change.requires(),
            vec![ObjectId::table("public", "t"), ObjectId::role("alice")]
        );
    }

    #[test]
    fn comment_lifecycle_edges() {
        let target = ObjectRef::View {
            schema: "public".into(),
            name: "v".into(),
        };
        let added = Change::Comment(SetComment {
            target: target.clone(),
            comment: Some("a view".into()),
            had_comment: false,
        });
        assert_eq!(added.operation(), Operation::Create);
        assert_eq!(added.creates().len(), 1);
        assert!(added.drops().is_empty());

        let removed = Change::Comment(SetComment {
            target,
            comment: None,
            had_comment: true,
        });
        assert_eq!(removed.operation(), Operation::Drop);
        assert!(removed.creates().is_empty());
        assert_eq!(removed.drops().len(), 1);
        let sql = removed.to_sql(&RenderOptions::default()).unwrap();
        assert_eq!(sql, "COMMENT ON VIEW public.v IS NULL");
    }

    #[test]
    fn bare_ident_detection() {
        assert!(is_bare_ident("email"));
        assert!(is_bare_ident("user_id"));
        assert!(!is_bare_ident("lower(email)"));
        assert!(!is_bare_ident("(a + b)"));
        assert!(!is_bare_ident(""));
    }
}
