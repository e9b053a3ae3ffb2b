//! Stable object identifiers.
//!
//! Every database object is addressed by a [`ObjectId`]: a canonical
//! string of the form `<kind>:<identity>` that stays stable across
//! snapshots as long as the object's identity fields do not change.
//! All cross-object references (the `requires`/`creates`/`drops` edges
//! consumed by the planner) are built through the constructors in this
//! module, never by ad-hoc formatting.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The object kinds covered by the diff engine.
///
/// Sub-objects (columns, comments, ACL entries, memberships, default
/// privileges) do not get their own kind tag: their composite
/// identifiers carry the parent kind, and changes touching them report
/// the parent kind together with a distinct scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    /// Database role.
    Role,
    /// Namespace.
    Schema,
    /// Installed extension.
    Extension,
    /// Collation.
    Collation,
    /// Enum, composite, or domain type.
    Type,
    /// Sequence.
    Sequence,
    /// Function or procedure.
    Function,
    /// Ordinary (or partitioned) table.
    Table,
    /// Table constraint.
    Constraint,
    /// Index.
    Index,
    /// View.
    View,
    /// Materialized view.
    MaterializedView,
    /// Trigger.
    Trigger,
    /// Rewrite rule.
    Rule,
    /// Row-level security policy.
    Policy,
    /// Foreign data wrapper.
    ForeignDataWrapper,
    /// Foreign server.
    ForeignServer,
    /// User mapping for a foreign server.
    UserMapping,
    /// Foreign table.
    ForeignTable,
    /// Logical replication publication.
    Publication,
    /// Logical replication subscription.
    Subscription,
    /// Event trigger.
    EventTrigger,
}

impl ObjectType {
    /// Fixed ordering rank used as a deterministic tie-break by the
    /// planner. Roughly "things other objects depend on first".
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Role => 0,
            Self::Schema => 1,
            Self::Extension => 2,
            Self::Collation => 3,
            Self::Type => 4,
            Self::Sequence => 5,
            Self::Function => 6,
            Self::Table => 7,
            Self::Constraint => 8,
            Self::Index => 9,
            Self::View => 10,
            Self::MaterializedView => 11,
            Self::Trigger => 12,
            Self::Rule => 13,
            Self::Policy => 14,
            Self::ForeignDataWrapper => 15,
            Self::ForeignServer => 16,
            Self::UserMapping => 17,
            Self::ForeignTable => 18,
            Self::Publication => 19,
            Self::Subscription => 20,
            Self::EventTrigger => 21,
        }
    }

    /// Tag used as the `<kind>` prefix of stable identifiers.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Schema => "schema",
            Self::Extension => "extension",
            Self::Collation => "collation",
            Self::Type => "type",
            Self::Sequence => "sequence",
            Self::Function => "function",
            Self::Table => "table",
            Self::Constraint => "constraint",
            Self::Index => "index",
            Self::View => "view",
            Self::MaterializedView => "materialized_view",
            Self::Trigger => "trigger",
            Self::Rule => "rule",
            Self::Policy => "policy",
            Self::ForeignDataWrapper => "foreign_data_wrapper",
            Self::ForeignServer => "foreign_server",
            Self::UserMapping => "user_mapping",
            Self::ForeignTable => "foreign_table",
            Self::Publication => "publication",
            Self::Subscription => "subscription",
            Self::EventTrigger => "event_trigger",
        }
    }
}

/// A canonical, stable identifier for a database object or sub-object.
///
/// Identifiers are plain strings so they can serve directly as map keys
/// and dependency-edge endpoints, but they are only ever produced by
/// the constructors below.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    fn new(kind: ObjectType, identity: impl AsRef<str>) -> Self {
        Self(format!("{}:{}", kind.tag(), identity.as_ref()))
    }

    /// Identifier for a role.
    #[must_use]
    pub fn role(name: &str) -> Self {
        Self::new(ObjectType::Role, name)
    }

    /// Identifier for a schema.
    #[must_use]
    pub fn schema(name: &str) -> Self {
        Self::new(ObjectType::Schema, name)
    }

    /// Identifier for an extension.
    #[must_use]
    pub fn extension(name: &str) -> Self {
        Self::new(ObjectType::Extension, name)
    }

    /// Identifier for a collation.
    #[must_use]
    pub fn collation(schema: &str, name: &str) -> Self {
        Self::new(ObjectType::Collation, format!("{schema}.{name}"))
    }

    /// Identifier for a type (enum, composite, or domain).
    #[must_use]
    pub fn type_(schema: &str, name: &str) -> Self {
        Self::new(ObjectType::Type, format!("{schema}.{name}"))
    }

    /// Identifier for a sequence.
    #[must_use]
    pub fn sequence(schema: &str, name: &str) -> Self {
        Self::new(ObjectType::Sequence, format!("{schema}.{name}"))
    }

    /// Identifier for a function or procedure. `args` is the
    /// normalized argument-type signature (e.g. `"integer,text"`),
    /// empty for zero-argument routines.
    #[must_use]
    pub fn function(schema: &str, name: &str, args: &str) -> Self {
        Self::new(ObjectType::Function, format!("{schema}.{name}({args})"))
    }

    /// Identifier for a table.
    #[must_use]
    pub fn table(schema: &str, name: &str) -> Self {
        Self::new(ObjectType::Table, format!("{schema}.{name}"))
    }

    /// Identifier for a column of a table or foreign table.
    #[must_use]
    pub fn column(schema: &str, table: &str, name: &str) -> Self {
        Self(format!("column({schema}.{table}.{name})"))
    }

    /// Identifier for a table constraint.
    #[must_use]
    pub fn constraint(schema: &str, table: &str, name: &str) -> Self {
        Self::new(ObjectType::Constraint, format!("{schema}.{table}.{name}"))
    }

    /// Identifier for an index.
    #[must_use]
    pub fn index(schema: &str, name: &str) -> Self {
        Self::new(ObjectType::Index, format!("{schema}.{name}"))
    }

    /// Identifier for a view.
    #[must_use]
    pub fn view(schema: &str, name: &str) -> Self {
        Self::new(ObjectType::View, format!("{schema}.{name}"))
    }

    /// Identifier for a materialized view.
    #[must_use]
    pub fn materialized_view(schema: &str, name: &str) -> Self {
        Self::new(ObjectType::MaterializedView, format!("{schema}.{name}"))
    }

    /// Identifier for a trigger.
    #[must_use]
    pub fn trigger(schema: &str, table: &str, name: &str) -> Self {
        Self::new(ObjectType::Trigger, format!("{schema}.{table}.{name}"))
    }

    /// Identifier for a rewrite rule.
    #[must_use]
    pub fn rule(schema: &str, table: &str, name: &str) -> Self {
        Self::new(ObjectType::Rule, format!("{schema}.{table}.{name}"))
    }

    /// Identifier for a row-level security policy.
    #[must_use]
    pub fn policy(schema: &str, table: &str, name: &str) -> Self {
        Self::new(ObjectType::Policy, format!("{schema}.{table}.{name}"))
    }

    /// Identifier for a foreign data wrapper.
    #[must_use]
    pub fn foreign_data_wrapper(name: &str) -> Self {
        Self::new(ObjectType::ForeignDataWrapper, name)
    }

    /// Identifier for a foreign server.
    #[must_use]
    pub fn foreign_server(name: &str) -> Self {
        Self::new(ObjectType::ForeignServer, name)
    }

    /// Identifier for a user mapping.
    #[must_use]
    pub fn user_mapping(server: &str, role: &str) -> Self {
        Self::new(ObjectType::UserMapping, format!("{server}.{role}"))
    }

    /// Identifier for a foreign table.
    #[must_use]
    pub fn foreign_table(schema: &str, name: &str) -> Self {
        Self::new(ObjectType::ForeignTable, format!("{schema}.{name}"))
    }

    /// Identifier for a publication.
    #[must_use]
    pub fn publication(name: &str) -> Self {
        Self::new(ObjectType::Publication, name)
    }

    /// Identifier for a subscription.
    #[must_use]
    pub fn subscription(name: &str) -> Self {
        Self::new(ObjectType::Subscription, name)
    }

    /// Identifier for an event trigger.
    #[must_use]
    pub fn event_trigger(name: &str) -> Self {
        Self::new(ObjectType::EventTrigger, name)
    }

    /// Composite identifier for the comment attached to an object.
    #[must_use]
    pub fn comment_on(target: &Self) -> Self {
        Self(format!("comment({})", target.0))
    }

    /// Composite identifier for an ACL entry: the privileges a grantee
    /// holds on an object.
    #[must_use]
    pub fn acl_entry(target: &Self, grantee: &str) -> Self {
        Self(format!("acl({},{grantee})", target.0))
    }

    /// Composite identifier for a role membership.
    #[must_use]
    pub fn membership(role: &str, member: &str) -> Self {
        Self(format!("membership({role},{member})"))
    }

    /// Composite identifier for a default-privilege entry.
    #[must_use]
    pub fn default_acl(owner: &str, kind: &str, schema: Option<&str>, grantee: &str) -> Self {
        Self(format!(
            "defacl({owner},{kind},{},{grantee})",
            schema.unwrap_or("")
        ))
    }

    /// The canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifiers_carry_kind_tag() {
        assert_eq!(ObjectId::role("alice").as_str(), "role:alice");
        assert_eq!(ObjectId::table("public", "t").as_str(), "table:public.t");
        assert_eq!(
            ObjectId::function("public", "f", "integer,text").as_str(),
            "function:public.f(integer,text)"
        );
    }

    #[test]
    fn composite_identifiers() {
        let table = ObjectId::table("public", "t");
        assert_eq!(
            ObjectId::comment_on(&table).as_str(),
            "comment(table:public.t)"
        );
        assert_eq!(
            ObjectId::acl_entry(&table, "alice").as_str(),
            "acl(table:public.t,alice)"
        );
        assert_eq!(
            ObjectId::membership("admin", "alice").as_str(),
            "membership(admin,alice)"
        );
        assert_eq!(
            ObjectId::default_acl("owner", "tables", Some("public"), "alice").as_str(),
            "defacl(owner,tables,public,alice)"
        );
        assert_eq!(
            ObjectId::default_acl("owner", "tables", None, "alice").as_str(),
            "defacl(owner,tables,,alice)"
        );
    }

    #[test]
    fn identifiers_are_stable_map_keys() {
        let a = ObjectId::table("public", "t");
        let b = ObjectId::table("public", "t");
        assert_eq!(a, b);
        assert!(ObjectId::table("a", "x") < ObjectId::table("b", "x"));
    }

    #[test]
    fn every_kind_has_distinct_rank() {
        let kinds = [
            ObjectType::Role,
            ObjectType::Schema,
            ObjectType::Extension,
            ObjectType::Collation,
            ObjectType::Type,
            ObjectType::Sequence,
            ObjectType::Function,
            ObjectType::Table,
            ObjectType::Constraint,
            ObjectType::Index,
            ObjectType::View,
            ObjectType::MaterializedView,
            ObjectType::Trigger,
            ObjectType::Rule,
            ObjectType::Policy,
            ObjectType::ForeignDataWrapper,
            ObjectType::ForeignServer,
            ObjectType::UserMapping,
            ObjectType::ForeignTable,
            ObjectType::Publication,
            ObjectType::Subscription,
            ObjectType::EventTrigger,
        ];
        let mut ranks: Vec<u8> = kinds.iter().map(|k| k.rank()).collect();
        ranks.sort_unstable();
        ranks.dedup();
        assert_eq!(ranks.len(), kinds.len());
    }
}
