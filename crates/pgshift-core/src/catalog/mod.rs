//! Catalog snapshot model.
//!
//! One immutable record type per object kind, each split into identity
//! fields (which determine the record's [`ObjectId`]) and data fields
//! (compared to decide whether an object was altered). Snapshots are
//! produced by an out-of-scope extraction layer and arrive here already
//! validated; records are constructed once per snapshot, compared, and
//! discarded.

mod fdw;
mod namespaces;
mod privileges;
mod relations;
mod replication;
mod security;
mod types;
mod views;

pub use fdw::{ForeignDataWrapper, ForeignServer, ForeignTable, UserMapping};
pub use namespaces::{Collation, CollationProvider, Extension, Schema};
pub use privileges::{
    AclTarget, DefaultAcl, DefaultAclKind, Grant, Privilege, PrivilegeGrant,
};
pub use relations::{
    Column, ColumnIdentity, ColumnStorage, Constraint, ConstraintKind, FkAction, Index,
    IndexMethod, Persistence, Table,
};
pub use replication::{EventTrigger, Publication, PublicationTable, Subscription, TriggerMode};
pub use security::{Policy, PolicyCommand, Role, RoleMembership};
pub use types::{CompositeAttribute, DomainConstraint, Sequence, SequenceOwner, TypeDef, TypeKind};
pub use views::{Function, MaterializedView, Rule, RoutineKind, Trigger, View};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ident::ObjectId;

/// Major version of the PostgreSQL server the script targets.
///
/// Affects only version-dependent vocabulary, e.g. which privileges
/// exist for the `GRANT ALL` collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerVersion(pub u32);

impl Default for ServerVersion {
    fn default() -> Self {
        Self(16)
    }
}

impl ServerVersion {
    /// `MAINTAIN` joined the table privilege set in PostgreSQL 17.
    #[must_use]
    pub const fn has_maintain_privilege(self) -> bool {
        self.0 >= 17
    }
}

/// A full schema snapshot: one ordered map per object kind, keyed by
/// stable identifier.
///
/// `BTreeMap` keys give every traversal a deterministic order, which
/// the diff engine relies on for byte-identical output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// Roles, keyed by `role:<name>`.
    pub roles: BTreeMap<ObjectId, Role>,
    /// Role memberships, keyed by `membership(role,member)`.
    pub memberships: BTreeMap<ObjectId, RoleMembership>,
    /// Schemas.
    pub schemas: BTreeMap<ObjectId, Schema>,
    /// Extensions.
    pub extensions: BTreeMap<ObjectId, Extension>,
    /// Collations.
    pub collations: BTreeMap<ObjectId, Collation>,
    /// Enum, composite, and domain types.
    pub types: BTreeMap<ObjectId, TypeDef>,
    /// Sequences.
    pub sequences: BTreeMap<ObjectId, Sequence>,
    /// Tables.
    pub tables: BTreeMap<ObjectId, Table>,
    /// Table constraints.
    pub constraints: BTreeMap<ObjectId, Constraint>,
    /// Indexes.
    pub indexes: BTreeMap<ObjectId, Index>,
    /// Views.
    pub views: BTreeMap<ObjectId, View>,
    /// Materialized views.
    pub materialized_views: BTreeMap<ObjectId, MaterializedView>,
    /// Functions and procedures.
    pub functions: BTreeMap<ObjectId, Function>,
    /// Triggers.
    pub triggers: BTreeMap<ObjectId, Trigger>,
    /// Rewrite rules.
    pub rules: BTreeMap<ObjectId, Rule>,
    /// Row-level security policies.
    pub policies: BTreeMap<ObjectId, Policy>,
    /// Foreign data wrappers.
    pub foreign_data_wrappers: BTreeMap<ObjectId, ForeignDataWrapper>,
    /// Foreign servers.
    pub foreign_servers: BTreeMap<ObjectId, ForeignServer>,
    /// User mappings.
    pub user_mappings: BTreeMap<ObjectId, UserMapping>,
    /// Foreign tables.
    pub foreign_tables: BTreeMap<ObjectId, ForeignTable>,
    /// Publications.
    pub publications: BTreeMap<ObjectId, Publication>,
    /// Subscriptions.
    pub subscriptions: BTreeMap<ObjectId, Subscription>,
    /// Event triggers.
    pub event_triggers: BTreeMap<ObjectId, EventTrigger>,
    /// ACL entries (object privileges per grantee).
    pub grants: BTreeMap<ObjectId, Grant>,
    /// Default-privilege entries.
    pub default_acls: BTreeMap<ObjectId, DefaultAcl>,
}

macro_rules! add_fn {
    ($(#[$doc:meta])* $name:ident, $field:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&mut self, record: $ty) {
            self.$field.insert(record.stable_id(), record);
        }
    };
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a catalog from its JSON snapshot form.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    add_fn!(
        /// Adds a role.
        add_role, roles, Role
    );
    add_fn!(
        /// Adds a role membership.
        add_membership, memberships, RoleMembership
    );
    add_fn!(
        /// Adds a schema.
        add_schema, schemas, Schema
    );
    add_fn!(
        /// Adds an extension.
        add_extension, extensions, Extension
    );
    add_fn!(
        /// Adds a collation.
        add_collation, collations, Collation
    );
    add_fn!(
        /// Adds a type.
        add_type, types, TypeDef
    );
    add_fn!(
        /// Adds a sequence.
        add_sequence, sequences, Sequence
    );
    add_fn!(
        /// Adds a table.
        add_table, tables, Table
    );
    add_fn!(
        /// Adds a constraint.
        add_constraint, constraints, Constraint
    );
    add_fn!(
        /// Adds an index.
        add_index, indexes, Index
    );
    add_fn!(
        /// Adds a view.
        add_view, views, View
    );
    add_fn!(
        /// Adds a materialized view.
        add_materialized_view, materialized_views, MaterializedView
    );
    add_fn!(
        /// Adds a function or procedure.
        add_function, functions, Function
    );
    add_fn!(
        /// Adds a trigger.
        add_trigger, triggers, Trigger
    );
    add_fn!(
        /// Adds a rewrite rule.
        add_rule, rules, Rule
    );
    add_fn!(
        /// Adds a policy.
        add_policy, policies, Policy
    );
    add_fn!(
        /// Adds a foreign data wrapper.
        add_foreign_data_wrapper, foreign_data_wrappers, ForeignDataWrapper
    );
    add_fn!(
        /// Adds a foreign server.
        add_foreign_server, foreign_servers, ForeignServer
    );
    add_fn!(
        /// Adds a user mapping.
        add_user_mapping, user_mappings, UserMapping
    );
    add_fn!(
        /// Adds a foreign table.
        add_foreign_table, foreign_tables, ForeignTable
    );
    add_fn!(
        /// Adds a publication.
        add_publication, publications, Publication
    );
    add_fn!(
        /// Adds a subscription.
        add_subscription, subscriptions, Subscription
    );
    add_fn!(
        /// Adds an event trigger.
        add_event_trigger, event_triggers, EventTrigger
    );
    add_fn!(
        /// Adds an ACL entry.
        add_grant, grants, Grant
    );
    add_fn!(
        /// Adds a default-privilege entry.
        add_default_acl, default_acls, DefaultAcl
    );
}

/// Flat `[key, value, key, value, …]` option list, as stored for
/// reloptions, FDW options, server options, and role settings.
/// Comparison and diffing always go through [`options_map`] so the
/// stored order is insignificant.
pub type OptionList = Vec<String>;

/// Builds a key → value map from a flat option list. A trailing key
/// without a value maps to the empty string.
#[must_use]
pub fn options_map(options: &[String]) -> BTreeMap<&str, &str> {
    let mut map = BTreeMap::new();
    let mut iter = options.iter();
    while let Some(key) = iter.next() {
        let value = iter.next().map_or("", String::as_str);
        map.insert(key.as_str(), value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_map_pairs() {
        let opts = vec![
            "fillfactor".to_string(),
            "70".to_string(),
            "autovacuum_enabled".to_string(),
            "false".to_string(),
        ];
        let map = options_map(&opts);
        assert_eq!(map.get("fillfactor"), Some(&"70"));
        assert_eq!(map.get("autovacuum_enabled"), Some(&"false"));
    }

    #[test]
    fn options_map_order_insignificant() {
        let a = vec!["a".to_string(), "1".to_string(), "b".to_string(), "2".to_string()];
        let b = vec!["b".to_string(), "2".to_string(), "a".to_string(), "1".to_string()];
        assert_eq!(options_map(&a), options_map(&b));
    }

    #[test]
    fn server_version_maintain() {
        assert!(!ServerVersion(16).has_maintain_privilege());
        assert!(ServerVersion(17).has_maintain_privilege());
        assert_eq!(ServerVersion::default(), ServerVersion(16));
    }
}
