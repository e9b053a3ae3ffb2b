//! Per-kind diff functions.
//!
//! Every kind follows the same contract: partition the two snapshots
//! into created / dropped / altered by stable identifier, then emit
//! Create, Drop, or per-property Alter changes. Kind-specific rules
//! decide which differing fields force a full replace (drop + create)
//! and which sibling relationships make a drop implicit (a table drop
//! already removes its indexes, constraints, columns, and policies).

mod fdw;
mod namespaces;
mod privileges;
mod relations;
mod replication;
mod roles;
mod types;
mod views;

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::{Catalog, ServerVersion};
use crate::change::{Change, ChangeOwner, ObjectRef, OptionActions, OptionDelta, SetComment};
use crate::ident::ObjectId;

/// The result of partitioning one kind's two snapshots.
pub(crate) struct Partition<'a, T> {
    /// In branch only.
    pub created: Vec<&'a T>,
    /// In main only.
    pub dropped: Vec<&'a T>,
    /// In both, with differing data fields: `(main, branch)` pairs.
    pub altered: Vec<(&'a T, &'a T)>,
}

/// Partitions two snapshots of one object kind. Iteration follows the
/// maps' key order, so the output is deterministic.
pub(crate) fn partition<'a, T: PartialEq>(
    main: &'a BTreeMap<ObjectId, T>,
    branch: &'a BTreeMap<ObjectId, T>,
) -> Partition<'a, T> {
    let mut result = Partition {
        created: Vec::new(),
        dropped: Vec::new(),
        altered: Vec::new(),
    };
    for (id, new) in branch {
        match main.get(id) {
            None => result.created.push(new),
            Some(old) if old != new => result.altered.push((old, new)),
            Some(_) => {}
        }
    }
    for (id, old) in main {
        if !branch.contains_key(id) {
            result.dropped.push(old);
        }
    }
    result
}

/// Shared lookup context handed to every diff function.
pub(crate) struct DiffContext<'a> {
    /// The "main" snapshot.
    pub main: &'a Catalog,
    /// The "branch" snapshot.
    pub branch: &'a Catalog,
    /// Target server version.
    pub version: ServerVersion,
}

impl DiffContext<'_> {
    /// Resolves a rendered column/attribute type name to a type
    /// identifier when it names a user-defined type present in the
    /// branch snapshot. Array suffixes are stripped; built-in types
    /// (unqualified) resolve to nothing.
    pub fn type_dep(&self, type_name: &str) -> Option<ObjectId> {
        let base = type_name.trim_end_matches("[]");
        let (schema, name) = base.split_once('.')?;
        let id = ObjectId::type_(schema, name);
        self.branch.types.contains_key(&id).then_some(id)
    }

    /// Collects the type dependencies of a column list.
    pub fn column_type_deps(&self, columns: &[crate::catalog::Column]) -> Vec<ObjectId> {
        let mut deps: Vec<ObjectId> = columns
            .iter()
            .filter_map(|c| self.type_dep(&c.type_name))
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }
}

/// Computes the minimal `SET`/`RESET` delta between two flat option
/// lists. `SET` covers added and changed keys, `RESET` removed keys;
/// both come out sorted by key.
pub(crate) fn option_delta(old: &[String], new: &[String]) -> OptionDelta {
    let old_map = crate::catalog::options_map(old);
    let new_map = crate::catalog::options_map(new);
    let mut delta = OptionDelta::default();
    for (key, value) in &new_map {
        if old_map.get(key) != Some(value) {
            delta.set.push(((*key).to_string(), (*value).to_string()));
        }
    }
    for key in old_map.keys() {
        if !new_map.contains_key(key) {
            delta.reset.push((*key).to_string());
        }
    }
    delta
}

/// Computes the minimal `ADD`/`SET`/`DROP` actions between two flat
/// option lists, for the `OPTIONS (…)` alter syntax.
pub(crate) fn option_actions(old: &[String], new: &[String]) -> OptionActions {
    let old_map = crate::catalog::options_map(old);
    let new_map = crate::catalog::options_map(new);
    let mut actions = OptionActions::default();
    for (key, value) in &new_map {
        match old_map.get(key) {
            None => actions.add.push(((*key).to_string(), (*value).to_string())),
            Some(old_value) if old_value != value => {
                actions.set.push(((*key).to_string(), (*value).to_string()));
            }
            Some(_) => {}
        }
    }
    for key in old_map.keys() {
        if !new_map.contains_key(key) {
            actions.drop.push((*key).to_string());
        }
    }
    actions
}

/// Emits the comment change for an object, if any. Pass `None` for
/// `old` on freshly created objects.
pub(crate) fn comment_change(
    target: ObjectRef,
    old: Option<&String>,
    new: Option<&String>,
) -> Option<Change> {
    if old == new {
        return None;
    }
    Some(Change::Comment(SetComment {
        target,
        comment: new.cloned(),
        had_comment: old.is_some(),
    }))
}

/// Emits an owner change when the owner differs.
pub(crate) fn owner_change(target: ObjectRef, old: &str, new: &str) -> Option<Change> {
    (old != new).then(|| {
        Change::Owner(ChangeOwner {
            target,
            owner: new.to_string(),
        })
    })
}

/// Diffs two catalog snapshots across every object kind and returns
/// the combined, still unordered change set.
#[must_use]
pub fn diff_catalogs(main: &Catalog, branch: &Catalog, version: ServerVersion) -> Vec<Change> {
    let ctx = DiffContext {
        main,
        branch,
        version,
    };

    let mut changes = Vec::new();
    changes.extend(roles::diff_roles(&ctx));
    changes.extend(roles::diff_memberships(&ctx));
    changes.extend(namespaces::diff_schemas(&ctx));
    changes.extend(namespaces::diff_extensions(&ctx));
    changes.extend(namespaces::diff_collations(&ctx));
    changes.extend(types::diff_types(&ctx));
    changes.extend(types::diff_sequences(&ctx));
    changes.extend(relations::diff_tables(&ctx));
    changes.extend(relations::diff_constraints(&ctx));
    changes.extend(relations::diff_indexes(&ctx));
    changes.extend(views::diff_views(&ctx));
    changes.extend(views::diff_materialized_views(&ctx));
    changes.extend(views::diff_functions(&ctx));
    changes.extend(views::diff_triggers(&ctx));
    changes.extend(views::diff_rules(&ctx));
    changes.extend(views::diff_policies(&ctx));
    changes.extend(fdw::diff_foreign_data_wrappers(&ctx));
    changes.extend(fdw::diff_foreign_servers(&ctx));
    changes.extend(fdw::diff_user_mappings(&ctx));
    changes.extend(fdw::diff_foreign_tables(&ctx));
    changes.extend(replication::diff_publications(&ctx));
    changes.extend(replication::diff_subscriptions(&ctx));
    changes.extend(replication::diff_event_triggers(&ctx));
    changes.extend(privileges::diff_grants(&ctx));
    changes.extend(privileges::diff_default_acls(&ctx));

    debug!(changes = changes.len(), "catalog diff complete");
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, Role, Table};

    #[test]
    fn identical_catalogs_diff_empty() {
        let mut catalog = Catalog::new();
        catalog.add_role(Role::new("owner"));
        catalog.add_table(
            Table::new("public", "t", "owner").column(Column::new("id", "integer").not_null()),
        );
        let changes = diff_catalogs(&catalog, &catalog.clone(), ServerVersion::default());
        assert!(changes.is_empty());
    }

    #[test]
    fn option_delta_minimal() {
        let old = vec![
            "fillfactor".to_string(),
            "90".to_string(),
            "autovacuum_enabled".to_string(),
            "true".to_string(),
        ];
        let new = vec![
            "fillfactor".to_string(),
            "70".to_string(),
            "toast_tuple_target".to_string(),
            "256".to_string(),
        ];
        let delta = option_delta(&old, &new);
        assert_eq!(
            delta.set,
            vec![
                ("fillfactor".to_string(), "70".to_string()),
                ("toast_tuple_target".to_string(), "256".to_string()),
            ]
        );
        assert_eq!(delta.reset, vec!["autovacuum_enabled".to_string()]);
    }

    #[test]
    fn option_actions_minimal() {
        let old = vec![
            "host".to_string(),
            "a".to_string(),
            "port".to_string(),
            "5432".to_string(),
        ];
        let new = vec![
            "host".to_string(),
            "b".to_string(),
            "dbname".to_string(),
            "x".to_string(),
        ];
        let actions = option_actions(&old, &new);
        assert_eq!(actions.add, vec![("dbname".to_string(), "x".to_string())]);
        assert_eq!(actions.set, vec![("host".to_string(), "b".to_string())]);
        assert_eq!(actions.drop, vec!["port".to_string()]);
    }
}
