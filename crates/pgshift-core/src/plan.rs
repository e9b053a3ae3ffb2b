//! The ordering engine.
//!
//! Takes the unordered change set produced by the diff and linearizes
//! it so that every statement runs after everything it requires exists
//! and before anything it requires is dropped. Three edge rules derive
//! the graph from each change's `creates`/`drops`/`requires` sets:
//!
//! 1. creator(X) → C for every non-destructive C requiring X
//!    (create before use);
//! 2. C → dropper(X) for every destructive C requiring X, or for any
//!    C requiring X when X has no creator in the set (use before
//!    drop — dependents go first);
//! 3. dropper(X) → creator(X) when an identifier is both dropped and
//!    re-created (replace: the old object is gone before the new one
//!    is made).
//!
//! Ties between ready changes are broken by a fixed key (operation
//! rank, kind rank — reversed for drops — then target identifier, then
//! input position), so identical inputs always produce byte-identical
//! scripts.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use tracing::debug;

use crate::change::Change;
use crate::error::{PlanError, Result};
use crate::ident::ObjectId;

/// Orders a change set into a valid execution sequence.
///
/// # Errors
///
/// Returns [`PlanError::DependencyCycle`] naming the stuck changes'
/// target identifiers when the graph cannot be linearized. Cycles
/// between tables never occur here because foreign keys are split
/// into their own changes by the diff; a genuine cycle means the
/// snapshots describe something DDL cannot express one statement at a
/// time.
pub fn plan(changes: Vec<Change>) -> Result<Vec<Change>> {
    let n = changes.len();

    let mut creator: BTreeMap<ObjectId, usize> = BTreeMap::new();
    let mut dropper: BTreeMap<ObjectId, usize> = BTreeMap::new();
    for (i, change) in changes.iter().enumerate() {
        for id in change.creates() {
            creator.insert(id, i);
        }
        for id in change.drops() {
            dropper.insert(id, i);
        }
    }

    let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    let mut indegree: Vec<usize> = vec![0; n];
    let add_edge = |successors: &mut Vec<BTreeSet<usize>>,
                        indegree: &mut Vec<usize>,
                        from: usize,
                        to: usize| {
        if from != to && successors[from].insert(to) {
            indegree[to] += 1;
        }
    };

    for (i, change) in changes.iter().enumerate() {
        let destructive = !change.drops().is_empty();
        for id in change.requires() {
            match (creator.get(&id), dropper.get(&id)) {
                (Some(&j), _) if !destructive => {
                    add_edge(&mut successors, &mut indegree, j, i);
                }
                (creator_entry, Some(&j)) if destructive || creator_entry.is_none() => {
                    add_edge(&mut successors, &mut indegree, i, j);
                }
                _ => {}
            }
        }
        for id in change.drops() {
            if let Some(&j) = creator.get(&id) {
                add_edge(&mut successors, &mut indegree, i, j);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<((u8, u8, ObjectId), usize)>> = changes
        .iter()
        .enumerate()
        .filter(|(i, _)| indegree[*i] == 0)
        .map(|(i, change)| Reverse((change.sort_key(), i)))
        .collect();

    let mut order: Vec<usize> = Vec::with_capacity(n);
    while let Some(Reverse((_, i))) = ready.pop() {
        order.push(i);
        for &j in &successors[i] {
            indegree[j] -= 1;
            if indegree[j] == 0 {
                ready.push(Reverse((changes[j].sort_key(), j)));
            }
        }
    }

    if order.len() < n {
        let mut ids: Vec<String> = changes
            .iter()
            .enumerate()
            .filter(|(i, _)| !order.contains(i))
            .map(|(_, change)| change.target_id().to_string())
            .collect();
        ids.sort();
        ids.dedup();
        return Err(PlanError::DependencyCycle { ids });
    }

    debug!(statements = n, "plan complete");
    let mut by_position: Vec<Option<Change>> = changes.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|i| by_position[i].take())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        Catalog, Column, Constraint, ConstraintKind, FkAction, Role, Schema, ServerVersion, Table,
    };
    use crate::diff::diff_catalogs;

    fn fk(table: &str, name: &str, ref_table: &str) -> Constraint {
        Constraint {
            schema: "public".into(),
            table: table.into(),
            name: name.into(),
            kind: ConstraintKind::ForeignKey {
                columns: vec!["other_id".into()],
                ref_schema: "public".into(),
                ref_table: ref_table.into(),
                ref_columns: vec!["id".into()],
                on_delete: FkAction::NoAction,
                on_update: FkAction::NoAction,
            },
            deferrable: false,
            initially_deferred: false,
            validated: true,
            comment: None,
        }
    }

    fn two_table_branch() -> Catalog {
        let mut branch = Catalog::new();
        branch.add_role(Role::new("postgres"));
        branch.add_schema(Schema {
            name: "public".into(),
            owner: "postgres".into(),
            comment: None,
        });
        for name in ["a", "b"] {
            branch.add_table(
                Table::new("public", name, "postgres")
                    .column(Column::new("id", "integer").not_null())
                    .column(Column::new("other_id", "integer")),
            );
        }
        branch.add_constraint(fk("a", "a_other_fk", "b"));
        branch.add_constraint(fk("b", "b_other_fk", "a"));
        branch
    }

    /// Walks the ordered list and checks that every requirement that
    /// is created in-set exists when used and that nothing is used
    /// after being dropped.
    fn assert_sound(ordered: &[Change]) {
        let created_in_set: std::collections::BTreeSet<ObjectId> =
            ordered.iter().flat_map(Change::creates).collect();
        let mut existing: std::collections::BTreeSet<ObjectId> = std::collections::BTreeSet::new();
        let mut gone: std::collections::BTreeSet<ObjectId> = std::collections::BTreeSet::new();
        for change in ordered {
            for id in change.requires() {
                assert!(
                    !gone.contains(&id),
                    "{} requires already-dropped {id}",
                    change.target_id()
                );
                if created_in_set.contains(&id) && !change.drops().contains(&id) {
                    // Destructive changes reference the old object,
                    // which pre-exists; creations must have run.
                    if change.drops().is_empty() {
                        assert!(
                            existing.contains(&id),
                            "{} requires not-yet-created {id}",
                            change.target_id()
                        );
                    }
                }
            }
            for id in change.drops() {
                gone.remove(&id);
                existing.remove(&id);
                gone.insert(id);
            }
            for id in change.creates() {
                gone.remove(&id);
                existing.insert(id);
            }
        }
    }

    #[test]
    fn circular_foreign_keys_split_after_creates() {
        let main = Catalog::new();
        let branch = two_table_branch();
        let changes = diff_catalogs(&main, &branch, ServerVersion::default());
        let ordered = plan(changes).unwrap();
        assert_sound(&ordered);

        let position = |pred: &dyn Fn(&Change) -> bool| {
            ordered
                .iter()
                .position(|c| pred(c))
                .expect("change present")
        };
        let create_a = position(&|c| {
            matches!(c, Change::Relation(crate::change::RelationChange::CreateTable { table, .. }) if table.name == "a")
        });
        let create_b = position(&|c| {
            matches!(c, Change::Relation(crate::change::RelationChange::CreateTable { table, .. }) if table.name == "b")
        });
        let add_fk_a = position(&|c| {
            matches!(c, Change::Constraint(crate::change::ConstraintChange::Add(k)) if k.name == "a_other_fk")
        });
        let add_fk_b = position(&|c| {
            matches!(c, Change::Constraint(crate::change::ConstraintChange::Add(k)) if k.name == "b_other_fk")
        });
        assert!(create_a < add_fk_a && create_a < add_fk_b);
        assert!(create_b < add_fk_a && create_b < add_fk_b);
    }

    #[test]
    fn plan_is_deterministic() {
        let main = Catalog::new();
        let branch = two_table_branch();
        let first = plan(diff_catalogs(&main, &branch, ServerVersion::default())).unwrap();
        let second = plan(diff_catalogs(&main, &branch, ServerVersion::default())).unwrap();
        assert_eq!(first, second);

        // Same change set fed in reverse order still linearizes to the
        // same script.
        let mut reversed = diff_catalogs(&main, &branch, ServerVersion::default());
        reversed.reverse();
        let third = plan(reversed).unwrap();
        let render = |changes: &[Change]| -> Vec<String> {
            changes
                .iter()
                .map(|c| c.to_sql(&crate::render::RenderOptions::default()).unwrap())
                .collect()
        };
        assert_eq!(render(&first), render(&third));
    }

    #[test]
    fn dependents_drop_before_their_dependency() {
        let main = two_table_branch();
        let mut branch = Catalog::new();
        branch.add_role(Role::new("postgres"));
        branch.add_schema(Schema {
            name: "public".into(),
            owner: "postgres".into(),
            comment: None,
        });
        // Both tables and both FKs are gone. The mutual references
        // mean neither implied FK drop can wait for the other, so the
        // diff splits out explicit constraint drops and the planner
        // puts them before either table drop.
        let changes = diff_catalogs(&main, &branch, ServerVersion::default());
        let ordered = plan(changes).unwrap();
        assert_sound(&ordered);

        let last_constraint_drop = ordered
            .iter()
            .rposition(|c| matches!(c, Change::Constraint(crate::change::ConstraintChange::Drop(_))))
            .expect("explicit constraint drops");
        let first_table_drop = ordered
            .iter()
            .position(|c| matches!(c, Change::Relation(crate::change::RelationChange::DropTable { .. })))
            .expect("table drops");
        assert!(last_constraint_drop < first_table_drop);
    }

    #[test]
    fn schema_created_before_table_dropped_after() {
        let main = Catalog::new();
        let mut branch = Catalog::new();
        branch.add_role(Role::new("postgres"));
        branch.add_schema(Schema {
            name: "app".into(),
            owner: "postgres".into(),
            comment: None,
        });
        branch.add_table(
            Table::new("app", "t", "postgres").column(Column::new("id", "integer")),
        );
        let ordered = plan(diff_catalogs(&main, &branch, ServerVersion::default())).unwrap();
        assert_sound(&ordered);
        let schema_pos = ordered
            .iter()
            .position(|c| matches!(c, Change::Namespace(_)))
            .unwrap();
        let table_pos = ordered
            .iter()
            .position(|c| matches!(c, Change::Relation(_)))
            .unwrap();
        assert!(schema_pos < table_pos);
    }

    #[test]
    fn replace_drops_old_before_creating_new() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        for catalog in [&mut main, &mut branch] {
            catalog.add_role(Role::new("postgres"));
            catalog.add_schema(Schema {
                name: "public".into(),
                owner: "postgres".into(),
                comment: None,
            });
        }
        main.add_table(
            Table::new("public", "t", "postgres").column(Column::new("id", "integer")),
        );
        let mut partitioned =
            Table::new("public", "t", "postgres").column(Column::new("id", "integer"));
        partitioned.partition_by = Some("RANGE (id)".into());
        branch.add_table(partitioned);

        let ordered = plan(diff_catalogs(&main, &branch, ServerVersion::default())).unwrap();
        let drop_pos = ordered
            .iter()
            .position(|c| matches!(c, Change::Relation(crate::change::RelationChange::DropTable { .. })))
            .unwrap();
        let create_pos = ordered
            .iter()
            .position(|c| matches!(c, Change::Relation(crate::change::RelationChange::CreateTable { .. })))
            .unwrap();
        assert!(drop_pos < create_pos);
    }

    #[test]
    fn genuine_cycle_is_reported() {
        use crate::catalog::View;
        // Two fresh views that each claim to depend on the other —
        // inexpressible, and the planner must say so rather than drop
        // one silently.
        let mut branch = Catalog::new();
        branch.add_role(Role::new("postgres"));
        branch.add_schema(Schema {
            name: "public".into(),
            owner: "postgres".into(),
            comment: None,
        });
        branch.add_view(View {
            schema: "public".into(),
            name: "v1".into(),
            definition: "SELECT * FROM public.v2".into(),
            options: Vec::new(),
            owner: "postgres".into(),
            depends_on: vec![ObjectId::view("public", "v2")],
            comment: None,
        });
        branch.add_view(View {
            schema: "public".into(),
            name: "v2".into(),
            definition: "SELECT * FROM public.v1".into(),
            options: Vec::new(),
            owner: "postgres".into(),
            depends_on: vec![ObjectId::view("public", "v1")],
            comment: None,
        });

        let result = plan(diff_catalogs(&Catalog::new(), &branch, ServerVersion::default()));
        match result {
            Err(PlanError::DependencyCycle { ids }) => {
                assert!(ids.iter().any(|id| id.contains("v1")));
                assert!(ids.iter().any(|id| id.contains("v2")));
            }
            other => panic!("expected DependencyCycle, got {other:?}"),
        }
    }
}
