//! Type and sequence diffing.

use super::{comment_change, owner_change, partition, DiffContext};
use crate::catalog::{TypeDef, TypeKind};
use crate::change::{Change, DomainAction, ObjectRef, SequenceChange, SequenceDelta, TypeChange};
use crate::ident::ObjectId;

fn type_ref(def: &TypeDef) -> ObjectRef {
    match def.kind {
        TypeKind::Domain { .. } => ObjectRef::Domain {
            schema: def.schema.clone(),
            name: def.name.clone(),
        },
        _ => ObjectRef::Type {
            schema: def.schema.clone(),
            name: def.name.clone(),
        },
    }
}

fn create_type_deps(ctx: &DiffContext<'_>, def: &TypeDef) -> Vec<ObjectId> {
    let mut deps = Vec::new();
    match &def.kind {
        TypeKind::Enum { .. } => {}
        TypeKind::Composite { attributes } => {
            for attribute in attributes {
                deps.extend(ctx.type_dep(&attribute.type_name));
            }
        }
        TypeKind::Domain { base_type, .. } => {
            deps.extend(ctx.type_dep(base_type));
        }
    }
    deps.retain(|dep| dep != &def.stable_id());
    deps.sort();
    deps.dedup();
    deps
}

fn create_type(ctx: &DiffContext<'_>, def: &TypeDef) -> Vec<Change> {
    let mut changes = vec![Change::Type(TypeChange::Create {
        def: def.clone(),
        type_deps: create_type_deps(ctx, def),
    })];
    changes.extend(comment_change(type_ref(def), None, def.comment.as_ref()));
    changes
}

/// True when the type exists on both sides but will be dropped and
/// re-created, destroying dependent ACL entries.
pub(crate) fn type_replaced_id(ctx: &DiffContext<'_>, id: &ObjectId) -> bool {
    match (ctx.main.types.get(id), ctx.branch.types.get(id)) {
        (Some(old), Some(new)) => matches!(diff_type_shape(&old.kind, &new.kind), ShapeDiff::Replace),
        _ => false,
    }
}

/// Enum labels are append-only alterable; composites can add and drop
/// attributes in place; domains can change default, null, and check
/// constraints in place. Everything else replaces the type.
pub(crate) fn diff_types(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.types, &ctx.branch.types);
    let mut changes = Vec::new();

    for def in parts.created {
        changes.extend(create_type(ctx, def));
    }

    for (old, new) in parts.altered {
        match diff_type_shape(&old.kind, &new.kind) {
            ShapeDiff::Replace => {
                changes.push(Change::Type(TypeChange::Drop(old.clone())));
                changes.extend(create_type(ctx, new));
                continue;
            }
            ShapeDiff::InPlace(actions) => {
                for action in actions {
                    changes.push(shape_action_change(ctx, new, action));
                }
            }
        }
        changes.extend(owner_change(type_ref(new), &old.owner, &new.owner));
        changes.extend(comment_change(
            type_ref(new),
            old.comment.as_ref(),
            new.comment.as_ref(),
        ));
    }

    for def in parts.dropped {
        changes.push(Change::Type(TypeChange::Drop(def.clone())));
    }

    changes
}

/// An in-place shape edit, before being lifted into a change.
enum ShapeAction {
    AddLabel(String),
    AddAttribute(crate::catalog::CompositeAttribute),
    DropAttribute(String),
    Domain(DomainAction),
}

enum ShapeDiff {
    Replace,
    InPlace(Vec<ShapeAction>),
}

fn diff_type_shape(old: &TypeKind, new: &TypeKind) -> ShapeDiff {
    match (old, new) {
        (TypeKind::Enum { labels: old_labels }, TypeKind::Enum { labels: new_labels }) => {
            if new_labels.len() >= old_labels.len()
                && new_labels[..old_labels.len()] == old_labels[..]
            {
                ShapeDiff::InPlace(
                    new_labels[old_labels.len()..]
                        .iter()
                        .map(|label| ShapeAction::AddLabel(label.clone()))
                        .collect(),
                )
            } else {
                ShapeDiff::Replace
            }
        }
        (
            TypeKind::Composite {
                attributes: old_attrs,
            },
            TypeKind::Composite {
                attributes: new_attrs,
            },
        ) => {
            // Attributes that exist on both sides must be identical;
            // a changed attribute type has no in-place form here.
            for old_attr in old_attrs {
                if let Some(new_attr) = new_attrs.iter().find(|a| a.name == old_attr.name) {
                    if old_attr != new_attr {
                        return ShapeDiff::Replace;
                    }
                }
            }
            let mut actions = Vec::new();
            for old_attr in old_attrs {
                if !new_attrs.iter().any(|a| a.name == old_attr.name) {
                    actions.push(ShapeAction::DropAttribute(old_attr.name.clone()));
                }
            }
            for new_attr in new_attrs {
                if !old_attrs.iter().any(|a| a.name == new_attr.name) {
                    actions.push(ShapeAction::AddAttribute(new_attr.clone()));
                }
            }
            ShapeDiff::InPlace(actions)
        }
        (
            TypeKind::Domain {
                base_type: old_base,
                not_null: old_null,
                default: old_default,
                constraints: old_constraints,
            },
            TypeKind::Domain {
                base_type: new_base,
                not_null: new_null,
                default: new_default,
                constraints: new_constraints,
            },
        ) => {
            if old_base != new_base {
                return ShapeDiff::Replace;
            }
            let mut actions = Vec::new();
            if old_default != new_default {
                actions.push(ShapeAction::Domain(DomainAction::SetDefault(
                    new_default.clone(),
                )));
            }
            if old_null != new_null {
                actions.push(ShapeAction::Domain(DomainAction::SetNotNull(*new_null)));
            }
            for old_constraint in old_constraints {
                let survived = new_constraints
                    .iter()
                    .any(|c| c.name == old_constraint.name && c.check == old_constraint.check);
                if !survived {
                    actions.push(ShapeAction::Domain(DomainAction::DropConstraint {
                        name: old_constraint.name.clone(),
                    }));
                }
            }
            for new_constraint in new_constraints {
                let existed = old_constraints
                    .iter()
                    .any(|c| c.name == new_constraint.name && c.check == new_constraint.check);
                if !existed {
                    actions.push(ShapeAction::Domain(DomainAction::AddConstraint {
                        name: new_constraint.name.clone(),
                        check: new_constraint.check.clone(),
                    }));
                }
            }
            ShapeDiff::InPlace(actions)
        }
        // The shape discriminant itself changed.
        _ => ShapeDiff::Replace,
    }
}

fn shape_action_change(ctx: &DiffContext<'_>, def: &TypeDef, action: ShapeAction) -> Change {
    match action {
        ShapeAction::AddLabel(label) => Change::Type(TypeChange::AddEnumLabel {
            schema: def.schema.clone(),
            name: def.name.clone(),
            label,
        }),
        ShapeAction::AddAttribute(attribute) => {
            let type_dep = ctx.type_dep(&attribute.type_name);
            Change::Type(TypeChange::AddAttribute {
                schema: def.schema.clone(),
                name: def.name.clone(),
                attribute,
                type_dep,
            })
        }
        ShapeAction::DropAttribute(attribute) => Change::Type(TypeChange::DropAttribute {
            schema: def.schema.clone(),
            name: def.name.clone(),
            attribute,
        }),
        ShapeAction::Domain(action) => Change::Type(TypeChange::AlterDomain {
            schema: def.schema.clone(),
            name: def.name.clone(),
            action,
        }),
    }
}

/// Sequences alter in place for every property. A dropped sequence
/// owned by a column of a dropped table is removed by the table drop.
pub(crate) fn diff_sequences(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.sequences, &ctx.branch.sequences);
    let mut changes = Vec::new();

    for sequence in parts.created {
        changes.push(Change::Sequence(SequenceChange::Create(sequence.clone())));
        changes.extend(comment_change(
            ObjectRef::Sequence {
                schema: sequence.schema.clone(),
                name: sequence.name.clone(),
            },
            None,
            sequence.comment.as_ref(),
        ));
    }

    for (old, new) in parts.altered {
        let delta = SequenceDelta {
            data_type: (old.data_type != new.data_type).then(|| new.data_type.clone()),
            start: (old.start != new.start).then_some(new.start),
            increment: (old.increment != new.increment).then_some(new.increment),
            min_value: (old.min_value != new.min_value).then_some(new.min_value),
            max_value: (old.max_value != new.max_value).then_some(new.max_value),
            cache: (old.cache != new.cache).then_some(new.cache),
            cycle: (old.cycle != new.cycle).then_some(new.cycle),
            owned_by: (old.owned_by != new.owned_by).then(|| new.owned_by.clone()),
        };
        if !delta.is_empty() {
            changes.push(Change::Sequence(SequenceChange::Alter {
                schema: new.schema.clone(),
                name: new.name.clone(),
                delta,
            }));
        }
        let target = ObjectRef::Sequence {
            schema: new.schema.clone(),
            name: new.name.clone(),
        };
        changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
        changes.extend(comment_change(target, old.comment.as_ref(), new.comment.as_ref()));
    }

    for sequence in parts.dropped {
        if let Some(owned) = &sequence.owned_by {
            let table_survives = ctx
                .branch
                .tables
                .contains_key(&ObjectId::table(&owned.schema, &owned.table));
            if !table_survives {
                continue;
            }
        }
        changes.push(Change::Sequence(SequenceChange::Drop(sequence.clone())));
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Sequence, SequenceOwner, ServerVersion, Table};

    fn ctx<'a>(main: &'a Catalog, branch: &'a Catalog) -> DiffContext<'a> {
        DiffContext {
            main,
            branch,
            version: ServerVersion::default(),
        }
    }

    fn enum_type(labels: &[&str]) -> TypeDef {
        TypeDef {
            schema: "public".into(),
            name: "status".into(),
            owner: "postgres".into(),
            kind: TypeKind::Enum {
                labels: labels.iter().map(|&l| l.into()).collect(),
            },
            comment: None,
        }
    }

    #[test]
    fn appended_enum_label_alters_in_place() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_type(enum_type(&["open", "closed"]));
        branch.add_type(enum_type(&["open", "closed", "archived"]));

        let changes = diff_types(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Change::Type(TypeChange::AddEnumLabel { label, .. }) if label == "archived"
        ));
    }

    #[test]
    fn reordered_enum_labels_replace() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_type(enum_type(&["open", "closed"]));
        branch.add_type(enum_type(&["closed", "open"]));

        let changes = diff_types(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], Change::Type(TypeChange::Drop(_))));
        assert!(matches!(&changes[1], Change::Type(TypeChange::Create { .. })));
    }

    #[test]
    fn sequence_drop_skipped_when_owning_table_dropped() {
        let mut main = Catalog::new();
        let branch = Catalog::new();
        main.add_table(Table::new("public", "t", "postgres"));
        main.add_sequence(Sequence {
            schema: "public".into(),
            name: "t_id_seq".into(),
            data_type: "bigint".into(),
            start: 1,
            increment: 1,
            min_value: None,
            max_value: None,
            cache: 1,
            cycle: false,
            owned_by: Some(SequenceOwner {
                schema: "public".into(),
                table: "t".into(),
                column: "id".into(),
            }),
            owner: "postgres".into(),
            comment: None,
        });

        let changes = diff_sequences(&ctx(&main, &branch));
        assert!(changes.is_empty());
    }

    #[test]
    fn sequence_restart_parameters_alter() {
        let base = Sequence {
            schema: "public".into(),
            name: "s".into(),
            data_type: "bigint".into(),
            start: 1,
            increment: 1,
            min_value: None,
            max_value: None,
            cache: 1,
            cycle: false,
            owned_by: None,
            owner: "postgres".into(),
            comment: None,
        };
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_sequence(base.clone());
        let mut changed = base;
        changed.increment = 10;
        changed.cycle = true;
        branch.add_sequence(changed);

        let changes = diff_sequences(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Change::Sequence(SequenceChange::Alter { delta, .. })
                if delta.increment == Some(10) && delta.cycle == Some(true)
        ));
    }
}
