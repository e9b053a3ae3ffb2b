//! Schema, extension, and collation diffing.

use super::{comment_change, owner_change, partition, DiffContext};
use crate::change::{Change, NamespaceChange, ObjectRef};

/// Schemas carry only an owner and a comment as data, both alterable.
pub(crate) fn diff_schemas(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.schemas, &ctx.branch.schemas);
    let mut changes = Vec::new();

    for schema in parts.created {
        changes.push(Change::Namespace(NamespaceChange::CreateSchema(schema.clone())));
        changes.extend(comment_change(
            ObjectRef::Schema {
                name: schema.name.clone(),
            },
            None,
            schema.comment.as_ref(),
        ));
    }

    for (old, new) in parts.altered {
        let target = ObjectRef::Schema {
            name: new.name.clone(),
        };
        changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
        changes.extend(comment_change(target, old.comment.as_ref(), new.comment.as_ref()));
    }

    for schema in parts.dropped {
        changes.push(Change::Namespace(NamespaceChange::DropSchema(schema.clone())));
    }

    changes
}

/// Extensions: the version updates in place, the home schema moves in
/// place. Property-group order: version, schema, comment.
pub(crate) fn diff_extensions(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.extensions, &ctx.branch.extensions);
    let mut changes = Vec::new();

    for ext in parts.created {
        changes.push(Change::Namespace(NamespaceChange::CreateExtension(ext.clone())));
        changes.extend(comment_change(
            ObjectRef::Extension {
                name: ext.name.clone(),
            },
            None,
            ext.comment.as_ref(),
        ));
    }

    for (old, new) in parts.altered {
        if old.version != new.version {
            changes.push(Change::Namespace(NamespaceChange::AlterExtensionVersion {
                name: new.name.clone(),
                version: new.version.clone(),
            }));
        }
        if old.schema != new.schema {
            changes.push(Change::Namespace(NamespaceChange::AlterExtensionSchema {
                name: new.name.clone(),
                schema: new.schema.clone(),
            }));
        }
        changes.extend(comment_change(
            ObjectRef::Extension {
                name: new.name.clone(),
            },
            old.comment.as_ref(),
            new.comment.as_ref(),
        ));
    }

    for ext in parts.dropped {
        changes.push(Change::Namespace(NamespaceChange::DropExtension(ext.clone())));
    }

    changes
}

/// Collations: provider, locale, and determinism have no alter form,
/// so any such difference replaces the collation.
pub(crate) fn diff_collations(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.collations, &ctx.branch.collations);
    let mut changes = Vec::new();

    for collation in parts.created {
        changes.push(Change::Namespace(NamespaceChange::CreateCollation(
            collation.clone(),
        )));
        changes.extend(comment_change(
            ObjectRef::Collation {
                schema: collation.schema.clone(),
                name: collation.name.clone(),
            },
            None,
            collation.comment.as_ref(),
        ));
    }

    for (old, new) in parts.altered {
        let replaced = old.provider != new.provider
            || old.locale != new.locale
            || old.deterministic != new.deterministic;
        if replaced {
            changes.push(Change::Namespace(NamespaceChange::DropCollation(old.clone())));
            changes.push(Change::Namespace(NamespaceChange::CreateCollation(new.clone())));
            changes.extend(comment_change(
                ObjectRef::Collation {
                    schema: new.schema.clone(),
                    name: new.name.clone(),
                },
                None,
                new.comment.as_ref(),
            ));
            continue;
        }
        let target = ObjectRef::Collation {
            schema: new.schema.clone(),
            name: new.name.clone(),
        };
        changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
        changes.extend(comment_change(target, old.comment.as_ref(), new.comment.as_ref()));
    }

    for collation in parts.dropped {
        changes.push(Change::Namespace(NamespaceChange::DropCollation(
            collation.clone(),
        )));
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Collation, CollationProvider, Extension, Schema, ServerVersion};

    fn ctx<'a>(main: &'a Catalog, branch: &'a Catalog) -> DiffContext<'a> {
        DiffContext {
            main,
            branch,
            version: ServerVersion::default(),
        }
    }

    fn schema(name: &str, owner: &str) -> Schema {
        Schema {
            name: name.into(),
            owner: owner.into(),
            comment: None,
        }
    }

    #[test]
    fn schema_owner_change_is_an_alter() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_schema(schema("app", "old_owner"));
        branch.add_schema(schema("app", "new_owner"));

        let changes = diff_schemas(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        assert!(matches!(&changes[0], Change::Owner(o) if o.owner == "new_owner"));
    }

    #[test]
    fn extension_version_update() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_extension(Extension {
            name: "pg_trgm".into(),
            schema: "public".into(),
            version: "1.5".into(),
            comment: None,
        });
        branch.add_extension(Extension {
            name: "pg_trgm".into(),
            schema: "public".into(),
            version: "1.6".into(),
            comment: None,
        });

        let changes = diff_extensions(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Change::Namespace(NamespaceChange::AlterExtensionVersion { version, .. })
                if version == "1.6"
        ));
    }

    #[test]
    fn collation_locale_change_replaces() {
        let base = Collation {
            schema: "public".into(),
            name: "ci".into(),
            owner: "postgres".into(),
            provider: CollationProvider::Icu,
            locale: "en-u-ks-level2".into(),
            deterministic: false,
            comment: None,
        };
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_collation(base.clone());
        let mut changed = base;
        changed.locale = "de-u-ks-level2".into();
        branch.add_collation(changed);

        let changes = diff_collations(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
        assert!(matches!(
            &changes[0],
            Change::Namespace(NamespaceChange::DropCollation(_))
        ));
        assert!(matches!(
            &changes[1],
            Change::Namespace(NamespaceChange::CreateCollation(_))
        ));
    }
}
