//! Publication, subscription, and event-trigger diffing.

use super::{comment_change, owner_change, partition, DiffContext};
use crate::change::{Change, ObjectRef, ReplicationChange};

/// Publication diff. `FOR ALL TABLES` cannot be toggled in place; the
/// table list and published operations can. Property-group order:
/// tables, operations, owner, comment.
pub(crate) fn diff_publications(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.publications, &ctx.branch.publications);
    let mut changes = Vec::new();

    for publication in parts.created {
        changes.push(Change::Replication(ReplicationChange::CreatePublication(
            publication.clone(),
        )));
        changes.extend(comment_change(
            ObjectRef::Publication {
                name: publication.name.clone(),
            },
            None,
            publication.comment.as_ref(),
        ));
    }

    for (old, new) in parts.altered {
        if old.all_tables != new.all_tables {
            changes.push(Change::Replication(ReplicationChange::DropPublication(
                old.clone(),
            )));
            changes.push(Change::Replication(ReplicationChange::CreatePublication(
                new.clone(),
            )));
            changes.extend(comment_change(
                ObjectRef::Publication {
                    name: new.name.clone(),
                },
                None,
                new.comment.as_ref(),
            ));
            continue;
        }
        if old.tables != new.tables {
            changes.push(Change::Replication(ReplicationChange::SetPublicationTables {
                name: new.name.clone(),
                tables: new.tables.clone(),
            }));
        }
        if old.publish_list() != new.publish_list() {
            changes.push(Change::Replication(
                ReplicationChange::SetPublicationOperations {
                    name: new.name.clone(),
                    publish: new.publish_list(),
                },
            ));
        }
        let target = ObjectRef::Publication {
            name: new.name.clone(),
        };
        changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
        changes.extend(comment_change(target, old.comment.as_ref(), new.comment.as_ref()));
    }

    for publication in parts.dropped {
        changes.push(Change::Replication(ReplicationChange::DropPublication(
            publication.clone(),
        )));
    }

    changes
}

/// Subscription diff. Connection, publication list, and the enabled
/// flag all alter in place, in that order.
pub(crate) fn diff_subscriptions(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.subscriptions, &ctx.branch.subscriptions);
    let mut changes = Vec::new();

    for subscription in parts.created {
        changes.push(Change::Replication(ReplicationChange::CreateSubscription(
            subscription.clone(),
        )));
        changes.extend(comment_change(
            ObjectRef::Subscription {
                name: subscription.name.clone(),
            },
            None,
            subscription.comment.as_ref(),
        ));
    }

    for (old, new) in parts.altered {
        if old.slot_name != new.slot_name {
            changes.push(Change::Replication(ReplicationChange::DropSubscription(
                old.clone(),
            )));
            changes.push(Change::Replication(ReplicationChange::CreateSubscription(
                new.clone(),
            )));
            changes.extend(comment_change(
                ObjectRef::Subscription {
                    name: new.name.clone(),
                },
                None,
                new.comment.as_ref(),
            ));
            continue;
        }
        if old.connection != new.connection {
            changes.push(Change::Replication(
                ReplicationChange::SetSubscriptionConnection {
                    name: new.name.clone(),
                    connection: new.connection.clone(),
                },
            ));
        }
        if old.publications != new.publications {
            changes.push(Change::Replication(
                ReplicationChange::SetSubscriptionPublications {
                    name: new.name.clone(),
                    publications: new.publications.clone(),
                },
            ));
        }
        if old.enabled != new.enabled {
            changes.push(Change::Replication(
                ReplicationChange::SetSubscriptionEnabled {
                    name: new.name.clone(),
                    enabled: new.enabled,
                },
            ));
        }
        let target = ObjectRef::Subscription {
            name: new.name.clone(),
        };
        changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
        changes.extend(comment_change(target, old.comment.as_ref(), new.comment.as_ref()));
    }

    for subscription in parts.dropped {
        changes.push(Change::Replication(ReplicationChange::DropSubscription(
            subscription.clone(),
        )));
    }

    changes
}

/// Event-trigger diff. Event, function, and filter tags force a
/// replace; only the firing mode alters in place.
pub(crate) fn diff_event_triggers(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.event_triggers, &ctx.branch.event_triggers);
    let mut changes = Vec::new();

    for trigger in parts.created {
        changes.push(Change::Replication(ReplicationChange::CreateEventTrigger(
            trigger.clone(),
        )));
        changes.extend(comment_change(
            ObjectRef::EventTrigger {
                name: trigger.name.clone(),
            },
            None,
            trigger.comment.as_ref(),
        ));
    }

    for (old, new) in parts.altered {
        let replaced = old.event != new.event
            || old.tags != new.tags
            || old.function_schema != new.function_schema
            || old.function_name != new.function_name;
        if replaced {
            changes.push(Change::Replication(ReplicationChange::DropEventTrigger(
                old.clone(),
            )));
            changes.push(Change::Replication(ReplicationChange::CreateEventTrigger(
                new.clone(),
            )));
            changes.extend(comment_change(
                ObjectRef::EventTrigger {
                    name: new.name.clone(),
                },
                None,
                new.comment.as_ref(),
            ));
            continue;
        }
        if old.mode != new.mode {
            changes.push(Change::Replication(ReplicationChange::SetEventTriggerMode {
                name: new.name.clone(),
                mode: new.mode,
            }));
        }
        let target = ObjectRef::EventTrigger {
            name: new.name.clone(),
        };
        changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
        changes.extend(comment_change(target, old.comment.as_ref(), new.comment.as_ref()));
    }

    for trigger in parts.dropped {
        changes.push(Change::Replication(ReplicationChange::DropEventTrigger(
            trigger.clone(),
        )));
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Publication, PublicationTable, ServerVersion, Subscription};

    fn ctx<'a>(main: &'a Catalog, branch: &'a Catalog) -> DiffContext<'a> {
        DiffContext {
            main,
            branch,
            version: ServerVersion::default(),
        }
    }

    fn publication(tables: Vec<PublicationTable>) -> Publication {
        Publication {
            name: "events".into(),
            all_tables: false,
            tables,
            publish_insert: true,
            publish_update: true,
            publish_delete: true,
            publish_truncate: true,
            owner: "postgres".into(),
            comment: None,
        }
    }

    #[test]
    fn publication_table_list_alters() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_publication(publication(vec![PublicationTable {
            schema: "public".into(),
            name: "a".into(),
        }]));
        branch.add_publication(publication(vec![
            PublicationTable {
                schema: "public".into(),
                name: "a".into(),
            },
            PublicationTable {
                schema: "public".into(),
                name: "b".into(),
            },
        ]));

        let changes = diff_publications(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Change::Replication(ReplicationChange::SetPublicationTables { tables, .. })
                if tables.len() == 2
        ));
    }

    #[test]
    fn all_tables_flip_replaces() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_publication(publication(Vec::new()));
        let mut all = publication(Vec::new());
        all.all_tables = true;
        branch.add_publication(all);

        let changes = diff_publications(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn subscription_disable() {
        let base = Subscription {
            name: "replica".into(),
            connection: "host=db".into(),
            publications: vec!["events".into()],
            enabled: true,
            slot_name: None,
            owner: "postgres".into(),
            comment: None,
        };
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_subscription(base.clone());
        let mut disabled = base;
        disabled.enabled = false;
        branch.add_subscription(disabled);

        let changes = diff_subscriptions(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Change::Replication(ReplicationChange::SetSubscriptionEnabled {
                enabled: false,
                ..
            })
        ));
    }
}
