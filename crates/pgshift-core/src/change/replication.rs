//! Publication, subscription, and event-trigger changes.

use serde::{Deserialize, Serialize};

use super::{push_role, Operation};
use crate::catalog::{EventTrigger, Publication, PublicationTable, Subscription, TriggerMode};
use crate::error::Result;
use crate::ident::{ObjectId, ObjectType};
use crate::render::{quote_ident, quote_literal, quote_qualified, RenderOptions};

/// Replication-layer changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationChange {
    /// CREATE PUBLICATION.
    CreatePublication(Publication),
    /// ALTER PUBLICATION … SET TABLE ….
    SetPublicationTables {
        /// Publication name.
        name: String,
        /// The new table list.
        tables: Vec<PublicationTable>,
    },
    /// ALTER PUBLICATION … SET (publish = '…').
    SetPublicationOperations {
        /// Publication name.
        name: String,
        /// The new `publish` option value.
        publish: String,
    },
    /// DROP PUBLICATION.
    DropPublication(Publication),
    /// CREATE SUBSCRIPTION.
    CreateSubscription(Subscription),
    /// ALTER SUBSCRIPTION … CONNECTION.
    SetSubscriptionConnection {
        /// Subscription name.
        name: String,
        /// New connection string.
        connection: String,
    },
    /// ALTER SUBSCRIPTION … SET PUBLICATION ….
    SetSubscriptionPublications {
        /// Subscription name.
        name: String,
        /// New publication list.
        publications: Vec<String>,
    },
    /// ALTER SUBSCRIPTION … ENABLE / DISABLE.
    SetSubscriptionEnabled {
        /// Subscription name.
        name: String,
        /// Target state.
        enabled: bool,
    },
    /// DROP SUBSCRIPTION.
    DropSubscription(Subscription),
    /// CREATE EVENT TRIGGER.
    CreateEventTrigger(EventTrigger),
    /// ALTER EVENT TRIGGER … ENABLE/DISABLE.
    SetEventTriggerMode {
        /// Event trigger name.
        name: String,
        /// Target firing mode.
        mode: TriggerMode,
    },
    /// DROP EVENT TRIGGER.
    DropEventTrigger(EventTrigger),
}

impl ReplicationChange {
    pub(crate) fn object_type(&self) -> ObjectType {
        match self {
            Self::CreatePublication(_)
            | Self::SetPublicationTables { .. }
            | Self::SetPublicationOperations { .. }
            | Self::DropPublication(_) => ObjectType::Publication,
            Self::CreateSubscription(_)
            | Self::SetSubscriptionConnection { .. }
            | Self::SetSubscriptionPublications { .. }
            | Self::SetSubscriptionEnabled { .. }
            | Self::DropSubscription(_) => ObjectType::Subscription,
            Self::CreateEventTrigger(_)
            | Self::SetEventTriggerMode { .. }
            | Self::DropEventTrigger(_) => ObjectType::EventTrigger,
        }
    }

    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::CreatePublication(_)
            | Self::CreateSubscription(_)
            | Self::CreateEventTrigger(_) => Operation::Create,
            Self::DropPublication(_) | Self::DropSubscription(_) | Self::DropEventTrigger(_) => {
                Operation::Drop
            }
            _ => Operation::Alter,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::CreatePublication(p) | Self::DropPublication(p) => p.stable_id(),
            Self::SetPublicationTables { name, .. }
            | Self::SetPublicationOperations { name, .. } => ObjectId::publication(name),
            Self::CreateSubscription(s) | Self::DropSubscription(s) => s.stable_id(),
            Self::SetSubscriptionConnection { name, .. }
            | Self::SetSubscriptionPublications { name, .. }
            | Self::SetSubscriptionEnabled { name, .. } => ObjectId::subscription(name),
            Self::CreateEventTrigger(t) | Self::DropEventTrigger(t) => t.stable_id(),
            Self::SetEventTriggerMode { name, .. } => ObjectId::event_trigger(name),
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::CreatePublication(p) => vec![p.stable_id()],
            Self::CreateSubscription(s) => vec![s.stable_id()],
            Self::CreateEventTrigger(t) => vec![t.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::DropPublication(p) => vec![p.stable_id()],
            Self::DropSubscription(s) => vec![s.stable_id()],
            Self::DropEventTrigger(t) => vec![t.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::CreatePublication(p) | Self::DropPublication(p) => {
                let mut ids = Vec::new();
                push_role(&mut ids, &p.owner);
                for table in &p.tables {
                    ids.push(ObjectId::table(&table.schema, &table.name));
                }
                ids
            }
            Self::SetPublicationTables { name, tables } => {
                let mut ids = vec![ObjectId::publication(name)];
                for table in tables {
                    ids.push(ObjectId::table(&table.schema, &table.name));
                }
                ids
            }
            Self::SetPublicationOperations { name, .. } => vec![ObjectId::publication(name)],
            Self::CreateSubscription(s) | Self::DropSubscription(s) => {
                let mut ids = Vec::new();
                push_role(&mut ids, &s.owner);
                ids
            }
            Self::SetSubscriptionConnection { name, .. }
            | Self::SetSubscriptionPublications { name, .. }
            | Self::SetSubscriptionEnabled { name, .. } => vec![ObjectId::subscription(name)],
            Self::CreateEventTrigger(t) | Self::DropEventTrigger(t) => {
                let mut ids = vec![t.function_id()];
                push_role(&mut ids, &t.owner);
                ids
            }
            Self::SetEventTriggerMode { name, .. } => vec![ObjectId::event_trigger(name)],
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::CreatePublication(p) => {
                let mut sql = format!("{} {}", opts.kw("CREATE PUBLICATION"), quote_ident(&p.name));
                if p.all_tables {
                    sql.push_str(&format!(" {}", opts.kw("FOR ALL TABLES")));
                } else if !p.tables.is_empty() {
                    let tables: Vec<String> = p
                        .tables
                        .iter()
                        .map(|t| quote_qualified(&t.schema, &t.name))
                        .collect();
                    sql.push_str(&format!(" {} {}", opts.kw("FOR TABLE"), tables.join(", ")));
                }
                sql.push_str(&format!(
                    " {} (publish = {})",
                    opts.kw("WITH"),
                    quote_literal(&p.publish_list())
                ));
                Ok(sql)
            }
            Self::SetPublicationTables { name, tables } => {
                let rendered: Vec<String> = tables
                    .iter()
                    .map(|t| quote_qualified(&t.schema, &t.name))
                    .collect();
                Ok(format!(
                    "{} {} {} {}",
                    opts.kw("ALTER PUBLICATION"),
                    quote_ident(name),
                    opts.kw("SET TABLE"),
                    rendered.join(", ")
                ))
            }
            Self::SetPublicationOperations { name, publish } => Ok(format!(
                "{} {} {} (publish = {})",
                opts.kw("ALTER PUBLICATION"),
                quote_ident(name),
                opts.kw("SET"),
                quote_literal(publish)
            )),
            Self::DropPublication(p) => Ok(format!(
                "{} {}",
                opts.kw("DROP PUBLICATION"),
                quote_ident(&p.name)
            )),
            Self::CreateSubscription(s) => {
                let publications: Vec<String> =
                    s.publications.iter().map(|p| quote_ident(p)).collect();
                let mut sql = format!(
                    "{} {} {} {} {} {}",
                    opts.kw("CREATE SUBSCRIPTION"),
                    quote_ident(&s.name),
                    opts.kw("CONNECTION"),
                    quote_literal(&s.connection),
                    opts.kw("PUBLICATION"),
                    publications.join(", ")
                );
                let mut with = Vec::new();
                if !s.enabled {
                    with.push("enabled = false".to_string());
                }
                if let Some(slot) = &s.slot_name {
                    with.push(format!("slot_name = {}", quote_literal(slot)));
                }
                if !with.is_empty() {
                    sql.push_str(&format!(" {} ({})", opts.kw("WITH"), with.join(", ")));
                }
                Ok(sql)
            }
            Self::SetSubscriptionConnection { name, connection } => Ok(format!(
                "{} {} {} {}",
                opts.kw("ALTER SUBSCRIPTION"),
                quote_ident(name),
                opts.kw("CONNECTION"),
                quote_literal(connection)
            )),
            Self::SetSubscriptionPublications { name, publications } => {
                let rendered: Vec<String> = publications.iter().map(|p| quote_ident(p)).collect();
                Ok(format!(
                    "{} {} {} {}",
                    opts.kw("ALTER SUBSCRIPTION"),
                    quote_ident(name),
                    opts.kw("SET PUBLICATION"),
                    rendered.join(", ")
                ))
            }
            Self::SetSubscriptionEnabled { name, enabled } => Ok(format!(
                "{} {} {}",
                opts.kw("ALTER SUBSCRIPTION"),
                quote_ident(name),
                opts.kw(if *enabled { "ENABLE" } else { "DISABLE" })
            )),
            Self::DropSubscription(s) => Ok(format!(
                "{} {}",
                opts.kw("DROP SUBSCRIPTION"),
                quote_ident(&s.name)
            )),
            Self::CreateEventTrigger(t) => {
                let mut sql = format!(
                    "{} {} {} {}",
                    opts.kw("CREATE EVENT TRIGGER"),
                    quote_ident(&t.name),
                    opts.kw("ON"),
                    t.event
                );
                if !t.tags.is_empty() {
                    let tags: Vec<String> = t.tags.iter().map(|tag| quote_literal(tag)).collect();
                    sql.push_str(&format!(
                        " {} {} ({})",
                        opts.kw("WHEN"),
                        opts.kw("TAG IN"),
                        tags.join(", ")
                    ));
                }
                sql.push_str(&format!(
                    " {} {}()",
                    opts.kw("EXECUTE FUNCTION"),
                    quote_qualified(&t.function_schema, &t.function_name)
                ));
                Ok(sql)
            }
            Self::SetEventTriggerMode { name, mode } => {
                let keyword = match mode {
                    TriggerMode::Origin => "ENABLE",
                    TriggerMode::Disabled => "DISABLE",
                    TriggerMode::Replica => "ENABLE REPLICA",
                    TriggerMode::Always => "ENABLE ALWAYS",
                };
                Ok(format!(
                    "{} {} {}",
                    opts.kw("ALTER EVENT TRIGGER"),
                    quote_ident(name),
                    opts.kw(keyword)
                ))
            }
            Self::DropEventTrigger(t) => Ok(format!(
                "{} {}",
                opts.kw("DROP EVENT TRIGGER"),
                quote_ident(&t.name)
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events_pub() -> Publication {
        Publication {
            name: "events".into(),
            all_tables: false,
            tables: vec![PublicationTable {
                schema: "public".into(),
                name: "events".into(),
            }],
            publish_insert: true,
            publish_update: true,
            publish_delete: false,
            publish_truncate: false,
            owner: "postgres".into(),
            comment: None,
        }
    }

    #[test]
    fn create_publication_sql() {
        let sql = ReplicationChange::CreatePublication(events_pub())
            .to_sql(&RenderOptions::default())
            .unwrap();
        assert_eq!(
            sql,
            "CREATE PUBLICATION events FOR TABLE public.events WITH (publish = 'insert, update')"
        );
    }

    #[test]
    fn publication_requires_tables() {
        let change = ReplicationChange::CreatePublication(events_pub());
        assert!(change.requires().contains(&ObjectId::table("public", "events")));
    }

    #[test]
    fn subscription_connection_alter() {
        let change = ReplicationChange::SetSubscriptionConnection {
            name: "replica".into(),
            connection: "host=db user=repl password=secret".into(),
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "ALTER SUBSCRIPTION replica CONNECTION 'host=db user=repl password=secret'"
        );
    }
}
