//! Publications, subscriptions, and event triggers.

use serde::{Deserialize, Serialize};

use crate::ident::ObjectId;

/// A table published by a publication.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicationTable {
    /// Schema.
    pub schema: String,
    /// Table name.
    pub name: String,
}

/// A logical replication publication.
///
/// Identity: `name`. `FOR ALL TABLES` cannot be toggled in place; the
/// table list and the published operations can.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    /// Publication name.
    pub name: String,
    /// FOR ALL TABLES flag.
    pub all_tables: bool,
    /// Published tables (empty when `all_tables`).
    pub tables: Vec<PublicationTable>,
    /// Publish INSERT.
    pub publish_insert: bool,
    /// Publish UPDATE.
    pub publish_update: bool,
    /// Publish DELETE.
    pub publish_delete: bool,
    /// Publish TRUNCATE.
    pub publish_truncate: bool,
    /// Owning role.
    pub owner: String,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Publication {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::publication(&self.name)
    }

    /// The `publish = '…'` option value.
    #[must_use]
    pub fn publish_list(&self) -> String {
        let mut ops = Vec::new();
        if self.publish_insert {
            ops.push("insert");
        }
        if self.publish_update {
            ops.push("update");
        }
        if self.publish_delete {
            ops.push("delete");
        }
        if self.publish_truncate {
            ops.push("truncate");
        }
        ops.join(", ")
    }
}

/// A logical replication subscription.
///
/// Identity: `name`. Connection string, publication list, and the
/// enabled flag are all alterable. The connection string typically
/// contains credentials; see the masking hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription name.
    pub name: String,
    /// Connection string to the publisher.
    pub connection: String,
    /// Publications subscribed to.
    pub publications: Vec<String>,
    /// Whether the subscription is enabled.
    pub enabled: bool,
    /// Replication slot name, if not the default.
    pub slot_name: Option<String>,
    /// Owning role.
    pub owner: String,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Subscription {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::subscription(&self.name)
    }
}

/// Firing mode of an event trigger (`ALTER EVENT TRIGGER … ENABLE/…`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Fires in origin and local modes (the default).
    #[default]
    Origin,
    /// Disabled.
    Disabled,
    /// Fires in replica mode.
    Replica,
    /// Always fires.
    Always,
}

/// An event trigger.
///
/// Identity: `name`. Event, function, and filter tags are
/// non-alterable; the firing mode is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTrigger {
    /// Event trigger name.
    pub name: String,
    /// Event, e.g. `ddl_command_end`.
    pub event: String,
    /// `WHEN TAG IN (…)` filter tags.
    pub tags: Vec<String>,
    /// Schema of the trigger function.
    pub function_schema: String,
    /// Name of the trigger function.
    pub function_name: String,
    /// Firing mode.
    pub mode: TriggerMode,
    /// Owning role.
    pub owner: String,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl EventTrigger {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::event_trigger(&self.name)
    }

    /// Stable identifier of the trigger function.
    #[must_use]
    pub fn function_id(&self) -> ObjectId {
        ObjectId::function(&self.function_schema, &self.function_name, "")
    }
}
