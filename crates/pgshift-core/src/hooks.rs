//! Integration hooks applied between ordering and emission.
//!
//! Hooks never see the change set before it is ordered, and they never
//! mutate a change: an override builds a new value and serializes
//! that, leaving the planned change untouched.

use crate::catalog::Catalog;
use crate::change::{Change, FdwChange, ReplicationChange};
use crate::error::Result;
use crate::render::RenderOptions;

/// Context handed to hooks alongside each change.
pub struct HookContext<'a> {
    /// The "main" snapshot.
    pub main: &'a Catalog,
    /// The "branch" snapshot.
    pub branch: &'a Catalog,
}

/// A pluggable filter/override applied to the ordered change list.
pub trait ChangeHook {
    /// Returns `false` to drop the change from the script entirely.
    fn filter(&self, _ctx: &HookContext<'_>, _change: &Change) -> bool {
        true
    }

    /// Returns replacement SQL for the change, or `None` to use the
    /// change's own rendering.
    fn override_sql(
        &self,
        _ctx: &HookContext<'_>,
        _change: &Change,
        _opts: &RenderOptions,
    ) -> Option<Result<String>> {
        None
    }
}

/// Renders the ordered change list to statements, applying hooks:
/// a change filtered out by any hook is skipped; the first hook that
/// overrides a change's SQL wins.
pub fn render_script(
    changes: &[Change],
    opts: &RenderOptions,
    hooks: &[&dyn ChangeHook],
    ctx: &HookContext<'_>,
) -> Result<Vec<String>> {
    let mut statements = Vec::with_capacity(changes.len());
    'next: for change in changes {
        for hook in hooks {
            if !hook.filter(ctx, change) {
                continue 'next;
            }
        }
        let mut rendered = None;
        for hook in hooks {
            if let Some(sql) = hook.override_sql(ctx, change, opts) {
                rendered = Some(sql?);
                break;
            }
        }
        match rendered {
            Some(sql) => statements.push(sql),
            None => statements.push(change.to_sql(opts)?),
        }
    }
    Ok(statements)
}

/// Replacement text for masked secrets.
const MASK: &str = "********";

/// Option keys treated as credentials in FDW options.
const SECRET_OPTION_KEYS: &[&str] = &["password", "secret", "sslkey", "access_key", "token"];

/// Masks credentials in subscription connection strings, user-mapping
/// options, and foreign-server options before emission.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskSecrets;

impl MaskSecrets {
    fn mask_connection(connection: &str) -> String {
        connection
            .split_whitespace()
            .map(|token| match token.split_once('=') {
                Some((key, _)) if key.eq_ignore_ascii_case("password") => {
                    format!("{key}={MASK}")
                }
                _ => token.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn mask_options(options: &[String]) -> Vec<String> {
        let mut masked = Vec::with_capacity(options.len());
        let mut iter = options.iter();
        while let Some(key) = iter.next() {
            masked.push(key.clone());
            if let Some(value) = iter.next() {
                if SECRET_OPTION_KEYS.contains(&key.as_str()) {
                    masked.push(MASK.to_string());
                } else {
                    masked.push(value.clone());
                }
            }
        }
        masked
    }

    fn mask_pairs(pairs: &[(String, String)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| {
                if SECRET_OPTION_KEYS.contains(&key.as_str()) {
                    (key.clone(), MASK.to_string())
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect()
    }
}

impl ChangeHook for MaskSecrets {
    fn override_sql(
        &self,
        _ctx: &HookContext<'_>,
        change: &Change,
        opts: &RenderOptions,
    ) -> Option<Result<String>> {
        // Each arm rebuilds a masked copy; the planned change is never
        // touched.
        let masked: Change = match change {
            Change::Replication(ReplicationChange::CreateSubscription(s)) => {
                let mut masked = s.clone();
                masked.connection = Self::mask_connection(&s.connection);
                Change::Replication(ReplicationChange::CreateSubscription(masked))
            }
            Change::Replication(ReplicationChange::SetSubscriptionConnection {
                name,
                connection,
            }) => Change::Replication(ReplicationChange::SetSubscriptionConnection {
                name: name.clone(),
                connection: Self::mask_connection(connection),
            }),
            Change::Fdw(FdwChange::CreateUserMapping(m)) => {
                let mut masked = m.clone();
                masked.options = Self::mask_options(&m.options);
                Change::Fdw(FdwChange::CreateUserMapping(masked))
            }
            Change::Fdw(FdwChange::AlterUserMapping {
                server,
                role,
                options,
            }) => {
                let mut masked = options.clone();
                masked.add = Self::mask_pairs(&options.add);
                masked.set = Self::mask_pairs(&options.set);
                Change::Fdw(FdwChange::AlterUserMapping {
                    server: server.clone(),
                    role: role.clone(),
                    options: masked,
                })
            }
            Change::Fdw(FdwChange::CreateServer(s)) => {
                let mut masked = s.clone();
                masked.options = Self::mask_options(&s.options);
                Change::Fdw(FdwChange::CreateServer(masked))
            }
            Change::Fdw(FdwChange::AlterServer {
                name,
                version,
                options,
            }) => {
                let mut masked = options.clone();
                masked.add = Self::mask_pairs(&options.add);
                masked.set = Self::mask_pairs(&options.set);
                Change::Fdw(FdwChange::AlterServer {
                    name: name.clone(),
                    version: version.clone(),
                    options: masked,
                })
            }
            _ => return None,
        };
        Some(masked.to_sql(opts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Subscription, UserMapping};

    fn ctx_catalogs() -> (Catalog, Catalog) {
        (Catalog::new(), Catalog::new())
    }

    #[test]
    fn subscription_password_masked() {
        let (main, branch) = ctx_catalogs();
        let ctx = HookContext {
            main: &main,
            branch: &branch,
        };
        let change = Change::Replication(ReplicationChange::CreateSubscription(Subscription {
            name: "replica".into(),
            connection: "host=db user=repl password=hunter2".into(),
            publications: vec!["events".into()],
            enabled: true,
            slot_name: None,
            owner: "postgres".into(),
            comment: None,
        }));
        let statements = render_script(
            std::slice::from_ref(&change),
            &RenderOptions::default(),
            &[&MaskSecrets],
            &ctx,
        )
        .unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("password=********"));
        assert!(!statements[0].contains("hunter2"));
    }

    #[test]
    fn user_mapping_password_masked() {
        let (main, branch) = ctx_catalogs();
        let ctx = HookContext {
            main: &main,
            branch: &branch,
        };
        let change = Change::Fdw(FdwChange::CreateUserMapping(UserMapping {
            server: "files".into(),
            role: "app".into(),
            options: vec![
                "user".into(),
                "remote".into(),
                "password".into(),
                "hunter2".into(),
            ],
        }));
        let statements = render_script(
            std::slice::from_ref(&change),
            &RenderOptions::default(),
            &[&MaskSecrets],
            &ctx,
        )
        .unwrap();
        assert!(statements[0].contains("password '********'"));
        assert!(!statements[0].contains("hunter2"));
    }

    #[test]
    fn filter_hook_drops_changes() {
        struct NoSubscriptions;
        impl ChangeHook for NoSubscriptions {
            fn filter(&self, _ctx: &HookContext<'_>, change: &Change) -> bool {
                !matches!(change, Change::Replication(ReplicationChange::CreateSubscription(_)))
            }
        }

        let (main, branch) = ctx_catalogs();
        let ctx = HookContext {
            main: &main,
            branch: &branch,
        };
        let change = Change::Replication(ReplicationChange::CreateSubscription(Subscription {
            name: "replica".into(),
            connection: "host=db".into(),
            publications: vec!["events".into()],
            enabled: true,
            slot_name: None,
            owner: "postgres".into(),
            comment: None,
        }));
        let statements = render_script(
            std::slice::from_ref(&change),
            &RenderOptions::default(),
            &[&NoSubscriptions],
            &ctx,
        )
        .unwrap();
        assert!(statements.is_empty());
    }
}
