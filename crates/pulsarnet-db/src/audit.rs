// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use pulsarnet_app::{AuditEvent, AuditEventId};
use rusqlite::params;
use std::env;

use crate::{Store, now_rfc3339, parse_datetime, to_sql_error};

/// Audit trail handle. Constructed explicitly against a store and passed by
/// reference to whoever records events; there is no process-global audit
/// state.
pub struct AuditLog<'a> {
    store: &'a Store,
    actor: String,
}

impl<'a> AuditLog<'a> {
    pub fn new(store: &'a Store, actor: impl Into<String>) -> Self {
        Self {
            store,
            actor: actor.into(),
        }
    }

    /// Actor taken from the invoking user's environment, `system` when
    /// unset (headless runs, cron).
    pub fn from_env_user(store: &'a Store) -> Self {
        let actor = env::var("USER").unwrap_or_else(|_| "system".to_owned());
        Self::new(store, actor)
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn record(
        &self,
        action: &str,
        target_kind: &str,
        target_id: Option<i64>,
        detail: &str,
    ) -> Result<AuditEventId> {
        let now = now_rfc3339()?;
        self.store
            .raw_connection()
            .execute(
                "
                INSERT INTO audit_events (actor, action, target_kind, target_id, detail, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
                params![self.actor, action, target_kind, target_id, detail, now],
            )
            .with_context(|| format!("insert audit event {action}"))?;

        let id = AuditEventId::new(self.store.raw_connection().last_insert_rowid());
        tracing::info!(
            actor = %self.actor,
            action,
            target_kind,
            target_id,
            "audit event recorded"
        );
        Ok(id)
    }
}

impl Store {
    pub fn list_audit_events(&self, limit: i64) -> Result<Vec<AuditEvent>> {
        let capped = limit.clamp(1, crate::AUDIT_LIST_MAX);
        let mut stmt = self
            .raw_connection()
            .prepare(
                "
                SELECT id, actor, action, target_kind, target_id, detail, created_at
                FROM audit_events
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                ",
            )
            .context("prepare audit events query")?;
        let rows = stmt
            .query_map(params![capped], |row| {
                let created_at_raw: String = row.get(6)?;
                Ok(AuditEvent {
                    id: AuditEventId::new(row.get(0)?),
                    actor: row.get(1)?,
                    action: row.get(2)?,
                    target_kind: row.get(3)?,
                    target_id: row.get(4)?,
                    detail: row.get(5)?,
                    created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
                })
            })
            .context("query audit events")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect audit events")
    }
}

#[cfg(test)]
mod tests {
    use super::AuditLog;
    use crate::Store;
    use anyhow::Result;

    #[test]
    fn record_and_list_events() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;

        let audit = AuditLog::new(&store, "netops");
        audit.record("backup", "device", Some(3), "run started")?;
        audit.record("delete", "device", Some(4), "")?;

        let events = store.list_audit_events(10)?;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| event.actor == "netops"));
        assert!(events.iter().any(|event| event.action == "backup"));
        Ok(())
    }

    #[test]
    fn list_is_capped() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;

        let audit = AuditLog::new(&store, "netops");
        for index in 0..5 {
            audit.record("backup", "device", Some(index), "")?;
        }

        assert_eq!(store.list_audit_events(3)?.len(), 3);
        Ok(())
    }
}
