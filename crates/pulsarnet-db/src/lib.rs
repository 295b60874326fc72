// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod audit;
pub mod backup;

use anyhow::{Context, Result, anyhow, bail};
use pulsarnet_app::{
    AppSetting, BackupProtocol, ConnectionStatus, DashboardCounts, DeletionEntity,
    DeletionRecord, DeletionRecordId, Device, DeviceGroup, DeviceGroupId, DeviceId, DeviceType,
    SettingKey, SettingValue,
};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

pub use audit::AuditLog;
pub use backup::{BackupEngine, ConfigFetcher, FileFetcher, SimulatedFetcher};

pub const APP_NAME: &str = "pulsarnet";
pub const MAX_BACKUP_SIZE: i64 = 10 << 20;

const AUDIT_LIST_MAX: i64 = 500;

const DEMO_DEVICES: [(&str, &str, &str); 8] = [
    ("core-nyc-01", "10.10.0.1", "cisco_ios"),
    ("core-nyc-02", "10.10.0.2", "cisco_nxos"),
    ("edge-sfo-01", "10.20.0.1", "juniper_junos"),
    ("dist-chi-01", "10.30.0.1", "arista_eos"),
    ("fw-nyc-01", "10.10.0.20", "paloalto_panos"),
    ("fw-lon-01", "10.40.0.20", "fortinet_fortios"),
    ("acc-dal-01", "10.50.0.1", "hp_procurve"),
    ("wan-fra-01", "10.60.0.1", "huawei_vrp"),
];

const DEMO_GROUPS: [(&str, &str, &[&str]); 2] = [
    (
        "Core Network",
        "Backbone switches and routers",
        &["core-nyc-01", "core-nyc-02", "dist-chi-01"],
    ),
    (
        "Perimeter Firewalls",
        "Internet edge firewalls",
        &["fw-nyc-01", "fw-lon-01"],
    ),
];

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "devices",
        &[
            "id",
            "name",
            "host",
            "port",
            "device_type",
            "username",
            "connection_status",
            "last_backup_at",
            "last_error",
            "notes",
            "created_at",
            "updated_at",
            "deleted_at",
        ],
    ),
    (
        "device_groups",
        &[
            "id",
            "name",
            "description",
            "created_at",
            "updated_at",
            "deleted_at",
        ],
    ),
    ("group_members", &["group_id", "device_id"]),
    (
        "backup_records",
        &[
            "id",
            "device_id",
            "status",
            "protocol",
            "config_data",
            "size_bytes",
            "sha256",
            "error_message",
            "started_at",
            "finished_at",
        ],
    ),
    (
        "deletion_records",
        &["id", "entity", "target_id", "deleted_at", "restored_at"],
    ),
    ("settings", &["key", "value", "updated_at"]),
    (
        "audit_events",
        &[
            "id",
            "actor",
            "action",
            "target_kind",
            "target_id",
            "detail",
            "created_at",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_devices_name",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_devices_name ON devices (name);",
    },
    RequiredIndex {
        name: "idx_devices_deleted_at",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_devices_deleted_at ON devices (deleted_at);",
    },
    RequiredIndex {
        name: "idx_device_groups_name",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_device_groups_name ON device_groups (name);",
    },
    RequiredIndex {
        name: "idx_device_groups_deleted_at",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_device_groups_deleted_at ON device_groups (deleted_at);",
    },
    RequiredIndex {
        name: "idx_group_members_device_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_group_members_device_id ON group_members (device_id);",
    },
    RequiredIndex {
        name: "idx_backup_records_device_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_backup_records_device_id ON backup_records (device_id);",
    },
    RequiredIndex {
        name: "idx_backup_records_started_at",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_backup_records_started_at ON backup_records (started_at);",
    },
    RequiredIndex {
        name: "idx_deletion_records_entity",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_deletion_records_entity ON deletion_records (entity);",
    },
    RequiredIndex {
        name: "idx_deletion_records_target_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_deletion_records_target_id ON deletion_records (target_id);",
    },
    RequiredIndex {
        name: "idx_audit_events_created_at",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_audit_events_created_at ON audit_events (created_at);",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDevice {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub device_type: DeviceType,
    pub username: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDevice {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub device_type: DeviceType,
    pub username: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
}

/// Wire shape for JSON inventory import/export. The original tool kept its
/// whole inventory in a JSON file; this stays compatible with hand-edited
/// exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDevice {
    pub name: String,
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub device_type: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub notes: String,
}

const fn default_ssh_port() -> u16 {
    22
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEntityRef {
    Device(DeviceId),
    Group(DeviceGroupId),
}

impl LifecycleEntityRef {
    const fn entity(self) -> DeletionEntity {
        match self {
            Self::Device(_) => DeletionEntity::Device,
            Self::Group(_) => DeletionEntity::DeviceGroup,
        }
    }

    const fn table(self) -> &'static str {
        match self {
            Self::Device(_) => "devices",
            Self::Group(_) => "device_groups",
        }
    }

    const fn id(self) -> i64 {
        match self {
            Self::Device(id) => id.get(),
            Self::Group(id) => id.get(),
        }
    }
}

pub struct Store {
    conn: Connection,
    max_backup_size: i64,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            max_backup_size: MAX_BACKUP_SIZE,
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            max_backup_size: MAX_BACKUP_SIZE,
        })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)?;
        tracing::debug!("database schema verified");
        Ok(())
    }

    pub fn set_max_backup_size(&mut self, value: i64) -> Result<()> {
        if value <= 0 {
            bail!("max backup size must be positive, got {value}");
        }
        self.max_backup_size = value;
        Ok(())
    }

    pub fn max_backup_size(&self) -> i64 {
        self.max_backup_size
    }

    pub fn seed_demo_data(&self) -> Result<()> {
        for (name, host, type_tag) in DEMO_DEVICES {
            let device_type = DeviceType::parse(type_tag)
                .ok_or_else(|| anyhow!("demo device {name} has unknown type {type_tag}"))?;
            self.create_device(&NewDevice {
                name: name.to_owned(),
                host: host.to_owned(),
                port: 22,
                device_type,
                username: "backup".to_owned(),
                notes: String::new(),
            })?;
        }

        for (group_name, description, members) in DEMO_GROUPS {
            let group_id = self.create_group(&NewGroup {
                name: group_name.to_owned(),
                description: description.to_owned(),
            })?;
            for member in members {
                let device = self
                    .get_device_by_name(member)?
                    .ok_or_else(|| anyhow!("demo group member {member} missing"))?;
                self.add_device_to_group(group_id, device.id)?;
            }
        }

        Ok(())
    }

    pub fn create_device(&self, new_device: &NewDevice) -> Result<DeviceId> {
        if new_device.name.trim().is_empty() {
            bail!("device name must not be empty");
        }
        if new_device.host.trim().is_empty() {
            bail!("device host must not be empty");
        }

        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO devices (
                  name, host, port, device_type, username,
                  connection_status, notes, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    new_device.name,
                    new_device.host,
                    i64::from(new_device.port),
                    new_device.device_type.as_str(),
                    new_device.username,
                    ConnectionStatus::Unknown.as_str(),
                    new_device.notes,
                    now,
                    now,
                ],
            )
            .with_context(|| format!("insert device {}", new_device.name))?;

        Ok(DeviceId::new(self.conn.last_insert_rowid()))
    }

    pub fn update_device(&self, device_id: DeviceId, update: &UpdateDevice) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE devices
                SET
                  name = ?,
                  host = ?,
                  port = ?,
                  device_type = ?,
                  username = ?,
                  notes = ?,
                  updated_at = ?
                WHERE id = ? AND deleted_at IS NULL
                ",
                params![
                    update.name,
                    update.host,
                    i64::from(update.port),
                    update.device_type.as_str(),
                    update.username,
                    update.notes,
                    now,
                    device_id.get(),
                ],
            )
            .context("update device")?;
        if rows_affected == 0 {
            bail!(
                "device {} not found or deleted -- choose an existing device and retry",
                device_id.get()
            );
        }
        Ok(())
    }

    /// Connection and backup bookkeeping updated by the backup engine after
    /// each attempt.
    pub fn update_device_backup_state(
        &self,
        device_id: DeviceId,
        status: ConnectionStatus,
        last_backup_at: Option<OffsetDateTime>,
        last_error: Option<&str>,
    ) -> Result<()> {
        let now = now_rfc3339()?;
        let last_backup = last_backup_at
            .map(|value| value.format(&Rfc3339).context("format last backup time"))
            .transpose()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE devices
                SET
                  connection_status = ?,
                  last_backup_at = COALESCE(?, last_backup_at),
                  last_error = ?,
                  updated_at = ?
                WHERE id = ?
                ",
                params![status.as_str(), last_backup, last_error, now, device_id.get()],
            )
            .context("update device backup state")?;
        if rows_affected == 0 {
            bail!("device {} not found", device_id.get());
        }
        Ok(())
    }

    pub fn get_device(&self, device_id: DeviceId) -> Result<Device> {
        self.conn
            .query_row(
                &format!("{DEVICE_SELECT} WHERE id = ?"),
                params![device_id.get()],
                device_from_row,
            )
            .with_context(|| format!("load device {}", device_id.get()))
    }

    pub fn get_device_by_name(&self, name: &str) -> Result<Option<Device>> {
        self.conn
            .query_row(
                &format!("{DEVICE_SELECT} WHERE name = ? AND deleted_at IS NULL"),
                params![name],
                device_from_row,
            )
            .optional()
            .with_context(|| format!("load device {name}"))
    }

    pub fn list_devices(&self, include_deleted: bool) -> Result<Vec<Device>> {
        let mut sql = String::from(DEVICE_SELECT);
        if !include_deleted {
            sql.push_str("WHERE deleted_at IS NULL\n");
        }
        sql.push_str("ORDER BY name ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql).context("prepare devices query")?;
        let rows = stmt.query_map([], device_from_row).context("query devices")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect devices")
    }

    pub fn soft_delete_device(&self, device_id: DeviceId) -> Result<()> {
        self.soft_delete(LifecycleEntityRef::Device(device_id))
    }

    pub fn restore_device(&self, device_id: DeviceId) -> Result<()> {
        self.restore(LifecycleEntityRef::Device(device_id))
    }

    pub fn soft_delete_group(&self, group_id: DeviceGroupId) -> Result<()> {
        self.soft_delete(LifecycleEntityRef::Group(group_id))
    }

    pub fn restore_group(&self, group_id: DeviceGroupId) -> Result<()> {
        self.restore(LifecycleEntityRef::Group(group_id))
    }

    pub fn soft_delete(&self, target: LifecycleEntityRef) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                &format!(
                    "UPDATE {} SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
                    target.table()
                ),
                params![now, now, target.id()],
            )
            .with_context(|| format!("soft delete {} {}", target.entity().as_str(), target.id()))?;
        if rows_affected == 0 {
            bail!(
                "{} {} not found or already deleted",
                target.entity().as_str(),
                target.id()
            );
        }

        self.conn
            .execute(
                "INSERT INTO deletion_records (entity, target_id, deleted_at) VALUES (?, ?, ?)",
                params![target.entity().as_str(), target.id(), now],
            )
            .context("insert deletion record")?;
        Ok(())
    }

    pub fn restore(&self, target: LifecycleEntityRef) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                &format!(
                    "UPDATE {} SET deleted_at = NULL, updated_at = ? WHERE id = ? AND deleted_at IS NOT NULL",
                    target.table()
                ),
                params![now, target.id()],
            )
            .with_context(|| format!("restore {} {}", target.entity().as_str(), target.id()))?;
        if rows_affected == 0 {
            bail!(
                "{} {} not found or not deleted",
                target.entity().as_str(),
                target.id()
            );
        }

        self.conn
            .execute(
                "
                UPDATE deletion_records
                SET restored_at = ?
                WHERE entity = ? AND target_id = ? AND restored_at IS NULL
                ",
                params![now, target.entity().as_str(), target.id()],
            )
            .context("mark deletion record restored")?;
        Ok(())
    }

    pub fn create_group(&self, new_group: &NewGroup) -> Result<DeviceGroupId> {
        if new_group.name.trim().is_empty() {
            bail!("group name must not be empty");
        }

        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO device_groups (name, description, created_at, updated_at)
                VALUES (?, ?, ?, ?)
                ",
                params![new_group.name, new_group.description, now, now],
            )
            .with_context(|| format!("insert group {}", new_group.name))?;

        Ok(DeviceGroupId::new(self.conn.last_insert_rowid()))
    }

    pub fn list_groups(&self, include_deleted: bool) -> Result<Vec<DeviceGroup>> {
        let mut sql = String::from(
            "
            SELECT
              g.id, g.name, g.description,
              (
                SELECT COUNT(*)
                FROM group_members gm
                JOIN devices d ON d.id = gm.device_id
                WHERE gm.group_id = g.id AND d.deleted_at IS NULL
              ) AS member_count,
              g.created_at, g.updated_at, g.deleted_at
            FROM device_groups g
            ",
        );
        if !include_deleted {
            sql.push_str("WHERE g.deleted_at IS NULL\n");
        }
        sql.push_str("ORDER BY g.name ASC, g.id ASC");

        let mut stmt = self.conn.prepare(&sql).context("prepare groups query")?;
        let rows = stmt
            .query_map([], |row| {
                let created_at_raw: String = row.get(4)?;
                let updated_at_raw: String = row.get(5)?;
                let deleted_at_raw: Option<String> = row.get(6)?;
                let member_count: i64 = row.get(3)?;

                Ok(DeviceGroup {
                    id: DeviceGroupId::new(row.get(0)?),
                    name: row.get(1)?,
                    description: row.get(2)?,
                    member_count: member_count.max(0) as usize,
                    created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
                    updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
                    deleted_at: parse_opt_datetime(deleted_at_raw).map_err(to_sql_error)?,
                })
            })
            .context("query groups")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect groups")
    }

    pub fn add_device_to_group(&self, group_id: DeviceGroupId, device_id: DeviceId) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO group_members (group_id, device_id) VALUES (?, ?)",
                params![group_id.get(), device_id.get()],
            )
            .context("insert group member")?;
        Ok(())
    }

    pub fn remove_device_from_group(
        &self,
        group_id: DeviceGroupId,
        device_id: DeviceId,
    ) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM group_members WHERE group_id = ? AND device_id = ?",
                params![group_id.get(), device_id.get()],
            )
            .context("delete group member")?;
        Ok(())
    }

    pub fn list_group_devices(&self, group_id: DeviceGroupId) -> Result<Vec<Device>> {
        let sql = format!(
            "
            {DEVICE_SELECT}
            WHERE deleted_at IS NULL
              AND id IN (SELECT device_id FROM group_members WHERE group_id = ?)
            ORDER BY name ASC, id ASC
            "
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare group devices query")?;
        let rows = stmt
            .query_map(params![group_id.get()], device_from_row)
            .context("query group devices")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect group devices")
    }

    pub fn list_settings(&self) -> Result<Vec<AppSetting>> {
        let mut settings = Vec::with_capacity(SettingKey::ALL.len());
        for key in SettingKey::ALL {
            let raw = self.get_setting_raw(key.as_str())?;
            let value = match raw {
                Some(raw) => SettingValue::parse_for_key(key, &raw).ok_or_else(|| {
                    anyhow!(
                        "setting {} has invalid stored value {raw:?}; set a valid value in Settings",
                        key.as_str()
                    )
                })?,
                None => default_setting_value(key),
            };
            settings.push(AppSetting { key, value });
        }
        Ok(settings)
    }

    pub fn put_setting_raw(&self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
                ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("store setting {key}"))?;
        Ok(())
    }

    fn get_setting_raw(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("load setting {key}"))
    }

    pub fn get_show_dashboard_override(&self) -> Result<Option<bool>> {
        let raw = self.get_setting_raw(SettingKey::UiShowDashboard.as_str())?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        match SettingValue::parse_for_key(SettingKey::UiShowDashboard, &raw) {
            Some(SettingValue::Bool(value)) => Ok(Some(value)),
            _ => bail!(
                "setting ui.show_dashboard has invalid stored value {raw:?}; set a valid value in Settings"
            ),
        }
    }

    pub fn put_show_dashboard(&self, show: bool) -> Result<()> {
        let value = SettingValue::Bool(show)
            .to_storage(SettingKey::UiShowDashboard)
            .ok_or_else(|| anyhow!("encode ui.show_dashboard"))?;
        self.put_setting_raw(SettingKey::UiShowDashboard.as_str(), &value)
    }

    pub fn get_backup_protocol(&self) -> Result<BackupProtocol> {
        let raw = self.get_setting_raw(SettingKey::BackupProtocol.as_str())?;
        let Some(raw) = raw else {
            return Ok(BackupProtocol::Tftp);
        };
        BackupProtocol::parse(&raw).ok_or_else(|| {
            anyhow!(
                "setting backup.protocol has invalid stored value {raw:?}; set one of tftp, scp, sftp, ftp"
            )
        })
    }

    pub fn put_backup_protocol(&self, protocol: BackupProtocol) -> Result<()> {
        self.put_setting_raw(SettingKey::BackupProtocol.as_str(), protocol.as_str())
    }

    pub fn list_deletion_records(&self) -> Result<Vec<DeletionRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, entity, target_id, deleted_at, restored_at
                FROM deletion_records
                ORDER BY deleted_at DESC, id DESC
                ",
            )
            .context("prepare deletion records query")?;
        let rows = stmt
            .query_map([], |row| {
                let entity_raw: String = row.get(1)?;
                let entity = DeletionEntity::parse(&entity_raw).ok_or_else(|| {
                    to_sql_error(anyhow!("unknown deletion entity {entity_raw}"))
                })?;
                let deleted_at_raw: String = row.get(3)?;
                let restored_at_raw: Option<String> = row.get(4)?;
                Ok(DeletionRecord {
                    id: DeletionRecordId::new(row.get(0)?),
                    entity,
                    target_id: row.get(2)?,
                    deleted_at: parse_datetime(&deleted_at_raw).map_err(to_sql_error)?,
                    restored_at: parse_opt_datetime(restored_at_raw).map_err(to_sql_error)?,
                })
            })
            .context("query deletion records")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect deletion records")
    }

    pub fn dashboard_counts(&self) -> Result<DashboardCounts> {
        let devices_total: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM devices WHERE deleted_at IS NULL",
                [],
                |row| row.get(0),
            )
            .context("count devices")?;

        let devices_failed: i64 = self
            .conn
            .query_row(
                "
                SELECT COUNT(*)
                FROM devices
                WHERE deleted_at IS NULL
                  AND connection_status IN ('backup_failed', 'auth_failed', 'timeout', 'error')
                ",
                [],
                |row| row.get(0),
            )
            .context("count failed devices")?;

        let backups_today: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM backup_records WHERE substr(started_at, 1, 10) = date('now')",
                [],
                |row| row.get(0),
            )
            .context("count today's backups")?;

        Ok(DashboardCounts {
            devices_total: devices_total.max(0) as usize,
            devices_failed: devices_failed.max(0) as usize,
            backups_today: backups_today.max(0) as usize,
        })
    }

    pub fn export_inventory(&self) -> Result<String> {
        let devices = self.list_devices(false)?;
        let wire: Vec<InventoryDevice> = devices
            .into_iter()
            .map(|device| InventoryDevice {
                name: device.name,
                host: device.host,
                port: device.port,
                device_type: device.device_type.as_str().to_owned(),
                username: device.username,
                notes: device.notes,
            })
            .collect();
        serde_json::to_string_pretty(&wire).context("encode inventory JSON")
    }

    /// Import devices from a JSON inventory export. Devices whose name
    /// already exists are skipped, not overwritten.
    pub fn import_inventory(&self, json: &str) -> Result<ImportSummary> {
        let wire: Vec<InventoryDevice> =
            serde_json::from_str(json).context("parse inventory JSON")?;

        let mut summary = ImportSummary::default();
        for entry in wire {
            let device_type = DeviceType::parse(&entry.device_type).ok_or_else(|| {
                anyhow!(
                    "device {} has unknown type {:?}; fix the export and retry",
                    entry.name,
                    entry.device_type
                )
            })?;

            if self.get_device_by_name(&entry.name)?.is_some() {
                summary.skipped += 1;
                continue;
            }

            self.create_device(&NewDevice {
                name: entry.name,
                host: entry.host,
                port: entry.port,
                device_type,
                username: entry.username,
                notes: entry.notes,
            })?;
            summary.imported += 1;
        }

        tracing::info!(
            imported = summary.imported,
            skipped = summary.skipped,
            "inventory import finished"
        );
        Ok(summary)
    }
}

const DEVICE_SELECT: &str = "
    SELECT
      id, name, host, port, device_type, username,
      connection_status, last_backup_at, last_error, notes,
      created_at, updated_at, deleted_at
    FROM devices
    ";

fn device_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Device> {
    let type_raw: String = row.get(4)?;
    let device_type = DeviceType::parse(&type_raw).ok_or_else(|| {
        to_sql_error(anyhow!("unknown device type {type_raw}"))
    })?;

    let status_raw: String = row.get(6)?;
    let connection_status = ConnectionStatus::parse(&status_raw).ok_or_else(|| {
        to_sql_error(anyhow!("unknown connection status {status_raw}"))
    })?;

    let port: i64 = row.get(3)?;
    let last_backup_raw: Option<String> = row.get(7)?;
    let created_at_raw: String = row.get(10)?;
    let updated_at_raw: String = row.get(11)?;
    let deleted_at_raw: Option<String> = row.get(12)?;

    Ok(Device {
        id: DeviceId::new(row.get(0)?),
        name: row.get(1)?,
        host: row.get(2)?,
        port: u16::try_from(port).map_err(|_| to_sql_error(anyhow!("port {port} out of range")))?,
        device_type,
        username: row.get(5)?,
        connection_status,
        last_backup_at: parse_opt_datetime(last_backup_raw).map_err(to_sql_error)?,
        last_error: row.get(8)?,
        notes: row.get(9)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
        deleted_at: parse_opt_datetime(deleted_at_raw).map_err(to_sql_error)?,
    })
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os("PULSARNET_DB_PATH") {
        return Ok(PathBuf::from(path));
    }

    let data_root = dirs::data_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set PULSARNET_DB_PATH to the database file")
    })?;
    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("pulsarnet.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path == ":memory:" {
        return Ok(());
    }
    let looks_like_uri = path.contains("://") || path.starts_with("file:");
    if looks_like_uri || path.contains('?') {
        bail!("database path {path:?} looks like a URI; use a plain filesystem path");
    }
    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use a pulsarnet-compatible database or migrate first"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; run migration before launching",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn default_setting_value(key: SettingKey) -> SettingValue {
    match key {
        SettingKey::UiShowDashboard => SettingValue::Bool(true),
        SettingKey::BackupProtocol => SettingValue::Text("tftp".to_owned()),
    }
}

pub(crate) fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

pub(crate) fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

pub(crate) fn parse_opt_datetime(raw: Option<String>) -> Result<Option<OffsetDateTime>> {
    raw.as_deref().map(parse_datetime).transpose()
}

pub(crate) fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}

pub(crate) fn checksum_sha256(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut output = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
