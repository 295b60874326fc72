// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use pulsarnet_app::{
    BackupProtocol, BackupRecord, BackupRecordId, BackupRunSummary, BackupStatus,
    ConnectionStatus, Device, DeviceId,
};
use rusqlite::{OptionalExtension, params};
use std::fs;
use std::path::PathBuf;
use time::OffsetDateTime;

use crate::{
    AuditLog, Store, checksum_sha256, now_rfc3339, parse_datetime, parse_opt_datetime,
    to_sql_error,
};

/// Transport seam. The real device transports (tftp/scp/sftp sessions to
/// network gear) live outside this crate; anything that can produce the
/// device's configuration text plugs in here.
pub trait ConfigFetcher {
    fn fetch(&mut self, device: &Device) -> Result<String>;
}

/// Deterministic stand-in fetcher for demo mode and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedFetcher;

impl ConfigFetcher for SimulatedFetcher {
    fn fetch(&mut self, device: &Device) -> Result<String> {
        let mut config = format!(
            "! {} ({})\nhostname {}\n",
            device.device_type.label(),
            device.host,
            device.name
        );
        for index in 0..4 {
            config.push_str(&format!(
                "interface GigabitEthernet0/{index}\n no shutdown\n"
            ));
        }
        config.push_str("line vty 0 4\n transport input ssh\nend\n");
        Ok(config)
    }
}

/// Reads staged configuration files named `<device>.cfg` from a directory
/// populated by external collection tooling.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ConfigFetcher for FileFetcher {
    fn fetch(&mut self, device: &Device) -> Result<String> {
        let path = self.root.join(format!("{}.cfg", device.name));
        fs::read_to_string(&path)
            .with_context(|| format!("read staged config {}", path.display()))
    }
}

pub struct BackupEngine<'a, F> {
    store: &'a Store,
    fetcher: F,
    protocol: BackupProtocol,
}

impl<'a, F: ConfigFetcher> BackupEngine<'a, F> {
    pub fn new(store: &'a Store, fetcher: F, protocol: BackupProtocol) -> Self {
        Self {
            store,
            fetcher,
            protocol,
        }
    }

    /// Back up `devices` in order. A failing device records a failed
    /// attempt and the run continues with the rest; there is no retry.
    pub fn run(&mut self, devices: &[Device], audit: &AuditLog<'_>) -> Result<BackupRunSummary> {
        let mut summary = BackupRunSummary {
            attempted: devices.len(),
            ..BackupRunSummary::default()
        };

        for device in devices {
            self.store.update_device_backup_state(
                device.id,
                ConnectionStatus::BackingUp,
                None,
                None,
            )?;

            match self.backup_one(device) {
                Ok(record_id) => {
                    summary.succeeded += 1;
                    tracing::info!(device = %device.name, record = record_id.get(), "backup stored");
                    audit.record(
                        "backup",
                        "device",
                        Some(device.id.get()),
                        &format!("stored via {}", self.protocol.as_str()),
                    )?;
                }
                Err(error) => {
                    summary.failed += 1;
                    tracing::warn!(device = %device.name, %error, "backup failed");
                    self.store.insert_failed_backup(
                        device.id,
                        self.protocol,
                        &error.to_string(),
                    )?;
                    self.store.update_device_backup_state(
                        device.id,
                        ConnectionStatus::BackupFailed,
                        None,
                        Some(&error.to_string()),
                    )?;
                    audit.record(
                        "backup_failed",
                        "device",
                        Some(device.id.get()),
                        &error.to_string(),
                    )?;
                }
            }
        }

        Ok(summary)
    }

    fn backup_one(&mut self, device: &Device) -> Result<BackupRecordId> {
        let config = self.fetcher.fetch(device)?;
        let size = config.len() as i64;
        if size > self.store.max_backup_size() {
            bail!(
                "configuration is {size} bytes, over the {} byte limit",
                self.store.max_backup_size()
            );
        }

        let finished_at = OffsetDateTime::now_utc();
        let record_id =
            self.store
                .insert_successful_backup(device.id, self.protocol, config.as_bytes())?;
        self.store.update_device_backup_state(
            device.id,
            ConnectionStatus::BackupSuccess,
            Some(finished_at),
            None,
        )?;
        Ok(record_id)
    }
}

impl Store {
    fn insert_successful_backup(
        &self,
        device_id: DeviceId,
        protocol: BackupProtocol,
        config: &[u8],
    ) -> Result<BackupRecordId> {
        let now = now_rfc3339()?;
        let checksum = checksum_sha256(config);
        self.raw_connection()
            .execute(
                "
                INSERT INTO backup_records (
                  device_id, status, protocol, config_data,
                  size_bytes, sha256, started_at, finished_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    device_id.get(),
                    BackupStatus::Success.as_str(),
                    protocol.as_str(),
                    config,
                    config.len() as i64,
                    checksum,
                    now,
                    now,
                ],
            )
            .context("insert backup record")?;
        Ok(BackupRecordId::new(self.raw_connection().last_insert_rowid()))
    }

    fn insert_failed_backup(
        &self,
        device_id: DeviceId,
        protocol: BackupProtocol,
        error_message: &str,
    ) -> Result<BackupRecordId> {
        let now = now_rfc3339()?;
        self.raw_connection()
            .execute(
                "
                INSERT INTO backup_records (
                  device_id, status, protocol, size_bytes,
                  sha256, error_message, started_at, finished_at
                ) VALUES (?, ?, ?, 0, '', ?, ?, ?)
                ",
                params![
                    device_id.get(),
                    BackupStatus::Failed.as_str(),
                    protocol.as_str(),
                    error_message,
                    now,
                    now,
                ],
            )
            .context("insert failed backup record")?;
        Ok(BackupRecordId::new(self.raw_connection().last_insert_rowid()))
    }

    pub fn list_backup_records(&self, limit: i64) -> Result<Vec<BackupRecord>> {
        let capped = limit.clamp(1, 1000);
        let mut stmt = self
            .raw_connection()
            .prepare(
                "
                SELECT
                  b.id, b.device_id, d.name, b.status, b.protocol,
                  b.size_bytes, b.sha256, b.error_message, b.started_at, b.finished_at
                FROM backup_records b
                JOIN devices d ON d.id = b.device_id
                ORDER BY b.started_at DESC, b.id DESC
                LIMIT ?
                ",
            )
            .context("prepare backup records query")?;
        let rows = stmt
            .query_map(params![capped], backup_record_from_row)
            .context("query backup records")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect backup records")
    }

    pub fn latest_backup_for_device(&self, device_id: DeviceId) -> Result<Option<BackupRecord>> {
        self.raw_connection()
            .query_row(
                "
                SELECT
                  b.id, b.device_id, d.name, b.status, b.protocol,
                  b.size_bytes, b.sha256, b.error_message, b.started_at, b.finished_at
                FROM backup_records b
                JOIN devices d ON d.id = b.device_id
                WHERE b.device_id = ?
                ORDER BY b.started_at DESC, b.id DESC
                LIMIT 1
                ",
                params![device_id.get()],
                backup_record_from_row,
            )
            .optional()
            .context("load latest backup record")
    }

    pub fn backup_config_text(&self, record_id: BackupRecordId) -> Result<String> {
        let blob: Option<Vec<u8>> = self
            .raw_connection()
            .query_row(
                "SELECT config_data FROM backup_records WHERE id = ?",
                params![record_id.get()],
                |row| row.get(0),
            )
            .with_context(|| format!("load backup record {}", record_id.get()))?;
        let Some(blob) = blob else {
            bail!(
                "backup record {} has no stored configuration (failed attempt)",
                record_id.get()
            );
        };
        String::from_utf8(blob).context("decode stored configuration")
    }

    /// Recompute the checksum of the stored blob and compare against the
    /// recorded value.
    pub fn verify_backup(&self, record_id: BackupRecordId) -> Result<bool> {
        let row: Option<(Option<Vec<u8>>, String)> = self
            .raw_connection()
            .query_row(
                "SELECT config_data, sha256 FROM backup_records WHERE id = ?",
                params![record_id.get()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .with_context(|| format!("load backup record {}", record_id.get()))?;

        let Some((blob, recorded)) = row else {
            bail!("backup record {} not found", record_id.get());
        };
        let Some(blob) = blob else {
            bail!(
                "backup record {} has no stored configuration (failed attempt)",
                record_id.get()
            );
        };
        Ok(checksum_sha256(&blob) == recorded)
    }
}

fn backup_record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BackupRecord> {
    let status_raw: String = row.get(3)?;
    let status = BackupStatus::parse(&status_raw)
        .ok_or_else(|| to_sql_error(anyhow::anyhow!("unknown backup status {status_raw}")))?;

    let protocol_raw: String = row.get(4)?;
    let protocol = BackupProtocol::parse(&protocol_raw)
        .ok_or_else(|| to_sql_error(anyhow::anyhow!("unknown backup protocol {protocol_raw}")))?;

    let started_at_raw: String = row.get(8)?;
    let finished_at_raw: Option<String> = row.get(9)?;

    Ok(BackupRecord {
        id: BackupRecordId::new(row.get(0)?),
        device_id: DeviceId::new(row.get(1)?),
        device_name: row.get(2)?,
        status,
        protocol,
        size_bytes: row.get(5)?,
        checksum_sha256: row.get(6)?,
        error_message: row.get(7)?,
        started_at: parse_datetime(&started_at_raw).map_err(to_sql_error)?,
        finished_at: parse_opt_datetime(finished_at_raw).map_err(to_sql_error)?,
    })
}
