// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    CiscoIos,
    CiscoNxos,
    JuniperJunos,
    AristaEos,
    PaloaltoPanos,
    HpProcurve,
    HuaweiVrp,
    DellOs10,
    CheckpointGaia,
    FortinetFortios,
}

impl DeviceType {
    pub const ALL: [Self; 10] = [
        Self::CiscoIos,
        Self::CiscoNxos,
        Self::JuniperJunos,
        Self::AristaEos,
        Self::PaloaltoPanos,
        Self::HpProcurve,
        Self::HuaweiVrp,
        Self::DellOs10,
        Self::CheckpointGaia,
        Self::FortinetFortios,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CiscoIos => "cisco_ios",
            Self::CiscoNxos => "cisco_nxos",
            Self::JuniperJunos => "juniper_junos",
            Self::AristaEos => "arista_eos",
            Self::PaloaltoPanos => "paloalto_panos",
            Self::HpProcurve => "hp_procurve",
            Self::HuaweiVrp => "huawei_vrp",
            Self::DellOs10 => "dell_os10",
            Self::CheckpointGaia => "checkpoint_gaia",
            Self::FortinetFortios => "fortinet_fortios",
        }
    }

    /// Stored values are matched case-insensitively; imports from older
    /// inventories carry mixed-case type tags.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "cisco_ios" => Some(Self::CiscoIos),
            "cisco_nxos" => Some(Self::CiscoNxos),
            "juniper_junos" => Some(Self::JuniperJunos),
            "arista_eos" => Some(Self::AristaEos),
            "paloalto_panos" => Some(Self::PaloaltoPanos),
            "hp_procurve" => Some(Self::HpProcurve),
            "huawei_vrp" => Some(Self::HuaweiVrp),
            "dell_os10" => Some(Self::DellOs10),
            "checkpoint_gaia" => Some(Self::CheckpointGaia),
            "fortinet_fortios" => Some(Self::FortinetFortios),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CiscoIos => "Cisco IOS",
            Self::CiscoNxos => "Cisco Nexus",
            Self::JuniperJunos => "Juniper JunOS",
            Self::AristaEos => "Arista EOS",
            Self::PaloaltoPanos => "Palo Alto PAN-OS",
            Self::HpProcurve => "HP ProCurve",
            Self::HuaweiVrp => "Huawei VRP",
            Self::DellOs10 => "Dell OS10",
            Self::CheckpointGaia => "CheckPoint Gaia",
            Self::FortinetFortios => "Fortinet FortiOS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Unknown,
    Disconnected,
    Connecting,
    Connected,
    BackingUp,
    BackupSuccess,
    BackupFailed,
    AuthFailed,
    Timeout,
    Error,
}

impl ConnectionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::BackingUp => "backing_up",
            Self::BackupSuccess => "backup_success",
            Self::BackupFailed => "backup_failed",
            Self::AuthFailed => "auth_failed",
            Self::Timeout => "timeout",
            Self::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unknown" => Some(Self::Unknown),
            "disconnected" => Some(Self::Disconnected),
            "connecting" => Some(Self::Connecting),
            "connected" => Some(Self::Connected),
            "backing_up" => Some(Self::BackingUp),
            "backup_success" => Some(Self::BackupSuccess),
            "backup_failed" => Some(Self::BackupFailed),
            "auth_failed" => Some(Self::AuthFailed),
            "timeout" => Some(Self::Timeout),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::BackingUp => "backing up",
            Self::BackupSuccess => "backup ok",
            Self::BackupFailed => "backup failed",
            Self::AuthFailed => "auth failed",
            Self::Timeout => "timeout",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupProtocol {
    Tftp,
    Scp,
    Sftp,
    Ftp,
}

impl BackupProtocol {
    pub const ALL: [Self; 4] = [Self::Tftp, Self::Scp, Self::Sftp, Self::Ftp];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tftp => "tftp",
            Self::Scp => "scp",
            Self::Sftp => "sftp",
            Self::Ftp => "ftp",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tftp" => Some(Self::Tftp),
            "scp" => Some(Self::Scp),
            "sftp" => Some(Self::Sftp),
            "ftp" => Some(Self::Ftp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupStatus {
    Running,
    Success,
    Failed,
}

impl BackupStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionEntity {
    Device,
    DeviceGroup,
}

impl DeletionEntity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::DeviceGroup => "device_group",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "device" => Some(Self::Device),
            "device_group" => Some(Self::DeviceGroup),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabKind {
    Dashboard,
    Devices,
    Backup,
    History,
    Groups,
    Settings,
}

impl TabKind {
    pub const ALL: [Self; 6] = [
        Self::Dashboard,
        Self::Devices,
        Self::Backup,
        Self::History,
        Self::Groups,
        Self::Settings,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Devices => "devices",
            Self::Backup => "backup",
            Self::History => "history",
            Self::Groups => "groups",
            Self::Settings => "settings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKey {
    UiShowDashboard,
    BackupProtocol,
}

impl SettingKey {
    pub const ALL: [Self; 2] = [Self::UiShowDashboard, Self::BackupProtocol];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UiShowDashboard => "ui.show_dashboard",
            Self::BackupProtocol => "backup.protocol",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ui.show_dashboard" => Some(Self::UiShowDashboard),
            "backup.protocol" => Some(Self::BackupProtocol),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::UiShowDashboard => "dashboard startup",
            Self::BackupProtocol => "backup protocol",
        }
    }

    pub const fn expected_value_kind(self) -> SettingValueKind {
        match self {
            Self::UiShowDashboard => SettingValueKind::Bool,
            Self::BackupProtocol => SettingValueKind::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValueKind {
    Bool,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
}

impl SettingValue {
    pub fn parse_for_key(key: SettingKey, raw: &str) -> Option<Self> {
        match key.expected_value_kind() {
            SettingValueKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Some(Self::Bool(true)),
                "0" | "false" | "off" | "no" => Some(Self::Bool(false)),
                _ => None,
            },
            SettingValueKind::Text => Some(Self::Text(raw.to_owned())),
        }
    }

    pub fn to_storage(&self, key: SettingKey) -> Option<String> {
        match (key.expected_value_kind(), self) {
            (SettingValueKind::Bool, Self::Bool(value)) => {
                Some(if *value { "true" } else { "false" }.to_owned())
            }
            (SettingValueKind::Text, Self::Text(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Bool(true) => "on".to_owned(),
            Self::Bool(false) => "off".to_owned(),
            Self::Text(value) => value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSetting {
    pub key: SettingKey,
    pub value: SettingValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    Device,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Form(FormKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub device_type: DeviceType,
    pub username: String,
    pub connection_status: ConnectionStatus,
    pub last_backup_at: Option<OffsetDateTime>,
    pub last_error: Option<String>,
    pub notes: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroup {
    pub id: DeviceGroupId,
    pub name: String,
    pub description: String,
    pub member_count: usize,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: BackupRecordId,
    pub device_id: DeviceId,
    pub device_name: String,
    pub status: BackupStatus,
    pub protocol: BackupProtocol,
    pub size_bytes: i64,
    pub checksum_sha256: String,
    pub error_message: Option<String>,
    pub started_at: OffsetDateTime,
    pub finished_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub actor: String,
    pub action: String,
    pub target_kind: String,
    pub target_id: Option<i64>,
    pub detail: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRecord {
    pub id: DeletionRecordId,
    pub entity: DeletionEntity,
    pub target_id: i64,
    pub deleted_at: OffsetDateTime,
    pub restored_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DashboardCounts {
    pub devices_total: usize,
    pub devices_failed: usize,
    pub backups_today: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BackupRunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}
