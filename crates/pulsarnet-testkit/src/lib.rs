// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use pulsarnet_app::{BackupProtocol, DeviceType};
use std::path::PathBuf;

const DEVICE_ROLES: [&str; 8] = [
    "core", "edge", "dist", "acc", "fw", "wan", "lab", "mgmt",
];

const SITE_CODES: [&str; 10] = [
    "nyc", "sfo", "chi", "dal", "sea", "atl", "den", "lon", "fra", "syd",
];

const USERNAMES: [&str; 6] = ["backup", "netops", "rancid", "svc-backup", "oper", "admin"];

const GROUP_NAMES: [&str; 8] = [
    "Core Network",
    "Branch Offices",
    "Data Center",
    "DMZ Firewalls",
    "Campus Access",
    "WAN Edge",
    "Lab Gear",
    "Out of Band",
];

const NOTE_FRAGMENTS: [&str; 8] = [
    "replaced PSU last quarter",
    "pending IOS upgrade",
    "dual-homed uplink",
    "console via terminal server",
    "maintenance window sundays",
    "leased line backup path",
    "inherited from acquisition",
    "scheduled for decommission",
];

const DEVICE_TYPES: [DeviceType; 10] = [
    DeviceType::CiscoIos,
    DeviceType::CiscoNxos,
    DeviceType::JuniperJunos,
    DeviceType::AristaEos,
    DeviceType::PaloaltoPanos,
    DeviceType::HpProcurve,
    DeviceType::HuaweiVrp,
    DeviceType::DellOs10,
    DeviceType::CheckpointGaia,
    DeviceType::FortinetFortios,
];

const PROTOCOLS: [BackupProtocol; 4] = [
    BackupProtocol::Tftp,
    BackupProtocol::Scp,
    BackupProtocol::Sftp,
    BackupProtocol::Ftp,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeDevice {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub device_type: DeviceType,
    pub username: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeGroup {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

#[derive(Debug, Clone)]
pub struct FleetFaker {
    rng: DeterministicRng,
    sequence: u32,
}

impl FleetFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            sequence: 0,
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn device(&mut self) -> FakeDevice {
        self.sequence += 1;
        let role = self.pick(&DEVICE_ROLES);
        let site = self.pick(&SITE_CODES);
        let name = format!("{role}-{site}-{:02}", self.sequence);
        let host = format!(
            "10.{}.{}.{}",
            self.rng.int_n(254) + 1,
            self.rng.int_n(254) + 1,
            self.rng.int_n(254) + 1,
        );
        let device_type = DEVICE_TYPES[self.rng.int_n(DEVICE_TYPES.len())];
        let port = match self.rng.int_n(10) {
            0 => 2222,
            1 => 830,
            _ => 22,
        };
        let notes = if self.rng.int_n(10) < 4 {
            self.pick(&NOTE_FRAGMENTS).to_owned()
        } else {
            String::new()
        };

        FakeDevice {
            name,
            host,
            port,
            device_type,
            username: self.pick(&USERNAMES).to_owned(),
            notes,
        }
    }

    pub fn fleet(&mut self, count: usize) -> Vec<FakeDevice> {
        (0..count).map(|_| self.device()).collect()
    }

    pub fn group(&mut self) -> FakeGroup {
        let name = self.pick(&GROUP_NAMES).to_owned();
        FakeGroup {
            description: format!("{name} devices"),
            name,
        }
    }

    pub fn protocol(&mut self) -> BackupProtocol {
        PROTOCOLS[self.rng.int_n(PROTOCOLS.len())]
    }

    /// Plausible configuration text for a device, stable for a given faker
    /// state. Long enough to exercise checksum and size-limit paths.
    pub fn config_text(&mut self, device_name: &str, device_type: DeviceType) -> String {
        let mut config = format!(
            "! {}\nhostname {device_name}\n",
            device_type.label()
        );
        let vlan_count = self.rng.int_n(6) + 2;
        for index in 0..vlan_count {
            let vlan = 100 + index * 10;
            config.push_str(&format!(
                "vlan {vlan}\n name SEG-{vlan}\n",
            ));
        }
        let interfaces = self.rng.int_n(8) + 4;
        for index in 0..interfaces {
            config.push_str(&format!(
                "interface GigabitEthernet0/{index}\n switchport mode access\n no shutdown\n",
            ));
        }
        config.push_str("line vty 0 4\n transport input ssh\nend\n");
        config
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("pulsarnet.db");
    Ok((dir, db_path))
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

pub fn device_roles() -> &'static [&'static str] {
    &DEVICE_ROLES
}

pub fn site_codes() -> &'static [&'static str] {
    &SITE_CODES
}
