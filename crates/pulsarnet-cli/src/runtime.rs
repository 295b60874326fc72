// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use pulsarnet_app::{
    BackupProtocol, BackupRecordId, BackupRunSummary, DashboardCounts, Device, DeviceGroupId,
    DeviceId, DeviceIndex, TabKind,
};
use pulsarnet_db::{
    AuditLog, BackupEngine, FileFetcher, NewDevice, NewGroup, SimulatedFetcher, Store,
};
use pulsarnet_tui::{AppRuntime, DeviceDraft, GroupDraft, LifecycleAction, TabSnapshot};
use std::path::PathBuf;

pub struct DbRuntime<'a> {
    store: &'a Store,
    audit: AuditLog<'a>,
    simulate: bool,
    source_dir: Option<PathBuf>,
}

impl<'a> DbRuntime<'a> {
    pub fn new(store: &'a Store, simulate: bool, source_dir: Option<PathBuf>) -> Self {
        Self {
            store,
            audit: AuditLog::from_env_user(store),
            simulate,
            source_dir,
        }
    }
}

impl AppRuntime for DbRuntime<'_> {
    fn load_dashboard_counts(&mut self) -> Result<DashboardCounts> {
        self.store.dashboard_counts()
    }

    fn load_tab_snapshot(
        &mut self,
        tab: TabKind,
        include_deleted: bool,
    ) -> Result<Option<TabSnapshot>> {
        let snapshot = match tab {
            TabKind::Dashboard => None,
            TabKind::Devices => Some(TabSnapshot::Devices(
                self.store.list_devices(include_deleted)?,
            )),
            // Only live devices are backup candidates.
            TabKind::Backup => Some(TabSnapshot::Backup(self.store.list_devices(false)?)),
            TabKind::History => Some(TabSnapshot::History(self.store.list_backup_records(200)?)),
            TabKind::Groups => Some(TabSnapshot::Groups(
                self.store.list_groups(include_deleted)?,
            )),
            TabKind::Settings => Some(TabSnapshot::Settings(self.store.list_settings()?)),
        };
        Ok(snapshot)
    }

    fn load_registry(&mut self) -> Result<DeviceIndex> {
        Ok(DeviceIndex::from_devices(&self.store.list_devices(false)?))
    }

    fn run_backup(&mut self, devices: &[Device]) -> Result<BackupRunSummary> {
        let protocol = self.store.get_backup_protocol()?;
        if self.simulate {
            let mut engine = BackupEngine::new(self.store, SimulatedFetcher, protocol);
            engine.run(devices, &self.audit)
        } else {
            let root = self.source_dir.as_ref().ok_or_else(|| {
                anyhow!("[backup] source_dir must be set when simulate = false")
            })?;
            let mut engine = BackupEngine::new(self.store, FileFetcher::new(root), protocol);
            engine.run(devices, &self.audit)
        }
    }

    fn verify_backup(&mut self, record_id: BackupRecordId) -> Result<bool> {
        self.store.verify_backup(record_id)
    }

    fn apply_lifecycle(
        &mut self,
        tab: TabKind,
        row_id: i64,
        action: LifecycleAction,
    ) -> Result<()> {
        match (tab, action) {
            (TabKind::Devices, LifecycleAction::Delete) => {
                self.store.soft_delete_device(DeviceId::new(row_id))?;
                self.audit.record("delete", "device", Some(row_id), "")?;
            }
            (TabKind::Devices, LifecycleAction::Restore) => {
                self.store.restore_device(DeviceId::new(row_id))?;
                self.audit.record("restore", "device", Some(row_id), "")?;
            }
            (TabKind::Groups, LifecycleAction::Delete) => {
                self.store.soft_delete_group(DeviceGroupId::new(row_id))?;
                self.audit.record("delete", "group", Some(row_id), "")?;
            }
            (TabKind::Groups, LifecycleAction::Restore) => {
                self.store.restore_group(DeviceGroupId::new(row_id))?;
                self.audit.record("restore", "group", Some(row_id), "")?;
            }
            (tab, _) => bail!("lifecycle actions are not available on the {} tab", tab.label()),
        }
        Ok(())
    }

    fn submit_device(&mut self, draft: &DeviceDraft) -> Result<()> {
        let device_id = self.store.create_device(&NewDevice {
            name: draft.name.clone(),
            host: draft.host.clone(),
            port: draft.port,
            device_type: draft.device_type,
            username: draft.username.clone(),
            notes: draft.notes.clone(),
        })?;
        self.audit
            .record("create", "device", Some(device_id.get()), &draft.name)?;
        Ok(())
    }

    fn submit_group(&mut self, draft: &GroupDraft) -> Result<()> {
        let group_id = self.store.create_group(&NewGroup {
            name: draft.name.clone(),
            description: draft.description.clone(),
        })?;
        self.audit
            .record("create", "group", Some(group_id.get()), &draft.name)?;
        Ok(())
    }

    fn set_show_dashboard(&mut self, show: bool) -> Result<()> {
        self.store.put_show_dashboard(show)
    }

    fn set_backup_protocol(&mut self, protocol: BackupProtocol) -> Result<()> {
        self.store.put_backup_protocol(protocol)
    }
}
