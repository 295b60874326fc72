// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use pulsarnet_app::{ConnectionStatus, DeviceType};
use pulsarnet_db::{NewDevice, NewGroup, Store, UpdateDevice, validate_db_path};
use pulsarnet_testkit::FleetFaker;

fn new_device(faker: &mut FleetFaker) -> NewDevice {
    let fake = faker.device();
    NewDevice {
        name: fake.name,
        host: fake.host,
        port: fake.port,
        device_type: fake.device_type,
        username: fake.username,
        notes: fake.notes,
    }
}

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("/tmp/pulsarnet.db").is_ok());
    assert!(validate_db_path(":memory:").is_ok());
}

#[test]
fn bootstrap_creates_schema() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    assert!(store.list_devices(false)?.is_empty());
    assert!(store.list_groups(false)?.is_empty());
    Ok(())
}

#[test]
fn bootstrap_rejects_schema_missing_required_column() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    store.raw_connection().execute_batch(
        "
        ALTER TABLE devices RENAME TO devices_old;
        CREATE TABLE devices (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL,
          host TEXT NOT NULL,
          port INTEGER NOT NULL DEFAULT 22,
          username TEXT NOT NULL DEFAULT '',
          connection_status TEXT NOT NULL DEFAULT 'unknown',
          last_backup_at TEXT,
          last_error TEXT,
          notes TEXT NOT NULL DEFAULT '',
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL,
          deleted_at TEXT
        );
        DROP TABLE devices_old;
        ",
    )?;

    let err = store.bootstrap().expect_err("schema validation should fail");
    let message = err.to_string();
    assert!(message.contains("table `devices` is missing required columns"));
    assert!(message.contains("device_type"));
    Ok(())
}

#[test]
fn device_round_trip_and_name_ordering() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    store.create_device(&NewDevice {
        name: "edge-sfo-01".to_owned(),
        host: "10.20.0.1".to_owned(),
        port: 22,
        device_type: DeviceType::JuniperJunos,
        username: "backup".to_owned(),
        notes: String::new(),
    })?;
    let core_id = store.create_device(&NewDevice {
        name: "core-nyc-01".to_owned(),
        host: "10.10.0.1".to_owned(),
        port: 2222,
        device_type: DeviceType::CiscoIos,
        username: "netops".to_owned(),
        notes: "dual-homed uplink".to_owned(),
    })?;

    let devices = store.list_devices(false)?;
    assert_eq!(devices.len(), 2);
    // Display order is by name, not insertion.
    assert_eq!(devices[0].name, "core-nyc-01");
    assert_eq!(devices[1].name, "edge-sfo-01");

    let core = store.get_device(core_id)?;
    assert_eq!(core.port, 2222);
    assert_eq!(core.device_type, DeviceType::CiscoIos);
    assert_eq!(core.connection_status, ConnectionStatus::Unknown);
    assert_eq!(core.notes, "dual-homed uplink");

    let by_name = store.get_device_by_name("core-nyc-01")?;
    assert_eq!(by_name.map(|d| d.id), Some(core_id));
    assert!(store.get_device_by_name("ghost-sw-99")?.is_none());
    Ok(())
}

#[test]
fn duplicate_device_name_is_rejected() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let device = NewDevice {
        name: "core-nyc-01".to_owned(),
        host: "10.10.0.1".to_owned(),
        port: 22,
        device_type: DeviceType::CiscoIos,
        username: String::new(),
        notes: String::new(),
    };
    store.create_device(&device)?;
    assert!(store.create_device(&device).is_err());
    Ok(())
}

#[test]
fn empty_name_or_host_is_rejected() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let blank_name = NewDevice {
        name: "   ".to_owned(),
        host: "10.0.0.1".to_owned(),
        port: 22,
        device_type: DeviceType::CiscoIos,
        username: String::new(),
        notes: String::new(),
    };
    assert!(store.create_device(&blank_name).is_err());

    let blank_host = NewDevice {
        name: "core-nyc-01".to_owned(),
        host: "".to_owned(),
        port: 22,
        device_type: DeviceType::CiscoIos,
        username: String::new(),
        notes: String::new(),
    };
    assert!(store.create_device(&blank_host).is_err());
    Ok(())
}

#[test]
fn update_device_rejects_missing_or_deleted_rows() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let mut faker = FleetFaker::new(11);
    let device_id = store.create_device(&new_device(&mut faker))?;

    store.update_device(
        device_id,
        &UpdateDevice {
            name: "renamed-sw-01".to_owned(),
            host: "10.99.0.1".to_owned(),
            port: 22,
            device_type: DeviceType::AristaEos,
            username: "oper".to_owned(),
            notes: String::new(),
        },
    )?;
    assert_eq!(store.get_device(device_id)?.name, "renamed-sw-01");

    store.soft_delete_device(device_id)?;
    let error = store
        .update_device(
            device_id,
            &UpdateDevice {
                name: "again".to_owned(),
                host: "10.99.0.2".to_owned(),
                port: 22,
                device_type: DeviceType::AristaEos,
                username: String::new(),
                notes: String::new(),
            },
        )
        .expect_err("update of deleted device should fail");
    assert!(error.to_string().contains("not found or deleted"));
    Ok(())
}

#[test]
fn soft_delete_and_restore_track_lifecycle() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let mut faker = FleetFaker::new(5);
    let device_id = store.create_device(&new_device(&mut faker))?;

    store.soft_delete_device(device_id)?;
    assert!(store.list_devices(false)?.is_empty());
    assert_eq!(store.list_devices(true)?.len(), 1);

    // Deleted devices are invisible to name lookup.
    let deleted = store.list_devices(true)?.remove(0);
    assert!(store.get_device_by_name(&deleted.name)?.is_none());

    let records = store.list_deletion_records()?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].entity, pulsarnet_app::DeletionEntity::Device);
    assert_eq!(records[0].target_id, device_id.get());
    assert!(records[0].restored_at.is_none());

    store.restore_device(device_id)?;
    assert_eq!(store.list_devices(false)?.len(), 1);

    let records = store.list_deletion_records()?;
    assert_eq!(records.len(), 1);
    assert!(records[0].restored_at.is_some());

    assert!(store.soft_delete_device(pulsarnet_app::DeviceId::new(999)).is_err());
    Ok(())
}

#[test]
fn groups_count_only_live_members() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let mut faker = FleetFaker::new(21);
    let first = store.create_device(&new_device(&mut faker))?;
    let second = store.create_device(&new_device(&mut faker))?;

    let group_id = store.create_group(&NewGroup {
        name: "Core Network".to_owned(),
        description: "Backbone".to_owned(),
    })?;
    store.add_device_to_group(group_id, first)?;
    store.add_device_to_group(group_id, second)?;
    // Adding the same member twice is a no-op.
    store.add_device_to_group(group_id, second)?;

    let groups = store.list_groups(false)?;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].member_count, 2);
    assert_eq!(store.list_group_devices(group_id)?.len(), 2);

    store.soft_delete_device(second)?;
    assert_eq!(store.list_groups(false)?[0].member_count, 1);

    store.remove_device_from_group(group_id, first)?;
    assert_eq!(store.list_groups(false)?[0].member_count, 0);
    Ok(())
}

#[test]
fn inventory_export_import_round_trip() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let mut faker = FleetFaker::new(31);
    for _ in 0..3 {
        store.create_device(&new_device(&mut faker))?;
    }
    let exported = store.export_inventory()?;

    let fresh = Store::open_memory()?;
    fresh.bootstrap()?;
    let summary = fresh.import_inventory(&exported)?;
    assert_eq!(summary.imported, 3);
    assert_eq!(summary.skipped, 0);

    // Importing the same export again skips every device.
    let summary = fresh.import_inventory(&exported)?;
    assert_eq!(summary.imported, 0);
    assert_eq!(summary.skipped, 3);

    let original = store.list_devices(false)?;
    let imported = fresh.list_devices(false)?;
    let original_names: Vec<&str> = original.iter().map(|d| d.name.as_str()).collect();
    let imported_names: Vec<&str> = imported.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(original_names, imported_names);
    Ok(())
}

#[test]
fn inventory_import_rejects_unknown_device_type() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let json = r#"[{"name": "core-nyc-01", "host": "10.10.0.1", "device_type": "vax_vms"}]"#;
    let error = store
        .import_inventory(json)
        .expect_err("unknown type should fail");
    assert!(error.to_string().contains("unknown type"));
    Ok(())
}

#[test]
fn demo_seed_populates_devices_and_groups() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.seed_demo_data()?;

    let devices = store.list_devices(false)?;
    assert!(devices.len() >= 8);

    let groups = store.list_groups(false)?;
    assert!(groups.iter().any(|g| g.name == "Core Network"));
    assert!(groups.iter().all(|g| g.member_count > 0));
    Ok(())
}

#[test]
fn dashboard_counts_reflect_failures() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let mut faker = FleetFaker::new(41);
    let first = store.create_device(&new_device(&mut faker))?;
    store.create_device(&new_device(&mut faker))?;

    store.update_device_backup_state(first, ConnectionStatus::BackupFailed, None, Some("timeout"))?;

    let counts = store.dashboard_counts()?;
    assert_eq!(counts.devices_total, 2);
    assert_eq!(counts.devices_failed, 1);
    Ok(())
}

#[test]
fn store_open_on_disk_round_trips() -> Result<()> {
    let (_dir, db_path) = pulsarnet_testkit::temp_db_path()?;
    let mut faker = FleetFaker::new(51);

    {
        let store = Store::open(&db_path)?;
        store.bootstrap()?;
        store.create_device(&new_device(&mut faker))?;
    }

    let store = Store::open(&db_path)?;
    store.bootstrap()?;
    assert_eq!(store.list_devices(false)?.len(), 1);
    Ok(())
}
