// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use crate::Device;

/// Tri-state selection flag for table rows. Marker cells carry the full
/// tri-state; embedded toggle controls only ever report checked/unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckState {
    #[default]
    Unchecked,
    Checked,
    Indeterminate,
}

impl CheckState {
    pub const fn is_checked(self) -> bool {
        matches!(self, Self::Checked)
    }

    pub const fn toggle(self) -> Self {
        match self {
            Self::Unchecked => Self::Checked,
            Self::Checked | Self::Indeterminate => Self::Unchecked,
        }
    }
}

/// Read access to a table of candidate rows. Column 0 is the selection
/// indicator, which a row exposes through at most one of two shapes: a
/// marker attached to the cell itself, or an embedded control hosted in
/// the cell. The identifier lives in the column after the selection
/// column.
pub trait SelectionView {
    fn row_count(&self) -> usize;

    /// Marker attached directly to the row's selection cell, if any.
    fn marker_state(&self, row: usize) -> Option<CheckState>;

    /// Checked state of the control hosted in the selection cell, if any.
    fn control_checked(&self, row: usize) -> Option<bool>;

    /// Identifier text from the column after the selection column.
    fn identifier(&self, row: usize) -> Option<&str>;
}

/// Read-only registry the resolver looks identifiers up against.
pub trait DeviceLookup {
    fn device_by_name(&self, name: &str) -> Option<Device>;
}

/// Name-keyed snapshot of the inventory, rebuilt per refresh.
#[derive(Debug, Clone, Default)]
pub struct DeviceIndex {
    by_name: BTreeMap<String, Device>,
}

impl DeviceIndex {
    pub fn from_devices(devices: &[Device]) -> Self {
        let by_name = devices
            .iter()
            .map(|device| (device.name.clone(), device.clone()))
            .collect();
        Self { by_name }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl DeviceLookup for DeviceIndex {
    fn device_by_name(&self, name: &str) -> Option<Device> {
        self.by_name.get(name).cloned()
    }
}

fn marker_is_checked<V: SelectionView + ?Sized>(view: &V, row: usize) -> bool {
    matches!(view.marker_state(row), Some(state) if state.is_checked())
}

fn control_is_checked<V: SelectionView + ?Sized>(view: &V, row: usize) -> bool {
    view.control_checked(row) == Some(true)
}

/// True when the row is selected under either indicator shape. A checked
/// marker wins without consulting the control; a row with neither shape
/// is unselected, not an error.
pub fn row_is_selected<V: SelectionView + ?Sized>(view: &V, row: usize) -> bool {
    marker_is_checked(view, row) || control_is_checked(view, row)
}

/// Resolve the checked rows of `view` against `registry`, in ascending row
/// order. Rows whose identifier has no registry entry are skipped; callers
/// depend on the output preserving display order.
pub fn resolve_selected<V, R>(view: &V, registry: &R) -> Vec<Device>
where
    V: SelectionView + ?Sized,
    R: DeviceLookup + ?Sized,
{
    let mut selected = Vec::new();
    for row in 0..view.row_count() {
        if !row_is_selected(view, row) {
            continue;
        }
        let Some(name) = view.identifier(row) else {
            continue;
        };
        if let Some(device) = registry.device_by_name(name) {
            selected.push(device);
        }
    }
    selected
}

/// Resolve every visible row against `registry`, ignoring selection state.
/// Used by the bulk gate's fall-back-to-all policy.
pub fn resolve_all_visible<V, R>(view: &V, registry: &R) -> Vec<Device>
where
    V: SelectionView + ?Sized,
    R: DeviceLookup + ?Sized,
{
    let mut resolved = Vec::new();
    for row in 0..view.row_count() {
        let Some(name) = view.identifier(row) else {
            continue;
        };
        if let Some(device) = registry.device_by_name(name) {
            resolved.push(device);
        }
    }
    resolved
}
