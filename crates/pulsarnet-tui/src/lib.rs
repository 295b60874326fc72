// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use pulsarnet_app::{
    AppCommand, AppSetting, AppState, BackupProtocol, BackupRecord, BackupRecordId,
    BackupRunSummary, CheckState, DashboardCounts, Device, DeviceGroup, DeviceIndex, DeviceType,
    FormKind, GateOutcome, GateUi, SelectionView, Severity, SettingKey, SettingValue, TabKind,
    run_bulk_action,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::collections::BTreeSet;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const POLL_INTERVAL_MS: u64 = 120;
const STATUS_CLEAR_SECS: u64 = 4;
const MARKER_CHECKED: &str = "[x]";
const MARKER_UNCHECKED: &str = "[ ]";
const MARKER_PARTIAL: &str = "[-]";
const CONTROL_CHECKED: &str = "(x)";
const CONTROL_UNCHECKED: &str = "( )";

#[derive(Debug, Clone, PartialEq)]
pub enum TabSnapshot {
    Devices(Vec<Device>),
    Backup(Vec<Device>),
    History(Vec<BackupRecord>),
    Groups(Vec<DeviceGroup>),
    Settings(Vec<AppSetting>),
}

impl TabSnapshot {
    pub const fn tab_kind(&self) -> TabKind {
        match self {
            Self::Devices(_) => TabKind::Devices,
            Self::Backup(_) => TabKind::Backup,
            Self::History(_) => TabKind::History,
            Self::Groups(_) => TabKind::Groups,
            Self::Settings(_) => TabKind::Settings,
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            Self::Devices(rows) => rows.len(),
            Self::Backup(rows) => rows.len(),
            Self::History(rows) => rows.len(),
            Self::Groups(rows) => rows.len(),
            Self::Settings(rows) => rows.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Delete,
    Restore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDraft {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub device_type: DeviceType,
    pub username: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDraft {
    pub name: String,
    pub description: String,
}

pub trait AppRuntime {
    fn load_dashboard_counts(&mut self) -> Result<DashboardCounts>;
    fn load_tab_snapshot(
        &mut self,
        tab: TabKind,
        include_deleted: bool,
    ) -> Result<Option<TabSnapshot>>;
    fn load_registry(&mut self) -> Result<DeviceIndex>;
    fn run_backup(&mut self, devices: &[Device]) -> Result<BackupRunSummary>;
    fn verify_backup(&mut self, record_id: BackupRecordId) -> Result<bool>;
    fn apply_lifecycle(&mut self, tab: TabKind, row_id: i64, action: LifecycleAction)
    -> Result<()>;
    fn submit_device(&mut self, draft: &DeviceDraft) -> Result<()>;
    fn submit_group(&mut self, draft: &GroupDraft) -> Result<()>;
    fn set_show_dashboard(&mut self, show: bool) -> Result<()>;
    fn set_backup_protocol(&mut self, protocol: BackupProtocol) -> Result<()>;
}

/// Selection indicator shape carried by a table row's first column. Device
/// rows host an embedded toggle control; backup rows carry a marker cell;
/// rows that are not selectable carry neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectionCell {
    Marker(CheckState),
    Control { checked: bool },
    Blank,
}

impl SelectionCell {
    const fn glyph(self) -> &'static str {
        match self {
            Self::Marker(CheckState::Checked) => MARKER_CHECKED,
            Self::Marker(CheckState::Unchecked) => MARKER_UNCHECKED,
            Self::Marker(CheckState::Indeterminate) => MARKER_PARTIAL,
            Self::Control { checked: true } => CONTROL_CHECKED,
            Self::Control { checked: false } => CONTROL_UNCHECKED,
            Self::Blank => "   ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RowUi {
    row_id: i64,
    selection: SelectionCell,
    cells: Vec<String>,
    deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TableUi {
    tab: TabKind,
    columns: Vec<&'static str>,
    rows: Vec<RowUi>,
}

impl TableUi {
    fn row_id_at(&self, cursor: usize) -> Option<i64> {
        self.rows.get(cursor).map(|row| row.row_id)
    }
}

impl SelectionView for TableUi {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn marker_state(&self, row: usize) -> Option<CheckState> {
        match self.rows.get(row)?.selection {
            SelectionCell::Marker(state) => Some(state),
            SelectionCell::Control { .. } | SelectionCell::Blank => None,
        }
    }

    fn control_checked(&self, row: usize) -> Option<bool> {
        match self.rows.get(row)?.selection {
            SelectionCell::Control { checked } => Some(checked),
            SelectionCell::Marker(_) | SelectionCell::Blank => None,
        }
    }

    fn identifier(&self, row: usize) -> Option<&str> {
        self.rows.get(row)?.cells.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormField {
    label: &'static str,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormUiState {
    kind: FormKind,
    fields: Vec<FormField>,
    field_index: usize,
}

impl FormUiState {
    fn new(kind: FormKind) -> Self {
        let fields = match kind {
            FormKind::Device => vec![
                FormField {
                    label: "name",
                    value: String::new(),
                },
                FormField {
                    label: "host",
                    value: String::new(),
                },
                FormField {
                    label: "port",
                    value: "22".to_owned(),
                },
                FormField {
                    label: "type",
                    value: "cisco_ios".to_owned(),
                },
                FormField {
                    label: "username",
                    value: String::new(),
                },
                FormField {
                    label: "notes",
                    value: String::new(),
                },
            ],
            FormKind::Group => vec![
                FormField {
                    label: "name",
                    value: String::new(),
                },
                FormField {
                    label: "description",
                    value: String::new(),
                },
            ],
        };
        Self {
            kind,
            fields,
            field_index: 0,
        }
    }

    fn field_value(&self, label: &str) -> &str {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .map(|field| field.value.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, Default)]
struct ViewData {
    counts: DashboardCounts,
    registry: DeviceIndex,
    snapshot: Option<TabSnapshot>,
    table: Option<TableUi>,
    cursor: usize,
    checked_devices: BTreeSet<String>,
    checked_backup: BTreeSet<String>,
    form: Option<FormUiState>,
    help_visible: bool,
    backup_in_flight: bool,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Err(error) = refresh_view_data(state, runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error}")));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(POLL_INTERVAL_MS)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(
                        state,
                        runtime,
                        &mut view_data,
                        &mut terminal,
                        &internal_tx,
                        key,
                    ) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(state: &mut AppState, view_data: &ViewData, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(STATUS_CLEAR_SECS));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn refresh_view_data<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    view_data.counts = runtime.load_dashboard_counts()?;
    view_data.registry = runtime.load_registry()?;
    view_data.snapshot = runtime.load_tab_snapshot(state.active_tab, state.show_deleted)?;
    rebuild_table(view_data);
    let row_count = view_data
        .table
        .as_ref()
        .map(|table| table.rows.len())
        .unwrap_or(0);
    if row_count == 0 {
        view_data.cursor = 0;
    } else if view_data.cursor >= row_count {
        view_data.cursor = row_count - 1;
    }
    Ok(())
}

fn rebuild_table(view_data: &mut ViewData) {
    let Some(snapshot) = view_data.snapshot.as_ref() else {
        view_data.table = None;
        return;
    };
    let table = build_table(
        snapshot,
        &view_data.checked_devices,
        &view_data.checked_backup,
    );
    view_data.table = Some(table);
}

fn build_table(
    snapshot: &TabSnapshot,
    checked_devices: &BTreeSet<String>,
    checked_backup: &BTreeSet<String>,
) -> TableUi {
    match snapshot {
        TabSnapshot::Devices(devices) => build_device_table(devices, checked_devices),
        TabSnapshot::Backup(devices) => build_backup_table(devices, checked_backup),
        TabSnapshot::History(records) => build_history_table(records),
        TabSnapshot::Groups(groups) => build_group_table(groups),
        TabSnapshot::Settings(settings) => build_settings_table(settings),
    }
}

/// Device rows host an embedded toggle control in the selection column.
/// Soft-deleted rows are visible but not selectable.
fn build_device_table(devices: &[Device], checked: &BTreeSet<String>) -> TableUi {
    let rows = devices
        .iter()
        .map(|device| {
            let selection = if device.deleted_at.is_some() {
                SelectionCell::Blank
            } else {
                SelectionCell::Control {
                    checked: checked.contains(&device.name),
                }
            };
            RowUi {
                row_id: device.id.get(),
                selection,
                cells: vec![
                    device.name.clone(),
                    device.host.clone(),
                    device.device_type.label().to_owned(),
                    device.connection_status.label().to_owned(),
                    format_opt_datetime(device.last_backup_at),
                ],
                deleted: device.deleted_at.is_some(),
            }
        })
        .collect();
    TableUi {
        tab: TabKind::Devices,
        columns: vec!["name", "host", "type", "status", "last backup"],
        rows,
    }
}

/// Backup rows carry a marker cell in the selection column, the alternate
/// indicator shape fed into the same resolver.
fn build_backup_table(devices: &[Device], checked: &BTreeSet<String>) -> TableUi {
    let rows = devices
        .iter()
        .map(|device| {
            let selection = if device.deleted_at.is_some() {
                SelectionCell::Blank
            } else if checked.contains(&device.name) {
                SelectionCell::Marker(CheckState::Checked)
            } else {
                SelectionCell::Marker(CheckState::Unchecked)
            };
            RowUi {
                row_id: device.id.get(),
                selection,
                cells: vec![
                    device.name.clone(),
                    device.device_type.label().to_owned(),
                    format_opt_datetime(device.last_backup_at),
                    device.connection_status.label().to_owned(),
                    device.last_error.clone().unwrap_or_default(),
                ],
                deleted: device.deleted_at.is_some(),
            }
        })
        .collect();
    TableUi {
        tab: TabKind::Backup,
        columns: vec!["device", "type", "last backup", "status", "last error"],
        rows,
    }
}

fn build_history_table(records: &[BackupRecord]) -> TableUi {
    let rows = records
        .iter()
        .map(|record| RowUi {
            row_id: record.id.get(),
            selection: SelectionCell::Blank,
            cells: vec![
                record.device_name.clone(),
                record.status.as_str().to_owned(),
                record.protocol.as_str().to_owned(),
                format_size(record.size_bytes),
                short_checksum(&record.checksum_sha256),
                format_datetime(record.started_at),
                record.error_message.clone().unwrap_or_default(),
            ],
            deleted: false,
        })
        .collect();
    TableUi {
        tab: TabKind::History,
        columns: vec![
            "device", "status", "proto", "size", "sha256", "started", "error",
        ],
        rows,
    }
}

fn build_group_table(groups: &[DeviceGroup]) -> TableUi {
    let rows = groups
        .iter()
        .map(|group| RowUi {
            row_id: group.id.get(),
            selection: SelectionCell::Blank,
            cells: vec![
                group.name.clone(),
                group.description.clone(),
                group.member_count.to_string(),
            ],
            deleted: group.deleted_at.is_some(),
        })
        .collect();
    TableUi {
        tab: TabKind::Groups,
        columns: vec!["name", "description", "members"],
        rows,
    }
}

fn build_settings_table(settings: &[AppSetting]) -> TableUi {
    let rows = settings
        .iter()
        .enumerate()
        .map(|(index, setting)| RowUi {
            row_id: index as i64,
            selection: SelectionCell::Blank,
            cells: vec![
                setting.key.label().to_owned(),
                setting.value.display(),
            ],
            deleted: false,
        })
        .collect();
    TableUi {
        tab: TabKind::Settings,
        columns: vec!["setting", "value"],
        rows,
    }
}

fn format_datetime(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid time".to_owned())
}

fn format_opt_datetime(value: Option<OffsetDateTime>) -> String {
    value.map(format_datetime).unwrap_or_default()
}

fn format_size(bytes: i64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1}M", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1}K", bytes as f64 / 1024.0)
    } else {
        format!("{bytes}B")
    }
}

fn short_checksum(checksum: &str) -> String {
    checksum.chars().take(12).collect()
}

fn summary_status(summary: BackupRunSummary) -> String {
    format!(
        "backup finished: {} ok, {} failed of {}",
        summary.succeeded, summary.failed, summary.attempted
    )
}

/// Prompt and notification surface for the bulk gate, drawn as modal
/// overlays. Error notices block until a key is pressed; everything else
/// is queued for the status line. Draw failures abort the prompt.
struct TerminalGateUi<'a, B: Backend> {
    terminal: &'a mut Terminal<B>,
    statuses: Vec<(Severity, String)>,
}

impl<'a, B: Backend> TerminalGateUi<'a, B> {
    fn new(terminal: &'a mut Terminal<B>) -> Self {
        Self {
            terminal,
            statuses: Vec::new(),
        }
    }
}

impl<B: Backend> GateUi for TerminalGateUi<'_, B> {
    fn confirm(&mut self, prompt: &str) -> bool {
        loop {
            let drawn = self
                .terminal
                .draw(|frame| render_confirm_overlay(frame, prompt));
            if drawn.is_err() {
                return false;
            }
            match event::read() {
                Ok(Event::Key(key)) => match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => return true,
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => return false,
                    _ => {}
                },
                Ok(_) => {}
                Err(_) => return false,
            }
        }
    }

    fn notify(&mut self, severity: Severity, message: &str) {
        if severity == Severity::Error {
            let drawn = self
                .terminal
                .draw(|frame| render_error_overlay(frame, message));
            if drawn.is_ok() {
                // Block until acknowledged.
                loop {
                    match event::read() {
                        Ok(Event::Key(_)) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
            }
        }
        self.statuses.push((severity, message.to_owned()));
    }
}

fn handle_key_event<R: AppRuntime, B: Backend>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    terminal: &mut Terminal<B>,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.form.is_some() {
        handle_form_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('?'), _) => {
            view_data.help_visible = true;
        }
        (KeyCode::Char('f'), KeyModifiers::NONE) => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::NextTab, internal_tx);
        }
        (KeyCode::Char('b'), KeyModifiers::NONE) => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::PrevTab, internal_tx);
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            if let Err(error) = refresh_view_data(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("refresh failed: {error}"));
            } else {
                emit_status(state, view_data, internal_tx, "refreshed");
            }
        }
        (KeyCode::Char('D'), _) => {
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::ToggleDeleted,
                internal_tx,
            );
        }
        (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => {
            move_cursor(view_data, 1);
        }
        (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => {
            move_cursor(view_data, -1);
        }
        (KeyCode::Char('g'), KeyModifiers::NONE) => {
            view_data.cursor = 0;
        }
        (KeyCode::Char('G'), _) => {
            let rows = table_row_count(view_data);
            view_data.cursor = rows.saturating_sub(1);
        }
        (KeyCode::Char(' '), _) => {
            handle_space_key(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('a'), KeyModifiers::NONE) => {
            set_all_checked(state, view_data, internal_tx, true);
        }
        (KeyCode::Char('n'), KeyModifiers::NONE) => {
            set_all_checked(state, view_data, internal_tx, false);
        }
        (KeyCode::Char('i'), KeyModifiers::NONE) => {
            open_form(state, view_data);
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            apply_lifecycle_at_cursor(state, runtime, view_data, internal_tx, LifecycleAction::Delete);
        }
        (KeyCode::Char('u'), KeyModifiers::NONE) => {
            apply_lifecycle_at_cursor(
                state,
                runtime,
                view_data,
                internal_tx,
                LifecycleAction::Restore,
            );
        }
        (KeyCode::Char('v'), KeyModifiers::NONE) => {
            verify_at_cursor(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('B'), _) => {
            trigger_backup(state, runtime, view_data, terminal, internal_tx);
        }
        _ => {}
    }
    false
}

fn dispatch_and_refresh<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: AppCommand,
    internal_tx: &Sender<InternalEvent>,
) {
    state.dispatch(command);
    view_data.cursor = 0;
    if let Err(error) = refresh_view_data(state, runtime, view_data) {
        emit_status(state, view_data, internal_tx, format!("load failed: {error}"));
    }
}

fn table_row_count(view_data: &ViewData) -> usize {
    view_data
        .table
        .as_ref()
        .map(|table| table.rows.len())
        .unwrap_or(0)
}

fn move_cursor(view_data: &mut ViewData, delta: isize) {
    let rows = table_row_count(view_data);
    if rows == 0 {
        view_data.cursor = 0;
        return;
    }
    let current = view_data.cursor as isize;
    let next = (current + delta).clamp(0, rows as isize - 1);
    view_data.cursor = next as usize;
}

fn checked_set_for_tab(view_data: &mut ViewData, tab: TabKind) -> Option<&mut BTreeSet<String>> {
    match tab {
        TabKind::Devices => Some(&mut view_data.checked_devices),
        TabKind::Backup => Some(&mut view_data.checked_backup),
        _ => None,
    }
}

fn handle_space_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    match state.active_tab {
        TabKind::Devices | TabKind::Backup => {
            toggle_checked_at_cursor(state, view_data, internal_tx);
        }
        TabKind::Settings => {
            toggle_setting_at_cursor(state, runtime, view_data, internal_tx);
        }
        _ => {}
    }
}

fn toggle_checked_at_cursor(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let cursor = view_data.cursor;
    let row = match view_data.table.as_ref().and_then(|table| table.rows.get(cursor)) {
        Some(row) => (row.deleted, row.cells.first().cloned()),
        None => return,
    };
    let (deleted, name) = row;
    if deleted {
        emit_status(state, view_data, internal_tx, "deleted rows are not selectable");
        return;
    }
    let Some(name) = name else {
        return;
    };

    let Some(checked) = checked_set_for_tab(view_data, state.active_tab) else {
        return;
    };
    if !checked.remove(&name) {
        checked.insert(name);
    }
    rebuild_table(view_data);
}

fn set_all_checked(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    select: bool,
) {
    let names: Vec<String> = match view_data.table.as_ref() {
        Some(table) if matches!(table.tab, TabKind::Devices | TabKind::Backup) => table
            .rows
            .iter()
            .filter(|row| !row.deleted)
            .filter_map(|row| row.cells.first().cloned())
            .collect(),
        _ => return,
    };

    let tab = state.active_tab;
    let Some(checked) = checked_set_for_tab(view_data, tab) else {
        return;
    };
    checked.clear();
    if select {
        checked.extend(names);
    }
    rebuild_table(view_data);
    let label = if select { "all rows checked" } else { "selection cleared" };
    emit_status(state, view_data, internal_tx, label);
}

fn toggle_setting_at_cursor<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(TabSnapshot::Settings(settings)) = view_data.snapshot.as_ref() else {
        return;
    };
    let Some(setting) = settings.get(view_data.cursor).cloned() else {
        return;
    };

    let result = match (setting.key, &setting.value) {
        (SettingKey::UiShowDashboard, SettingValue::Bool(value)) => {
            runtime.set_show_dashboard(!value)
        }
        (SettingKey::BackupProtocol, SettingValue::Text(value)) => {
            let current = BackupProtocol::parse(value).unwrap_or(BackupProtocol::Tftp);
            let all = BackupProtocol::ALL;
            let index = all.iter().position(|p| *p == current).unwrap_or(0);
            let next = all[(index + 1) % all.len()];
            runtime.set_backup_protocol(next)
        }
        _ => Ok(()),
    };

    match result {
        Ok(()) => {
            if let Err(error) = refresh_view_data(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("load failed: {error}"));
            } else {
                emit_status(state, view_data, internal_tx, "setting updated");
            }
        }
        Err(error) => {
            emit_status(state, view_data, internal_tx, format!("setting update failed: {error}"));
        }
    }
}

fn open_form(state: &mut AppState, view_data: &mut ViewData) {
    let kind = match state.active_tab {
        TabKind::Devices | TabKind::Backup => FormKind::Device,
        TabKind::Groups => FormKind::Group,
        _ => return,
    };
    view_data.form = Some(FormUiState::new(kind));
    state.dispatch(AppCommand::OpenForm(kind));
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            return;
        }
        KeyCode::Enter => {
            submit_form(state, runtime, view_data, internal_tx);
            return;
        }
        _ => {}
    }

    let Some(form) = view_data.form.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Tab | KeyCode::Down => {
            form.field_index = (form.field_index + 1) % form.fields.len();
        }
        KeyCode::BackTab | KeyCode::Up => {
            form.field_index = form
                .field_index
                .checked_sub(1)
                .unwrap_or(form.fields.len() - 1);
        }
        KeyCode::Backspace => {
            form.fields[form.field_index].value.pop();
        }
        KeyCode::Char(ch) => {
            form.fields[form.field_index].value.push(ch);
        }
        _ => {}
    }
}

fn parse_device_draft(form: &FormUiState) -> Result<DeviceDraft> {
    let name = form.field_value("name").trim().to_owned();
    if name.is_empty() {
        anyhow::bail!("name must not be empty");
    }
    let host = form.field_value("host").trim().to_owned();
    if host.is_empty() {
        anyhow::bail!("host must not be empty");
    }
    let port: u16 = form
        .field_value("port")
        .trim()
        .parse()
        .context("port must be a number between 1 and 65535")?;
    let type_raw = form.field_value("type");
    let device_type = DeviceType::parse(type_raw)
        .with_context(|| format!("unknown device type {type_raw:?}"))?;

    Ok(DeviceDraft {
        name,
        host,
        port,
        device_type,
        username: form.field_value("username").trim().to_owned(),
        notes: form.field_value("notes").to_owned(),
    })
}

fn parse_group_draft(form: &FormUiState) -> Result<GroupDraft> {
    let name = form.field_value("name").trim().to_owned();
    if name.is_empty() {
        anyhow::bail!("name must not be empty");
    }
    Ok(GroupDraft {
        name,
        description: form.field_value("description").to_owned(),
    })
}

fn submit_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(form) = view_data.form.as_ref() else {
        return;
    };

    let outcome = match form.kind {
        FormKind::Device => {
            parse_device_draft(form).and_then(|draft| runtime.submit_device(&draft))
        }
        FormKind::Group => parse_group_draft(form).and_then(|draft| runtime.submit_group(&draft)),
    };

    match outcome {
        Ok(()) => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            if let Err(error) = refresh_view_data(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("load failed: {error}"));
            } else {
                emit_status(state, view_data, internal_tx, "saved");
            }
        }
        Err(error) => {
            emit_status(state, view_data, internal_tx, format!("form error: {error}"));
        }
    }
}

fn apply_lifecycle_at_cursor<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    action: LifecycleAction,
) {
    if !matches!(state.active_tab, TabKind::Devices | TabKind::Groups) {
        return;
    }
    let Some(row_id) = view_data
        .table
        .as_ref()
        .and_then(|table| table.row_id_at(view_data.cursor))
    else {
        return;
    };

    match runtime.apply_lifecycle(state.active_tab, row_id, action) {
        Ok(()) => {
            let label = match action {
                LifecycleAction::Delete => "deleted",
                LifecycleAction::Restore => "restored",
            };
            if let Err(error) = refresh_view_data(state, runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("load failed: {error}"));
            } else {
                emit_status(state, view_data, internal_tx, label);
            }
        }
        Err(error) => {
            emit_status(state, view_data, internal_tx, format!("lifecycle failed: {error}"));
        }
    }
}

fn verify_at_cursor<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if state.active_tab != TabKind::History {
        emit_status(state, view_data, internal_tx, "verify runs from the history tab");
        return;
    }
    let Some(row_id) = view_data
        .table
        .as_ref()
        .and_then(|table| table.row_id_at(view_data.cursor))
    else {
        return;
    };

    match runtime.verify_backup(BackupRecordId::new(row_id)) {
        Ok(true) => emit_status(state, view_data, internal_tx, "checksum ok"),
        Ok(false) => emit_status(state, view_data, internal_tx, "checksum MISMATCH"),
        Err(error) => {
            emit_status(state, view_data, internal_tx, format!("verify failed: {error}"));
        }
    }
}

/// Entry point for the bulk backup trigger. The gate runs synchronously;
/// the in-flight guard resolves the reentrancy question by ignoring the
/// trigger while a run is pending.
fn trigger_backup<R: AppRuntime, B: Backend>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    terminal: &mut Terminal<B>,
    internal_tx: &Sender<InternalEvent>,
) {
    if view_data.backup_in_flight {
        emit_status(state, view_data, internal_tx, "backup already running");
        return;
    }
    if !matches!(state.active_tab, TabKind::Devices | TabKind::Backup) {
        emit_status(
            state,
            view_data,
            internal_tx,
            "backup runs from the devices or backup tab",
        );
        return;
    }

    view_data.backup_in_flight = true;
    let mut gate_ui = TerminalGateUi::new(terminal);
    let mut summary = None;
    let outcome = {
        let view = view_data.table.as_ref();
        run_bulk_action(view, &view_data.registry, &mut gate_ui, "backup", |targets| {
            summary = Some(runtime.run_backup(targets)?);
            Ok(())
        })
    };
    let statuses = gate_ui.statuses;
    view_data.backup_in_flight = false;

    // Error notices were already shown as a blocking overlay; the status
    // line still gets every message.
    for (_severity, message) in statuses {
        emit_status(state, view_data, internal_tx, message);
    }

    if matches!(outcome, GateOutcome::Started { .. }) {
        view_data.checked_devices.clear();
        view_data.checked_backup.clear();
        if let Err(error) = refresh_view_data(state, runtime, view_data) {
            emit_status(state, view_data, internal_tx, format!("load failed: {error}"));
        }
        if let Some(summary) = summary {
            emit_status(state, view_data, internal_tx, summary_status(summary));
        }
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_tabs(frame, chunks[0], state);
    if state.active_tab == TabKind::Dashboard {
        render_dashboard(frame, chunks[1], view_data);
    } else {
        render_table(frame, chunks[1], view_data);
    }
    render_status_line(frame, chunks[2], state);

    if let Some(form) = view_data.form.as_ref() {
        render_form_overlay(frame, form);
    }
    if view_data.help_visible {
        render_help_overlay(frame);
    }
}

fn render_tabs(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState) {
    let titles: Vec<&str> = TabKind::ALL.iter().map(|tab| tab.label()).collect();
    let selected = TabKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .block(Block::default().borders(Borders::ALL).title("pulsarnet"))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan));
    frame.render_widget(tabs, area);
}

fn render_dashboard(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let text = render_dashboard_text(&view_data.counts);
    let paragraph =
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("overview"));
    frame.render_widget(paragraph, area);
}

fn render_dashboard_text(counts: &DashboardCounts) -> String {
    format!(
        "devices: {}\nfailing: {}\nbackups today: {}\n\nkeys: f/b tabs, space toggle, a/n all/none, B backup, v verify, i new, d/u delete/restore, ? help",
        counts.devices_total, counts.devices_failed, counts.backups_today
    )
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let Some(table_ui) = view_data.table.as_ref() else {
        let paragraph = Paragraph::new("loading...")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, area);
        return;
    };

    let mut header_cells = vec![Cell::from("sel")];
    header_cells.extend(table_ui.columns.iter().map(|name| Cell::from(*name)));
    let header = Row::new(header_cells).style(Style::default().add_modifier(Modifier::BOLD));

    let rows = table_ui.rows.iter().enumerate().map(|(index, row)| {
        let mut cells = vec![Cell::from(row.selection.glyph())];
        cells.extend(row.cells.iter().map(|value| Cell::from(value.as_str())));
        let mut style = Style::default();
        if row.deleted {
            style = style.fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT);
        }
        if index == view_data.cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        Row::new(cells).style(style)
    });

    let mut widths = vec![Constraint::Length(4)];
    widths.extend(column_widths(table_ui));

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(table_ui.tab.label()),
    );
    frame.render_widget(table, area);
}

fn column_widths(table_ui: &TableUi) -> Vec<Constraint> {
    table_ui
        .columns
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let widest = table_ui
                .rows
                .iter()
                .map(|row| row.cells.get(index).map(String::len).unwrap_or(0))
                .max()
                .unwrap_or(0)
                .max(name.len());
            Constraint::Length((widest.min(40) + 2) as u16)
        })
        .collect()
}

fn render_status_line(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState) {
    let message = state.status_line.as_deref().unwrap_or("");
    let paragraph = Paragraph::new(message).style(Style::default().fg(Color::Yellow));
    frame.render_widget(paragraph, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn render_confirm_overlay(frame: &mut ratatui::Frame<'_>, prompt: &str) {
    let area = centered_rect(60, 7, frame.area());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(format!("{prompt}\n\n[y]es  [n]o"))
        .wrap(ratatui::widgets::Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("confirm"));
    frame.render_widget(paragraph, area);
}

fn render_error_overlay(frame: &mut ratatui::Frame<'_>, message: &str) {
    let area = centered_rect(60, 7, frame.area());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(format!("{message}\n\npress any key"))
        .wrap(ratatui::widgets::Wrap { trim: true })
        .style(Style::default().fg(Color::Red))
        .block(Block::default().borders(Borders::ALL).title("error"));
    frame.render_widget(paragraph, area);
}

fn render_form_overlay(frame: &mut ratatui::Frame<'_>, form: &FormUiState) {
    let height = (form.fields.len() as u16) + 4;
    let area = centered_rect(50, height, frame.area());
    frame.render_widget(Clear, area);

    let title = match form.kind {
        FormKind::Device => "new device",
        FormKind::Group => "new group",
    };
    let mut text = String::new();
    for (index, field) in form.fields.iter().enumerate() {
        let cursor = if index == form.field_index { ">" } else { " " };
        text.push_str(&format!("{cursor} {}: {}\n", field.label, field.value));
    }
    text.push_str("\nenter submit, esc cancel, tab next field");

    let paragraph =
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(paragraph, area);
}

fn render_help_overlay(frame: &mut ratatui::Frame<'_>) {
    let area = centered_rect(52, 16, frame.area());
    frame.render_widget(Clear, area);
    let text = "\
f / b      next / previous tab
j / k      move cursor
space      toggle row checkbox (or setting)
a / n      check all / clear selection
B          back up checked devices
v          verify backup checksum (history)
i          new device / group
d / u      delete / restore row
D          show or hide deleted rows
r          refresh
?          close help
ctrl-q     quit";
    let paragraph =
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("help"));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::{
        DeviceDraft, FormUiState, GroupDraft, LifecycleAction, RowUi, SelectionCell, TabSnapshot,
        TableUi, build_backup_table, build_device_table, build_history_table, build_settings_table,
        column_widths, format_size, parse_device_draft, parse_group_draft, render_dashboard_text,
        short_checksum, summary_status,
    };
    use anyhow::Result;
    use pulsarnet_app::{
        AppSetting, BackupProtocol, BackupRecord, BackupRecordId, BackupRunSummary, BackupStatus,
        CheckState, ConnectionStatus, DashboardCounts, Device, DeviceId, DeviceIndex, DeviceType,
        FormKind, GateOutcome, GateUi, SelectionView, SettingKey, SettingValue, Severity,
        resolve_selected, run_bulk_action,
    };
    use std::collections::BTreeSet;
    use time::OffsetDateTime;

    fn device(id: i64, name: &str) -> Device {
        let now = OffsetDateTime::UNIX_EPOCH;
        Device {
            id: DeviceId::new(id),
            name: name.to_owned(),
            host: format!("10.0.0.{id}"),
            port: 22,
            device_type: DeviceType::CiscoIos,
            username: "backup".to_owned(),
            connection_status: ConnectionStatus::Unknown,
            last_backup_at: None,
            last_error: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn deleted_device(id: i64, name: &str) -> Device {
        Device {
            deleted_at: Some(OffsetDateTime::UNIX_EPOCH),
            ..device(id, name)
        }
    }

    fn checked(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    #[test]
    fn device_table_uses_embedded_controls() {
        let devices = vec![device(1, "core-nyc-01"), device(2, "edge-sfo-01")];
        let table = build_device_table(&devices, &checked(&["edge-sfo-01"]));

        assert_eq!(table.marker_state(0), None);
        assert_eq!(table.control_checked(0), Some(false));
        assert_eq!(table.control_checked(1), Some(true));
        assert_eq!(table.identifier(1), Some("edge-sfo-01"));
    }

    #[test]
    fn backup_table_uses_marker_cells() {
        let devices = vec![device(1, "core-nyc-01"), device(2, "edge-sfo-01")];
        let table = build_backup_table(&devices, &checked(&["core-nyc-01"]));

        assert_eq!(table.control_checked(0), None);
        assert_eq!(table.marker_state(0), Some(CheckState::Checked));
        assert_eq!(table.marker_state(1), Some(CheckState::Unchecked));
    }

    #[test]
    fn both_representations_resolve_identically() {
        let devices = vec![
            device(1, "core-nyc-01"),
            device(2, "edge-sfo-01"),
            device(3, "acc-dal-01"),
        ];
        let registry = DeviceIndex::from_devices(&devices);
        let selected = checked(&["core-nyc-01", "acc-dal-01"]);

        let control_table = build_device_table(&devices, &selected);
        let marker_table = build_backup_table(&devices, &selected);

        let from_control = resolve_selected(&control_table, &registry);
        let from_marker = resolve_selected(&marker_table, &registry);
        let control_names: Vec<&str> = from_control.iter().map(|d| d.name.as_str()).collect();
        let marker_names: Vec<&str> = from_marker.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(control_names, marker_names);
        // Row order, not name order.
        assert_eq!(control_names, vec!["core-nyc-01", "acc-dal-01"]);
    }

    #[test]
    fn deleted_rows_carry_no_indicator_and_resolve_unselected() {
        let devices = vec![device(1, "core-nyc-01"), deleted_device(2, "old-sw-09")];
        // Stale checked entry for the deleted device must not select it.
        let table = build_device_table(&devices, &checked(&["old-sw-09"]));
        let registry = DeviceIndex::from_devices(&devices);

        assert_eq!(table.rows[1].selection, SelectionCell::Blank);
        assert!(resolve_selected(&table, &registry).is_empty());
    }

    #[derive(Debug, Default)]
    struct ScriptedUi {
        answers: Vec<bool>,
        notices: Vec<(Severity, String)>,
    }

    impl GateUi for ScriptedUi {
        fn confirm(&mut self, _prompt: &str) -> bool {
            if self.answers.is_empty() {
                false
            } else {
                self.answers.remove(0)
            }
        }

        fn notify(&mut self, severity: Severity, message: &str) {
            self.notices.push((severity, message.to_owned()));
        }
    }

    #[test]
    fn gate_fallback_covers_all_visible_table_rows() {
        let devices = vec![
            device(1, "core-nyc-01"),
            device(2, "edge-sfo-01"),
            device(3, "acc-dal-01"),
        ];
        let registry = DeviceIndex::from_devices(&devices);
        let table = build_backup_table(&devices, &BTreeSet::new());
        let mut ui = ScriptedUi {
            answers: vec![true, true],
            ..ScriptedUi::default()
        };
        let mut count = 0;

        let outcome = run_bulk_action(Some(&table), &registry, &mut ui, "backup", |targets| {
            count = targets.len();
            Ok(())
        });

        assert_eq!(outcome, GateOutcome::Started { targets: 3 });
        assert_eq!(count, 3);
    }

    #[test]
    fn gate_declined_fallback_reports_cancelled() {
        let devices = vec![device(1, "core-nyc-01")];
        let registry = DeviceIndex::from_devices(&devices);
        let table = build_device_table(&devices, &BTreeSet::new());
        let mut ui = ScriptedUi::default();
        let mut invoked = false;

        let outcome = run_bulk_action(Some(&table), &registry, &mut ui, "backup", |_| {
            invoked = true;
            Ok(())
        });

        assert_eq!(outcome, GateOutcome::CancelledNoSelection);
        assert!(!invoked);
        assert_eq!(ui.notices.len(), 1);
        assert!(ui.notices[0].1.contains("cancelled, no selection"));
    }

    #[test]
    fn gate_without_table_reports_view_unavailable() {
        let registry = DeviceIndex::from_devices(&[]);
        let mut ui = ScriptedUi::default();

        let outcome = run_bulk_action(
            None::<&TableUi>,
            &registry,
            &mut ui,
            "backup",
            |_| Ok(()),
        );

        assert_eq!(outcome, GateOutcome::ViewUnavailable);
    }

    #[test]
    fn history_and_settings_rows_are_not_selectable() {
        let record = BackupRecord {
            id: BackupRecordId::new(1),
            device_id: DeviceId::new(1),
            device_name: "core-nyc-01".to_owned(),
            status: BackupStatus::Success,
            protocol: BackupProtocol::Tftp,
            size_bytes: 2048,
            checksum_sha256: "ab".repeat(32),
            error_message: None,
            started_at: OffsetDateTime::UNIX_EPOCH,
            finished_at: Some(OffsetDateTime::UNIX_EPOCH),
        };
        let history = build_history_table(&[record]);
        assert_eq!(history.marker_state(0), None);
        assert_eq!(history.control_checked(0), None);

        let settings = build_settings_table(&[AppSetting {
            key: SettingKey::UiShowDashboard,
            value: SettingValue::Bool(true),
        }]);
        assert_eq!(settings.rows[0].selection, SelectionCell::Blank);
        assert_eq!(settings.rows[0].cells[1], "on");
    }

    #[test]
    fn snapshot_row_counts() {
        let snapshot = TabSnapshot::Devices(vec![device(1, "a"), device(2, "b")]);
        assert_eq!(snapshot.row_count(), 2);
        assert_eq!(snapshot.tab_kind(), pulsarnet_app::TabKind::Devices);
    }

    #[test]
    fn device_draft_parses_and_validates() -> Result<()> {
        let mut form = FormUiState::new(FormKind::Device);
        for field in form.fields.iter_mut() {
            field.value = match field.label {
                "name" => "lab-sw-01".to_owned(),
                "host" => "10.9.9.9".to_owned(),
                "port" => "2222".to_owned(),
                "type" => "arista_eos".to_owned(),
                "username" => "oper".to_owned(),
                _ => String::new(),
            };
        }

        let draft = parse_device_draft(&form)?;
        assert_eq!(
            draft,
            DeviceDraft {
                name: "lab-sw-01".to_owned(),
                host: "10.9.9.9".to_owned(),
                port: 2222,
                device_type: DeviceType::AristaEos,
                username: "oper".to_owned(),
                notes: String::new(),
            }
        );
        Ok(())
    }

    #[test]
    fn device_draft_rejects_bad_port_and_type() {
        let mut form = FormUiState::new(FormKind::Device);
        form.fields[0].value = "lab-sw-01".to_owned();
        form.fields[1].value = "10.9.9.9".to_owned();
        form.fields[2].value = "not-a-port".to_owned();
        assert!(parse_device_draft(&form).is_err());

        form.fields[2].value = "22".to_owned();
        form.fields[3].value = "vax_vms".to_owned();
        let error = parse_device_draft(&form).expect_err("unknown type should fail");
        assert!(error.to_string().contains("unknown device type"));
    }

    #[test]
    fn group_draft_requires_name() {
        let form = FormUiState::new(FormKind::Group);
        assert!(parse_group_draft(&form).is_err());

        let mut form = FormUiState::new(FormKind::Group);
        form.fields[0].value = "Core Network".to_owned();
        assert_eq!(
            parse_group_draft(&form).expect("valid group"),
            GroupDraft {
                name: "Core Network".to_owned(),
                description: String::new(),
            }
        );
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(2048), "2.0K");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0M");
        assert_eq!(short_checksum(&"ab".repeat(32)).len(), 12);
        assert_eq!(
            summary_status(BackupRunSummary {
                attempted: 3,
                succeeded: 2,
                failed: 1,
            }),
            "backup finished: 2 ok, 1 failed of 3"
        );
        assert!(render_dashboard_text(&DashboardCounts::default()).contains("devices: 0"));
    }

    #[test]
    fn column_widths_fit_widest_cell() {
        let table = TableUi {
            tab: pulsarnet_app::TabKind::Devices,
            columns: vec!["name", "host"],
            rows: vec![RowUi {
                row_id: 1,
                selection: SelectionCell::Blank,
                cells: vec!["a-rather-long-device-name".to_owned(), "10.0.0.1".to_owned()],
                deleted: false,
            }],
        };
        let widths = column_widths(&table);
        assert_eq!(widths.len(), 2);
    }

    #[test]
    fn lifecycle_action_is_copyable() {
        let action = LifecycleAction::Delete;
        let copied = action;
        assert_eq!(action, copied);
    }
}
