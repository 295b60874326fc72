// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;

use crate::Device;
use crate::select::{DeviceLookup, SelectionView, resolve_all_visible, resolve_selected};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Prompt and status surface the gate drives. `confirm` blocks until the
/// user answers; `notify` feeds the status sink, and implementations
/// present `Severity::Error` as a blocking notification.
pub trait GateUi {
    fn confirm(&mut self, prompt: &str) -> bool;
    fn notify(&mut self, severity: Severity, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Started { targets: usize },
    ViewUnavailable,
    CancelledNoSelection,
    CancelledByUser,
    NoValidTargets,
    Failed { message: String },
}

impl GateOutcome {
    pub fn message(&self, action_label: &str) -> String {
        match self {
            Self::Started { targets } => format!("{action_label} started for {targets} device(s)"),
            Self::ViewUnavailable => format!("{action_label} unavailable: table not loaded"),
            Self::CancelledNoSelection => format!("{action_label} cancelled, no selection"),
            Self::CancelledByUser => format!("{action_label} cancelled by user"),
            Self::NoValidTargets => format!("{action_label} aborted: no valid targets"),
            Self::Failed { message } => format!("{action_label} failed: {message}"),
        }
    }

    pub const fn severity(&self) -> Severity {
        match self {
            Self::Started { .. } | Self::CancelledNoSelection | Self::CancelledByUser => {
                Severity::Info
            }
            Self::ViewUnavailable | Self::NoValidTargets => Severity::Warning,
            Self::Failed { .. } => Severity::Error,
        }
    }
}

/// Run `action` behind the three-step bulk decision protocol: resolve the
/// checked rows, offer the all-visible fallback when nothing is checked,
/// then require a final confirmation naming the target count. Errors from
/// `action` are caught here and reported; they never propagate past the
/// gate and the action is not retried.
pub fn run_bulk_action<V, R, F>(
    view: Option<&V>,
    registry: &R,
    ui: &mut dyn GateUi,
    action_label: &str,
    action: F,
) -> GateOutcome
where
    V: SelectionView + ?Sized,
    R: DeviceLookup + ?Sized,
    F: FnOnce(&[Device]) -> Result<()>,
{
    let outcome = decide_and_run(view, registry, ui, action_label, action);
    ui.notify(outcome.severity(), &outcome.message(action_label));
    outcome
}

fn decide_and_run<V, R, F>(
    view: Option<&V>,
    registry: &R,
    ui: &mut dyn GateUi,
    action_label: &str,
    action: F,
) -> GateOutcome
where
    V: SelectionView + ?Sized,
    R: DeviceLookup + ?Sized,
    F: FnOnce(&[Device]) -> Result<()>,
{
    let Some(view) = view else {
        return GateOutcome::ViewUnavailable;
    };

    let mut targets = resolve_selected(view, registry);
    if targets.is_empty() {
        let prompt = format!(
            "No rows are checked. Run {action_label} for all {} visible row(s) instead?",
            view.row_count()
        );
        if !ui.confirm(&prompt) {
            return GateOutcome::CancelledNoSelection;
        }
        targets = resolve_all_visible(view, registry);
    }

    if targets.is_empty() {
        return GateOutcome::NoValidTargets;
    }

    let prompt = format!("Run {action_label} for {} device(s)?", targets.len());
    if !ui.confirm(&prompt) {
        return GateOutcome::CancelledByUser;
    }

    match action(&targets) {
        Ok(()) => GateOutcome::Started {
            targets: targets.len(),
        },
        Err(error) => GateOutcome::Failed {
            message: error.to_string(),
        },
    }
}
