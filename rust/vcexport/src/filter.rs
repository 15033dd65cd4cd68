//! Inventory filtering and UUID deduplication.
//!
//! Decides which enumerated VMs are eligible for export. Pure with respect
//! to the management plane: operates entirely on already-fetched records.

use std::collections::HashSet;

use serde::Serialize;

use crate::inventory::{Inventory, PowerState, VmInventoryRecord};
use crate::skiplist::SkipList;

/// Why a VM was excluded from the export set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionReason {
    PoweredOff,
    GuestNotRunning,
    NoIpAddress,
    HostModelExcluded,
    SkipRuleMatched,
    DuplicateUuid,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::PoweredOff => "powered-off",
            ExclusionReason::GuestNotRunning => "guest-not-running",
            ExclusionReason::NoIpAddress => "no-ip",
            ExclusionReason::HostModelExcluded => "host-model-excluded",
            ExclusionReason::SkipRuleMatched => "skip-rule-matched",
            ExclusionReason::DuplicateUuid => "duplicate-uuid",
        }
    }
}

/// Per-VM verdict. Every enumerated VM gets exactly one.
#[derive(Debug, Clone, Serialize)]
pub struct ExportDecision {
    pub vm_name: String,
    pub vm_uuid: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Included,
    Excluded(ExclusionReason),
}

impl ExportDecision {
    pub fn is_included(&self) -> bool {
        matches!(self.verdict, Verdict::Included)
    }
}

/// Operator-visible notice for a duplicate-UUID exclusion.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateIdentityNotice {
    pub uuid: String,
    /// Name of the VM that was skipped.
    pub skipped_vm: String,
}

/// Result of the filter stage: one decision per enumerated VM (enumeration
/// order preserved) plus the included subsequence and duplicate notices.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub decisions: Vec<ExportDecision>,
    pub included: Vec<VmInventoryRecord>,
    pub duplicate_notices: Vec<DuplicateIdentityNotice>,
}

/// Evaluate the exclusion predicates for one VM, in fixed order. First
/// matching reason wins. Deduplication is handled by the caller since it
/// needs cross-VM state.
fn exclusion_reason(
    vm: &VmInventoryRecord,
    inventory: &Inventory,
    skip_list: &SkipList,
) -> Option<ExclusionReason> {
    if vm.power_state != PowerState::PoweredOn {
        return Some(ExclusionReason::PoweredOff);
    }
    if vm.guest_state == crate::inventory::GuestRunState::NotRunning {
        return Some(ExclusionReason::GuestNotRunning);
    }
    if vm.ip_addresses.is_empty() {
        return Some(ExclusionReason::NoIpAddress);
    }
    if let Some(host) = vm.host.as_deref() {
        if inventory.host(host).is_some_and(|h| h.is_excluded_model()) {
            return Some(ExclusionReason::HostModelExcluded);
        }
    }
    if skip_list.matches(&vm.name) {
        return Some(ExclusionReason::SkipRuleMatched);
    }
    None
}

/// Apply the filtering predicates and UUID deduplication to the enumerated
/// inventory, producing the authoritative export set.
///
/// Among VMs sharing a UUID, the first one encountered in enumeration order
/// wins inclusion; every later duplicate is excluded and reported.
pub fn filter_inventory(inventory: &Inventory, skip_list: &SkipList) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    let mut seen_uuids: HashSet<String> = HashSet::new();

    for vm in &inventory.vms {
        let verdict = match exclusion_reason(vm, inventory, skip_list) {
            Some(reason) => Verdict::Excluded(reason),
            None if seen_uuids.contains(&vm.uuid) => {
                tracing::warn!(vm = %vm.name, uuid = %vm.uuid, "skipping VM with duplicate UUID");
                outcome.duplicate_notices.push(DuplicateIdentityNotice {
                    uuid: vm.uuid.clone(),
                    skipped_vm: vm.name.clone(),
                });
                Verdict::Excluded(ExclusionReason::DuplicateUuid)
            }
            None => {
                seen_uuids.insert(vm.uuid.clone());
                outcome.included.push(vm.clone());
                Verdict::Included
            }
        };

        if let Verdict::Excluded(reason) = verdict {
            tracing::debug!(vm = %vm.name, reason = reason.as_str(), "VM excluded");
        }

        outcome.decisions.push(ExportDecision {
            vm_name: vm.name.clone(),
            vm_uuid: vm.uuid.clone(),
            verdict,
        });
    }

    tracing::info!(
        total = outcome.decisions.len(),
        included = outcome.included.len(),
        duplicates = outcome.duplicate_notices.len(),
        "inventory filtered"
    );

    outcome
}
