//! Inventory records enumerated from the management plane.
//!
//! Records are built once during enumeration and never mutated afterwards;
//! the filter and export stages only read them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Host model string that is never exported. These are synthetic hosts
/// created by VMware HCX / mobility tooling, not real compute.
pub const EXCLUDED_HOST_MODEL: &str = "VMware Mobility Platform";

/// VM power state as reported by vCenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    #[serde(rename = "POWERED_ON", alias = "poweredOn")]
    PoweredOn,
    #[serde(rename = "POWERED_OFF", alias = "poweredOff")]
    PoweredOff,
    #[serde(rename = "SUSPENDED", alias = "suspended")]
    Suspended,
}

impl PowerState {
    /// RVTools-schema spelling of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerState::PoweredOn => "poweredOn",
            PowerState::PoweredOff => "poweredOff",
            PowerState::Suspended => "suspended",
        }
    }
}

/// Guest OS run state from VMware Tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GuestRunState {
    #[serde(rename = "RUNNING", alias = "running")]
    Running,
    #[serde(rename = "NOT_RUNNING", alias = "notRunning")]
    NotRunning,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One virtual machine as enumerated from the management plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmInventoryRecord {
    /// BIOS UUID; the stable identity used for deduplication and joins.
    pub uuid: String,
    /// Display name.
    pub name: String,
    /// Managed object id (e.g. `vm-1234`).
    pub moid: String,
    pub power_state: PowerState,
    #[serde(default)]
    pub guest_state: GuestRunState,
    /// Guest IP addresses in the order the guest reports them. The first
    /// entry is treated as the primary address.
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    /// Name of the host the VM runs on, if placed.
    #[serde(default)]
    pub host: Option<String>,
    /// Remaining RVTools-schema attributes (CPUs, Memory, DNS Name, ...)
    /// carried through verbatim to the vInfo sheet.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl VmInventoryRecord {
    pub fn primary_ip(&self) -> Option<&str> {
        self.ip_addresses.first().map(String::as_str)
    }
}

/// One ESXi host as enumerated from the management plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRecord {
    /// Managed object id (e.g. `host-42`).
    pub moid: String,
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub vendor: String,
}

impl HostRecord {
    pub fn is_excluded_model(&self) -> bool {
        self.model == EXCLUDED_HOST_MODEL
    }
}

/// Identity of the vCenter instance the inventory came from; carried into
/// the `VI SDK *` columns of the vInfo sheet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AboutInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub instance_uuid: String,
}

/// Full enumeration result handed to the filter stage.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub vms: Vec<VmInventoryRecord>,
    pub hosts: Vec<HostRecord>,
    pub about: AboutInfo,
}

impl Inventory {
    /// Look up a VM's host record by name, if the host is known.
    pub fn host(&self, host_name: &str) -> Option<&HostRecord> {
        self.hosts.iter().find(|h| h.name == host_name)
    }
}

/// Fill in each VM's host from a placement map of VM moid to host name.
/// VMs absent from the map (unplaced, or the placement query came back
/// short) keep whatever they already carry.
pub fn apply_host_placement(
    vms: &mut [VmInventoryRecord],
    placement: &std::collections::HashMap<String, String>,
) {
    for vm in vms {
        if vm.host.is_none() {
            vm.host = placement.get(&vm.moid).cloned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn placement_assigns_hosts_by_moid() {
        let mut vms = vec![
            VmInventoryRecord {
                uuid: "u1".to_string(),
                name: "a".to_string(),
                moid: "vm-1".to_string(),
                power_state: PowerState::PoweredOn,
                guest_state: GuestRunState::Running,
                ip_addresses: vec!["10.0.0.1".to_string()],
                host: None,
                attributes: Default::default(),
            },
            VmInventoryRecord {
                uuid: "u2".to_string(),
                name: "b".to_string(),
                moid: "vm-2".to_string(),
                power_state: PowerState::PoweredOn,
                guest_state: GuestRunState::Running,
                ip_addresses: vec!["10.0.0.2".to_string()],
                host: None,
                attributes: Default::default(),
            },
        ];
        let placement =
            HashMap::from([("vm-1".to_string(), "esx01.example.com".to_string())]);

        apply_host_placement(&mut vms, &placement);

        assert_eq!(vms[0].host.as_deref(), Some("esx01.example.com"));
        assert_eq!(vms[1].host, None);
    }
}
