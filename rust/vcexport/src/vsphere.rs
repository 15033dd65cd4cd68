//! vCenter REST API client.
//!
//! Session-based HTTP client implementing the [`ManagementPlane`]
//! capability: `POST /api/session` with basic auth yields a session id that
//! rides along as the `vmware-api-session-id` header on every later call.
//!
//! Inventory comes from `/api/vcenter/vm` and `/api/vcenter/host` plus the
//! per-VM guest endpoints; VM-to-host placement is rebuilt from the VM list
//! endpoint's host filter. Performance samples come from the vStats
//! data-point endpoint. The host summaries do not carry hardware info, so
//! the host model stays empty unless vCenter reports it; the
//! mobility-platform exclusion simply never fires for such hosts.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::interval::IntervalPolicy;
use crate::inventory::{
    apply_host_placement, AboutInfo, GuestRunState, HostRecord, Inventory, PowerState,
    VmInventoryRecord,
};
use crate::perf::{Counter, MetricCounterSample};
use crate::plane::ManagementPlane;

/// Connection settings for one vCenter.
#[derive(Debug, Clone)]
pub struct VsphereConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub insecure: bool,
    pub timeout_secs: u64,
}

/// vCenter REST API client. The session id lives behind an `RwLock` so the
/// aggregator can issue concurrent queries over one shared client.
pub struct VsphereClient {
    client: Client,
    base_url: String,
    session_id: RwLock<Option<String>>,
    config: VsphereConfig,
}

#[derive(Debug, Deserialize)]
struct VmSummary {
    vm: String,
    name: String,
    power_state: PowerState,
}

#[derive(Debug, Default, Deserialize)]
struct VmIdentity {
    #[serde(default)]
    bios_uuid: Option<String>,
    #[serde(default)]
    instance_uuid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VmHardware {
    #[serde(default)]
    count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct VmMemory {
    #[serde(default)]
    size_mib: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct VmDetail {
    name: String,
    #[serde(default)]
    identity: Option<VmIdentity>,
    #[serde(default)]
    cpu: Option<VmHardware>,
    #[serde(default)]
    memory: Option<VmMemory>,
    #[serde(default)]
    guest_os: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GuestPower {
    state: GuestRunState,
}

#[derive(Debug, Default, Deserialize)]
struct GuestIdentity {
    #[serde(default)]
    host_name: Option<String>,
    #[serde(default)]
    ip_address: Option<String>,
    #[serde(default)]
    full_name: Option<GuestFullName>,
}

#[derive(Debug, Default, Deserialize)]
struct GuestFullName {
    #[serde(default)]
    default_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GuestInterface {
    #[serde(default)]
    ip: Option<GuestInterfaceIp>,
}

#[derive(Debug, Default, Deserialize)]
struct GuestInterfaceIp {
    #[serde(default)]
    ip_addresses: Vec<GuestIpAddress>,
}

#[derive(Debug, Deserialize)]
struct GuestIpAddress {
    ip_address: String,
}

#[derive(Debug, Deserialize)]
struct HostSummary {
    host: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(default)]
    product: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    build: String,
}

#[derive(Debug, Deserialize)]
struct DataPointsResponse {
    #[serde(default)]
    data_points: Vec<DataPoint>,
}

#[derive(Debug, Deserialize)]
struct DataPoint {
    /// Epoch seconds.
    ts: i64,
    val: f64,
}

impl VsphereClient {
    /// Build a client from config. Does not create a session yet.
    pub fn new(config: VsphereConfig) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = format!("https://{}", config.host);

        Ok(Self {
            client,
            base_url,
            session_id: RwLock::new(None),
            config,
        })
    }

    /// Create an API session (`POST /api/session`).
    pub async fn login(&self) -> Result<()> {
        let url = format!("{}/api/session", self.base_url);
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Auth);
        }
        let resp = Self::check_status(resp).await?;

        // The session id comes back as a quoted JSON string.
        let session_id: String = resp.json().await?;
        *self.session_id.write().await = Some(session_id);
        tracing::info!(host = %self.config.host, "vCenter session established");
        Ok(())
    }

    /// Delete the current session (`DELETE /api/session`). Best effort.
    pub async fn logout(&self) {
        let mut guard = self.session_id.write().await;
        if let Some(sid) = guard.take() {
            let url = format!("{}/api/session", self.base_url);
            let _ = self
                .client
                .delete(&url)
                .header("vmware-api-session-id", sid)
                .send()
                .await;
        }
    }

    async fn session_header(&self) -> Result<String> {
        self.session_id
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Config("not logged in; no active vCenter session".to_string()))
    }

    async fn check_status(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let sid = self.session_header().await?;
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .header("vmware-api-session-id", sid)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let sid = self.session_header().await?;
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .header("vmware-api-session-id", sid)
            .query(params)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Fetch everything the inventory record needs for one VM. Guest
    /// endpoints 404 when VMware Tools is absent; those fields degrade to
    /// their unknown/empty defaults rather than failing enumeration.
    async fn fetch_vm(&self, summary: &VmSummary) -> Result<VmInventoryRecord> {
        let detail: VmDetail = self.get(&format!("/api/vcenter/vm/{}", summary.vm)).await?;

        let guest_state = match self
            .get::<GuestPower>(&format!("/api/vcenter/vm/{}/guest/power", summary.vm))
            .await
        {
            Ok(power) => power.state,
            Err(_) => GuestRunState::Unknown,
        };

        let identity = self
            .get::<GuestIdentity>(&format!("/api/vcenter/vm/{}/guest/identity", summary.vm))
            .await
            .unwrap_or_default();

        let mut ip_addresses = Vec::new();
        if let Some(primary) = identity.ip_address.clone() {
            ip_addresses.push(primary);
        }
        if let Ok(interfaces) = self
            .get::<Vec<GuestInterface>>(&format!(
                "/api/vcenter/vm/{}/guest/networking/interfaces",
                summary.vm
            ))
            .await
        {
            for interface in interfaces {
                if let Some(ip) = interface.ip {
                    for address in ip.ip_addresses {
                        if !ip_addresses.contains(&address.ip_address) {
                            ip_addresses.push(address.ip_address);
                        }
                    }
                }
            }
        }

        let uuid = detail
            .identity
            .as_ref()
            .and_then(|id| id.bios_uuid.clone().or_else(|| id.instance_uuid.clone()))
            .unwrap_or_default();

        let mut attributes = BTreeMap::new();
        if let Some(cpu) = detail.cpu.as_ref().and_then(|c| c.count) {
            attributes.insert("CPUs".to_string(), cpu.to_string());
        }
        if let Some(mem) = detail.memory.as_ref().and_then(|m| m.size_mib) {
            attributes.insert("Memory".to_string(), mem.to_string());
        }
        if let Some(os) = detail.guest_os.clone() {
            attributes.insert(
                "OS according to the configuration file".to_string(),
                os,
            );
        }
        if let Some(tools_os) = identity
            .full_name
            .as_ref()
            .and_then(|f| f.default_message.clone())
        {
            attributes.insert("OS according to the VMware Tools".to_string(), tools_os);
        }
        if let Some(dns) = identity.host_name.clone() {
            attributes.insert("DNS Name".to_string(), dns);
        }

        Ok(VmInventoryRecord {
            uuid,
            name: detail.name,
            moid: summary.vm.clone(),
            power_state: summary.power_state,
            guest_state,
            ip_addresses,
            host: None,
            attributes,
        })
    }

    async fn fetch_about(&self) -> AboutInfo {
        match self
            .get::<VersionInfo>("/api/appliance/system/version")
            .await
        {
            Ok(version) => AboutInfo {
                name: version.product.clone(),
                full_name: format!("{} {} build {}", version.product, version.version, version.build),
                api_version: version.version,
                instance_uuid: String::new(),
            },
            Err(err) => {
                tracing::debug!(error = %err, "appliance version endpoint unavailable");
                AboutInfo::default()
            }
        }
    }
}

#[async_trait]
impl ManagementPlane for VsphereClient {
    async fn enumerate_inventory(&self) -> Result<Inventory> {
        let summaries: Vec<VmSummary> = self
            .get("/api/vcenter/vm")
            .await
            .map_err(|err| Error::Enumerate(err.to_string()))?;
        tracing::info!(count = summaries.len(), "enumerated VMs");

        let mut vms = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            let record = self
                .fetch_vm(summary)
                .await
                .map_err(|err| Error::Enumerate(format!("VM {}: {err}", summary.name)))?;
            vms.push(record);
        }

        let host_summaries: Vec<HostSummary> = self
            .get("/api/vcenter/host")
            .await
            .map_err(|err| Error::Enumerate(err.to_string()))?;

        // VM-to-host placement: the VM list endpoint filters by host, one
        // query per host.
        let mut placement: HashMap<String, String> = HashMap::new();
        for host in &host_summaries {
            let on_host: Vec<VmSummary> = self
                .get_with_params("/api/vcenter/vm", &[("hosts", host.host.clone())])
                .await
                .map_err(|err| Error::Enumerate(format!("host {}: {err}", host.name)))?;
            for vm in on_host {
                placement.insert(vm.vm, host.name.clone());
            }
        }
        apply_host_placement(&mut vms, &placement);

        let hosts = host_summaries
            .into_iter()
            .map(|summary| HostRecord {
                moid: summary.host,
                name: summary.name,
                model: String::new(),
                vendor: String::new(),
            })
            .collect();

        let about = self.fetch_about().await;

        Ok(Inventory { vms, hosts, about })
    }

    async fn query_performance(
        &self,
        vm_moid: &str,
        counter: Counter,
        policy: &IntervalPolicy,
    ) -> Result<Vec<MetricCounterSample>> {
        let end = Utc::now();
        let start = end - chrono::Duration::minutes(i64::from(policy.window_minutes));

        let params = [
            ("rsrcs", format!("type.VM={vm_moid}")),
            ("cid", counter.as_str().to_string()),
            ("interval", policy.interval.interval_id().to_string()),
            ("start", start.timestamp().to_string()),
            ("end", end.timestamp().to_string()),
        ];

        let resp: DataPointsResponse = self
            .get_with_params("/api/stats/data/dp", &params)
            .await
            .map_err(|err| crate::perf::query_error(vm_moid, counter, err.to_string()))?;

        let mut samples: Vec<MetricCounterSample> = resp
            .data_points
            .into_iter()
            .filter_map(|point| {
                Utc.timestamp_opt(point.ts, 0)
                    .single()
                    .map(|timestamp| MetricCounterSample {
                        timestamp,
                        value: point.val,
                    })
            })
            .collect();

        // vStats caps neither count nor order; trim to the resolved sample
        // count from the newest end of the window.
        samples.sort_by_key(|s| s.timestamp);
        let excess = samples.len().saturating_sub(policy.sample_count as usize);
        if excess > 0 {
            samples.drain(..excess);
        }

        Ok(samples)
    }
}
