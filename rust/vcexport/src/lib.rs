//! Export VM inventory and performance statistics from vCenter into
//! RVTools-format CSV files.
//!
//! One bounded extraction pass per invocation: enumerate inventory, filter
//! and deduplicate the VM set, resolve the sampling policy for the requested
//! window, aggregate performance counters for the surviving powered-on VMs,
//! and write the vInfo / vPerformance sheets.

pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod interval;
pub mod inventory;
pub mod perf;
pub mod plane;
pub mod skiplist;
pub mod telemetry;
pub mod vsphere;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ExportConfig;
use crate::error::Result;
use crate::export::ExportRow;
use crate::filter::{filter_inventory, DuplicateIdentityNotice};
use crate::interval::IntervalPolicy;
use crate::perf::{collect_metrics, DataQualityNote};
use crate::plane::ManagementPlane;
use crate::skiplist::SkipList;
use crate::vsphere::{VsphereClient, VsphereConfig};

/// Outcome of one export run, returned for the operator summary.
#[derive(Debug)]
pub struct RunReport {
    pub output_dir: PathBuf,
    pub exported_vms: usize,
    pub duplicate_notices: Vec<DuplicateIdentityNotice>,
    pub data_quality_notes: Vec<DataQualityNote>,
}

/// Run the full pipeline against an already-constructed management plane.
///
/// Split out from [`run`] so tests can drive it with an in-memory fake.
pub async fn run_with_plane(
    plane: Arc<dyn ManagementPlane>,
    config: &ExportConfig,
) -> Result<RunReport> {
    // Fail fast on configuration before any collection.
    let skip_list = SkipList::load(&config.skip_list_path)?;
    let policy = IntervalPolicy::resolve(config.perf_interval_minutes)?;

    let mut inventory = plane.enumerate_inventory().await?;
    if let Some(max) = config.max_count {
        inventory.vms.truncate(max);
        tracing::info!(max, "VM count limited by --max-count");
    }

    let outcome = filter_inventory(&inventory, &skip_list);

    let collection = if config.collect_statistics {
        collect_metrics(Arc::clone(&plane), &outcome.included, &policy).await
    } else {
        tracing::info!("skipping performance statistics collection");
        Default::default()
    };

    let rows: Vec<ExportRow> = export::assemble_rows(&outcome, &collection.records);
    let output_dir = export::write_report(
        &config.output_dir,
        &rows,
        &inventory.about,
        config.collect_statistics,
    )?;

    Ok(RunReport {
        output_dir,
        exported_vms: rows.len(),
        duplicate_notices: outcome.duplicate_notices,
        data_quality_notes: collection.notes,
    })
}

/// Connect to vCenter, run the pipeline, and log out.
pub async fn run(config: &ExportConfig) -> Result<RunReport> {
    let client = VsphereClient::new(VsphereConfig {
        host: config.vcenter_host.clone(),
        username: config.vcenter_user.clone(),
        password: config.vcenter_password.clone(),
        insecure: config.disable_ssl_verification,
        timeout_secs: 60,
    })?;
    client.login().await?;

    let client = Arc::new(client);
    let report = run_with_plane(client.clone() as Arc<dyn ManagementPlane>, config).await;

    client.logout().await;
    report
}

/// Print the operator notice summaries the way the report consumers expect
/// them: visible, non-fatal, at the end of the run.
pub fn print_notices(report: &RunReport) {
    if !report.duplicate_notices.is_empty() {
        tracing::warn!(
            count = report.duplicate_notices.len(),
            "duplicate UUIDs were skipped; only the first VM with each UUID was exported"
        );
        for notice in &report.duplicate_notices {
            tracing::warn!(uuid = %notice.uuid, vm = %notice.skipped_vm, "skipped duplicate");
        }
    }
    if !report.data_quality_notes.is_empty() {
        tracing::warn!(
            count = report.data_quality_notes.len(),
            "metrics recorded as zero due to missing or failed counter data"
        );
        for note in &report.data_quality_notes {
            tracing::warn!(vm = %note.vm_name, counter = note.counter, detail = %note.detail, "data quality gap");
        }
    }
}
