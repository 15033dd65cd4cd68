//! Export assembly and CSV output.
//!
//! Joins the included inventory records with their aggregated metrics into
//! the fixed RVTools sheets and writes one CSV per sheet. Column names and
//! file groupings follow the RVTools convention, so downstream tooling can
//! consume the output unchanged.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{Error, Result};
use crate::filter::{ExportDecision, FilterOutcome, Verdict};
use crate::inventory::{AboutInfo, VmInventoryRecord};
use crate::perf::AggregatedMetricRecord;

/// vInfo sheet columns, in file order.
pub const VINFO_HEADERS: &[&str] = &[
    "VM",
    "Powerstate",
    "Template",
    "DNS Name",
    "CPUs",
    "Memory",
    "Total disk capacity MiB",
    "NICs",
    "Disks",
    "Host",
    "OS according to the configuration file",
    "OS according to the VMware Tools",
    "Primary IP Address",
    "VM ID",
    "VM UUID",
    "VI SDK API Version",
    "VI SDK Server type",
    "VI SDK Server",
    "VI SDK UUID",
];

/// vPerformance sheet columns, in file order.
pub const VPERF_HEADERS: &[&str] = &[
    "VM Name",
    "VM UUID",
    "maxCpuUsagePctDec",
    "avgCpuUsagePctDec",
    "maxRamUsagePctDec",
    "avgRamUtlPctDec",
    "Storage-Max Read IOPS Size",
    "Storage-Max Write IOPS Size",
    "Timestamp",
];

/// One assembled report row: the inventory record, its decision, and the
/// metrics if any were collected for it.
#[derive(Debug)]
pub struct ExportRow {
    pub vm: VmInventoryRecord,
    pub decision: ExportDecision,
    pub metrics: Option<AggregatedMetricRecord>,
}

/// Join included VMs with their decisions and aggregated metrics by UUID.
///
/// Excluded VMs never reach this join. An included VM with no metric record
/// (collection skipped, or a filtering change admitting non-powered-on VMs)
/// keeps its metric columns empty rather than fabricated.
pub fn assemble_rows(
    outcome: &FilterOutcome,
    metrics: &[AggregatedMetricRecord],
) -> Vec<ExportRow> {
    let by_uuid: HashMap<&str, &AggregatedMetricRecord> = metrics
        .iter()
        .map(|record| (record.vm_uuid.as_str(), record))
        .collect();

    outcome
        .included
        .iter()
        .map(|vm| ExportRow {
            vm: vm.clone(),
            decision: ExportDecision {
                vm_name: vm.name.clone(),
                vm_uuid: vm.uuid.clone(),
                verdict: Verdict::Included,
            },
            metrics: by_uuid.get(vm.uuid.as_str()).map(|m| (*m).clone()),
        })
        .collect()
}

fn vinfo_record(row: &ExportRow, about: &AboutInfo) -> Vec<String> {
    let vm = &row.vm;
    let attr = |key: &str| vm.attributes.get(key).cloned().unwrap_or_default();
    vec![
        vm.name.clone(),
        vm.power_state.as_str().to_string(),
        attr("Template"),
        attr("DNS Name"),
        attr("CPUs"),
        attr("Memory"),
        attr("Total disk capacity MiB"),
        attr("NICs"),
        attr("Disks"),
        vm.host.clone().unwrap_or_default(),
        attr("OS according to the configuration file"),
        attr("OS according to the VMware Tools"),
        vm.primary_ip().unwrap_or_default().to_string(),
        vm.moid.clone(),
        vm.uuid.clone(),
        about.api_version.clone(),
        about.name.clone(),
        about.full_name.clone(),
        about.instance_uuid.clone(),
    ]
}

fn vperf_record(metrics: &AggregatedMetricRecord) -> Vec<String> {
    vec![
        metrics.vm_name.clone(),
        metrics.vm_uuid.clone(),
        format!("{}", metrics.max_cpu_usage_pct),
        format!("{}", metrics.avg_cpu_usage_pct),
        format!("{}", metrics.max_ram_usage_pct),
        format!("{}", metrics.avg_ram_utl_pct),
        metrics.max_read_io_size_bytes.to_string(),
        metrics.max_write_io_size_bytes.to_string(),
        metrics
            .collected_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
    ]
}

fn write_sheet(path: &Path, headers: &[&str], records: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(Error::Csv)?;
    writer.write_record(headers)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.flush().map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

/// Write the vInfo and vPerformance sheets into a timestamped run directory
/// under `output_dir`. Returns the run directory path.
pub fn write_report(
    output_dir: &Path,
    rows: &[ExportRow],
    about: &AboutInfo,
    statistics_collected: bool,
) -> Result<PathBuf> {
    let run_dir = output_dir.join(format!("vcexport_{}", Utc::now().format("%Y%m%d_%H%M%S")));
    fs::create_dir_all(&run_dir).map_err(|source| Error::Io {
        path: run_dir.display().to_string(),
        source,
    })?;

    let vinfo: Vec<Vec<String>> = rows.iter().map(|row| vinfo_record(row, about)).collect();
    let vinfo_path = run_dir.join("vInfo.csv");
    write_sheet(&vinfo_path, VINFO_HEADERS, &vinfo)?;
    tracing::info!(path = %vinfo_path.display(), rows = vinfo.len(), "wrote vInfo sheet");

    if statistics_collected {
        let vperf: Vec<Vec<String>> = rows
            .iter()
            .filter_map(|row| row.metrics.as_ref())
            .map(vperf_record)
            .collect();
        let vperf_path = run_dir.join("vPerformance.csv");
        write_sheet(&vperf_path, VPERF_HEADERS, &vperf)?;
        tracing::info!(path = %vperf_path.display(), rows = vperf.len(), "wrote vPerformance sheet");
    }

    Ok(run_dir)
}
