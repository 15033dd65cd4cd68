//! Performance sample collection and aggregation.
//!
//! For every included, powered-on VM, four counters are queried and reduced
//! to the vPerformance metrics. Per-VM work is independent, so collection
//! fans out over a bounded concurrent stream; one VM or counter failing
//! never aborts the rest.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::Error;
use crate::interval::IntervalPolicy;
use crate::inventory::VmInventoryRecord;
use crate::plane::ManagementPlane;

/// How many VMs are queried at once. Matches the batch width the
/// management plane comfortably absorbs.
const COLLECTION_WIDTH: usize = 10;

/// Percentage counters report hundredths of a percent; dividing by this
/// yields a [0,1] decimal fraction. Confirmed against the live counter
/// metadata (`unitInfo.key = "percent"`, raw values 0..=10000).
const PCT_RAW_SCALE: f64 = 10_000.0;

/// Decimal places kept on percentage fractions.
const PCT_DECIMALS: i32 = 4;

/// The counters the report needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Counter {
    CpuUsage,
    MemUsage,
    DiskReadIoSize,
    DiskWriteIoSize,
}

impl Counter {
    pub const ALL: [Counter; 4] = [
        Counter::CpuUsage,
        Counter::MemUsage,
        Counter::DiskReadIoSize,
        Counter::DiskWriteIoSize,
    ];

    /// Dotted counter path as vCenter names it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Counter::CpuUsage => "cpu.usage.average",
            Counter::MemUsage => "mem.usage.average",
            Counter::DiskReadIoSize => "virtualDisk.readIOSize.latest",
            Counter::DiskWriteIoSize => "virtualDisk.writeIOSize.latest",
        }
    }
}

/// One raw sample as returned by the management plane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCounterSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Aggregated metrics for one VM. Percentages are decimal fractions in
/// [0,1]; IO sizes are bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedMetricRecord {
    pub vm_name: String,
    pub vm_uuid: String,
    pub max_cpu_usage_pct: f64,
    pub avg_cpu_usage_pct: f64,
    pub max_ram_usage_pct: f64,
    pub avg_ram_utl_pct: f64,
    pub max_read_io_size_bytes: u64,
    pub max_write_io_size_bytes: u64,
    pub collected_at: Option<DateTime<Utc>>,
}

/// Operator-visible note for a metric that could not be collected and was
/// recorded as zero instead.
#[derive(Debug, Clone, Serialize)]
pub struct DataQualityNote {
    pub vm_name: String,
    pub counter: &'static str,
    pub detail: String,
}

/// Everything the aggregation stage hands to the assembler.
#[derive(Debug, Default)]
pub struct CollectionOutcome {
    pub records: Vec<AggregatedMetricRecord>,
    pub notes: Vec<DataQualityNote>,
}

fn round_fraction(value: f64) -> f64 {
    let factor = 10f64.powi(PCT_DECIMALS);
    (value * factor).round() / factor
}

/// Reduce raw percentage samples to (max, avg) decimal fractions.
///
/// The mean is the uniform arithmetic mean over every returned sample,
/// idle zeroes included. Results are clamped into [0,1] so a counter
/// overshooting its documented range can never leak out of bounds.
pub fn reduce_percentage(samples: &[MetricCounterSample]) -> Option<(f64, f64)> {
    if samples.is_empty() {
        return None;
    }
    let mut max = f64::MIN;
    let mut sum = 0.0;
    for sample in samples {
        let fraction = (sample.value / PCT_RAW_SCALE).clamp(0.0, 1.0);
        if fraction > max {
            max = fraction;
        }
        sum += fraction;
    }
    let avg = sum / samples.len() as f64;
    Some((round_fraction(max), round_fraction(avg)))
}

/// Reduce raw IO-size samples to the maximum, in bytes.
pub fn reduce_max_bytes(samples: &[MetricCounterSample]) -> Option<u64> {
    samples
        .iter()
        .map(|s| s.value.max(0.0) as u64)
        .max()
}

async fn query_counter(
    plane: &dyn ManagementPlane,
    vm: &VmInventoryRecord,
    counter: Counter,
    policy: &IntervalPolicy,
    notes: &mut Vec<DataQualityNote>,
) -> Vec<MetricCounterSample> {
    match plane.query_performance(&vm.moid, counter, policy).await {
        Ok(samples) => {
            if samples.is_empty() {
                notes.push(DataQualityNote {
                    vm_name: vm.name.clone(),
                    counter: counter.as_str(),
                    detail: "no samples returned; counter may not be collected".to_string(),
                });
            }
            samples
        }
        Err(err) => {
            tracing::warn!(
                vm = %vm.name,
                counter = counter.as_str(),
                error = %err,
                "performance query failed, recording zero"
            );
            notes.push(DataQualityNote {
                vm_name: vm.name.clone(),
                counter: counter.as_str(),
                detail: err.to_string(),
            });
            Vec::new()
        }
    }
}

/// Collect and reduce the four report counters for one VM.
///
/// Missing or failed counters yield the defined-zero value for that metric
/// plus a data-quality note; they never fail the VM.
pub async fn aggregate_vm(
    plane: &dyn ManagementPlane,
    vm: &VmInventoryRecord,
    policy: &IntervalPolicy,
) -> (AggregatedMetricRecord, Vec<DataQualityNote>) {
    let mut notes = Vec::new();
    let mut record = AggregatedMetricRecord {
        vm_name: vm.name.clone(),
        vm_uuid: vm.uuid.clone(),
        ..Default::default()
    };

    let cpu = query_counter(plane, vm, Counter::CpuUsage, policy, &mut notes).await;
    if let Some((max, avg)) = reduce_percentage(&cpu) {
        record.max_cpu_usage_pct = max;
        record.avg_cpu_usage_pct = avg;
    }

    let mem = query_counter(plane, vm, Counter::MemUsage, policy, &mut notes).await;
    if let Some((max, avg)) = reduce_percentage(&mem) {
        record.max_ram_usage_pct = max;
        record.avg_ram_utl_pct = avg;
    }

    let read = query_counter(plane, vm, Counter::DiskReadIoSize, policy, &mut notes).await;
    if let Some(max) = reduce_max_bytes(&read) {
        record.max_read_io_size_bytes = max;
    }

    let write = query_counter(plane, vm, Counter::DiskWriteIoSize, policy, &mut notes).await;
    if let Some(max) = reduce_max_bytes(&write) {
        record.max_write_io_size_bytes = max;
    }

    record.collected_at = Some(Utc::now());
    (record, notes)
}

/// Collect metrics for every powered-on VM in the export set.
///
/// VMs are processed through a bounded concurrent stream; record order
/// follows the input order regardless of completion order.
pub async fn collect_metrics(
    plane: Arc<dyn ManagementPlane>,
    vms: &[VmInventoryRecord],
    policy: &IntervalPolicy,
) -> CollectionOutcome {
    let eligible: Vec<&VmInventoryRecord> = vms
        .iter()
        .filter(|vm| vm.power_state == crate::inventory::PowerState::PoweredOn)
        .collect();

    tracing::info!(
        vms = eligible.len(),
        interval = policy.interval.as_str(),
        period_secs = policy.period_secs,
        samples = policy.sample_count,
        "collecting performance metrics"
    );

    let results: Vec<(usize, AggregatedMetricRecord, Vec<DataQualityNote>)> =
        stream::iter(eligible.iter().enumerate())
            .map(|(idx, vm)| {
                let plane = Arc::clone(&plane);
                async move {
                    let (record, notes) = aggregate_vm(plane.as_ref(), vm, policy).await;
                    (idx, record, notes)
                }
            })
            .buffer_unordered(COLLECTION_WIDTH)
            .collect()
            .await;

    let mut ordered = results;
    ordered.sort_by_key(|(idx, _, _)| *idx);

    let mut outcome = CollectionOutcome::default();
    for (_, record, notes) in ordered {
        outcome.records.push(record);
        outcome.notes.extend(notes);
    }
    outcome
}

/// Convenience used by error paths: a recoverable query error for context.
pub fn query_error(vm: &str, counter: Counter, message: impl Into<String>) -> Error {
    Error::Query {
        vm: vm.to_string(),
        counter: counter.as_str().to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[f64]) -> Vec<MetricCounterSample> {
        values
            .iter()
            .map(|&value| MetricCounterSample {
                timestamp: Utc::now(),
                value,
            })
            .collect()
    }

    #[test]
    fn percentage_reduction_scales_to_fraction() {
        // 25.00%, 50.00%, 75.00% in hundredths of a percent.
        let (max, avg) = reduce_percentage(&samples(&[2500.0, 5000.0, 7500.0])).unwrap();
        assert_eq!(max, 0.75);
        assert_eq!(avg, 0.5);
    }

    #[test]
    fn percentage_reduction_clamps_out_of_range_values() {
        let (max, avg) = reduce_percentage(&samples(&[12000.0, -50.0])).unwrap();
        assert_eq!(max, 1.0);
        assert!(avg >= 0.0 && avg <= 1.0);
    }

    #[test]
    fn zero_samples_are_part_of_the_mean() {
        let (_, avg) = reduce_percentage(&samples(&[0.0, 0.0, 6000.0])).unwrap();
        assert_eq!(avg, 0.2);
    }

    #[test]
    fn empty_sequences_reduce_to_none() {
        assert!(reduce_percentage(&[]).is_none());
        assert!(reduce_max_bytes(&[]).is_none());
    }

    #[test]
    fn io_size_reduction_takes_the_maximum() {
        assert_eq!(reduce_max_bytes(&samples(&[4096.0, 65536.0, 512.0])), Some(65536));
    }

    #[test]
    fn negative_io_sizes_floor_at_zero() {
        assert_eq!(reduce_max_bytes(&samples(&[-1.0])), Some(0));
    }
}
