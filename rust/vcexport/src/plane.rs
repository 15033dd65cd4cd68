//! Management-plane capability consumed by the pipeline.
//!
//! The pipeline never talks to vCenter directly; it goes through this trait
//! so the real REST client and the in-memory test fake are interchangeable.
//! Implementations must tolerate concurrent `query_performance` calls, since
//! the aggregator fans out per-VM work over a shared handle.

use async_trait::async_trait;

use crate::error::Result;
use crate::interval::IntervalPolicy;
use crate::inventory::Inventory;
use crate::perf::{Counter, MetricCounterSample};

#[async_trait]
pub trait ManagementPlane: Send + Sync {
    /// Enumerate all VMs and hosts with their attributes. A failure here is
    /// fatal to the run: no export set can be formed without it.
    async fn enumerate_inventory(&self) -> Result<Inventory>;

    /// Query historical samples for one counter on one VM, honoring the
    /// resolved interval id and sample count. A failure here is recoverable
    /// per counter; the aggregator records a defined-zero metric instead.
    async fn query_performance(
        &self,
        vm_moid: &str,
        counter: Counter,
        policy: &IntervalPolicy,
    ) -> Result<Vec<MetricCounterSample>>;
}
