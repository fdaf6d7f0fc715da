//! Worker Collector
//!
//! Reads sealing worker resources and job assignments from lotus-miner.
//!
//! # Metrics Fed
//! - `lotus_miner_worker_{cpu,gpu,ram_total,ram_reserved,ram_tasks}` - per worker host
//! - `lotus_miner_worker_{vmem_total,vmem_reserved,vmem_tasks}` - per worker host
//! - `lotus_miner_worker_{cpu_used,gpu_used}` - per worker host
//! - `lotus_miner_worker_jobs` - assigned jobs per worker host and task

use super::CollectionContext;
use crate::derive::{gpu_used_flag, reserved_memory};
use crate::error::Result;
use crate::lotus::types::WorkerStats;
use crate::snapshot::{WorkerJobCount, WorkerResource};
use std::collections::BTreeMap;

/// Derive one worker's resource figures.
///
/// Virtual memory is physical RAM plus swap; "reserved" is whatever is in use
/// beyond the floor claimed by running tasks.
pub fn worker_resource(stats: &WorkerStats) -> WorkerResource {
    let resources = &stats.info.resources;

    let ram_total = resources.mem_physical;
    let ram_tasks = stats.mem_used_min;
    let ram_used = resources.mem_used;

    let vmem_total = ram_total.saturating_add(resources.mem_swap);
    let vmem_tasks = stats.mem_used_max;
    let vmem_used = ram_used.saturating_add(resources.mem_swap_used);

    WorkerResource {
        host: stats.info.hostname.clone(),
        cpus: resources.cpus,
        gpus: resources.gpus.as_ref().map_or(0, |gpus| gpus.len() as u64),
        ram_total,
        ram_reserved: reserved_memory(ram_used, ram_tasks),
        ram_tasks,
        vmem_total,
        vmem_reserved: reserved_memory(vmem_used, vmem_tasks),
        vmem_tasks,
        cpu_used: stats.cpu_use,
        gpu_used: gpu_used_flag(stats.gpu_used),
    }
}

pub async fn resources(ctx: &CollectionContext<'_>) -> Result<Vec<WorkerResource>> {
    let stats = ctx.miner.worker_stats().await?;

    let mut workers: Vec<WorkerResource> = stats.values().map(worker_resource).collect();
    workers.sort_by(|a, b| a.host.cmp(&b.host));
    Ok(workers)
}

pub async fn job_counts(ctx: &CollectionContext<'_>) -> Result<Vec<WorkerJobCount>> {
    let jobs = ctx.miner.worker_jobs().await?;

    let mut counts: BTreeMap<(String, String), u64> = BTreeMap::new();
    for (worker_id, worker_jobs) in &jobs {
        for job in worker_jobs {
            let host = if job.hostname.is_empty() {
                worker_id.clone()
            } else {
                job.hostname.clone()
            };
            *counts.entry((host, job.task.clone())).or_insert(0) += 1;
        }
    }

    Ok(counts
        .into_iter()
        .map(|((host, task), count)| WorkerJobCount { host, task, count })
        .collect())
}
