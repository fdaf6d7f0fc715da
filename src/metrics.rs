//! Prometheus Metrics Definitions
//!
//! This module defines every sample the exporter exposes and the emitter that
//! turns a [`Snapshot`] into samples.
//!
//! # Metric Categories
//!
//! ## Chain
//! - Daemon info, chain height and base fee
//! - Per-worker sync lag and stage
//! - Mempool totals and the provider's own pending messages
//!
//! ## Provider
//! - Miner info (owner/worker/control addresses) and sector size
//! - Provider and network power, mining eligibility
//! - Wallet balances and locked funds
//!
//! ## Workers
//! - CPU/GPU counts and usage, RAM and virtual memory per worker host
//! - Assigned job counts per worker host and task
//!
//! ## Exporter
//! - `lotus_up`, scrape duration, per-group collection status
//!
//! List-valued groups repeat their samples once per element (sync worker, pending
//! message, wallet, locked-fund bucket, storage worker). Groups missing from the
//! snapshot produce no samples.
//!
//! All metrics use the `lotus_` namespace prefix.

use crate::derive::eligibility_flag;
use crate::snapshot::Snapshot;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

const NAMESPACE: &str = "lotus";

const MINER: &[&str] = &["miner_id"];
const WORKER_HOST: &[&str] = &["miner_id", "worker_host"];
const MPOOL_MESSAGE: &[&str] = &[
    "miner_id",
    "msg_from",
    "msg_to",
    "msg_nonce",
    "msg_value",
    "msg_gaslimit",
    "msg_gasfeecap",
    "msg_gaspremium",
    "msg_method",
    "msg_method_type",
    "msg_to_actor_type",
];
const MINER_INFO: &[&str] = &[
    "miner_id",
    "version",
    "owner",
    "owner_addr",
    "worker",
    "worker_addr",
    "control0",
    "control0_addr",
];

/// Label value used when the miner version could not be read
const UNKNOWN_VERSION: &str = "unknown";

/// Metrics collector for Lotus
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    // Chain metrics
    pub info: Arc<GaugeVec>,
    pub local_time: Arc<Gauge>,
    pub chain_height: Arc<GaugeVec>,
    pub chain_basefee: Arc<GaugeVec>,
    pub chain_sync_diff: Arc<GaugeVec>,
    pub chain_sync_status: Arc<GaugeVec>,

    // Mempool metrics
    pub mpool_total: Arc<GaugeVec>,
    pub mpool_local_total: Arc<GaugeVec>,
    pub mpool_local_message: Arc<GaugeVec>,

    // Provider metrics
    pub power: Arc<GaugeVec>,
    pub power_mining_eligibility: Arc<GaugeVec>,
    pub wallet_balance: Arc<GaugeVec>,
    pub wallet_locked_balance: Arc<GaugeVec>,
    pub miner_info: Arc<GaugeVec>,
    pub miner_info_sector_size: Arc<GaugeVec>,

    // Worker metrics
    pub miner_worker_cpu: Arc<GaugeVec>,
    pub miner_worker_gpu: Arc<GaugeVec>,
    pub miner_worker_ram_total: Arc<GaugeVec>,
    pub miner_worker_ram_reserved: Arc<GaugeVec>,
    pub miner_worker_ram_tasks: Arc<GaugeVec>,
    pub miner_worker_vmem_total: Arc<GaugeVec>,
    pub miner_worker_vmem_reserved: Arc<GaugeVec>,
    pub miner_worker_vmem_tasks: Arc<GaugeVec>,
    pub miner_worker_cpu_used: Arc<GaugeVec>,
    pub miner_worker_gpu_used: Arc<GaugeVec>,
    pub miner_worker_jobs: Arc<GaugeVec>,

    // Exporter metrics
    pub up: Arc<Gauge>,
    pub scrape_duration_seconds: Arc<Gauge>,
    pub scrape_group_up: Arc<GaugeVec>,
}

fn gauge_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> anyhow::Result<Arc<GaugeVec>> {
    let gauge = GaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), labels)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(Arc::new(gauge))
}

fn gauge(registry: &Registry, name: &str, help: &str) -> anyhow::Result<Arc<Gauge>> {
    let gauge = Gauge::with_opts(Opts::new(name, help).namespace(NAMESPACE))?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(Arc::new(gauge))
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let r = &registry;

        Ok(Self {
            info: gauge_vec(
                r,
                "info",
                "Lotus daemon information, value is the network version number",
                &["miner_id", "version", "network"],
            )?,
            local_time: gauge(
                r,
                "local_time",
                "Time on the exporter host when the last collection started, in Unix seconds",
            )?,
            chain_height: gauge_vec(r, "chain_height", "Current chain height", MINER)?,
            chain_basefee: gauge_vec(
                r,
                "chain_basefee",
                "Parent base fee of the current chain head in attoFIL",
                MINER,
            )?,
            chain_sync_diff: gauge_vec(
                r,
                "chain_sync_diff",
                "Height difference between sync target and base per sync worker (-1=anomaly)",
                &["miner_id", "worker_id"],
            )?,
            chain_sync_status: gauge_vec(
                r,
                "chain_sync_status",
                "Sync stage per sync worker",
                &["miner_id", "worker_id"],
            )?,
            mpool_total: gauge_vec(
                r,
                "mpool_total",
                "Number of messages pending in the mpool",
                MINER,
            )?,
            mpool_local_total: gauge_vec(
                r,
                "mpool_local_total",
                "Number of pending messages sent from the provider's addresses",
                MINER,
            )?,
            mpool_local_message: gauge_vec(
                r,
                "mpool_local_message",
                "Pending message sent from the provider's addresses (value is always 1)",
                MPOOL_MESSAGE,
            )?,
            power: gauge_vec(
                r,
                "power",
                "Provider and network power in bytes",
                &["miner_id", "scope", "power_type"],
            )?,
            power_mining_eligibility: gauge_vec(
                r,
                "power_mining_eligibility",
                "Provider mining eligibility (1=eligible, 0=not eligible)",
                MINER,
            )?,
            wallet_balance: gauge_vec(
                r,
                "wallet_balance",
                "Wallet balance in whole FIL",
                &["miner_id", "address", "name"],
            )?,
            wallet_locked_balance: gauge_vec(
                r,
                "wallet_locked_balance",
                "Provider locked funds in FIL",
                &["miner_id", "address", "locked_type"],
            )?,
            miner_info: gauge_vec(
                r,
                "miner_info",
                "Lotus miner information (value is always 1)",
                MINER_INFO,
            )?,
            miner_info_sector_size: gauge_vec(
                r,
                "miner_info_sector_size",
                "Provider sector size in bytes",
                MINER,
            )?,
            miner_worker_cpu: gauge_vec(
                r,
                "miner_worker_cpu",
                "Number of CPUs on the worker",
                WORKER_HOST,
            )?,
            miner_worker_gpu: gauge_vec(
                r,
                "miner_worker_gpu",
                "Number of GPUs on the worker",
                WORKER_HOST,
            )?,
            miner_worker_ram_total: gauge_vec(
                r,
                "miner_worker_ram_total",
                "Worker physical RAM in bytes",
                WORKER_HOST,
            )?,
            miner_worker_ram_reserved: gauge_vec(
                r,
                "miner_worker_ram_reserved",
                "Worker RAM in use beyond the task minimum, in bytes",
                WORKER_HOST,
            )?,
            miner_worker_ram_tasks: gauge_vec(
                r,
                "miner_worker_ram_tasks",
                "Minimum RAM claimed by running tasks, in bytes",
                WORKER_HOST,
            )?,
            miner_worker_vmem_total: gauge_vec(
                r,
                "miner_worker_vmem_total",
                "Worker physical RAM plus swap in bytes",
                WORKER_HOST,
            )?,
            miner_worker_vmem_reserved: gauge_vec(
                r,
                "miner_worker_vmem_reserved",
                "Worker virtual memory in use beyond the task maximum, in bytes",
                WORKER_HOST,
            )?,
            miner_worker_vmem_tasks: gauge_vec(
                r,
                "miner_worker_vmem_tasks",
                "Maximum memory claimed by running tasks, in bytes",
                WORKER_HOST,
            )?,
            miner_worker_cpu_used: gauge_vec(
                r,
                "miner_worker_cpu_used",
                "Number of worker CPUs used by running tasks",
                WORKER_HOST,
            )?,
            miner_worker_gpu_used: gauge_vec(
                r,
                "miner_worker_gpu_used",
                "Worker GPU in use by running tasks (1=used, 0=idle)",
                WORKER_HOST,
            )?,
            miner_worker_jobs: gauge_vec(
                r,
                "miner_worker_jobs",
                "Number of jobs assigned to the worker by task type",
                &["miner_id", "worker_host", "task"],
            )?,
            up: gauge(
                r,
                "up",
                "Whether the last collection pass completed (1=up, 0=down)",
            )?,
            scrape_duration_seconds: gauge(
                r,
                "scrape_duration_seconds",
                "Duration of the last collection pass in seconds",
            )?,
            scrape_group_up: gauge_vec(
                r,
                "scrape_group_up",
                "Whether a data group was collected in the last pass (1=collected, 0=missing)",
                &["group"],
            )?,
            registry: Arc::new(registry),
        })
    }

    /// Replace all samples with those derived from `snapshot`
    pub fn record(&self, snapshot: &Snapshot) {
        self.reset();

        let miner_id = snapshot.miner_id.as_str();

        self.local_time.set(snapshot.local_time as f64);
        self.chain_height
            .with_label_values(&[miner_id])
            .set(snapshot.chain_height as f64);
        self.chain_basefee
            .with_label_values(&[miner_id])
            .set(snapshot.chain_base_fee as f64);

        if let Some(daemon) = snapshot.daemon.get() {
            self.info
                .with_label_values(&[miner_id, &daemon.version, &daemon.network])
                .set(daemon.network_version as f64);
        }

        if let Some(syncs) = snapshot.sync.get() {
            for sync in syncs {
                let labels = [miner_id, sync.worker.as_str()];
                self.chain_sync_diff
                    .with_label_values(&labels)
                    .set(sync.height_delta as f64);
                self.chain_sync_status
                    .with_label_values(&labels)
                    .set(sync.stage as f64);
            }
        }

        if let Some(mpool) = snapshot.mpool.get() {
            self.mpool_total
                .with_label_values(&[miner_id])
                .set(mpool.total as f64);
        }

        if let Some(local) = snapshot.mpool.get().and_then(|mpool| mpool.local.as_ref()) {
            self.mpool_local_total
                .with_label_values(&[miner_id])
                .set(local.len() as f64);

            for message in local {
                let nonce = message.nonce.to_string();
                let gas_limit = message.gas_limit.to_string();
                let method = message.method.to_string();
                self.mpool_local_message
                    .with_label_values(&[
                        miner_id,
                        &message.from,
                        &message.to,
                        &nonce,
                        &message.value,
                        &gas_limit,
                        &message.gas_fee_cap,
                        &message.gas_premium,
                        &method,
                        &message.method_name,
                        &message.to_actor_type,
                    ])
                    .set(1.0);
            }
        }

        if let Some(power) = snapshot.power.get() {
            let samples = [
                ("miner", "RawBytePower", power.miner_raw),
                ("miner", "QualityAdjPower", power.miner_quality_adjusted),
                ("network", "RawBytePower", power.network_raw),
                ("network", "QualityAdjPower", power.network_quality_adjusted),
            ];
            for (scope, power_type, value) in samples {
                self.power
                    .with_label_values(&[miner_id, scope, power_type])
                    .set(value as f64);
            }
        }

        if let Some(eligible) = snapshot.eligibility.get() {
            self.power_mining_eligibility
                .with_label_values(&[miner_id])
                .set(eligibility_flag(*eligible) as f64);
        }

        if let Some(wallets) = snapshot.wallets.get() {
            for wallet in wallets {
                self.wallet_balance
                    .with_label_values(&[miner_id, &wallet.address, &wallet.name])
                    .set(wallet.balance_fil as f64);
            }
        }

        if let Some(locked) = snapshot.locked_funds.get() {
            for bucket in &locked.buckets {
                self.wallet_locked_balance
                    .with_label_values(&[miner_id, miner_id, bucket.kind.label()])
                    .set(bucket.balance_fil);
            }
        }

        if let Some(provider) = snapshot.provider.get() {
            let version = snapshot
                .miner_version
                .get()
                .map_or(UNKNOWN_VERSION, String::as_str);
            let (control0, control0_addr) = provider
                .control0
                .as_ref()
                .map_or(("", ""), |c| (c.id.as_str(), c.address.as_str()));

            self.miner_info
                .with_label_values(&[
                    miner_id,
                    version,
                    &provider.owner.id,
                    &provider.owner.address,
                    &provider.worker.id,
                    &provider.worker.address,
                    control0,
                    control0_addr,
                ])
                .set(1.0);
            self.miner_info_sector_size
                .with_label_values(&[miner_id])
                .set(provider.sector_size as f64);
        }

        if let Some(workers) = snapshot.workers.get() {
            for worker in workers {
                let labels = [miner_id, worker.host.as_str()];
                self.miner_worker_cpu
                    .with_label_values(&labels)
                    .set(worker.cpus as f64);
                self.miner_worker_gpu
                    .with_label_values(&labels)
                    .set(worker.gpus as f64);
                self.miner_worker_ram_total
                    .with_label_values(&labels)
                    .set(worker.ram_total as f64);
                self.miner_worker_ram_reserved
                    .with_label_values(&labels)
                    .set(worker.ram_reserved as f64);
                self.miner_worker_ram_tasks
                    .with_label_values(&labels)
                    .set(worker.ram_tasks as f64);
                self.miner_worker_vmem_total
                    .with_label_values(&labels)
                    .set(worker.vmem_total as f64);
                self.miner_worker_vmem_reserved
                    .with_label_values(&labels)
                    .set(worker.vmem_reserved as f64);
                self.miner_worker_vmem_tasks
                    .with_label_values(&labels)
                    .set(worker.vmem_tasks as f64);
                self.miner_worker_cpu_used
                    .with_label_values(&labels)
                    .set(worker.cpu_used as f64);
                self.miner_worker_gpu_used
                    .with_label_values(&labels)
                    .set(worker.gpu_used as f64);
            }
        }

        if let Some(jobs) = snapshot.worker_jobs.get() {
            for job in jobs {
                self.miner_worker_jobs
                    .with_label_values(&[miner_id, &job.host, &job.task])
                    .set(job.count as f64);
            }
        }

        for (group, collected) in snapshot.group_status() {
            self.scrape_group_up
                .with_label_values(&[group])
                .set(if collected { 1.0 } else { 0.0 });
        }
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Drop every labelled sample. Exporter-level gauges keep their values.
    pub fn reset(&self) {
        self.info.reset();
        self.local_time.set(0.0);
        self.chain_height.reset();
        self.chain_basefee.reset();
        self.chain_sync_diff.reset();
        self.chain_sync_status.reset();
        self.mpool_total.reset();
        self.mpool_local_total.reset();
        self.mpool_local_message.reset();
        self.power.reset();
        self.power_mining_eligibility.reset();
        self.wallet_balance.reset();
        self.wallet_locked_balance.reset();
        self.miner_info.reset();
        self.miner_info_sector_size.reset();
        self.miner_worker_cpu.reset();
        self.miner_worker_gpu.reset();
        self.miner_worker_ram_total.reset();
        self.miner_worker_ram_reserved.reset();
        self.miner_worker_ram_tasks.reset();
        self.miner_worker_vmem_total.reset();
        self.miner_worker_vmem_reserved.reset();
        self.miner_worker_vmem_tasks.reset();
        self.miner_worker_cpu_used.reset();
        self.miner_worker_gpu_used.reset();
        self.miner_worker_jobs.reset();
        self.scrape_group_up.reset();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics collector")
    }
}
