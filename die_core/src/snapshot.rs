//! Periodic snapshot collection: process enumeration, CPU/memory attribution,
//! owner resolution, and system aggregates. One snapshot per cycle, published
//! into the shared view.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, Networks, ProcessRefreshKind, ProcessesToUpdate,
    RefreshKind, System, Users,
};
use tracing::debug;

use crate::resolve::{self, UserResolver};
use crate::state::Shared;
use crate::types::{ProcessRow, Snapshot, SystemStats};

/// Target sampling cadence. The loop self-paces: work time + sleep == interval.
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(1);

/// Floor for the elapsed window in rate computation, so a manual refresh right
/// after a cycle cannot produce a division spike.
const MIN_RATE_WINDOW: f64 = 0.1;

const MIB: u64 = 1024 * 1024;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

pub struct Collector {
    sys: System,
    networks: Networks,
    disks: Disks,
    users: Users,
    resolver: UserResolver,
    cores: usize,
    last_net: Option<(u64, u64, Instant)>,
    interval: Duration,
}

impl Collector {
    /// Builds the sysinfo handles and primes the CPU counters; the first
    /// cycle after this establishes baselines only, not meaningful rates.
    pub fn new(interval: Duration) -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        let cores = sys.cpus().len().max(1);
        Self {
            sys,
            networks: Networks::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
            users: Users::new_with_refreshed_list(),
            resolver: UserResolver::new(),
            cores,
            last_net: None,
            interval,
        }
    }

    /// Drive the sampling loop until the running flag clears. A manual
    /// refresh request cuts the sleep short and starts the next cycle
    /// immediately; the signal is consumed by waking, so there is no double
    /// sleep.
    pub async fn run(mut self, shared: Arc<Shared>) {
        while shared.is_running() {
            let started = Instant::now();
            let snapshot = self.collect().await;
            shared.publish_snapshot(snapshot).await;
            let elapsed = started.elapsed();
            debug!(?elapsed, "snapshot cycle");
            shared
                .wait_refresh(self.interval.saturating_sub(elapsed))
                .await;
        }
    }

    /// One full cycle. Every OS read in here tolerates processes vanishing
    /// mid-enumeration; a cycle that sees nothing readable still yields an
    /// (empty) snapshot for the next cycle to improve on.
    async fn collect(&mut self) -> Snapshot {
        let mut rows = self.collect_rows();
        self.enrich_owners(&mut rows).await;
        rows.sort_by(|a, b| {
            b.cpu_percent
                .partial_cmp(&a.cpu_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let stats = self.collect_stats();
        Snapshot { rows, stats }
    }

    fn collect_rows(&mut self) -> Vec<ProcessRow> {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::everything().without_tasks(),
        );
        let mut rows = Vec::with_capacity(self.sys.processes().len());
        for proc_ in self.sys.processes().values() {
            let pid = proc_.pid().as_u32();
            let mut name = proc_.name().to_string_lossy().into_owned();
            if name.is_empty() {
                name = "?".into();
            }
            let cpu_percent = if pid == 0 {
                0.0
            } else {
                (proc_.cpu_usage() / self.cores as f32).clamp(0.0, 100.0)
            };
            let os_user = proc_
                .user_id()
                .and_then(|uid| self.users.get_user_by_id(uid))
                .map(|u| u.name().to_string());
            let user = self.resolver.resolve(pid, &name, os_user.as_deref(), || {
                resolve::proc_status_owner(pid, &self.users)
            });
            rows.push(ProcessRow {
                pid,
                name,
                user,
                cpu_percent,
                mem_mb: proc_.memory() / MIB,
            });
        }
        rows
    }

    /// Second-chance owner lookup for rows the fast tiers left UNKNOWN. The
    /// external dump is expensive, so it runs on its own rate limit; a
    /// TTL-fresh table is applied either way.
    async fn enrich_owners(&mut self, rows: &mut [ProcessRow]) {
        if !rows.iter().any(|r| r.user == resolve::UNKNOWN_USER) {
            return;
        }
        if self.resolver.bulk_due() {
            let map = resolve::fetch_owner_table().await;
            self.resolver.store_bulk(map);
        }
        self.resolver.apply_bulk(rows);
    }

    fn collect_stats(&mut self) -> SystemStats {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        let cpu_percent = self.sys.global_cpu_usage().clamp(0.0, 100.0);
        let mem_total = self.sys.total_memory();
        let mem_used = mem_total.saturating_sub(self.sys.available_memory());
        let mem_percent = if mem_total > 0 {
            (mem_used as f64 / mem_total as f64 * 100.0) as f32
        } else {
            0.0
        };

        self.disks.refresh(false);
        let (disk_used_gb, disk_total_gb, disk_percent) = system_volume(&self.disks);

        self.networks.refresh(false);
        let rx: u64 = self.networks.iter().map(|(_, d)| d.total_received()).sum();
        let tx: u64 = self
            .networks
            .iter()
            .map(|(_, d)| d.total_transmitted())
            .sum();
        let now = Instant::now();
        let (net_up_bps, net_down_bps) = match self.last_net {
            Some((prev_rx, prev_tx, at)) => {
                let dt = now.duration_since(at).as_secs_f64().max(MIN_RATE_WINDOW);
                (
                    tx.saturating_sub(prev_tx) as f64 / dt,
                    rx.saturating_sub(prev_rx) as f64 / dt,
                )
            }
            None => (0.0, 0.0),
        };
        self.last_net = Some((rx, tx, now));

        SystemStats {
            cpu_percent,
            mem_used_mb: mem_used / MIB,
            mem_total_mb: mem_total / MIB,
            mem_percent,
            disk_used_gb,
            disk_total_gb,
            disk_percent,
            net_up_bps,
            net_down_bps,
            uptime_secs: System::uptime(),
        }
    }
}

/// Usage of the volume the OS runs from: the disk mounted at the root path,
/// or the first listed disk when no root mount is present.
fn system_volume(disks: &Disks) -> (f64, f64, f32) {
    let root = std::path::Path::new(if cfg!(windows) { "C:\\" } else { "/" });
    let disk = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == root)
        .or_else(|| disks.list().first());
    match disk {
        Some(d) => {
            let total = d.total_space();
            let used = total.saturating_sub(d.available_space());
            let pct = if total > 0 {
                (used as f64 / total as f64 * 100.0) as f32
            } else {
                0.0
            };
            (used as f64 / GIB, total as f64 / GIB, pct)
        }
        None => (0.0, 0.0, 0.0),
    }
}
