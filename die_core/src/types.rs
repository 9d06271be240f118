//! Data types shared by the sampling, termination, and render loops.

use thiserror::Error;

/// One process at one sampling instant. Rebuilt every cycle; a pid is not a
/// stable identity across snapshots (the OS may reuse it).
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRow {
    pub pid: u32,
    pub name: String,
    /// Resolved owner. Never empty: resolution falls back to a sentinel.
    pub user: String,
    /// Normalized by logical core count, clamped to 0..=100.
    pub cpu_percent: f32,
    /// Resident memory in MiB.
    pub mem_mb: u64,
}

/// System-wide aggregates sampled alongside the process table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemStats {
    pub cpu_percent: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
    pub mem_percent: f32,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
    pub disk_percent: f32,
    /// Bytes per second since the previous cycle.
    pub net_up_bps: f64,
    pub net_down_bps: f64,
    pub uptime_secs: u64,
}

/// Immutable capture of one sampling cycle. The shared view holds at most one
/// snapshot; publishing a new one discards the previous.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Sorted by CPU percent descending, ties stable.
    pub rows: Vec<ProcessRow>,
    pub stats: SystemStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Kill,
    KillTree,
}

/// A kill request enqueued by the input handler and consumed exactly once by
/// the termination worker. Duplicates are not deduplicated; killing an
/// already-dead process is a no-op success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionJob {
    pub kind: ActionKind,
    pub pid: u32,
    pub name: String,
}

/// Feedback tokens played asynchronously by the beep worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeepPattern {
    Short,
    ShortTriplet,
    Long,
}

/// Classification of failures seen while signalling a process. `Gone` is the
/// expected process-vanished race and counts as success wherever the process
/// was a kill target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KillError {
    #[error("process not found")]
    Gone,
    #[error("access denied")]
    AccessDenied,
    #[error("still alive")]
    StillAlive,
    #[error("{0}")]
    Os(String),
}

/// Terminal result of one action job. Never surfaced as an error: the worker
/// renders it into the status line.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Killed,
    KilledTree(usize),
    StillAlive,
    SelfProtected,
    Failed(KillError),
}

impl Outcome {
    /// Human-readable status line for the footer.
    pub fn status_line(&self, job: &ActionJob) -> String {
        match self {
            Outcome::Killed => format!("KILLED {} {}", job.pid, job.name),
            Outcome::KilledTree(n) => {
                format!("KILLED TREE {} {} ({n} procs)", job.pid, job.name)
            }
            Outcome::StillAlive => {
                format!("STILL ALIVE {} {} (protected/respawn?)", job.pid, job.name)
            }
            Outcome::SelfProtected => format!("NOPE: won't kill myself ({})", job.pid),
            Outcome::Failed(e) => match job.kind {
                ActionKind::Kill => format!("FAILED {} {} ({e})", job.pid, job.name),
                ActionKind::KillTree => format!("FAILED TREE {} {} ({e})", job.pid, job.name),
            },
        }
    }
}
