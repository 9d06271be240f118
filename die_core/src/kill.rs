//! Escalating termination: soft signal, bounded wait, forceful kill, bounded
//! wait, liveness verdict. A single worker drains the action queue so jobs
//! execute sequentially, never concurrently with each other.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::state::Shared;
use crate::types::{ActionJob, ActionKind, KillError, Outcome};

/// Grace period after the soft signal.
const SOFT_WAIT: Duration = Duration::from_millis(300);
/// Grace period after the forceful signal.
const HARD_WAIT: Duration = Duration::from_millis(500);
/// Liveness poll step inside the bounded waits.
const WAIT_STEP: Duration = Duration::from_millis(50);
/// Fallback queue poll when no wake signal arrives.
const IDLE_WAIT: Duration = Duration::from_millis(250);

/// The OS surface the protocol drives. The engine is generic over this seam
/// so the escalation sequence can be exercised against a scripted table.
pub trait ProcessOps: Send {
    /// Re-read the process table (used before descendant enumeration).
    fn refresh(&mut self);
    fn alive(&mut self, pid: u32) -> bool;
    /// Ask the process to exit. `Err(KillError::Gone)` when it does not exist.
    fn terminate(&mut self, pid: u32) -> Result<(), KillError>;
    /// Force-kill the process. Same error contract as `terminate`.
    fn force_kill(&mut self, pid: u32) -> Result<(), KillError>;
    /// Transitive children of `pid`, children before grandchildren.
    fn descendants(&mut self, pid: u32) -> Vec<u32>;
}

/// sysinfo-backed implementation.
pub struct SysProcessOps {
    sys: System,
}

impl Default for SysProcessOps {
    fn default() -> Self {
        Self::new()
    }
}

impl SysProcessOps {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    fn refresh_pid(&mut self, pid: u32) {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[Pid::from_u32(pid)]),
            true,
            ProcessRefreshKind::nothing(),
        );
    }

    fn signal(&mut self, pid: u32, soft: bool) -> Result<(), KillError> {
        self.refresh_pid(pid);
        let Some(proc_) = self.sys.process(Pid::from_u32(pid)) else {
            return Err(KillError::Gone);
        };
        let sent = if soft {
            match proc_.kill_with(Signal::Term) {
                Some(sent) => sent,
                // No soft signal on this platform: the forceful one is the
                // nearest equivalent.
                None => proc_.kill(),
            }
        } else {
            proc_.kill()
        };
        if sent {
            return Ok(());
        }
        // Refused: either the process vanished underneath us or we lack the
        // rights to signal it.
        self.refresh_pid(pid);
        if self.sys.process(Pid::from_u32(pid)).is_none() {
            Err(KillError::Gone)
        } else {
            Err(KillError::AccessDenied)
        }
    }
}

impl ProcessOps for SysProcessOps {
    fn refresh(&mut self) {
        self.sys
            .refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::nothing());
    }

    fn alive(&mut self, pid: u32) -> bool {
        self.refresh_pid(pid);
        self.sys.process(Pid::from_u32(pid)).is_some()
    }

    fn terminate(&mut self, pid: u32) -> Result<(), KillError> {
        self.signal(pid, true)
    }

    fn force_kill(&mut self, pid: u32) -> Result<(), KillError> {
        self.signal(pid, false)
    }

    fn descendants(&mut self, pid: u32) -> Vec<u32> {
        self.refresh();
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for (child, proc_) in self.sys.processes() {
            if let Some(parent) = proc_.parent() {
                children.entry(parent.as_u32()).or_default().push(child.as_u32());
            }
        }
        // Breadth-first walk; the visited set guards against parent loops in
        // a table read mid-churn.
        let mut out = Vec::new();
        let mut seen = HashSet::from([pid]);
        let mut queue = VecDeque::from([pid]);
        while let Some(next) = queue.pop_front() {
            for &kid in children.get(&next).into_iter().flatten() {
                if seen.insert(kid) {
                    out.push(kid);
                    queue.push_back(kid);
                }
            }
        }
        out
    }
}

/// Per-target conclusion of the escalation sequence.
enum Conclusion {
    Exited,
    StillAlive,
    Failed(KillError),
}

impl Conclusion {
    fn problem(&self) -> Option<KillError> {
        match self {
            Conclusion::Exited => None,
            Conclusion::StillAlive => Some(KillError::StillAlive),
            Conclusion::Failed(e) => Some(e.clone()),
        }
    }
}

/// Drive one target through the full escalation. "Does not exist" at any
/// step is success; any other error is recorded as the first seen while the
/// remaining steps still run best-effort.
async fn escalate<P: ProcessOps>(ops: &mut P, pid: u32) -> Conclusion {
    let mut first_err: Option<KillError> = None;

    match ops.terminate(pid) {
        Ok(()) => {}
        Err(KillError::Gone) => return Conclusion::Exited,
        Err(e) => first_err = Some(e),
    }
    if wait_for_exit(ops, pid, SOFT_WAIT).await {
        return Conclusion::Exited;
    }

    match ops.force_kill(pid) {
        Ok(()) => {}
        Err(KillError::Gone) => return Conclusion::Exited,
        Err(e) => {
            first_err.get_or_insert(e);
        }
    }
    if wait_for_exit(ops, pid, HARD_WAIT).await {
        return Conclusion::Exited;
    }

    if !ops.alive(pid) {
        return Conclusion::Exited;
    }
    match first_err {
        Some(e) => Conclusion::Failed(e),
        None => Conclusion::StillAlive,
    }
}

async fn wait_for_exit<P: ProcessOps>(ops: &mut P, pid: u32, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        if !ops.alive(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(WAIT_STEP).await;
    }
}

/// Consumes action jobs and resolves each into a terminal outcome. Never
/// propagates an error outward; every job ends in a status line.
pub struct TerminationEngine<P: ProcessOps> {
    ops: P,
    own_pid: u32,
}

impl<P: ProcessOps> TerminationEngine<P> {
    pub fn new(ops: P, own_pid: u32) -> Self {
        Self { ops, own_pid }
    }

    pub async fn execute(&mut self, job: &ActionJob) -> Outcome {
        if job.pid == self.own_pid {
            return Outcome::SelfProtected;
        }
        match job.kind {
            ActionKind::Kill => match escalate(&mut self.ops, job.pid).await {
                Conclusion::Exited => Outcome::Killed,
                Conclusion::StillAlive => Outcome::StillAlive,
                Conclusion::Failed(e) => Outcome::Failed(e),
            },
            ActionKind::KillTree => self.kill_tree(job.pid).await,
        }
    }

    /// Children first, root last. A child failure never aborts the sweep;
    /// the first problem across the whole set decides the report.
    async fn kill_tree(&mut self, pid: u32) -> Outcome {
        let mut targets = self.ops.descendants(pid);
        targets.retain(|&p| p != self.own_pid);
        let total = targets.len() + 1;

        let mut first_err: Option<KillError> = None;
        for child in targets {
            if let Some(e) = escalate(&mut self.ops, child).await.problem() {
                first_err.get_or_insert(e);
            }
        }
        if let Some(e) = escalate(&mut self.ops, pid).await.problem() {
            first_err.get_or_insert(e);
        }

        match first_err {
            None => Outcome::KilledTree(total),
            Some(e) => Outcome::Failed(e),
        }
    }

    /// Drain jobs until shutdown, one at a time.
    pub async fn run(mut self, shared: Arc<Shared>) {
        while shared.is_running() {
            match shared.pop_action().await {
                Some(job) => {
                    debug!(pid = job.pid, kind = ?job.kind, "action job");
                    let outcome = self.execute(&job).await;
                    shared.set_status(outcome.status_line(&job)).await;
                }
                None => {
                    shared.wait_action(IDLE_WAIT).await;
                }
            }
        }
    }
}
