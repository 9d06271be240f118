//! Escalating-kill protocol driven against a scripted process table. Paused
//! tokio time makes the bounded waits run instantly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use die_core::kill::{ProcessOps, TerminationEngine};
use die_core::state::Shared;
use die_core::types::{ActionJob, ActionKind, KillError, Outcome};

const MY_PID: u32 = 9999;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Call {
    Term(u32),
    Force(u32),
}

#[derive(Default)]
struct FakeProc {
    alive: bool,
    dies_on_term: bool,
    dies_on_force: bool,
    term_error: Option<KillError>,
    force_error: Option<KillError>,
}

/// Scripted stand-in for the OS process table.
#[derive(Default)]
struct FakeOps {
    procs: HashMap<u32, FakeProc>,
    children: HashMap<u32, Vec<u32>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeOps {
    fn with_proc(mut self, pid: u32, p: FakeProc) -> Self {
        self.procs.insert(pid, p);
        self
    }

    fn with_children(mut self, pid: u32, kids: &[u32]) -> Self {
        self.children.insert(pid, kids.to_vec());
        self
    }

    fn call_log(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }
}

fn doomed() -> FakeProc {
    FakeProc {
        alive: true,
        dies_on_term: true,
        ..Default::default()
    }
}

fn stubborn() -> FakeProc {
    FakeProc {
        alive: true,
        dies_on_force: true,
        ..Default::default()
    }
}

fn protected() -> FakeProc {
    FakeProc {
        alive: true,
        ..Default::default()
    }
}

fn denied() -> FakeProc {
    FakeProc {
        alive: true,
        term_error: Some(KillError::AccessDenied),
        force_error: Some(KillError::AccessDenied),
        ..Default::default()
    }
}

impl ProcessOps for FakeOps {
    fn refresh(&mut self) {}

    fn alive(&mut self, pid: u32) -> bool {
        self.procs.get(&pid).map(|p| p.alive).unwrap_or(false)
    }

    fn terminate(&mut self, pid: u32) -> Result<(), KillError> {
        self.calls.lock().unwrap().push(Call::Term(pid));
        let Some(p) = self.procs.get_mut(&pid) else {
            return Err(KillError::Gone);
        };
        if !p.alive {
            return Err(KillError::Gone);
        }
        if let Some(e) = p.term_error.clone() {
            return Err(e);
        }
        if p.dies_on_term {
            p.alive = false;
        }
        Ok(())
    }

    fn force_kill(&mut self, pid: u32) -> Result<(), KillError> {
        self.calls.lock().unwrap().push(Call::Force(pid));
        let Some(p) = self.procs.get_mut(&pid) else {
            return Err(KillError::Gone);
        };
        if !p.alive {
            return Err(KillError::Gone);
        }
        if let Some(e) = p.force_error.clone() {
            return Err(e);
        }
        if p.dies_on_force {
            p.alive = false;
        }
        Ok(())
    }

    fn descendants(&mut self, pid: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut queue = vec![pid];
        while let Some(next) = queue.pop() {
            for &kid in self.children.get(&next).into_iter().flatten() {
                out.push(kid);
                queue.push(kid);
            }
        }
        out
    }
}

fn job(kind: ActionKind, pid: u32, name: &str) -> ActionJob {
    ActionJob {
        kind,
        pid,
        name: name.into(),
    }
}

#[tokio::test(start_paused = true)]
async fn killing_a_missing_pid_is_success() {
    let ops = FakeOps::default();
    let mut engine = TerminationEngine::new(ops, MY_PID);
    let j = job(ActionKind::Kill, 42, "ghost.exe");
    let outcome = engine.execute(&j).await;
    assert_eq!(outcome, Outcome::Killed);
    assert_eq!(outcome.status_line(&j), "KILLED 42 ghost.exe");
}

#[tokio::test(start_paused = true)]
async fn killing_own_pid_is_refused_before_any_signal() {
    let ops = FakeOps::default().with_proc(MY_PID, protected());
    let calls = ops.call_log();
    let mut engine = TerminationEngine::new(ops, MY_PID);
    let j = job(ActionKind::Kill, MY_PID, "die");
    let outcome = engine.execute(&j).await;
    assert_eq!(outcome, Outcome::SelfProtected);
    assert_eq!(outcome.status_line(&j), format!("NOPE: won't kill myself ({MY_PID})"));
    assert!(calls.lock().unwrap().is_empty(), "no signal may be issued");
}

#[tokio::test(start_paused = true)]
async fn graceful_exit_reports_killed() {
    let ops = FakeOps::default().with_proc(7, doomed());
    let calls = ops.call_log();
    let mut engine = TerminationEngine::new(ops, MY_PID);
    let outcome = engine.execute(&job(ActionKind::Kill, 7, "nice.exe")).await;
    assert_eq!(outcome, Outcome::Killed);
    assert_eq!(*calls.lock().unwrap(), vec![Call::Term(7)]);
}

#[tokio::test(start_paused = true)]
async fn survivor_of_soft_signal_gets_force_killed() {
    let ops = FakeOps::default().with_proc(7, stubborn());
    let calls = ops.call_log();
    let mut engine = TerminationEngine::new(ops, MY_PID);
    let outcome = engine.execute(&job(ActionKind::Kill, 7, "tough.exe")).await;
    assert_eq!(outcome, Outcome::Killed);
    assert_eq!(*calls.lock().unwrap(), vec![Call::Term(7), Call::Force(7)]);
}

#[tokio::test(start_paused = true)]
async fn protected_process_classified_still_alive() {
    let ops = FakeOps::default().with_proc(7, protected());
    let mut engine = TerminationEngine::new(ops, MY_PID);
    let j = job(ActionKind::Kill, 7, "guard.exe");
    let outcome = engine.execute(&j).await;
    assert_eq!(outcome, Outcome::StillAlive);
    assert_eq!(
        outcome.status_line(&j),
        "STILL ALIVE 7 guard.exe (protected/respawn?)"
    );
}

#[tokio::test(start_paused = true)]
async fn access_denied_surfaces_as_failure() {
    let ops = FakeOps::default().with_proc(7, denied());
    let mut engine = TerminationEngine::new(ops, MY_PID);
    let j = job(ActionKind::Kill, 7, "root.exe");
    let outcome = engine.execute(&j).await;
    assert_eq!(outcome, Outcome::Failed(KillError::AccessDenied));
    assert_eq!(
        outcome.status_line(&j),
        "FAILED 7 root.exe (access denied)"
    );
}

#[tokio::test(start_paused = true)]
async fn tree_kills_children_before_the_root() {
    let ops = FakeOps::default()
        .with_proc(1000, doomed())
        .with_proc(1001, doomed())
        .with_proc(1002, doomed())
        .with_children(1000, &[1001, 1002]);
    let calls = ops.call_log();
    let mut engine = TerminationEngine::new(ops, MY_PID);
    let j = job(ActionKind::KillTree, 1000, "parent.exe");
    let outcome = engine.execute(&j).await;
    assert_eq!(outcome, Outcome::KilledTree(3));
    assert_eq!(outcome.status_line(&j), "KILLED TREE 1000 parent.exe (3 procs)");

    let calls = calls.lock().unwrap();
    let root_pos = calls.iter().position(|c| *c == Call::Term(1000)).unwrap();
    assert_eq!(root_pos, calls.len() - 1, "root must be signalled last");
}

#[tokio::test(start_paused = true)]
async fn tree_attempts_every_target_and_reports_first_error() {
    let ops = FakeOps::default()
        .with_proc(1000, doomed())
        .with_proc(1001, denied())
        .with_proc(1002, doomed())
        .with_children(1000, &[1001, 1002]);
    let calls = ops.call_log();
    let mut engine = TerminationEngine::new(ops, MY_PID);
    let j = job(ActionKind::KillTree, 1000, "parent.exe");
    let outcome = engine.execute(&j).await;
    assert_eq!(outcome, Outcome::Failed(KillError::AccessDenied));
    assert_eq!(
        outcome.status_line(&j),
        "FAILED TREE 1000 parent.exe (access denied)"
    );

    // The failing child did not stop the sweep: all three were attempted.
    let calls = calls.lock().unwrap();
    for pid in [1000, 1001, 1002] {
        assert!(calls.iter().any(|c| *c == Call::Term(pid)), "missed {pid}");
    }
}

#[tokio::test(start_paused = true)]
async fn tree_with_still_alive_child_reports_it() {
    let ops = FakeOps::default()
        .with_proc(1000, doomed())
        .with_proc(1001, protected())
        .with_children(1000, &[1001]);
    let mut engine = TerminationEngine::new(ops, MY_PID);
    let outcome = engine
        .execute(&job(ActionKind::KillTree, 1000, "parent.exe"))
        .await;
    assert_eq!(outcome, Outcome::Failed(KillError::StillAlive));
}

#[tokio::test(start_paused = true)]
async fn worker_turns_a_job_into_a_status_line() {
    let shared = Arc::new(Shared::new());
    shared
        .queue_action(job(ActionKind::Kill, 10, "a.exe"))
        .await;
    let engine = TerminationEngine::new(FakeOps::default(), MY_PID);
    let handle = tokio::spawn(engine.run(Arc::clone(&shared)));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let frame = shared.build_frame(5).await;
    assert_eq!(frame.status, "KILLED 10 a.exe");

    shared.shutdown();
    let _ = handle.await;
}

#[tokio::test(start_paused = true)]
async fn tree_never_targets_our_own_pid() {
    let ops = FakeOps::default()
        .with_proc(1000, doomed())
        .with_proc(MY_PID, protected())
        .with_children(1000, &[MY_PID]);
    let calls = ops.call_log();
    let mut engine = TerminationEngine::new(ops, MY_PID);
    let outcome = engine
        .execute(&job(ActionKind::KillTree, 1000, "parent.exe"))
        .await;
    // Only the root is counted and signalled.
    assert_eq!(outcome, Outcome::KilledTree(1));
    assert_eq!(*calls.lock().unwrap(), vec![Call::Term(1000)]);
}
