//! Shared view state: the single integration point between the sampling loop,
//! the termination worker, and the render loop. One lock guards every field;
//! critical sections are plain field copies and never span an OS call or a
//! sleep.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::sleep;

use crate::types::{ActionJob, BeepPattern, ProcessRow, Snapshot};
use crate::view;

/// Everything the render loop needs for one frame, plus the queues the other
/// loops drain. Touched only through [`Shared`].
#[derive(Debug)]
pub struct ViewState {
    pub snapshot: Arc<Snapshot>,
    pub filter_text: String,
    pub filter_mode: bool,
    pub filter_input: String,
    pub selected_pid: Option<u32>,
    pub scroll: usize,
    pub status: String,
    pub actions: VecDeque<ActionJob>,
    pub beeps: VecDeque<BeepPattern>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(Snapshot::default()),
            filter_text: String::new(),
            filter_mode: false,
            filter_input: String::new(),
            selected_pid: None,
            scroll: 0,
            status: "READY".into(),
            actions: VecDeque::new(),
            beeps: VecDeque::new(),
        }
    }
}

/// Lock-protected view state plus the wake signals that keep the loops from
/// busy-spinning. Created once at startup, shared by `Arc`.
pub struct Shared {
    view: Mutex<ViewState>,
    running: AtomicBool,
    ui_wake: Notify,
    sampler_wake: Notify,
    action_wake: Notify,
    beep_wake: Notify,
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}

impl Shared {
    pub fn new() -> Self {
        Self {
            view: Mutex::new(ViewState::default()),
            running: AtomicBool::new(true),
            ui_wake: Notify::new(),
            sampler_wake: Notify::new(),
            action_wake: Notify::new(),
            beep_wake: Notify::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Cooperative shutdown: clear the flag and wake every sleeper so the
    /// loops observe it at their next iteration boundary.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
        self.ui_wake.notify_waiters();
        self.sampler_wake.notify_waiters();
        self.action_wake.notify_waiters();
        self.beep_wake.notify_waiters();
    }

    /// Replace the current snapshot. If nothing is selected yet, the top row
    /// (highest CPU) becomes the selection.
    pub async fn publish_snapshot(&self, snapshot: Snapshot) {
        {
            let mut v = self.view.lock().await;
            v.snapshot = Arc::new(snapshot);
            if v.selected_pid.is_none() {
                v.selected_pid = v.snapshot.rows.first().map(|r| r.pid);
            }
        }
        self.ui_wake.notify_one();
    }

    pub async fn set_status(&self, status: impl Into<String>) {
        self.view.lock().await.status = status.into();
        self.ui_wake.notify_one();
    }

    pub async fn select_pid(&self, pid: u32) {
        self.view.lock().await.selected_pid = Some(pid);
        self.ui_wake.notify_one();
    }

    // --- action + beep queues (FIFO, append under lock, pop under lock) ---

    pub async fn queue_action(&self, job: ActionJob) {
        self.view.lock().await.actions.push_back(job);
        self.action_wake.notify_one();
    }

    pub async fn pop_action(&self) -> Option<ActionJob> {
        self.view.lock().await.actions.pop_front()
    }

    pub async fn queue_beep(&self, pattern: BeepPattern) {
        self.view.lock().await.beeps.push_back(pattern);
        self.beep_wake.notify_one();
    }

    pub async fn pop_beep(&self) -> Option<BeepPattern> {
        self.view.lock().await.beeps.pop_front()
    }

    // --- filter editing (mirrors the input handler's state machine) ---

    pub async fn enter_filter_mode(&self) {
        let mut v = self.view.lock().await;
        v.filter_mode = true;
        v.filter_input = v.filter_text.clone();
        drop(v);
        self.ui_wake.notify_one();
    }

    pub async fn cancel_filter(&self) {
        let mut v = self.view.lock().await;
        v.filter_mode = false;
        v.filter_input.clear();
        v.status = "FILTER CANCELED".into();
        drop(v);
        self.ui_wake.notify_one();
    }

    pub async fn commit_filter(&self) {
        let mut v = self.view.lock().await;
        v.filter_text = v.filter_input.clone();
        v.filter_mode = false;
        v.status = if v.filter_text.is_empty() {
            "FILTER CLEARED".into()
        } else {
            format!("FILTER ON: {}", v.filter_text)
        };
        drop(v);
        self.ui_wake.notify_one();
    }

    pub async fn filter_push(&self, c: char) {
        self.view.lock().await.filter_input.push(c);
        self.ui_wake.notify_one();
    }

    pub async fn filter_backspace(&self) {
        self.view.lock().await.filter_input.pop();
        self.ui_wake.notify_one();
    }

    pub async fn filter_clear_input(&self) {
        self.view.lock().await.filter_input.clear();
        self.ui_wake.notify_one();
    }

    /// Drop an active filter (normal-mode Escape). No-op when none is set.
    pub async fn clear_filter(&self) {
        let mut v = self.view.lock().await;
        if v.filter_text.is_empty() {
            return;
        }
        v.filter_text.clear();
        v.filter_input.clear();
        v.status = "FILTER CLEARED".into();
        drop(v);
        self.ui_wake.notify_one();
    }

    // --- wake signals ---

    /// Ask the sampling loop to cut its sleep short and start a new cycle.
    pub fn request_refresh(&self) {
        self.sampler_wake.notify_one();
    }

    pub fn wake_ui(&self) {
        self.ui_wake.notify_one();
    }

    /// Bounded waits: true when woken by the signal, false on timeout. The
    /// signal is consumed by waking, so a loop never double-sleeps on it.
    pub async fn wait_ui(&self, timeout: Duration) -> bool {
        wait_signal(&self.ui_wake, timeout).await
    }

    pub async fn wait_refresh(&self, timeout: Duration) -> bool {
        wait_signal(&self.sampler_wake, timeout).await
    }

    pub async fn wait_action(&self, timeout: Duration) -> bool {
        wait_signal(&self.action_wake, timeout).await
    }

    pub async fn wait_beep(&self, timeout: Duration) -> bool {
        wait_signal(&self.beep_wake, timeout).await
    }

    /// Derive the frame for one repaint: copy the relevant fields, apply the
    /// filter/selection/scroll rules, and write the corrected selection and
    /// scroll back so every viewer of the shared state stays consistent.
    pub async fn build_frame(&self, page: usize) -> ViewFrame {
        let mut v = self.view.lock().await;
        let d = view::derive(
            &v.snapshot.rows,
            &v.filter_text,
            v.selected_pid,
            v.scroll,
            page,
        );
        v.selected_pid = d.selected_pid;
        v.scroll = d.scroll;
        ViewFrame {
            snapshot: Arc::clone(&v.snapshot),
            filtered: d.filtered,
            selected: d.selected,
            scroll: d.scroll,
            page,
            filter_text: v.filter_text.clone(),
            filter_mode: v.filter_mode,
            filter_input: v.filter_input.clone(),
            status: v.status.clone(),
        }
    }
}

async fn wait_signal(signal: &Notify, timeout: Duration) -> bool {
    tokio::select! {
        _ = signal.notified() => true,
        _ = sleep(timeout) => false,
    }
}

/// Read-only snapshot of what should be on screen: enough to render a frame
/// without touching the lock again.
#[derive(Debug, Clone)]
pub struct ViewFrame {
    pub snapshot: Arc<Snapshot>,
    /// Indices into `snapshot.rows` after filtering, in display order.
    pub filtered: Vec<usize>,
    /// Position of the selection inside `filtered`.
    pub selected: Option<usize>,
    pub scroll: usize,
    pub page: usize,
    pub filter_text: String,
    pub filter_mode: bool,
    pub filter_input: String,
    pub status: String,
}

impl ViewFrame {
    /// Rows inside the visible page, in display order.
    pub fn visible(&self) -> impl Iterator<Item = &ProcessRow> + '_ {
        self.filtered
            .iter()
            .skip(self.scroll)
            .take(self.page)
            .map(move |&i| &self.snapshot.rows[i])
    }

    pub fn selected_row(&self) -> Option<&ProcessRow> {
        let idx = self.selected?;
        self.filtered.get(idx).map(|&i| &self.snapshot.rows[i])
    }
}
