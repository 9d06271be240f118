//! Audible feedback worker: drains the beep queue and rings the terminal
//! bell. Playback failures are ignored by contract.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use die_core::state::Shared;
use die_core::types::BeepPattern;
use tokio::time::sleep;

/// Fallback queue poll when no wake signal arrives.
const IDLE_WAIT: Duration = Duration::from_millis(250);

pub async fn run(shared: Arc<Shared>) {
    while shared.is_running() {
        match shared.pop_beep().await {
            Some(pattern) => play(pattern).await,
            None => {
                shared.wait_beep(IDLE_WAIT).await;
            }
        }
    }
}

async fn play(pattern: BeepPattern) {
    match pattern {
        BeepPattern::Short => bell(),
        BeepPattern::ShortTriplet => {
            for _ in 0..3 {
                bell();
                sleep(Duration::from_millis(30)).await;
            }
        }
        BeepPattern::Long => {
            bell();
            sleep(Duration::from_millis(120)).await;
            bell();
        }
    }
}

fn bell() {
    let mut out = std::io::stdout();
    let _ = out.write_all(b"\x07");
    let _ = out.flush();
}
