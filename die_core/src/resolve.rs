//! Tiered owner resolution: an ordered fallback chain over the fast lookups,
//! a pid-keyed cache that detects pid reuse, and an out-of-band bulk
//! process-table dump for owners the fast tiers cannot see.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use sysinfo::Users;
use tracing::warn;

use crate::types::ProcessRow;

/// Sentinel owner for processes no tier could resolve.
pub const UNKNOWN_USER: &str = "UNKNOWN";
/// Placeholder identity for well-known kernel/system processes.
pub const SYSTEM_USER: &str = "SYSTEM";

/// Minimum spacing between bulk dump invocations, independent of the sampling
/// cadence: the dump costs sub-second to seconds of wall time.
pub const BULK_MIN_INTERVAL: Duration = Duration::from_secs(10);
/// How long a fetched owner table stays applicable.
pub const BULK_TTL: Duration = Duration::from_secs(60);
/// Hard cap on the external dump's runtime.
pub const BULK_TIMEOUT: Duration = Duration::from_secs(2);

/// Pids that never belong to a login session.
const SYSTEM_PIDS: [u32; 2] = [0, 4];

static SYSTEM_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "system",
        "system idle process",
        "registry",
        "memory compression",
        "secure system",
        "kthreadd",
    ]
    .into_iter()
    .collect()
});

/// Owners of processes hosted by system services, keyed by image name.
static SERVICE_USERS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("smss.exe", SYSTEM_USER),
        ("csrss.exe", SYSTEM_USER),
        ("wininit.exe", SYSTEM_USER),
        ("services.exe", SYSTEM_USER),
        ("lsass.exe", SYSTEM_USER),
        ("svchost.exe", SYSTEM_USER),
        ("systemd-journald", "root"),
        ("systemd-udevd", "root"),
        ("systemd-logind", "root"),
        ("systemd-resolved", "systemd-resolve"),
        ("systemd-timesyncd", "systemd-timesync"),
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheEntry {
    name: String,
    user: String,
}

#[derive(Debug, Default)]
struct BulkState {
    map: HashMap<u32, String>,
    fetched_at: Option<Instant>,
    last_attempt: Option<Instant>,
}

/// Per-pid owner cache plus the bulk-dump state. Entries persist across
/// cycles and are invalidated only when the observed name for a pid stops
/// matching the cached one (pid reuse).
#[derive(Default)]
pub struct UserResolver {
    cache: HashMap<u32, CacheEntry>,
    bulk: BulkState,
}

impl UserResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the owner of `(pid, name)`. The tiers run in order and the
    /// first hit wins; the winner always refreshes the cache, so the newest
    /// successful resolution overwrites older ones. `privileged` is invoked
    /// lazily only when the cheaper tiers all miss.
    pub fn resolve(
        &mut self,
        pid: u32,
        name: &str,
        os_user: Option<&str>,
        privileged: impl FnOnce() -> Option<String>,
    ) -> String {
        let resolved = os_reported(os_user)
            .or_else(|| self.cached(pid, name))
            .or_else(|| service_map(name))
            .or_else(privileged)
            .or_else(|| well_known(pid, name));

        let user = resolved.unwrap_or_else(|| UNKNOWN_USER.to_string());
        self.cache.insert(
            pid,
            CacheEntry {
                name: name.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Cache tier: valid only while the cached name still matches. A stale
    /// UNKNOWN entry is treated as a miss so the later tiers get another try
    /// on every cycle.
    fn cached(&self, pid: u32, name: &str) -> Option<String> {
        let entry = self.cache.get(&pid)?;
        if entry.name != name || entry.user == UNKNOWN_USER {
            return None;
        }
        Some(entry.user.clone())
    }

    // --- bulk enrichment ---

    /// Whether the rate limit allows another dump invocation.
    pub fn bulk_due(&self) -> bool {
        match self.bulk.last_attempt {
            None => true,
            Some(at) => at.elapsed() >= BULK_MIN_INTERVAL,
        }
    }

    /// Record a dump attempt. An empty map (tool missing, timeout, parse
    /// failure) still counts against the rate limit but keeps any previously
    /// fetched table.
    pub fn store_bulk(&mut self, map: HashMap<u32, String>) {
        self.bulk.last_attempt = Some(Instant::now());
        if !map.is_empty() {
            self.bulk.map = map;
            self.bulk.fetched_at = Some(Instant::now());
        }
    }

    /// Apply a TTL-fresh owner table to rows still carrying the sentinel, and
    /// cache every hit so later cycles resolve from the cache tier.
    pub fn apply_bulk(&mut self, rows: &mut [ProcessRow]) {
        let fresh = matches!(self.bulk.fetched_at, Some(at) if at.elapsed() < BULK_TTL);
        if !fresh {
            return;
        }
        for row in rows.iter_mut().filter(|r| r.user == UNKNOWN_USER) {
            if let Some(user) = self.bulk.map.get(&row.pid) {
                row.user = user.clone();
                self.cache.insert(
                    row.pid,
                    CacheEntry {
                        name: row.name.clone(),
                        user: row.user.clone(),
                    },
                );
            }
        }
    }
}

/// First tier: the owner the OS reported during enumeration. Strips a
/// `DOMAIN\` prefix the way task managers display owners.
fn os_reported(os_user: Option<&str>) -> Option<String> {
    let user = os_user?.trim();
    if user.is_empty() {
        return None;
    }
    Some(user.rsplit('\\').next().unwrap_or(user).to_string())
}

fn service_map(name: &str) -> Option<String> {
    SERVICE_USERS
        .get(name.to_lowercase().as_str())
        .map(|u| u.to_string())
}

fn well_known(pid: u32, name: &str) -> Option<String> {
    if SYSTEM_PIDS.contains(&pid) || SYSTEM_NAMES.contains(name.to_lowercase().as_str()) {
        Some(SYSTEM_USER.to_string())
    } else {
        None
    }
}

/// Privileged fallback for owners the enumeration could not attribute: read
/// the real uid straight from /proc and map it through the users table.
#[cfg(target_os = "linux")]
pub fn proc_status_owner(pid: u32, users: &Users) -> Option<String> {
    let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    let uid_line = status.lines().find(|l| l.starts_with("Uid:"))?;
    let uid: u32 = uid_line.split_whitespace().nth(1)?.parse().ok()?;
    users
        .list()
        .iter()
        .find(|u| **u.id() == uid)
        .map(|u| u.name().to_string())
}

#[cfg(not(target_os = "linux"))]
pub fn proc_status_owner(_pid: u32, _users: &Users) -> Option<String> {
    None
}

/// Run the external process-table dump, time-boxed. Failure of any kind
/// degrades to an empty map, never an error.
pub async fn fetch_owner_table() -> HashMap<u32, String> {
    match tokio::time::timeout(BULK_TIMEOUT, run_dump()).await {
        Ok(Ok(out)) => parse_owner_table(&out),
        Ok(Err(e)) => {
            warn!("owner dump failed: {e}");
            HashMap::new()
        }
        Err(_) => {
            warn!("owner dump timed out");
            HashMap::new()
        }
    }
}

#[cfg(unix)]
async fn run_dump() -> std::io::Result<String> {
    let out = tokio::process::Command::new("ps")
        .args(["-axo", "pid=,user="])
        .kill_on_drop(true)
        .output()
        .await?;
    if !out.status.success() {
        return Err(std::io::Error::other("ps exited nonzero"));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

#[cfg(windows)]
async fn run_dump() -> std::io::Result<String> {
    let out = tokio::process::Command::new("tasklist")
        .args(["/V", "/FO", "CSV", "/NH"])
        .kill_on_drop(true)
        .output()
        .await?;
    if !out.status.success() {
        return Err(std::io::Error::other("tasklist exited nonzero"));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Parse `ps -axo pid=,user=` output: one "pid user" pair per line. Lines
/// that do not fit are skipped.
#[cfg(unix)]
pub fn parse_owner_table(text: &str) -> HashMap<u32, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        let (Some(pid), Some(user)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(pid) = pid.parse::<u32>() else { continue };
        map.insert(pid, user.to_string());
    }
    map
}

/// Parse `tasklist /V /FO CSV /NH` output: quoted CSV with the pid in column
/// 1 and the owner in column 6.
#[cfg(windows)]
pub fn parse_owner_table(text: &str) -> HashMap<u32, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let fields = split_csv(line);
        if fields.len() < 7 {
            continue;
        }
        let Ok(pid) = fields[1].parse::<u32>() else {
            continue;
        };
        let user = fields[6].trim();
        if user.is_empty() || user == "N/A" {
            continue;
        }
        let user = user.rsplit('\\').next().unwrap_or(user);
        map.insert(pid, user.to_string());
    }
    map
}

#[cfg(windows)]
fn split_csv(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    fields.push(cur);
    fields
}
