//! Pure view derivation: the filter predicate plus the selection and scroll
//! rules applied on every repaint.

use crate::types::ProcessRow;

/// Indices of the rows whose name, user, or pid-as-string contains `filter`,
/// case-insensitively. An empty filter keeps every row.
pub fn filter_rows(rows: &[ProcessRow], filter: &str) -> Vec<usize> {
    if filter.is_empty() {
        return (0..rows.len()).collect();
    }
    let needle = filter.to_lowercase();
    rows.iter()
        .enumerate()
        .filter(|(_, r)| {
            r.name.to_lowercase().contains(&needle)
                || r.user.to_lowercase().contains(&needle)
                || r.pid.to_string().contains(&needle)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Selection and scroll corrected against the current snapshot and filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derived {
    /// Indices into the snapshot's row list, in display order.
    pub filtered: Vec<usize>,
    pub selected_pid: Option<u32>,
    /// Position of the selection inside `filtered`.
    pub selected: Option<usize>,
    pub scroll: usize,
}

/// Re-derive selection and scroll. A selection that fell out of the filtered
/// set snaps to the first filtered row (or clears when nothing matches), and
/// scroll is clamped to `[0, len - page]` with the selection kept inside the
/// visible page.
pub fn derive(
    rows: &[ProcessRow],
    filter: &str,
    selected_pid: Option<u32>,
    scroll: usize,
    page: usize,
) -> Derived {
    let filtered = filter_rows(rows, filter);
    if filtered.is_empty() {
        return Derived {
            filtered,
            selected_pid: None,
            selected: None,
            scroll: 0,
        };
    }

    let page = page.max(1);
    let mut idx = 0;
    let mut pid = rows[filtered[0]].pid;
    if let Some(want) = selected_pid {
        if let Some(pos) = filtered.iter().position(|&i| rows[i].pid == want) {
            idx = pos;
            pid = want;
        }
    }

    let max_scroll = filtered.len().saturating_sub(page);
    let mut scroll = scroll.min(max_scroll);
    if idx < scroll {
        scroll = idx;
    } else if idx >= scroll + page {
        scroll = idx + 1 - page;
    }

    Derived {
        filtered,
        selected_pid: Some(pid),
        selected: Some(idx),
        scroll,
    }
}
