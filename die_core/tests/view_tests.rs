//! Filter, selection, and scroll rules for the derived view.

use die_core::types::ProcessRow;
use die_core::view::{derive, filter_rows};

fn row(pid: u32, name: &str, user: &str, cpu: f32) -> ProcessRow {
    ProcessRow {
        pid,
        name: name.into(),
        user: user.into(),
        cpu_percent: cpu,
        mem_mb: 10,
    }
}

fn sample() -> Vec<ProcessRow> {
    vec![
        row(10, "a.exe", "alice", 50.0),
        row(11, "b.exe", "bob", 10.0),
        row(12, "chrome.exe", "alice", 5.0),
        row(301, "svchost.exe", "SYSTEM", 1.0),
    ]
}

#[test]
fn empty_filter_keeps_every_row() {
    let rows = sample();
    assert_eq!(filter_rows(&rows, ""), vec![0, 1, 2, 3]);
}

#[test]
fn filter_matches_name_user_and_pid_case_insensitively() {
    let rows = sample();
    assert_eq!(filter_rows(&rows, "CHROME"), vec![2]);
    assert_eq!(filter_rows(&rows, "ALIce"), vec![0, 2]);
    assert_eq!(filter_rows(&rows, "301"), vec![3]);
    // Substring of a pid, not an exact match
    assert_eq!(filter_rows(&rows, "1"), vec![0, 1, 2, 3]);
    assert_eq!(filter_rows(&rows, "no-such-thing"), Vec::<usize>::new());
}

#[test]
fn selection_defaults_to_first_filtered_row() {
    let rows = sample();
    let d = derive(&rows, "", None, 0, 10);
    assert_eq!(d.selected_pid, Some(10));
    assert_eq!(d.selected, Some(0));
}

#[test]
fn selection_survives_while_still_visible() {
    let rows = sample();
    let d = derive(&rows, "alice", Some(12), 0, 10);
    assert_eq!(d.selected_pid, Some(12));
    assert_eq!(d.selected, Some(1)); // second row of the filtered list
}

#[test]
fn selection_filtered_out_snaps_to_first_match() {
    let rows = sample();
    let d = derive(&rows, "b.exe", Some(10), 0, 10);
    assert_eq!(d.selected_pid, Some(11));
    assert_eq!(d.selected, Some(0));
}

#[test]
fn empty_filtered_view_clears_selection_and_scroll() {
    let rows = sample();
    let d = derive(&rows, "zzz", Some(10), 3, 10);
    assert_eq!(d.selected_pid, None);
    assert_eq!(d.selected, None);
    assert_eq!(d.scroll, 0);
    assert!(d.filtered.is_empty());
}

#[test]
fn scroll_clamped_to_list_end() {
    let rows: Vec<ProcessRow> = (0..20).map(|i| row(100 + i, "p", "u", 0.0)).collect();
    let d = derive(&rows, "", Some(100), 99, 5);
    // Selection at the top forces scroll back to it
    assert_eq!(d.scroll, 0);

    let d = derive(&rows, "", Some(119), 99, 5);
    // max scroll = 20 - 5
    assert_eq!(d.scroll, 15);
    assert_eq!(d.selected, Some(19));
}

#[test]
fn scroll_follows_selection_into_the_page() {
    let rows: Vec<ProcessRow> = (0..20).map(|i| row(100 + i, "p", "u", 0.0)).collect();

    // Selection below the page pulls scroll down
    let d = derive(&rows, "", Some(110), 0, 5);
    assert_eq!(d.selected, Some(10));
    assert_eq!(d.scroll, 6);

    // Selection above the page pulls scroll up
    let d = derive(&rows, "", Some(102), 10, 5);
    assert_eq!(d.selected, Some(2));
    assert_eq!(d.scroll, 2);
}

#[test]
fn scroll_invariant_holds_across_states() {
    let rows: Vec<ProcessRow> = (0..12).map(|i| row(100 + i, "p", "u", 0.0)).collect();
    for page in 1..6 {
        for scroll in 0..15 {
            for sel in [None, Some(100), Some(105), Some(111), Some(999)] {
                let d = derive(&rows, "", sel, scroll, page);
                let max_scroll = rows.len().saturating_sub(page);
                assert!(d.scroll <= max_scroll);
                let idx = d.selected.expect("non-empty view always selects");
                assert!(d.scroll <= idx && idx < d.scroll + page);
            }
        }
    }
}
