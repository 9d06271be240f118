//! Formatting helpers for the header meters.

/// Meter caps per unit: the value at which a bar reads 100%.
const KBPS_CAP: f64 = 2000.0;
const MBPS_CAP: f64 = 200.0;
const GBPS_CAP: f64 = 2.0;

/// Render a byte rate as bits-per-second with an auto-scaled unit, plus the
/// percentage of that unit's meter cap.
pub fn format_rate(rate_bps: f64) -> (String, f64) {
    let bits = rate_bps.max(0.0) * 8.0;
    let (value, unit, cap) = if bits < 1_000_000.0 {
        (bits / 1_000.0, "KBPS", KBPS_CAP)
    } else if bits < 1_000_000_000.0 {
        (bits / 1_000_000.0, "MBPS", MBPS_CAP)
    } else {
        (bits / 1_000_000_000.0, "GBPS", GBPS_CAP)
    };
    let pct = (value / cap * 100.0).clamp(0.0, 100.0);
    let label = if value >= 100.0 {
        format!("{value:>4.0} {unit}")
    } else {
        format!("{value:>4.1} {unit}")
    };
    (label, pct)
}

pub fn format_uptime(secs: u64) -> String {
    let (mins, s) = (secs / 60, secs % 60);
    let (hrs, m) = (mins / 60, mins % 60);
    format!("{hrs:02}:{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_scales_units() {
        let (label, _) = format_rate(1000.0); // 8 kbit/s
        assert_eq!(label, " 8.0 KBPS");
        let (label, _) = format_rate(2_500_000.0); // 20 Mbit/s
        assert_eq!(label, "20.0 MBPS");
        let (label, _) = format_rate(500_000_000.0); // 4 Gbit/s
        assert_eq!(label, " 4.0 GBPS");
    }

    #[test]
    fn rate_pct_clamped_to_meter_cap() {
        let (_, pct) = format_rate(0.0);
        assert_eq!(pct, 0.0);
        let (_, pct) = format_rate(1e12);
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn uptime_is_hh_mm_ss() {
        assert_eq!(format_uptime(0), "00:00:00");
        assert_eq!(format_uptime(3661), "01:01:01");
        assert_eq!(format_uptime(90_000), "25:00:00");
    }
}
