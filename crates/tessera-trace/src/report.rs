//! Report emission: the `.kq` resource summary and the per-cycle
//! time-series files.

use serde::Serialize;
use std::fmt::Write as _;

/// The KQ resource report.
#[derive(Debug, Clone, Serialize)]
pub struct KqReport {
    /// Device error exponent; error rate is `10^-p`.
    pub error_rate_exp: i32,
    /// Surface-code distance (braid mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_distance: Option<u32>,
    /// Concatenation level (tile mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concatenation_level: Option<u32>,
    /// Frequency-weighted physical cycles.
    pub total_cycles: u64,
    /// Peak physical qubits.
    pub max_qubits: u64,
    /// Total logical gates.
    pub logical_kq: u64,
    /// `total_cycles × max_qubits`.
    pub physical_kq: u64,
}

impl KqReport {
    /// Render the textual report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "error rate: 10^-{}", self.error_rate_exp);
        if let Some(d) = self.code_distance {
            let _ = writeln!(out, "code distance: {d}");
        }
        if let Some(l) = self.concatenation_level {
            let _ = writeln!(out, "concatenation level: {l}");
        }
        let _ = writeln!(out, "total cycles: {}", self.total_cycles);
        let _ = writeln!(out, "max qubits: {}", self.max_qubits);
        let _ = writeln!(out, "logical KQ: {}", self.logical_kq);
        let _ = writeln!(out, "physical kq: {}", self.physical_kq);
        out
    }

    /// Render the machine-readable sidecar.
    pub fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("report serializes")
    }
}

/// Braid-mode report file name:
/// `<name>.p.<P>.yx.<YX>.drop.<DROP>[.opt].kq`.
pub fn braid_report_name(benchmark: &str, p: i32, yx: u32, drop: u32, opt: bool) -> String {
    format!(
        "{benchmark}.p.{p}.yx.{yx}.drop.{drop}{}.kq",
        if opt { ".opt" } else { "" }
    )
}

/// Smoothing-direction suffix for tile-mode file names.
pub fn smoothing_suffix(forward: bool, backward: bool) -> &'static str {
    match (forward, backward) {
        (true, false) => ".forward",
        (false, true) => ".backward",
        (true, true) => ".backforth",
        (false, false) => "",
    }
}

/// Tile-mode report file name:
/// `<name>.p.<P>.cap.<C|inf>.window.<W|inf><direction>.<ext>`.
pub fn route_report_name(
    benchmark: &str,
    p: i32,
    cap: Option<u64>,
    window: Option<u64>,
    direction: &str,
    ext: &str,
) -> String {
    let cap = cap.map_or("inf".to_string(), |c| c.to_string());
    let window = window.map_or("inf".to_string(), |w| w.to_string());
    format!("{benchmark}.p.{p}.cap.{cap}.window.{window}{direction}.{ext}")
}

/// Render the `.usage` time series: cycle, live ancillas.
pub fn render_usage(ancillas_per_cycle: &[u64]) -> String {
    let mut out = String::new();
    for (cycle, count) in ancillas_per_cycle.iter().enumerate() {
        let _ = writeln!(out, "{}\t{count}", cycle + 1);
    }
    out
}

/// Render the `.ages` summary: average and peak ancilla age.
pub fn render_ages<'a>(ages: impl Iterator<Item = (&'a str, u64)>) -> String {
    let mut sum = 0u64;
    let mut count = 0u64;
    let mut peak = 0u64;
    for (id, age) in ages {
        if id.contains("zero") || id.contains("epr") || id.contains("magic") {
            sum += age;
            count += 1;
            peak = peak.max(age);
        }
    }
    let avg = if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    };
    format!("{avg}\t{peak}\n")
}

/// Render the `.storage` summary: peak occupancy per tile.
pub fn render_storage(peak_per_tile: &[u64]) -> String {
    let mut out = String::new();
    for peak in peak_per_tile {
        let _ = write!(out, "{peak}\t");
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kq_render_braid() {
        let report = KqReport {
            error_rate_exp: 5,
            code_distance: Some(7),
            concatenation_level: None,
            total_cycles: 1000,
            max_qubits: 64,
            logical_kq: 42,
            physical_kq: 64_000,
        };
        let text = report.render();
        assert!(text.starts_with("error rate: 10^-5\n"));
        assert!(text.contains("code distance: 7\n"));
        assert!(!text.contains("concatenation level"));
        assert!(text.ends_with("physical kq: 64000\n"));
        let json = report.render_json();
        assert!(json.contains("\"total_cycles\": 1000"));
    }

    #[test]
    fn test_report_names() {
        assert_eq!(
            braid_report_name("grovers", 5, 4, 8, false),
            "grovers.p.5.yx.4.drop.8.kq"
        );
        assert_eq!(
            braid_report_name("grovers", 5, 4, 8, true),
            "grovers.p.5.yx.4.drop.8.opt.kq"
        );
        assert_eq!(
            route_report_name("grovers", 5, Some(4), None, ".backforth", "usage"),
            "grovers.p.5.cap.4.window.inf.backforth.usage"
        );
    }

    #[test]
    fn test_ages_filters_ancillas() {
        let ages = [("q0", 100u64), ("q0_zero1_1", 4), ("q0_epr1_1", 8)];
        let text = render_ages(ages.iter().map(|&(i, a)| (i, a)));
        assert_eq!(text, "6\t8\n");
    }
}
