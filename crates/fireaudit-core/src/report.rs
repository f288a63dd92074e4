//! Human-readable rendering of audit results.
//!
//! The console layout is scraped by downstream scripts, so the exact shape
//! matters: rating line with a 30-segment bar, findings in model order with
//! upper-cased severity labels, a distinct success line when nothing was
//! found, 1-indexed best practices, then the summary verbatim. The persisted
//! file carries the same content without ANSI styling.

use std::path::Path;

use chrono::Utc;
use tracing::info;

use crate::audit::{AuditResult, Severity};
use crate::error::{AuditError, Result};

const BAR_SEGMENTS: usize = 30;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const GRAY: &str = "\x1b[90m";
const BG_RED_WHITE: &str = "\x1b[41;97m";

/// Filled segment count for the rating bar: round(rating/10 × 30).
fn filled_segments(rating: u8) -> usize {
    ((rating as f64 / 10.0) * BAR_SEGMENTS as f64).round() as usize
}

fn severity_label(severity: Severity, color: bool) -> String {
    let (code, label) = match severity {
        Severity::Critical => (BG_RED_WHITE, " CRITICAL "),
        Severity::High => (RED, " HIGH "),
        Severity::Medium => (YELLOW, " MEDIUM "),
        Severity::Low => (BLUE, " LOW "),
    };
    paint(label, code, color)
}

fn paint(text: &str, code: &str, color: bool) -> String {
    if color {
        format!("{}{}{}", code, text, RESET)
    } else {
        text.to_string()
    }
}

/// Render an audit result. `color` selects ANSI styling (console) or plain
/// text (persisted file); the logical content is identical.
pub fn render_report(result: &AuditResult, color: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{}\n\n",
        paint("=== Firestore Security Rules Audit ===", BOLD, color)
    ));

    let filled = filled_segments(result.overall_rating);
    let bar = format!(
        "{}{}",
        paint(&"█".repeat(filled), GREEN, color),
        paint(&"░".repeat(BAR_SEGMENTS - filled), GRAY, color)
    );
    out.push_str(&format!(
        "Security Rating: {}   {}\n\n",
        paint(&format!("{}/10", result.overall_rating), BOLD, color),
        bar
    ));

    if result.vulnerabilities.is_empty() {
        out.push_str(&format!(
            "{}\n",
            paint("✔ No vulnerabilities found!", GREEN, color)
        ));
    } else {
        let noun = if result.vulnerabilities.len() > 1 {
            "Vulnerabilities"
        } else {
            "Vulnerability"
        };
        out.push_str(&format!(
            "{}\n\n",
            paint(
                &format!("✖ {} {}", result.vulnerabilities.len(), noun),
                RED,
                color
            )
        ));
        for v in &result.vulnerabilities {
            out.push_str(&format!(
                "{}  {}\n",
                severity_label(v.severity, color),
                paint(&v.description, BOLD, color)
            ));
            out.push_str(&format!("  Recommendation: {}\n", v.recommendation));
            if let Some(ref location) = v.location {
                out.push_str(&format!("  Location: {}\n", paint(location, ITALIC, color)));
            }
            out.push('\n');
        }
    }

    if !result.best_practices.is_empty() {
        out.push_str(&format!("\n{}\n\n", paint("Best Practices:", BOLD, color)));
        for (i, bp) in result.best_practices.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, bp));
        }
    }

    out.push_str(&format!("\n{}\n\n", paint("Summary:", BOLD, color)));
    out.push_str(&result.summary);
    out.push('\n');

    out
}

/// Print the styled report to stdout.
pub fn print_report(result: &AuditResult) {
    println!("{}", render_report(result, true));
}

/// Persist the plain-text report, creating parent directories as needed.
pub fn write_report(result: &AuditResult, path: &Path) -> Result<()> {
    let body = format!(
        "Firestore Security Rules Audit Report\nGenerated: {}\n{}",
        Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        render_report(result, false)
    );
    write_text(&body, path)
}

/// Persist arbitrary report text (used for free-text audit mode).
pub fn write_text(text: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AuditError::Internal(format!(
                    "Failed to create report directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    std::fs::write(path, text).map_err(|e| {
        AuditError::Internal(format!("Failed to write report {}: {}", path.display(), e))
    })?;
    info!(path = %path.display(), "Report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Vulnerability;

    fn result_with(vulnerabilities: Vec<Vulnerability>, rating: u8) -> AuditResult {
        AuditResult {
            summary: "Overall posture summary.".to_string(),
            vulnerabilities,
            best_practices: vec![],
            overall_rating: rating,
        }
    }

    fn critical_finding() -> Vulnerability {
        Vulnerability {
            severity: Severity::Critical,
            description: "public read/write".to_string(),
            recommendation: "restrict by auth".to_string(),
            location: Some("line 3".to_string()),
        }
    }

    #[test]
    fn bar_is_proportional_to_rating() {
        assert_eq!(filled_segments(5), 15);
        assert_eq!(filled_segments(10), 30);
        assert_eq!(filled_segments(1), 3);
        assert_eq!(filled_segments(2), 6);
    }

    #[test]
    fn plain_bar_has_exact_segment_counts() {
        let report = render_report(&result_with(vec![], 5), false);
        let filled = report.matches('█').count();
        let empty = report.matches('░').count();
        assert_eq!(filled, 15);
        assert_eq!(empty, 15);
    }

    #[test]
    fn rating_ten_fills_the_whole_bar() {
        let report = render_report(&result_with(vec![], 10), false);
        assert_eq!(report.matches('█').count(), 30);
        assert_eq!(report.matches('░').count(), 0);
    }

    #[test]
    fn empty_vulnerabilities_render_success_line() {
        let report = render_report(&result_with(vec![], 9), false);
        assert!(report.contains("✔ No vulnerabilities found!"));
        assert!(!report.contains("Vulnerabilit"));
    }

    #[test]
    fn findings_render_in_order_with_uppercase_labels() {
        let vulns = vec![
            critical_finding(),
            Vulnerability {
                severity: Severity::Low,
                description: "second finding".to_string(),
                recommendation: "tighten".to_string(),
                location: None,
            },
        ];
        let report = render_report(&result_with(vulns, 2), false);
        assert!(report.contains("✖ 2 Vulnerabilities"));
        let critical_pos = report.find("CRITICAL").unwrap();
        let low_pos = report.find(" LOW ").unwrap();
        assert!(critical_pos < low_pos);
        assert!(report.contains("  Recommendation: restrict by auth"));
        assert!(report.contains("  Location: line 3"));
    }

    #[test]
    fn single_finding_uses_singular_noun() {
        let report = render_report(&result_with(vec![critical_finding()], 2), false);
        assert!(report.contains("✖ 1 Vulnerability\n"));
    }

    #[test]
    fn best_practices_are_one_indexed() {
        let mut result = result_with(vec![], 7);
        result.best_practices = vec!["Deny by default".to_string(), "Validate writes".to_string()];
        let report = render_report(&result, false);
        assert!(report.contains("  1. Deny by default"));
        assert!(report.contains("  2. Validate writes"));
    }

    #[test]
    fn summary_is_rendered_verbatim_at_the_end() {
        let report = render_report(&result_with(vec![], 4), false);
        assert!(report.trim_end().ends_with("Overall posture summary."));
    }

    #[test]
    fn critical_report_carries_expected_strings() {
        // Rating 2 → 6 filled segments.
        let report = render_report(&result_with(vec![critical_finding()], 2), false);
        assert!(report.contains("CRITICAL"));
        assert!(report.contains("public read/write"));
        assert!(report.contains(&"█".repeat(6)));
        assert!(!report.contains(&"█".repeat(7)));
    }

    #[test]
    fn colored_render_contains_ansi_plain_does_not() {
        let result = result_with(vec![critical_finding()], 2);
        assert!(render_report(&result, true).contains("\x1b["));
        assert!(!render_report(&result, false).contains("\x1b["));
    }

    #[test]
    fn write_report_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("audit.txt");
        write_report(&result_with(vec![], 5), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Firestore Security Rules Audit Report"));
        assert!(written.contains("Generated: "));
        assert!(!written.contains("\x1b["));
    }
}
