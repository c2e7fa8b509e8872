use std::fmt::Write as _;

use crate::domain::ReconReport;

/// Render the collaborator's executive report as plain text with three
/// labeled sections.
pub fn render_report(report: &ReconReport) -> String {
    let mut out = String::new();
    section(&mut out, "Fixes Applied", &report.fixes_applied);
    section(&mut out, "Root Cause Analysis", &report.root_cause_analysis);
    section(&mut out, "Recommendations", &report.recommendations);
    out
}

fn section(out: &mut String, title: &str, lines: &[String]) {
    let _ = writeln!(out, "=== {title} ===");
    if lines.is_empty() {
        let _ = writeln!(out, "(none)");
    } else {
        for line in lines {
            let _ = writeln!(out, "- {line}");
        }
    }
    let _ = writeln!(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_three_labeled_sections() {
        let report = ReconReport {
            fixes_applied: vec!["Standardized dates".to_string()],
            root_cause_analysis: Vec::new(),
            recommendations: vec!["Automate the spreadsheet export".to_string()],
        };
        let text = render_report(&report);
        assert!(text.contains("=== Fixes Applied ===\n- Standardized dates"));
        assert!(text.contains("=== Root Cause Analysis ===\n(none)"));
        assert!(text.contains("=== Recommendations ===\n- Automate the spreadsheet export"));
    }
}
