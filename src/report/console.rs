use crate::report::report_model::TranslationReport;

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format a translation report for terminal output.
///
/// Produces output like:
/// ```text
/// === Translation to playwright-ts ===
///
/// ✓ OK    login_test.java -> login_test.spec.ts (2 tests, confidence 0.85)
///     [TODO] should login: line 14 (confidence 0.00): driver.switchTo().frame(0);
/// ✗ FAIL  broken.java
///     [ERROR] parse error: no test boundary found in 'broken.java' (selenium-java)
///
/// === Results: 1 translated, 1 failed (2 total), 1 written, 1 TODO ===
/// ```
pub fn format_console_report(report: &TranslationReport, details: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Translation to {} ===\n\n", report.target_dialect));

    for file in &report.files {
        let result = &file.result;
        if result.success {
            let destination = match (&file.output_path, file.written) {
                (Some(path), true) => format!(" -> {}", path),
                _ => String::new(),
            };
            out.push_str(&format!(
                "\u{2713} OK    {}{} ({} tests, confidence {:.2})\n",
                file.source_path,
                destination,
                result.test_count(),
                result.confidence
            ));
        } else {
            out.push_str(&format!("\u{2717} FAIL  {}\n", file.source_path));
            for error in &result.errors {
                out.push_str(&format!("    [ERROR] {}\n", error));
            }
        }

        if let Some(reason) = &file.skipped_reason {
            out.push_str(&format!("    [SKIPPED] {}\n", reason));
        }

        if details {
            for todo in &result.todos {
                out.push_str(&format!("    [TODO] {}\n", todo));
            }
            for warning in &result.warnings {
                out.push_str(&format!("    [WARN] {}\n", warning));
            }
        }
    }

    out.push('\n');
    out.push_str(&format_summary_line(report));

    out
}

/// The closing `=== Results: ... ===` line on its own.
pub fn format_summary_line(report: &TranslationReport) -> String {
    let mut out = format!(
        "=== Results: {} translated, {} failed ({} total), {} written, {} TODO{}",
        report.succeeded,
        report.failed,
        report.total,
        report.written,
        report.todos,
        if report.todos == 1 { "" } else { "s" }
    );

    if let Some(ms) = report.duration_ms {
        let secs = ms as f64 / 1000.0;
        out.push_str(&format!(" in {:.1}s", secs));
    }

    out.push_str(" ===\n");
    out
}
