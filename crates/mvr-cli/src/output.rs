//! Result rendering for stdout.

use anyhow::{Context, Result};
use mvr_client::{QueryReport, QueryResult};
use std::fmt::Write as _;
use std::path::Path;

const RULE_WIDTH: usize = 80;

/// Human-readable summary block.
pub fn summary(result: &QueryResult) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let status = if result.success() { "SUCCESS" } else { "FAILED" };

    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "QUERY RESULT - {status}");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "ЕГН: {}", result.egn());
    let _ = writeln!(out, "Last Name: {}", result.surname());
    let _ = writeln!(out);
    let _ = writeln!(out, "Result: {}", result.result_text());
    let _ = write!(out, "{rule}");
    out
}

/// JSON document for `--json`, with how the run ended.
pub fn json(report: &QueryReport) -> Result<String> {
    let mut value = serde_json::to_value(&report.result).context("Failed to serialize result")?;
    if let Some(object) = value.as_object_mut() {
        object.insert("attempts".to_string(), report.attempts.into());
        object.insert("terminal".to_string(), report.terminal.to_string().into());
    }
    serde_json::to_string_pretty(&value).context("Failed to serialize result")
}

/// Write the raw response body for offline inspection.
pub fn save_html(result: &QueryResult, path: &Path) -> Result<()> {
    std::fs::write(path, result.raw_html())
        .with_context(|| format!("Failed to write response HTML to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvr_client::{Outcome, Terminal};

    fn result(outcome: Outcome, text: &str) -> QueryResult {
        QueryResult::new(outcome, "7501010010", "Иванов", text, "<html>body</html>")
    }

    #[test]
    fn test_summary_success() {
        let text = summary(&result(Outcome::Success, "След 01.01.2024 ... получен."));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=".repeat(80));
        assert_eq!(lines[1], "QUERY RESULT - SUCCESS");
        assert_eq!(lines[3], "ЕГН: 7501010010");
        assert_eq!(lines[4], "Last Name: Иванов");
        assert_eq!(lines[6], "Result: След 01.01.2024 ... получен.");
        assert_eq!(lines.last().copied(), Some("=".repeat(80).as_str()));
    }

    #[test]
    fn test_summary_failure() {
        let text = summary(&result(Outcome::CaptchaError, "Грешка: невалидна капча"));
        assert!(text.contains("QUERY RESULT - FAILED"));
    }

    #[test]
    fn test_json_includes_terminal() {
        let report = QueryReport {
            result: result(Outcome::CaptchaError, "Грешка: невалидна капча"),
            terminal: Terminal::RetryExhausted,
            attempts: 3,
        };
        let value: serde_json::Value = serde_json::from_str(&json(&report).unwrap()).unwrap();
        assert_eq!(value["outcome"], "captcha_error");
        assert_eq!(value["attempts"], 3);
        assert_eq!(value["terminal"], "retries exhausted");
        assert_eq!(value["result_text"], "Грешка: невалидна капча");
        assert!(value.get("raw_html").is_none());
    }

    #[test]
    fn test_save_html_writes_raw_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.html");
        save_html(&result(Outcome::Success, "ok"), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html>body</html>");
    }
}
