//! Result → human/json string formatting.
//!
//! - **Human** (default): one line per result, indented violation lists
//! - **JSON** (`--json`): `serde_json::to_string_pretty`

use linkguard_core::{HarnessError, ScenarioResult, ViolationReport};

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Format a finalized scenario result.
pub fn format_result(result: &ScenarioResult, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => result
            .to_json()
            .unwrap_or_else(|e| format_error(&e, OutputMode::Json)),
        OutputMode::Human => result.to_string(),
    }
}

/// Format an error.
pub fn format_error(err: &HarnessError, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&serde_json::json!({
            "error": err.to_string()
        }))
        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Human => format!("(error) {}", err),
    }
}

/// Format the scenario listing.
pub fn format_list(scenarios: &[(&str, &str)], mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => {
            let entries: Vec<_> = scenarios
                .iter()
                .map(|(name, description)| {
                    serde_json::json!({ "name": name, "description": description })
                })
                .collect();
            serde_json::to_string_pretty(&entries).unwrap_or_default()
        }
        OutputMode::Human => {
            let width = scenarios.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
            scenarios
                .iter()
                .map(|(name, description)| format!("{:width$}  {}", name, description, width = width))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

/// Format the outcome of a standalone check.
pub fn format_check(outcome: &Result<(), ViolationReport>, mode: OutputMode) -> String {
    match (outcome, mode) {
        (Ok(()), OutputMode::Human) => "OK: no symlink violations".to_string(),
        (Err(report), OutputMode::Human) => report.to_string(),
        (Ok(()), OutputMode::Json) => serde_json::json!({ "violations": [] }).to_string(),
        (Err(report), OutputMode::Json) => {
            let violations: Vec<_> = report
                .violations()
                .iter()
                .map(|v| {
                    serde_json::json!({
                        "path": v.path().display().to_string(),
                        "violation": v.to_string(),
                    })
                })
                .collect();
            serde_json::to_string_pretty(&serde_json::json!({ "violations": violations }))
                .unwrap_or_default()
        }
    }
}
