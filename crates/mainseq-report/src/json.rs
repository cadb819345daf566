use serde::Serialize;

use mainseq_core::result::MetricsResult;

use crate::text::check_passes;

/// Format a full analysis result as JSON.
pub fn format_report(result: &MetricsResult, compact: bool) -> String {
    if compact {
        serde_json::to_string(result).expect("MetricsResult should be serializable")
    } else {
        serde_json::to_string_pretty(result).expect("MetricsResult should be serializable")
    }
}

/// Wrapper for check output that adds pass/fail metadata.
#[derive(Debug, Serialize)]
pub struct CheckOutput<'a> {
    #[serde(flatten)]
    pub result: &'a MetricsResult,
    pub check: CheckStatus,
}

#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
    pub offender_count: usize,
}

/// Format a check result as JSON. Returns (json_string, passed).
pub fn format_check(
    result: &MetricsResult,
    max_distance: Option<f64>,
    compact: bool,
) -> (String, bool) {
    let passed = check_passes(result, max_distance);
    let offender_count = result
        .components
        .iter()
        .filter(|m| m.exceeds_threshold)
        .count();

    let output = CheckOutput {
        result,
        check: CheckStatus {
            passed,
            max_distance,
            offender_count,
        },
    };

    let json = if compact {
        serde_json::to_string(&output).expect("CheckOutput should be serializable")
    } else {
        serde_json::to_string_pretty(&output).expect("CheckOutput should be serializable")
    };

    (json, passed)
}
