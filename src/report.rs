use std::collections::BTreeMap;
use std::fmt::Write;

use crate::enrich::count_level;
use crate::guidance::percent_label;
use crate::models::EnrichedRow;
use crate::policy::Policy;
use crate::reasons::{NO_REASON, REASON_SEPARATOR};
use crate::risk::RiskLevel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonSummary {
    pub reason: String,
    pub count: usize,
}

/// How often each reason appears across the batch, most frequent first.
pub fn summarize_reasons(rows: &[EnrichedRow]) -> Vec<ReasonSummary> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

    for row in rows {
        if row.top_reasons == NO_REASON {
            continue;
        }
        for reason in row.top_reasons.split(REASON_SEPARATOR) {
            *counts.entry(reason).or_insert(0) += 1;
        }
    }

    let mut summaries: Vec<ReasonSummary> = counts
        .into_iter()
        .map(|(reason, count)| ReasonSummary {
            reason: reason.to_string(),
            count,
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

pub fn build_report(label: &str, policy: &Policy, rows: &[EnrichedRow]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Risk Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} students, threshold {}, {} classes)",
        label,
        rows.len(),
        percent_label(policy.threshold),
        policy.total_classes
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Mix");

    if rows.is_empty() {
        let _ = writeln!(output, "No students in this batch.");
    } else {
        for level in [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low] {
            let _ = writeln!(
                output,
                "- {}: {} students ({})",
                level.as_str(),
                count_level(rows, level),
                level.action()
            );
        }
    }

    let mut ranked: Vec<&EnrichedRow> = rows.iter().collect();
    ranked.sort_by(|a, b| b.student.risk_proba.total_cmp(&a.student.risk_proba));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Students");

    if ranked.is_empty() {
        let _ = writeln!(output, "No students in this batch.");
    } else {
        for row in ranked.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}, p={:.2}): {}; {}",
                row.student.student_id,
                row.risk_level.as_str(),
                row.student.risk_proba,
                row.top_reasons,
                row.score_guidance
            );
        }
    }

    let summaries = summarize_reasons(rows);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Common Reasons");

    if summaries.is_empty() {
        let _ = writeln!(output, "No notable risk factors in this batch.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(output, "- {}: {} students", summary.reason, summary.count);
        }
    }

    let over_limit = rows
        .iter()
        .filter(|row| row.remaining_absence_allowance < 0)
        .count();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Absences");
    let _ = writeln!(
        output,
        "Limit is {} absences; {} students are past it.",
        crate::absence::absence_limit(policy),
        over_limit
    );

    output
}
