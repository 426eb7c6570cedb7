use tracing::info;

use crate::absence;
use crate::guidance;
use crate::models::{EnrichedRow, StudentRow};
use crate::participation::EngagementThresholds;
use crate::policy::Policy;
use crate::preprocess::{PreparedBatch, SCORE_COLUMNS};
use crate::reasons;
use crate::risk::RiskLevel;

/// Columns added by preprocessing and enrichment, in the order they are appended after
/// the input columns.
pub const DERIVED_COLUMNS: [&str; 13] = [
    "midterm_score_missing",
    "final_score_missing",
    "performance_score_missing",
    "participation_level_num",
    "achievement_rate",
    "risk_level",
    "action",
    "participation_risk_score",
    "participation_flag",
    "absence_limit",
    "remaining_absence_allowance",
    "score_guidance",
    "top_reasons",
];

/// Attach risk level, participation, absence, guidance and reasons to every row.
pub fn enrich(rows: &[StudentRow], policy: &Policy) -> Vec<EnrichedRow> {
    let thresholds = EngagementThresholds::from_rows(rows);
    let absence_limit = absence::absence_limit(policy);

    rows.iter()
        .map(|row| {
            let risk_level = RiskLevel::from_probability(row.risk_proba);
            let participation = thresholds.score(row);
            let remaining_absence_allowance = absence::remaining_allowance(policy, row.absence_count);
            let score_guidance = guidance::score_guidance(row, policy).to_string();
            let top_reasons = reasons::top_reasons(row, participation.flagged);

            EnrichedRow {
                student: row.clone(),
                risk_level,
                participation_risk_score: participation.score,
                participation_flag: participation.flagged,
                absence_limit,
                remaining_absence_allowance,
                score_guidance,
                top_reasons,
            }
        })
        .collect()
}

/// An enriched batch with its full column order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedBatch {
    pub columns: Vec<String>,
    pub rows: Vec<EnrichedRow>,
}

impl EnrichedBatch {
    pub fn build(batch: &PreparedBatch, policy: &Policy) -> Self {
        let rows = enrich(&batch.rows, policy);

        let mut columns = batch.source_columns.clone();
        for column in SCORE_COLUMNS.iter().chain(DERIVED_COLUMNS.iter()) {
            if !columns.iter().any(|existing| existing == column) {
                columns.push(column.to_string());
            }
        }

        info!(
            rows = rows.len(),
            high = count_level(&rows, RiskLevel::High),
            medium = count_level(&rows, RiskLevel::Medium),
            low = count_level(&rows, RiskLevel::Low),
            "enriched batch"
        );

        Self { columns, rows }
    }
}

pub fn count_level(rows: &[EnrichedRow], level: RiskLevel) -> usize {
    rows.iter().filter(|row| row.risk_level == level).count()
}
