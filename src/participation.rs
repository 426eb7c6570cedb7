use crate::models::StudentRow;

pub const LOW_ENGAGEMENT_QUANTILE: f64 = 0.15;
pub const LOW_PARTICIPATION_LEVEL: &str = "하";
const FLAG_SCORE: u8 = 2;

/// Linearly interpolated quantile, matching the usual spreadsheet/dataframe definition.
/// Non-finite values are ignored; an empty input has no quantile.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Low-engagement cutoffs for one batch. Only meaningful within that batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementThresholds {
    pub assignment_count: Option<f64>,
    pub question_count: Option<f64>,
}

impl EngagementThresholds {
    pub fn from_rows(rows: &[StudentRow]) -> Self {
        let assignments: Vec<f64> = rows.iter().map(|row| row.assignment_count).collect();
        let questions: Vec<f64> = rows.iter().map(|row| row.question_count).collect();
        Self {
            assignment_count: quantile(&assignments, LOW_ENGAGEMENT_QUANTILE),
            question_count: quantile(&questions, LOW_ENGAGEMENT_QUANTILE),
        }
    }

    pub fn score(&self, row: &StudentRow) -> ParticipationRisk {
        let mut score = 0;
        if self
            .assignment_count
            .is_some_and(|cutoff| row.assignment_count <= cutoff)
        {
            score += 1;
        }
        if self
            .question_count
            .is_some_and(|cutoff| row.question_count <= cutoff)
        {
            score += 1;
        }
        if row.participation_level == LOW_PARTICIPATION_LEVEL {
            score += 2;
        }
        ParticipationRisk {
            score,
            flagged: score >= FLAG_SCORE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipationRisk {
    pub score: u8,
    pub flagged: bool,
}
