use crate::models::StudentRow;

pub const MAX_REASONS: usize = 3;
pub const NO_REASON: &str = "no notable risk factor";
pub const REASON_SEPARATOR: &str = ", ";

const HIGH_ABSENCE_COUNT: f64 = 5.0;
const LOW_SCORE: f64 = 50.0;

/// Risk factors in the priority order they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskReason {
    HighAbsence,
    LowMidterm,
    LowFinal,
    LowPerformance,
    DecliningEngagement,
}

impl RiskReason {
    pub fn label(&self) -> &'static str {
        match self {
            RiskReason::HighAbsence => "high absence count",
            RiskReason::LowMidterm => "low midterm score",
            RiskReason::LowFinal => "low final score",
            RiskReason::LowPerformance => "low performance score",
            RiskReason::DecliningEngagement => {
                "declining engagement (assignments/questions/participation)"
            }
        }
    }
}

/// Every reason that applies, highest priority first. Final and performance scores only
/// count when they were actually uploaded; the midterm uses its imputed value.
pub fn matching_reasons(row: &StudentRow, participation_flag: bool) -> Vec<RiskReason> {
    [
        (
            RiskReason::HighAbsence,
            row.absence_count >= HIGH_ABSENCE_COUNT,
        ),
        (RiskReason::LowMidterm, row.midterm_score < LOW_SCORE),
        (
            RiskReason::LowFinal,
            !row.final_score_missing && row.final_score < LOW_SCORE,
        ),
        (
            RiskReason::LowPerformance,
            !row.performance_score_missing && row.performance_score < LOW_SCORE,
        ),
        (RiskReason::DecliningEngagement, participation_flag),
    ]
    .into_iter()
    .filter_map(|(reason, applies)| applies.then_some(reason))
    .collect()
}

pub fn top_reasons(row: &StudentRow, participation_flag: bool) -> String {
    let reasons = matching_reasons(row, participation_flag);
    if reasons.is_empty() {
        return NO_REASON.to_string();
    }
    reasons
        .iter()
        .take(MAX_REASONS)
        .map(RiskReason::label)
        .collect::<Vec<_>>()
        .join(REASON_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(absences: f64, midterm: f64, final_score: f64, performance: f64) -> StudentRow {
        StudentRow {
            student_id: "s1".to_string(),
            midterm_score: midterm,
            final_score,
            performance_score: performance,
            midterm_score_missing: false,
            final_score_missing: false,
            performance_score_missing: false,
            assignment_count: 5.0,
            question_count: 2.0,
            participation_level: "중".to_string(),
            participation_level_num: 1.0,
            absence_count: absences,
            risk_proba: 0.5,
            extra: Vec::new(),
        }
    }

    #[test]
    fn healthy_student_gets_sentinel() {
        assert_eq!(top_reasons(&row(0.0, 90.0, 90.0, 90.0), false), NO_REASON);
    }

    #[test]
    fn reasons_follow_priority_and_cap_at_three() {
        let student = row(7.0, 10.0, 20.0, 30.0);
        assert_eq!(matching_reasons(&student, true).len(), 5);
        assert_eq!(
            top_reasons(&student, true),
            "high absence count, low midterm score, low final score"
        );
    }

    #[test]
    fn originally_missing_scores_are_not_reasons() {
        let mut student = row(0.0, 80.0, 0.0, 0.0);
        student.final_score_missing = true;
        student.performance_score_missing = true;
        assert_eq!(top_reasons(&student, false), NO_REASON);

        student.midterm_score = 0.0;
        student.midterm_score_missing = true;
        assert_eq!(top_reasons(&student, false), "low midterm score");
    }

    #[test]
    fn boundary_values_do_not_trigger() {
        assert_eq!(top_reasons(&row(4.0, 50.0, 50.0, 50.0), false), NO_REASON);
        assert_eq!(top_reasons(&row(5.0, 50.0, 50.0, 50.0), false), "high absence count");
    }

    proptest! {
        #[test]
        fn reasons_are_capped_and_never_empty(
            absences in 0.0f64..20.0,
            midterm in 0.0f64..100.0,
            final_score in 0.0f64..100.0,
            performance in 0.0f64..100.0,
            final_missing in any::<bool>(),
            performance_missing in any::<bool>(),
            flagged in any::<bool>(),
        ) {
            let mut student = row(absences, midterm, final_score, performance);
            student.final_score_missing = final_missing;
            student.performance_score_missing = performance_missing;
            let text = top_reasons(&student, flagged);
            prop_assert!(!text.is_empty());
            prop_assert!(text.split(REASON_SEPARATOR).count() <= MAX_REASONS);
        }
    }
}
