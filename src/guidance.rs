//! Minimum-score projections for students with assessments still outstanding.
//!
//! Which message a student gets depends only on which scores were missing in the
//! upload, so the missing-flag combination is resolved into a [`GuidanceCase`] first
//! and every case is handled by a single `match`.

use std::fmt;

use crate::models::StudentRow;
use crate::policy::Policy;

/// Missing-score combination for one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidanceCase {
    MidtermMissing,
    BothPresent,
    FinalMissing,
    PerformanceMissing,
    BothMissing,
}

impl GuidanceCase {
    pub fn from_flags(midterm_missing: bool, final_missing: bool, performance_missing: bool) -> Self {
        match (midterm_missing, final_missing, performance_missing) {
            (true, _, _) => GuidanceCase::MidtermMissing,
            (false, false, false) => GuidanceCase::BothPresent,
            (false, true, false) => GuidanceCase::FinalMissing,
            (false, false, true) => GuidanceCase::PerformanceMissing,
            (false, true, true) => GuidanceCase::BothMissing,
        }
    }

    pub fn for_row(row: &StudentRow) -> Self {
        Self::from_flags(
            row.midterm_score_missing || !row.midterm_score.is_finite(),
            row.final_score_missing,
            row.performance_score_missing,
        )
    }
}

/// Score still needed on one assessment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Requirement {
    Score { required: f64, max: f64 },
    /// The assessment carries no weight, so no score on it can close the gap.
    Unattainable { max: f64 },
}

impl Requirement {
    /// `needed` is the remaining achievement fraction; `weight` is the assessment's
    /// weight as a fraction of 1.
    pub fn compute(needed: f64, weight: f64, max: f64) -> Self {
        if needed <= 0.0 {
            return Requirement::Score { required: 0.0, max };
        }
        if weight <= 0.0 {
            return Requirement::Unattainable { max };
        }
        let required = (needed / weight * max).clamp(0.0, max);
        Requirement::Score { required, max }
    }

    fn describe(&self, assessment: &str) -> String {
        match self {
            Requirement::Score { required, max } => {
                format!("at least {required:.1} (/{max:.0}) on the {assessment}")
            }
            Requirement::Unattainable { max } => format!(
                "the {assessment} (/{max:.0}) cannot be satisfied by this field alone"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreGuidance {
    MidtermUnavailable,
    ThresholdMet { threshold: f64 },
    BelowThreshold { threshold: f64 },
    FinalNeeded(Requirement),
    PerformanceNeeded(Requirement),
    Scenarios {
        final_with_full_performance: Requirement,
        performance_with_full_final: Requirement,
    },
}

impl fmt::Display for ScoreGuidance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreGuidance::MidtermUnavailable => f.write_str(
                "Midterm score unavailable; cannot compute achievement guidance.",
            ),
            ScoreGuidance::ThresholdMet { threshold } => write!(
                f,
                "Current scores already meet the {} achievement threshold.",
                percent_label(*threshold)
            ),
            ScoreGuidance::BelowThreshold { threshold } => write!(
                f,
                "Current scores fall below the {} achievement threshold.",
                percent_label(*threshold)
            ),
            ScoreGuidance::FinalNeeded(requirement) => {
                write!(f, "Needs {}.", requirement.describe("final exam"))
            }
            ScoreGuidance::PerformanceNeeded(requirement) => {
                write!(f, "Needs {}.", requirement.describe("performance assessment"))
            }
            ScoreGuidance::Scenarios {
                final_with_full_performance,
                performance_with_full_final,
            } => write!(
                f,
                "[Scenarios] with full performance marks, needs {} / with full final marks, needs {}.",
                final_with_full_performance.describe("final exam"),
                performance_with_full_final.describe("performance assessment"),
            ),
        }
    }
}

/// Threshold as a percentage, with one decimal only when it is not whole.
pub fn percent_label(threshold: f64) -> String {
    let percent = (threshold * 1000.0).round() / 10.0;
    if percent.fract() == 0.0 {
        format!("{percent:.0}%")
    } else {
        format!("{percent:.1}%")
    }
}

/// Weighted achievement over the scores the student actually has.
pub fn base_achievement(row: &StudentRow, policy: &Policy) -> f64 {
    let (wm, wf, wp) = policy.weight_fractions();
    let mut base = row.midterm_score / policy.midterm_max * wm;
    if !row.final_score_missing {
        base += row.final_score / policy.final_max * wf;
    }
    if !row.performance_score_missing {
        base += row.performance_score / policy.performance_max * wp;
    }
    base
}

pub fn score_guidance(row: &StudentRow, policy: &Policy) -> ScoreGuidance {
    let case = GuidanceCase::for_row(row);
    let (_, wf, wp) = policy.weight_fractions();
    let threshold = policy.threshold;
    let base = base_achievement(row, policy);
    let needed = threshold - base;

    match case {
        GuidanceCase::MidtermMissing => ScoreGuidance::MidtermUnavailable,
        GuidanceCase::BothPresent if base >= threshold => ScoreGuidance::ThresholdMet { threshold },
        GuidanceCase::BothPresent => ScoreGuidance::BelowThreshold { threshold },
        GuidanceCase::FinalMissing => {
            ScoreGuidance::FinalNeeded(Requirement::compute(needed, wf, policy.final_max))
        }
        GuidanceCase::PerformanceMissing => ScoreGuidance::PerformanceNeeded(
            Requirement::compute(needed, wp, policy.performance_max),
        ),
        GuidanceCase::BothMissing => ScoreGuidance::Scenarios {
            final_with_full_performance: Requirement::compute(
                (threshold - (base + wp)).max(0.0),
                wf,
                policy.final_max,
            ),
            performance_with_full_final: Requirement::compute(
                (threshold - (base + wf)).max(0.0),
                wp,
                policy.performance_max,
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(midterm: f64, final_score: Option<f64>, performance: Option<f64>) -> StudentRow {
        StudentRow {
            student_id: "s1".to_string(),
            midterm_score: midterm,
            final_score: final_score.unwrap_or(0.0),
            performance_score: performance.unwrap_or(0.0),
            midterm_score_missing: false,
            final_score_missing: final_score.is_none(),
            performance_score_missing: performance.is_none(),
            assignment_count: 5.0,
            question_count: 2.0,
            participation_level: "중".to_string(),
            participation_level_num: 1.0,
            absence_count: 0.0,
            risk_proba: 0.5,
            extra: Vec::new(),
        }
    }

    #[test]
    fn cases_cover_every_flag_combination() {
        assert_eq!(GuidanceCase::from_flags(true, true, true), GuidanceCase::MidtermMissing);
        assert_eq!(GuidanceCase::from_flags(true, false, false), GuidanceCase::MidtermMissing);
        assert_eq!(GuidanceCase::from_flags(false, false, false), GuidanceCase::BothPresent);
        assert_eq!(GuidanceCase::from_flags(false, true, false), GuidanceCase::FinalMissing);
        assert_eq!(GuidanceCase::from_flags(false, false, true), GuidanceCase::PerformanceMissing);
        assert_eq!(GuidanceCase::from_flags(false, true, true), GuidanceCase::BothMissing);
    }

    #[test]
    fn missing_midterm_cannot_be_projected() {
        let mut student = row(80.0, Some(70.0), Some(60.0));
        student.midterm_score_missing = true;
        let guidance = score_guidance(&student, &Policy::default());
        assert_eq!(guidance, ScoreGuidance::MidtermUnavailable);
        assert!(guidance.to_string().contains("Midterm score unavailable"));
    }

    #[test]
    fn complete_scores_report_threshold_status() {
        let policy = Policy::default();
        let met = score_guidance(&row(50.0, Some(40.0), Some(30.0)), &policy);
        assert_eq!(met, ScoreGuidance::ThresholdMet { threshold: 0.40 });
        assert_eq!(
            met.to_string(),
            "Current scores already meet the 40% achievement threshold."
        );

        let below = score_guidance(&row(20.0, Some(30.0), Some(40.0)), &policy);
        assert_eq!(below, ScoreGuidance::BelowThreshold { threshold: 0.40 });
        assert!(below.to_string().contains("below the 40%"));
    }

    #[test]
    fn final_missing_projects_minimum_final() {
        // base = 0.3*0.4 + 0.5*0.2 = 0.22; needed 0.18 / 0.4 * 100 = 45
        let guidance = score_guidance(&row(30.0, None, Some(50.0)), &Policy::default());
        match guidance {
            ScoreGuidance::FinalNeeded(Requirement::Score { required, max }) => {
                assert!((required - 45.0).abs() < 1e-9);
                assert_eq!(max, 100.0);
            }
            other => panic!("expected final requirement, got {other:?}"),
        }
        assert_eq!(
            guidance.to_string(),
            "Needs at least 45.0 (/100) on the final exam."
        );
    }

    #[test]
    fn performance_missing_clamps_to_maximum() {
        // base = 0.0; needed 0.4 / 0.2 * 100 = 200, clamped to 100
        let guidance = score_guidance(&row(0.0, Some(0.0), None), &Policy::default());
        assert_eq!(
            guidance,
            ScoreGuidance::PerformanceNeeded(Requirement::Score {
                required: 100.0,
                max: 100.0
            })
        );
    }

    #[test]
    fn already_met_with_missing_component_needs_zero() {
        let guidance = score_guidance(&row(100.0, Some(100.0), None), &Policy::default());
        assert_eq!(
            guidance,
            ScoreGuidance::PerformanceNeeded(Requirement::Score {
                required: 0.0,
                max: 100.0
            })
        );
    }

    #[test]
    fn both_missing_offers_two_scenarios() {
        // base = 0.1*0.4 = 0.04
        // full performance: 0.24 -> needs 0.16/0.4*100 = 40 on final
        // full final: 0.44 -> needs nothing on performance
        let guidance = score_guidance(&row(10.0, None, None), &Policy::default());
        match &guidance {
            ScoreGuidance::Scenarios {
                final_with_full_performance: Requirement::Score { required: on_final, .. },
                performance_with_full_final: Requirement::Score { required: on_performance, .. },
            } => {
                assert!((on_final - 40.0).abs() < 1e-9);
                assert_eq!(*on_performance, 0.0);
            }
            other => panic!("expected two scenarios, got {other:?}"),
        }
        let text = guidance.to_string();
        assert!(text.starts_with("[Scenarios]"));
        assert!(text.contains("at least 40.0 (/100) on the final exam"));
        assert!(text.contains("at least 0.0 (/100) on the performance assessment"));
    }

    #[test]
    fn zero_weight_is_unattainable() {
        let policy = Policy {
            midterm_weight: 50.0,
            final_weight: 50.0,
            performance_weight: 0.0,
            ..Policy::default()
        };
        let guidance = score_guidance(&row(10.0, Some(10.0), None), &policy);
        assert_eq!(
            guidance,
            ScoreGuidance::PerformanceNeeded(Requirement::Unattainable { max: 100.0 })
        );
        assert!(guidance
            .to_string()
            .contains("cannot be satisfied by this field alone"));
    }

    #[test]
    fn custom_maxima_scale_requirement() {
        let policy = Policy {
            final_max: 50.0,
            ..Policy::default()
        };
        // base = 0.5*0.4 + 0.0 = 0.2 (performance 0 of 100); needed 0.2/0.4*50 = 25
        let guidance = score_guidance(&row(50.0, None, Some(0.0)), &policy);
        assert_eq!(guidance.to_string(), "Needs at least 25.0 (/50) on the final exam.");
    }

    #[test]
    fn threshold_label_keeps_fractional_percent() {
        assert_eq!(percent_label(0.4), "40%");
        assert_eq!(percent_label(0.455), "45.5%");
    }

    fn policy_strategy() -> impl Strategy<Value = Policy> {
        (0.01f64..0.99, 0.0f64..=100.0, 0.0f64..=1.0, 1.0f64..200.0, 1.0f64..200.0, 1.0f64..200.0)
            .prop_map(|(threshold, wm, split, mmax, fmax, pmax)| {
                let wf = (100.0 - wm) * split;
                Policy {
                    threshold,
                    midterm_max: mmax,
                    midterm_weight: wm,
                    final_max: fmax,
                    final_weight: wf,
                    performance_max: pmax,
                    performance_weight: 100.0 - wm - wf,
                    total_classes: 160,
                }
            })
    }

    proptest! {
        #[test]
        fn guidance_is_never_empty(
            policy in policy_strategy(),
            midterm in 0.0f64..=200.0,
            final_score in proptest::option::of(0.0f64..=200.0),
            performance in proptest::option::of(0.0f64..=200.0),
            midterm_missing in any::<bool>(),
        ) {
            let mut student = row(midterm, final_score, performance);
            student.midterm_score_missing = midterm_missing;
            let text = score_guidance(&student, &policy).to_string();
            prop_assert!(!text.is_empty());
        }

        #[test]
        fn required_scores_stay_within_bounds(
            needed in -1.0f64..=1.0,
            weight in 0.0f64..=1.0,
            max in 1.0f64..=500.0,
        ) {
            match Requirement::compute(needed, weight, max) {
                Requirement::Score { required, .. } => {
                    prop_assert!((0.0..=max).contains(&required));
                }
                Requirement::Unattainable { .. } => prop_assert!(weight <= 0.0 && needed > 0.0),
            }
        }
    }
}
