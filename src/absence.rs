use crate::policy::Policy;

/// Maximum absences permitted in the term: a third of all sessions, rounded down.
pub fn absence_limit(policy: &Policy) -> i64 {
    policy.total_classes.div_euclid(3)
}

/// Absences left before the limit. Negative once the student is past it.
///
/// Counts outside the `i64` range saturate instead of overflowing.
pub fn remaining_allowance(policy: &Policy, absence_count: f64) -> i64 {
    absence_limit(policy).saturating_sub(absence_count.trunc() as i64)
}
