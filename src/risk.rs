use serde::Serialize;

pub const HIGH_RISK_CUTOFF: f64 = 0.70;
pub const MEDIUM_RISK_CUTOFF: f64 = 0.40;

/// Tier derived from the classifier probability. Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_RISK_CUTOFF {
            RiskLevel::High
        } else if probability >= MEDIUM_RISK_CUTOFF {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }

    /// Recommended intervention for the tier.
    pub fn action(&self) -> &'static str {
        match self {
            RiskLevel::High => "Immediate counseling and remedial intervention required",
            RiskLevel::Medium => "Monitor assignment participation and provide proactive guidance",
            RiskLevel::Low => "Maintain routine observation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tiers_follow_expected_boundaries() {
        assert_eq!(RiskLevel::from_probability(0.70), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.6999), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.40), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.3999), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(1.0), RiskLevel::High);
    }

    #[test]
    fn every_tier_has_a_distinct_action() {
        let actions = [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low].map(|l| l.action());
        assert_ne!(actions[0], actions[1]);
        assert_ne!(actions[1], actions[2]);
        assert!(actions.iter().all(|action| !action.is_empty()));
    }

    proptest! {
        #[test]
        fn tier_is_monotonic_in_probability(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(RiskLevel::from_probability(low) <= RiskLevel::from_probability(high));
        }
    }
}
