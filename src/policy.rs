use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::PolicyError;

const REQUIRED_KEYS: [&str; 8] = [
    "threshold",
    "midterm_max",
    "midterm_weight",
    "final_max",
    "final_weight",
    "performance_max",
    "performance_weight",
    "total_classes",
];

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Grading policy for one batch. Weights are percentages, `threshold` is a fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Policy {
    pub threshold: f64,
    pub midterm_max: f64,
    pub midterm_weight: f64,
    pub final_max: f64,
    pub final_weight: f64,
    pub performance_max: f64,
    pub performance_weight: f64,
    pub total_classes: i64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            threshold: 0.40,
            midterm_max: 100.0,
            midterm_weight: 40.0,
            final_max: 100.0,
            final_weight: 40.0,
            performance_max: 100.0,
            performance_weight: 20.0,
            total_classes: 160,
        }
    }
}

impl Policy {
    pub fn validate(self) -> Result<Self, PolicyError> {
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(PolicyError::ThresholdOutOfRange(self.threshold));
        }

        for (field, value) in [
            ("midterm_max", self.midterm_max),
            ("final_max", self.final_max),
            ("performance_max", self.performance_max),
        ] {
            if !(value > 0.0) {
                return Err(PolicyError::NonPositiveMax { field, value });
            }
        }

        let sum = self.midterm_weight + self.final_weight + self.performance_weight;
        if !((sum - 100.0).abs() <= WEIGHT_TOLERANCE) {
            return Err(PolicyError::WeightSum(sum));
        }

        for (field, value) in [
            ("midterm_weight", self.midterm_weight),
            ("final_weight", self.final_weight),
            ("performance_weight", self.performance_weight),
        ] {
            if value < 0.0 {
                return Err(PolicyError::NegativeWeight { field, value });
            }
        }

        if self.total_classes <= 0 {
            return Err(PolicyError::NonPositiveTotalClasses(self.total_classes));
        }

        Ok(self)
    }

    /// Weights as fractions of 1, in midterm/final/performance order.
    pub fn weight_fractions(&self) -> (f64, f64, f64) {
        (
            self.midterm_weight / 100.0,
            self.final_weight / 100.0,
            self.performance_weight / 100.0,
        )
    }
}

pub fn parse_and_validate(raw: &str) -> Result<Policy, PolicyError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| PolicyError::Malformed(err.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| PolicyError::Malformed("expected a JSON object".to_string()))?;
    from_object(object)
}

pub fn from_object(object: &Map<String, Value>) -> Result<Policy, PolicyError> {
    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| !object.contains_key(**key))
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PolicyError::MissingKeys(missing));
    }

    let policy = Policy {
        threshold: number(object, "threshold")?,
        midterm_max: number(object, "midterm_max")?,
        midterm_weight: number(object, "midterm_weight")?,
        final_max: number(object, "final_max")?,
        final_weight: number(object, "final_weight")?,
        performance_max: number(object, "performance_max")?,
        performance_weight: number(object, "performance_weight")?,
        total_classes: number(object, "total_classes")?.trunc() as i64,
    };

    policy.validate()
}

fn number(object: &Map<String, Value>, key: &str) -> Result<f64, PolicyError> {
    let parsed = match object.get(key) {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|value| value.is_finite())
        .ok_or_else(|| PolicyError::NotNumeric {
            key: key.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_json(weights: (f64, f64, f64)) -> String {
        format!(
            r#"{{"threshold":0.4,"midterm_max":100,"midterm_weight":{},"final_max":100,
            "final_weight":{},"performance_max":100,"performance_weight":{},"total_classes":160}}"#,
            weights.0, weights.1, weights.2
        )
    }

    #[test]
    fn parses_default_shaped_policy() {
        let policy = parse_and_validate(&policy_json((40.0, 40.0, 20.0))).unwrap();
        assert_eq!(policy, Policy::default());
    }

    #[test]
    fn accepts_numeric_strings() {
        let raw = r#"{"threshold":"0.5","midterm_max":"50","midterm_weight":"30",
            "final_max":100,"final_weight":50,"performance_max":20,"performance_weight":20,
            "total_classes":"90"}"#;
        let policy = parse_and_validate(raw).unwrap();
        assert_eq!(policy.threshold, 0.5);
        assert_eq!(policy.midterm_max, 50.0);
        assert_eq!(policy.total_classes, 90);
    }

    #[test]
    fn rejects_weights_summing_to_99() {
        let err = parse_and_validate(&policy_json((40.0, 40.0, 19.0))).unwrap_err();
        assert!(matches!(err, PolicyError::WeightSum(sum) if (sum - 99.0).abs() < 1e-9));
    }

    #[test]
    fn weight_sum_tolerance_is_one_millionth() {
        assert!(parse_and_validate(&policy_json((40.0, 40.0, 20.0000005))).is_ok());
        assert!(parse_and_validate(&policy_json((33.34, 33.33, 33.33))).is_ok());
        assert!(matches!(
            parse_and_validate(&policy_json((40.0, 40.0, 20.00001))),
            Err(PolicyError::WeightSum(_))
        ));
    }

    #[test]
    fn lists_every_missing_key() {
        let err = parse_and_validate(r#"{"threshold":0.4,"midterm_max":100}"#).unwrap_err();
        match err {
            PolicyError::MissingKeys(keys) => {
                assert_eq!(keys.len(), 6);
                assert_eq!(keys[0], "midterm_weight");
                assert!(keys.contains(&"total_classes".to_string()));
            }
            other => panic!("expected missing keys, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            parse_and_validate("{threshold: 0.4"),
            Err(PolicyError::Malformed(_))
        ));
        assert!(matches!(
            parse_and_validate("[1, 2, 3]"),
            Err(PolicyError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_values() {
        let raw = policy_json((40.0, 40.0, 20.0)).replace("0.4", "\"high\"");
        assert!(matches!(
            parse_and_validate(&raw),
            Err(PolicyError::NotNumeric { key }) if key == "threshold"
        ));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let base = Policy::default();

        for threshold in [0.0, 1.0, -0.2, 1.5] {
            let err = Policy { threshold, ..base }.validate().unwrap_err();
            assert!(matches!(err, PolicyError::ThresholdOutOfRange(_)));
        }

        let err = Policy {
            final_max: 0.0,
            ..base
        }
        .validate()
        .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::NonPositiveMax {
                field: "final_max",
                ..
            }
        ));

        let err = Policy {
            midterm_weight: -10.0,
            final_weight: 90.0,
            ..base
        }
        .validate()
        .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::NegativeWeight {
                field: "midterm_weight",
                ..
            }
        ));

        let err = Policy {
            total_classes: 0,
            ..base
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, PolicyError::NonPositiveTotalClasses(0)));
    }

    #[test]
    fn weight_fractions_divide_by_100() {
        let (wm, wf, wp) = Policy::default().weight_fractions();
        assert!((wm - 0.4).abs() < 1e-12);
        assert!((wf - 0.4).abs() < 1e-12);
        assert!((wp - 0.2).abs() < 1e-12);
    }
}
