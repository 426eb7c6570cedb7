use thiserror::Error;

/// Rejections raised while parsing or validating a grading policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy is not valid JSON: {0}")]
    Malformed(String),
    #[error("policy is missing required keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
    #[error("policy key '{key}' must be a number")]
    NotNumeric { key: String },
    #[error("threshold must be strictly between 0 and 1 (got {0})")]
    ThresholdOutOfRange(f64),
    #[error("{field} must be greater than 0 (got {value})")]
    NonPositiveMax { field: &'static str, value: f64 },
    #[error("weights must sum to 100 (got {0})")]
    WeightSum(f64),
    #[error("{field} cannot be negative (got {value})")]
    NegativeWeight { field: &'static str, value: f64 },
    #[error("total_classes must be at least 1 (got {0})")]
    NonPositiveTotalClasses(i64),
}

/// Problems with the shape of an uploaded batch. Any of these fails the whole batch.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("student_id '{0}' appears more than once in the batch")]
    DuplicateStudentId(String),
    #[error("risk_proba for student '{student_id}' must be a number in [0, 1] (got '{value}')")]
    InvalidProbability { student_id: String, value: String },
    #[error("unable to read batch: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("configuration error: {0}")]
    Configuration(#[from] PolicyError),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}
