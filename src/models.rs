use std::fmt;

use serde_json::Value;

use crate::risk::RiskLevel;

/// A single rendered value in a report table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Integer(i64),
    Flag(bool),
    Empty,
}

impl Cell {
    /// JSON form of the cell. Empty cells and non-finite numbers become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Text(text) => Value::String(text.clone()),
            Cell::Number(number) => serde_json::Number::from_f64(*number)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Integer(number) => Value::from(*number),
            Cell::Flag(flag) => Value::from(u8::from(*flag)),
            Cell::Empty => Value::Null,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Number(number) if number.is_finite() => write!(f, "{number}"),
            Cell::Number(_) | Cell::Empty => Ok(()),
            Cell::Integer(number) => write!(f, "{number}"),
            Cell::Flag(flag) => write!(f, "{}", u8::from(*flag)),
        }
    }
}

/// One preprocessed student record: imputed numbers plus the missing flags captured
/// before imputation.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRow {
    pub student_id: String,
    pub midterm_score: f64,
    pub final_score: f64,
    pub performance_score: f64,
    pub midterm_score_missing: bool,
    pub final_score_missing: bool,
    pub performance_score_missing: bool,
    pub assignment_count: f64,
    pub question_count: f64,
    pub participation_level: String,
    pub participation_level_num: f64,
    pub absence_count: f64,
    pub risk_proba: f64,
    /// Every other input column, keyed by header, in input order.
    pub extra: Vec<(String, Cell)>,
}

impl StudentRow {
    /// Plain mean of the three scores after imputation, rounded to one decimal place.
    pub fn achievement_rate(&self) -> f64 {
        let mean = (self.midterm_score + self.final_score + self.performance_score) / 3.0;
        (mean * 10.0).round() / 10.0
    }

    pub fn cell(&self, column: &str) -> Option<Cell> {
        let cell = match column {
            "student_id" => Cell::Text(self.student_id.clone()),
            "midterm_score" => Cell::Number(self.midterm_score),
            "final_score" => Cell::Number(self.final_score),
            "performance_score" => Cell::Number(self.performance_score),
            "midterm_score_missing" => Cell::Flag(self.midterm_score_missing),
            "final_score_missing" => Cell::Flag(self.final_score_missing),
            "performance_score_missing" => Cell::Flag(self.performance_score_missing),
            "assignment_count" => Cell::Number(self.assignment_count),
            "question_count" => Cell::Number(self.question_count),
            "participation_level" => Cell::Text(self.participation_level.clone()),
            "participation_level_num" => Cell::Number(self.participation_level_num),
            "achievement_rate" => Cell::Number(self.achievement_rate()),
            "absence_count" => Cell::Number(self.absence_count),
            "risk_proba" => Cell::Number(self.risk_proba),
            other => {
                return self
                    .extra
                    .iter()
                    .find(|(name, _)| name == other)
                    .map(|(_, cell)| cell.clone())
            }
        };
        Some(cell)
    }
}

/// A student row with every report column attached.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub student: StudentRow,
    pub risk_level: RiskLevel,
    pub participation_risk_score: u8,
    pub participation_flag: bool,
    pub absence_limit: i64,
    pub remaining_absence_allowance: i64,
    pub score_guidance: String,
    pub top_reasons: String,
}

impl EnrichedRow {
    pub fn action(&self) -> &'static str {
        self.risk_level.action()
    }

    pub fn cell(&self, column: &str) -> Option<Cell> {
        let cell = match column {
            "risk_level" => Cell::Text(self.risk_level.as_str().to_string()),
            "action" => Cell::Text(self.action().to_string()),
            "participation_risk_score" => Cell::Integer(i64::from(self.participation_risk_score)),
            "participation_flag" => Cell::Flag(self.participation_flag),
            "absence_limit" => Cell::Integer(self.absence_limit),
            "remaining_absence_allowance" => Cell::Integer(self.remaining_absence_allowance),
            "score_guidance" => Cell::Text(self.score_guidance.clone()),
            "top_reasons" => Cell::Text(self.top_reasons.clone()),
            other => return self.student.cell(other),
        };
        Some(cell)
    }
}
