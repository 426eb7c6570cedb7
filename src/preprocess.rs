use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::models::{Cell, StudentRow};
use crate::participation::quantile;

pub const SCORE_COLUMNS: [&str; 3] = ["midterm_score", "final_score", "performance_score"];

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "student_id",
    "assignment_count",
    "question_count",
    "participation_level",
    "absence_count",
    "risk_proba",
];

/// Numeric model features that are coerced and imputed when present but not required.
pub const OPTIONAL_NUMERIC_COLUMNS: [&str; 2] = ["night_study", "behavior_score"];

/// Value used for a numeric column with no observed values at all.
pub const ALL_MISSING_FILL: f64 = 0.0;

/// Encoding of the participation level; anything else is left for imputation.
pub fn encode_participation_level(level: &str) -> Option<f64> {
    match level {
        "상" => Some(2.0),
        "중" => Some(1.0),
        "하" => Some(0.0),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImputeStrategy {
    #[default]
    Median,
    Mean,
}

impl FromStr for ImputeStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "median" => Ok(Self::Median),
            "mean" => Ok(Self::Mean),
            other => Err(format!("unknown imputation strategy '{other}'")),
        }
    }
}

impl ImputeStrategy {
    fn center(&self, observed: &[f64]) -> Option<f64> {
        match self {
            ImputeStrategy::Median => quantile(observed, 0.5),
            ImputeStrategy::Mean if observed.is_empty() => None,
            ImputeStrategy::Mean => Some(observed.iter().sum::<f64>() / observed.len() as f64),
        }
    }

    /// Fill gaps with the batch center, or [`ALL_MISSING_FILL`] when nothing was observed.
    pub fn impute(&self, values: &[Option<f64>]) -> Vec<f64> {
        let observed: Vec<f64> = values.iter().flatten().copied().collect();
        let fill = self.center(&observed).unwrap_or(ALL_MISSING_FILL);
        values.iter().map(|value| value.unwrap_or(fill)).collect()
    }
}

/// Uploaded CSV as text cells, with trimmed headers and cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SchemaError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(index, header)| {
                let header = if index == 0 {
                    header.trim_start_matches('\u{feff}')
                } else {
                    header
                };
                header.trim().to_string()
            })
            .collect();

        let mut records = Vec::new();
        let mut truncated = 0usize;
        for result in reader.records() {
            let record = result?;
            let mut cells: Vec<String> = record.iter().map(|cell| cell.trim().to_string()).collect();
            if cells.len() > columns.len() {
                truncated += 1;
            }
            cells.resize(columns.len(), String::new());
            records.push(cells);
        }
        if truncated > 0 {
            warn!(records = truncated, "dropped fields beyond the header");
        }

        Ok(Self { columns, records })
    }

    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let file = std::fs::File::open(path).map_err(csv::Error::from)?;
        Self::from_reader(file)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    fn text_column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some(self.records.iter().map(|record| record[index].as_str()).collect())
    }

    /// Cells parsed as numbers. Blank or malformed cells become `None`; an absent column
    /// is all `None`.
    fn numeric_column(&self, name: &str) -> Vec<Option<f64>> {
        let Some(cells) = self.text_column(name) else {
            return vec![None; self.records.len()];
        };

        let mut coerced = 0usize;
        let values = cells
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    return None;
                }
                let parsed = cell.parse::<f64>().ok().filter(|value| value.is_finite());
                if parsed.is_none() {
                    coerced += 1;
                }
                parsed
            })
            .collect();
        if coerced > 0 {
            debug!(column = name, coerced, "coerced malformed numeric cells to missing");
        }
        values
    }
}

/// A preprocessed batch: typed rows plus the input column order.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBatch {
    pub source_columns: Vec<String>,
    pub rows: Vec<StudentRow>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor {
    pub strategy: ImputeStrategy,
}

impl Preprocessor {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self { strategy }
    }

    pub fn prepare(&self, table: &RawTable) -> Result<PreparedBatch, SchemaError> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| table.column_index(column).is_none())
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns(missing));
        }

        let table = dedupe_records(table);
        ensure_unique_ids(&table)?;
        let row_count = table.records.len();

        let raw_scores = SCORE_COLUMNS.map(|column| table.numeric_column(column));
        let missing_flags = raw_scores
            .clone()
            .map(|values| values.iter().map(Option::is_none).collect::<Vec<bool>>());
        let [midterm, final_score, performance] = raw_scores.map(|values| self.strategy.impute(&values));

        let assignment_count = self.strategy.impute(&table.numeric_column("assignment_count"));
        let question_count = self.strategy.impute(&table.numeric_column("question_count"));
        let absence_count = self.strategy.impute(&table.numeric_column("absence_count"));

        let levels = table.text_column("participation_level").unwrap_or_default();
        let encoded: Vec<Option<f64>> = levels
            .iter()
            .map(|level| encode_participation_level(level))
            .collect();
        let unknown = encoded.iter().filter(|value| value.is_none()).count();
        if unknown > 0 {
            warn!(rows = unknown, "unrecognized participation levels will be imputed");
        }
        let participation_level_num = self.strategy.impute(&encoded);

        let ids = table.text_column("student_id").unwrap_or_default();
        let probabilities = table.text_column("risk_proba").unwrap_or_default();

        let optional_numeric: Vec<(usize, Vec<f64>)> = OPTIONAL_NUMERIC_COLUMNS
            .iter()
            .filter_map(|column| table.column_index(column))
            .map(|index| {
                let values = table.numeric_column(&table.columns[index]);
                (index, self.strategy.impute(&values))
            })
            .collect();

        let consumed: Vec<usize> = REQUIRED_COLUMNS
            .iter()
            .chain(SCORE_COLUMNS.iter())
            .filter_map(|column| table.column_index(column))
            .collect();

        let mut rows = Vec::with_capacity(row_count);
        for index in 0..row_count {
            let risk_proba = parse_probability(ids[index], probabilities[index])?;

            let extra = table
                .columns
                .iter()
                .enumerate()
                .filter(|(column, _)| !consumed.contains(column))
                .map(|(column, name)| {
                    let cell = match optional_numeric.iter().find(|(at, _)| *at == column) {
                        Some((_, values)) => Cell::Number(values[index]),
                        None if table.records[index][column].is_empty() => Cell::Empty,
                        None => Cell::Text(table.records[index][column].clone()),
                    };
                    (name.clone(), cell)
                })
                .collect();

            rows.push(StudentRow {
                student_id: ids[index].to_string(),
                midterm_score: midterm[index],
                final_score: final_score[index],
                performance_score: performance[index],
                midterm_score_missing: missing_flags[0][index],
                final_score_missing: missing_flags[1][index],
                performance_score_missing: missing_flags[2][index],
                assignment_count: assignment_count[index],
                question_count: question_count[index],
                participation_level: levels[index].to_string(),
                participation_level_num: participation_level_num[index],
                absence_count: absence_count[index],
                risk_proba,
                extra,
            });
        }

        debug!(rows = rows.len(), strategy = ?self.strategy, "preprocessed batch");
        Ok(PreparedBatch {
            source_columns: table.columns.clone(),
            rows,
        })
    }
}

fn dedupe_records(table: &RawTable) -> RawTable {
    let mut seen: HashSet<&Vec<String>> = HashSet::new();
    let mut records = Vec::with_capacity(table.records.len());
    for record in &table.records {
        if seen.insert(record) {
            records.push(record.clone());
        }
    }

    let dropped = table.records.len() - records.len();
    if dropped > 0 {
        warn!(dropped, "dropped exact duplicate records");
    }

    RawTable {
        columns: table.columns.clone(),
        records,
    }
}

fn ensure_unique_ids(table: &RawTable) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for id in table.text_column("student_id").unwrap_or_default() {
        if !seen.insert(id) {
            return Err(SchemaError::DuplicateStudentId(id.to_string()));
        }
    }
    Ok(())
}

fn parse_probability(student_id: &str, cell: &str) -> Result<f64, SchemaError> {
    cell.parse::<f64>()
        .ok()
        .filter(|value| (0.0..=1.0).contains(value))
        .ok_or_else(|| SchemaError::InvalidProbability {
            student_id: student_id.to_string(),
            value: cell.to_string(),
        })
}
