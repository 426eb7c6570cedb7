use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::enrich::EnrichedBatch;
use crate::models::Cell;

/// Columns moved to the front of a full report.
pub const PREFERRED_COLUMNS: [&str; 9] = [
    "student_id",
    "risk_proba",
    "risk_level",
    "top_reasons",
    "score_guidance",
    "action",
    "absence_limit",
    "participation_risk_score",
    "participation_flag",
];

/// The only columns kept in a compact report.
pub const COMPACT_COLUMNS: [&str; 7] = [
    "student_id",
    "risk_level",
    "risk_proba",
    "top_reasons",
    "score_guidance",
    "action",
    "remaining_absence_allowance",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Preferred columns first (when present), then every other column in its original order.
pub fn order_columns(columns: &[String]) -> Vec<String> {
    let mut ordered: Vec<String> = PREFERRED_COLUMNS
        .iter()
        .filter(|preferred| columns.iter().any(|column| column == *preferred))
        .map(|preferred| preferred.to_string())
        .collect();
    ordered.extend(
        columns
            .iter()
            .filter(|column| !PREFERRED_COLUMNS.contains(&column.as_str()))
            .cloned(),
    );
    ordered
}

/// Rendered report, ready for a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn full(batch: &EnrichedBatch) -> Self {
        Self::select(batch, order_columns(&batch.columns))
    }

    pub fn compact(batch: &EnrichedBatch) -> Self {
        let columns = COMPACT_COLUMNS
            .iter()
            .filter(|column| batch.columns.iter().any(|existing| existing == *column))
            .map(|column| column.to_string())
            .collect();
        Self::select(batch, columns)
    }

    fn select(batch: &EnrichedBatch, columns: Vec<String>) -> Self {
        let rows = batch
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.cell(column).unwrap_or(Cell::Empty))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// CSV with a UTF-8 BOM so spreadsheet tools pick up the Korean text.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writer.write_all("\u{feff}".as_bytes())?;
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// JSON envelope, flushed so a failed final write is reported rather than dropped.
    pub fn write_json<W: Write>(&self, mut writer: W, report_filename: &str) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut writer, &self.to_json(report_filename))?;
        writer.flush()?;
        Ok(())
    }

    pub fn json_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.clone(), cell.to_json()))
                    .collect();
                Value::Object(record)
            })
            .collect()
    }

    pub fn to_json(&self, report_filename: &str) -> Value {
        json!({
            "rows": self.rows.len(),
            "report_filename": report_filename,
            "data": self.json_records(),
        })
    }
}

pub fn report_filename(generated_at: DateTime<Local>, format: OutputFormat) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "prediction_report_{}_{}.{}",
        generated_at.format("%Y%m%d_%H%M%S"),
        &token[..8],
        format.extension()
    )
}

/// Write the report into `dir` under a fresh name and return the path.
pub fn write_report(
    table: &ReportTable,
    dir: &Path,
    format: OutputFormat,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create report directory {}", dir.display()))?;
    let filename = report_filename(Local::now(), format);
    let path = dir.join(&filename);
    let file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    match format {
        OutputFormat::Csv => table.write_csv(std::io::BufWriter::new(file))?,
        OutputFormat::Json => table.write_json(std::io::BufWriter::new(file), &filename)?,
    }

    Ok(path)
}
