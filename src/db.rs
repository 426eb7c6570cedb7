use anyhow::Context;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::enrich::EnrichedBatch;
use crate::output::ReportTable;
use crate::policy::Policy;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Persist one enriched batch. Either every row is stored or none are.
pub async fn store_batch(
    pool: &PgPool,
    report_filename: &str,
    policy: &Policy,
    batch: &EnrichedBatch,
) -> anyhow::Result<Uuid> {
    let batch_id = Uuid::new_v4();
    let records = ReportTable::full(batch).json_records();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO risk_report.batches (id, report_filename, policy, row_count)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(batch_id)
    .bind(report_filename)
    .bind(Json(policy))
    .bind(i32::try_from(batch.rows.len()).context("batch too large to store")?)
    .execute(&mut *tx)
    .await?;

    for (row, record) in batch.rows.iter().zip(records) {
        sqlx::query(
            r#"
            INSERT INTO risk_report.enriched_rows
            (id, batch_id, student_id, risk_proba, risk_level, action, top_reasons,
             score_guidance, participation_risk_score, participation_flag,
             absence_limit, remaining_absence_allowance, record)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(batch_id)
        .bind(&row.student.student_id)
        .bind(row.student.risk_proba)
        .bind(row.risk_level.as_str())
        .bind(row.action())
        .bind(&row.top_reasons)
        .bind(&row.score_guidance)
        .bind(i16::from(row.participation_risk_score))
        .bind(row.participation_flag)
        .bind(row.absence_limit)
        .bind(row.remaining_absence_allowance)
        .bind(Json(record))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to store student {}", row.student.student_id))?;
    }

    tx.commit().await?;
    Ok(batch_id)
}

/// Risk-level counts for a stored batch, highest tier first.
pub async fn fetch_level_counts(pool: &PgPool, batch_id: Uuid) -> anyhow::Result<Vec<(String, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT risk_level, COUNT(*) AS students
        FROM risk_report.enriched_rows
        WHERE batch_id = $1
        GROUP BY risk_level
        ORDER BY CASE risk_level WHEN 'High' THEN 0 WHEN 'Medium' THEN 1 ELSE 2 END
        "#,
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("risk_level"), row.get("students")))
        .collect())
}
