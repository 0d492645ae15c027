//! Holiday database queries

use anyhow::Result;
use sqlx::PgPool;

/// Whether the admin tool has a holiday on the given date
pub async fn is_holiday(pool: &PgPool, day: u32, month: u32, year: i32) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM holidays
            WHERE day = $1 AND month = $2 AND year = $3
        )
        "#
    )
    .bind(day as i32)
    .bind(month as i32)
    .bind(year)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
