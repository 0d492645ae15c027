//! Database module
//!
//! Read-only access to the admin tool's database. Schema and migrations are
//! owned by the admin tool, so none are run from here.

pub mod queries;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::services::sources::{AssignmentSource, HolidayCalendar};
use crate::types::Assignment;

/// Create a database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Assignment source backed by the `assignments` table
pub struct PgAssignmentSource {
    pool: PgPool,
}

impl PgAssignmentSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssignmentSource for PgAssignmentSource {
    async fn active_assignments_for(&self, worker_id: Uuid, date: NaiveDate) -> Result<Vec<Assignment>> {
        queries::assignment::list_active_assignments(&self.pool, worker_id, date).await
    }
}

/// Holiday calendar backed by the `holidays` table
pub struct PgHolidayCalendar {
    pool: PgPool,
}

impl PgHolidayCalendar {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HolidayCalendar for PgHolidayCalendar {
    async fn is_holiday(&self, day: u32, month: u32, year: i32) -> Result<bool> {
        queries::holiday::is_holiday(&self.pool, day, month, year).await
    }
}
