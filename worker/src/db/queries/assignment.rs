//! Assignment database queries (tables owned by the admin tool)

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

use crate::types::{Assignment, AssignmentStatus, AssignmentType, ClientProfile};

/// Assignment joined with its client's name and address
#[derive(Debug, Clone, FromRow)]
struct AssignmentRow {
    id: Uuid,
    worker_id: Uuid,
    user_id: Uuid,
    assignment_type: String,
    schedule: Option<serde_json::Value>,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    status: String,
    first_name: Option<String>,
    last_name: Option<String>,
    address: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
}

impl AssignmentRow {
    fn into_assignment(self) -> Option<Assignment> {
        let Some(assignment_type) = AssignmentType::parse(&self.assignment_type) else {
            warn!(
                "Assignment {} has unknown type '{}', skipping",
                self.id, self.assignment_type
            );
            return None;
        };

        Some(Assignment {
            id: self.id,
            worker_id: self.worker_id,
            user_id: self.user_id,
            assignment_type,
            schedule: self.schedule.unwrap_or(serde_json::Value::Null),
            start_date: self.start_date,
            end_date: self.end_date,
            status: AssignmentStatus::parse(&self.status),
            client: ClientProfile {
                first_name: self.first_name.unwrap_or_default(),
                last_name: self.last_name.unwrap_or_default(),
                address: self.address.unwrap_or_default(),
                postal_code: self.postal_code.unwrap_or_default(),
                city: self.city.unwrap_or_default(),
            },
        })
    }
}

/// Active assignments of a worker on a date, oldest first
pub async fn list_active_assignments(
    pool: &PgPool,
    worker_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<Assignment>> {
    let rows = sqlx::query_as::<_, AssignmentRow>(
        r#"
        SELECT
            a.id, a.worker_id, a.user_id, a.assignment_type, a.schedule,
            a.start_date, a.end_date, a.status,
            u.name AS first_name, u.surname AS last_name,
            u.address, u.postal_code, u.city
        FROM assignments a
        LEFT JOIN users u ON u.id = a.user_id
        WHERE a.worker_id = $1
          AND a.status = 'active'
          AND a.start_date <= $2
          AND (a.end_date IS NULL OR a.end_date >= $2)
        ORDER BY a.start_date, a.id
        "#
    )
    .bind(worker_id)
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(AssignmentRow::into_assignment).collect())
}
