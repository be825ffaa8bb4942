use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;

use crate::persistence::{ResultExt, SqliteRepositoryBase};
use classledger_domain::scheduling::{PreferenceRepository, StudentSchedulePreferences};
use classledger_domain::shared::{DomainError, StudentId, TeacherId};

#[derive(FromRow)]
struct PreferenceRow {
    student_id: String,
    preferred_days: String,
    preferred_start_hour: Option<i64>,
    preferred_end_hour: Option<i64>,
    preferred_teacher_ids: String,
    avoided_teacher_ids: String,
    min_class_size: Option<i64>,
    max_class_size: Option<i64>,
    updated_at: DateTime<Utc>,
}

fn to_u32(value: Option<i64>, field: &str) -> Result<Option<u32>, DomainError> {
    value
        .map(|v| {
            u32::try_from(v)
                .map_err(|_| DomainError::DataIntegrity(format!("Invalid {}: {}", field, v)))
        })
        .transpose()
}

impl PreferenceRow {
    fn into_domain(self) -> Result<StudentSchedulePreferences, DomainError> {
        let preferred_days: Vec<Weekday> =
            serde_json::from_str(&self.preferred_days).map_repo_error("Decode preferred days")?;
        let preferred_teacher_ids: Vec<TeacherId> = serde_json::from_str(&self.preferred_teacher_ids)
            .map_repo_error("Decode preferred teachers")?;
        let avoided_teacher_ids: Vec<TeacherId> = serde_json::from_str(&self.avoided_teacher_ids)
            .map_repo_error("Decode avoided teachers")?;

        Ok(StudentSchedulePreferences {
            student_id: StudentId::from_string(&self.student_id),
            preferred_days,
            preferred_start_hour: to_u32(self.preferred_start_hour, "preferred start hour")?,
            preferred_end_hour: to_u32(self.preferred_end_hour, "preferred end hour")?,
            preferred_teacher_ids,
            avoided_teacher_ids,
            min_class_size: to_u32(self.min_class_size, "minimum class size")?,
            max_class_size: to_u32(self.max_class_size, "maximum class size")?,
            updated_at: self.updated_at,
        })
    }
}

pub struct SqlitePreferenceRepository {
    base: SqliteRepositoryBase,
}

impl SqlitePreferenceRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self {
            base: SqliteRepositoryBase::new(pool),
        }
    }
}

#[async_trait]
impl PreferenceRepository for SqlitePreferenceRepository {
    async fn find(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<StudentSchedulePreferences>, DomainError> {
        let row: Option<PreferenceRow> = self
            .base
            .fetch_optional(
                sqlx::query_as(
                    r#"
                    SELECT student_id, preferred_days, preferred_start_hour, preferred_end_hour,
                           preferred_teacher_ids, avoided_teacher_ids, min_class_size,
                           max_class_size, updated_at
                    FROM schedule_preferences WHERE student_id = ?1
                    "#,
                )
                .bind(student_id.as_str()),
                "Find schedule preferences",
            )
            .await?;
        row.map(PreferenceRow::into_domain).transpose()
    }

    async fn save(&self, preferences: &StudentSchedulePreferences) -> Result<(), DomainError> {
        let days = serde_json::to_string(&preferences.preferred_days)
            .map_repo_error("Encode preferred days")?;
        let preferred = serde_json::to_string(&preferences.preferred_teacher_ids)
            .map_repo_error("Encode preferred teachers")?;
        let avoided = serde_json::to_string(&preferences.avoided_teacher_ids)
            .map_repo_error("Encode avoided teachers")?;

        self.base
            .execute(
                sqlx::query(
                    r#"
                    INSERT INTO schedule_preferences (
                        student_id, preferred_days, preferred_start_hour, preferred_end_hour,
                        preferred_teacher_ids, avoided_teacher_ids, min_class_size,
                        max_class_size, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(student_id) DO UPDATE SET
                        preferred_days = excluded.preferred_days,
                        preferred_start_hour = excluded.preferred_start_hour,
                        preferred_end_hour = excluded.preferred_end_hour,
                        preferred_teacher_ids = excluded.preferred_teacher_ids,
                        avoided_teacher_ids = excluded.avoided_teacher_ids,
                        min_class_size = excluded.min_class_size,
                        max_class_size = excluded.max_class_size,
                        updated_at = excluded.updated_at
                    "#,
                )
                .bind(preferences.student_id.as_str())
                .bind(days)
                .bind(preferences.preferred_start_hour.map(i64::from))
                .bind(preferences.preferred_end_hour.map(i64::from))
                .bind(preferred)
                .bind(avoided)
                .bind(preferences.min_class_size.map(i64::from))
                .bind(preferences.max_class_size.map(i64::from))
                .bind(preferences.updated_at),
                "Save schedule preferences",
            )
            .await?;
        Ok(())
    }
}
