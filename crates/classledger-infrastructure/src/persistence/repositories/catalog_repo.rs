use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::persistence::{ImmediateTransaction, ResultExt, SqliteRepositoryBase};
use classledger_domain::catalog::{
    Booking, BookingStatus, CandidateQuery, ClassCatalogRepository, ClassStatus, ScheduledClass,
    StudentProfile,
};
use classledger_domain::shared::{BookingId, ClassId, CourseId, DomainError, StudentId, TeacherId};

pub(crate) const CLASS_COLUMNS: &str = r#"
    id, course_id, level, unit, class_type, teacher_id, starts_at, duration_hours,
    capacity, enrolled, price_per_hour, status
"#;

#[derive(FromRow)]
pub(crate) struct ClassRow {
    id: String,
    course_id: String,
    level: i64,
    unit: i64,
    class_type: String,
    teacher_id: String,
    starts_at: DateTime<Utc>,
    duration_hours: f64,
    capacity: i64,
    enrolled: i64,
    price_per_hour: f64,
    status: String,
}

impl ClassRow {
    pub(crate) fn into_domain(self) -> Result<ScheduledClass, DomainError> {
        let int = |value: i64, field: &str| {
            i32::try_from(value).map_err(|_| {
                DomainError::DataIntegrity(format!("Class {} has invalid {}", self.id, field))
            })
        };
        let count = |value: i64, field: &str| {
            u32::try_from(value).map_err(|_| {
                DomainError::DataIntegrity(format!("Class {} has invalid {}", self.id, field))
            })
        };

        Ok(ScheduledClass {
            level: int(self.level, "level")?,
            unit: int(self.unit, "unit")?,
            capacity: count(self.capacity, "capacity")?,
            enrolled: count(self.enrolled, "enrolled")?,
            status: ClassStatus::from_str(&self.status)?,
            course_id: CourseId::from_string(&self.course_id),
            teacher_id: TeacherId::from_string(&self.teacher_id),
            starts_at: self.starts_at,
            duration_hours: self.duration_hours,
            price_per_hour: self.price_per_hour,
            class_type: self.class_type,
            id: ClassId::from_string(&self.id),
        })
    }
}

pub(crate) fn into_classes(rows: Vec<ClassRow>) -> Result<Vec<ScheduledClass>, DomainError> {
    rows.into_iter().map(ClassRow::into_domain).collect()
}

#[derive(FromRow)]
struct BookingRow {
    id: String,
    student_id: String,
    class_id: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_domain(self) -> Result<Booking, DomainError> {
        Ok(Booking {
            id: BookingId::from_string(&self.id),
            student_id: StudentId::from_string(&self.student_id),
            class_id: ClassId::from_string(&self.class_id),
            status: BookingStatus::from_str(&self.status)?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ProfileRow {
    student_id: String,
    course_id: String,
    level: i64,
    family_id: Option<String>,
}

impl ProfileRow {
    fn into_domain(self) -> Result<StudentProfile, DomainError> {
        let level = i32::try_from(self.level).map_err(|_| {
            DomainError::DataIntegrity(format!(
                "Student {} has invalid level {}",
                self.student_id, self.level
            ))
        })?;
        Ok(StudentProfile {
            student_id: StudentId::from_string(&self.student_id),
            course_id: CourseId::from_string(&self.course_id),
            level,
            family_id: self.family_id,
        })
    }
}

/// Insert a booking and take one seat, failing when the class is full.
pub(crate) async fn insert_booking(
    conn: &mut SqliteConnection,
    booking: &Booking,
) -> Result<(), DomainError> {
    let seated = sqlx::query(
        r#"
        UPDATE classes SET enrolled = enrolled + 1
        WHERE id = ?1 AND status = 'scheduled' AND enrolled < capacity
        "#,
    )
    .bind(booking.class_id.as_str())
    .execute(&mut *conn)
    .await
    .map_repo_error("Take class seat")?
    .rows_affected();

    if seated == 0 {
        return Err(DomainError::InvalidState(format!(
            "Class {} has no free seat",
            booking.class_id
        )));
    }

    sqlx::query(
        "INSERT INTO bookings (id, student_id, class_id, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(booking.id.as_str())
    .bind(booking.student_id.as_str())
    .bind(booking.class_id.as_str())
    .bind(booking.status.as_str())
    .bind(booking.created_at)
    .execute(conn)
    .await
    .map_repo_error("Insert booking")?;

    Ok(())
}

pub struct SqliteClassCatalogRepository {
    base: SqliteRepositoryBase,
}

impl SqliteClassCatalogRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self {
            base: SqliteRepositoryBase::new(pool),
        }
    }
}

#[async_trait]
impl ClassCatalogRepository for SqliteClassCatalogRepository {
    async fn save_class(&self, class: &ScheduledClass) -> Result<(), DomainError> {
        let query = format!(
            r#"
            INSERT INTO classes ({})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                level = excluded.level,
                unit = excluded.unit,
                class_type = excluded.class_type,
                teacher_id = excluded.teacher_id,
                starts_at = excluded.starts_at,
                duration_hours = excluded.duration_hours,
                capacity = excluded.capacity,
                enrolled = excluded.enrolled,
                price_per_hour = excluded.price_per_hour,
                status = excluded.status
            "#,
            CLASS_COLUMNS
        );
        self.base
            .execute(
                sqlx::query(&query)
                    .bind(class.id.as_str())
                    .bind(class.course_id.as_str())
                    .bind(i64::from(class.level))
                    .bind(i64::from(class.unit))
                    .bind(&class.class_type)
                    .bind(class.teacher_id.as_str())
                    .bind(class.starts_at)
                    .bind(class.duration_hours)
                    .bind(i64::from(class.capacity))
                    .bind(i64::from(class.enrolled))
                    .bind(class.price_per_hour)
                    .bind(class.status.as_str()),
                "Save class",
            )
            .await?;
        Ok(())
    }

    async fn find_class(&self, id: &ClassId) -> Result<Option<ScheduledClass>, DomainError> {
        let query = format!("SELECT {} FROM classes WHERE id = ?1", CLASS_COLUMNS);
        let row: Option<ClassRow> = self
            .base
            .fetch_optional(sqlx::query_as(&query).bind(id.as_str()), "Find class")
            .await?;
        row.map(ClassRow::into_domain).transpose()
    }

    async fn list_classes_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ScheduledClass>, DomainError> {
        let query = format!(
            "SELECT {} FROM classes WHERE starts_at >= ?1 AND starts_at < ?2 ORDER BY starts_at ASC",
            CLASS_COLUMNS
        );
        let rows: Vec<ClassRow> = self
            .base
            .fetch_all(sqlx::query_as(&query).bind(from).bind(to), "List classes")
            .await?;
        into_classes(rows)
    }

    async fn find_candidate_classes(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<ScheduledClass>, DomainError> {
        let sql = format!(
            r#"
            SELECT {} FROM classes c
            WHERE c.course_id = ?1
              AND c.level BETWEEN ?2 AND ?3
              AND c.status = 'scheduled'
              AND c.starts_at > ?4 AND c.starts_at <= ?5
              AND c.enrolled < c.capacity
              AND (?6 IS NULL OR c.id <> ?6)
              AND NOT EXISTS (
                  SELECT 1 FROM bookings b
                  WHERE b.class_id = c.id AND b.student_id = ?7 AND b.status <> 'cancelled'
              )
            ORDER BY c.starts_at ASC
            "#,
            CLASS_COLUMNS
        );
        let rows: Vec<ClassRow> = self
            .base
            .fetch_all(
                sqlx::query_as(&sql)
                    .bind(query.course_id.as_str())
                    .bind(i64::from(query.min_level))
                    .bind(i64::from(query.max_level))
                    .bind(query.starts_after)
                    .bind(query.starts_before)
                    .bind(query.exclude_class_id.as_ref().map(|id| id.as_str()))
                    .bind(query.student_id.as_str()),
                "Find candidate classes",
            )
            .await?;

        debug!(
            student_id = %query.student_id,
            candidates = rows.len(),
            "Candidate classes loaded"
        );
        into_classes(rows)
    }

    async fn create_booking(&self, booking: &Booking) -> Result<(), DomainError> {
        let mut tx = ImmediateTransaction::begin(self.base.pool()).await?;
        let result = insert_booking(tx.conn(), booking).await;
        tx.finish(result).await
    }

    async fn find_booking(&self, id: &BookingId) -> Result<Option<Booking>, DomainError> {
        let row: Option<BookingRow> = self
            .base
            .fetch_optional(
                sqlx::query_as(
                    "SELECT id, student_id, class_id, status, created_at FROM bookings WHERE id = ?1",
                )
                .bind(id.as_str()),
                "Find booking",
            )
            .await?;
        row.map(BookingRow::into_domain).transpose()
    }

    async fn save_profile(&self, profile: &StudentProfile) -> Result<(), DomainError> {
        self.base
            .execute(
                sqlx::query(
                    r#"
                    INSERT INTO student_profiles (student_id, course_id, level, family_id)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(student_id) DO UPDATE SET
                        course_id = excluded.course_id,
                        level = excluded.level,
                        family_id = excluded.family_id
                    "#,
                )
                .bind(profile.student_id.as_str())
                .bind(profile.course_id.as_str())
                .bind(i64::from(profile.level))
                .bind(profile.family_id.as_deref()),
                "Save student profile",
            )
            .await?;
        Ok(())
    }

    async fn find_profile(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<StudentProfile>, DomainError> {
        let row: Option<ProfileRow> = self
            .base
            .fetch_optional(
                sqlx::query_as(
                    "SELECT student_id, course_id, level, family_id FROM student_profiles WHERE student_id = ?1",
                )
                .bind(student_id.as_str()),
                "Find student profile",
            )
            .await?;
        row.map(ProfileRow::into_domain).transpose()
    }
}
