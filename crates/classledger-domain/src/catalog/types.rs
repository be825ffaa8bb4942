use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::shared::{BookingId, ClassId, CourseId, DomainError, StudentId, TeacherId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl ClassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassStatus::Scheduled => "scheduled",
            ClassStatus::Completed => "completed",
            ClassStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ClassStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(ClassStatus::Scheduled),
            "completed" => Ok(ClassStatus::Completed),
            "cancelled" => Ok(ClassStatus::Cancelled),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown class status: {}",
                other
            ))),
        }
    }
}

/// A class session on the timetable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledClass {
    pub id: ClassId,
    pub course_id: CourseId,
    pub level: i32,
    pub unit: i32,
    pub class_type: String,
    pub teacher_id: TeacherId,
    pub starts_at: DateTime<Utc>,
    pub duration_hours: f64,
    pub capacity: u32,
    pub enrolled: u32,
    pub price_per_hour: f64,
    pub status: ClassStatus,
}

impl ScheduledClass {
    pub fn available_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled)
    }

    pub fn has_free_seat(&self) -> bool {
        self.status == ClassStatus::Scheduled && self.available_seats() > 0
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + Duration::minutes((self.duration_hours * 60.0).round() as i64)
    }

    /// Enrolled share of capacity, 0 for a class without seats
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.enrolled as f64 / self.capacity as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Booked,
    Attended,
    Postponed,
    Cancelled,
    MakeUp,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "booked",
            BookingStatus::Attended => "attended",
            BookingStatus::Postponed => "postponed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::MakeUp => "make_up",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(BookingStatus::Booked),
            "attended" => Ok(BookingStatus::Attended),
            "postponed" => Ok(BookingStatus::Postponed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "make_up" => Ok(BookingStatus::MakeUp),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown booking status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(student_id: StudentId, class_id: ClassId, status: BookingStatus) -> Self {
        Self {
            id: BookingId::new(),
            student_id,
            class_id,
            status,
            created_at: Utc::now(),
        }
    }
}

/// Enrolment facts used for make-up matching and family transfers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub level: i32,
    pub family_id: Option<String>,
}

impl StudentProfile {
    /// Both students belong to the same non-empty family
    pub fn same_family(&self, other: &StudentProfile) -> bool {
        match (self.family_id.as_deref(), other.family_id.as_deref()) {
            (Some(a), Some(b)) => !a.trim().is_empty() && a == b,
            _ => false,
        }
    }
}

/// Filter for make-up candidates
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub min_level: i32,
    pub max_level: i32,
    pub starts_after: DateTime<Utc>,
    pub starts_before: DateTime<Utc>,
    pub exclude_class_id: Option<ClassId>,
}

impl CandidateQuery {
    /// Same course, level within one, inside `[now, now + window_days]`
    pub fn for_profile(
        profile: &StudentProfile,
        exclude_class_id: Option<ClassId>,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Self {
        Self {
            student_id: profile.student_id.clone(),
            course_id: profile.course_id.clone(),
            min_level: profile.level - 1,
            max_level: profile.level + 1,
            starts_after: now,
            starts_before: now + Duration::days(window_days),
            exclude_class_id,
        }
    }

    /// In-memory form of the store filter. The "already booked" exclusion is
    /// applied by the store.
    pub fn matches(&self, class: &ScheduledClass) -> bool {
        class.course_id == self.course_id
            && class.level >= self.min_level
            && class.level <= self.max_level
            && class.starts_at > self.starts_after
            && class.starts_at <= self.starts_before
            && class.has_free_seat()
            && self.exclude_class_id.as_ref() != Some(&class.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(level: i32, starts_in_days: i64, enrolled: u32) -> ScheduledClass {
        ScheduledClass {
            id: ClassId::new(),
            course_id: CourseId::from_string("english"),
            level,
            unit: 1,
            class_type: "group".to_string(),
            teacher_id: TeacherId::from_string("t-1"),
            starts_at: Utc::now() + Duration::days(starts_in_days),
            duration_hours: 1.5,
            capacity: 6,
            enrolled,
            price_per_hour: 20.0,
            status: ClassStatus::Scheduled,
        }
    }

    #[test]
    fn test_same_family() {
        let a = StudentProfile {
            student_id: StudentId::new(),
            course_id: CourseId::from_string("english"),
            level: 2,
            family_id: Some("fam-1".into()),
        };
        let mut b = a.clone();
        b.student_id = StudentId::new();
        assert!(a.same_family(&b));

        b.family_id = None;
        assert!(!a.same_family(&b));

        let mut blank = a.clone();
        blank.family_id = Some("".into());
        assert!(!blank.same_family(&blank.clone()));
    }

    #[test]
    fn test_candidate_query_matches() {
        let profile = StudentProfile {
            student_id: StudentId::new(),
            course_id: CourseId::from_string("english"),
            level: 3,
            family_id: None,
        };
        let original = class(3, 1, 2);
        let query = CandidateQuery::for_profile(&profile, Some(original.id.clone()), Utc::now(), 14);

        assert!(!query.matches(&original));
        assert!(query.matches(&class(2, 3, 2)));
        assert!(query.matches(&class(4, 3, 2)));
        assert!(!query.matches(&class(5, 3, 2)));
        assert!(!query.matches(&class(3, 20, 2)));
        assert!(!query.matches(&class(3, 3, 6)));
    }

    #[test]
    fn test_class_metrics() {
        let c = class(1, 1, 3);
        assert_eq!(c.available_seats(), 3);
        assert_eq!(c.utilization(), 0.5);
        assert_eq!(c.ends_at() - c.starts_at, Duration::minutes(90));
    }
}
