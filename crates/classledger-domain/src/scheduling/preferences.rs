use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::shared::{DomainError, StudentId, TeacherId};

/// Soft scheduling constraints, used only to score make-up candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSchedulePreferences {
    pub student_id: StudentId,
    pub preferred_days: Vec<Weekday>,
    /// Inclusive start hour of the preferred window (0-23)
    pub preferred_start_hour: Option<u32>,
    /// Exclusive end hour of the preferred window (1-24)
    pub preferred_end_hour: Option<u32>,
    pub preferred_teacher_ids: Vec<TeacherId>,
    pub avoided_teacher_ids: Vec<TeacherId>,
    pub min_class_size: Option<u32>,
    pub max_class_size: Option<u32>,
    pub updated_at: DateTime<Utc>,
}

impl StudentSchedulePreferences {
    /// Neutral preferences created on first access
    pub fn default_for(student_id: StudentId) -> Self {
        Self {
            student_id,
            preferred_days: Vec::new(),
            preferred_start_hour: None,
            preferred_end_hour: None,
            preferred_teacher_ids: Vec::new(),
            avoided_teacher_ids: Vec::new(),
            min_class_size: None,
            max_class_size: None,
            updated_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(start) = self.preferred_start_hour {
            if start > 23 {
                return Err(DomainError::Validation(
                    "Preferred start hour must be between 0 and 23".to_string(),
                ));
            }
        }
        if let Some(end) = self.preferred_end_hour {
            if end == 0 || end > 24 {
                return Err(DomainError::Validation(
                    "Preferred end hour must be between 1 and 24".to_string(),
                ));
            }
        }
        if let (Some(start), Some(end)) = (self.preferred_start_hour, self.preferred_end_hour) {
            if start >= end {
                return Err(DomainError::Validation(
                    "Preferred start hour must be before the end hour".to_string(),
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min_class_size, self.max_class_size) {
            if min > max {
                return Err(DomainError::Validation(
                    "Minimum class size cannot exceed the maximum".to_string(),
                ));
            }
        }

        let preferred: HashSet<&TeacherId> = self.preferred_teacher_ids.iter().collect();
        if let Some(teacher) = self
            .avoided_teacher_ids
            .iter()
            .find(|t| preferred.contains(t))
        {
            return Err(DomainError::Validation(format!(
                "Teacher {} cannot be both preferred and avoided",
                teacher
            )));
        }
        Ok(())
    }

    pub fn has_day_preference(&self) -> bool {
        !self.preferred_days.is_empty()
    }

    pub fn has_time_preference(&self) -> bool {
        self.preferred_start_hour.is_some() || self.preferred_end_hour.is_some()
    }

    pub fn matches_day(&self, at: DateTime<Utc>) -> bool {
        self.preferred_days.contains(&at.weekday())
    }

    /// Start hour falls inside the preferred window
    pub fn matches_time(&self, at: DateTime<Utc>) -> bool {
        let hour = at.hour();
        let start = self.preferred_start_hour.unwrap_or(0);
        let end = self.preferred_end_hour.unwrap_or(24);
        hour >= start && hour < end
    }

    pub fn prefers_teacher(&self, teacher: &TeacherId) -> bool {
        self.preferred_teacher_ids.contains(teacher)
    }

    pub fn avoids_teacher(&self, teacher: &TeacherId) -> bool {
        self.avoided_teacher_ids.contains(teacher)
    }

    pub fn fits_class_size(&self, size: u32) -> bool {
        self.min_class_size.map(|min| size >= min).unwrap_or(true)
            && self.max_class_size.map(|max| size <= max).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn prefs() -> StudentSchedulePreferences {
        StudentSchedulePreferences::default_for(StudentId::new())
    }

    #[test]
    fn test_defaults_are_valid_and_neutral() {
        let p = prefs();
        assert!(p.validate().is_ok());
        assert!(!p.has_day_preference());
        assert!(!p.has_time_preference());
        assert!(p.fits_class_size(30));
    }

    #[test]
    fn test_validation_errors() {
        let mut p = prefs();
        p.preferred_start_hour = Some(18);
        p.preferred_end_hour = Some(9);
        assert!(p.validate().is_err());

        let mut p = prefs();
        p.preferred_end_hour = Some(25);
        assert!(p.validate().is_err());

        let mut p = prefs();
        p.min_class_size = Some(8);
        p.max_class_size = Some(4);
        assert!(p.validate().is_err());

        let mut p = prefs();
        let teacher = TeacherId::from_string("t-7");
        p.preferred_teacher_ids.push(teacher.clone());
        p.avoided_teacher_ids.push(teacher);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_day_and_time_matching() {
        let mut p = prefs();
        p.preferred_days = vec![Weekday::Sat];
        p.preferred_start_hour = Some(9);
        p.preferred_end_hour = Some(12);

        // 2024-06-01 was a Saturday
        let saturday_ten = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let saturday_noon = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let monday_ten = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();

        assert!(p.matches_day(saturday_ten));
        assert!(p.matches_time(saturday_ten));
        assert!(!p.matches_time(saturday_noon));
        assert!(!p.matches_day(monday_ten));
    }
}
