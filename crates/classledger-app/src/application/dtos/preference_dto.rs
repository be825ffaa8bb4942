use chrono::{Utc, Weekday};
use serde::{Deserialize, Serialize};

use classledger_domain::scheduling::StudentSchedulePreferences;
use classledger_domain::shared::{DomainError, StudentId, TeacherId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesDto {
    pub student_id: String,
    /// Three-letter English day names, e.g. `Mon`
    pub preferred_days: Vec<String>,
    pub preferred_start_hour: Option<u32>,
    pub preferred_end_hour: Option<u32>,
    pub preferred_teacher_ids: Vec<String>,
    pub avoided_teacher_ids: Vec<String>,
    pub min_class_size: Option<u32>,
    pub max_class_size: Option<u32>,
    pub updated_at: String,
}

impl From<&StudentSchedulePreferences> for PreferencesDto {
    fn from(p: &StudentSchedulePreferences) -> Self {
        Self {
            student_id: p.student_id.to_string(),
            preferred_days: p.preferred_days.iter().map(|d| d.to_string()).collect(),
            preferred_start_hour: p.preferred_start_hour,
            preferred_end_hour: p.preferred_end_hour,
            preferred_teacher_ids: p
                .preferred_teacher_ids
                .iter()
                .map(|id| id.to_string())
                .collect(),
            avoided_teacher_ids: p.avoided_teacher_ids.iter().map(|id| id.to_string()).collect(),
            min_class_size: p.min_class_size,
            max_class_size: p.max_class_size,
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePreferencesInput {
    pub preferred_days: Vec<String>,
    pub preferred_start_hour: Option<u32>,
    pub preferred_end_hour: Option<u32>,
    pub preferred_teacher_ids: Vec<String>,
    pub avoided_teacher_ids: Vec<String>,
    pub min_class_size: Option<u32>,
    pub max_class_size: Option<u32>,
}

impl UpdatePreferencesInput {
    /// Build the stored preferences; day names are parsed case-insensitively.
    pub fn into_preferences(
        self,
        student_id: StudentId,
    ) -> Result<StudentSchedulePreferences, DomainError> {
        let preferred_days = self
            .preferred_days
            .iter()
            .map(|day| {
                day.parse::<Weekday>().map_err(|_| {
                    DomainError::Validation(format!("Unknown day of week: {}", day))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StudentSchedulePreferences {
            student_id,
            preferred_days,
            preferred_start_hour: self.preferred_start_hour,
            preferred_end_hour: self.preferred_end_hour,
            preferred_teacher_ids: self
                .preferred_teacher_ids
                .iter()
                .map(|id| TeacherId::from_string(id))
                .collect(),
            avoided_teacher_ids: self
                .avoided_teacher_ids
                .iter()
                .map(|id| TeacherId::from_string(id))
                .collect(),
            min_class_size: self.min_class_size,
            max_class_size: self.max_class_size,
            updated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_names_parse() {
        let input = UpdatePreferencesInput {
            preferred_days: vec!["Mon".to_string(), "saturday".to_string()],
            ..Default::default()
        };
        let prefs = input.into_preferences(StudentId::new()).unwrap();
        assert_eq!(prefs.preferred_days, vec![Weekday::Mon, Weekday::Sat]);

        let dto = PreferencesDto::from(&prefs);
        assert_eq!(dto.preferred_days, vec!["Mon", "Sat"]);
    }

    #[test]
    fn test_unknown_day_rejected() {
        let input = UpdatePreferencesInput {
            preferred_days: vec!["Funday".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            input.into_preferences(StudentId::new()),
            Err(DomainError::Validation(_))
        ));
    }
}
