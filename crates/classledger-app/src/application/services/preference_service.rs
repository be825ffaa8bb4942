use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use classledger_domain::scheduling::{PreferenceRepository, StudentSchedulePreferences};
use classledger_domain::shared::{Actor, DomainError, StudentId};

use super::access::require_self_or_staff;

pub struct PreferenceService {
    preference_repo: Arc<dyn PreferenceRepository>,
}

impl PreferenceService {
    pub fn new(preference_repo: Arc<dyn PreferenceRepository>) -> Self {
        Self { preference_repo }
    }

    /// Stored preferences, creating neutral defaults on first access
    pub async fn get(
        &self,
        student_id: &StudentId,
    ) -> Result<StudentSchedulePreferences, DomainError> {
        if let Some(existing) = self.preference_repo.find(student_id).await? {
            return Ok(existing);
        }

        let defaults = StudentSchedulePreferences::default_for(student_id.clone());
        self.preference_repo.save(&defaults).await?;
        debug!(student_id = %student_id, "Default schedule preferences created");
        Ok(defaults)
    }

    pub async fn update(
        &self,
        mut preferences: StudentSchedulePreferences,
        actor: Option<&Actor>,
    ) -> Result<StudentSchedulePreferences, DomainError> {
        require_self_or_staff(actor, &preferences.student_id)?;
        preferences.validate()?;
        preferences.updated_at = Utc::now();

        self.preference_repo.save(&preferences).await?;
        info!(student_id = %preferences.student_id, "Schedule preferences updated");
        Ok(preferences)
    }
}
