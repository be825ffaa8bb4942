use async_trait::async_trait;

use super::StudentSchedulePreferences;
use crate::shared::{DomainError, StudentId};

#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    async fn find(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<StudentSchedulePreferences>, DomainError>;

    /// Upsert keyed by student
    async fn save(&self, preferences: &StudentSchedulePreferences) -> Result<(), DomainError>;
}
