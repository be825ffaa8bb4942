use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use classledger_domain::catalog::{CandidateQuery, ClassCatalogRepository};
use classledger_domain::makeup::{
    MakeUpClass, MakeUpRepository, ScoringContext, SuggestionConfig, SuggestionScorer,
};
use classledger_domain::postponement::{
    ClassPostponement, PostponementRepository, PostponementStatus,
};
use classledger_domain::scheduling::{PreferenceRepository, StudentSchedulePreferences};
use classledger_domain::shared::{
    Actor, DomainError, MakeUpClassId, PostponementId, StudentId, SuggestionId,
};

use super::access::require_self_or_staff;

/// Postponements and the make-up classes offered for them
pub struct MakeUpService {
    postponement_repo: Arc<dyn PostponementRepository>,
    makeup_repo: Arc<dyn MakeUpRepository>,
    catalog_repo: Arc<dyn ClassCatalogRepository>,
    preference_repo: Arc<dyn PreferenceRepository>,
    scorer: SuggestionScorer,
    config: SuggestionConfig,
}

impl MakeUpService {
    pub fn new(
        postponement_repo: Arc<dyn PostponementRepository>,
        makeup_repo: Arc<dyn MakeUpRepository>,
        catalog_repo: Arc<dyn ClassCatalogRepository>,
        preference_repo: Arc<dyn PreferenceRepository>,
        config: SuggestionConfig,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            postponement_repo,
            makeup_repo,
            catalog_repo,
            preference_repo,
            scorer: SuggestionScorer::new(&config)?,
            config,
        })
    }

    // ============================================================
    // Suggestions
    // ============================================================

    pub async fn generate_suggestions(
        &self,
        postponement_id: &PostponementId,
        now: DateTime<Utc>,
    ) -> Result<MakeUpClass, DomainError> {
        let postponement = self.find_postponement(postponement_id).await?;
        self.generate_for(&postponement, now).await
    }

    /// Score candidate classes for `postponement` and store them, replacing
    /// any earlier set that has not been acted on.
    #[instrument(skip(self, postponement, now), fields(postponement_id = %postponement.id()))]
    pub async fn generate_for(
        &self,
        postponement: &ClassPostponement,
        now: DateTime<Utc>,
    ) -> Result<MakeUpClass, DomainError> {
        if !matches!(
            postponement.status(),
            PostponementStatus::Pending | PostponementStatus::Confirmed
        ) {
            return Err(DomainError::InvalidState(format!(
                "Postponement {} is {}",
                postponement.id(),
                postponement.status().as_str()
            )));
        }

        let student_id = postponement.student_id();
        let profile = self
            .catalog_repo
            .find_profile(student_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("No enrolment profile for student {}", student_id))
            })?;
        let preferences = self
            .preference_repo
            .find(student_id)
            .await?
            .unwrap_or_else(|| StudentSchedulePreferences::default_for(student_id.clone()));
        let original = self.catalog_repo.find_class(postponement.class_id()).await?;

        let query = CandidateQuery::for_profile(
            &profile,
            Some(postponement.class_id().clone()),
            now,
            self.config.search_window_days,
        );
        let candidates = self.catalog_repo.find_candidate_classes(&query).await?;
        debug!(candidates = candidates.len(), "Make-up candidates loaded");

        let suggestions = self.scorer.suggest(
            &candidates,
            &ScoringContext {
                profile: &profile,
                preferences: &preferences,
                original: original.as_ref(),
                now,
            },
        );
        if suggestions.is_empty() {
            warn!(student_id = %student_id, "No make-up candidates in the search window");
        }

        let draft = MakeUpClass::suggested(
            postponement,
            suggestions,
            now,
            self.config.selection_deadline_days,
        );
        let stored = self.makeup_repo.upsert_suggestions(&draft).await?;

        info!(
            make_up_id = %stored.id(),
            suggestions = stored.alternative_suggestions().len(),
            best_score = stored
                .alternative_suggestions()
                .first()
                .map(|s| s.compatibility_score)
                .unwrap_or(0.0),
            "Make-up suggestions stored"
        );
        Ok(stored)
    }

    // ============================================================
    // Make-up state machine
    // ============================================================

    pub async fn select(
        &self,
        make_up_id: &MakeUpClassId,
        suggestion_id: &SuggestionId,
        student_id: &StudentId,
        actor: Option<&Actor>,
        now: DateTime<Utc>,
    ) -> Result<MakeUpClass, DomainError> {
        require_self_or_staff(actor, student_id)?;
        let make_up = self
            .makeup_repo
            .select_suggestion(make_up_id, suggestion_id, student_id, now)
            .await?;
        info!(make_up_id = %make_up_id, suggestion_id = %suggestion_id, "Make-up class selected");
        Ok(make_up)
    }

    pub async fn approve(
        &self,
        make_up_id: &MakeUpClassId,
        actor: Option<&Actor>,
        notes: Option<String>,
    ) -> Result<MakeUpClass, DomainError> {
        let actor = Actor::require_staff(actor)?;
        let make_up = self.makeup_repo.approve(make_up_id, notes).await?;
        info!(make_up_id = %make_up_id, approved_by = %actor.user_id, "Make-up class approved");
        Ok(make_up)
    }

    /// Book the approved class for the student.
    pub async fn schedule(
        &self,
        make_up_id: &MakeUpClassId,
        actor: Option<&Actor>,
    ) -> Result<MakeUpClass, DomainError> {
        Actor::require_staff(actor)?;
        let make_up = self.makeup_repo.schedule(make_up_id).await?;
        info!(
            make_up_id = %make_up_id,
            booking_id = ?make_up.scheduled_booking_id().map(|id| id.as_str()),
            "Make-up class scheduled"
        );
        Ok(make_up)
    }

    pub async fn reject(
        &self,
        make_up_id: &MakeUpClassId,
        actor: Option<&Actor>,
        notes: Option<String>,
    ) -> Result<MakeUpClass, DomainError> {
        let actor = Actor::require_staff(actor)?;
        let make_up = self.makeup_repo.reject(make_up_id, notes).await?;
        info!(make_up_id = %make_up_id, rejected_by = %actor.user_id, "Make-up class rejected");
        Ok(make_up)
    }

    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        let expired = self.makeup_repo.expire_overdue(now).await?;
        if expired > 0 {
            info!(expired, "Overdue make-up selections expired");
        }
        Ok(expired)
    }

    pub async fn find_by_id(&self, make_up_id: &MakeUpClassId) -> Result<MakeUpClass, DomainError> {
        self.makeup_repo
            .find_by_id(make_up_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Make-up class {} not found", make_up_id)))
    }

    pub async fn list_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<MakeUpClass>, DomainError> {
        self.makeup_repo.list_for_student(student_id).await
    }

    // ============================================================
    // Postponements
    // ============================================================

    async fn find_postponement(
        &self,
        postponement_id: &PostponementId,
    ) -> Result<ClassPostponement, DomainError> {
        self.postponement_repo
            .find_by_id(postponement_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Postponement {} not found", postponement_id))
            })
    }

    pub async fn confirm_postponement(
        &self,
        postponement_id: &PostponementId,
        actor: Option<&Actor>,
    ) -> Result<ClassPostponement, DomainError> {
        self.transition_postponement(postponement_id, PostponementStatus::Confirmed, actor)
            .await
    }

    pub async fn complete_postponement(
        &self,
        postponement_id: &PostponementId,
        actor: Option<&Actor>,
    ) -> Result<ClassPostponement, DomainError> {
        self.transition_postponement(postponement_id, PostponementStatus::Completed, actor)
            .await
    }

    /// Cancel a postponement; the original booking goes back to `booked`.
    pub async fn cancel_postponement(
        &self,
        postponement_id: &PostponementId,
        actor: Option<&Actor>,
    ) -> Result<ClassPostponement, DomainError> {
        self.transition_postponement(postponement_id, PostponementStatus::Cancelled, actor)
            .await
    }

    async fn transition_postponement(
        &self,
        postponement_id: &PostponementId,
        to: PostponementStatus,
        actor: Option<&Actor>,
    ) -> Result<ClassPostponement, DomainError> {
        let actor = Actor::require_staff(actor)?;
        let postponement = self.postponement_repo.transition(postponement_id, to).await?;
        info!(
            postponement_id = %postponement_id,
            status = to.as_str(),
            by = %actor.user_id,
            "Postponement updated"
        );
        Ok(postponement)
    }

    pub async fn list_postponements(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<ClassPostponement>, DomainError> {
        self.postponement_repo.list_for_student(student_id).await
    }
}
