use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{MakeUpStatus, MakeUpSuggestion};
use crate::postponement::ClassPostponement;
use crate::shared::{
    BookingId, DomainError, MakeUpClassId, PostponementId, StudentId, SuggestionId,
};

/// MakeUpClass aggregate root, one per postponement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakeUpClass {
    id: MakeUpClassId,
    postponement_id: PostponementId,
    student_id: StudentId,
    alternative_suggestions: Vec<MakeUpSuggestion>,
    selected_suggestion_id: Option<SuggestionId>,
    student_selected: bool,
    admin_approved: bool,
    status: MakeUpStatus,
    selection_deadline: DateTime<Utc>,
    admin_notes: Option<String>,
    scheduled_booking_id: Option<BookingId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Column values for `MakeUpClass::restore`
#[derive(Debug, Clone)]
pub struct MakeUpClassRecord {
    pub id: MakeUpClassId,
    pub postponement_id: PostponementId,
    pub student_id: StudentId,
    pub alternative_suggestions: Vec<MakeUpSuggestion>,
    pub selected_suggestion_id: Option<SuggestionId>,
    pub student_selected: bool,
    pub admin_approved: bool,
    pub status: MakeUpStatus,
    pub selection_deadline: DateTime<Utc>,
    pub admin_notes: Option<String>,
    pub scheduled_booking_id: Option<BookingId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MakeUpClass {
    /// Suggestion set for a postponement, open for selection until the deadline
    pub fn suggested(
        postponement: &ClassPostponement,
        suggestions: Vec<MakeUpSuggestion>,
        now: DateTime<Utc>,
        deadline_days: i64,
    ) -> Self {
        Self {
            id: MakeUpClassId::new(),
            postponement_id: postponement.id().clone(),
            student_id: postponement.student_id().clone(),
            alternative_suggestions: suggestions,
            selected_suggestion_id: None,
            student_selected: false,
            admin_approved: false,
            status: MakeUpStatus::Suggested,
            selection_deadline: now + Duration::days(deadline_days),
            admin_notes: None,
            scheduled_booking_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn restore(record: MakeUpClassRecord) -> Self {
        Self {
            id: record.id,
            postponement_id: record.postponement_id,
            student_id: record.student_id,
            alternative_suggestions: record.alternative_suggestions,
            selected_suggestion_id: record.selected_suggestion_id,
            student_selected: record.student_selected,
            admin_approved: record.admin_approved,
            status: record.status,
            selection_deadline: record.selection_deadline,
            admin_notes: record.admin_notes,
            scheduled_booking_id: record.scheduled_booking_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    // Getters
    pub fn id(&self) -> &MakeUpClassId {
        &self.id
    }

    pub fn postponement_id(&self) -> &PostponementId {
        &self.postponement_id
    }

    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    pub fn alternative_suggestions(&self) -> &[MakeUpSuggestion] {
        &self.alternative_suggestions
    }

    pub fn selected_suggestion_id(&self) -> Option<&SuggestionId> {
        self.selected_suggestion_id.as_ref()
    }

    pub fn student_selected(&self) -> bool {
        self.student_selected
    }

    pub fn admin_approved(&self) -> bool {
        self.admin_approved
    }

    pub fn status(&self) -> MakeUpStatus {
        self.status
    }

    pub fn selection_deadline(&self) -> DateTime<Utc> {
        self.selection_deadline
    }

    pub fn admin_notes(&self) -> Option<&str> {
        self.admin_notes.as_deref()
    }

    pub fn scheduled_booking_id(&self) -> Option<&BookingId> {
        self.scheduled_booking_id.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn selected_suggestion(&self) -> Option<&MakeUpSuggestion> {
        let selected = self.selected_suggestion_id.as_ref()?;
        self.alternative_suggestions
            .iter()
            .find(|s| &s.id == selected)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.accepts_suggestions() && now > self.selection_deadline
    }

    // State transitions

    /// Overwrite the suggestion list while nothing has been picked yet.
    pub fn replace_suggestions(
        &mut self,
        suggestions: Vec<MakeUpSuggestion>,
        now: DateTime<Utc>,
        deadline_days: i64,
    ) -> Result<(), DomainError> {
        if !self.status.accepts_suggestions() {
            return Err(self.already(MakeUpStatus::Suggested));
        }
        self.alternative_suggestions = suggestions;
        self.status = MakeUpStatus::Suggested;
        self.selection_deadline = now + Duration::days(deadline_days);
        self.updated_at = now;
        Ok(())
    }

    /// The student picks one of the offered suggestions.
    ///
    /// Past the deadline the record moves to `expired` and the call fails with
    /// `InvalidState`; the caller persists the expiry.
    pub fn select(
        &mut self,
        suggestion_id: &SuggestionId,
        student_id: &StudentId,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if &self.student_id != student_id {
            return Err(DomainError::Auth(format!(
                "Make-up {} belongs to another student",
                self.id
            )));
        }
        if self.status != MakeUpStatus::Suggested {
            return Err(self.already(MakeUpStatus::StudentSelected));
        }
        if now > self.selection_deadline {
            self.status = MakeUpStatus::Expired;
            self.updated_at = now;
            return Err(DomainError::InvalidState(format!(
                "Selection deadline for make-up {} has passed",
                self.id
            )));
        }
        if !self
            .alternative_suggestions
            .iter()
            .any(|s| &s.id == suggestion_id)
        {
            return Err(DomainError::NotFound(format!(
                "Suggestion {} is not offered for make-up {}",
                suggestion_id, self.id
            )));
        }

        self.selected_suggestion_id = Some(suggestion_id.clone());
        self.student_selected = true;
        self.status = MakeUpStatus::StudentSelected;
        self.updated_at = now;
        Ok(())
    }

    pub fn approve(&mut self, notes: Option<String>) -> Result<(), DomainError> {
        if self.status != MakeUpStatus::StudentSelected {
            return Err(self.already(MakeUpStatus::AdminApproved));
        }
        self.admin_approved = true;
        self.admin_notes = notes.filter(|n| !n.trim().is_empty());
        self.status = MakeUpStatus::AdminApproved;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_scheduled(&mut self, booking_id: BookingId) -> Result<(), DomainError> {
        if self.status != MakeUpStatus::AdminApproved {
            return Err(self.already(MakeUpStatus::Scheduled));
        }
        self.scheduled_booking_id = Some(booking_id);
        self.status = MakeUpStatus::Scheduled;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn reject(&mut self, notes: Option<String>) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(self.already(MakeUpStatus::Rejected));
        }
        self.admin_notes = notes.filter(|n| !n.trim().is_empty());
        self.status = MakeUpStatus::Rejected;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Expire an unselected record whose deadline passed
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_overdue(now) {
            return Err(DomainError::InvalidState(format!(
                "Make-up {} is {} and not past its deadline",
                self.id,
                self.status.as_str()
            )));
        }
        self.status = MakeUpStatus::Expired;
        self.updated_at = now;
        Ok(())
    }

    fn already(&self, attempted: MakeUpStatus) -> DomainError {
        DomainError::AlreadyProcessed(format!(
            "Make-up {} is {}, cannot move to {}",
            self.id,
            self.status.as_str(),
            attempted.as_str()
        ))
    }
}
