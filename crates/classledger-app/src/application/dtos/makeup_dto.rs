use serde::{Deserialize, Serialize};

use classledger_domain::makeup::{MakeUpClass, MakeUpSuggestion};
use classledger_domain::postponement::ClassPostponement;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostponementDto {
    pub id: String,
    pub booking_id: String,
    pub student_id: String,
    pub class_id: String,
    pub leave_request_id: Option<String>,
    pub postponement_reason: String,
    pub status: String,
    pub hours_affected: f64,
    pub original_class_date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&ClassPostponement> for PostponementDto {
    fn from(p: &ClassPostponement) -> Self {
        Self {
            id: p.id().to_string(),
            booking_id: p.booking_id().to_string(),
            student_id: p.student_id().to_string(),
            class_id: p.class_id().to_string(),
            leave_request_id: p.leave_request_id().map(|id| id.to_string()),
            postponement_reason: p.postponement_reason().to_string(),
            status: p.status().as_str().to_string(),
            hours_affected: p.hours_affected(),
            original_class_date: p.original_class_date().to_rfc3339(),
            created_at: p.created_at().to_rfc3339(),
            updated_at: p.updated_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionDto {
    pub id: String,
    pub class_id: String,
    pub teacher_id: String,
    pub starts_at: String,
    pub duration_hours: f64,
    pub content_match: f64,
    pub schedule_match: f64,
    pub teacher_match: f64,
    pub overall_compatibility: f64,
    pub compatibility_score: f64,
    pub reasoning: String,
    pub benefits: Vec<String>,
    pub drawbacks: Vec<String>,
}

impl From<&MakeUpSuggestion> for SuggestionDto {
    fn from(s: &MakeUpSuggestion) -> Self {
        Self {
            id: s.id.to_string(),
            class_id: s.class_id.to_string(),
            teacher_id: s.teacher_id.to_string(),
            starts_at: s.starts_at.to_rfc3339(),
            duration_hours: s.duration_hours,
            content_match: s.content_match,
            schedule_match: s.schedule_match,
            teacher_match: s.teacher_match,
            overall_compatibility: s.overall_compatibility,
            compatibility_score: s.compatibility_score,
            reasoning: s.reasoning.clone(),
            benefits: s.benefits.clone(),
            drawbacks: s.drawbacks.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeUpDto {
    pub id: String,
    pub postponement_id: String,
    pub student_id: String,
    pub alternative_suggestions: Vec<SuggestionDto>,
    pub selected_suggestion_id: Option<String>,
    pub student_selected: bool,
    pub admin_approved: bool,
    pub status: String,
    pub selection_deadline: String,
    pub admin_notes: Option<String>,
    pub scheduled_booking_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&MakeUpClass> for MakeUpDto {
    fn from(m: &MakeUpClass) -> Self {
        Self {
            id: m.id().to_string(),
            postponement_id: m.postponement_id().to_string(),
            student_id: m.student_id().to_string(),
            alternative_suggestions: m
                .alternative_suggestions()
                .iter()
                .map(SuggestionDto::from)
                .collect(),
            selected_suggestion_id: m.selected_suggestion_id().map(|id| id.to_string()),
            student_selected: m.student_selected(),
            admin_approved: m.admin_approved(),
            status: m.status().as_str().to_string(),
            selection_deadline: m.selection_deadline().to_rfc3339(),
            admin_notes: m.admin_notes().map(str::to_string),
            scheduled_booking_id: m.scheduled_booking_id().map(|id| id.to_string()),
            created_at: m.created_at().to_rfc3339(),
            updated_at: m.updated_at().to_rfc3339(),
        }
    }
}
