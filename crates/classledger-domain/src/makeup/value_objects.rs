use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::shared::{ClassId, DomainError, SuggestionId, TeacherId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MakeUpStatus {
    Pending,
    Suggested,
    StudentSelected,
    AdminApproved,
    Scheduled,
    Rejected,
    Expired,
}

impl MakeUpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MakeUpStatus::Pending => "pending",
            MakeUpStatus::Suggested => "suggested",
            MakeUpStatus::StudentSelected => "student_selected",
            MakeUpStatus::AdminApproved => "admin_approved",
            MakeUpStatus::Scheduled => "scheduled",
            MakeUpStatus::Rejected => "rejected",
            MakeUpStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MakeUpStatus::Scheduled | MakeUpStatus::Rejected | MakeUpStatus::Expired
        )
    }

    /// Suggestions may still be regenerated
    pub fn accepts_suggestions(&self) -> bool {
        matches!(self, MakeUpStatus::Pending | MakeUpStatus::Suggested)
    }
}

impl FromStr for MakeUpStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MakeUpStatus::Pending),
            "suggested" => Ok(MakeUpStatus::Suggested),
            "student_selected" => Ok(MakeUpStatus::StudentSelected),
            "admin_approved" => Ok(MakeUpStatus::AdminApproved),
            "scheduled" => Ok(MakeUpStatus::Scheduled),
            "rejected" => Ok(MakeUpStatus::Rejected),
            "expired" => Ok(MakeUpStatus::Expired),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown make-up status: {}",
                other
            ))),
        }
    }
}

/// The four weighted inputs to a compatibility score, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub content_match: f64,
    pub schedule_match: f64,
    pub teacher_match: f64,
    pub overall_compatibility: f64,
}

/// A scored alternative class offered for a make-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeUpSuggestion {
    pub id: SuggestionId,
    pub class_id: ClassId,
    pub teacher_id: TeacherId,
    pub starts_at: DateTime<Utc>,
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

impl MakeUpSuggestion {
    pub fn sub_scores(&self) -> SubScores {
        SubScores {
            content_match: self.content_match,
            schedule_match: self.schedule_match,
            teacher_match: self.teacher_match,
            overall_compatibility: self.overall_compatibility,
        }
    }
}
