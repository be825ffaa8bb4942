use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::leave::LeaveRequest;
use crate::shared::{
    BookingId, ClassId, DomainError, LeaveRequestId, PostponementId, StudentId,
};

pub const STUDENT_LEAVE_REASON: &str = "student_leave";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostponementStatus {
    Pending,
    Confirmed,
    MakeUpScheduled,
    Cancelled,
    Completed,
}

impl PostponementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostponementStatus::Pending => "pending",
            PostponementStatus::Confirmed => "confirmed",
            PostponementStatus::MakeUpScheduled => "make_up_scheduled",
            PostponementStatus::Cancelled => "cancelled",
            PostponementStatus::Completed => "completed",
        }
    }

    /// Forward-only moves
    pub fn can_transition_to(&self, to: PostponementStatus) -> bool {
        use PostponementStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed)
                | (Pending, MakeUpScheduled)
                | (Confirmed, MakeUpScheduled)
                | (MakeUpScheduled, Completed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }
}

impl FromStr for PostponementStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PostponementStatus::Pending),
            "confirmed" => Ok(PostponementStatus::Confirmed),
            "make_up_scheduled" => Ok(PostponementStatus::MakeUpScheduled),
            "cancelled" => Ok(PostponementStatus::Cancelled),
            "completed" => Ok(PostponementStatus::Completed),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown postponement status: {}",
                other
            ))),
        }
    }
}

/// The record that a booked class will not be attended and needs a make-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassPostponement {
    id: PostponementId,
    booking_id: BookingId,
    student_id: StudentId,
    class_id: ClassId,
    leave_request_id: Option<LeaveRequestId>,
    postponement_reason: String,
    status: PostponementStatus,
    hours_affected: f64,
    original_class_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ClassPostponement {
    /// Postponement triggered by an approved leave
    pub fn from_leave(leave: &LeaveRequest) -> Result<Self, DomainError> {
        if !leave.needs_postponement() {
            return Err(DomainError::InvalidState(format!(
                "Leave request {} is not an approved class leave",
                leave.id()
            )));
        }
        let (Some(booking_id), Some(class_id)) = (leave.booking_id(), leave.class_id()) else {
            return Err(DomainError::InvalidState(format!(
                "Leave request {} has no booked class",
                leave.id()
            )));
        };

        let now = Utc::now();
        Ok(Self {
            id: PostponementId::new(),
            booking_id: booking_id.clone(),
            student_id: leave.student_id().clone(),
            class_id: class_id.clone(),
            leave_request_id: Some(leave.id().clone()),
            postponement_reason: STUDENT_LEAVE_REASON.to_string(),
            status: PostponementStatus::Pending,
            hours_affected: leave.class_hours(),
            original_class_date: leave.class_date(),
            created_at: now,
            updated_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: PostponementId,
        booking_id: BookingId,
        student_id: StudentId,
        class_id: ClassId,
        leave_request_id: Option<LeaveRequestId>,
        postponement_reason: String,
        status: PostponementStatus,
        hours_affected: f64,
        original_class_date: DateTime<Utc>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            booking_id,
            student_id,
            class_id,
            leave_request_id,
            postponement_reason,
            status,
            hours_affected,
            original_class_date,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &PostponementId {
        &self.id
    }

    pub fn booking_id(&self) -> &BookingId {
        &self.booking_id
    }

    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    pub fn class_id(&self) -> &ClassId {
        &self.class_id
    }

    pub fn leave_request_id(&self) -> Option<&LeaveRequestId> {
        self.leave_request_id.as_ref()
    }

    pub fn postponement_reason(&self) -> &str {
        &self.postponement_reason
    }

    pub fn status(&self) -> PostponementStatus {
        self.status
    }

    pub fn hours_affected(&self) -> f64 {
        self.hours_affected
    }

    pub fn original_class_date(&self) -> DateTime<Utc> {
        self.original_class_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn transition_to(&mut self, to: PostponementStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidState(format!(
                "Postponement {} cannot move from {} to {}",
                self.id,
                self.status.as_str(),
                to.as_str()
            )));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PostponementStatus::*;
    use super::*;

    #[test]
    fn test_forward_only_transitions() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(MakeUpScheduled));
        assert!(MakeUpScheduled.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));

        assert!(!MakeUpScheduled.can_transition_to(Pending));
        assert!(!MakeUpScheduled.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn test_status_names() {
        assert_eq!(MakeUpScheduled.as_str(), "make_up_scheduled");
        assert_eq!("make_up_scheduled".parse::<PostponementStatus>().unwrap(), MakeUpScheduled);
    }
}
