use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use classledger_domain::catalog::{BookingStatus, ClassCatalogRepository};
use classledger_domain::leave::{
    LeavePolicy, LeaveRequest, LeaveRequestRepository, LeaveStatus, LeaveType, LeaveValidation,
    LeaveValidationInput, NewLeaveRequest, AUTO_APPROVER,
};
use classledger_domain::ledger::{HourTransaction, LedgerRepository};
use classledger_domain::makeup::MakeUpClass;
use classledger_domain::postponement::{ClassPostponement, PostponementRepository};
use classledger_domain::shared::{Actor, BookingId, DomainError, LeaveRequestId, StudentId};

use super::access::require_self_or_staff;
use super::makeup_service::MakeUpService;

/// Everything an approval set in motion.
///
/// The request itself is committed before the follow-up steps run; a failed
/// refund or suggestion run is reported in `warnings` and can be retried.
#[derive(Debug, Clone)]
pub struct LeaveApprovalOutcome {
    pub request: LeaveRequest,
    pub validation: Option<LeaveValidation>,
    pub refund: Option<HourTransaction>,
    pub postponement: Option<ClassPostponement>,
    pub make_up: Option<MakeUpClass>,
    pub warnings: Vec<String>,
}

impl LeaveApprovalOutcome {
    fn new(request: LeaveRequest, validation: Option<LeaveValidation>) -> Self {
        Self {
            request,
            validation,
            refund: None,
            postponement: None,
            make_up: None,
            warnings: Vec::new(),
        }
    }
}

/// A leave as the student asks for it.
///
/// Class date and chargeable hours are read from the booking, never taken
/// from the caller.
#[derive(Debug, Clone)]
pub struct LeaveSubmission {
    pub student_id: StudentId,
    pub booking_id: BookingId,
    pub leave_type: LeaveType,
    pub reason: Option<String>,
    pub affected_classes: u32,
}

pub struct LeaveService {
    leave_repo: Arc<dyn LeaveRequestRepository>,
    postponement_repo: Arc<dyn PostponementRepository>,
    catalog_repo: Arc<dyn ClassCatalogRepository>,
    ledger_repo: Arc<dyn LedgerRepository>,
    makeup_service: Arc<MakeUpService>,
    policy: LeavePolicy,
}

impl LeaveService {
    pub fn new(
        leave_repo: Arc<dyn LeaveRequestRepository>,
        postponement_repo: Arc<dyn PostponementRepository>,
        catalog_repo: Arc<dyn ClassCatalogRepository>,
        ledger_repo: Arc<dyn LedgerRepository>,
        makeup_service: Arc<MakeUpService>,
        policy: LeavePolicy,
    ) -> Self {
        Self {
            leave_repo,
            postponement_repo,
            catalog_repo,
            ledger_repo,
            makeup_service,
            policy,
        }
    }

    /// Dry run of the leave policy; nothing is stored.
    pub async fn validate(
        &self,
        student_id: &StudentId,
        class_date: DateTime<Utc>,
        leave_type: LeaveType,
        reason: Option<String>,
        affected_classes: u32,
        now: DateTime<Utc>,
    ) -> Result<LeaveValidation, DomainError> {
        let window = Duration::days(self.policy.config().frequency_window_days);
        let recent_leave_count = self.leave_repo.count_since(student_id, now - window).await?;

        Ok(self.policy.validate(
            &LeaveValidationInput {
                class_date,
                leave_type,
                reason,
                affected_classes,
                recent_leave_count,
            },
            now,
        ))
    }

    /// Validate and store a leave request for one of the student's bookings.
    ///
    /// The refund base is the class duration, capped at what the booking was
    /// actually charged. Auto-approved requests go straight through refund,
    /// postponement and suggestion generation.
    #[instrument(skip(self, submission, actor, now), fields(student_id = %submission.student_id, booking_id = %submission.booking_id))]
    pub async fn submit(
        &self,
        submission: LeaveSubmission,
        actor: Option<&Actor>,
        now: DateTime<Utc>,
    ) -> Result<LeaveApprovalOutcome, DomainError> {
        require_self_or_staff(actor, &submission.student_id)?;
        let input = self.resolve_booking(submission).await?;

        let validation = self
            .validate(
                &input.student_id,
                input.class_date,
                input.leave_type,
                input.reason.clone(),
                input.affected_classes,
                now,
            )
            .await?;
        if !validation.is_valid {
            warn!(errors = ?validation.errors, "Leave request failed validation");
        }

        let request = LeaveRequest::submit(input, &validation)?;
        self.leave_repo.create(&request).await.map_err(|e| match e {
            DomainError::AlreadyProcessed(_) => DomainError::AlreadyProcessed(format!(
                "Booking {} already has an open leave request",
                request.booking_id().map(|id| id.as_str()).unwrap_or("-")
            )),
            other => other,
        })?;

        info!(
            leave_request_id = %request.id(),
            leave_type = request.leave_type().as_str(),
            hours_before_class = request.hours_before_class(),
            refund_percentage = request.refund_percentage(),
            auto_approved = request.auto_approved(),
            "Leave request submitted"
        );

        let mut outcome = LeaveApprovalOutcome::new(request, Some(validation));
        if outcome.request.status() == LeaveStatus::Approved {
            self.apply_approval_effects(&mut outcome, AUTO_APPROVER, now)
                .await;
        }
        Ok(outcome)
    }

    // Turn a submission into the aggregate input using stored class facts
    async fn resolve_booking(
        &self,
        submission: LeaveSubmission,
    ) -> Result<NewLeaveRequest, DomainError> {
        let booking = self
            .catalog_repo
            .find_booking(&submission.booking_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Booking {} not found", submission.booking_id))
            })?;
        if booking.student_id != submission.student_id {
            return Err(DomainError::Validation(format!(
                "Booking {} does not belong to student {}",
                booking.id, submission.student_id
            )));
        }
        if booking.status != BookingStatus::Booked {
            return Err(DomainError::InvalidState(format!(
                "Booking {} is {}",
                booking.id,
                booking.status.as_str()
            )));
        }

        let class = self
            .catalog_repo
            .find_class(&booking.class_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Class {} not found", booking.class_id)))?;
        let charged = self
            .ledger_repo
            .hours_charged_for_booking(&booking.student_id, &booking.id)
            .await?;
        if charged < class.duration_hours {
            debug!(
                booking_id = %booking.id,
                charged,
                duration_hours = class.duration_hours,
                "Refund base capped at charged hours"
            );
        }

        Ok(NewLeaveRequest {
            student_id: booking.student_id,
            class_id: Some(class.id),
            booking_id: Some(booking.id),
            class_date: class.starts_at,
            class_hours: class.duration_hours.min(charged),
            leave_type: submission.leave_type,
            reason: submission.reason,
            affected_classes: submission.affected_classes,
        })
    }

    #[instrument(skip(self, actor, notes, now))]
    pub async fn approve(
        &self,
        leave_request_id: &LeaveRequestId,
        actor: Option<&Actor>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<LeaveApprovalOutcome, DomainError> {
        let actor = Actor::require_staff(actor)?;
        let request = self
            .leave_repo
            .resolve(leave_request_id, LeaveStatus::Approved, &actor.user_id, notes)
            .await?;
        info!(leave_request_id = %leave_request_id, reviewed_by = %actor.user_id, "Leave request approved");

        let mut outcome = LeaveApprovalOutcome::new(request, None);
        self.apply_approval_effects(&mut outcome, &actor.user_id, now)
            .await;
        Ok(outcome)
    }

    pub async fn reject(
        &self,
        leave_request_id: &LeaveRequestId,
        actor: Option<&Actor>,
        notes: Option<String>,
    ) -> Result<LeaveRequest, DomainError> {
        let actor = Actor::require_staff(actor)?;
        let request = self
            .leave_repo
            .resolve(leave_request_id, LeaveStatus::Rejected, &actor.user_id, notes)
            .await?;
        info!(leave_request_id = %leave_request_id, reviewed_by = %actor.user_id, "Leave request rejected");
        Ok(request)
    }

    /// Withdraw a pending request on behalf of its owner.
    pub async fn cancel(
        &self,
        leave_request_id: &LeaveRequestId,
        student_id: &StudentId,
        actor: Option<&Actor>,
    ) -> Result<LeaveRequest, DomainError> {
        require_self_or_staff(actor, student_id)?;

        let mut existing = self.find_by_id(leave_request_id).await?;
        existing.cancel(student_id)?;

        let request = self
            .leave_repo
            .resolve(
                leave_request_id,
                LeaveStatus::Cancelled,
                student_id.as_str(),
                None,
            )
            .await?;
        info!(leave_request_id = %leave_request_id, "Leave request cancelled");
        Ok(request)
    }

    /// Re-run the refund for an approved request whose refund failed earlier.
    pub async fn retry_refund(
        &self,
        leave_request_id: &LeaveRequestId,
        actor: Option<&Actor>,
    ) -> Result<HourTransaction, DomainError> {
        let actor = Actor::require_staff(actor)?;
        let txn = self
            .leave_repo
            .process_refund(leave_request_id, &actor.user_id)
            .await?;
        info!(leave_request_id = %leave_request_id, hours = txn.hours_amount(), "Leave refund processed");
        Ok(txn)
    }

    pub async fn find_by_id(
        &self,
        leave_request_id: &LeaveRequestId,
    ) -> Result<LeaveRequest, DomainError> {
        self.leave_repo
            .find_by_id(leave_request_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Leave request {} not found", leave_request_id))
            })
    }

    pub async fn list_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<LeaveRequest>, DomainError> {
        self.leave_repo.list_for_student(student_id).await
    }

    pub async fn list_pending(&self) -> Result<Vec<LeaveRequest>, DomainError> {
        self.leave_repo.list_pending().await
    }

    // Refund, then postpone, then suggest. Each step is independent of the
    // previous one succeeding except suggestions, which need the postponement.
    async fn apply_approval_effects(
        &self,
        outcome: &mut LeaveApprovalOutcome,
        processed_by: &str,
        now: DateTime<Utc>,
    ) {
        let request = &outcome.request;

        if request.needs_refund() {
            match self
                .leave_repo
                .process_refund(request.id(), processed_by)
                .await
            {
                Ok(txn) => {
                    info!(
                        leave_request_id = %request.id(),
                        hours = txn.hours_amount(),
                        balance_after = txn.balance_after(),
                        "Leave refund credited"
                    );
                    outcome.refund = Some(txn);
                }
                Err(e) => {
                    warn!(leave_request_id = %request.id(), "Leave refund failed: {}", e);
                    outcome.warnings.push(format!("Refund not processed: {}", e));
                }
            }
        }

        if !request.needs_postponement() {
            return;
        }

        let postponement = match self.postpone(request).await {
            Ok(p) => p,
            Err(e) => {
                warn!(leave_request_id = %request.id(), "Postponement failed: {}", e);
                outcome
                    .warnings
                    .push(format!("Class not postponed: {}", e));
                return;
            }
        };

        match self.makeup_service.generate_for(&postponement, now).await {
            Ok(make_up) => outcome.make_up = Some(make_up),
            Err(e) => {
                warn!(postponement_id = %postponement.id(), "Suggestion generation failed: {}", e);
                outcome
                    .warnings
                    .push(format!("Make-up suggestions not generated: {}", e));
            }
        }
        outcome.postponement = Some(postponement);
    }

    async fn postpone(&self, request: &LeaveRequest) -> Result<ClassPostponement, DomainError> {
        if let Some(existing) = self
            .postponement_repo
            .find_by_leave_request(request.id())
            .await?
        {
            return Ok(existing);
        }

        let postponement = ClassPostponement::from_leave(request)?;
        self.postponement_repo.create(&postponement).await?;
        info!(
            postponement_id = %postponement.id(),
            booking_id = %postponement.booking_id(),
            hours = postponement.hours_affected(),
            "Class postponed"
        );
        Ok(postponement)
    }
}
