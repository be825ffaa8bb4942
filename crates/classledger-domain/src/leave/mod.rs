mod aggregate;
mod policy;
mod repository;
mod rules;
mod value_objects;

#[cfg(test)]
mod aggregate_test;
#[cfg(test)]
mod policy_test;

pub use aggregate::{LeaveRequest, LeaveRequestRecord, NewLeaveRequest, AUTO_APPROVER};
pub use policy::{LeavePolicy, LeaveValidation, LeaveValidationInput, PAST_CLASS_ERROR};
pub use repository::LeaveRequestRepository;
pub use rules::{
    LeaveFrequencyRule, LeaveRule, LeaveRuleContext, MaxAffectedClassesRule, ReasonRequiredRule,
    RuleOutcome,
};
pub use value_objects::{LeavePolicyConfig, LeaveStatus, LeaveType, RefundTier};
