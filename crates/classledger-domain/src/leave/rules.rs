use super::LeaveType;

/// Facts a rule can look at
#[derive(Debug, Clone)]
pub struct LeaveRuleContext<'a> {
    pub leave_type: LeaveType,
    pub reason: Option<&'a str>,
    pub hours_before_class: f64,
    pub affected_classes: u32,
    /// Leaves the student submitted inside the frequency window, excluding this one
    pub recent_leave_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,
    ManualReview(String),
    Reject(String),
}

/// A pluggable policy check run after the refund tiers are computed.
///
/// `ManualReview` clears auto-approval; `Reject` invalidates the request.
pub trait LeaveRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &LeaveRuleContext<'_>) -> RuleOutcome;
}

pub struct MaxAffectedClassesRule {
    pub max: u32,
}

impl LeaveRule for MaxAffectedClassesRule {
    fn name(&self) -> &'static str {
        "max_affected_classes"
    }

    fn evaluate(&self, ctx: &LeaveRuleContext<'_>) -> RuleOutcome {
        if ctx.affected_classes > self.max {
            RuleOutcome::ManualReview(format!(
                "Leave affects {} classes (more than {}), manual review required",
                ctx.affected_classes, self.max
            ))
        } else {
            RuleOutcome::Pass
        }
    }
}

pub struct LeaveFrequencyRule {
    pub max_per_window: u32,
    pub window_days: i64,
}

impl LeaveRule for LeaveFrequencyRule {
    fn name(&self) -> &'static str {
        "leave_frequency"
    }

    fn evaluate(&self, ctx: &LeaveRuleContext<'_>) -> RuleOutcome {
        // this request counts toward the window too
        let total = ctx.recent_leave_count + 1;
        if total > self.max_per_window {
            RuleOutcome::ManualReview(format!(
                "{} leave requests in the last {} days, manual review required",
                total, self.window_days
            ))
        } else {
            RuleOutcome::Pass
        }
    }
}

pub struct ReasonRequiredRule;

impl LeaveRule for ReasonRequiredRule {
    fn name(&self) -> &'static str {
        "reason_required"
    }

    fn evaluate(&self, ctx: &LeaveRuleContext<'_>) -> RuleOutcome {
        let has_reason = ctx.reason.map(|r| !r.trim().is_empty()).unwrap_or(false);
        if ctx.leave_type == LeaveType::Other && !has_reason {
            RuleOutcome::Reject("A reason is required for leave of type 'other'".to_string())
        } else {
            RuleOutcome::Pass
        }
    }
}
