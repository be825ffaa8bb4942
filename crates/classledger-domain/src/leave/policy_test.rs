#[cfg(test)]
mod tests {
    use super::super::*;
    use chrono::{Duration, Utc};

    fn input(leave_type: LeaveType) -> LeaveValidationInput {
        LeaveValidationInput {
            class_date: Utc::now(),
            leave_type,
            reason: None,
            affected_classes: 1,
            recent_leave_count: 0,
        }
    }

    fn at(hours: f64, leave_type: LeaveType) -> LeaveValidation {
        LeavePolicy::default().evaluate(hours, &input(leave_type))
    }

    #[test]
    fn test_exactly_48_hours_is_full_refund() {
        let v = at(48.0, LeaveType::Personal);
        assert!(v.is_valid);
        assert!(v.meets_48_hour_rule);
        assert_eq!(v.refund_tier, RefundTier::Full);
        assert_eq!(v.expected_refund_percentage, 100.0);
        assert!(v.auto_approval);
    }

    #[test]
    fn test_just_under_48_hours_is_partial() {
        let v = at(47.999, LeaveType::Personal);
        assert!(!v.meets_48_hour_rule);
        assert_eq!(v.refund_tier, RefundTier::Partial);
        assert_eq!(v.expected_refund_percentage, 50.0);
        assert!(!v.auto_approval);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(at(24.0, LeaveType::Work).refund_tier, RefundTier::Partial);
        assert_eq!(at(23.999, LeaveType::Work).refund_tier, RefundTier::Limited);
        assert_eq!(at(2.0, LeaveType::Work).refund_tier, RefundTier::Limited);

        let none = at(1.999, LeaveType::Work);
        assert_eq!(none.refund_tier, RefundTier::None);
        assert_eq!(none.expected_refund_percentage, 0.0);
        assert!(none.warnings.iter().any(|w| w.contains("no refund")));

        let limited = at(10.0, LeaveType::Travel);
        assert!(limited.warnings.iter().any(|w| w.contains("limited refund")));
    }

    #[test]
    fn test_medical_override() {
        let v = at(10.0, LeaveType::Sick);
        assert_eq!(v.refund_tier, RefundTier::MedicalEmergency);
        assert_eq!(v.expected_refund_percentage, 75.0);
        assert!(v.warnings.iter().any(|w| w.contains("medical certificate")));
        assert!(!v.auto_approval);

        // override window is [2h, 48h)
        assert_eq!(at(1.5, LeaveType::Emergency).refund_tier, RefundTier::None);
        assert_eq!(at(50.0, LeaveType::Sick).refund_tier, RefundTier::Full);
        assert_eq!(at(30.0, LeaveType::Emergency).refund_tier, RefundTier::MedicalEmergency);
    }

    #[test]
    fn test_past_class_rejected_for_every_type() {
        for leave_type in [LeaveType::Sick, LeaveType::Emergency, LeaveType::Other] {
            for hours in [0.0, -5.0] {
                let v = at(hours, leave_type);
                assert!(!v.is_valid);
                assert!(!v.auto_approval);
                assert_eq!(v.errors, vec![PAST_CLASS_ERROR.to_string()]);
            }
        }
    }

    #[test]
    fn test_rules_force_manual_review() {
        let mut many = input(LeaveType::Travel);
        many.affected_classes = 4;
        let v = LeavePolicy::default().evaluate(72.0, &many);
        assert!(v.is_valid);
        assert!(v.meets_48_hour_rule);
        assert!(!v.auto_approval);

        let mut frequent = input(LeaveType::Travel);
        frequent.recent_leave_count = 4;
        assert!(!LeavePolicy::default().evaluate(72.0, &frequent).auto_approval);
    }

    #[test]
    fn test_reject_rule_invalidates() {
        let v = at(72.0, LeaveType::Other);
        assert!(!v.is_valid);
        assert!(!v.auto_approval);
        assert_eq!(v.errors.len(), 1);
    }

    #[test]
    fn test_custom_rule() {
        struct NoTravel;
        impl LeaveRule for NoTravel {
            fn name(&self) -> &'static str {
                "no_travel"
            }
            fn evaluate(&self, ctx: &LeaveRuleContext<'_>) -> RuleOutcome {
                if ctx.leave_type == LeaveType::Travel {
                    RuleOutcome::ManualReview("travel needs review".into())
                } else {
                    RuleOutcome::Pass
                }
            }
        }

        let policy = LeavePolicy::without_rules(LeavePolicyConfig::default()).with_rule(NoTravel);
        assert!(!policy.evaluate(72.0, &input(LeaveType::Travel)).auto_approval);
        assert!(policy.evaluate(72.0, &input(LeaveType::Work)).auto_approval);
    }

    #[test]
    fn test_validate_uses_clock() {
        let now = Utc::now();
        let mut req = input(LeaveType::Sick);
        req.class_date = now + Duration::hours(50);
        let v = LeavePolicy::default().validate(&req, now);
        assert!((v.hours_before_class - 50.0).abs() < 1e-9);
        assert!(v.meets_48_hour_rule);
        assert_eq!(v.expected_refund_percentage, 100.0);
        assert!(v.auto_approval);
    }
}
