use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rules::{
    LeaveFrequencyRule, LeaveRule, LeaveRuleContext, MaxAffectedClassesRule, ReasonRequiredRule,
    RuleOutcome,
};
use super::{LeavePolicyConfig, LeaveType, RefundTier};

pub const PAST_CLASS_ERROR: &str = "Cannot submit leave request for past classes";

/// Facts about a prospective leave
#[derive(Debug, Clone)]
pub struct LeaveValidationInput {
    pub class_date: DateTime<Utc>,
    pub leave_type: LeaveType,
    pub reason: Option<String>,
    pub affected_classes: u32,
    pub recent_leave_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveValidation {
    pub is_valid: bool,
    pub hours_before_class: f64,
    pub meets_48_hour_rule: bool,
    pub refund_tier: RefundTier,
    pub expected_refund_percentage: f64,
    pub auto_approval: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Refund-tier policy plus the pluggable rules engine
pub struct LeavePolicy {
    config: LeavePolicyConfig,
    rules: Vec<Box<dyn LeaveRule>>,
}

impl std::fmt::Debug for LeavePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeavePolicy")
            .field("config", &self.config)
            .field(
                "rules",
                &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self::new(LeavePolicyConfig::default())
    }
}

impl LeavePolicy {
    /// Policy with the built-in rules configured from `config`
    pub fn new(config: LeavePolicyConfig) -> Self {
        let rules: Vec<Box<dyn LeaveRule>> = vec![
            Box::new(MaxAffectedClassesRule {
                max: config.max_affected_classes,
            }),
            Box::new(LeaveFrequencyRule {
                max_per_window: config.max_leaves_per_window,
                window_days: config.frequency_window_days,
            }),
            Box::new(ReasonRequiredRule),
        ];
        Self { config, rules }
    }

    /// Policy without any rules beyond the refund tiers
    pub fn without_rules(config: LeavePolicyConfig) -> Self {
        Self {
            config,
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: impl LeaveRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn config(&self) -> &LeavePolicyConfig {
        &self.config
    }

    /// Validate against the clock.
    pub fn validate(&self, input: &LeaveValidationInput, now: DateTime<Utc>) -> LeaveValidation {
        let hours_before_class =
            (input.class_date - now).num_milliseconds() as f64 / 3_600_000.0;
        self.evaluate(hours_before_class, input)
    }

    /// Validate for a given notice period in hours.
    pub fn evaluate(&self, hours_before_class: f64, input: &LeaveValidationInput) -> LeaveValidation {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if hours_before_class <= 0.0 {
            errors.push(PAST_CLASS_ERROR.to_string());
            return LeaveValidation {
                is_valid: false,
                hours_before_class,
                meets_48_hour_rule: false,
                refund_tier: RefundTier::None,
                expected_refund_percentage: self.config.no_refund_percentage,
                auto_approval: false,
                warnings,
                errors,
            };
        }

        let mut tier = self.config.tier_for_notice(hours_before_class);
        let mut auto_approval = tier == RefundTier::Full;

        let medical_override = input.leave_type.is_medical_or_emergency()
            && hours_before_class >= self.config.limited_refund_hours
            && hours_before_class < self.config.full_refund_hours;

        if medical_override {
            tier = RefundTier::MedicalEmergency;
            warnings.push(
                "Medical or emergency leave: a medical certificate or supporting document may be required"
                    .to_string(),
            );
        } else if tier == RefundTier::Limited {
            warnings.push(format!(
                "Less than {} hours notice: limited refund of {}%",
                self.config.partial_refund_hours,
                self.config.percentage_for(RefundTier::Limited)
            ));
        } else if tier == RefundTier::None {
            warnings.push(format!(
                "Less than {} hours notice: no refund will be issued",
                self.config.limited_refund_hours
            ));
        }

        let meets_48_hour_rule = hours_before_class >= self.config.full_refund_hours;
        if !meets_48_hour_rule {
            warnings.push(format!(
                "Submitted less than {} hours before class: not eligible for automatic approval",
                self.config.full_refund_hours
            ));
        }

        let ctx = LeaveRuleContext {
            leave_type: input.leave_type,
            reason: input.reason.as_deref(),
            hours_before_class,
            affected_classes: input.affected_classes,
            recent_leave_count: input.recent_leave_count,
        };
        for rule in &self.rules {
            match rule.evaluate(&ctx) {
                RuleOutcome::Pass => {}
                RuleOutcome::ManualReview(reason) => {
                    auto_approval = false;
                    warnings.push(reason);
                }
                RuleOutcome::Reject(reason) => {
                    auto_approval = false;
                    errors.push(reason);
                }
            }
        }

        LeaveValidation {
            is_valid: errors.is_empty(),
            hours_before_class,
            meets_48_hour_rule,
            refund_tier: tier,
            expected_refund_percentage: self.config.percentage_for(tier),
            auto_approval,
            warnings,
            errors,
        }
    }
}
