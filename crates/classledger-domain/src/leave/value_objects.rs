use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::shared::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    Sick,
    Emergency,
    Personal,
    Work,
    Family,
    Travel,
    Other,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Sick => "sick",
            LeaveType::Emergency => "emergency",
            LeaveType::Personal => "personal",
            LeaveType::Work => "work",
            LeaveType::Family => "family",
            LeaveType::Travel => "travel",
            LeaveType::Other => "other",
        }
    }

    /// Leave types eligible for the medical/emergency refund override
    pub fn is_medical_or_emergency(&self) -> bool {
        matches!(self, LeaveType::Sick | LeaveType::Emergency)
    }
}

impl FromStr for LeaveType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sick" => Ok(LeaveType::Sick),
            "emergency" => Ok(LeaveType::Emergency),
            "personal" => Ok(LeaveType::Personal),
            "work" => Ok(LeaveType::Work),
            "family" => Ok(LeaveType::Family),
            "travel" => Ok(LeaveType::Travel),
            "other" => Ok(LeaveType::Other),
            other => Err(DomainError::Validation(format!(
                "Unknown leave type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
            LeaveStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for LeaveStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LeaveStatus::Pending),
            "approved" => Ok(LeaveStatus::Approved),
            "rejected" => Ok(LeaveStatus::Rejected),
            "cancelled" => Ok(LeaveStatus::Cancelled),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown leave status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundTier {
    Full,
    Partial,
    Limited,
    None,
    MedicalEmergency,
}

impl RefundTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundTier::Full => "FULL",
            RefundTier::Partial => "PARTIAL",
            RefundTier::Limited => "LIMITED",
            RefundTier::None => "NONE",
            RefundTier::MedicalEmergency => "MEDICAL_EMERGENCY",
        }
    }
}

/// Refund percentages and the notice thresholds that select them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeavePolicyConfig {
    pub full_refund_percentage: f64,
    pub partial_refund_percentage: f64,
    pub limited_refund_percentage: f64,
    pub no_refund_percentage: f64,
    pub medical_emergency_percentage: f64,
    pub full_refund_hours: f64,
    pub partial_refund_hours: f64,
    pub limited_refund_hours: f64,
    pub max_affected_classes: u32,
    pub max_leaves_per_window: u32,
    pub frequency_window_days: i64,
}

impl Default for LeavePolicyConfig {
    fn default() -> Self {
        Self {
            full_refund_percentage: 100.0,
            partial_refund_percentage: 50.0,
            limited_refund_percentage: 25.0,
            no_refund_percentage: 0.0,
            medical_emergency_percentage: 75.0,
            full_refund_hours: 48.0,
            partial_refund_hours: 24.0,
            limited_refund_hours: 2.0,
            max_affected_classes: 3,
            max_leaves_per_window: 4,
            frequency_window_days: 30,
        }
    }
}

impl LeavePolicyConfig {
    pub fn percentage_for(&self, tier: RefundTier) -> f64 {
        match tier {
            RefundTier::Full => self.full_refund_percentage,
            RefundTier::Partial => self.partial_refund_percentage,
            RefundTier::Limited => self.limited_refund_percentage,
            RefundTier::None => self.no_refund_percentage,
            RefundTier::MedicalEmergency => self.medical_emergency_percentage,
        }
    }

    /// Tier selected by notice alone, before any leave-type override
    pub fn tier_for_notice(&self, hours_before_class: f64) -> RefundTier {
        if hours_before_class >= self.full_refund_hours {
            RefundTier::Full
        } else if hours_before_class >= self.partial_refund_hours {
            RefundTier::Partial
        } else if hours_before_class >= self.limited_refund_hours {
            RefundTier::Limited
        } else {
            RefundTier::None
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let percentages = [
            self.full_refund_percentage,
            self.partial_refund_percentage,
            self.limited_refund_percentage,
            self.no_refund_percentage,
            self.medical_emergency_percentage,
        ];
        if percentages.iter().any(|p| !(0.0..=100.0).contains(p)) {
            return Err(DomainError::Validation(
                "Refund percentages must be between 0 and 100".to_string(),
            ));
        }
        if !(self.full_refund_hours > self.partial_refund_hours
            && self.partial_refund_hours > self.limited_refund_hours
            && self.limited_refund_hours >= 0.0)
        {
            return Err(DomainError::Validation(
                "Refund thresholds must be strictly decreasing and non-negative".to_string(),
            ));
        }
        if self.frequency_window_days <= 0 {
            return Err(DomainError::Validation(
                "Leave frequency window must be at least one day".to_string(),
            ));
        }
        Ok(())
    }
}
