use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::shared::{ensure_positive_hours, round_hours, DomainError, PurchaseId, StudentId};

use super::transaction::HOURS_EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown payment status: {}",
                other
            ))),
        }
    }
}

/// A purchased hour package
///
/// Only completed packages are active. Deductions draw `hours_remaining` down
/// in soonest-expiry order; the expiry sweep retires lapsed packages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourPurchase {
    id: PurchaseId,
    student_id: StudentId,
    package_name: String,
    hours_purchased: f64,
    hours_remaining: f64,
    amount_paid: f64,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    payment_status: PaymentStatus,
    is_active: bool,
    is_expired: bool,
    created_at: DateTime<Utc>,
}

impl HourPurchase {
    pub fn new(
        student_id: StudentId,
        package_name: String,
        hours: f64,
        amount_paid: f64,
        valid_days: i64,
        payment_status: PaymentStatus,
    ) -> Result<Self, DomainError> {
        let hours = ensure_positive_hours(hours, "Package hours")?;

        if package_name.trim().is_empty() {
            return Err(DomainError::Validation(
                "Package name cannot be empty".to_string(),
            ));
        }
        if !amount_paid.is_finite() || amount_paid < 0.0 {
            return Err(DomainError::Validation(
                "Amount paid cannot be negative".to_string(),
            ));
        }
        if valid_days <= 0 {
            return Err(DomainError::Validation(
                "Package validity must be at least one day".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: PurchaseId::new(),
            student_id,
            package_name: package_name.trim().to_string(),
            hours_purchased: hours,
            hours_remaining: hours,
            amount_paid,
            valid_from: now,
            valid_until: now + Duration::days(valid_days),
            payment_status,
            is_active: payment_status == PaymentStatus::Completed,
            is_expired: false,
            created_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: PurchaseId,
        student_id: StudentId,
        package_name: String,
        hours_purchased: f64,
        hours_remaining: f64,
        amount_paid: f64,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
        payment_status: PaymentStatus,
        is_active: bool,
        is_expired: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id,
            package_name,
            hours_purchased,
            hours_remaining,
            amount_paid,
            valid_from,
            valid_until,
            payment_status,
            is_active,
            is_expired,
            created_at,
        }
    }

    // Getters
    pub fn id(&self) -> &PurchaseId {
        &self.id
    }

    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn hours_purchased(&self) -> f64 {
        self.hours_purchased
    }

    pub fn hours_remaining(&self) -> f64 {
        self.hours_remaining
    }

    pub fn amount_paid(&self) -> f64 {
        self.amount_paid
    }

    pub fn valid_from(&self) -> DateTime<Utc> {
        self.valid_from
    }

    pub fn valid_until(&self) -> DateTime<Utc> {
        self.valid_until
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// `isActive && !isExpired && hoursRemaining > 0`
    pub fn is_consumable(&self) -> bool {
        self.is_active && !self.is_expired && self.hours_remaining > HOURS_EPSILON
    }

    /// Active package whose validity ended at or before `now`
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.is_consumable() && self.valid_until <= now
    }

    /// Active package expiring within `window` of `now`
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.is_consumable() && self.valid_until > now && self.valid_until <= now + window
    }

    pub fn price_per_hour(&self) -> f64 {
        if self.hours_purchased > 0.0 {
            self.amount_paid / self.hours_purchased
        } else {
            0.0
        }
    }

    // Business methods

    /// Mark the payment completed, activating the package.
    pub fn complete_payment(&mut self) -> Result<(), DomainError> {
        if self.payment_status != PaymentStatus::Pending {
            return Err(DomainError::AlreadyProcessed(format!(
                "Purchase {} payment is already {}",
                self.id,
                self.payment_status.as_str()
            )));
        }
        self.payment_status = PaymentStatus::Completed;
        self.is_active = true;
        Ok(())
    }

    /// Draw up to `hours` from this package, returning how much was taken.
    pub fn consume(&mut self, hours: f64) -> f64 {
        if !self.is_consumable() || hours <= 0.0 {
            return 0.0;
        }
        let taken = round_hours(hours.min(self.hours_remaining));
        self.hours_remaining = round_hours(self.hours_remaining - taken);
        taken
    }

    /// Hand back hours a reversed debit took from this package.
    ///
    /// Expired packages take nothing back. Returns the hours restored.
    pub fn give_back(&mut self, hours: f64) -> f64 {
        if self.is_expired || hours <= 0.0 {
            return 0.0;
        }
        let room = round_hours(self.hours_purchased - self.hours_remaining).max(0.0);
        let restored = round_hours(hours.min(room));
        self.hours_remaining = round_hours(self.hours_remaining + restored);
        restored
    }

    /// Undo the purchase credit: the package is emptied and deactivated.
    ///
    /// Only an untouched package can be withdrawn.
    pub fn withdraw(&mut self) -> Result<f64, DomainError> {
        if self.is_expired {
            return Err(DomainError::AlreadyProcessed(format!(
                "Purchase {} already expired",
                self.id
            )));
        }
        let used = round_hours(self.hours_purchased - self.hours_remaining);
        if used > HOURS_EPSILON {
            return Err(DomainError::Validation(format!(
                "Purchase {} has {} hours already used",
                self.id, used
            )));
        }
        let withdrawn = self.hours_remaining;
        self.hours_remaining = 0.0;
        self.is_active = false;
        Ok(withdrawn)
    }

    /// Retire the package. Returns the hours that were still unused.
    pub fn expire(&mut self) -> Result<f64, DomainError> {
        if self.is_expired {
            return Err(DomainError::AlreadyProcessed(format!(
                "Purchase {} already expired",
                self.id
            )));
        }
        let forfeited = self.hours_remaining;
        self.hours_remaining = 0.0;
        self.is_expired = true;
        self.is_active = false;
        Ok(forfeited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(hours: f64, status: PaymentStatus) -> HourPurchase {
        HourPurchase::new(
            StudentId::new(),
            "Starter 10".to_string(),
            hours,
            300.0,
            90,
            status,
        )
        .unwrap()
    }

    #[test]
    fn test_completed_package_is_active() {
        let p = package(10.0, PaymentStatus::Completed);
        assert!(p.is_consumable());
        assert_eq!(p.price_per_hour(), 30.0);
    }

    #[test]
    fn test_pending_package_activates_once() {
        let mut p = package(10.0, PaymentStatus::Pending);
        assert!(!p.is_consumable());
        p.complete_payment().unwrap();
        assert!(p.is_consumable());
        assert!(matches!(
            p.complete_payment(),
            Err(DomainError::AlreadyProcessed(_))
        ));
    }

    #[test]
    fn test_invalid_packages_rejected() {
        let student = StudentId::new();
        assert!(HourPurchase::new(student.clone(), "x".into(), 0.0, 1.0, 30, PaymentStatus::Completed).is_err());
        assert!(HourPurchase::new(student.clone(), " ".into(), 5.0, 1.0, 30, PaymentStatus::Completed).is_err());
        assert!(HourPurchase::new(student.clone(), "x".into(), 5.0, -1.0, 30, PaymentStatus::Completed).is_err());
        assert!(HourPurchase::new(student, "x".into(), 5.0, 1.0, 0, PaymentStatus::Completed).is_err());
    }

    #[test]
    fn test_consume_caps_at_remaining() {
        let mut p = package(3.0, PaymentStatus::Completed);
        assert_eq!(p.consume(2.0), 2.0);
        assert_eq!(p.consume(5.0), 1.0);
        assert_eq!(p.hours_remaining(), 0.0);
        assert!(!p.is_consumable());
        assert_eq!(p.consume(1.0), 0.0);
    }

    #[test]
    fn test_expire_forfeits_remaining_hours() {
        let mut p = package(4.0, PaymentStatus::Completed);
        p.consume(1.5);
        assert_eq!(p.expire().unwrap(), 2.5);
        assert!(p.is_expired());
        assert!(!p.is_active());
        assert!(p.expire().is_err());
    }

    #[test]
    fn test_give_back_caps_at_purchased_hours() {
        let mut p = package(4.0, PaymentStatus::Completed);
        p.consume(3.0);
        assert_eq!(p.give_back(2.0), 2.0);
        assert_eq!(p.give_back(5.0), 1.0);
        assert_eq!(p.hours_remaining(), 4.0);

        p.expire().unwrap();
        assert_eq!(p.give_back(1.0), 0.0);
    }

    #[test]
    fn test_withdraw_only_untouched_packages() {
        let mut fresh = package(10.0, PaymentStatus::Completed);
        assert_eq!(fresh.withdraw().unwrap(), 10.0);
        assert!(!fresh.is_consumable());
        assert_eq!(fresh.hours_remaining(), 0.0);

        let mut used = package(10.0, PaymentStatus::Completed);
        used.consume(1.0);
        assert!(matches!(used.withdraw(), Err(DomainError::Validation(_))));
        assert_eq!(used.hours_remaining(), 9.0);
    }

    #[test]
    fn test_lapsed_and_expiring_windows() {
        let p = package(4.0, PaymentStatus::Completed);
        let now = Utc::now();
        assert!(!p.is_lapsed(now));
        assert!(p.is_lapsed(now + Duration::days(91)));
        assert!(p.expires_within(now, Duration::days(90)));
        assert!(!p.expires_within(now, Duration::days(30)));
    }
}
