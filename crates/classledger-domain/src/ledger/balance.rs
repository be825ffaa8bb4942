use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::{round_hours, PurchaseId, StudentId};

use super::purchase::HourPurchase;
use super::transaction::{HourTransaction, HOURS_EPSILON};

/// Thresholds used when building a balance detail
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancePolicy {
    pub low_balance_threshold: f64,
    pub expiring_window_days: i64,
    pub recent_transaction_count: usize,
}

impl Default for BalancePolicy {
    fn default() -> Self {
        Self {
            low_balance_threshold: 2.0,
            expiring_window_days: 30,
            recent_transaction_count: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BalanceAlert {
    LowBalance {
        balance: f64,
        threshold: f64,
    },
    PackageExpiring {
        purchase_id: PurchaseId,
        package_name: String,
        hours_remaining: f64,
        valid_until: DateTime<Utc>,
    },
    NoActivePackage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceDetail {
    pub student_id: StudentId,
    pub total_hours: f64,
    pub active_packages: Vec<HourPurchase>,
    pub expiring_packages: Vec<HourPurchase>,
    pub recent_transactions: Vec<HourTransaction>,
    pub active_alerts: Vec<BalanceAlert>,
}

/// Derives balances and package breakdowns from ledger rows.
///
/// Pure: callers load the rows, the calculator only sums and sorts.
#[derive(Debug, Clone, Default)]
pub struct BalanceCalculator {
    policy: BalancePolicy,
}

impl BalanceCalculator {
    pub fn new(policy: BalancePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BalancePolicy {
        &self.policy
    }

    /// Sum of every entry that still counts toward the balance
    pub fn balance_of<'a>(transactions: impl IntoIterator<Item = &'a HourTransaction>) -> f64 {
        let total: f64 = transactions
            .into_iter()
            .filter(|t| t.counts_toward_balance())
            .map(|t| t.hours_amount())
            .sum();
        round_hours(total)
    }

    /// Consumable packages, soonest expiry first
    pub fn active_packages(purchases: &[HourPurchase]) -> Vec<HourPurchase> {
        let mut active: Vec<HourPurchase> = purchases
            .iter()
            .filter(|p| p.is_consumable())
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            a.valid_until()
                .cmp(&b.valid_until())
                .then_with(|| a.created_at().cmp(&b.created_at()))
        });
        active
    }

    /// Active packages whose validity ends inside the configured window
    pub fn expiring_packages(&self, purchases: &[HourPurchase], now: DateTime<Utc>) -> Vec<HourPurchase> {
        let window = Duration::days(self.policy.expiring_window_days);
        Self::active_packages(purchases)
            .into_iter()
            .filter(|p| p.expires_within(now, window))
            .collect()
    }

    /// Draw `hours` from `packages` in soonest-expiry order.
    ///
    /// Returns the per-package amounts taken. Hours beyond what the packages
    /// hold are left unallocated; the ledger balance, not package totals, is
    /// the authority on whether a deduction may proceed.
    pub fn allocate_deduction(packages: &mut [HourPurchase], hours: f64) -> Vec<(PurchaseId, f64)> {
        packages.sort_by_key(|p| p.valid_until());

        let mut outstanding = round_hours(hours);
        let mut allocations = Vec::new();
        for package in packages.iter_mut() {
            if outstanding <= HOURS_EPSILON {
                break;
            }
            let taken = package.consume(outstanding);
            if taken > 0.0 {
                outstanding = round_hours(outstanding - taken);
                allocations.push((package.id().clone(), taken));
            }
        }
        allocations
    }

    pub fn alerts(
        &self,
        total_hours: f64,
        active: &[HourPurchase],
        expiring: &[HourPurchase],
    ) -> Vec<BalanceAlert> {
        let mut alerts = Vec::new();

        if total_hours < self.policy.low_balance_threshold {
            alerts.push(BalanceAlert::LowBalance {
                balance: total_hours,
                threshold: self.policy.low_balance_threshold,
            });
        }

        for package in expiring {
            alerts.push(BalanceAlert::PackageExpiring {
                purchase_id: package.id().clone(),
                package_name: package.package_name().to_string(),
                hours_remaining: package.hours_remaining(),
                valid_until: package.valid_until(),
            });
        }

        if active.is_empty() || total_hours <= HOURS_EPSILON {
            alerts.push(BalanceAlert::NoActivePackage);
        }

        alerts
    }

    /// Assemble the full balance view for one student.
    pub fn detail(
        &self,
        student_id: StudentId,
        total_hours: f64,
        purchases: &[HourPurchase],
        mut recent_transactions: Vec<HourTransaction>,
        now: DateTime<Utc>,
    ) -> BalanceDetail {
        let active_packages = Self::active_packages(purchases);
        let expiring_packages = self.expiring_packages(purchases, now);
        let active_alerts = self.alerts(total_hours, &active_packages, &expiring_packages);

        recent_transactions.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        recent_transactions.truncate(self.policy.recent_transaction_count);

        BalanceDetail {
            student_id,
            total_hours: round_hours(total_hours),
            active_packages,
            expiring_packages,
            recent_transactions,
            active_alerts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{PaymentStatus, TransactionDraft, TransactionType};

    fn package(hours: f64, valid_days: i64) -> HourPurchase {
        HourPurchase::new(
            StudentId::new(),
            format!("{}-day pack", valid_days),
            hours,
            hours * 25.0,
            valid_days,
            PaymentStatus::Completed,
        )
        .unwrap()
    }

    fn entry(kind: TransactionType, hours: f64, before: f64) -> HourTransaction {
        TransactionDraft::new(StudentId::new(), kind, hours, "system")
            .into_transaction(before)
            .unwrap()
    }

    #[test]
    fn test_balance_excludes_reversed_pairs() {
        let purchase = entry(TransactionType::Purchase, 10.0, 0.0);
        let mut deduction = entry(TransactionType::Deduction, -2.0, 10.0);
        let reversal = deduction
            .reversal_draft("charged twice", "admin")
            .unwrap()
            .into_transaction(8.0)
            .unwrap();
        deduction.mark_reversed().unwrap();

        let balance = BalanceCalculator::balance_of(&[purchase, deduction, reversal]);
        assert_eq!(balance, 10.0);
        assert_eq!(BalanceCalculator::balance_of(&Vec::<HourTransaction>::new()), 0.0);
    }

    #[test]
    fn test_active_packages_sorted_by_expiry() {
        let late = package(5.0, 120);
        let early = package(5.0, 10);
        let mut expired = package(5.0, 5);
        expired.expire().unwrap();

        let active = BalanceCalculator::active_packages(&[late.clone(), expired, early.clone()]);
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].id(), early.id());
        assert_eq!(active[1].id(), late.id());
    }

    #[test]
    fn test_allocate_deduction_is_fifo_by_expiry() {
        let mut packages = vec![package(5.0, 90), package(1.5, 7)];
        let soonest = packages[1].id().clone();

        let allocations = BalanceCalculator::allocate_deduction(&mut packages, 3.0);
        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0], (soonest, 1.5));
        assert_eq!(allocations[1].1, 1.5);
        assert_eq!(packages[0].hours_remaining(), 0.0);
        assert_eq!(packages[1].hours_remaining(), 3.5);
    }

    #[test]
    fn test_detail_alerts() {
        let calculator = BalanceCalculator::default();
        let purchases = vec![package(1.0, 10), package(4.0, 200)];
        let detail = calculator.detail(StudentId::new(), 1.0, &purchases, vec![], Utc::now());

        assert_eq!(detail.active_packages.len(), 2);
        assert_eq!(detail.expiring_packages.len(), 1);
        assert!(detail
            .active_alerts
            .iter()
            .any(|a| matches!(a, BalanceAlert::LowBalance { .. })));
        assert!(detail
            .active_alerts
            .iter()
            .any(|a| matches!(a, BalanceAlert::PackageExpiring { .. })));
        assert!(!detail.active_alerts.contains(&BalanceAlert::NoActivePackage));
    }

    #[test]
    fn test_zero_balance_without_packages() {
        let calculator = BalanceCalculator::default();
        let detail = calculator.detail(StudentId::new(), 0.0, &[], vec![], Utc::now());
        assert_eq!(detail.total_hours, 0.0);
        assert!(detail.active_alerts.contains(&BalanceAlert::NoActivePackage));
    }

    #[test]
    fn test_recent_transactions_truncated_newest_first() {
        let calculator = BalanceCalculator::new(BalancePolicy {
            recent_transaction_count: 2,
            ..BalancePolicy::default()
        });
        let rows: Vec<HourTransaction> = (0..4)
            .map(|i| entry(TransactionType::Bonus, 1.0, i as f64))
            .collect();
        let detail = calculator.detail(StudentId::new(), 4.0, &[], rows, Utc::now());
        assert_eq!(detail.recent_transactions.len(), 2);
        assert!(
            detail.recent_transactions[0].created_at() >= detail.recent_transactions[1].created_at()
        );
    }
}
