use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ratio, ReportWindow};
use crate::ledger::{HourPurchase, PaymentStatus};
use crate::shared::round_hours;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueDay {
    pub date: NaiveDate,
    pub revenue: f64,
    pub hours_sold: f64,
    pub purchases: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRevenue {
    pub package_name: String,
    pub revenue: f64,
    pub hours_sold: f64,
    pub purchases: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub window: ReportWindow,
    pub total_revenue: f64,
    pub hours_sold: f64,
    pub purchases: u32,
    pub average_price_per_hour: f64,
    pub by_day: Vec<RevenueDay>,
    pub by_package: Vec<PackageRevenue>,
}

#[derive(Default)]
struct Sum {
    revenue: f64,
    hours: f64,
    count: u32,
}

/// Revenue from completed purchases created inside `window`
pub fn revenue_report(window: ReportWindow, purchases: &[HourPurchase]) -> RevenueReport {
    let mut total = Sum::default();
    let mut by_day: BTreeMap<NaiveDate, Sum> = BTreeMap::new();
    let mut by_package: BTreeMap<String, Sum> = BTreeMap::new();

    for purchase in purchases.iter().filter(|p| {
        p.payment_status() == PaymentStatus::Completed && window.contains(p.created_at())
    }) {
        for sum in [
            &mut total,
            by_day.entry(purchase.created_at().date_naive()).or_default(),
        ] {
            sum.revenue += purchase.amount_paid();
            sum.hours += purchase.hours_purchased();
            sum.count += 1;
        }
        let package = by_package
            .entry(purchase.package_name().to_string())
            .or_default();
        package.revenue += purchase.amount_paid();
        package.hours += purchase.hours_purchased();
        package.count += 1;
    }

    let mut by_package: Vec<PackageRevenue> = by_package
        .into_iter()
        .map(|(package_name, sum)| PackageRevenue {
            package_name,
            revenue: round_hours(sum.revenue),
            hours_sold: round_hours(sum.hours),
            purchases: sum.count,
        })
        .collect();
    by_package.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));

    RevenueReport {
        window,
        total_revenue: round_hours(total.revenue),
        hours_sold: round_hours(total.hours),
        purchases: total.count,
        average_price_per_hour: round_hours(ratio(total.revenue, total.hours)),
        by_day: by_day
            .into_iter()
            .map(|(date, sum)| RevenueDay {
                date,
                revenue: round_hours(sum.revenue),
                hours_sold: round_hours(sum.hours),
                purchases: sum.count,
            })
            .collect(),
        by_package,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::StudentId;
    use chrono::{Duration, Utc};

    fn purchase(name: &str, hours: f64, paid: f64, status: PaymentStatus) -> HourPurchase {
        HourPurchase::new(StudentId::new(), name.to_string(), hours, paid, 90, status).unwrap()
    }

    #[test]
    fn test_revenue_counts_completed_only() {
        let now = Utc::now();
        let window = ReportWindow::new(now - Duration::days(1), now + Duration::days(1)).unwrap();
        let report = revenue_report(
            window,
            &[
                purchase("Starter 10", 10.0, 300.0, PaymentStatus::Completed),
                purchase("Starter 10", 10.0, 300.0, PaymentStatus::Completed),
                purchase("Intensive 20", 20.0, 500.0, PaymentStatus::Completed),
                purchase("Intensive 20", 20.0, 500.0, PaymentStatus::Pending),
            ],
        );

        assert_eq!(report.purchases, 3);
        assert_eq!(report.total_revenue, 1100.0);
        assert_eq!(report.hours_sold, 40.0);
        assert_eq!(report.average_price_per_hour, 27.5);
        assert_eq!(report.by_package[0].package_name, "Starter 10");
        assert_eq!(report.by_package[0].purchases, 2);
        assert_eq!(report.by_day.len(), 1);
    }

    #[test]
    fn test_empty_window() {
        let now = Utc::now();
        let window = ReportWindow::new(now - Duration::days(1), now).unwrap();
        let report = revenue_report(window, &[]);
        assert_eq!(report.total_revenue, 0.0);
        assert_eq!(report.average_price_per_hour, 0.0);
    }
}
