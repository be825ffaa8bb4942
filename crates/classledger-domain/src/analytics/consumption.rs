use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{ratio, ReportWindow};
use crate::ledger::{HourTransaction, TransactionType};
use crate::shared::{round_hours, StudentId};

const TOP_CONSUMERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionDay {
    pub date: NaiveDate,
    pub hours_deducted: f64,
    pub hours_credited: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentConsumption {
    pub student_id: StudentId,
    pub hours_deducted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionReport {
    pub window: ReportWindow,
    pub hours_deducted: f64,
    pub hours_credited: f64,
    pub hours_refunded: f64,
    pub hours_expired: f64,
    pub net_adjustments: f64,
    pub active_students: u32,
    pub average_hours_per_student: f64,
    pub by_day: Vec<ConsumptionDay>,
    pub by_class_type: BTreeMap<String, f64>,
    pub top_consumers: Vec<StudentConsumption>,
}

/// Aggregate ledger movement inside `window`.
///
/// Reversed entries and their reversal counter-entries cancel out and are
/// skipped, matching how the balance is computed.
pub fn consumption_report(window: ReportWindow, transactions: &[HourTransaction]) -> ConsumptionReport {
    let mut hours_deducted = 0.0;
    let mut hours_credited = 0.0;
    let mut hours_refunded = 0.0;
    let mut hours_expired = 0.0;
    let mut net_adjustments = 0.0;
    let mut by_day: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    let mut by_class_type: BTreeMap<String, f64> = BTreeMap::new();
    let mut per_student: HashMap<StudentId, f64> = HashMap::new();
    let mut active: HashSet<StudentId> = HashSet::new();

    for txn in transactions
        .iter()
        .filter(|t| t.counts_toward_balance() && window.contains(t.created_at()))
    {
        let amount = txn.hours_amount();
        let day = by_day.entry(txn.created_at().date_naive()).or_default();

        match txn.transaction_type() {
            TransactionType::Deduction => {
                let used = -amount;
                hours_deducted += used;
                day.0 += used;
                *by_class_type
                    .entry(txn.class_type().unwrap_or("unspecified").to_string())
                    .or_default() += used;
                *per_student.entry(txn.student_id().clone()).or_default() += used;
                active.insert(txn.student_id().clone());
            }
            TransactionType::Purchase | TransactionType::Bonus => {
                hours_credited += amount;
                day.1 += amount;
            }
            TransactionType::Refund => hours_refunded += amount,
            TransactionType::Expiry => hours_expired += -amount,
            TransactionType::Adjustment => net_adjustments += amount,
            TransactionType::Transfer | TransactionType::Reversal => {}
        }
    }

    let mut top_consumers: Vec<StudentConsumption> = per_student
        .into_iter()
        .map(|(student_id, hours)| StudentConsumption {
            student_id,
            hours_deducted: round_hours(hours),
        })
        .collect();
    top_consumers.sort_by(|a, b| {
        b.hours_deducted
            .total_cmp(&a.hours_deducted)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    top_consumers.truncate(TOP_CONSUMERS);

    let active_students = active.len() as u32;

    ConsumptionReport {
        window,
        hours_deducted: round_hours(hours_deducted),
        hours_credited: round_hours(hours_credited),
        hours_refunded: round_hours(hours_refunded),
        hours_expired: round_hours(hours_expired),
        net_adjustments: round_hours(net_adjustments),
        active_students,
        average_hours_per_student: round_hours(ratio(hours_deducted, active_students as f64)),
        by_day: by_day
            .into_iter()
            .map(|(date, (deducted, credited))| ConsumptionDay {
                date,
                hours_deducted: round_hours(deducted),
                hours_credited: round_hours(credited),
            })
            .collect(),
        by_class_type: by_class_type
            .into_iter()
            .map(|(k, v)| (k, round_hours(v)))
            .collect(),
        top_consumers,
    }
}
