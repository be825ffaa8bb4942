use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ratio, ReportWindow};
use crate::catalog::{ClassStatus, ScheduledClass};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyThresholds {
    pub utilization_target: f64,
    pub peak_utilization: f64,
    pub revenue_efficiency_target: f64,
}

impl Default for EfficiencyThresholds {
    fn default() -> Self {
        Self {
            utilization_target: 0.70,
            peak_utilization: 0.90,
            revenue_efficiency_target: 0.60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    CapacityAdjustment,
    ScheduleExpansion,
    PricingReview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
    pub metric: String,
    pub value: f64,
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyBucket {
    pub key: String,
    pub classes: u32,
    pub capacity: u32,
    pub enrolled: u32,
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEfficiencyReport {
    pub window: ReportWindow,
    pub total_classes: u32,
    pub total_capacity: u32,
    pub total_enrolled: u32,
    pub utilization: f64,
    pub actual_revenue: f64,
    pub potential_revenue: f64,
    pub revenue_efficiency: f64,
    pub by_weekday: Vec<EfficiencyBucket>,
    pub by_hour: Vec<EfficiencyBucket>,
    pub by_class_type: Vec<EfficiencyBucket>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Default)]
struct Tally {
    classes: u32,
    capacity: u32,
    enrolled: u32,
}

impl Tally {
    fn add(&mut self, class: &ScheduledClass) {
        self.classes += 1;
        self.capacity += class.capacity;
        self.enrolled += class.enrolled;
    }

    fn into_bucket(self, key: String) -> EfficiencyBucket {
        EfficiencyBucket {
            key,
            classes: self.classes,
            capacity: self.capacity,
            enrolled: self.enrolled,
            utilization: ratio(self.enrolled as f64, self.capacity as f64),
        }
    }
}

pub fn class_efficiency_report(
    window: ReportWindow,
    classes: &[ScheduledClass],
    thresholds: &EfficiencyThresholds,
) -> ClassEfficiencyReport {
    let mut total = Tally::default();
    let mut actual_revenue = 0.0;
    let mut potential_revenue = 0.0;
    let mut by_weekday: BTreeMap<u32, (String, Tally)> = BTreeMap::new();
    let mut by_hour: BTreeMap<u32, Tally> = BTreeMap::new();
    let mut by_class_type: BTreeMap<String, Tally> = BTreeMap::new();

    for class in classes
        .iter()
        .filter(|c| c.status != ClassStatus::Cancelled && window.contains(c.starts_at))
    {
        total.add(class);
        let hourly = class.price_per_hour * class.duration_hours;
        actual_revenue += class.enrolled as f64 * hourly;
        potential_revenue += class.capacity as f64 * hourly;

        let weekday = class.starts_at.weekday();
        by_weekday
            .entry(weekday.num_days_from_monday())
            .or_insert_with(|| (weekday.to_string(), Tally::default()))
            .1
            .add(class);
        by_hour.entry(class.starts_at.hour()).or_default().add(class);
        by_class_type
            .entry(class.class_type.clone())
            .or_default()
            .add(class);
    }

    let by_weekday: Vec<EfficiencyBucket> = by_weekday
        .into_values()
        .map(|(key, tally)| tally.into_bucket(key))
        .collect();
    let by_hour: Vec<EfficiencyBucket> = by_hour
        .into_iter()
        .map(|(hour, tally)| tally.into_bucket(format!("{:02}:00", hour)))
        .collect();
    let by_class_type: Vec<EfficiencyBucket> = by_class_type
        .into_iter()
        .map(|(key, tally)| tally.into_bucket(key))
        .collect();

    let total_classes = total.classes;
    let total_capacity = total.capacity;
    let total_enrolled = total.enrolled;
    let utilization = ratio(total_enrolled as f64, total_capacity as f64);
    let revenue_efficiency = ratio(actual_revenue, potential_revenue);

    let mut recommendations = Vec::new();
    if total_classes > 0 && utilization < thresholds.utilization_target {
        recommendations.push(Recommendation {
            kind: RecommendationKind::CapacityAdjustment,
            message: format!(
                "Utilization is {:.0}%, below the {:.0}% target: consolidate or shrink under-filled classes",
                utilization * 100.0,
                thresholds.utilization_target * 100.0
            ),
            metric: "utilization".to_string(),
            value: utilization,
            target: thresholds.utilization_target,
        });
    }

    for (dimension, bucket) in by_weekday
        .iter()
        .map(|b| ("weekday", b))
        .chain(by_hour.iter().map(|b| ("hour", b)))
    {
        if bucket.utilization >= thresholds.peak_utilization {
            recommendations.push(Recommendation {
                kind: RecommendationKind::ScheduleExpansion,
                message: format!(
                    "{} {} runs at {:.0}% utilization: add sessions in this slot",
                    dimension,
                    bucket.key,
                    bucket.utilization * 100.0
                ),
                metric: format!("{}_utilization", dimension),
                value: bucket.utilization,
                target: thresholds.peak_utilization,
            });
        }
    }

    if potential_revenue > 0.0 && revenue_efficiency < thresholds.revenue_efficiency_target {
        recommendations.push(Recommendation {
            kind: RecommendationKind::PricingReview,
            message: format!(
                "Revenue efficiency is {:.0}% of potential: review pricing and class sizes",
                revenue_efficiency * 100.0
            ),
            metric: "revenue_efficiency".to_string(),
            value: revenue_efficiency,
            target: thresholds.revenue_efficiency_target,
        });
    }

    ClassEfficiencyReport {
        window,
        total_classes,
        total_capacity,
        total_enrolled,
        utilization,
        actual_revenue,
        potential_revenue,
        revenue_efficiency,
        by_weekday,
        by_hour,
        by_class_type,
        recommendations,
    }
}
