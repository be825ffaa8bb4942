use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ReportWindow;

/// One client-reported web vital measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub metric: String,
    pub value: f64,
    pub page: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricRating {
    Good,
    NeedsImprovement,
    Poor,
}

impl MetricRating {
    /// Rate `value` against the published good/poor thresholds. Unknown
    /// metrics are not rated.
    pub fn rate(metric: &str, value: f64) -> Option<Self> {
        let (good, poor) = match metric.to_ascii_uppercase().as_str() {
            "LCP" => (2500.0, 4000.0),
            "FID" => (100.0, 300.0),
            "INP" => (200.0, 500.0),
            "CLS" => (0.1, 0.25),
            "TTFB" => (800.0, 1800.0),
            "FCP" => (1800.0, 3000.0),
            _ => return None,
        };

        Some(if value <= good {
            Self::Good
        } else if value <= poor {
            Self::NeedsImprovement
        } else {
            Self::Poor
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub metric: String,
    pub count: u32,
    pub mean: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub rating: Option<MetricRating>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub window: ReportWindow,
    pub sample_count: u32,
    pub metrics: Vec<MetricSummary>,
}

// Nearest-rank percentile over a sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

pub fn performance_report(window: ReportWindow, samples: &[PerformanceSample]) -> PerformanceReport {
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut sample_count = 0;

    for sample in samples
        .iter()
        .filter(|s| window.contains(s.recorded_at) && s.value.is_finite())
    {
        sample_count += 1;
        grouped
            .entry(sample.metric.to_ascii_uppercase())
            .or_default()
            .push(sample.value);
    }

    let metrics = grouped
        .into_iter()
        .map(|(metric, mut values)| {
            values.sort_by(f64::total_cmp);
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let p75 = percentile(&values, 75.0);
            MetricSummary {
                rating: MetricRating::rate(&metric, p75),
                count: values.len() as u32,
                mean,
                p50: percentile(&values, 50.0),
                p75,
                p95: percentile(&values, 95.0),
                metric,
            }
        })
        .collect();

    PerformanceReport {
        window,
        sample_count,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(metric: &str, value: f64) -> PerformanceSample {
        PerformanceSample {
            metric: metric.to_string(),
            value,
            page: Some("/dashboard".to_string()),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_rating_thresholds() {
        assert_eq!(MetricRating::rate("LCP", 2500.0), Some(MetricRating::Good));
        assert_eq!(
            MetricRating::rate("lcp", 2501.0),
            Some(MetricRating::NeedsImprovement)
        );
        assert_eq!(MetricRating::rate("CLS", 0.3), Some(MetricRating::Poor));
        assert_eq!(MetricRating::rate("custom", 1.0), None);
    }

    #[test]
    fn test_percentiles_and_rating() {
        let now = Utc::now();
        let window = ReportWindow::new(now - Duration::hours(1), now + Duration::hours(1)).unwrap();
        let mut samples: Vec<_> = (1..=20).map(|i| sample("TTFB", i as f64 * 100.0)).collect();
        samples.push(sample("CLS", 0.05));

        let report = performance_report(window, &samples);
        assert_eq!(report.sample_count, 21);

        let cls = &report.metrics[0];
        assert_eq!(cls.metric, "CLS");
        assert_eq!(cls.rating, Some(MetricRating::Good));

        let ttfb = &report.metrics[1];
        assert_eq!(ttfb.count, 20);
        assert_eq!(ttfb.p50, 1000.0);
        assert_eq!(ttfb.p75, 1500.0);
        assert_eq!(ttfb.p95, 1900.0);
        assert_eq!(ttfb.mean, 1050.0);
        assert_eq!(ttfb.rating, Some(MetricRating::NeedsImprovement));
    }
}
