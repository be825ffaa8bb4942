use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use classledger_domain::analytics::{
    class_efficiency_report, consumption_report, performance_report, revenue_report,
    AnalyticsRepository, ClassEfficiencyReport, ConsumptionReport, EfficiencyThresholds,
    PerformanceReport, PerformanceSample, ReportWindow, RevenueReport,
};
use classledger_domain::shared::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ReportKind {
    ClassEfficiency,
    Consumption,
    Revenue,
    Performance,
}

#[derive(Debug, Clone)]
enum CachedReport {
    ClassEfficiency(ClassEfficiencyReport),
    Consumption(ConsumptionReport),
    Revenue(RevenueReport),
    Performance(PerformanceReport),
}

struct CacheEntry {
    stored_at: Instant,
    report: CachedReport,
}

/// Report builders behind a per-window TTL cache.
///
/// Results may be up to one TTL stale; `force_refresh` always hits the store.
pub struct AnalyticsService {
    analytics_repo: Arc<dyn AnalyticsRepository>,
    thresholds: EfficiencyThresholds,
    ttl: Duration,
    cache: RwLock<HashMap<(ReportKind, ReportWindow), CacheEntry>>,
}

impl AnalyticsService {
    pub fn new(
        analytics_repo: Arc<dyn AnalyticsRepository>,
        thresholds: EfficiencyThresholds,
        ttl: Duration,
    ) -> Self {
        Self {
            analytics_repo,
            thresholds,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn cached(&self, kind: ReportKind, window: ReportWindow) -> Option<CachedReport> {
        let cache = self.cache.read().await;
        cache
            .get(&(kind, window))
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.report.clone())
    }

    async fn store(&self, kind: ReportKind, window: ReportWindow, report: CachedReport) {
        let mut cache = self.cache.write().await;
        let ttl = self.ttl;
        cache.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        cache.insert(
            (kind, window),
            CacheEntry {
                stored_at: Instant::now(),
                report,
            },
        );
    }

    pub async fn class_efficiency(
        &self,
        window: ReportWindow,
        force_refresh: bool,
    ) -> Result<ClassEfficiencyReport, DomainError> {
        if !force_refresh {
            if let Some(CachedReport::ClassEfficiency(report)) =
                self.cached(ReportKind::ClassEfficiency, window).await
            {
                debug!("Class efficiency report served from cache");
                return Ok(report);
            }
        }

        let classes = self.analytics_repo.list_classes_between(&window).await?;
        let report = class_efficiency_report(window, &classes, &self.thresholds);
        debug!(classes = classes.len(), "Class efficiency report built");

        self.store(
            ReportKind::ClassEfficiency,
            window,
            CachedReport::ClassEfficiency(report.clone()),
        )
        .await;
        Ok(report)
    }

    pub async fn consumption(
        &self,
        window: ReportWindow,
        force_refresh: bool,
    ) -> Result<ConsumptionReport, DomainError> {
        if !force_refresh {
            if let Some(CachedReport::Consumption(report)) =
                self.cached(ReportKind::Consumption, window).await
            {
                debug!("Consumption report served from cache");
                return Ok(report);
            }
        }

        let transactions = self
            .analytics_repo
            .list_transactions_between(&window)
            .await?;
        let report = consumption_report(window, &transactions);
        debug!(transactions = transactions.len(), "Consumption report built");

        self.store(
            ReportKind::Consumption,
            window,
            CachedReport::Consumption(report.clone()),
        )
        .await;
        Ok(report)
    }

    pub async fn revenue(
        &self,
        window: ReportWindow,
        force_refresh: bool,
    ) -> Result<RevenueReport, DomainError> {
        if !force_refresh {
            if let Some(CachedReport::Revenue(report)) =
                self.cached(ReportKind::Revenue, window).await
            {
                debug!("Revenue report served from cache");
                return Ok(report);
            }
        }

        let purchases = self
            .analytics_repo
            .list_completed_purchases_between(&window)
            .await?;
        let report = revenue_report(window, &purchases);
        debug!(purchases = purchases.len(), "Revenue report built");

        self.store(ReportKind::Revenue, window, CachedReport::Revenue(report.clone()))
            .await;
        Ok(report)
    }

    pub async fn performance(
        &self,
        window: ReportWindow,
        force_refresh: bool,
    ) -> Result<PerformanceReport, DomainError> {
        if !force_refresh {
            if let Some(CachedReport::Performance(report)) =
                self.cached(ReportKind::Performance, window).await
            {
                debug!("Performance report served from cache");
                return Ok(report);
            }
        }

        let samples = self
            .analytics_repo
            .list_performance_samples_between(&window)
            .await?;
        let report = performance_report(window, &samples);
        debug!(samples = samples.len(), "Performance report built");

        self.store(
            ReportKind::Performance,
            window,
            CachedReport::Performance(report.clone()),
        )
        .await;
        Ok(report)
    }

    /// Store one telemetry sample. Cached performance reports are dropped.
    pub async fn record_sample(
        &self,
        metric: &str,
        value: f64,
        page: Option<String>,
    ) -> Result<PerformanceSample, DomainError> {
        let metric = metric.trim();
        if metric.is_empty() {
            return Err(DomainError::Validation(
                "Metric name is required".to_string(),
            ));
        }
        if !value.is_finite() || value < 0.0 {
            return Err(DomainError::Validation(format!(
                "Metric value must be a non-negative number, got {}",
                value
            )));
        }

        let sample = PerformanceSample {
            metric: metric.to_uppercase(),
            value,
            page: page.filter(|p| !p.trim().is_empty()),
            recorded_at: Utc::now(),
        };
        self.analytics_repo.record_performance_sample(&sample).await?;

        self.cache
            .write()
            .await
            .retain(|(kind, _), _| *kind != ReportKind::Performance);
        Ok(sample)
    }

    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        let dropped = cache.len();
        cache.clear();
        info!(dropped, "Analytics cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use classledger_domain::catalog::ScheduledClass;
    use classledger_domain::ledger::{HourPurchase, HourTransaction};
    use mockall::mock;

    mock! {
        pub Analytics {}

        #[async_trait]
        impl AnalyticsRepository for Analytics {
            async fn list_transactions_between(
                &self,
                window: &ReportWindow,
            ) -> Result<Vec<HourTransaction>, DomainError>;

            async fn list_completed_purchases_between(
                &self,
                window: &ReportWindow,
            ) -> Result<Vec<HourPurchase>, DomainError>;

            async fn list_classes_between(
                &self,
                window: &ReportWindow,
            ) -> Result<Vec<ScheduledClass>, DomainError>;

            async fn record_performance_sample(
                &self,
                sample: &PerformanceSample,
            ) -> Result<(), DomainError>;

            async fn list_performance_samples_between(
                &self,
                window: &ReportWindow,
            ) -> Result<Vec<PerformanceSample>, DomainError>;
        }
    }

    fn window() -> ReportWindow {
        let to = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        ReportWindow::new(to - ChronoDuration::days(30), to).unwrap()
    }

    fn service(repo: MockAnalytics) -> AnalyticsService {
        AnalyticsService::new(
            Arc::new(repo),
            EfficiencyThresholds::default(),
            Duration::from_secs(900),
        )
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let mut repo = MockAnalytics::new();
        repo.expect_list_transactions_between()
            .times(1)
            .returning(|_| Ok(Vec::new()));
        let service = service(repo);

        service.consumption(window(), false).await.unwrap();
        service.consumption(window(), false).await.unwrap();
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let mut repo = MockAnalytics::new();
        repo.expect_list_completed_purchases_between()
            .times(2)
            .returning(|_| Ok(Vec::new()));
        let service = service(repo);

        service.revenue(window(), false).await.unwrap();
        service.revenue(window(), true).await.unwrap();
    }

    #[tokio::test]
    async fn test_windows_are_cached_separately() {
        let mut repo = MockAnalytics::new();
        repo.expect_list_classes_between()
            .times(2)
            .returning(|_| Ok(Vec::new()));
        let service = service(repo);
        let other = ReportWindow::new(window().from, window().to - ChronoDuration::days(1)).unwrap();

        service.class_efficiency(window(), false).await.unwrap();
        service.class_efficiency(other, false).await.unwrap();
        service.class_efficiency(window(), false).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_is_not_cached() {
        let mut repo = MockAnalytics::new();
        let mut calls = 0;
        repo.expect_list_performance_samples_between()
            .times(2)
            .returning(move |_| {
                calls += 1;
                if calls == 1 {
                    Err(DomainError::Repository("connection reset".to_string()))
                } else {
                    Ok(Vec::new())
                }
            });
        let service = service(repo);

        assert!(service.performance(window(), false).await.is_err());
        assert!(service.performance(window(), false).await.is_ok());
    }

    #[tokio::test]
    async fn test_record_sample_invalidates_performance_reports() {
        let mut repo = MockAnalytics::new();
        repo.expect_list_performance_samples_between()
            .times(2)
            .returning(|_| Ok(Vec::new()));
        repo.expect_record_performance_sample()
            .times(1)
            .returning(|_| Ok(()));
        let service = service(repo);

        service.performance(window(), false).await.unwrap();
        let sample = service.record_sample("lcp", 1800.0, None).await.unwrap();
        service.performance(window(), false).await.unwrap();

        assert_eq!(sample.metric, "LCP");
    }

    #[tokio::test]
    async fn test_record_sample_rejects_negative_values() {
        let service = service(MockAnalytics::new());
        let err = service.record_sample("CLS", -0.1, None).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
