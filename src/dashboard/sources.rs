// akeno-admin/src/dashboard/sources.rs
use crate::client::ApiClient;
use crate::dashboard::poller::RefreshSource;
use crate::models::{ClientError, ConsultationLogEntry, ConsultationRecord, DashboardStats, LogFilter};
use chrono::Utc;
use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// Summary counters over /consultation/all
pub struct StatsSource {
    api: Arc<ApiClient>,
    last_total: AtomicUsize,
}

impl StatsSource {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            last_total: AtomicUsize::new(0),
        }
    }
}

impl RefreshSource for StatsSource {
    type Output = DashboardStats;

    fn name(&self) -> &'static str {
        "consultation stats"
    }

    async fn fetch(&self) -> Result<DashboardStats, ClientError> {
        let records = self.api.list_consultations().await?;
        let stats = DashboardStats::from_records(&records, Utc::now());

        let previous = self.last_total.swap(stats.total, Ordering::SeqCst);
        if previous > 0 && stats.total > previous {
            info!(
                "🆕 New consultation detected! Count increased from {} to {}",
                previous, stats.total
            );
        }
        Ok(stats)
    }
}

pub struct ConsultationsSource {
    api: Arc<ApiClient>,
}

impl ConsultationsSource {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

impl RefreshSource for ConsultationsSource {
    type Output = Vec<ConsultationRecord>;

    fn name(&self) -> &'static str {
        "consultations"
    }

    async fn fetch(&self) -> Result<Vec<ConsultationRecord>, ClientError> {
        self.api.list_consultations().await
    }
}

// Recent logs, filtered on our side
pub struct LogsSource {
    api: Arc<ApiClient>,
    filter: Mutex<LogFilter>,
}

impl LogsSource {
    pub fn new(api: Arc<ApiClient>, filter: LogFilter) -> Self {
        Self {
            api,
            filter: Mutex::new(filter),
        }
    }

    pub fn filter(&self) -> LogFilter {
        self.filter
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    pub fn set_filter(&self, filter: LogFilter) {
        if let Ok(mut current) = self.filter.lock() {
            *current = filter;
        }
    }
}

impl RefreshSource for LogsSource {
    type Output = Vec<ConsultationLogEntry>;

    fn name(&self) -> &'static str {
        "consultation logs"
    }

    async fn fetch(&self) -> Result<Vec<ConsultationLogEntry>, ClientError> {
        let filter = self.filter();
        let logs = self.api.recent_logs(filter.hours).await?;
        Ok(filter.apply(logs))
    }
}
