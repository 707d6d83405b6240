// akeno-admin/src/models/consultation.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Pending => "pending",
            ConsultationStatus::Confirmed => "confirmed",
            ConsultationStatus::Completed => "completed",
            ConsultationStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsultationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ConsultationStatus::Pending),
            "confirmed" => Ok(ConsultationStatus::Confirmed),
            "completed" => Ok(ConsultationStatus::Completed),
            "cancelled" => Ok(ConsultationStatus::Cancelled),
            other => Err(format!(
                "Invalid status '{}'. Must be pending, confirmed, completed or cancelled",
                other
            )),
        }
    }
}

// Consultation request as owned by the backend. Status stays a raw string so
// one unexpected value does not fail the whole listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConsultationRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub preferred_date: String,
    #[serde(default)]
    pub preferred_time: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: String,
}

impl ConsultationRecord {
    pub fn status(&self) -> Option<ConsultationStatus> {
        self.status.parse().ok()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }
}

// Backend timestamps come as RFC 3339, naive ISO (read as UTC) or bare dates
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConsultationLogEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub consultation_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub company: String,
}

impl ConsultationLogEntry {
    pub fn is_deleted(&self) -> bool {
        self.action.eq_ignore_ascii_case("deleted") || self.status.eq_ignore_ascii_case("deleted")
    }
}

// Client-side filters of the log view
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogFilter {
    #[serde(default = "LogFilter::default_hours")]
    pub hours: u32,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub hide_deleted: bool,
}

impl LogFilter {
    fn default_hours() -> u32 {
        24
    }

    pub fn apply(&self, logs: Vec<ConsultationLogEntry>) -> Vec<ConsultationLogEntry> {
        let status = self
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        logs.into_iter()
            .filter(|log| !(self.hide_deleted && log.is_deleted()))
            .filter(|log| status.map_or(true, |s| log.status.eq_ignore_ascii_case(s)))
            .collect()
    }
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            hours: Self::default_hours(),
            status: None,
            hide_deleted: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AvailableSlot {
    pub date: String,
    #[serde(default)]
    pub times: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ConsultationForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    pub preferred_date: String,
    pub preferred_time: String,
    #[serde(default)]
    pub message: String,
}

// Aggregate counters over the latest consultation snapshot
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub recent: usize,
}

impl DashboardStats {
    pub const RECENT_DAYS: i64 = 7;

    pub fn from_records(records: &[ConsultationRecord], now: DateTime<Utc>) -> Self {
        let cutoff = now - Duration::days(Self::RECENT_DAYS);
        let mut stats = DashboardStats {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            match record.status() {
                Some(ConsultationStatus::Pending) => stats.pending += 1,
                Some(ConsultationStatus::Confirmed) => stats.confirmed += 1,
                Some(ConsultationStatus::Completed) => stats.completed += 1,
                Some(ConsultationStatus::Cancelled) => stats.cancelled += 1,
                None => {}
            }
            if record.created_at().map_or(false, |created| created >= cutoff) {
                stats.recent += 1;
            }
        }

        stats
    }
}
