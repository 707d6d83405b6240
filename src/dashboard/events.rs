// akeno-admin/src/dashboard/events.rs
use crate::models::ConsultationStatus;
use log::debug;
use serde::Serialize;
use tokio::sync::broadcast;

// Published after a mutation so every view can resynchronize
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataChanged {
    ConsultationStatusChanged {
        id: String,
        status: ConsultationStatus,
    },
    ConsultationDeleted {
        id: String,
    },
    ConsultationScheduled,
    LogsCleared,
    TeamChanged,
    DataPurged,
}

impl DataChanged {
    // Whether consultation counters and logs may be out of date
    pub fn affects_consultations(&self) -> bool {
        !matches!(self, DataChanged::TeamChanged)
    }
}

#[derive(Clone)]
pub struct DataEvents {
    tx: broadcast::Sender<DataChanged>,
}

impl DataEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns how many subscribers saw the event; zero is fine.
    pub fn publish(&self, event: DataChanged) -> usize {
        debug!("📣 {:?}", event);
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataChanged> {
        self.tx.subscribe()
    }
}

impl Default for DataEvents {
    fn default() -> Self {
        Self::new(64)
    }
}
