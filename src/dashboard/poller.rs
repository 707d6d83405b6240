// akeno-admin/src/dashboard/poller.rs
//
// Per-view refresh loop. A foreground load is user-initiated and surfaces
// failures in the view; a background load comes from the timer and only logs.

use crate::auth::AuthGateway;
use crate::models::ClientError;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Something a view knows how to fetch.
pub trait RefreshSource: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    fn fetch(&self) -> impl Future<Output = Result<Self::Output, ClientError>> + Send;
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Idle,
    LoadingForeground,
    LoadingBackground,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Foreground,
    Background,
}

#[derive(Serialize, Debug, Clone)]
pub struct ViewState<T> {
    pub phase: LoadPhase,
    pub data: Option<T>,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            phase: LoadPhase::Idle,
            data: None,
            error: None,
            last_updated: None,
        }
    }
}

struct Slot<T> {
    view: ViewState<T>,
    // Sequence number of the load whose result is on display
    applied_seq: u64,
}

pub struct RefreshLoop<S: RefreshSource> {
    source: S,
    slot: Mutex<Slot<S::Output>>,
    next_seq: AtomicU64,
    active: Arc<AtomicBool>,
}

impl<S: RefreshSource> RefreshLoop<S> {
    pub fn new(source: S) -> Arc<Self> {
        Arc::new(Self {
            source,
            slot: Mutex::new(Slot {
                view: ViewState::default(),
                applied_seq: 0,
            }),
            next_seq: AtomicU64::new(1),
            active: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn snapshot(&self) -> ViewState<S::Output> {
        self.slot
            .lock()
            .map(|slot| slot.view.clone())
            .unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub async fn load(&self, mode: LoadMode) -> Result<(), ClientError> {
        if !self.is_active() {
            return Ok(());
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);

        let resumed_phase = match self.slot.lock() {
            Ok(mut slot) => {
                let previous = slot.view.phase;
                match mode {
                    LoadMode::Foreground => {
                        slot.view.phase = LoadPhase::LoadingForeground;
                        slot.view.error = None;
                    }
                    LoadMode::Background => {
                        if previous != LoadPhase::LoadingForeground {
                            slot.view.phase = LoadPhase::LoadingBackground;
                        }
                    }
                }
                previous
            }
            Err(_) => LoadPhase::Idle,
        };

        let result = self.source.fetch().await;

        // A torn-down view keeps whatever it showed last
        if !self.is_active() {
            debug!("Dropping {} result for a closed view", self.source.name());
            return result.map(|_| ());
        }

        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(_) => return result.map(|_| ()),
        };
        let stale = seq < slot.applied_seq;

        match result {
            Ok(data) => {
                if !stale {
                    slot.applied_seq = seq;
                    slot.view.data = Some(data);
                    slot.view.error = None;
                    slot.view.phase = LoadPhase::Idle;
                    slot.view.last_updated = Some(Utc::now());
                }
                Ok(())
            }
            Err(e) => {
                match mode {
                    LoadMode::Foreground => {
                        error!("❌ Error loading {}: {}", self.source.name(), e);
                        if !stale {
                            slot.applied_seq = seq;
                            slot.view.phase = LoadPhase::Error;
                            slot.view.error = Some(e.user_message());
                        }
                    }
                    LoadMode::Background => {
                        debug!("Background refresh of {} failed: {}", self.source.name(), e);
                        if slot.view.phase == LoadPhase::LoadingBackground {
                            slot.view.phase = match resumed_phase {
                                LoadPhase::LoadingBackground => LoadPhase::Idle,
                                other => other,
                            };
                        }
                    }
                }
                Err(e)
            }
        }
    }

    /// One foreground load now, then a background load every `interval`.
    /// Dropping the returned handle stops the loop.
    pub fn start(self: &Arc<Self>, interval: Duration) -> PollHandle {
        let this = Arc::clone(self);
        let name = self.source.name();

        let task = tokio::spawn(async move {
            let _ = this.load(LoadMode::Foreground).await;

            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            timer.tick().await; // first tick completes immediately

            loop {
                timer.tick().await;
                let _ = this.load(LoadMode::Background).await;
            }
        });

        info!("⏱️ Polling {} every {}s", name, interval.as_secs());
        PollHandle {
            task,
            active: Some(self.active.clone()),
        }
    }
}

/// Owns a spawned timer task. Dropping it aborts the task and closes the view
/// it was feeding.
pub struct PollHandle {
    task: JoinHandle<()>,
    active: Option<Arc<AtomicBool>>,
}

impl PollHandle {
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self { task, active: None }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.store(false, Ordering::SeqCst);
        }
        self.task.abort();
    }
}

/// Signs out when the stored session is found expired. Runs on its own,
/// slower timer.
pub fn spawn_session_validator(gateway: Arc<AuthGateway>, interval: Duration) -> PollHandle {
    let task = tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await;

        loop {
            timer.tick().await;
            if let Err(e) = validate_session(&gateway).await {
                warn!("⚠️ {}", e);
            }
        }
    });
    PollHandle::from_task(task)
}

pub async fn validate_session(gateway: &AuthGateway) -> Result<(), ClientError> {
    if gateway.peek_session().is_none() || gateway.is_session_valid() {
        return Ok(());
    }

    warn!("⚠️ Session expired, signing out");
    if let Err(e) = gateway.sign_out().await {
        error!("❌ Error signing out expired session: {}", e);
    }
    Err(ClientError::SessionExpired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    // Source whose outcome is scripted by the test
    struct Scripted {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    impl RefreshSource for Scripted {
        type Output = usize;

        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch(&self) -> Result<usize, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail.load(Ordering::SeqCst) {
                Err(ClientError::Network("connection refused".to_string()))
            } else {
                Ok(n)
            }
        }
    }

    #[tokio::test]
    async fn foreground_failure_is_visible() {
        let view = RefreshLoop::new(Scripted::new());
        view.source().fail.store(true, Ordering::SeqCst);

        assert!(view.load(LoadMode::Foreground).await.is_err());
        let state = view.snapshot();
        assert_eq!(state.phase, LoadPhase::Error);
        assert_eq!(state.error.as_deref(), Some("Unable to connect to the backend server"));
    }

    #[tokio::test]
    async fn background_failure_keeps_data_and_hides_error() {
        let view = RefreshLoop::new(Scripted::new());
        view.load(LoadMode::Foreground).await.unwrap();

        view.source().fail.store(true, Ordering::SeqCst);
        assert!(view.load(LoadMode::Background).await.is_err());

        let state = view.snapshot();
        assert_eq!(state.phase, LoadPhase::Idle);
        assert_eq!(state.error, None);
        assert_eq!(state.data, Some(1));
    }

    #[tokio::test]
    async fn background_success_clears_foreground_error() {
        let view = RefreshLoop::new(Scripted::new());
        view.source().fail.store(true, Ordering::SeqCst);
        let _ = view.load(LoadMode::Foreground).await;

        // a failing background load leaves the foreground error alone
        let _ = view.load(LoadMode::Background).await;
        assert_eq!(view.snapshot().phase, LoadPhase::Error);

        view.source().fail.store(false, Ordering::SeqCst);
        view.load(LoadMode::Background).await.unwrap();
        let state = view.snapshot();
        assert_eq!(state.phase, LoadPhase::Idle);
        assert_eq!(state.error, None);
        assert!(state.last_updated.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_polls_until_handle_dropped() {
        let view = RefreshLoop::new(Scripted::new());
        let handle = view.start(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(view.source().calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(view.source().calls.load(Ordering::SeqCst), 3);

        drop(handle);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(view.source().calls.load(Ordering::SeqCst), 3);
        assert!(!view.is_active());

        // a closed view ignores further loads
        view.load(LoadMode::Foreground).await.unwrap();
        assert_eq!(view.source().calls.load(Ordering::SeqCst), 3);
        assert_eq!(view.snapshot().data, Some(3));
    }
}
