// akeno-admin/src/dashboard/controller.rs
//
// CheckingAuth -> Unauthenticated | Authenticated. Nothing is fetched until
// an admin is confirmed; the pollers live exactly as long as Authenticated.

use crate::auth::{AuthGateway, AuthSubscription};
use crate::client::{ApiClient, TeamService};
use crate::config::AppConfig;
use crate::dashboard::events::{DataChanged, DataEvents};
use crate::dashboard::poller::{
    spawn_session_validator, LoadMode, PollHandle, RefreshLoop, ViewState,
};
use crate::dashboard::sources::{ConsultationsSource, LogsSource, StatsSource};
use crate::models::{
    AdminIdentity, AuthEvent, AvailableSlot, ClientError, ConsultationForm, ConsultationLogEntry,
    ConsultationRecord, ConsultationStatus, DashboardStats, LogFilter, Session, TeamMember,
};
use crate::utils::login_form;
use log::{error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

pub const PURGE_CONFIRMATION: &str = "DELETE";

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum DashboardPhase {
    CheckingAuth,
    Unauthenticated,
    Authenticated { user: AdminIdentity },
}

// The live views of an authenticated dashboard
#[derive(Clone)]
struct ViewRefs {
    stats: Arc<RefreshLoop<StatsSource>>,
    consultations: Arc<RefreshLoop<ConsultationsSource>>,
    logs: Arc<RefreshLoop<LogsSource>>,
}

struct ActiveViews {
    refs: ViewRefs,
    // Dropped on sign-out, which stops every poller and the fan-out task
    _handles: Vec<PollHandle>,
}

struct ControllerState {
    phase: DashboardPhase,
    initial_check_complete: bool,
    log_filter: LogFilter,
    views: Option<ActiveViews>,
    subscription: Option<AuthSubscription>,
    background: Vec<PollHandle>,
}

pub struct DashboardController {
    gateway: Arc<AuthGateway>,
    api: Arc<ApiClient>,
    team: TeamService,
    events: DataEvents,
    poll_interval: Duration,
    session_check_interval: Duration,
    state: Mutex<ControllerState>,
}

impl DashboardController {
    pub fn new(
        gateway: Arc<AuthGateway>,
        api: Arc<ApiClient>,
        poll_interval: Duration,
        session_check_interval: Duration,
    ) -> Self {
        Self {
            team: TeamService::new(api.clone()),
            gateway,
            api,
            events: DataEvents::default(),
            poll_interval,
            session_check_interval,
            state: Mutex::new(ControllerState {
                phase: DashboardPhase::CheckingAuth,
                initial_check_complete: false,
                log_filter: LogFilter::default(),
                views: None,
                subscription: None,
                background: Vec::new(),
            }),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        let gateway = Arc::new(AuthGateway::from_config(config)?);
        let api = Arc::new(ApiClient::new(config, gateway.clone())?);
        Ok(Self::new(
            gateway,
            api,
            config.poll_interval,
            config.session_check_interval,
        ))
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn gateway(&self) -> &Arc<AuthGateway> {
        &self.gateway
    }

    pub fn events(&self) -> &DataEvents {
        &self.events
    }

    pub fn phase(&self) -> DashboardPhase {
        self.lock().phase.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.lock().phase, DashboardPhase::Authenticated { .. })
    }

    pub fn pollers_running(&self) -> bool {
        self.lock().views.is_some()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Wires the auth listener and session validator, then runs the initial
    /// session check.
    pub async fn start(self: &Arc<Self>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<(AuthEvent, Option<Session>)>();
        let subscription = self.gateway.on_auth_state_change(move |event, session| {
            let _ = tx.send((event, session.cloned()));
        });

        let weak = Arc::downgrade(self);
        let listener = tokio::spawn(async move {
            while let Some((event, session)) = rx.recv().await {
                let Some(controller) = weak.upgrade() else {
                    break;
                };
                controller.handle_auth_event(event, session).await;
            }
        });

        let validator =
            spawn_session_validator(self.gateway.clone(), self.session_check_interval);

        {
            let mut state = self.lock();
            state.subscription = Some(subscription);
            state.background = vec![PollHandle::from_task(listener), validator];
        }

        self.check_auth().await;
    }

    async fn check_auth(&self) {
        self.lock().phase = DashboardPhase::CheckingAuth;

        match self.gateway.get_session().await {
            Some(session) => {
                if self.gateway.is_admin().await {
                    self.activate(AdminIdentity::from_session(&session));
                } else {
                    warn!("⚠️ Stored session is not an admin: {:?}", session.email());
                    if let Err(e) = self.gateway.sign_out().await {
                        error!("❌ Sign-out of non-admin session failed: {}", e);
                    }
                    self.deactivate();
                }
            }
            None => self.deactivate(),
        }

        self.lock().initial_check_complete = true;
    }

    /// Reaction to provider events. A failed admin check only forces a
    /// sign-out on a fresh sign-in, never on a token refresh.
    pub async fn handle_auth_event(&self, event: AuthEvent, session: Option<Session>) {
        let initial_check_complete = self.lock().initial_check_complete;
        if !initial_check_complete
            && event != AuthEvent::SignedIn
            && event != AuthEvent::SignedOut
        {
            return;
        }

        match event {
            AuthEvent::SignedOut => {
                info!("👋 Signed out, closing dashboard");
                self.deactivate();
            }
            AuthEvent::SignedIn | AuthEvent::TokenRefreshed | AuthEvent::UserUpdated => {
                let Some(session) = session else {
                    return;
                };

                if self.gateway.policy().permits_session(Some(&session)) {
                    self.activate(AdminIdentity::from_session(&session));
                } else if event == AuthEvent::SignedIn {
                    warn!("⚠️ Non-admin user signed in: {:?}", session.email());
                    if let Err(e) = self.gateway.sign_out().await {
                        error!("❌ Forced sign-out failed: {}", e);
                    }
                    self.deactivate();
                } else {
                    warn!(
                        "⚠️ Admin check failed on {:?} for {:?}; keeping the session",
                        event,
                        session.email()
                    );
                }
            }
            AuthEvent::InitialSession | AuthEvent::PasswordRecovery => {}
        }
    }

    fn activate(&self, user: AdminIdentity) {
        let mut state = self.lock();
        let filter = state.log_filter.clone();
        state.phase = DashboardPhase::Authenticated { user };
        if state.views.is_none() {
            state.views = Some(self.spawn_views(filter));
            info!("📊 Dashboard pollers started");
        }
    }

    fn deactivate(&self) {
        let mut state = self.lock();
        state.phase = DashboardPhase::Unauthenticated;
        if state.views.take().is_some() {
            info!("🛑 Dashboard pollers stopped");
        }
    }

    fn spawn_views(&self, filter: LogFilter) -> ActiveViews {
        let refs = ViewRefs {
            stats: RefreshLoop::new(StatsSource::new(self.api.clone())),
            consultations: RefreshLoop::new(ConsultationsSource::new(self.api.clone())),
            logs: RefreshLoop::new(LogsSource::new(self.api.clone(), filter)),
        };

        let mut handles = vec![
            refs.stats.start(self.poll_interval),
            refs.consultations.start(self.poll_interval),
            refs.logs.start(self.poll_interval),
        ];
        handles.push(Self::spawn_fanout(self.events.subscribe(), refs.clone()));

        ActiveViews {
            refs,
            _handles: handles,
        }
    }

    // Re-load the consultation views whenever a mutation is published
    fn spawn_fanout(mut rx: broadcast::Receiver<DataChanged>, views: ViewRefs) -> PollHandle {
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if !event.affects_consultations() => continue,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        let _ = tokio::join!(
                            views.stats.load(LoadMode::Background),
                            views.consultations.load(LoadMode::Background),
                            views.logs.load(LoadMode::Background),
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        PollHandle::from_task(task)
    }

    /// Stops every timer and listener owned by this controller.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.views = None;
        state.subscription = None;
        state.background.clear();
        info!("🛑 Dashboard controller shut down");
    }

    // =========================================================================
    // Sign-in / sign-out
    // =========================================================================

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AdminIdentity, ClientError> {
        login_form::validate(email, password)?;

        let session = self
            .gateway
            .sign_in(email, password)
            .await
            .map_err(|e| login_form::describe_failure(&e))?;

        if self.gateway.is_admin().await {
            let user = AdminIdentity::from_session(&session);
            self.activate(user.clone());
            self.lock().initial_check_complete = true;
            info!("✅ Admin signed in: {}", user.email);
            Ok(user)
        } else {
            warn!("⚠️ Access denied for non-admin {}", email);
            if let Err(e) = self.gateway.sign_out().await {
                error!("❌ Sign-out of non-admin failed: {}", e);
            }
            self.deactivate();
            Err(login_form::access_denied())
        }
    }

    /// Local state is cleared even when the provider call fails.
    pub async fn sign_out(&self) {
        if let Err(e) = self.gateway.sign_out().await {
            error!("❌ Logout error: {}", e);
        }
        self.deactivate();
    }

    // =========================================================================
    // Views
    // =========================================================================

    fn views(&self) -> Result<ViewRefs, ClientError> {
        self.lock()
            .views
            .as_ref()
            .map(|views| views.refs.clone())
            .ok_or_else(|| ClientError::Auth("not signed in".to_string()))
    }

    pub fn stats(&self) -> Result<ViewState<DashboardStats>, ClientError> {
        Ok(self.views()?.stats.snapshot())
    }

    pub fn consultations(&self) -> Result<ViewState<Vec<ConsultationRecord>>, ClientError> {
        Ok(self.views()?.consultations.snapshot())
    }

    pub fn logs(&self) -> Result<ViewState<Vec<ConsultationLogEntry>>, ClientError> {
        Ok(self.views()?.logs.snapshot())
    }

    pub fn log_filter(&self) -> LogFilter {
        self.lock().log_filter.clone()
    }

    /// Manual refresh: a foreground load of every view.
    pub async fn refresh_all(&self) -> Result<ViewState<DashboardStats>, ClientError> {
        let views = self.views()?;
        let (stats, consultations, logs) = tokio::join!(
            views.stats.load(LoadMode::Foreground),
            views.consultations.load(LoadMode::Foreground),
            views.logs.load(LoadMode::Foreground),
        );
        stats.and(consultations).and(logs)?;
        Ok(views.stats.snapshot())
    }

    pub async fn set_log_filter(
        &self,
        filter: LogFilter,
    ) -> Result<ViewState<Vec<ConsultationLogEntry>>, ClientError> {
        let views = self.views()?;
        self.lock().log_filter = filter.clone();
        views.logs.source().set_filter(filter);
        views.logs.load(LoadMode::Foreground).await?;
        Ok(views.logs.snapshot())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub async fn update_status(&self, id: &str, status: ConsultationStatus) -> Result<(), ClientError> {
        self.views()?;
        self.api.update_status(id, status).await?;
        info!("✅ Consultation {} set to {}", id, status);
        self.events.publish(DataChanged::ConsultationStatusChanged {
            id: id.to_string(),
            status,
        });
        Ok(())
    }

    pub async fn delete_consultation(&self, id: &str) -> Result<(), ClientError> {
        self.views()?;
        self.api.delete_consultation(id).await?;
        info!("🗑️ Consultation deleted: {}", id);
        self.events.publish(DataChanged::ConsultationDeleted { id: id.to_string() });
        Ok(())
    }

    pub async fn clear_logs(&self) -> Result<(), ClientError> {
        self.views()?;
        self.api.clear_all_logs().await?;
        info!("🧹 Consultation logs cleared");
        self.events.publish(DataChanged::LogsCleared);
        Ok(())
    }

    pub async fn available_slots(&self) -> Result<Vec<AvailableSlot>, ClientError> {
        self.views()?;
        self.api.available_slots().await
    }

    pub async fn schedule(&self, form: &ConsultationForm) -> Result<(), ClientError> {
        self.views()?;
        if form.name.trim().is_empty() {
            return Err(ClientError::validation("name", "Name is required"));
        }
        if !login_form::is_valid_email(&form.email) {
            return Err(ClientError::validation("email", "Enter a valid email address"));
        }
        if form.preferred_date.trim().is_empty() || form.preferred_time.trim().is_empty() {
            return Err(ClientError::validation(
                "preferred_time",
                "Pick an available date and time",
            ));
        }

        self.api.schedule(form).await?;
        info!("📅 Consultation scheduled for {}", form.email);
        self.events.publish(DataChanged::ConsultationScheduled);
        Ok(())
    }

    pub async fn team_members(&self) -> Result<Vec<TeamMember>, ClientError> {
        self.views()?;
        self.team.list().await
    }

    pub async fn add_team_member(&self, member: &TeamMember) -> Result<(), ClientError> {
        self.views()?;
        self.team.add(member).await?;
        self.events.publish(DataChanged::TeamChanged);
        Ok(())
    }

    pub async fn update_team_member(
        &self,
        original_email: &str,
        member: &TeamMember,
    ) -> Result<(), ClientError> {
        self.views()?;
        let result = self.team.update(original_email, member).await;
        // a rolled-back update may still have touched the list
        self.events.publish(DataChanged::TeamChanged);
        result
    }

    pub async fn remove_team_member(&self, email: &str) -> Result<(), ClientError> {
        self.views()?;
        self.team.remove(email).await?;
        self.events.publish(DataChanged::TeamChanged);
        Ok(())
    }

    /// Deletes every consultation and clears the logs. Individual failures
    /// are logged and skipped; returns how many consultations were deleted.
    pub async fn purge_all(&self, confirmation: &str) -> Result<usize, ClientError> {
        let views = self.views()?;
        if confirmation != PURGE_CONFIRMATION {
            return Err(ClientError::validation(
                "confirmation",
                "Type DELETE to confirm",
            ));
        }

        let records = self.api.list_consultations().await?;
        let mut deleted = 0;
        for record in &records {
            match self.api.delete_consultation(&record.id).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!("⚠️ Could not delete consultation {}: {}", record.id, e),
            }
        }

        if let Err(e) = self.api.clear_all_logs().await {
            warn!("⚠️ Logs could not be cleared: {}", e);
        }

        info!("🧨 Purged {} of {} consultations", deleted, records.len());
        self.events.publish(DataChanged::DataPurged);
        views.stats.load(LoadMode::Foreground).await?;
        Ok(deleted)
    }
}
