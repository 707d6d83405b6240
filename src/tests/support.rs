// Local stand-ins for the identity provider and the backend, served over
// real HTTP so the reqwest clients are exercised end to end.

use crate::auth::{AdminPolicy, AuthGateway, IdentityClient, MemorySessionStore, SessionStore};
use crate::client::ApiClient;
use crate::config::DEFAULT_ADMIN_EMAILS;
use crate::dashboard::DashboardController;
use crate::models::{Session, SessionUser};
use crate::utils::now_epoch;
use actix_web::dev::Service;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const PASSWORD: &str = "correct-horse";
pub const ADMIN_EMAIL: &str = "ask@akenotech.com";

fn serve<F>(configure: F) -> String
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    let server = HttpServer::new(move || App::new().configure(configure.clone()))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind fake server");
    let addr = server.addrs()[0];
    actix_rt::spawn(server.run());
    format!("http://{}", addr)
}

pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        actix_rt::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

// =========================================================================
// Identity provider
// =========================================================================

pub struct IdentityState {
    pub expires_in: i64,
    pub refresh_ok: bool,
    pub email: String,
    pub issued: usize,
    pub refresh_calls: usize,
    pub logout_calls: usize,
}

pub struct FakeIdentity {
    pub url: String,
    state: web::Data<Mutex<IdentityState>>,
}

impl FakeIdentity {
    pub fn start() -> Self {
        let state = web::Data::new(Mutex::new(IdentityState {
            expires_in: 3600,
            refresh_ok: true,
            email: String::new(),
            issued: 0,
            refresh_calls: 0,
            logout_calls: 0,
        }));

        let shared = state.clone();
        let url = serve(move |cfg| {
            cfg.app_data(shared.clone())
                .route("/auth/v1/token", web::post().to(token))
                .route("/auth/v1/logout", web::post().to(logout));
        });
        Self { url, state }
    }

    pub fn state(&self) -> MutexGuard<'_, IdentityState> {
        self.state.lock().unwrap()
    }
}

async fn token(
    query: web::Query<HashMap<String, String>>,
    body: web::Json<Value>,
    state: web::Data<Mutex<IdentityState>>,
) -> HttpResponse {
    let mut state = state.lock().unwrap();
    match query.get("grant_type").map(String::as_str) {
        Some("password") => {
            if body["password"] != PASSWORD {
                return HttpResponse::BadRequest().json(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid login credentials"
                }));
            }
            state.email = body["email"].as_str().unwrap_or_default().to_string();
        }
        Some("refresh_token") => {
            state.refresh_calls += 1;
            if !state.refresh_ok {
                return HttpResponse::BadRequest().json(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid Refresh Token: Refresh Token Not Found"
                }));
            }
        }
        _ => return HttpResponse::BadRequest().finish(),
    }

    state.issued += 1;
    HttpResponse::Ok().json(json!({
        "access_token": format!("access-{}", state.issued),
        "refresh_token": format!("refresh-{}", state.issued),
        "expires_in": state.expires_in,
        "token_type": "bearer",
        "user": {
            "id": "user-1",
            "email": state.email,
            "user_metadata": { "full_name": "Test Admin" }
        }
    }))
}

async fn logout(state: web::Data<Mutex<IdentityState>>) -> HttpResponse {
    state.lock().unwrap().logout_calls += 1;
    HttpResponse::NoContent().finish()
}

// =========================================================================
// Backend
// =========================================================================

#[derive(Default)]
pub struct BackendState {
    pub consultations: Vec<Value>,
    pub logs: Vec<Value>,
    pub team: Vec<Value>,
    // Adding a member with this email answers 500
    pub reject_team_email: Option<String>,
    pub authorizations: Vec<String>,
    // Listing consultations waits this long before answering
    pub delay: Option<Duration>,
}

pub struct FakeBackend {
    pub url: String,
    state: web::Data<Mutex<BackendState>>,
    hits: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn start() -> Self {
        let state = web::Data::new(Mutex::new(BackendState::default()));
        let hits = Arc::new(AtomicUsize::new(0));

        let shared = state.clone();
        let counter = hits.clone();
        let url = serve(move |cfg| {
            let counter = counter.clone();
            cfg.app_data(shared.clone()).service(
                web::scope("")
                    .wrap_fn(move |req, srv| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        srv.call(req)
                    })
                    .route("/consultation/all", web::get().to(all_consultations))
                    .route("/consultation/update-status/{id}", web::put().to(update_status))
                    .route("/consultation/delete/{id}", web::delete().to(delete_consultation))
                    .route("/consultation/available-slots", web::get().to(available_slots))
                    .route("/consultation/schedule", web::post().to(schedule))
                    .route("/admin/logs/recent", web::get().to(recent_logs))
                    .route("/admin/clear-all-logs", web::post().to(clear_logs))
                    .route("/admin/team", web::get().to(list_team))
                    .route("/admin/team/add", web::post().to(add_member))
                    .route("/admin/team/remove/{email}", web::delete().to(remove_member))
                    .route("/echo/{tail:.*}", web::route().to(echo))
                    .route("/plain", web::get().to(plain)),
            );
        });
        Self { url, state, hits }
    }

    pub fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn team_emails(&self) -> Vec<String> {
        self.state()
            .team
            .iter()
            .filter_map(|m| m["email"].as_str().map(str::to_string))
            .collect()
    }
}

fn record_authorization(req: &HttpRequest, state: &mut BackendState) {
    if let Some(auth) = req.headers().get("authorization").and_then(|v| v.to_str().ok()) {
        state.authorizations.push(auth.to_string());
    }
}

async fn all_consultations(req: HttpRequest, state: web::Data<Mutex<BackendState>>) -> HttpResponse {
    let delay = state.lock().unwrap().delay;
    if let Some(delay) = delay {
        actix_rt::time::sleep(delay).await;
    }

    let mut state = state.lock().unwrap();
    record_authorization(&req, &mut state);
    HttpResponse::Ok().json(json!({ "status": "success", "requests": state.consultations }))
}

async fn update_status(
    path: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
    state: web::Data<Mutex<BackendState>>,
) -> HttpResponse {
    let id = path.into_inner();
    let mut state = state.lock().unwrap();
    match state.consultations.iter_mut().find(|c| c["id"] == id.as_str()) {
        Some(record) => {
            record["status"] = json!(query.get("status").cloned().unwrap_or_default());
            HttpResponse::Ok().json(json!({ "success": true }))
        }
        None => HttpResponse::NotFound().json(json!({ "detail": "Consultation not found" })),
    }
}

async fn delete_consultation(
    path: web::Path<String>,
    state: web::Data<Mutex<BackendState>>,
) -> HttpResponse {
    let id = path.into_inner();
    let mut state = state.lock().unwrap();
    let before = state.consultations.len();
    state.consultations.retain(|c| c["id"] != id.as_str());
    if state.consultations.len() == before {
        return HttpResponse::NotFound().json(json!({ "detail": "Consultation not found" }));
    }
    HttpResponse::Ok().json(json!({ "success": true }))
}

async fn available_slots() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "available_slots": [{ "date": "2026-10-20", "times": ["10:00", "14:00"] }]
    }))
}

async fn schedule(body: web::Json<Value>, state: web::Data<Mutex<BackendState>>) -> HttpResponse {
    let mut state = state.lock().unwrap();
    let mut record = body.into_inner();
    record["id"] = json!(format!("new-{}", state.consultations.len() + 1));
    record["status"] = json!("pending");
    record["created_at"] = json!(Utc::now().to_rfc3339());
    state.consultations.push(record);
    HttpResponse::Ok().json(json!({ "success": true }))
}

async fn recent_logs(state: web::Data<Mutex<BackendState>>) -> HttpResponse {
    let state = state.lock().unwrap();
    HttpResponse::Ok().json(json!({ "status": "success", "logs": state.logs }))
}

async fn clear_logs(state: web::Data<Mutex<BackendState>>) -> HttpResponse {
    state.lock().unwrap().logs.clear();
    HttpResponse::Ok().json(json!({ "status": "success", "message": "Logs cleared" }))
}

async fn list_team(state: web::Data<Mutex<BackendState>>) -> HttpResponse {
    let state = state.lock().unwrap();
    HttpResponse::Ok().json(json!({ "status": "success", "team_members": state.team }))
}

async fn add_member(
    query: web::Query<HashMap<String, String>>,
    state: web::Data<Mutex<BackendState>>,
) -> HttpResponse {
    let mut state = state.lock().unwrap();
    let email = query.get("email").cloned().unwrap_or_default();
    if state.reject_team_email.as_deref() == Some(email.as_str()) {
        return HttpResponse::InternalServerError().json(json!({ "detail": "Could not save member" }));
    }
    state.team.push(json!({
        "name": query.get("name").cloned().unwrap_or_default(),
        "email": email,
        "role": query.get("role").cloned().unwrap_or_default(),
        "phone": query.get("phone").cloned().unwrap_or_default(),
    }));
    HttpResponse::Ok().json(json!({ "success": true }))
}

async fn remove_member(path: web::Path<String>, state: web::Data<Mutex<BackendState>>) -> HttpResponse {
    let email = path.into_inner();
    state.lock().unwrap().team.retain(|m| m["email"] != email.as_str());
    HttpResponse::Ok().json(json!({ "success": true }))
}

async fn echo(req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let authorization = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    HttpResponse::Ok().json(json!({
        "method": req.method().as_str(),
        "path": req.path(),
        "query": req.query_string(),
        "authorization": authorization,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn plain() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain").body("pong")
}

// =========================================================================
// Fixtures
// =========================================================================

pub fn consultation(id: &str, status: &str, age_days: i64) -> Value {
    json!({
        "id": id,
        "name": format!("Client {}", id),
        "email": format!("{}@example.com", id),
        "phone": "",
        "company": "Acme",
        "preferred_date": "2026-10-20",
        "preferred_time": "10:00",
        "message": "",
        "status": status,
        "created_at": (Utc::now() - ChronoDuration::days(age_days)).to_rfc3339(),
    })
}

// 12 records: 3 pending, 2 created in the last week
pub fn twelve_consultations() -> Vec<Value> {
    let statuses = [
        "pending", "pending", "pending", "confirmed", "confirmed", "confirmed", "completed",
        "completed", "completed", "cancelled", "confirmed", "completed",
    ];
    statuses
        .iter()
        .enumerate()
        .map(|(i, status)| {
            let age = if i >= 10 { 2 } else { 30 };
            consultation(&format!("c{}", i + 1), status, age)
        })
        .collect()
}

pub fn team_member(name: &str, email: &str) -> Value {
    json!({ "name": name, "email": email, "role": "Sales", "phone": "" })
}

pub fn session_for(email: &str, expires_in: i64) -> Session {
    Session {
        access_token: "stored-access".to_string(),
        refresh_token: Some("stored-refresh".to_string()),
        expires_at: Some(now_epoch() + expires_in),
        user: SessionUser {
            id: "user-1".to_string(),
            email: Some(email.to_string()),
            full_name: None,
        },
    }
}

pub fn gateway(identity: &FakeIdentity, store: Box<dyn SessionStore>) -> Arc<AuthGateway> {
    let client = IdentityClient::new(&identity.url, "anon-key", Duration::from_secs(5))
        .expect("identity client");
    Arc::new(AuthGateway::new(
        client,
        store,
        AdminPolicy::new(DEFAULT_ADMIN_EMAILS),
        300,
    ))
}

pub fn controller(identity: &FakeIdentity, backend: &FakeBackend) -> Arc<DashboardController> {
    controller_with_store(identity, backend, Box::new(MemorySessionStore::new()))
}

pub fn controller_with_store(
    identity: &FakeIdentity,
    backend: &FakeBackend,
    store: Box<dyn SessionStore>,
) -> Arc<DashboardController> {
    let gateway = gateway(identity, store);
    let api = ApiClient::with_bases(&backend.url, &backend.url, Duration::from_secs(5), gateway.clone())
        .expect("api client");
    Arc::new(DashboardController::new(
        gateway,
        Arc::new(api),
        Duration::from_secs(60),
        Duration::from_secs(300),
    ))
}
