use crate::dashboard::DashboardController;
use crate::models::{ConsultationForm, ConsultationStatus, LogFilter, ServiceError, TeamMember, UserCredentials};
use crate::utils::admin_guard::RequireAdmin;
use actix_cors::Cors;
use actix_web::{delete, get, post, put, web, HttpResponse};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug)]
struct StatusQuery {
    status: String,
}

#[derive(Deserialize, Debug)]
struct PurgeRequest {
    confirmation: String,
}

// Sign in with email and password (admins only)
#[post("/login")]
async fn login(
    controller: web::Data<DashboardController>,
    credentials: web::Json<UserCredentials>,
) -> Result<HttpResponse, ServiceError> {
    info!("🔑 Login request for email: {}", credentials.email);

    let user = controller
        .sign_in(credentials.email.trim(), &credentials.password)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Signed in successfully",
        "user": user
    })))
}

#[post("/logout")]
async fn logout(controller: web::Data<DashboardController>) -> HttpResponse {
    controller.sign_out().await;
    HttpResponse::Ok().json(json!({ "message": "Signed out" }))
}

// Current auth phase; the UI shows a spinner while checking
#[get("/status")]
async fn auth_status(controller: web::Data<DashboardController>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "state": controller.phase(),
        "pollers_running": controller.pollers_running()
    }))
}

#[get("/stats")]
async fn get_stats(controller: web::Data<DashboardController>) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(controller.stats()?))
}

// Manual refresh of every view
#[post("/refresh")]
async fn refresh(controller: web::Data<DashboardController>) -> Result<HttpResponse, ServiceError> {
    let stats = controller.refresh_all().await.map_err(|e| {
        error!("❌ Manual refresh failed: {}", e);
        ServiceError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(stats))
}

#[get("/consultations")]
async fn list_consultations(
    controller: web::Data<DashboardController>,
) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(controller.consultations()?))
}

#[put("/consultations/{id}/status")]
async fn update_consultation_status(
    controller: web::Data<DashboardController>,
    path: web::Path<String>,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    let status: ConsultationStatus = query.status.parse().map_err(ServiceError::BadRequest)?;

    controller.update_status(&id, status).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Consultation status updated",
        "id": id,
        "status": status
    })))
}

#[delete("/consultations/{id}")]
async fn delete_consultation(
    controller: web::Data<DashboardController>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    controller.delete_consultation(&id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Consultation deleted", "id": id })))
}

#[get("/logs")]
async fn get_logs(controller: web::Data<DashboardController>) -> Result<HttpResponse, ServiceError> {
    let view = controller.logs()?;
    Ok(HttpResponse::Ok().json(json!({
        "filter": controller.log_filter(),
        "view": view
    })))
}

// Change the time range / filters of the log view
#[put("/logs")]
async fn set_log_filter(
    controller: web::Data<DashboardController>,
    filter: web::Json<LogFilter>,
) -> Result<HttpResponse, ServiceError> {
    let filter = filter.into_inner();
    let view = controller.set_log_filter(filter.clone()).await?;
    Ok(HttpResponse::Ok().json(json!({ "filter": filter, "view": view })))
}

#[post("/logs/clear")]
async fn clear_logs(controller: web::Data<DashboardController>) -> Result<HttpResponse, ServiceError> {
    controller.clear_logs().await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Logs cleared" })))
}

#[get("/team")]
async fn list_team(controller: web::Data<DashboardController>) -> Result<HttpResponse, ServiceError> {
    let members = controller.team_members().await?;
    Ok(HttpResponse::Ok().json(members))
}

#[post("/team")]
async fn add_team_member(
    controller: web::Data<DashboardController>,
    member: web::Json<TeamMember>,
) -> Result<HttpResponse, ServiceError> {
    controller.add_team_member(&member).await?;
    Ok(HttpResponse::Ok().json(member.into_inner()))
}

#[put("/team/{email}")]
async fn update_team_member(
    controller: web::Data<DashboardController>,
    path: web::Path<String>,
    member: web::Json<TeamMember>,
) -> Result<HttpResponse, ServiceError> {
    let original_email = path.into_inner();
    controller.update_team_member(&original_email, &member).await?;
    Ok(HttpResponse::Ok().json(member.into_inner()))
}

#[delete("/team/{email}")]
async fn remove_team_member(
    controller: web::Data<DashboardController>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let email = path.into_inner();
    controller.remove_team_member(&email).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Team member removed", "email": email })))
}

#[get("/slots")]
async fn available_slots(controller: web::Data<DashboardController>) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(controller.available_slots().await?))
}

#[post("/schedule")]
async fn schedule(
    controller: web::Data<DashboardController>,
    form: web::Json<ConsultationForm>,
) -> Result<HttpResponse, ServiceError> {
    controller.schedule(&form).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Consultation scheduled" })))
}

// Delete every consultation and clear the logs
#[post("/purge")]
async fn purge(
    controller: web::Data<DashboardController>,
    request: web::Json<PurgeRequest>,
) -> Result<HttpResponse, ServiceError> {
    let deleted = controller.purge_all(&request.confirmation).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "All data deleted", "deleted": deleted })))
}

// Register all dashboard routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dashboard")
            .wrap(Cors::permissive())
            .service(login)
            .service(logout)
            .service(auth_status)
            .service(
                web::scope("")
                    .wrap(RequireAdmin)
                    .service(get_stats)
                    .service(refresh)
                    .service(list_consultations)
                    .service(update_consultation_status)
                    .service(delete_consultation)
                    .service(get_logs)
                    .service(set_log_filter)
                    .service(clear_logs)
                    .service(list_team)
                    .service(add_team_member)
                    .service(update_team_member)
                    .service(remove_team_member)
                    .service(available_slots)
                    .service(schedule)
                    .service(purge),
            ),
    );
}
