//Third-party-dependencies
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};
use std::sync::Arc;

use akeno_admin::config::AppConfig;
use akeno_admin::dashboard::DashboardController;
use akeno_admin::routes::{dashboard_routes, proxy_routes, ProxyTarget};

fn startup_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    let proxy = web::Data::new(ProxyTarget::from_config(&config).map_err(startup_error)?);
    let controller = Arc::new(DashboardController::from_config(&config).map_err(startup_error)?);
    controller.start().await;

    let dashboard = web::Data::from(controller.clone());
    info!("🚀 Server started at {}", config.bind_address);
    info!("🔀 Proxying /api to {}", proxy.origin());

    let result = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(proxy.clone())
            .app_data(dashboard.clone())
            .configure(proxy_routes::init_routes)
            .configure(dashboard_routes::init_routes)
    })
    .bind(&config.bind_address)?
    .run()
    .await;

    if let Err(e) = &result {
        error!("❌ Server stopped: {}", e);
    }
    controller.shutdown();
    result
}
