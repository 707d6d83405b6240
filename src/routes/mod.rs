// src/routes/mod.rs
pub mod dashboard_routes;
pub mod proxy_routes;

pub use proxy_routes::ProxyTarget;
