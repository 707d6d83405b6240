// akeno-admin/src/routes/proxy_routes.rs
//
// Stateless passthrough: /api/<path>?<query> is forwarded to one fixed
// backend origin. Every answer is JSON with permissive CORS headers; a
// backend that cannot be reached becomes a structured 500.

use crate::config::AppConfig;
use crate::utils::jwt;
use actix_web::http::{Method, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder};
use log::{debug, error, info};
use serde_json::{json, Value};
use std::time::Duration;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

// Forwarding target shared by every proxy request
pub struct ProxyTarget {
    origin: String,
    client: reqwest::Client,
}

impl ProxyTarget {
    pub fn new(origin: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            origin: origin.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        Self::new(&config.proxy_origin, config.request_timeout)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    // Join the non-empty path segments and append the query verbatim
    pub fn target_url(&self, segments: &[&str], query: &str) -> String {
        let path = segments
            .iter()
            .filter(|segment| !segment.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("/");
        if query.is_empty() {
            format!("{}/{}", self.origin, path)
        } else {
            format!("{}/{}?{}", self.origin, path, query)
        }
    }
}

fn with_cors(builder: &mut HttpResponseBuilder) -> &mut HttpResponseBuilder {
    builder
        .insert_header(("Access-Control-Allow-Origin", ALLOW_ORIGIN))
        .insert_header(("Access-Control-Allow-Methods", ALLOW_METHODS))
        .insert_header(("Access-Control-Allow-Headers", ALLOW_HEADERS))
}

fn forwards_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

async fn forward(
    target: &ProxyTarget,
    req: &HttpRequest,
    url: &str,
    body: web::Bytes,
) -> Result<(u16, Value), reqwest::Error> {
    let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
        .unwrap_or(reqwest::Method::GET);

    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");

    let mut outbound = target
        .client
        .request(method, url)
        .header("Content-Type", content_type);

    if let Some(auth) = req.headers().get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(claims) = jwt::extract_token_from_header(auth).and_then(jwt::peek_claims) {
            debug!("Forwarding on behalf of {:?}", claims.email.or(claims.sub));
        }
        outbound = outbound.header("Authorization", auth);
    }

    if forwards_body(req.method()) && !body.is_empty() {
        outbound = outbound.body(body.to_vec());
    }

    let resp = outbound.send().await?;
    let status = resp.status().as_u16();
    let text = resp.text().await?;

    // JSON when it parses, the raw text otherwise
    let data = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
    Ok((status, data))
}

// Catch-all handler for /api/{tail:.*}
pub async fn proxy(
    req: HttpRequest,
    body: web::Bytes,
    target: web::Data<ProxyTarget>,
) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        return with_cors(&mut HttpResponse::Ok()).finish();
    }

    let raw_path = req.uri().path();
    let tail = raw_path.strip_prefix("/api").unwrap_or(raw_path);
    let segments: Vec<&str> = tail.split('/').collect();
    let url = target.target_url(&segments, req.query_string());

    match forward(&target, &req, &url, body).await {
        Ok((status, data)) => {
            info!("🔀 {} {} -> {}", req.method(), tail, status);
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            with_cors(&mut HttpResponse::build(status)).json(data)
        }
        Err(e) => {
            error!("❌ Proxy error for {} {}: {}", req.method(), tail, e);
            with_cors(&mut HttpResponse::InternalServerError()).json(json!({
                "status": "error",
                "message": "Failed to connect to backend server",
                "error": e.to_string(),
            }))
        }
    }
}

// Register the passthrough route
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/{tail:.*}").route(web::route().to(proxy)));
}
