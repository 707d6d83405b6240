#[cfg(test)]
mod tests {
    use crate::routes::proxy_routes::{self, ProxyTarget, ALLOW_METHODS};
    use crate::tests::support::FakeBackend;
    use actix_web::http::{Method, StatusCode};
    use actix_web::{test, web, App};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn target(origin: &str) -> web::Data<ProxyTarget> {
        web::Data::new(ProxyTarget::new(origin, Duration::from_secs(5)).unwrap())
    }

    #[actix_rt::test]
    async fn preflight_never_reaches_the_backend() {
        let backend = FakeBackend::start();
        let app = test::init_service(
            App::new()
                .app_data(target(&backend.url))
                .configure(proxy_routes::init_routes),
        )
        .await;

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/consultation/all")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");
        assert_eq!(
            resp.headers().get("access-control-allow-methods").unwrap(),
            ALLOW_METHODS
        );
        assert_eq!(backend.hits(), 0);
    }

    #[actix_rt::test]
    async fn request_is_forwarded_with_path_query_and_auth() {
        let backend = FakeBackend::start();
        let app = test::init_service(
            App::new()
                .app_data(target(&backend.url))
                .configure(proxy_routes::init_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/echo/admin/logs?hours=24&t=1")
            .insert_header(("Authorization", "Bearer abc"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["method"], "GET");
        assert_eq!(body["path"], "/echo/admin/logs");
        assert_eq!(body["query"], "hours=24&t=1");
        assert_eq!(body["authorization"], "Bearer abc");

        let req = test::TestRequest::post()
            .uri("/api/echo/consultation/schedule")
            .set_json(json!({ "name": "Jane" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["method"], "POST");
        assert_eq!(body["body"], r#"{"name":"Jane"}"#);
        assert_eq!(body["authorization"], Value::Null);
        assert_eq!(backend.hits(), 2);
    }

    #[actix_rt::test]
    async fn backend_status_and_text_are_relayed() {
        let backend = FakeBackend::start();
        let app = test::init_service(
            App::new()
                .app_data(target(&backend.url))
                .configure(proxy_routes::init_routes),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/api/consultation/delete/missing")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "detail": "Consultation not found" }));

        let req = test::TestRequest::get().uri("/api/plain").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!("pong"));
    }

    #[actix_rt::test]
    async fn unreachable_backend_is_a_structured_500() {
        let app = test::init_service(
            App::new()
                .app_data(target("http://127.0.0.1:1"))
                .configure(proxy_routes::init_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/consultation/all").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Failed to connect to backend server");
        assert!(body["error"].as_str().map_or(false, |e| !e.is_empty()));
    }
}
