use crate::models::ClientError;
use chrono::Utc;
use serde::{Deserialize, Serialize};

// Current time as epoch seconds
pub fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

// JWT helpers for identity-provider access tokens
pub mod jwt {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    // Claims we read from provider tokens
    #[derive(Serialize, Deserialize, Debug)]
    pub struct Claims {
        #[serde(default)]
        pub sub: Option<String>,
        #[serde(default)]
        pub email: Option<String>,
        #[serde(default)]
        pub exp: Option<i64>,
    }

    // Read claims without verifying the signature; the provider owns the key
    pub fn peek_claims(token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .ok()
    }

    pub fn expiry_from_token(token: &str) -> Option<i64> {
        peek_claims(token).and_then(|claims| claims.exp)
    }

    // Extract token from an Authorization header value
    pub fn extract_token_from_header(auth_header: &str) -> Option<&str> {
        auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

// Login form checks, run before the identity provider is contacted
pub mod login_form {
    use super::*;
    use regex::Regex;

    lazy_static::lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    }

    pub fn is_valid_email(email: &str) -> bool {
        EMAIL_RE.is_match(email)
    }

    pub fn validate(email: &str, password: &str) -> Result<(), ClientError> {
        if email.is_empty() {
            return Err(ClientError::validation("email", "Email address is required"));
        }
        if !is_valid_email(email) {
            return Err(ClientError::validation("email", "Enter a valid email address"));
        }
        if password.is_empty() {
            return Err(ClientError::validation("password", "Password is required"));
        }
        Ok(())
    }

    // Turn a provider sign-in failure into the message shown on the form
    pub fn describe_failure(err: &ClientError) -> ClientError {
        let message = match err {
            ClientError::Auth(message) => message.as_str(),
            _ => return err.clone(),
        };

        if message.contains("Invalid login credentials") || message.contains("Invalid password") {
            ClientError::validation("password", "Invalid password. Please enter correct password.")
        } else if message.contains("Email not confirmed") {
            ClientError::validation("email", "Please verify your email before logging in")
        } else if message.contains("Invalid email") {
            ClientError::validation("email", "Enter a valid email address")
        } else {
            ClientError::validation(
                "password",
                "Login failed. Please check your credentials and try again.",
            )
        }
    }

    pub fn access_denied() -> ClientError {
        ClientError::validation("password", "Access denied. Only admin users can login.")
    }
}

// Middleware that only lets requests through while an admin is signed in
pub mod admin_guard {
    use crate::dashboard::DashboardController;
    use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
    use actix_web::{error::ErrorUnauthorized, web, Error};
    use futures::future::{ok, Ready};
    use log::debug;
    use std::future::Future;
    use std::pin::Pin;

    pub struct RequireAdmin;

    impl<S, B> Transform<S, ServiceRequest> for RequireAdmin
    where
        S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
        S::Future: 'static,
        B: 'static,
    {
        type Response = ServiceResponse<B>;
        type Error = Error;
        type Transform = RequireAdminMiddleware<S>;
        type InitError = ();
        type Future = Ready<Result<Self::Transform, Self::InitError>>;

        fn new_transform(&self, service: S) -> Self::Future {
            ok(RequireAdminMiddleware { service })
        }
    }

    pub struct RequireAdminMiddleware<S> {
        service: S,
    }

    impl<S, B> Service<ServiceRequest> for RequireAdminMiddleware<S>
    where
        S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
        S::Future: 'static,
        B: 'static,
    {
        type Response = ServiceResponse<B>;
        type Error = Error;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

        forward_ready!(service);

        fn call(&self, req: ServiceRequest) -> Self::Future {
            let authenticated = req
                .app_data::<web::Data<DashboardController>>()
                .map_or(false, |controller| controller.is_authenticated());

            if authenticated {
                let fut = self.service.call(req);
                return Box::pin(async move { fut.await });
            }

            debug!("🚫 Rejected {} {}: no admin signed in", req.method(), req.path());
            Box::pin(async move { Err(ErrorUnauthorized("Sign in as an admin first")) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    #[test]
    fn expiry_is_read_from_unverified_token() {
        let token = encode(
            &Header::default(),
            &json!({ "sub": "u1", "email": "ask@akenotech.com", "exp": 1_900_000_000i64 }),
            &EncodingKey::from_secret(b"provider-secret"),
        )
        .unwrap();

        assert_eq!(jwt::expiry_from_token(&token), Some(1_900_000_000));
        assert_eq!(
            jwt::peek_claims(&token).unwrap().email.as_deref(),
            Some("ask@akenotech.com")
        );
        assert_eq!(jwt::expiry_from_token("not-a-jwt"), None);
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(jwt::extract_token_from_header("Bearer abc"), Some("abc"));
        assert_eq!(jwt::extract_token_from_header("Basic abc"), None);
        assert_eq!(jwt::extract_token_from_header("Bearer "), None);
    }

    #[test]
    fn login_form_checks_fields_in_order() {
        let field = |err: ClientError| match err {
            ClientError::Validation { field, message } => (field, message),
            other => panic!("unexpected {:?}", other),
        };

        assert_eq!(
            field(login_form::validate("", "").unwrap_err()),
            ("email".to_string(), "Email address is required".to_string())
        );
        assert_eq!(
            field(login_form::validate("not-an-email", "").unwrap_err()).0,
            "email"
        );
        assert_eq!(
            field(login_form::validate("ask@akenotech.com", "").unwrap_err()),
            ("password".to_string(), "Password is required".to_string())
        );
        assert!(login_form::validate("ask@akenotech.com", "secret").is_ok());
    }

    #[test]
    fn provider_messages_map_to_form_fields() {
        let mapped = login_form::describe_failure(&ClientError::Auth(
            "Invalid login credentials".to_string(),
        ));
        assert_eq!(
            mapped,
            ClientError::validation("password", "Invalid password. Please enter correct password.")
        );

        let unconfirmed =
            login_form::describe_failure(&ClientError::Auth("Email not confirmed".to_string()));
        assert!(matches!(unconfirmed, ClientError::Validation { ref field, .. } if field == "email"));
    }

    #[test]
    fn transport_failures_are_not_password_errors() {
        assert_eq!(
            login_form::describe_failure(&ClientError::Timeout),
            ClientError::Timeout
        );
        let down = ClientError::Network("connection refused".to_string());
        assert_eq!(login_form::describe_failure(&down), down);
        let broken = ClientError::backend(Some(500), "boom");
        assert_eq!(login_form::describe_failure(&broken), broken);

        let unknown = login_form::describe_failure(&ClientError::Auth("Rate limited".to_string()));
        assert!(matches!(unknown, ClientError::Validation { ref field, .. } if field == "password"));
    }
}
