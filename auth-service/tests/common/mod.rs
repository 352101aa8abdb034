//! Shared setup for auth-service integration tests.
//!
//! Everything runs against the in-memory store and a recording mailer, so no
//! PostgreSQL or SMTP server is needed.

#![allow(dead_code)]

use auth_service::{
    build_router,
    config::{
        AuthConfig, DatabaseConfig, Environment, JwtConfig, PasswordHashConfig, SmtpConfig,
    },
    services::{AuthService, EmailProvider, InMemoryStore, JwtService, MockEmailService},
    AppState,
};
use axum::{body::Body, http::Response, Router};
use service_core::config::Config;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_PASSWORD: &str = "secret1";

pub fn test_config() -> AuthConfig {
    AuthConfig {
        common: Config::default(),
        environment: Environment::Dev,
        service_name: "auth-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        api_url: "http://localhost:8080".to_string(),
        client_url: "http://localhost:3000".to_string(),
        database: DatabaseConfig {
            url: "postgres://localhost/auth_test".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: "integration-test-secret-integration".to_string(),
            access_token_expiry_minutes: 30,
            refresh_token_expiry_days: 30,
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 465,
            user: "noreply@example.com".to_string(),
            password: "password".to_string(),
        },
        // Cheap hashing keeps the suite fast.
        password_hash: PasswordHashConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
    }
}

/// Service wired to fresh in-memory collaborators.
pub struct TestApp {
    pub config: AuthConfig,
    pub store: Arc<InMemoryStore>,
    pub email: Arc<MockEmailService>,
    pub jwt: JwtService,
    pub service: AuthService,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let email = Arc::new(MockEmailService::new());
        Self::build(config, email.clone(), email)
    }

    /// Same wiring with a custom mail provider; `email` then records nothing.
    pub fn with_email_provider(provider: Arc<dyn EmailProvider>) -> Self {
        Self::build(test_config(), Arc::new(MockEmailService::new()), provider)
    }

    fn build(
        config: AuthConfig,
        email: Arc<MockEmailService>,
        provider: Arc<dyn EmailProvider>,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let jwt = JwtService::new(&config.jwt);
        let service = AuthService::new(
            store.clone(),
            store.clone(),
            provider,
            jwt.clone(),
            config.password_hash.clone(),
            config.api_url.clone(),
        );

        Self {
            config,
            store,
            email,
            jwt,
            service,
        }
    }

    pub async fn router(&self) -> Router {
        let state = AppState {
            config: self.config.clone(),
            jwt: self.jwt.clone(),
            auth_service: self.service.clone(),
        };
        build_router(state).await.expect("router should build")
    }

    /// Wait for the background activation email to be recorded.
    pub async fn wait_for_email(&self, count: usize) -> Vec<(String, String)> {
        for _ in 0..100 {
            let sent = self.email.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} activation email(s), got {}", count, self.email.sent().len());
    }
}

/// Last path segment of an activation URL.
pub fn activation_token(url: &str) -> String {
    url.rsplit('/').next().unwrap_or_default().to_string()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Value of the `refreshToken` cookie set by a response, if any.
pub fn refresh_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refreshToken="))
        .map(|v| v.to_string())
}
