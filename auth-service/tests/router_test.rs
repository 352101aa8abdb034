mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{body_json, refresh_cookie, TestApp, TEST_PASSWORD};
use serde_json::json;
use tower::util::ServiceExt;

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn cookie_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("refreshToken={}", token))
        .body(Body::empty())
        .unwrap()
}

fn credentials(email: &str) -> serde_json::Value {
    json!({ "email": email, "password": TEST_PASSWORD })
}

#[tokio::test]
async fn test_registration_sets_refresh_cookie() {
    let app = TestApp::new();
    let router = app.router().await;

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/auth/registration",
            credentials("a@example.com"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = refresh_cookie(&response).expect("refresh cookie set");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=2592000"));

    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "a@example.com");
    assert_eq!(body["user"]["isActivated"], false);
    assert_eq!(body["user"]["roles"], json!(["USER"]));
    assert!(body["accessToken"].is_string());
    assert!(cookie.starts_with(&format!(
        "refreshToken={}",
        body["refreshToken"].as_str().unwrap()
    )));
}

#[tokio::test]
async fn test_registration_validation_errors() {
    let app = TestApp::new();

    let response = app
        .router()
        .await
        .oneshot(json_request(
            "POST",
            "/api/auth/registration",
            json!({ "email": "not-an-email", "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Введите корректный Email");

    let response = app
        .router()
        .await
        .oneshot(json_request(
            "POST",
            "/api/auth/registration",
            json!({ "email": "a@example.com", "password": "1234" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Минимальное количество символов для пароля 5"
    );
    assert_eq!(app.store.user_count(), 0);
}

#[tokio::test]
async fn test_duplicate_registration_returns_bad_request() {
    let app = TestApp::new();
    let router = app.router().await;

    router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/registration",
            credentials("a@example.com"),
        ))
        .await
        .unwrap();
    let response = router
        .oneshot(json_request(
            "POST",
            "/api/auth/registration",
            credentials("a@example.com"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Пользователь с таким Email уже есть"
    );
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new();
    let router = app.router().await;
    router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/registration",
            credentials("a@example.com"),
        ))
        .await
        .unwrap();

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "a@example.com", "password": "wrong-password" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(refresh_cookie(&response).is_none());
    assert_eq!(body_json(response).await["error"], "Неверный Email или Пароль");
}

#[tokio::test]
async fn test_refresh_via_cookie_rotates() {
    let app = TestApp::new();
    let router = app.router().await;
    let registered = app
        .service
        .register(auth_service::dtos::auth::RegisterRequest {
            email: "a@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
        })
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(cookie_request(
            "GET",
            "/api/auth/refresh",
            &registered.refresh_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(refresh_cookie(&response).is_some());
    let body = body_json(response).await;
    assert_ne!(body["refreshToken"], registered.refresh_token.as_str());

    let replay = router
        .oneshot(cookie_request(
            "GET",
            "/api/auth/refresh",
            &registered.refresh_token,
        ))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(replay).await["error"], "Пользователь не авторизован");
}

#[tokio::test]
async fn test_refresh_accepts_body_token() {
    let app = TestApp::new();
    let registered = app
        .service
        .register(auth_service::dtos::auth::RegisterRequest {
            email: "a@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
        })
        .await
        .unwrap();

    let response = app
        .router()
        .await
        .oneshot(json_request(
            "POST",
            "/api/auth/refresh",
            json!({ "refreshToken": registered.refresh_token }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_without_token_unauthorized() {
    let app = TestApp::new();

    let response = app
        .router()
        .await
        .oneshot(
            Request::builder()
                .uri("/api/auth/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookie_and_session() {
    let app = TestApp::new();
    let router = app.router().await;
    let registered = app
        .service
        .register(auth_service::dtos::auth::RegisterRequest {
            email: "a@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
        })
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(cookie_request(
            "POST",
            "/api/auth/logout",
            &registered.refresh_token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = refresh_cookie(&response).expect("removal cookie set");
    assert!(cookie.starts_with("refreshToken=;"));
    let body = body_json(response).await;
    assert_eq!(body["userId"], registered.user.id);
    assert!(body.get("refreshTokenHash").is_none());
    assert_eq!(app.store.session_count(), 0);

    let again = router
        .oneshot(cookie_request(
            "POST",
            "/api/auth/logout",
            &registered.refresh_token,
        ))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(again).await["error"], "Сессия не найдена");
}

#[tokio::test]
async fn test_activation_endpoint() {
    let app = TestApp::new();
    let router = app.router().await;
    app.service
        .register(auth_service::dtos::auth::RegisterRequest {
            email: "a@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
        })
        .await
        .unwrap();
    let sent = app.wait_for_email(1).await;
    let token = common::activation_token(&sent[0].1);

    let unknown = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/activate/unknown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/auth/activate/{}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_requires_bearer_token() {
    let app = TestApp::new();
    let router = app.router().await;
    let registered = app
        .service
        .register(auth_service::dtos::auth::RegisterRequest {
            email: "a@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
        })
        .await
        .unwrap();

    let anonymous = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", registered.access_token),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "a@example.com");
    assert_eq!(body["id"], registered.user.id);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = TestApp::new();
    let router = app.router().await;

    let health = router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_json(health).await["status"], "healthy");

    let openapi = router
        .oneshot(
            Request::builder()
                .uri("/.well-known/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(openapi.status(), StatusCode::OK);
    let doc = body_json(openapi).await;
    assert!(doc["paths"]["/api/auth/login"].is_object());
    assert!(doc["paths"]["/api/auth/refresh"].is_object());
}

#[tokio::test]
async fn test_invalid_client_url_fails_router_build() {
    let mut config = common::test_config();
    config.client_url = "bad\norigin".to_string();
    let app = TestApp::with_config(config);

    let state = auth_service::AppState {
        config: app.config.clone(),
        jwt: app.jwt.clone(),
        auth_service: app.service.clone(),
    };
    assert!(auth_service::build_router(state).await.is_err());
}
