mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;

use tube_server::test_helpers::{
    FailNthUploader, FailingUploader, test_router, test_router_with_uploader,
};

use common::{call, json_body, login_user, multipart_request, register_user};

#[tokio::test]
async fn register_returns_sanitized_user() {
    let app = test_router().await;

    let res = register_user(&app, "alice", "a@x.com", "p").await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = json_body(res).await;
    assert_eq!(body["status"], 201);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["coverImageUrl"], "");
    assert!(body["data"]["avatarUrl"].as_str().unwrap().starts_with("https://media.test/"));
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("refreshToken").is_none());
}

#[tokio::test]
async fn register_lowercases_username() {
    let app = test_router().await;

    let res = register_user(&app, "AliceInWonder", "alice@x.com", "secret").await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = json_body(res).await;
    assert_eq!(body["data"]["username"], "aliceinwonder");
}

#[tokio::test]
async fn register_with_cover_image_stores_its_url() {
    let app = test_router().await;

    let req = multipart_request(
        "/api/v1/users/register",
        &[
            ("fullName", "Bob B"),
            ("username", "bob"),
            ("email", "bob@x.com"),
            ("password", "secret"),
        ],
        &[
            ("avatar", "avatar.png", b"fake-avatar"),
            ("coverImage", "cover.jpg", b"fake-cover"),
        ],
    );
    let res = call(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = json_body(res).await;
    assert!(
        body["data"]["coverImageUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://media.test/")
    );
}

#[tokio::test]
async fn register_rejects_blank_required_fields() {
    let app = test_router().await;

    let base = [
        ("fullName", "Carol C"),
        ("username", "carol"),
        ("email", "carol@x.com"),
        ("password", "secret"),
    ];

    for blank_index in 0..base.len() {
        for blank_value in ["", "   "] {
            let fields: Vec<(&str, &str)> = base
                .iter()
                .enumerate()
                .map(|(i, (name, value))| {
                    (*name, if i == blank_index { blank_value } else { *value })
                })
                .collect();

            let req = multipart_request(
                "/api/v1/users/register",
                &fields,
                &[("avatar", "avatar.png", b"fake-avatar")],
            );
            let res = call(&app, req).await;
            assert_eq!(
                res.status(),
                StatusCode::BAD_REQUEST,
                "field {} = {blank_value:?} should be rejected",
                base[blank_index].0
            );
        }
    }
}

#[tokio::test]
async fn register_requires_avatar() {
    let app = test_router().await;

    let req = multipart_request(
        "/api/v1/users/register",
        &[
            ("fullName", "Dave D"),
            ("username", "dave"),
            ("email", "dave@x.com"),
            ("password", "secret"),
        ],
        &[],
    );
    let res = call(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rejects_duplicate_username_and_email() {
    let app = test_router().await;

    let res = register_user(&app, "erin", "erin@x.com", "secret").await;
    assert_eq!(res.status(), StatusCode::CREATED);

    // Same username, fresh email.
    let res = register_user(&app, "erin", "other@x.com", "secret").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Same email, fresh username.
    let res = register_user(&app, "erin2", "erin@x.com", "secret").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_fails_when_avatar_upload_fails() {
    let app = test_router_with_uploader(Arc::new(FailingUploader)).await;

    let res = register_user(&app, "frank", "frank@x.com", "secret").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_tolerates_cover_upload_failure() {
    // Avatar (first upload) succeeds, cover image (second upload) fails;
    // registration still goes through with an empty cover value.
    let app = test_router_with_uploader(Arc::new(FailNthUploader::new(2))).await;

    let req = multipart_request(
        "/api/v1/users/register",
        &[
            ("fullName", "Gina G"),
            ("username", "gina"),
            ("email", "gina@x.com"),
            ("password", "secret"),
        ],
        &[
            ("avatar", "avatar.png", b"fake-avatar"),
            ("coverImage", "cover.jpg", b"fake-cover"),
        ],
    );
    let res = call(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = json_body(res).await;
    assert_eq!(body["data"]["coverImageUrl"], "");
    assert!(
        body["data"]["avatarUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://media.test/")
    );
}

#[tokio::test]
async fn login_with_unknown_identity_is_not_found() {
    let app = test_router().await;

    let res = login_user(&app, "nobody", "secret").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = test_router().await;
    register_user(&app, "grace", "grace@x.com", "secret").await;

    let res = login_user(&app, "grace", "wrong").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_requires_some_identity() {
    let app = test_router().await;

    // Absent and blank identity fields are both treated as missing.
    for payload in [
        json!({"password": "secret"}),
        json!({"username": "  ", "password": "secret"}),
        json!({"username": "", "email": "   ", "password": "secret"}),
    ] {
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/users/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();
        let res = call(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn login_sets_token_cookies_and_returns_pair() {
    let app = test_router().await;
    register_user(&app, "heidi", "heidi@x.com", "secret").await;

    let res = login_user(&app, "heidi", "secret").await;
    assert_eq!(res.status(), StatusCode::OK);

    let cookies: Vec<String> = res
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    for name in ["accessToken", "refreshToken"] {
        let cookie = cookies
            .iter()
            .find(|c| c.starts_with(&format!("{name}=")))
            .unwrap_or_else(|| panic!("missing {name} cookie"));
        assert!(cookie.contains("HttpOnly"), "{name} should be HttpOnly");
        assert!(cookie.contains("Secure"), "{name} should be Secure");
    }

    let body = json_body(res).await;
    assert!(body["data"]["accessToken"].as_str().is_some());
    assert!(body["data"]["refreshToken"].as_str().is_some());
    assert_eq!(body["data"]["user"]["username"], "heidi");
    assert!(body["data"]["user"].get("refreshToken").is_none());
}

#[tokio::test]
async fn login_by_email_alone_works() {
    let app = test_router().await;
    register_user(&app, "ivan", "ivan@x.com", "secret").await;

    let payload = json!({"email": "ivan@x.com", "password": "secret"});
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/users/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let res = call(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_token_is_unauthorized() {
    let app = test_router().await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/users/refresh-token")
        .body(Body::empty())
        .unwrap();
    let res = call(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_with_garbage_token_is_unauthorized() {
    let app = test_router().await;

    let res = refresh_with(&app, "not-a-jwt").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_out_the_old_token() {
    let app = test_router().await;
    register_user(&app, "judy", "judy@x.com", "secret").await;

    let res = login_user(&app, "judy", "secret").await;
    let body = json_body(res).await;
    let original = body["data"]["refreshToken"].as_str().unwrap().to_string();

    let res = refresh_with(&app, &original).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    let rotated = body["data"]["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(rotated, original);

    // The rotated-out token no longer matches the stored value.
    let res = refresh_with(&app, &original).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = refresh_with(&app, &rotated).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_invalidates_the_stored_refresh_token() {
    let app = test_router().await;
    register_user(&app, "karl", "karl@x.com", "secret").await;

    let res = login_user(&app, "karl", "secret").await;
    let body = json_body(res).await;
    let access = body["data"]["accessToken"].as_str().unwrap().to_string();
    let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/users/logout")
        .header(header::AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::empty())
        .unwrap();
    let res = call(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = refresh_with(&app, &refresh).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_without_token_is_rejected() {
    let app = test_router().await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/users/logout")
        .body(Body::empty())
        .unwrap();
    let res = call(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_accepts_token_from_cookie() {
    let app = test_router().await;
    register_user(&app, "lena", "lena@x.com", "secret").await;

    let res = login_user(&app, "lena", "secret").await;
    let body = json_body(res).await;
    let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/users/refresh-token")
        .header(header::COOKIE, format!("refreshToken={refresh}"))
        .body(Body::empty())
        .unwrap();
    let res = call(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}

async fn refresh_with(app: &axum::Router, token: &str) -> axum::response::Response {
    let payload = json!({"refreshToken": token});
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/users/refresh-token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    call(app, req).await
}
