#![allow(dead_code)] // each test binary uses a subset of these helpers

use axum::{
    Router,
    body::{self, Body},
    http::{Request, header},
    response::Response,
};
use serde_json::json;
use tower::ServiceExt; // for `oneshot`

pub const BOUNDARY: &str = "XTESTBOUNDARYX";

pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, value) in fields {
        out.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, filename, bytes) in files {
        out.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        out.extend_from_slice(bytes);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    out
}

pub fn multipart_request(
    uri: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(fields, files)))
        .unwrap()
}

pub async fn call(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn json_body(res: Response) -> serde_json::Value {
    let bytes = body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn register_user(
    app: &Router,
    username: &str,
    email: &str,
    password: &str,
) -> Response {
    let req = multipart_request(
        "/api/v1/users/register",
        &[
            ("fullName", "Test User"),
            ("username", username),
            ("email", email),
            ("password", password),
        ],
        &[("avatar", "avatar.png", b"fake-png-bytes")],
    );
    call(app, req).await
}

pub async fn login_user(app: &Router, username: &str, password: &str) -> Response {
    let payload = json!({"username": username, "password": password});
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/users/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    call(app, req).await
}
