#![allow(dead_code)]

use recipe_catalog::{routes, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use warp::http::StatusCode;

pub const PASSWORD: &str = "testpass";

pub const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R', 0, 0,
    0, 1, 0, 0, 0, 1, 8, 2, 0, 0, 0, 0x90, 0x77, 0x53, 0xDE, 0, 0, 0, 0, b'I', b'E', b'N', b'D',
    0xAE, 0x42, 0x60, 0x82,
];

pub const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\xff\xff\xff\x00\x00\x00;";

const BOUNDARY: &str = "recipe-catalog-test-boundary";

/// A server over a fresh in-memory store and a temporary media directory.
pub struct TestApp {
    pub state: AppState,
    media: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let media = tempfile::tempdir().unwrap();
        let state = AppState::in_memory(media.path()).unwrap();

        Self { state, media }
    }

    pub async fn send(&self, request: warp::test::RequestBuilder) -> TestResponse {
        let response = request.reply(&routes(self.state.clone())).await;
        let body = serde_json::from_slice(response.body()).unwrap_or(Value::Null);

        TestResponse {
            status: response.status(),
            body,
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(authorized(warp::test::request().method("GET").path(path), token))
            .await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(authorized(warp::test::request().method("DELETE").path(path), token))
            .await
    }

    pub async fn write(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> TestResponse {
        let request = warp::test::request().method(method).path(path).json(&body);
        self.send(authorized(request, token)).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.write("POST", path, token, body).await
    }

    pub async fn upload(
        &self,
        path: &str,
        token: Option<&str>,
        field: &str,
        data: &[u8],
    ) -> TestResponse {
        let request = warp::test::request()
            .method("POST")
            .path(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body(field, data));
        self.send(authorized(request, token)).await
    }

    pub async fn register(&self, email: &str) -> TestResponse {
        self.post(
            "/api/users/",
            None,
            json!({ "email": email, "password": PASSWORD, "name": "Test" }),
        )
        .await
    }

    /// Registers `email` and returns a token for it.
    pub async fn login(&self, email: &str) -> String {
        assert_eq!(self.register(email).await.status, StatusCode::CREATED);
        let response = self
            .post(
                "/api/users/token/",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);

        response.body["token"].as_str().unwrap().to_owned()
    }

    pub async fn create_tag(&self, token: &str, name: &str) -> i64 {
        let response = self
            .post("/api/tags/", Some(token), json!({ "name": name }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["id"].as_i64().unwrap()
    }

    pub async fn create_ingredient(&self, token: &str, name: &str) -> i64 {
        let response = self
            .post("/api/ingredients/", Some(token), json!({ "name": name }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["id"].as_i64().unwrap()
    }

    pub async fn create_recipe(&self, token: &str, body: Value) -> Value {
        let response = self.post("/api/recipes/", Some(token), body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    pub fn media_root(&self) -> &std::path::Path {
        self.media.path()
    }
}

pub fn sample_recipe(title: &str) -> Value {
    json!({ "title": title, "time_minutes": 10, "price": "5.00" })
}

fn authorized(
    request: warp::test::RequestBuilder,
    token: Option<&str>,
) -> warp::test::RequestBuilder {
    match token {
        Some(token) => request.header("authorization", format!("Token {token}")),
        None => request,
    }
}

fn multipart_body(field: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"upload.bin\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}
