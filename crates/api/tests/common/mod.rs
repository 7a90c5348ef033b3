#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use registrar_api::config::ApiConfig;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "password123";

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as prod over the in-memory store, bound to an ephemeral port.
    pub async fn spawn(jwt_secret: &str) -> Self {
        let config = ApiConfig::in_memory(jwt_secret).with_bootstrap_admin(ADMIN_USERNAME, ADMIN_PASSWORD);
        let app = registrar_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/users/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap()
    }

    pub async fn token_for(&self, username: &str, password: &str) -> String {
        let res = self.login(username, password).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.token_for(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Register a user and return its id.
    pub async fn register(&self, username: &str, password: &str) -> String {
        let res = self
            .client
            .post(self.url("/users/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["userId"].as_str().unwrap().to_string()
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn put(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Id of the catalog permission with `code`.
    pub async fn permission_id(&self, admin_token: &str, code: &str) -> String {
        let res = self.get(admin_token, "/permissions").await;
        assert_eq!(res.status(), StatusCode::OK);
        let permissions: Vec<Value> = res.json().await.unwrap();
        permissions
            .iter()
            .find(|p| p["code"] == code)
            .and_then(|p| p["id"].as_str())
            .unwrap_or_else(|| panic!("permission {code} not in catalog"))
            .to_string()
    }

    pub async fn grant(&self, admin_token: &str, user_id: &str, code: &str) {
        let permission_id = self.permission_id(admin_token, code).await;
        let res = self
            .post(
                admin_token,
                "/permissions/createpermissiontouser",
                json!({ "userId": user_id, "permissionId": permission_id }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Sign arbitrary session claims with `jwt_secret`.
pub fn mint_jwt(jwt_secret: &str, user_id: &str, issued_offset: ChronoDuration, ttl: ChronoDuration) -> String {
    let iat = Utc::now() + issued_offset;
    let claims = json!({
        "userId": user_id,
        "username": "someone",
        "sid": "00000000000000000000000000000000",
        "iat": iat.timestamp(),
        "exp": (iat + ttl).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}
