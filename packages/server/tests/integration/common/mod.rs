use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;

use common::storage::filesystem::FilesystemStore;
use server::config::{AppConfig, CorsConfig, RateLimitConfig, ServerConfig, StorageConfig};
use server::state::AppState;
use server::throttle::RateLimiter;
use vault_core::Vault;

pub mod routes {
    pub const FILES: &str = "/api/files";
    pub const STORAGE_STATS: &str = "/api/files/storage_stats";
    pub const FILE_TYPES: &str = "/api/files/file_types";

    pub fn file(id: &str) -> String {
        format!("/api/files/{id}")
    }

    pub fn download(id: &str) -> String {
        format!("/api/files/{id}/download")
    }
}

/// A running test server backed by a scratch blob directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    _dir: tempfile::TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
    pub headers: reqwest::header::HeaderMap,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.expect("Failed to read response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            text,
            body,
            headers,
        }
    }
}

impl TestApp {
    /// Spawn with the default 10 MiB quota and throttling disabled.
    pub async fn spawn() -> Self {
        Self::spawn_with(10 * 1024 * 1024, 0).await
    }

    pub async fn spawn_with(quota_bytes: u64, rate_per_second: u32) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            storage: StorageConfig {
                root: dir.path().join("blobs").display().to_string(),
                max_blob_size: 64 * 1024 * 1024,
                quota_bytes,
            },
            rate_limit: RateLimitConfig {
                per_second: rate_per_second,
            },
        };

        let store = Arc::new(
            FilesystemStore::new(dir.path().join("blobs"), config.storage.max_blob_size)
                .await
                .expect("Failed to create blob store"),
        );
        let state = AppState {
            vault: Arc::new(Vault::new(store, quota_bytes)),
            throttle: Arc::new(RateLimiter::new(rate_per_second)),
            config,
        };

        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get_as(&self, path: &str, user: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("UserId", user)
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn get_anonymous(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn get_with_header(
        &self,
        path: &str,
        user: &str,
        header: (&str, &str),
    ) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("UserId", user)
            .header(header.0, header.1)
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn delete_as(&self, path: &str, user: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("UserId", user)
            .send()
            .await
            .expect("Failed to send DELETE request");
        TestResponse::from_response(res).await
    }

    pub async fn upload_as(
        &self,
        user: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .expect("Failed to set MIME type");
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = self
            .client
            .post(self.url(routes::FILES))
            .header("UserId", user)
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");
        TestResponse::from_response(res).await
    }

    /// Upload a form carrying several `file` parts in one request.
    pub async fn upload_parts_as(&self, user: &str, parts: Vec<(&str, Vec<u8>)>) -> TestResponse {
        let mut form = reqwest::multipart::Form::new();
        for (file_name, bytes) in parts {
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(file_name.to_string())
                .mime_str("text/plain")
                .expect("Failed to set MIME type");
            form = form.part("file", part);
        }

        let res = self
            .client
            .post(self.url(routes::FILES))
            .header("UserId", user)
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");
        TestResponse::from_response(res).await
    }

    pub async fn post_empty_form_as(&self, user: &str) -> TestResponse {
        let form = reqwest::multipart::Form::new().text("unrelated", "value");
        let res = self
            .client
            .post(self.url(routes::FILES))
            .header("UserId", user)
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart request");
        TestResponse::from_response(res).await
    }

    /// Upload and return the new record's id, asserting success.
    pub async fn upload_ok(&self, user: &str, file_name: &str, bytes: &[u8]) -> String {
        let res = self
            .upload_as(user, file_name, bytes.to_vec(), "text/plain")
            .await;
        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        res.body["id"].as_str().expect("missing id").to_string()
    }
}
