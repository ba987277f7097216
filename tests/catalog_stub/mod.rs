#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::Value;

pub const API_KEY: &str = "stub-key";

#[derive(Debug, Clone, Default)]
pub struct CatalogStubConfig {
    /// Search results, served for every query.
    pub issues: Vec<Value>,
    /// `person_credits` per issue id; missing ids get `[]` results.
    pub credits: HashMap<u64, Value>,
    /// Overrides the envelope `error` field of every response.
    pub status_error: Option<String>,
    /// Answers every request with this HTTP status.
    pub http_status: Option<u16>,
}

pub struct CatalogStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CatalogStub {
    pub fn spawn(config: CatalogStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start catalog stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/api/");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                seen.lock().expect("lock requests").push(url.clone());

                if let Some(status) = config.http_status {
                    let body = serde_json::json!({ "error": "Invalid API Key", "status_code": 100 });
                    let _ = request.respond(
                        tiny_http::Response::from_string(body.to_string())
                            .with_status_code(status),
                    );
                    continue;
                }

                let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
                if !query.contains(&format!("api_key={API_KEY}")) || !query.contains("format=json")
                {
                    let _ = request.respond(
                        tiny_http::Response::from_string("missing api_key or format")
                            .with_status_code(400),
                    );
                    continue;
                }

                let error = config.status_error.as_deref().unwrap_or("OK");
                let body = if path == "/api/search/" {
                    serde_json::json!({
                        "error": error,
                        "status_code": 1,
                        "number_of_total_results": config.issues.len(),
                        "results": config.issues,
                    })
                } else if let Some(id) = path
                    .strip_prefix("/api/issue/4000-")
                    .and_then(|rest| rest.strip_suffix('/'))
                    .and_then(|id| id.parse::<u64>().ok())
                {
                    let results = match config.credits.get(&id) {
                        Some(credits) => serde_json::json!({ "person_credits": credits }),
                        None => serde_json::json!([]),
                    };
                    serde_json::json!({ "error": error, "status_code": 1, "results": results })
                } else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                };

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(body.to_string())
                    .with_status_code(200)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Request paths with their query strings, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock requests").clone()
    }
}

impl Drop for CatalogStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn issue(id: u64, volume: &str, number: &str, name: &str) -> Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "issue_number": number,
        "volume": { "id": 796, "name": volume, "site_detail_url": "https://example.test/volume" },
        "api_detail_url": format!("https://example.test/api/issue/4000-{id}/"),
        "site_detail_url": format!("https://example.test/issue/{id}"),
        "description": "<p>The <b>Dark</b> Knight returns.</p>",
        "cover_date": "1940-06-01",
        "store_date": null,
    })
}

pub fn credit(id: u64, name: &str, role: &str) -> Value {
    serde_json::json!({ "id": id, "name": name, "role": role })
}
