#![allow(dead_code)]

use std::{
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{Value, json};
use smartwayz_client::{
    ApiConfig, ClientResult, HttpRequest, HttpResponse, HttpTransport, Method, SessionListener,
};

pub const BASE_URL: &str = "http://backend.test/api";

pub fn api_config() -> ApiConfig {
    ApiConfig::new(BASE_URL, "smartwayz-tests")
}

#[derive(Clone, Debug)]
pub enum RefreshOutcome {
    Issue(&'static str),
    Reject,
}

/// In-process stand-in for the backend: report routes demand the current
/// access token, the refresh route rotates it after a configurable delay.
pub struct FakeBackend {
    valid_access: Mutex<String>,
    refresh_outcomes: Mutex<Vec<RefreshOutcome>>,
    refresh_delay: Duration,
    refresh_calls: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeBackend {
    pub fn new(valid_access: &str) -> Self {
        Self {
            valid_access: Mutex::new(valid_access.to_owned()),
            refresh_outcomes: Mutex::new(Vec::new()),
            refresh_delay: Duration::from_millis(50),
            refresh_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Queues outcomes for successive refresh calls; the last one repeats.
    pub fn with_refresh_outcomes(self, outcomes: Vec<RefreshOutcome>) -> Self {
        *self.refresh_outcomes.lock().expect("lock") = outcomes;
        self
    }

    pub fn expire_access(&self, replacement: &str) {
        *self.valid_access.lock().expect("lock") = replacement.to_owned();
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("lock").clone()
    }

    pub fn requests_to(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url.starts_with(&format!("{BASE_URL}{path}")))
            .count()
    }

    fn next_refresh_outcome(&self) -> RefreshOutcome {
        let mut outcomes = self.refresh_outcomes.lock().expect("lock");
        match outcomes.len() {
            0 => RefreshOutcome::Reject,
            1 => outcomes[0].clone(),
            _ => outcomes.remove(0),
        }
    }

    async fn refresh(&self) -> HttpResponse {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.refresh_delay).await;

        match self.next_refresh_outcome() {
            RefreshOutcome::Issue(access) => {
                self.expire_access(access);
                HttpResponse::from_json(200, &json!({"success": true, "data": {"access": access}}))
            }
            RefreshOutcome::Reject => HttpResponse::from_json(
                401,
                &json!({"detail": "Token is invalid or expired", "code": "token_not_valid"}),
            ),
        }
    }

    fn protected(&self, request: &HttpRequest, body: Value) -> HttpResponse {
        let valid = self.valid_access.lock().expect("lock").clone();
        if request.bearer_token() == Some(valid.as_str()) {
            HttpResponse::from_json(200, &body)
        } else {
            HttpResponse::from_json(
                401,
                &json!({"detail": "Given token not valid for any token type"}),
            )
        }
    }
}

#[async_trait]
impl HttpTransport for FakeBackend {
    async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
        self.requests.lock().expect("lock").push(request.clone());

        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .split('?')
            .next()
            .unwrap_or_default()
            .to_owned();

        let response = match (request.method, path.as_str()) {
            (Method::Post, "/auth/refresh/") => self.refresh().await,
            (Method::Post, "/auth/logout/") => {
                HttpResponse::from_json(200, &json!({"success": true, "message": "Logout successful"}))
            }
            (Method::Post, "/auth/login/citizen/") => {
                let access = self.valid_access.lock().expect("lock").clone();
                HttpResponse::from_json(
                    200,
                    &json!({
                        "success": true,
                        "message": "Login successful",
                        "data": {
                            "user": {"id": 7, "email": "juan@example.com", "user_type": "citizen", "name": "Juan"},
                            "tokens": {"access": access, "refresh": "refresh-1"}
                        }
                    }),
                )
            }
            (Method::Get, "/reports/") => self.protected(&request, json!({"count": 0, "results": []})),
            (Method::Get, "/categories/") => HttpResponse::from_json(
                200,
                &json!([{"id": 1, "report_type": "Hazard"}, {"id": 2, "report_type": "Infrastructure"}]),
            ),
            _ => HttpResponse::from_json(404, &json!({"detail": "Not found."})),
        };

        Ok(response)
    }
}

#[derive(Default)]
pub struct RecordingListener {
    reasons: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn reasons(&self) -> Vec<String> {
        self.reasons.lock().expect("lock").clone()
    }
}

impl SessionListener for RecordingListener {
    fn session_expired(&self, reason: &str) {
        self.reasons.lock().expect("lock").push(reason.to_owned());
    }
}
