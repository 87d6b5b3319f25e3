#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Url;
use taskboard::api_client::{HttpRequest, HttpResponse, HttpTransport, Navigator};
use taskboard::{ApiClient, MemoryCookieStore, TransportError};

/// Answers requests from a script and records what was sent.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, status: u16, body: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body.as_bytes().to_vec())));
        self
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Other(message.to_string())));
        self
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no scripted response".to_string())))
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visits.lock().unwrap().push(path.to_string());
    }
}

pub struct Harness {
    pub client: ApiClient,
    pub transport: Arc<ScriptedTransport>,
    pub navigator: Arc<RecordingNavigator>,
    pub store: Arc<MemoryCookieStore>,
}

pub fn harness(base_url: &str, store: MemoryCookieStore) -> Harness {
    let transport = Arc::new(ScriptedTransport::new());
    let navigator = Arc::new(RecordingNavigator::default());
    let store = Arc::new(store);
    let client = ApiClient::new(
        Url::parse(base_url).unwrap(),
        transport.clone(),
        store.clone(),
        navigator.clone(),
    );
    Harness {
        client,
        transport,
        navigator,
        store,
    }
}

pub fn signed_in() -> Harness {
    harness("http://localhost:8000", MemoryCookieStore::with_credential("tok-123"))
}

pub fn task_json(id: &str, title: &str, description: &str, completed: bool) -> String {
    serde_json::json!({
        "id": id,
        "title": title,
        "description": description,
        "completed": completed,
        "created_at": "2026-02-02T10:00:00.000000",
        "updated_at": "2026-02-02T10:00:00.000000",
    })
    .to_string()
}
