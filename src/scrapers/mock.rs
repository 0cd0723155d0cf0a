use crate::error::{Result, ScrapeError};
use crate::models::QueryParameters;
use crate::scrapers::traits::Transport;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned bodies and records every request
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<(String, QueryParameters)>>,
}

impl MockTransport {
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(String, QueryParameters)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_json(&self, url: &str, params: &QueryParameters) -> Result<Value> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), params.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ScrapeError::UnexpectedResponse("no canned response left".into()))
    }
}
