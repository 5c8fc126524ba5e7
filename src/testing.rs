//! Test doubles shared by unit tests

use crate::transport::{Request, Response, Transport, TransportError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

/// Transport that replays a fixed script and records every request with its send time
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Response, TransportError>>>,
    requests: Mutex<Vec<(Request, Instant)>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<Response, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(Request, Instant)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), Instant::now()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                panic!("unscripted request {} {}", request.method, request.path)
            })
    }
}

/// Response with a JSON body; `null` produces an empty body
pub fn json_response(status: u16, body: Value) -> Response {
    let response = Response::new(StatusCode::from_u16(status).unwrap());
    if body.is_null() {
        return response;
    }
    response.with_body(serde_json::to_vec(&body).unwrap())
}

pub fn accepted_with_location(location: &str, retry_after: Option<&str>) -> Response {
    let response = Response::new(StatusCode::ACCEPTED).with_header("location", location);
    match retry_after {
        Some(value) => response.with_header("retry-after", value),
        None => response,
    }
}
