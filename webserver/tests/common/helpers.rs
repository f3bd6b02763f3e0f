//! Test helpers for driving the router without a socket

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use engine::services::FixedClock;
use engine::SalesEngine;
use serde_json::Value;
use tower::ServiceExt;
use webserver::web::AGENT_HEADER;
use webserver::{RealWebSocketManager, WebServer};

use super::fixtures::TestFixtures;

pub struct TestApp {
    pub server: WebServer<RealWebSocketManager>,
    pub websockets: Arc<RealWebSocketManager>,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let clock = Arc::new(FixedClock::new(TestFixtures::tuesday()));
        let engine = SalesEngine::open_with_clock(TestFixtures::config(), None, clock)
            .await
            .expect("engine should open");
        let websockets = Arc::new(RealWebSocketManager::new());
        let server = WebServer::new(Arc::new(engine), websockets.clone());
        let router = server.router();
        Self {
            server,
            websockets,
            router,
        }
    }

    /// Send one request as `agent` and decode the JSON response, if any
    pub async fn request(&self, method: Method, uri: &str, agent: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(agent) = agent {
            builder = builder.header(AGENT_HEADER, agent);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, agent: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(agent), None).await
    }

    pub async fn post(&self, uri: &str, agent: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(agent), body).await
    }

    pub async fn delete(&self, uri: &str, agent: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(agent), None).await
    }

    /// Create a client as `owner` and return its id
    pub async fn create_client(&self, owner: &str, service_type: &str) -> String {
        let (status, body) = self
            .post("/api/clients", owner, Some(TestFixtures::new_client(service_type)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

pub struct TestHelpers;

impl TestHelpers {
    pub const TIMEOUT: Duration = Duration::from_millis(500);

    pub async fn with_timeout<T, F>(future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        tokio::time::timeout(Self::TIMEOUT, future)
            .await
            .expect("operation timed out")
    }
}
