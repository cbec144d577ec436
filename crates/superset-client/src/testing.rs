//! In-memory [`Transport`] for unit tests.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::error::Result;
use crate::transport::{ApiRequest, ApiResponse, HttpMethod, Transport};

#[derive(Debug)]
struct Route {
    method: HttpMethod,
    path: String,
    responses: VecDeque<ApiResponse>,
}

/// Canned responses per `(method, path)`.
///
/// Responses registered for the same route are served in order; the last
/// one repeats. Unknown routes answer 404.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
        self.respond(method, path, ApiResponse::json(status, &body));
    }

    pub(crate) fn respond(&self, method: HttpMethod, path: &str, response: ApiResponse) {
        let path = normalize(path);
        let mut routes = self.routes.lock();
        if let Some(route) = routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        {
            route.responses.push_back(response);
            return;
        }
        routes.push(Route {
            method,
            path: path.to_string(),
            responses: VecDeque::from([response]),
        });
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<ApiRequest> {
        let path = normalize(path);
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && normalize(&r.path) == path)
            .cloned()
            .collect()
    }

    pub(crate) fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().last().cloned()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let path = normalize(&request.path).to_string();
        let method = request.method;
        self.requests.lock().push(request);

        let mut routes = self.routes.lock();
        let response = routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
            .and_then(|route| {
                if route.responses.len() > 1 {
                    route.responses.pop_front()
                } else {
                    route.responses.front().cloned()
                }
            });
        Ok(response.unwrap_or_else(|| ApiResponse::json(404, &json!({"message": "Not found"}))))
    }
}
