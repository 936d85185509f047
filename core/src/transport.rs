//! Network round-trip behind the `HttpRequest`/`HttpResponse` boundary.
//!
//! `Transport` is the only seam that performs I/O. `UreqTransport` is the
//! blocking implementation; tests substitute their own.

use ureq::http::Response;
use ureq::typestate::WithBody;
use ureq::{Agent, Body, RequestBuilder};
use uuid::Uuid;

use crate::error::TransportFailure;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// Executes one request and returns whatever the server sent back.
///
/// HTTP error statuses are responses, not failures. `Err` means no complete
/// response was obtained; its `status` is `0` unless headers arrived first.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
    body_limit: u64,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    /// Status-code-as-error is disabled so 4xx/5xx come back as data for the
    /// envelope classifier.
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self::from_agent(agent)
    }

    /// Bodies are read without a size cap unless `with_body_limit` sets one.
    pub fn from_agent(agent: Agent) -> Self {
        Self {
            agent,
            body_limit: u64::MAX,
        }
    }

    /// Largest response body accepted, in bytes. A longer body fails the
    /// call with the received status rather than status 0.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }
}

struct Payload {
    content_type: Option<String>,
    bytes: Vec<u8>,
}

impl Payload {
    fn from_body(body: RequestBody) -> Option<Self> {
        match body {
            RequestBody::Empty => None,
            RequestBody::Json(text) => Some(Payload {
                content_type: None,
                bytes: text.into_bytes(),
            }),
            RequestBody::Form(form) => {
                let boundary = format!("----envelope-{}", Uuid::new_v4().simple());
                Some(Payload {
                    content_type: Some(format!("multipart/form-data; boundary={boundary}")),
                    bytes: form.encode(&boundary),
                })
            }
        }
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(builder: RequestBuilder<WithBody>, payload: Option<Payload>) -> Result<Response<Body>, ureq::Error> {
    match payload {
        Some(Payload { content_type, bytes }) => {
            let builder = match content_type {
                Some(content_type) => builder.header("content-type", content_type.as_str()),
                None => builder,
            };
            builder.send(&bytes[..])
        }
        None => builder.send_empty(),
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let payload = Payload::from_body(body);
        let agent = &self.agent;

        let result = match method {
            HttpMethod::Get | HttpMethod::Delete => {
                let builder = match method {
                    HttpMethod::Get => agent.get(&url),
                    _ => agent.delete(&url),
                };
                let builder = with_headers(builder, &headers);
                match payload {
                    Some(payload) => send(builder.force_send_body(), Some(payload)),
                    None => builder.call(),
                }
            }
            HttpMethod::Post => send(with_headers(agent.post(&url), &headers), payload),
            HttpMethod::Put => send(with_headers(agent.put(&url), &headers), payload),
            HttpMethod::Patch => send(with_headers(agent.patch(&url), &headers), payload),
        };

        let mut response = result.map_err(|e| TransportFailure::unreachable(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_vec()
            .map_err(|e| TransportFailure::interrupted(status, e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}
