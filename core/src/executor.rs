//! The four call-site entry points: `request`, `request_json`,
//! `request_form` and `download`.
//!
//! # Design
//! `Executor` wires the stateless `EnvelopeClient` to a `Transport` and a
//! shared `CredentialStore`. The token is read once per call and never
//! written here. Calls are independent: nothing is cached or retried, and
//! concurrent calls on a shared executor are not ordered relative to each
//! other.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::EnvelopeClient;
use crate::credentials::CredentialStore;
use crate::download::DownloadResult;
use crate::error::ApiError;
use crate::http::{FormData, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct Executor<T> {
    client: EnvelopeClient,
    credentials: CredentialStore,
    transport: T,
}

impl<T: Transport> Executor<T> {
    pub fn new(client: EnvelopeClient, credentials: CredentialStore, transport: T) -> Self {
        Self {
            client,
            credentials,
            transport,
        }
    }

    pub fn client(&self) -> &EnvelopeClient {
        &self.client
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Call without a body.
    pub fn request<R: DeserializeOwned>(&self, method: HttpMethod, path: &str) -> Result<R, ApiError> {
        let token = self.credentials.get();
        let request = self.client.build_empty(method, path, token.as_deref());
        self.round_trip(request)
    }

    /// Call with a JSON body.
    pub fn request_json<B, R>(&self, method: HttpMethod, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let token = self.credentials.get();
        let request = self.client.build_json(method, path, body, token.as_deref())?;
        self.round_trip(request)
    }

    /// Call with a multipart form body.
    pub fn request_form<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        form: FormData,
    ) -> Result<R, ApiError> {
        let token = self.credentials.get();
        let request = self.client.build_form(method, path, form, token.as_deref());
        self.round_trip(request)
    }

    /// GET a binary payload, bypassing envelope decoding on success.
    pub fn download(&self, path: &str) -> Result<DownloadResult, ApiError> {
        let token = self.credentials.get();
        let request = self.client.build_download(path, token.as_deref());
        self.dispatch(request)
            .and_then(|response| self.client.parse_download(response))
            .inspect_err(log_failure)
    }

    fn round_trip<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ApiError> {
        self.dispatch(request)
            .and_then(|response| self.client.parse(response))
            .inspect_err(log_failure)
    }

    /// A failure before any status arrived becomes a status-0 response so the
    /// parser classifies it like any other outcome. A body cut short after the
    /// status keeps that status.
    fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(
            method = request.method.as_str(),
            url = %request.url,
            authenticated = request.header("authorization").is_some(),
            "dispatching request"
        );
        match self.transport.execute(request) {
            Ok(response) => Ok(response),
            Err(e) if e.status == 0 => {
                tracing::debug!(error = %e, "no response received");
                Ok(HttpResponse::default())
            }
            Err(e) => {
                tracing::debug!(error = %e, "response body interrupted");
                Err(ApiError::interrupted(e.status))
            }
        }
    }
}

fn log_failure(err: &ApiError) {
    tracing::debug!(
        kind = kind_name(err),
        http_status = err.http_status(),
        code = err.code(),
        error_message = err.message(),
        "request failed"
    );
}

fn kind_name(err: &ApiError) -> &'static str {
    match err {
        ApiError::Transport(_) => "transport",
        ApiError::Http(_) => "http",
        ApiError::Business(_) => "business",
        ApiError::Codec(_) => "codec",
    }
}
