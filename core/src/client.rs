//! Request builder and response parser for the envelope protocol.
//!
//! # Design
//! `EnvelopeClient` holds only the `UrlBuilder` and carries no state between
//! calls. Each request variant has a `build_*` method producing an
//! `HttpRequest`; `parse` and `parse_download` consume the `HttpResponse`.
//! The token is passed in per call so the client never touches storage and
//! stays deterministic.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::download::{filename_from_disposition, DownloadResult};
use crate::envelope::{Envelope, RawEnvelope};
use crate::error::{ApiError, MSG_DOWNLOAD_FAILED, MSG_REQUEST_FAILED};
use crate::http::{assemble_headers, BodyKind, FormData, HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::url::UrlBuilder;

#[derive(Debug, Clone)]
pub struct EnvelopeClient {
    urls: UrlBuilder,
}

impl EnvelopeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            urls: UrlBuilder::new(base_url),
        }
    }

    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }

    pub fn build_json<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<HttpRequest, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_string(body)
            .map_err(|e| ApiError::codec(0, format!("request body serialization failed: {e}")))?;
        Ok(HttpRequest {
            method,
            url: self.urls.resolve(path),
            headers: assemble_headers(token, BodyKind::Json),
            body: RequestBody::Json(body),
        })
    }

    pub fn build_form(&self, method: HttpMethod, path: &str, form: FormData, token: Option<&str>) -> HttpRequest {
        HttpRequest {
            method,
            url: self.urls.resolve(path),
            headers: assemble_headers(token, BodyKind::Form),
            body: RequestBody::Form(form),
        }
    }

    pub fn build_empty(&self, method: HttpMethod, path: &str, token: Option<&str>) -> HttpRequest {
        HttpRequest {
            method,
            url: self.urls.resolve(path),
            headers: assemble_headers(token, BodyKind::Empty),
            body: RequestBody::Empty,
        }
    }

    pub fn build_download(&self, path: &str, token: Option<&str>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.urls.resolve(path),
            headers: assemble_headers(token, BodyKind::Download),
            body: RequestBody::Empty,
        }
    }

    /// Classify a response and unwrap the envelope's `data` into `T`.
    pub fn parse<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        let status = response.status;
        if status == 0 || !response.is_json() {
            return Err(ApiError::transport(status, response.text()));
        }

        let text = response.text();
        let raw = match RawEnvelope::parse(&text) {
            Ok(raw) => raw,
            Err(_) if status >= 400 => RawEnvelope::default(),
            Err(e) => return Err(ApiError::codec(status, e.to_string())),
        };
        if status >= 400 {
            return Err(ApiError::http(status, &raw, MSG_REQUEST_FAILED));
        }

        match Envelope::decode(raw) {
            Ok(Envelope::Success(data)) => serde_json::from_value(data)
                .map_err(|e| ApiError::codec(status, format!("unexpected data shape: {e}"))),
            Ok(Envelope::Failure { code, msg, data }) => Err(ApiError::business(status, code, msg.as_deref(), data)),
            Err(e) => Err(ApiError::codec(status, e.to_string())),
        }
    }

    /// Classify a download response and recover its filename.
    pub fn parse_download(&self, response: HttpResponse) -> Result<DownloadResult, ApiError> {
        let status = response.status;
        if status == 0 {
            return Err(ApiError::transport(0, response.text()));
        }

        if status >= 400 {
            if !response.is_json() {
                return Err(ApiError::http_bare(status, MSG_DOWNLOAD_FAILED));
            }
            let raw = RawEnvelope::parse(&response.text()).unwrap_or_default();
            return Err(ApiError::http(status, &raw, MSG_DOWNLOAD_FAILED));
        }

        // A JSON reply to a download is only an error when it is a failure envelope.
        if response.is_json() {
            if let Ok(Envelope::Failure { code, msg, data }) = Envelope::from_text(&response.text()) {
                return Err(ApiError::business(status, code, msg.as_deref(), data));
            }
        }

        let filename = filename_from_disposition(response.header("content-disposition"));
        Ok(DownloadResult {
            bytes: response.body,
            filename,
        })
    }
}
