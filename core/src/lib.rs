//! Client core for backends speaking the `{code, msg, data}` envelope.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). A `Transport` performs the
//! round-trip; `Executor` ties the two together with the persisted token and
//! exposes the four call-site operations.
//!
//! # Design
//! - `EnvelopeClient` is stateless: it holds only the base URL.
//! - The token lives behind an injected `CredentialStore`, read once per call.
//! - Every failure is an `ApiError` variant (`Transport`, `Http`, `Business`,
//!   `Codec`) sharing one `ErrorDetail` payload.
//! - Envelope code `20001` is the only success.

pub mod client;
pub mod config;
pub mod credentials;
pub mod download;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod http;
pub mod session;
pub mod transport;
pub mod types;
pub mod url;

pub use client::EnvelopeClient;
pub use config::ClientConfig;
pub use credentials::{CredentialStore, FileStorage, MemoryStorage, Storage, TOKEN_KEY};
pub use download::{filename_from_disposition, DownloadResult, DEFAULT_FILENAME};
pub use envelope::{DecodeFailure, Envelope, RawEnvelope, SUCCESS_CODE};
pub use error::{ApiError, ErrorDetail, StorageError, TransportFailure};
pub use executor::Executor;
pub use http::{assemble_headers, BodyKind, FormData, FormPart, HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use session::Session;
pub use transport::{Transport, UreqTransport};
pub use types::{AuthGrant, Credentials, UserProfile};
pub use url::UrlBuilder;
