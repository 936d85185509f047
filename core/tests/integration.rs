//! End-to-end runs against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives the executor and
//! session over real HTTP with `UreqTransport`. Covers every classification
//! path the backend can produce: success, HTTP failure, business failure,
//! non-JSON body, refused connection and bodies past ureq's default read
//! limit.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};

use envelope_core::{
    ApiError, ClientConfig, CredentialStore, EnvelopeClient, Executor, FormData, HttpMethod, Session,
    UreqTransport,
};
use serde_json::{json, Value};

fn spawn_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn session(addr: SocketAddr) -> Session<UreqTransport> {
    Session::new(ClientConfig::new(&format!("http://{addr}/")).executor())
}

/// Answer one connection with a 200 octet-stream attachment of `len` bytes.
fn serve_attachment_once(len: usize) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&chunk[..n]),
            }
        }
        let head = format!(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: application/octet-stream\r\n\
             Content-Disposition: attachment; filename=\"big.bin\"\r\n\
             Content-Length: {len}\r\n\
             Connection: close\r\n\r\n"
        );
        // The client may hang up early when it enforces a body limit.
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&vec![0x5a; len]);
    });

    addr
}

const LARGE: usize = 11 * 1024 * 1024;

#[test]
fn auth_and_file_lifecycle() {
    let addr = spawn_server();
    let session = session(addr);
    let exec = session.executor();

    // Signed out: no request, no token.
    assert_eq!(session.me().unwrap(), None);
    let err = exec.request::<Value>(HttpMethod::Get, "/api/auth/me/").unwrap_err();
    assert!(matches!(err, ApiError::Http(_)));
    assert_eq!(err.http_status(), 401);
    assert_eq!(err.code(), 40101);

    // Register stores the token.
    let user = session.register("ann", "pw").unwrap();
    assert_eq!(user.username, "ann");
    assert!(session.is_authenticated());
    assert_eq!(session.me().unwrap(), Some(user.clone()));

    // Duplicate registration is an HTTP failure carrying the backend message.
    let err = session.register("ann", "pw").unwrap_err();
    assert_eq!(err.http_status(), 400);
    assert_eq!(err.message(), "用户名已存在");

    // Upload through the multipart path.
    let form = FormData::new()
        .text("note", "quarterly")
        .file("file", "report final.pdf", Some("application/pdf"), b"%PDF-1.4".to_vec());
    let uploaded: Value = exec
        .request_form(HttpMethod::Post, "/api/utils/files/upload/", form)
        .unwrap();
    assert_eq!(uploaded["filename"], "report final.pdf");
    assert_eq!(uploaded["size"], 8);
    let id = uploaded["id"].as_i64().unwrap();

    // Listing twice yields identical, independent results.
    let first: Vec<Value> = exec.request(HttpMethod::Get, "/api/utils/files/list/").unwrap();
    let second: Vec<Value> = exec.request(HttpMethod::Get, "/api/utils/files/list/").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);

    // Download recovers the extended filename.
    let file = exec.download(&format!("/api/utils/files/{id}/download/")).unwrap();
    assert_eq!(file.filename, "report final.pdf");
    assert_eq!(file.bytes, b"%PDF-1.4".to_vec());

    // Delete, then the download is a JSON 404.
    let deleted: Value = exec
        .request(HttpMethod::Delete, &format!("/api/utils/files/{id}/"))
        .unwrap();
    assert_eq!(deleted, Value::Null);
    let err = exec.download(&format!("/api/utils/files/{id}/download/")).unwrap_err();
    assert!(matches!(err, ApiError::Http(_)));
    assert_eq!(err.code(), 40401);
    assert_eq!(err.message(), "文件不存在");

    // Logout clears the token; signing back in issues a fresh one.
    session.logout().unwrap();
    assert!(!session.is_authenticated());
    let user = session.login("ann", "pw").unwrap();
    assert_eq!(user.id, 1);
    let credentials = json!({"username": "ann", "password": "pw"});
    let profile: Value = exec
        .request_json(HttpMethod::Post, "/api/auth/login/", &credentials)
        .unwrap();
    assert_eq!(profile["username"], "ann");
}

#[test]
fn business_and_transport_failures() {
    let addr = spawn_server();
    let exec = session(addr).executor().clone();

    let err = exec.request::<Value>(HttpMethod::Get, "/api/demo/business/").unwrap_err();
    assert!(matches!(err, ApiError::Business(_)));
    assert_eq!(err.http_status(), 200);
    assert_eq!(err.code(), 40001);
    assert_eq!(err.message(), "业务校验未通过");

    let err = exec.request::<Value>(HttpMethod::Get, "/api/demo/plain/").unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.http_status(), 200);
    assert_eq!(err.code(), -1);
    assert_eq!(err.message(), "响应不是 JSON");
    assert_eq!(err.data(), Some(&json!("pong")));

    // Unknown routes come back from axum as empty non-JSON 404s.
    let err = exec.request::<Value>(HttpMethod::Get, "/api/missing/").unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.http_status(), 404);
}

#[test]
fn refused_connection_is_status_zero() {
    // Bind then drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let exec = Executor::new(
        EnvelopeClient::new(&format!("http://{addr}")),
        CredentialStore::in_memory(),
        UreqTransport::new(),
    );

    let err = exec.request::<Value>(HttpMethod::Get, "/api/auth/me/").unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.http_status(), 0);
    assert_eq!(err.code(), -1);
    assert_eq!(err.message(), "网络请求失败或被中断，请检查后端服务是否已启动");

    let err = exec.download("/api/utils/files/1/download/").unwrap_err();
    assert_eq!(err.http_status(), 0);
}

#[test]
fn large_file_upload_and_download() {
    let addr = spawn_server();
    let session = session(addr);
    let exec = session.executor();
    session.register("bea", "pw").unwrap();

    let contents: Vec<u8> = (0..LARGE).map(|i| (i % 251) as u8).collect();
    let form = FormData::new().file("file", "big.bin", None, contents.clone());
    let uploaded: Value = exec
        .request_form(HttpMethod::Post, "/api/utils/files/upload/", form)
        .unwrap();
    assert_eq!(uploaded["size"], LARGE);
    let id = uploaded["id"].as_i64().unwrap();

    let file = exec.download(&format!("/api/utils/files/{id}/download/")).unwrap();
    assert_eq!(file.filename, "big.bin");
    assert_eq!(file.bytes.len(), LARGE);
    assert!(file.bytes == contents);
}

#[test]
fn large_attachment_is_read_in_full() {
    let addr = serve_attachment_once(LARGE);
    let exec = Executor::new(
        EnvelopeClient::new(&format!("http://{addr}")),
        CredentialStore::in_memory(),
        UreqTransport::new(),
    );

    let file = exec.download("/big").unwrap();
    assert_eq!(file.filename, "big.bin");
    assert_eq!(file.bytes.len(), LARGE);
    assert!(file.bytes.iter().all(|b| *b == 0x5a));
}

#[test]
fn body_over_limit_keeps_received_status() {
    let addr = serve_attachment_once(4096);
    let exec = Executor::new(
        EnvelopeClient::new(&format!("http://{addr}")),
        CredentialStore::in_memory(),
        UreqTransport::new().with_body_limit(1024),
    );

    let err = exec.download("/big").unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.http_status(), 200);
    assert_eq!(err.code(), -1);
    assert_eq!(err.message(), "网络请求失败或被中断，请检查后端服务是否已启动");
}
