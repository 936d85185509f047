//! In-memory backend speaking the `{code, msg, data}` envelope.
//!
//! Mirrors the real backend's auth and file endpoints closely enough for the
//! client's integration tests: token auth via `Authorization: Token <value>`,
//! envelope-wrapped JSON everywhere except downloads and the plain-text route.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const CODE_OK: i64 = 20001;
pub const CODE_BAD_REQUEST: i64 = 40001;
pub const CODE_UNAUTHORIZED: i64 = 40101;
pub const CODE_NOT_FOUND: i64 = 40401;

/// Largest accepted upload request, in bytes.
pub const UPLOAD_LIMIT: usize = 64 * 1024 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserOut {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub is_admin: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileOut {
    pub id: i64,
    pub filename: String,
    pub size: usize,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

struct User {
    profile: UserOut,
    password: String,
}

struct StoredFile {
    owner: i64,
    filename: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
pub struct Backend {
    users: HashMap<String, User>,
    tokens: HashMap<String, String>,
    files: HashMap<i64, StoredFile>,
    next_user_id: i64,
    next_file_id: i64,
}

impl Backend {
    fn user_for(&self, headers: &HeaderMap) -> Option<&UserOut> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Token ")?;
        let username = self.tokens.get(token)?;
        self.users.get(username).map(|u| &u.profile)
    }

    fn issue_token(&mut self, username: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), username.to_string());
        token
    }
}

pub type Db = Arc<RwLock<Backend>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Backend::default()));
    Router::new()
        .route("/api/auth/register/", post(register))
        .route("/api/auth/login/", post(login))
        .route("/api/auth/logout/", post(logout))
        .route("/api/auth/me/", get(me))
        .route(
            "/api/utils/files/upload/",
            post(upload_file).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/api/utils/files/list/", get(list_files))
        .route("/api/utils/files/{id}/", delete(delete_file))
        .route("/api/utils/files/{id}/download/", get(download_file))
        .route("/api/demo/business/", get(business_failure))
        .route("/api/demo/plain/", get(plain_text))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn ok(data: Value, msg: &str) -> Response {
    Json(json!({"code": CODE_OK, "msg": msg, "data": data})).into_response()
}

fn fail(status: StatusCode, code: i64, msg: &str) -> Response {
    (status, Json(json!({"code": code, "msg": msg, "data": null}))).into_response()
}

fn unauthorized() -> Response {
    fail(StatusCode::UNAUTHORIZED, CODE_UNAUTHORIZED, "请先登录")
}

fn grant(profile: &UserOut, token: String) -> Value {
    let mut data = json!(profile);
    data["token"] = json!(token);
    data
}

async fn register(State(db): State<Db>, Json(input): Json<Credentials>) -> Response {
    if input.username.trim().is_empty() || input.password.is_empty() {
        return fail(StatusCode::BAD_REQUEST, CODE_BAD_REQUEST, "用户名和密码不能为空");
    }
    let mut db = db.write().await;
    if db.users.contains_key(&input.username) {
        return fail(StatusCode::BAD_REQUEST, CODE_BAD_REQUEST, "用户名已存在");
    }
    db.next_user_id += 1;
    let profile = UserOut {
        id: db.next_user_id,
        username: input.username.clone(),
        role: "user".to_string(),
        is_admin: false,
    };
    db.users.insert(
        input.username.clone(),
        User {
            profile: profile.clone(),
            password: input.password,
        },
    );
    let token = db.issue_token(&input.username);
    tracing::info!(username = %profile.username, "registered");
    ok(grant(&profile, token), "注册成功")
}

async fn login(State(db): State<Db>, Json(input): Json<Credentials>) -> Response {
    let mut db = db.write().await;
    let profile = match db.users.get(&input.username) {
        Some(user) if user.password == input.password => user.profile.clone(),
        _ => return fail(StatusCode::BAD_REQUEST, CODE_BAD_REQUEST, "用户名或密码错误"),
    };
    let token = db.issue_token(&input.username);
    ok(grant(&profile, token), "登录成功")
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Response {
    let mut db = db.write().await;
    if db.user_for(&headers).is_none() {
        return unauthorized();
    }
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Token "))
        .map(str::to_string);
    if let Some(token) = token {
        db.tokens.remove(&token);
    }
    ok(Value::Null, "退出成功")
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Response {
    let db = db.read().await;
    match db.user_for(&headers) {
        Some(profile) => ok(json!(profile), "OK"),
        None => unauthorized(),
    }
}

async fn upload_file(State(db): State<Db>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    let owner = match db.read().await.user_for(&headers) {
        Some(profile) => profile.id,
        None => return unauthorized(),
    };

    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let filename = field.file_name().unwrap_or("upload.bin").to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((filename, bytes.to_vec())),
                    Err(e) => return fail(StatusCode::BAD_REQUEST, CODE_BAD_REQUEST, &e.body_text()),
                }
            }
            Ok(None) => break,
            Err(e) => return fail(StatusCode::BAD_REQUEST, CODE_BAD_REQUEST, &e.body_text()),
        }
    }
    let Some((filename, bytes)) = upload else {
        return fail(StatusCode::BAD_REQUEST, CODE_BAD_REQUEST, "缺少文件");
    };

    let mut db = db.write().await;
    db.next_file_id += 1;
    let out = FileOut {
        id: db.next_file_id,
        filename: filename.clone(),
        size: bytes.len(),
    };
    db.files.insert(out.id, StoredFile { owner, filename, bytes });
    ok(json!(out), "上传成功")
}

async fn list_files(State(db): State<Db>, headers: HeaderMap) -> Response {
    let db = db.read().await;
    let Some(owner) = db.user_for(&headers).map(|p| p.id) else {
        return unauthorized();
    };
    let mut files: Vec<FileOut> = db
        .files
        .iter()
        .filter(|(_, f)| f.owner == owner)
        .map(|(id, f)| FileOut {
            id: *id,
            filename: f.filename.clone(),
            size: f.bytes.len(),
        })
        .collect();
    files.sort_by_key(|f| f.id);
    ok(json!(files), "OK")
}

async fn delete_file(State(db): State<Db>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let mut db = db.write().await;
    let Some(owner) = db.user_for(&headers).map(|p| p.id) else {
        return unauthorized();
    };
    if !db.files.get(&id).is_some_and(|f| f.owner == owner) {
        return fail(StatusCode::NOT_FOUND, CODE_NOT_FOUND, "文件不存在");
    }
    db.files.remove(&id);
    ok(Value::Null, "删除成功")
}

async fn download_file(State(db): State<Db>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let db = db.read().await;
    let Some(owner) = db.user_for(&headers).map(|p| p.id) else {
        return unauthorized();
    };
    let Some(file) = db.files.get(&id).filter(|f| f.owner == owner) else {
        return fail(StatusCode::NOT_FOUND, CODE_NOT_FOUND, "文件不存在");
    };
    let ascii: String = file
        .filename
        .chars()
        .map(|c| if c.is_ascii() && c != '"' { c } else { '_' })
        .collect();
    let disposition = format!(
        "attachment; filename=\"{ascii}\"; filename*=UTF-8''{}",
        urlencoding::encode(&file.filename)
    );
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes.clone(),
    )
        .into_response()
}

async fn business_failure() -> Response {
    fail(StatusCode::OK, CODE_BAD_REQUEST, "业务校验未通过")
}

async fn plain_text() -> Response {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "pong").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_flattens_profile_and_token() {
        let profile = UserOut {
            id: 3,
            username: "ann".to_string(),
            role: "user".to_string(),
            is_admin: false,
        };
        let data = grant(&profile, "tok".to_string());
        assert_eq!(data["id"], 3);
        assert_eq!(data["username"], "ann");
        assert_eq!(data["token"], "tok");
    }

    #[test]
    fn credentials_require_both_fields() {
        let result: Result<Credentials, _> = serde_json::from_str(r#"{"username":"ann"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn token_lookup_needs_scheme_prefix() {
        let mut backend = Backend::default();
        backend.users.insert(
            "ann".to_string(),
            User {
                profile: UserOut {
                    id: 1,
                    username: "ann".to_string(),
                    role: "user".to_string(),
                    is_admin: false,
                },
                password: "pw".to_string(),
            },
        );
        let token = backend.issue_token("ann");

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, token.parse().unwrap());
        assert!(backend.user_for(&headers).is_none());

        headers.insert(header::AUTHORIZATION, format!("Token {token}").parse().unwrap());
        assert_eq!(backend.user_for(&headers).map(|p| p.id), Some(1));
    }
}
