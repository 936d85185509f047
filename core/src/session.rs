//! Sign-in state on top of the executor.
//!
//! The session is the only writer of the credential store: a successful
//! sign-in or sign-up stores the token, sign-out clears it.

use serde_json::Value;

use crate::error::ApiError;
use crate::executor::Executor;
use crate::http::HttpMethod;
use crate::transport::Transport;
use crate::types::{AuthGrant, Credentials, UserProfile};

pub const LOGIN_PATH: &str = "/api/auth/login/";
pub const REGISTER_PATH: &str = "/api/auth/register/";
pub const LOGOUT_PATH: &str = "/api/auth/logout/";
pub const ME_PATH: &str = "/api/auth/me/";

pub const MSG_LOGIN_FAILED: &str = "登录失败";
pub const MSG_REGISTER_FAILED: &str = "注册失败";

#[derive(Debug, Clone)]
pub struct Session<T> {
    executor: Executor<T>,
}

impl<T: Transport> Session<T> {
    pub fn new(executor: Executor<T>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Executor<T> {
        &self.executor
    }

    pub fn is_authenticated(&self) -> bool {
        self.executor.credentials().get().is_some()
    }

    pub fn login(&self, username: &str, password: &str) -> Result<UserProfile, ApiError> {
        self.authenticate(LOGIN_PATH, username, password, MSG_LOGIN_FAILED)
    }

    pub fn register(&self, username: &str, password: &str) -> Result<UserProfile, ApiError> {
        self.authenticate(REGISTER_PATH, username, password, MSG_REGISTER_FAILED)
    }

    /// Sign out. The token is cleared even when the backend call fails; that
    /// failure is still returned.
    pub fn logout(&self) -> Result<(), ApiError> {
        let outcome = if self.is_authenticated() {
            self.executor
                .request::<Value>(HttpMethod::Post, LOGOUT_PATH)
                .map(|_| ())
        } else {
            Ok(())
        };
        if let Err(e) = self.executor.credentials().clear() {
            tracing::warn!(error = %e, "failed to clear stored token");
        }
        outcome
    }

    /// The current user, or `None` without a request when signed out.
    pub fn me(&self) -> Result<Option<UserProfile>, ApiError> {
        if !self.is_authenticated() {
            return Ok(None);
        }
        self.executor.request(HttpMethod::Get, ME_PATH).map(Some)
    }

    fn authenticate(
        &self,
        path: &str,
        username: &str,
        password: &str,
        fallback: &str,
    ) -> Result<UserProfile, ApiError> {
        let body = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let grant: AuthGrant = self
            .executor
            .request_json(HttpMethod::Post, path, &body)
            .map_err(|e| e.with_fallback_message(fallback))?;

        if let Err(e) = self.executor.credentials().set(&grant.token) {
            tracing::warn!(error = %e, "failed to persist token");
        }
        tracing::debug!(user = %grant.user.username, "signed in");
        Ok(grant.user)
    }
}
