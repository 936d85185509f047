//! Authentication DTOs exchanged with the backend.

use serde::{Deserialize, Serialize};

/// Body of the sign-in and sign-up calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// The signed-in user as reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Sign-in/sign-up result: the profile plus the token to persist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthGrant {
    pub token: String,
    #[serde(flatten)]
    pub user: UserProfile,
}
