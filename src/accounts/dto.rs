use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::repo_types::User;

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Signup payload; the form fields arrive nested under `user`.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub user: SignupUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupUser {
    pub login: String,
    pub password1: String,
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    #[serde(rename = "userAdded")]
    pub user_added: User,
}

/// Request body for deletion; clients send the legacy `_id` key.
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(rename = "_id")]
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub user: Option<User>,
}

/// Request body for admin approval of a pending user.
#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub result: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}
