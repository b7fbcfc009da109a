//! Request and response bodies of the backend endpoints.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    "bearer".to_string()
}

#[derive(Serialize, Debug)]
pub struct NotifyRequest<'a> {
    pub id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct NotifyResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ClearResponse {
    pub success: bool,
    pub deleted: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub rows_processed: u64,
}
