//! JSON response shapes for the gateway endpoints.
//!
//! One explicit type per endpoint so the wire shape cannot drift between
//! handlers. Errors always serialize through [`ErrorResponse`].

use serde::{Deserialize, Serialize};

/// Body of every error response: a single `error` string, nothing else.
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

/// Returned by `POST /upload`.
///
/// `url` is a relative path (`/file/<urlencoded key>`); the caller prefixes
/// the gateway's base origin.
#[derive(Serialize, Deserialize, Debug)]
pub struct UploadResponse {
    pub success: bool,
    pub key: String,
    pub url: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}

/// Returned by `DELETE /file/{key}`.
#[derive(Serialize, Deserialize, Debug)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted: String,
}

/// Returned by `GET /list`.
#[derive(Serialize, Deserialize, Debug)]
pub struct ListResponse {
    pub files: Vec<FileEntry>,
}

/// One entry in a listing.
#[derive(Serialize, Deserialize, Debug)]
pub struct FileEntry {
    pub key: String,
    pub size: i64,
    pub uploaded: String,
}
