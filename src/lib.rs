//! Attachment storage gateway.
//!
//! A small HTTP service that fronts a bucket-style blob store and mediates
//! upload, download, deletion, and listing of dossier attachment files. The
//! gateway hands out stable keys and relative download URLs so the browser
//! client never touches storage credentials directly.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
