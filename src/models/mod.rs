//! Data models for the attachment gateway.
//!
//! `object` maps metadata rows via `sqlx::FromRow`; `responses` holds the
//! JSON shapes returned to the browser client.

pub mod object;
pub mod responses;
