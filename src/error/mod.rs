//! Error types for the REST surface.
//!
//! `types` defines the [`ApiError`] taxonomy, `conversion` turns it into
//! HTTP responses. Realtime-layer failures never travel through here: the
//! gateway logs and drops malformed or unauthorized socket events instead
//! of surfacing them (one misbehaving connection must not affect the rest).

pub mod conversion;
pub mod types;

pub use types::ApiError;
