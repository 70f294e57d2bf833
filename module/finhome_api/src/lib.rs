//! HTTP API for the finhome personal-finance backend
//!
//! Thin axum layer over `finhome_core`: every handler deserializes its
//! input, delegates to one `finhome_core` use-case, and maps the `Result`
//! through [`error::ApiError`]'s `IntoResponse` (`SPEC_FULL.md` §6 wire
//! conventions). Nothing in this crate touches SQL directly except through
//! the repositories it constructs per-request from [`state::AppState`].

#![cfg_attr(not(feature = "enabled"), allow(unused_variables, dead_code))]

#[cfg(feature = "enabled")]
pub mod error;

#[cfg(feature = "enabled")]
pub mod jwks_cache;

#[cfg(feature = "enabled")]
pub mod jwt_auth;

#[cfg(feature = "enabled")]
pub mod rate_limiter;

#[cfg(feature = "enabled")]
pub mod routes;

#[cfg(feature = "enabled")]
pub mod state;
