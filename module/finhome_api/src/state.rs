//! Combined application state
//!
//! One `AppState` per process, handed to every route via `.with_state`.
//! Individual sub-states are reached from handlers via `axum::extract::FromRef`
//! — the same pattern the rest of this corpus uses to keep route modules
//! decoupled from the full state shape.

use axum::extract::FromRef;
use finhome_core::config::Settings;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::jwt_auth::AuthState;
use crate::rate_limiter::LoginRateLimiter;

/// Everything a route handler might need, reachable either directly via
/// `State<AppState>` or through `FromRef` for a narrower sub-state.
#[ derive( Clone ) ]
pub struct AppState
{
  pub pool: SqlitePool,
  pub auth: AuthState,
  pub settings: Arc< Settings >,
  pub login_rate_limiter: LoginRateLimiter,
}

impl AppState
{
  #[ must_use ]
  pub fn new( pool: SqlitePool, settings: Settings ) -> Self
  {
    let auth = AuthState::new( pool.clone(), settings.jwt.clone() );
    Self
    {
      pool,
      auth,
      settings: Arc::new( settings ),
      login_rate_limiter: LoginRateLimiter::new(),
    }
  }
}

impl FromRef< AppState > for AuthState
{
  fn from_ref( state: &AppState ) -> Self
  {
    state.auth.clone()
  }
}

impl FromRef< AppState > for SqlitePool
{
  fn from_ref( state: &AppState ) -> Self
  {
    state.pool.clone()
  }
}

impl FromRef< AppState > for Arc< Settings >
{
  fn from_ref( state: &AppState ) -> Self
  {
    state.settings.clone()
  }
}

impl FromRef< AppState > for LoginRateLimiter
{
  fn from_ref( state: &AppState ) -> Self
  {
    state.login_rate_limiter.clone()
  }
}
